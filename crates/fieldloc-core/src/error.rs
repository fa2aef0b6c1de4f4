//! Error types shared across the workspace.

use std::error::Error;
use std::fmt;

/// Errors from building a [`FieldMap`](crate::FieldMap) out of
/// [`FieldDimensions`](crate::FieldDimensions).
#[derive(Clone, Debug, PartialEq)]
pub enum FieldMapError {
    /// A dimension that must be strictly positive is zero, negative or
    /// not finite.
    NonPositiveDimension {
        /// Name of the offending dimension.
        name: &'static str,
        /// The rejected value.
        value: f64,
    },
    /// The border strip width is negative or not finite.
    InvalidBorderStrip {
        /// The rejected value.
        value: f64,
    },
    /// A feature does not fit inside the field lines.
    DoesNotFit {
        /// Name of the feature that does not fit.
        name: &'static str,
    },
    /// A fiducial tag position is not finite.
    InvalidTagPosition {
        /// Numeric id of the tag.
        id: u32,
    },
}

impl fmt::Display for FieldMapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonPositiveDimension { name, value } => {
                write!(f, "field dimension '{name}' must be positive, got {value}")
            }
            Self::InvalidBorderStrip { value } => {
                write!(f, "border strip width must be >= 0, got {value}")
            }
            Self::DoesNotFit { name } => write!(f, "{name} does not fit inside the field"),
            Self::InvalidTagPosition { id } => {
                write!(f, "tag {id} has a non-finite position")
            }
        }
    }
}

impl Error for FieldMapError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_dimension() {
        let e = FieldMapError::NonPositiveDimension {
            name: "length",
            value: -1.0,
        };
        assert!(e.to_string().contains("length"));
    }
}
