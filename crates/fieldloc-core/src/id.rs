//! Strongly-typed identifiers and timestamps.

use std::fmt;

/// A point in time, in seconds.
///
/// In live mode timestamps come from a monotonic clock; in replay mode
/// they come from the log being replayed. Only differences between two
/// timestamps are meaningful.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd)]
pub struct Timestamp(pub f64);

impl Timestamp {
    /// The zero timestamp.
    pub const ZERO: Timestamp = Timestamp(0.0);

    /// Seconds as `f64`.
    pub fn as_secs(&self) -> f64 {
        self.0
    }

    /// Seconds elapsed from `earlier` to `self`. Negative if `earlier` is
    /// in the future.
    pub fn secs_since(&self, earlier: Timestamp) -> f64 {
        self.0 - earlier.0
    }

    /// This timestamp shifted by `secs`.
    pub fn offset(&self, secs: f64) -> Timestamp {
        Timestamp(self.0 + secs)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}s", self.0)
    }
}

/// Identifier of a fiducial tag placed on or around the field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TagId(pub u32);

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tag#{}", self.0)
    }
}

impl From<u32> for TagId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secs_since_is_signed() {
        let a = Timestamp(10.0);
        let b = Timestamp(12.5);
        assert_eq!(b.secs_since(a), 2.5);
        assert_eq!(a.secs_since(b), -2.5);
    }

    #[test]
    fn tag_id_display() {
        assert_eq!(TagId(7).to_string(), "tag#7");
    }
}
