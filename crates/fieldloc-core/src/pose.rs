//! Planar poses, points, and angle helpers.
//!
//! The field frame has its origin at the centre mark, `x` along the field
//! length towards the opponent goal and `y` to the left. Headings are in
//! radians, counter-clockwise, and always normalized to `(-π, π]`.

use std::f64::consts::{PI, TAU};
use std::fmt;

/// Normalize an angle to `(-π, π]`.
pub fn normalize_angle(angle: f64) -> f64 {
    if !angle.is_finite() {
        return angle;
    }
    let mut a = angle.rem_euclid(TAU);
    if a > PI {
        a -= TAU;
    }
    a
}

/// Signed shortest rotation from `from` to `to`, in `(-π, π]`.
pub fn angle_diff(from: f64, to: f64) -> f64 {
    normalize_angle(to - from)
}

// ── Point2 / Point3 ──────────────────────────────────────────────

/// A 2D point in metres.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point2 {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
}

impl Point2 {
    /// Create a point.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn distance(&self, other: &Point2) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Distance to the origin.
    pub fn norm(&self) -> f64 {
        self.x.hypot(self.y)
    }
}

/// A 3D point in metres.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point3 {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
    /// Z coordinate (height).
    pub z: f64,
}

impl Point3 {
    /// Create a point.
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Drop the height component.
    pub fn xy(&self) -> Point2 {
        Point2::new(self.x, self.y)
    }
}

// ── Pose2D ───────────────────────────────────────────────────────

/// A robot pose on the field: position plus heading.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Pose2D {
    /// X position in metres.
    pub x: f64,
    /// Y position in metres.
    pub y: f64,
    /// Heading in radians, normalized to `(-π, π]`.
    pub heading: f64,
}

impl Pose2D {
    /// Create a pose, normalizing the heading.
    pub fn new(x: f64, y: f64, heading: f64) -> Self {
        Self {
            x,
            y,
            heading: normalize_angle(heading),
        }
    }

    /// The pose at the field origin facing the opponent goal.
    pub const fn origin() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            heading: 0.0,
        }
    }

    /// Position component.
    pub fn position(&self) -> Point2 {
        Point2::new(self.x, self.y)
    }

    /// Express a field-frame point in this pose's robot frame.
    pub fn to_local(&self, field_point: &Point2) -> Point2 {
        let dx = field_point.x - self.x;
        let dy = field_point.y - self.y;
        let (s, c) = self.heading.sin_cos();
        Point2::new(c * dx + s * dy, -s * dx + c * dy)
    }

    /// Express a robot-frame point in the field frame.
    pub fn to_field(&self, local_point: &Point2) -> Point2 {
        let (s, c) = self.heading.sin_cos();
        Point2::new(
            self.x + c * local_point.x - s * local_point.y,
            self.y + s * local_point.x + c * local_point.y,
        )
    }

    /// Apply a robot-frame displacement `(dx, dy, dheading)`.
    pub fn compose(&self, dx: f64, dy: f64, dheading: f64) -> Pose2D {
        let p = self.to_field(&Point2::new(dx, dy));
        Pose2D::new(p.x, p.y, self.heading + dheading)
    }

    /// Planar distance to another pose (heading ignored).
    pub fn distance(&self, other: &Pose2D) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Whether every component is finite.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.heading.is_finite()
    }
}

impl fmt::Display for Pose2D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({:.3}, {:.3}, {:.1}°)",
            self.x,
            self.y,
            self.heading.to_degrees()
        )
    }
}
