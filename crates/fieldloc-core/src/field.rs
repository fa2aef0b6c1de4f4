//! Field geometry: dimensions, landmark positions and fiducial tags.
//!
//! [`FieldDimensions`] holds the raw measurements and is validated into a
//! [`FieldMap`], which precomputes the position of every landmark kind the
//! perception pipeline can report. The default is the RoboCup KidSize field
//! (9 m × 6 m).

use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::error::FieldMapError;
use crate::id::TagId;
use crate::pose::{Point2, Point3};

/// Kind of a visual landmark that feature sightings can refer to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LandmarkKind {
    /// Base of a goal post.
    GoalPost,
    /// Outer corner of the field lines.
    Corner,
    /// The centre mark.
    CenterMark,
    /// One of the two penalty marks.
    PenaltyMark,
    /// A T-shaped line junction.
    TJunction,
    /// An X-shaped line crossing.
    XJunction,
}

impl LandmarkKind {
    /// Every landmark kind, in a stable order.
    pub const ALL: [LandmarkKind; 6] = [
        LandmarkKind::GoalPost,
        LandmarkKind::Corner,
        LandmarkKind::CenterMark,
        LandmarkKind::PenaltyMark,
        LandmarkKind::TJunction,
        LandmarkKind::XJunction,
    ];

    /// Short lowercase name, used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::GoalPost => "goal_post",
            Self::Corner => "corner",
            Self::CenterMark => "center_mark",
            Self::PenaltyMark => "penalty_mark",
            Self::TJunction => "t_junction",
            Self::XJunction => "x_junction",
        }
    }
}

/// Landmark positions of one kind. No kind has more than eight instances.
pub type LandmarkSet = SmallVec<[Point2; 8]>;

// ── FieldDimensions ──────────────────────────────────────────────

/// Raw field measurements in metres.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldDimensions {
    /// Distance between the two goal lines.
    pub length: f64,
    /// Distance between the two touchlines.
    pub width: f64,
    /// Width of the carpet strip outside the lines where a robot can stand.
    pub border_strip: f64,
    /// Distance between the inner edges of the goal posts.
    pub goal_width: f64,
    /// Distance from the goal line to a penalty mark.
    pub penalty_mark_distance: f64,
    /// Depth of the goal area (along the field length).
    pub goal_area_length: f64,
    /// Width of the goal area (along the goal line).
    pub goal_area_width: f64,
    /// Radius of the centre circle.
    pub center_circle_radius: f64,
}

impl Default for FieldDimensions {
    fn default() -> Self {
        Self {
            length: 9.0,
            width: 6.0,
            border_strip: 1.0,
            goal_width: 2.6,
            penalty_mark_distance: 1.5,
            goal_area_length: 1.0,
            goal_area_width: 3.0,
            center_circle_radius: 0.75,
        }
    }
}

impl FieldDimensions {
    /// Check the dimensions for consistency.
    pub fn validate(&self) -> Result<(), FieldMapError> {
        for (name, value) in [
            ("length", self.length),
            ("width", self.width),
            ("goal_width", self.goal_width),
            ("penalty_mark_distance", self.penalty_mark_distance),
            ("goal_area_length", self.goal_area_length),
            ("goal_area_width", self.goal_area_width),
            ("center_circle_radius", self.center_circle_radius),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(FieldMapError::NonPositiveDimension { name, value });
            }
        }
        if !self.border_strip.is_finite() || self.border_strip < 0.0 {
            return Err(FieldMapError::InvalidBorderStrip {
                value: self.border_strip,
            });
        }
        if self.goal_width >= self.width {
            return Err(FieldMapError::DoesNotFit { name: "goal" });
        }
        if self.goal_area_width >= self.width || self.goal_area_length >= self.length / 2.0 {
            return Err(FieldMapError::DoesNotFit { name: "goal area" });
        }
        if self.penalty_mark_distance >= self.length / 2.0 {
            return Err(FieldMapError::DoesNotFit {
                name: "penalty mark",
            });
        }
        if self.center_circle_radius >= self.width / 2.0 {
            return Err(FieldMapError::DoesNotFit {
                name: "centre circle",
            });
        }
        Ok(())
    }
}

// ── FieldMap ─────────────────────────────────────────────────────

/// Validated field geometry with precomputed landmark positions.
///
/// The field frame is centred on the centre mark with `x` pointing to the
/// opponent goal. The own goal line is at `x = -length / 2`.
#[derive(Clone, Debug)]
pub struct FieldMap {
    dims: FieldDimensions,
    landmarks: IndexMap<LandmarkKind, LandmarkSet>,
    tags: IndexMap<TagId, Point3>,
}

impl FieldMap {
    /// Build a map from dimensions.
    pub fn new(dims: FieldDimensions) -> Result<Self, FieldMapError> {
        dims.validate()?;
        Ok(Self::from_valid(dims))
    }

    fn from_valid(dims: FieldDimensions) -> Self {
        let hl = dims.length / 2.0;
        let hw = dims.width / 2.0;
        let hg = dims.goal_width / 2.0;
        let ga = dims.goal_area_width / 2.0;
        let pm = hl - dims.penalty_mark_distance;

        let mut landmarks = IndexMap::with_capacity(LandmarkKind::ALL.len());
        let mirrored = |x: f64, y: f64| -> LandmarkSet {
            [
                Point2::new(x, y),
                Point2::new(x, -y),
                Point2::new(-x, y),
                Point2::new(-x, -y),
            ]
            .into_iter()
            .collect()
        };
        landmarks.insert(LandmarkKind::GoalPost, mirrored(hl, hg));
        landmarks.insert(LandmarkKind::Corner, mirrored(hl, hw));
        landmarks.insert(
            LandmarkKind::CenterMark,
            [Point2::new(0.0, 0.0)].into_iter().collect(),
        );
        landmarks.insert(
            LandmarkKind::PenaltyMark,
            [Point2::new(pm, 0.0), Point2::new(-pm, 0.0)]
                .into_iter()
                .collect(),
        );
        let mut t = mirrored(hl, ga);
        t.push(Point2::new(0.0, hw));
        t.push(Point2::new(0.0, -hw));
        landmarks.insert(LandmarkKind::TJunction, t);
        landmarks.insert(
            LandmarkKind::XJunction,
            [
                Point2::new(0.0, dims.center_circle_radius),
                Point2::new(0.0, -dims.center_circle_radius),
            ]
            .into_iter()
            .collect(),
        );

        Self {
            dims,
            landmarks,
            tags: IndexMap::new(),
        }
    }

    /// Register a fiducial tag at a known field position.
    pub fn with_tag(mut self, id: TagId, position: Point3) -> Result<Self, FieldMapError> {
        if !(position.x.is_finite() && position.y.is_finite() && position.z.is_finite()) {
            return Err(FieldMapError::InvalidTagPosition { id: id.0 });
        }
        self.tags.insert(id, position);
        Ok(self)
    }

    /// The raw dimensions.
    pub fn dimensions(&self) -> &FieldDimensions {
        &self.dims
    }

    /// Positions of every landmark of `kind`.
    pub fn landmarks(&self, kind: LandmarkKind) -> &[Point2] {
        self.landmarks
            .get(&kind)
            .map(|s| s.as_slice())
            .unwrap_or(&[])
    }

    /// Known field position of a tag.
    pub fn tag_position(&self, id: TagId) -> Option<&Point3> {
        self.tags.get(&id)
    }

    /// Number of known tags.
    pub fn tag_count(&self) -> usize {
        self.tags.len()
    }

    /// Half of the field length.
    pub fn half_length(&self) -> f64 {
        self.dims.length / 2.0
    }

    /// Half of the field width.
    pub fn half_width(&self) -> f64 {
        self.dims.width / 2.0
    }

    /// Half extent of the reachable area along `x` (field plus border strip).
    pub fn reachable_half_length(&self) -> f64 {
        self.half_length() + self.dims.border_strip
    }

    /// Half extent of the reachable area along `y`.
    pub fn reachable_half_width(&self) -> f64 {
        self.half_width() + self.dims.border_strip
    }

    /// Whether `p` lies inside the field lines.
    pub fn is_in_field(&self, p: &Point2) -> bool {
        p.x.abs() <= self.half_length() && p.y.abs() <= self.half_width()
    }

    /// Whether `p` lies inside the reachable area.
    pub fn is_reachable(&self, p: &Point2) -> bool {
        p.x.abs() <= self.reachable_half_length() && p.y.abs() <= self.reachable_half_width()
    }

    /// Clamp `p` into the reachable area.
    pub fn clamp_to_reachable(&self, p: Point2) -> Point2 {
        let hx = self.reachable_half_length();
        let hy = self.reachable_half_width();
        Point2::new(p.x.clamp(-hx, hx), p.y.clamp(-hy, hy))
    }

    /// Distance from `p` to the field rectangle, 0 inside the lines.
    pub fn distance_outside_field(&self, p: &Point2) -> f64 {
        let dx = (p.x.abs() - self.half_length()).max(0.0);
        let dy = (p.y.abs() - self.half_width()).max(0.0);
        dx.hypot(dy)
    }

    /// Whether `p` lies in the own half (negative `x`), centre line included.
    pub fn is_in_own_half(&self, p: &Point2) -> bool {
        p.x <= 0.0
    }

    /// Total length of the field boundary lines.
    pub fn perimeter(&self) -> f64 {
        2.0 * (self.dims.length + self.dims.width)
    }
}

impl Default for FieldMap {
    fn default() -> Self {
        Self::from_valid(FieldDimensions::default())
    }
}
