//! A weighted pose hypothesis.

use fieldloc_core::Pose2D;

/// One hypothesis of the robot pose.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Particle {
    /// Hypothesized pose.
    pub pose: Pose2D,
    /// Normalized importance weight.
    pub weight: f64,
}

impl Particle {
    /// A particle with the given weight.
    pub fn new(pose: Pose2D, weight: f64) -> Self {
        Self { pose, weight }
    }
}

/// Weighted mean of a set of particles, with a circular heading mean.
///
/// Returns `None` when the total weight is not positive.
pub fn weighted_mean<'a, I>(particles: I) -> Option<(Pose2D, f64)>
where
    I: IntoIterator<Item = &'a Particle>,
{
    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    let mut sum_sin = 0.0;
    let mut sum_cos = 0.0;
    let mut total = 0.0;
    for p in particles {
        let w = p.weight;
        sum_x += w * p.pose.x;
        sum_y += w * p.pose.y;
        sum_sin += w * p.pose.heading.sin();
        sum_cos += w * p.pose.heading.cos();
        total += w;
    }
    if total > 0.0 && total.is_finite() {
        Some((
            Pose2D::new(sum_x / total, sum_y / total, sum_sin.atan2(sum_cos)),
            total,
        ))
    } else {
        None
    }
}
