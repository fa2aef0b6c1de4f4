//! Odometry motion model with additive Gaussian noise.

use fieldloc_core::{Displacement, Pose2D};
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

use crate::config::FilterConfig;

/// Standard deviations applied to one motion update.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MotionNoise {
    /// Per-axis position noise, metres.
    pub xy: f64,
    /// Heading noise, radians.
    pub heading: f64,
}

/// Moves particles by an odometry displacement and diffuses them.
#[derive(Clone, Debug, PartialEq)]
pub struct MotionModel {
    xy_noise: f64,
    heading_noise: f64,
    odom_xy_ratio: f64,
    odom_heading_ratio: f64,
}

impl MotionModel {
    /// Extract the motion parameters of a filter config.
    pub fn from_config(config: &FilterConfig) -> Self {
        Self {
            xy_noise: config.xy_noise,
            heading_noise: config.heading_noise,
            odom_xy_ratio: config.odom_xy_noise_ratio,
            odom_heading_ratio: config.odom_heading_noise_ratio,
        }
    }

    /// Noise for a step of `dt` seconds at `gain`, covering `motion`.
    ///
    /// The time term is `base * gain * dt`; the odometry term grows with
    /// the displacement magnitude.
    pub fn noise(&self, motion: &Displacement, dt: f64, gain: f64) -> MotionNoise {
        let dt = dt.max(0.0);
        let gain = gain.max(0.0);
        MotionNoise {
            xy: self.xy_noise * gain * dt + self.odom_xy_ratio * motion.translation(),
            heading: self.heading_noise * gain * dt + self.odom_heading_ratio * motion.rotation(),
        }
    }

    /// Apply `motion` in the frame of `pose`, then add noise.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        pose: &Pose2D,
        motion: &Displacement,
        noise: &MotionNoise,
        rng: &mut R,
    ) -> Pose2D {
        let moved = pose.compose(motion.dx, motion.dy, motion.dheading);
        if noise.xy <= 0.0 && noise.heading <= 0.0 {
            return moved;
        }
        let nx: f64 = StandardNormal.sample(rng);
        let ny: f64 = StandardNormal.sample(rng);
        let nh: f64 = StandardNormal.sample(rng);
        Pose2D::new(
            moved.x + noise.xy * nx,
            moved.y + noise.xy * ny,
            moved.heading + noise.heading * nh,
        )
    }
}
