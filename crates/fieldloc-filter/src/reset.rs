//! Population reseeding strategies.
//!
//! Each function draws a fresh population of `n` equally weighted
//! particles. Positions are kept inside the reachable area of the field.

use std::f64::consts::{FRAC_PI_2, PI};

use fieldloc_core::{FieldMap, Point2, Pose2D, ResetNoise};
use rand::Rng;
use rand_distr::{Distribution, Normal, StandardNormal};

use crate::particle::Particle;

fn clamped(map: &FieldMap, x: f64, y: f64, heading: f64) -> Pose2D {
    let p = map.clamp_to_reachable(Point2::new(x, y));
    Pose2D::new(p.x, p.y, heading)
}

fn gaussian<R: Rng + ?Sized>(rng: &mut R, std: f64) -> f64 {
    if std > 0.0 {
        let z: f64 = StandardNormal.sample(rng);
        z * std
    } else {
        0.0
    }
}

/// Uniform over the reachable area with uniform heading.
pub fn uniform<R: Rng + ?Sized>(n: usize, map: &FieldMap, rng: &mut R) -> Vec<Particle> {
    let hx = map.reachable_half_length();
    let hy = map.reachable_half_width();
    let w = 1.0 / n as f64;
    (0..n)
        .map(|_| {
            let x = rng.gen_range(-hx..=hx);
            let y = rng.gen_range(-hy..=hy);
            let heading = rng.gen_range(-PI..PI);
            Particle::new(Pose2D::new(x, y, heading), w)
        })
        .collect()
}

/// Gaussian cloud around `pose`.
///
/// Non-finite or negative radii collapse that component onto the pose.
pub fn custom<R: Rng + ?Sized>(
    n: usize,
    pose: &Pose2D,
    noise: &ResetNoise,
    map: &FieldMap,
    rng: &mut R,
) -> Vec<Particle> {
    let xy = Normal::new(0.0, noise.xy).ok();
    let heading = Normal::new(0.0, noise.heading).ok();
    if xy.is_none() || heading.is_none() {
        log::warn!(
            "custom reset noise ({}, {}) is invalid, collapsing onto {}",
            noise.xy,
            noise.heading,
            pose
        );
    }
    let w = 1.0 / n as f64;
    (0..n)
        .map(|_| {
            let dx = xy.map_or(0.0, |d| d.sample(rng));
            let dy = xy.map_or(0.0, |d| d.sample(rng));
            let dh = heading.map_or(0.0, |d| d.sample(rng));
            Particle::new(
                clamped(map, pose.x + dx, pose.y + dy, pose.heading + dh),
                w,
            )
        })
        .collect()
}

/// Bounded perturbation around `center`: uniform in a disc of `radius` and
/// uniform heading offset within `±heading_bound`.
pub fn fall<R: Rng + ?Sized>(
    n: usize,
    center: &Pose2D,
    radius: f64,
    heading_bound: f64,
    map: &FieldMap,
    rng: &mut R,
) -> Vec<Particle> {
    let w = 1.0 / n as f64;
    (0..n)
        .map(|_| {
            let r = radius * rng.gen::<f64>().sqrt();
            let a = rng.gen_range(-PI..PI);
            let dh = if heading_bound > 0.0 {
                rng.gen_range(-heading_bound..=heading_bound)
            } else {
                0.0
            };
            Particle::new(
                clamped(
                    map,
                    center.x + r * a.cos(),
                    center.y + r * a.sin(),
                    center.heading + dh,
                ),
                w,
            )
        })
        .collect()
}

/// Uniform along the four boundary lines, facing into the field.
pub fn borders<R: Rng + ?Sized>(
    n: usize,
    map: &FieldMap,
    xy_noise: f64,
    heading_noise: f64,
    rng: &mut R,
) -> Vec<Particle> {
    let hl = map.half_length();
    let hw = map.half_width();
    let length = 2.0 * hl;
    let width = 2.0 * hw;
    let perimeter = map.perimeter();
    let w = 1.0 / n as f64;
    (0..n)
        .map(|_| {
            let s = rng.gen::<f64>() * perimeter;
            // Walk the perimeter: top touchline, opponent goal line,
            // bottom touchline, own goal line.
            let (x, y, inward) = if s < length {
                (-hl + s, hw, -FRAC_PI_2)
            } else if s < length + width {
                (hl, hw - (s - length), PI)
            } else if s < 2.0 * length + width {
                (hl - (s - length - width), -hw, FRAC_PI_2)
            } else {
                (-hl, -hw + (s - 2.0 * length - width), 0.0)
            };
            let off = gaussian(rng, xy_noise);
            let (nx, ny) = (inward.cos(), inward.sin());
            let heading = inward + gaussian(rng, heading_noise);
            Particle::new(clamped(map, x + off * nx, y + off * ny, heading), w)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn uniform_covers_reachable_area() {
        let map = FieldMap::default();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let ps = uniform(2000, &map, &mut rng);
        assert_eq!(ps.len(), 2000);
        let min_x = ps.iter().map(|p| p.pose.x).fold(f64::INFINITY, f64::min);
        let max_x = ps.iter().map(|p| p.pose.x).fold(f64::NEG_INFINITY, f64::max);
        assert!(min_x < -5.0 && max_x > 5.0);
        assert!(ps.iter().all(|p| map.is_reachable(&p.pose.position())));
    }

    #[test]
    fn custom_centers_on_pose() {
        let map = FieldMap::default();
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        let pose = Pose2D::new(1.0, -1.0, 0.5);
        let ps = custom(
            1000,
            &pose,
            &ResetNoise {
                xy: 0.1,
                heading: 0.1,
            },
            &map,
            &mut rng,
        );
        let mx = ps.iter().map(|p| p.pose.x).sum::<f64>() / 1000.0;
        let my = ps.iter().map(|p| p.pose.y).sum::<f64>() / 1000.0;
        assert!((mx - 1.0).abs() < 0.02);
        assert!((my + 1.0).abs() < 0.02);
    }

    #[test]
    fn custom_with_invalid_noise_collapses() {
        let map = FieldMap::default();
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        let pose = Pose2D::new(1.0, -1.0, 0.5);
        let ps = custom(
            10,
            &pose,
            &ResetNoise {
                xy: f64::NAN,
                heading: -1.0,
            },
            &map,
            &mut rng,
        );
        assert!(ps.iter().all(|p| p.pose == pose));
    }

    #[test]
    fn fall_stays_within_radius() {
        let map = FieldMap::default();
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let center = Pose2D::new(0.0, 0.0, 1.0);
        let ps = fall(500, &center, 0.3, 0.2, &map, &mut rng);
        for p in &ps {
            assert!(p.pose.distance(&center) <= 0.3 + 1e-12);
            assert!(fieldloc_core::angle_diff(center.heading, p.pose.heading).abs() <= 0.2 + 1e-12);
        }
    }

    #[test]
    fn borders_face_inwards() {
        let map = FieldMap::default();
        let mut rng = ChaCha8Rng::seed_from_u64(10);
        let ps = borders(500, &map, 0.0, 0.0, &mut rng);
        for p in &ps {
            let on_touchline = (p.pose.y.abs() - 3.0).abs() < 1e-9;
            let on_goal_line = (p.pose.x.abs() - 4.5).abs() < 1e-9;
            assert!(on_touchline || on_goal_line);
            let ahead = p.pose.compose(0.1, 0.0, 0.0);
            assert!(map.distance_outside_field(&ahead.position()) < 1e-9);
        }
    }
}
