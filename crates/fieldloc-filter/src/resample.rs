//! Systematic (low-variance) resampling.

use rand::Rng;

use crate::particle::Particle;

/// Draw `n` particles from `particles` proportionally to weight.
///
/// One random offset is drawn and `n` evenly spaced pointers walk the
/// cumulative weights, so a particle of weight `w` is copied
/// `floor(n * w)` or `ceil(n * w)` times. If the weights do not sum to
/// a positive finite value every particle is treated as equally likely.
/// Output weights are `1 / n`.
pub fn systematic<R: Rng + ?Sized>(particles: &[Particle], n: usize, rng: &mut R) -> Vec<Particle> {
    if particles.is_empty() || n == 0 {
        return Vec::new();
    }
    let m = particles.len();
    let mut cumulative: Vec<f64> = Vec::with_capacity(m);
    let mut sum = 0.0;
    for p in particles {
        sum += p.weight.max(0.0);
        cumulative.push(sum);
    }
    if sum > 0.0 && sum.is_finite() {
        for c in &mut cumulative {
            *c /= sum;
        }
    } else {
        for (i, c) in cumulative.iter_mut().enumerate() {
            *c = (i + 1) as f64 / m as f64;
        }
    }

    let step = 1.0 / n as f64;
    let weight = step;
    let mut r = rng.gen::<f64>() * step;
    let mut idx = 0;
    let mut out = Vec::with_capacity(n);
    for _ in 0..n {
        while idx < m - 1 && r >= cumulative[idx] {
            idx += 1;
        }
        out.push(Particle::new(particles[idx].pose, weight));
        r += step;
    }
    out
}
