//! Greedy spatial clustering of the particle population.
//!
//! Particles are visited in order; each joins the first cluster whose seed
//! lies within `radius` and `heading_tolerance`, or seeds a new cluster.
//! Once `max_clusters` exist, particles that fit none of them stay
//! unassigned but still count towards the total weight.

use fieldloc_core::{angle_diff, Pose2D};

use crate::particle::{weighted_mean, Particle};

/// Summary of one cluster.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cluster {
    /// Weighted mean pose of the members.
    pub mean: Pose2D,
    /// Sum of member weights.
    pub weight: f64,
    /// Weighted RMS distance of the members around `mean`.
    pub spread: f64,
    /// Number of members.
    pub members: usize,
}

/// Clustering parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClusterParams {
    /// Maximum distance to the seed.
    pub radius: f64,
    /// Maximum heading difference to the seed.
    pub heading_tolerance: f64,
    /// Maximum number of clusters.
    pub max_clusters: usize,
}

/// Result of clustering a population.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Clustering {
    /// Clusters sorted by descending weight.
    pub clusters: Vec<Cluster>,
    /// Total weight of the population.
    pub total_weight: f64,
}

impl Clustering {
    /// The heaviest cluster.
    pub fn main(&self) -> Option<&Cluster> {
        self.clusters.first()
    }

    /// Share of the total weight held by the heaviest cluster.
    pub fn main_share(&self) -> f64 {
        match self.main() {
            Some(c) if self.total_weight > 0.0 => (c.weight / self.total_weight).clamp(0.0, 1.0),
            _ => 0.0,
        }
    }
}

/// Cluster `particles`.
pub fn cluster(particles: &[Particle], params: &ClusterParams) -> Clustering {
    let mut seeds: Vec<Pose2D> = Vec::new();
    let mut assignment: Vec<Option<usize>> = Vec::with_capacity(particles.len());
    let r2 = params.radius * params.radius;
    let mut total_weight = 0.0;

    for p in particles {
        total_weight += p.weight;
        let found = seeds.iter().position(|s| {
            let dx = s.x - p.pose.x;
            let dy = s.y - p.pose.y;
            dx * dx + dy * dy <= r2
                && angle_diff(s.heading, p.pose.heading).abs() <= params.heading_tolerance
        });
        match found {
            Some(i) => assignment.push(Some(i)),
            None if seeds.len() < params.max_clusters => {
                seeds.push(p.pose);
                assignment.push(Some(seeds.len() - 1));
            }
            None => assignment.push(None),
        }
    }

    let mut buckets: Vec<Vec<Particle>> = vec![Vec::new(); seeds.len()];
    for (p, a) in particles.iter().zip(&assignment) {
        if let Some(i) = a {
            buckets[*i].push(*p);
        }
    }

    let mut clusters: Vec<Cluster> = buckets
        .iter()
        .filter_map(|members| {
            let (mean, weight) = weighted_mean(members)?;
            let var = members
                .iter()
                .map(|m| {
                    let d = m.pose.distance(&mean);
                    m.weight * d * d
                })
                .sum::<f64>()
                / weight;
            Some(Cluster {
                mean,
                weight,
                spread: var.max(0.0).sqrt(),
                members: members.len(),
            })
        })
        .collect();
    clusters.sort_by(|a, b| b.weight.total_cmp(&a.weight));

    Clustering {
        clusters,
        total_weight,
    }
}
