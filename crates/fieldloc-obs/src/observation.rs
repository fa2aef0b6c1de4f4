//! The closed set of observation kinds.

use fieldloc_core::Pose2D;

use crate::feature::FeatureObservation;
use crate::field_shape::FieldShapeObservation;
use crate::tags::TagsObservation;

/// One scored observation for a single filter step.
#[derive(Clone, Debug)]
pub enum Observation {
    /// A landmark seen by the camera.
    Feature(FeatureObservation),
    /// A fiducial tag located in 3D.
    Tags(TagsObservation),
    /// The in-field prior.
    FieldShape(FieldShapeObservation),
}

impl Observation {
    /// Likelihood of this observation from `pose`.
    pub fn potential(&self, pose: &Pose2D) -> f64 {
        match self {
            Self::Feature(o) => o.potential(pose),
            Self::Tags(o) => o.potential(pose),
            Self::FieldShape(o) => o.potential(pose),
        }
    }

    /// Natural log of [`potential`](Self::potential).
    pub fn log_potential(&self, pose: &Pose2D) -> f64 {
        match self {
            Self::Feature(o) => o.log_potential(pose),
            Self::Tags(o) => o.log_potential(pose),
            Self::FieldShape(o) => o.log_potential(pose),
        }
    }

    /// Score at or below which the observation contradicts a pose.
    pub fn min_score(&self) -> f64 {
        match self {
            Self::Feature(o) => o.min_score(),
            Self::Tags(o) => o.min_score(),
            Self::FieldShape(o) => o.min_score(),
        }
    }

    /// Weight the observation carries in the filter.
    pub fn weight(&self) -> f64 {
        match self {
            Self::Feature(o) => o.weight,
            Self::Tags(o) => o.weight,
            Self::FieldShape(_) => 1.0,
        }
    }

    /// Whether the consistency watchdog should grade a pose against this
    /// observation. Only landmark features are graded.
    pub fn is_scorable(&self) -> bool {
        match self {
            Self::Feature(_) => true,
            Self::Tags(_) | Self::FieldShape(_) => false,
        }
    }
}

/// Observations built for one tick.
#[derive(Clone, Debug, Default)]
pub struct ObservationSet {
    observations: Vec<Observation>,
}

impl ObservationSet {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an observation.
    pub fn push(&mut self, obs: Observation) {
        self.observations.push(obs);
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Iterate over every observation.
    pub fn iter(&self) -> std::slice::Iter<'_, Observation> {
        self.observations.iter()
    }

    /// Iterate over the observations the watchdog grades.
    pub fn scorable(&self) -> impl Iterator<Item = &Observation> {
        self.observations.iter().filter(|o| o.is_scorable())
    }

    /// Sum of log potentials at `pose`.
    pub fn log_likelihood(&self, pose: &Pose2D) -> f64 {
        self.observations.iter().map(|o| o.log_potential(pose)).sum()
    }

    /// Borrow as a slice.
    pub fn as_slice(&self) -> &[Observation] {
        &self.observations
    }
}

impl<'a> IntoIterator for &'a ObservationSet {
    type Item = &'a Observation;
    type IntoIter = std::slice::Iter<'a, Observation>;

    fn into_iter(self) -> Self::IntoIter {
        self.observations.iter()
    }
}

impl FromIterator<Observation> for ObservationSet {
    fn from_iter<I: IntoIterator<Item = Observation>>(iter: I) -> Self {
        Self {
            observations: iter.into_iter().collect(),
        }
    }
}
