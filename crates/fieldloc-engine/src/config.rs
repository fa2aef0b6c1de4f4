//! Loop configuration, validation, and error types.
//!
//! [`LocalizationConfig`] is an immutable snapshot: the loop reads one
//! snapshot per tick and a new configuration is installed by sending a
//! whole replacement through the control channel.

use std::error::Error;
use std::fmt;

use fieldloc_core::FieldMapError;
use fieldloc_filter::{FilterConfig, FilterError};
use fieldloc_obs::{ObsConfigError, ObservationConfig};

// ── RunMode ────────────────────────────────────────────────────────

/// Where loop time comes from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RunMode {
    /// Wall clock; an indeterminate play gate means "not allowed".
    #[default]
    Live,
    /// External replay clock; an indeterminate play gate means "allowed".
    Replay,
}

// ── WatcherConfig ──────────────────────────────────────────────────

/// Parameters of the consistency watchdog.
#[derive(Clone, Debug, PartialEq)]
pub struct WatcherConfig {
    /// Whether the watchdog runs. When disabled the score stays at 1.
    pub enabled: bool,
    /// Score lost every tick. Default: 0.005.
    pub step_cost: f64,
    /// Score lost per observation that contradicts the estimate. Default: 0.02.
    pub bad_obs_cost: f64,
    /// Score gained per observation that agrees with the estimate. Default: 0.1.
    pub good_obs_gain: f64,
    /// Minimum seconds between two watchdog Uniform resets. Default: 30.
    pub reset_interval: f64,
    /// Noise gain reached when the score is 0. Default: 5.
    pub max_noise: f64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            step_cost: 0.005,
            bad_obs_cost: 0.02,
            good_obs_gain: 0.1,
            reset_interval: 30.0,
            max_noise: 5.0,
        }
    }
}

// ── NoiseBoostConfig ───────────────────────────────────────────────

/// Extra exploration noise right after a Uniform reset.
///
/// The gain decays linearly from `max_boost` to 1 over `duration` seconds.
#[derive(Clone, Debug, PartialEq)]
pub struct NoiseBoostConfig {
    /// Gain right after the reset. Default: 10.
    pub max_boost: f64,
    /// Seconds until the boost has decayed to 1. Default: 5.
    pub duration: f64,
}

impl Default for NoiseBoostConfig {
    fn default() -> Self {
        Self {
            max_boost: 10.0,
            duration: 5.0,
        }
    }
}

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected while validating a [`LocalizationConfig`] or
/// starting a localizer.
#[derive(Debug, PartialEq)]
pub enum ConfigError {
    /// Filter parameters are invalid.
    Filter(FilterError),
    /// Observation model parameters are invalid.
    Observation(ObsConfigError),
    /// The field map could not be built.
    FieldMap(FieldMapError),
    /// Tick period is not finite and positive.
    InvalidPeriod {
        /// The rejected value.
        value: f64,
    },
    /// A watchdog parameter is out of range.
    InvalidWatcher {
        /// Parameter name.
        name: &'static str,
        /// The rejected value.
        value: f64,
    },
    /// A noise boost parameter is out of range.
    InvalidNoiseBoost {
        /// Parameter name.
        name: &'static str,
        /// The rejected value.
        value: f64,
    },
    /// A time bound or angle bound is not finite and positive.
    InvalidBound {
        /// Parameter name.
        name: &'static str,
        /// The rejected value.
        value: f64,
    },
    /// The control queue capacity is zero.
    ControlQueueZero,
    /// OS thread creation failed.
    ThreadSpawnFailed {
        /// Description of the failure.
        reason: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Filter(e) => write!(f, "filter: {e}"),
            Self::Observation(e) => write!(f, "observation: {e}"),
            Self::FieldMap(e) => write!(f, "field map: {e}"),
            Self::InvalidPeriod { value } => {
                write!(f, "period must be finite and positive, got {value}")
            }
            Self::InvalidWatcher { name, value } => {
                write!(f, "invalid watcher config: {name} = {value}")
            }
            Self::InvalidNoiseBoost { name, value } => {
                write!(f, "invalid noise boost config: {name} = {value}")
            }
            Self::InvalidBound { name, value } => {
                write!(f, "{name} must be finite and positive, got {value}")
            }
            Self::ControlQueueZero => write!(f, "control_queue_capacity must be at least 1"),
            Self::ThreadSpawnFailed { reason } => {
                write!(f, "thread spawn failed: {reason}")
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Filter(e) => Some(e),
            Self::Observation(e) => Some(e),
            Self::FieldMap(e) => Some(e),
            _ => None,
        }
    }
}

impl From<FilterError> for ConfigError {
    fn from(e: FilterError) -> Self {
        Self::Filter(e)
    }
}

impl From<ObsConfigError> for ConfigError {
    fn from(e: ObsConfigError) -> Self {
        Self::Observation(e)
    }
}

impl From<FieldMapError> for ConfigError {
    fn from(e: FieldMapError) -> Self {
        Self::FieldMap(e)
    }
}

// ── LocalizationConfig ─────────────────────────────────────────────

/// Complete configuration of the localization loop.
///
/// The particle count lives in [`FilterConfig::particle_count`]; the loop
/// resizes the population to it before every step.
#[derive(Clone, Debug, PartialEq)]
pub struct LocalizationConfig {
    /// Seconds between two ticks. Default: 1.
    pub period: f64,
    /// Consistency watchdog.
    pub watcher: WatcherConfig,
    /// Post-reset exploration boost.
    pub noise_boost: NoiseBoostConfig,
    /// Ignore observations and trust odometry. Default: false.
    pub odometry_only: bool,
    /// Longest step the filter integrates, in seconds. Default: 5.
    pub max_step_time: f64,
    /// Seconds after the gate reopens during which the loop waits for a
    /// proper reset. Default: 10.
    pub start_without_reset_delay: f64,
    /// Odometry rotation per tick above which a warning is logged,
    /// radians. Default: 90 degrees.
    pub suspicious_rotation: f64,
    /// Clock source and gate fallback.
    pub mode: RunMode,
    /// Whether the robot plays as goalkeeper. Default: false.
    pub goalkeeper: bool,
    /// Particle filter parameters.
    pub filter: FilterConfig,
    /// Observation model parameters.
    pub observations: ObservationConfig,
    /// Capacity of the control channel of a realtime localizer. Default: 64.
    pub control_queue_capacity: usize,
}

impl Default for LocalizationConfig {
    fn default() -> Self {
        Self {
            period: 1.0,
            watcher: WatcherConfig::default(),
            noise_boost: NoiseBoostConfig::default(),
            odometry_only: false,
            max_step_time: 5.0,
            start_without_reset_delay: 10.0,
            suspicious_rotation: 90f64.to_radians(),
            mode: RunMode::Live,
            goalkeeper: false,
            filter: FilterConfig::default(),
            observations: ObservationConfig::default(),
            control_queue_capacity: 64,
        }
    }
}

fn positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

fn non_negative(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

impl LocalizationConfig {
    /// Check every parameter, including the nested filter and
    /// observation configs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !positive(self.period) {
            return Err(ConfigError::InvalidPeriod { value: self.period });
        }
        for (name, value) in [
            ("step_cost", self.watcher.step_cost),
            ("bad_obs_cost", self.watcher.bad_obs_cost),
            ("good_obs_gain", self.watcher.good_obs_gain),
            ("reset_interval", self.watcher.reset_interval),
        ] {
            if !non_negative(value) {
                return Err(ConfigError::InvalidWatcher { name, value });
            }
        }
        if !self.watcher.max_noise.is_finite() || self.watcher.max_noise < 1.0 {
            return Err(ConfigError::InvalidWatcher {
                name: "max_noise",
                value: self.watcher.max_noise,
            });
        }
        if !self.noise_boost.max_boost.is_finite() || self.noise_boost.max_boost < 1.0 {
            return Err(ConfigError::InvalidNoiseBoost {
                name: "max_boost",
                value: self.noise_boost.max_boost,
            });
        }
        if !non_negative(self.noise_boost.duration) {
            return Err(ConfigError::InvalidNoiseBoost {
                name: "duration",
                value: self.noise_boost.duration,
            });
        }
        for (name, value) in [
            ("max_step_time", self.max_step_time),
            ("suspicious_rotation", self.suspicious_rotation),
        ] {
            if !positive(value) {
                return Err(ConfigError::InvalidBound { name, value });
            }
        }
        if !non_negative(self.start_without_reset_delay) {
            return Err(ConfigError::InvalidBound {
                name: "start_without_reset_delay",
                value: self.start_without_reset_delay,
            });
        }
        if self.control_queue_capacity == 0 {
            return Err(ConfigError::ControlQueueZero);
        }
        self.filter.validate()?;
        self.observations.validate()?;
        Ok(())
    }
}
