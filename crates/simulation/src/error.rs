//! Error types for building and running a simulation.

use ptmp_types::StationId;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by the event engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The pending set emptied before the horizon was reached.
    #[error("No more events to process at {now:?}")]
    NoMoreEvents { now: Duration },
}

/// Invalid network configuration, detected before the run starts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Clients were added but no base coordinator.
    #[error("Network has clients but no base station")]
    MissingBase,

    /// The base has nobody to talk to.
    #[error("Base station has an empty roster")]
    EmptyRoster,

    /// A zero bit-rate makes every airtime zero.
    #[error("PHY bit-rate must be non-zero")]
    ZeroRate,

    /// TDMA needs a non-empty polling window.
    #[error("Poll period must be non-zero")]
    ZeroPollPeriod,

    /// A `min..=max` pair with `min > max`.
    #[error("Invalid {what} range: {min} > {max}")]
    InvalidRange {
        what: &'static str,
        min: u64,
        max: u64,
    },

    /// Distance that is negative or not a number.
    #[error("Invalid distance {distance_m} m for station {station}")]
    InvalidDistance { station: StationId, distance_m: f64 },
}

impl ConfigError {
    /// Check that `min <= max`.
    pub fn check_range(what: &'static str, min: u64, max: u64) -> Result<(), ConfigError> {
        if min > max {
            return Err(ConfigError::InvalidRange { what, min, max });
        }
        Ok(())
    }
}

/// Top-level simulation error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
}
