//! Simulator errors.

use ptmp_simulation::{ConfigError, SimulationError};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimulatorError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Simulation failed: {0}")]
    Simulation(#[from] SimulationError),

    /// Maximum base-to-client distance that is negative or not a number.
    #[error("Invalid maximum range: {0} m")]
    InvalidMaxRange(f64),

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid MAC config {}: {source}", path.display())]
    MacConfig {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
