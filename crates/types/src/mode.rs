//! Network-wide channel access mode.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Channel access mode shared by every station of a PtMP cell.
///
/// The base coordinator owns the value and propagates changes with
/// Management frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkMode {
    /// Contention-based access with binary exponential backoff.
    #[default]
    Csma,
    /// Coordinator-scheduled access through POLL grants.
    Tdma,
}

impl NetworkMode {
    /// The other mode.
    pub fn toggled(self) -> Self {
        match self {
            NetworkMode::Csma => NetworkMode::Tdma,
            NetworkMode::Tdma => NetworkMode::Csma,
        }
    }
}

impl fmt::Display for NetworkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkMode::Csma => write!(f, "CSMA"),
            NetworkMode::Tdma => write!(f, "TDMA"),
        }
    }
}

impl FromStr for NetworkMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csma" => Ok(NetworkMode::Csma),
            "tdma" => Ok(NetworkMode::Tdma),
            other => Err(format!("Unknown network mode: {}", other)),
        }
    }
}
