//! Domain-specific identifier types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Station identifier.
///
/// Allocated sequentially by the network builder; the base coordinator is a
/// station like any other and receives the first identifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct StationId(pub u32);

impl StationId {
    /// Index into dense per-station tables.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Station({})", self.0)
    }
}
