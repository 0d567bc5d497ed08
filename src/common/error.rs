//! Error type shared by every simulation component.

use crate::simulation::types::ChannelKey;

/// Failures surfaced by topology construction, channel lookup and reward evaluation.
///
/// None of these are transient: they indicate an invalid configuration or a
/// topology/skip-table inconsistency, so callers propagate them instead of retrying.
#[derive(Debug, Clone, PartialEq)]
pub enum SimulationError {
    /// Invalid topology or radio parameters, rejected at initialization.
    Configuration(String),
    /// A channel key that was never materialized in the network state.
    Lookup(ChannelKey),
    /// The SINR denominator of a sector was zero or not finite.
    NumericDegeneracy { cell: usize, sector: usize, denominator: f64 },
}

impl std::fmt::Display for SimulationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimulationError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            SimulationError::Lookup(key) => write!(f, "Channel {} not found in network state", key),
            SimulationError::NumericDegeneracy { cell, sector, denominator } => {
                write!(f, "Degenerate SINR denominator {} at cell {} sector {}", denominator, cell, sector)
            }
        }
    }
}

impl std::error::Error for SimulationError {}

pub type Result<T> = std::result::Result<T, SimulationError>;
