//! Time-stepped simulator of a sectored multi-cell MIMO downlink.
//!
//! Each step lets a policy pick a transmit power level and a precoding
//! codeword for every sector, scores the network by per-cell Shannon capacity
//! and evolves the fading channels.

pub mod common;
pub mod policy;
pub mod simulation;

pub use common::config::SimulationConfig;
pub use common::error::{Result, SimulationError};
pub use policy::{ActionSpace, DecisionContext, Policy};
pub use simulation::{SimulationDriver, SimulationState};
