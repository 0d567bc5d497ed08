//! Multi-cell MIMO network simulation core.
//!
//! ## Module Organization
//!
//! - `types`: cells, sectors, terminals, decisions and channel keys
//! - `geometry`: hex-grid topology and terminal placement
//! - `linalg`: small dense complex matrices
//! - `channel`: per-link CSI and fading kernels
//! - `neighbors`: static inter-cell skip table
//! - `network`: every materialized channel, keyed by `ChannelKey`
//! - `signal_calculations`: power conversion, codebook, SINR and reward
//! - `state`: the explicitly owned simulation state and decision ledger
//! - `observation`: feature vectors for learned policies
//! - `driver`: the time-stepped decide/commit/reward/advance loop

pub mod channel;
pub mod driver;
pub mod geometry;
pub mod linalg;
pub mod neighbors;
pub mod network;
pub mod observation;
pub mod signal_calculations;
pub mod state;
pub mod types;

pub use driver::{RewardLog, SimulationDriver, StepOutcome};
pub use state::SimulationState;
pub use types::{Cell, ChannelKey, Decision, Point, Sector, Terminal};
