//! Simulation configuration loading and validation.
//!
//! Every section has defaults so a TOML file only needs to list the values it
//! overrides. `validate` rejects parameters that would make the topology or the
//! reward computation meaningless; it runs before anything is built.

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::error::{Result, SimulationError};
use crate::simulation::channel::FadingModel;
use crate::simulation::types::MAX_CELLS;

/// Root configuration for one simulated network.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SimulationConfig {
    pub topology: TopologyConfig,
    pub radio: RadioConfig,
    pub neighbors: NeighborConfig,
    pub training: TrainingConfig,
}

/// Hex-grid layout and terminal placement.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct TopologyConfig {
    /// Number of cells, 1..=7 (center cell plus the first hex ring).
    pub cell_number: usize,
    /// Cell radius R in meters; neighboring cell centers sit R·√3 apart.
    pub cell_size: f64,
    /// Base station (sector antenna) height in meters.
    pub bs_height: f64,
    /// User terminal height in meters.
    pub ut_height: f64,
    /// Inner radius of the terminal annulus around its sector.
    pub r_min: f64,
    /// Outer radius of the terminal annulus around its sector.
    pub r_max: f64,
    /// Reuse the same per-sector terminal offsets in every cell.
    pub shared_terminal_layout: bool,
    /// Seed for terminal placement and channel fading.
    pub seed: u64,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            cell_number: 7,
            cell_size: 200.0,
            bs_height: 25.0,
            ut_height: 1.5,
            r_min: 10.0,
            r_max: 150.0,
            shared_terminal_layout: true,
            seed: 2024,
        }
    }
}

/// Antenna arrays, codebook, power levels and propagation.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RadioConfig {
    /// Receive antennas per terminal (CSI rows).
    pub antenna_count: usize,
    /// Transmit antennas per sector, i.e. precoding codeword length (CSI columns).
    pub codeword_length: usize,
    /// Number of DFT precoding codewords.
    pub codebook_size: usize,
    /// Selectable transmit power levels in dBm.
    pub power_levels_dbm: Vec<f64>,
    /// Receiver noise power multiplier applied to the effective channel gain.
    pub noise_power: f64,
    /// Log-distance path loss exponent; 0 disables large-scale attenuation.
    pub path_loss_exponent: f64,
    /// Path loss at the 1 m reference distance in dB.
    pub path_loss_at_reference_distance: f64,
    /// Small-scale fading process applied on every time step.
    pub fading: FadingModel,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            antenna_count: 4,
            codeword_length: 4,
            codebook_size: 4,
            power_levels_dbm: vec![5.0, 10.0, 15.0, 20.0],
            noise_power: 1e-3,
            path_loss_exponent: 3.0,
            path_loss_at_reference_distance: 0.0,
            fading: FadingModel::default(),
        }
    }
}

impl RadioConfig {
    /// Size of the flattened action space (power levels × codewords).
    pub fn action_space_size(&self) -> usize {
        self.power_levels_dbm.len() * self.codebook_size
    }
}

/// Static inter-cell interference filter.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct NeighborConfig {
    /// Cells further apart than this many hex hops never interfere.
    pub max_hop_distance: usize,
    /// Half-width in degrees of a sector's beam around its boresight.
    pub beam_half_width_deg: f64,
}

impl Default for NeighborConfig {
    fn default() -> Self {
        Self {
            max_hop_distance: 1,
            beam_half_width_deg: 60.0,
        }
    }
}

/// Training loop parameters for learned policies.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct TrainingConfig {
    /// Time slots run by `SimulationDriver::train`.
    pub total_time_slot: usize,
    /// Experiences per training batch; also the replay warm-up threshold.
    pub batch_size: usize,
    /// Replay memory capacity.
    pub replay_capacity: usize,
    /// Training steps between target synchronizations (one epoch).
    pub t_step: usize,
    /// Exploration probability of the epsilon-greedy policy.
    pub epsilon: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            total_time_slot: 1000,
            batch_size: 64,
            replay_capacity: 10_000,
            t_step: 100,
            epsilon: 0.1,
        }
    }
}

impl SimulationConfig {
    /// Load configuration from a TOML file and validate it.
    pub fn load(config_path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(config_path)
            .map_err(|e| SimulationError::Configuration(format!("Failed to read config file {}: {}", config_path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text and validate it.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: SimulationConfig =
            toml::from_str(content).map_err(|e| SimulationError::Configuration(format!("Failed to parse config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the simulation cannot represent.
    pub fn validate(&self) -> Result<()> {
        let topology = &self.topology;
        let radio = &self.radio;
        let fail = |msg: String| Err(SimulationError::Configuration(msg));

        if topology.cell_number == 0 || topology.cell_number > MAX_CELLS {
            return fail(format!("cell_number {} must be between 1 and {}", topology.cell_number, MAX_CELLS));
        }
        if !(topology.cell_size > 0.0) {
            return fail(format!("cell_size {} must be positive", topology.cell_size));
        }
        if !(topology.r_min > 0.0) || !(topology.r_max > 0.0) {
            return fail(format!("terminal radii ({}, {}) must be positive", topology.r_min, topology.r_max));
        }
        if topology.r_min > topology.r_max {
            return fail(format!("r_min {} exceeds r_max {}", topology.r_min, topology.r_max));
        }
        if topology.bs_height < 0.0 || topology.ut_height < 0.0 {
            return fail("antenna heights must be non-negative".to_string());
        }

        if radio.antenna_count == 0 || radio.codeword_length == 0 {
            return fail(format!(
                "antenna array {}x{} must have positive dimensions",
                radio.antenna_count, radio.codeword_length
            ));
        }
        if radio.codebook_size == 0 {
            return fail("codebook_size must be positive".to_string());
        }
        if radio.power_levels_dbm.is_empty() {
            return fail("power_levels_dbm must list at least one level".to_string());
        }
        if let Some(level) = radio.power_levels_dbm.iter().find(|p| !p.is_finite()) {
            return fail(format!("power level {} dBm must be finite", level));
        }
        if !(radio.noise_power >= 0.0) || !radio.noise_power.is_finite() {
            return fail(format!("noise_power {} must be finite and non-negative", radio.noise_power));
        }
        if radio.path_loss_exponent < 0.0 {
            return fail("path_loss_exponent must be non-negative".to_string());
        }
        radio.fading.validate()?;

        if !(self.neighbors.beam_half_width_deg >= 0.0 && self.neighbors.beam_half_width_deg <= 180.0) {
            return fail(format!("beam_half_width_deg {} must be within 0..=180", self.neighbors.beam_half_width_deg));
        }

        if self.training.batch_size == 0 || self.training.replay_capacity < self.training.batch_size {
            return fail("replay_capacity must hold at least one non-empty batch".to_string());
        }
        if self.training.t_step == 0 {
            return fail("t_step must be positive".to_string());
        }
        if !(0.0..=1.0).contains(&self.training.epsilon) {
            return fail(format!("epsilon {} must be within 0..=1", self.training.epsilon));
        }

        Ok(())
    }
}
