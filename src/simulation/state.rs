//! Explicitly owned simulation state.
//!
//! Everything a time step reads or writes lives here: the cells with their
//! decision ledger, the static neighbor table, the channel map and the
//! codebook. Only the driver holds it mutably.

use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;

use super::channel::FadingKernel;
use super::geometry::generate_cells;
use super::neighbors::NeighborTable;
use super::network::NetworkState;
use super::signal_calculations::Codebook;
use super::types::{Cell, Decision, SECTORS_PER_CELL};
use crate::common::config::SimulationConfig;
use crate::common::error::{Result, SimulationError};

#[derive(Debug)]
pub struct SimulationState {
    cells: Vec<Cell>,
    neighbors: NeighborTable,
    network: NetworkState,
    codebook: Codebook,
    noise_power: f64,
    antenna_count: usize,
}

impl SimulationState {
    /// Validate `config` and build topology, neighbor table and channels.
    pub fn new(config: &SimulationConfig) -> Result<Self> {
        Self::with_kernel(config, Arc::new(config.radio.fading))
    }

    /// Same as `new`, with a custom fading kernel.
    pub fn with_kernel(config: &SimulationConfig, kernel: Arc<dyn FadingKernel>) -> Result<Self> {
        config.validate()?;
        let mut rng = StdRng::seed_from_u64(config.topology.seed);
        let cells = generate_cells(&config.topology, &mut rng)?;
        let neighbors = NeighborTable::build(&cells, config.topology.cell_size, &config.neighbors);
        let network = NetworkState::with_kernel(&cells, &neighbors, &config.radio, config.topology.seed, kernel);
        log::info!(
            "Simulation state ready: {} cells, {} channels, {} actions per sector",
            cells.len(),
            network.len(),
            config.radio.action_space_size()
        );
        Ok(Self {
            cells,
            neighbors,
            network,
            codebook: Codebook::from_config(&config.radio),
            noise_power: config.radio.noise_power,
            antenna_count: config.radio.antenna_count,
        })
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn neighbors(&self) -> &NeighborTable {
        &self.neighbors
    }

    pub fn network(&self) -> &NetworkState {
        &self.network
    }

    pub fn codebook(&self) -> &Codebook {
        &self.codebook
    }

    pub fn noise_power(&self) -> f64 {
        self.noise_power
    }

    pub fn antenna_count(&self) -> usize {
        self.antenna_count
    }

    /// Number of sectors across all cells.
    pub fn sector_count(&self) -> usize {
        self.cells.len() * SECTORS_PER_CELL
    }

    /// Commit one decision per sector, in `cell * 3 + sector` order.
    ///
    /// All decisions are checked before any is written, so a rejected batch
    /// leaves the ledger untouched.
    pub fn commit(&mut self, decisions: &[Decision]) -> Result<()> {
        if decisions.len() != self.sector_count() {
            return Err(SimulationError::Configuration(format!(
                "expected {} decisions, got {}",
                self.sector_count(),
                decisions.len()
            )));
        }
        if let Some(bad) = decisions.iter().find(|d| !self.codebook.contains(d)) {
            return Err(SimulationError::Configuration(format!(
                "decision {:?} outside {} power levels x {} codewords",
                bad,
                self.codebook.power_levels(),
                self.codebook.size()
            )));
        }
        for (cell, chunk) in self.cells.iter_mut().zip(decisions.chunks(SECTORS_PER_CELL)) {
            for (sector, decision) in cell.sectors.iter_mut().zip(chunk) {
                sector.set_decision(*decision);
            }
        }
        Ok(())
    }

    /// Advance every channel by one time step.
    pub fn advance(&mut self) {
        self.network.step();
    }
}
