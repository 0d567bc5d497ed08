//! Radio signal calculations and the SINR/capacity reward engine.
//!
//! Contains helpers for:
//! - dBm/mW conversion and log-distance path gain
//! - The DFT precoding codebook scaled by the selected power level
//! - Per-sector SINR with intra-cell and inter-cell interference
//! - Per-cell reward: mean Shannon capacity over the cell's sectors
//!
//! Units:
//! - Power: dBm in configuration, mW when scaling precoders
//! - Distance: meters

use num_complex::Complex64;
use std::f64::consts::PI;

use super::linalg::CMatrix;
use super::state::SimulationState;
use super::types::{ChannelKey, Decision, SECTORS_PER_CELL};
use crate::common::config::RadioConfig;
use crate::common::error::{Result, SimulationError};

/// Convert power from dBm to milliwatts: `P(mW) = 10^(P(dBm) / 10)`.
///
/// ```text
/// 0 dBm   → 1 mW
/// 10 dBm  → 10 mW
/// -10 dBm → 0.1 mW
/// ```
pub fn dbm_to_mw(dbm: f64) -> f64 {
    10f64.powf(dbm / 10.0)
}

/// Log-distance path loss in dB: `PL(d) = PL(d₀) + 10·n·log₁₀(d/d₀)`, d₀ = 1 m.
///
/// Distances below the reference distance return the reference loss.
pub fn calculate_path_loss(distance: f64, params: &RadioConfig) -> f64 {
    if distance < 1.0 {
        return params.path_loss_at_reference_distance;
    }
    params.path_loss_at_reference_distance + 10.0 * params.path_loss_exponent * distance.log10()
}

/// Large-scale power gain (linear) of a link of the given length.
pub fn path_gain(distance: f64, params: &RadioConfig) -> f64 {
    10f64.powf(-calculate_path_loss(distance, params) / 10.0)
}

/// Precoding codewords and power levels, indexed by a sector's `Decision`.
#[derive(Debug, Clone)]
pub struct Codebook {
    codewords: Vec<CMatrix>,
    power_mw: Vec<f64>,
}

impl Codebook {
    /// DFT codebook: codeword k has entries `exp(j·2π·n·k/K) / √L`.
    pub fn from_config(radio: &RadioConfig) -> Self {
        let size = radio.codebook_size;
        let length = radio.codeword_length;
        let norm = (length as f64).sqrt();
        let codewords = (0..size)
            .map(|k| {
                CMatrix::from_fn(length, 1, |n, _| {
                    let phase = 2.0 * PI * (n * k) as f64 / size as f64;
                    Complex64::from_polar(1.0 / norm, phase)
                })
            })
            .collect();
        let power_mw = radio.power_levels_dbm.iter().copied().map(dbm_to_mw).collect();
        Self { codewords, power_mw }
    }

    pub fn power_levels(&self) -> usize {
        self.power_mw.len()
    }

    pub fn size(&self) -> usize {
        self.codewords.len()
    }

    pub fn codeword(&self, index: usize) -> Option<&CMatrix> {
        self.codewords.get(index)
    }

    pub fn power_mw(&self, index: usize) -> Option<f64> {
        self.power_mw.get(index).copied()
    }

    pub fn contains(&self, decision: &Decision) -> bool {
        decision.power_index < self.power_levels() && decision.precoding_index < self.size()
    }

    /// Precoder for a decision: the codeword scaled by the linear power level.
    pub fn beamformer(&self, decision: &Decision) -> Result<CMatrix> {
        match (self.codeword(decision.precoding_index), self.power_mw(decision.power_index)) {
            (Some(codeword), Some(power)) => Ok(codeword.scale(power)),
            _ => Err(SimulationError::Configuration(format!(
                "decision {:?} outside {} power levels x {} codewords",
                decision,
                self.power_levels(),
                self.size()
            ))),
        }
    }
}

/// Interference received through channel `g` from a sector transmitting with
/// precoder `w`: `‖wᵀ · gᵀ · g · w‖²`, evaluated left to right.
pub fn interference_term(w: &CMatrix, g: &CMatrix) -> f64 {
    w.transpose().matmul(&g.transpose()).matmul(g).matmul(w).norm().powi(2)
}

/// The terms of one sector's SINR.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SinrTerms {
    /// `‖H·w‖⁴`
    pub signal: f64,
    /// `noise_power · ‖H·w‖²`
    pub noise: f64,
    pub intra: f64,
    pub inter: f64,
}

impl SinrTerms {
    pub fn denominator(&self) -> f64 {
        self.noise + self.intra + self.inter
    }

    pub fn sinr(&self) -> f64 {
        self.signal / self.denominator()
    }

    /// Shannon capacity `log2(1 + SINR)` in bit/s/Hz.
    pub fn capacity(&self) -> f64 {
        (1.0 + self.sinr()).log2()
    }
}

/// SINR terms for `sector` of `cell` under the currently committed decisions.
pub fn sector_sinr(state: &SimulationState, cell: usize, sector: usize) -> Result<SinrTerms> {
    let cells = state.cells();
    let codebook = state.codebook();
    let network = state.network();
    let own = &cells[cell];

    let w = codebook.beamformer(&own.sectors[sector].decision())?;
    let direct = network.csi(&ChannelKey::new(cell, sector, cell, sector))?;
    let gain = direct.matmul(&w).norm();
    let signal = gain.powi(4);
    let noise = state.noise_power() * gain.powi(2);

    let mut intra = 0.0;
    for other in own.sectors.iter().filter(|s| s.index != sector) {
        let w_j = codebook.beamformer(&other.decision())?;
        let g = network.csi(&ChannelKey::new(cell, other.index, cell, sector))?;
        intra += interference_term(&w_j, g);
    }

    let mut inter = 0.0;
    for &neighbor in state.neighbors().neighbors(cell) {
        for other in &cells[neighbor].sectors {
            let key = ChannelKey::new(neighbor, other.index, cell, sector);
            if state.neighbors().should_skip(&key) {
                continue;
            }
            let w_j = codebook.beamformer(&other.decision())?;
            inter += interference_term(&w_j, network.csi(&key)?);
        }
    }

    let terms = SinrTerms { signal, noise, intra, inter };
    let denominator = terms.denominator();
    if denominator == 0.0 || !denominator.is_finite() {
        return Err(SimulationError::NumericDegeneracy { cell, sector, denominator });
    }
    Ok(terms)
}

/// Reward of one cell: mean capacity over its sectors.
pub fn cell_reward(state: &SimulationState, cell: usize) -> Result<f64> {
    let mut total = 0.0;
    for sector in 0..SECTORS_PER_CELL {
        total += sector_sinr(state, cell, sector)?.capacity();
    }
    Ok(total / SECTORS_PER_CELL as f64)
}

/// Reward of every cell, in cell index order.
pub fn calculate_reward(state: &SimulationState) -> Result<Vec<f64>> {
    (0..state.cells().len()).map(|cell| cell_reward(state, cell)).collect()
}
