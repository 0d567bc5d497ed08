//! Feature vectors ("states") for learned policies.
//!
//! Layout for cell `c`, with `A` receive antennas and `B = 2·A` values per block
//! (real parts, then imaginary parts, of an effective channel `G·w`):
//!
//! ```text
//! intra  block (s, o)      at (s·3 + o)·B             G = H(c,s → c,o), w from c's current decision for s
//! inter  block (l, j, s)   at (9 + l·9 + j·3 + s)·B   G = H(l,j → c,s), w from l's decision history for j
//! ```
//!
//! Inter blocks exist for every cell index so the layout is identical for all
//! cells; only neighbors of `c` are filled, and skipped pairs stay zero.

use super::linalg::CMatrix;
use super::state::SimulationState;
use super::types::{ChannelKey, Decision, SECTORS_PER_CELL};
use crate::common::error::Result;

const BLOCKS_PER_CELL: usize = SECTORS_PER_CELL * SECTORS_PER_CELL;

/// Length of every observation vector produced for `state`.
pub fn observation_size(state: &SimulationState) -> usize {
    (1 + state.cells().len()) * BLOCKS_PER_CELL * 2 * state.antenna_count()
}

fn write_block(observation: &mut [f64], offset: usize, effective: &CMatrix) {
    let n = effective.rows();
    for (i, v) in effective.as_slice().iter().enumerate() {
        observation[offset + i] = v.re;
        observation[offset + n + i] = v.im;
    }
}

fn effective_channel(state: &SimulationState, key: &ChannelKey, decision: &Decision) -> Result<CMatrix> {
    let w = state.codebook().beamformer(decision)?;
    Ok(state.network().csi(key)?.matmul(&w))
}

/// Build the observation of `cell` from the current channels and ledger.
pub fn build_observation(state: &SimulationState, cell: usize) -> Result<Vec<f64>> {
    let block = 2 * state.antenna_count();
    let mut observation = vec![0.0; observation_size(state)];
    let own = &state.cells()[cell];

    for sector in &own.sectors {
        for other in 0..SECTORS_PER_CELL {
            let key = ChannelKey::new(cell, sector.index, cell, other);
            let effective = effective_channel(state, &key, &sector.decision())?;
            write_block(&mut observation, (sector.index * SECTORS_PER_CELL + other) * block, &effective);
        }
    }

    for &neighbor in state.neighbors().neighbors(cell) {
        let history = state.cells()[neighbor].decision_history();
        for (other_sector, decision) in history.iter().enumerate() {
            for sector in 0..SECTORS_PER_CELL {
                let key = ChannelKey::new(neighbor, other_sector, cell, sector);
                if state.neighbors().should_skip(&key) {
                    continue;
                }
                let effective = effective_channel(state, &key, decision)?;
                let index = BLOCKS_PER_CELL + neighbor * BLOCKS_PER_CELL + other_sector * SECTORS_PER_CELL + sector;
                write_block(&mut observation, index * block, &effective);
            }
        }
    }

    Ok(observation)
}
