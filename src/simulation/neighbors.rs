//! Static neighbor table and inter-cell skip predicate.
//!
//! Built once from the topology and immutable afterwards. A pair
//! (source sector → destination terminal) across cells is skipped when the two
//! cells are more than `max_hop_distance` hex hops apart, or when the
//! destination terminal lies outside the source sector's beam. Skipped pairs
//! are never materialized as channels and contribute zero interference.
//!
//! The predicate is directional: whether (a → b) is skipped says nothing about
//! (b → a), since each direction uses its own sector's facing.

use super::geometry::{angular_difference, bearing, hop_distance};
use super::types::{Cell, ChannelKey, SECTORS_PER_CELL};
use crate::common::config::NeighborConfig;

#[derive(Debug, Clone)]
pub struct NeighborTable {
    cell_number: usize,
    /// Neighbor cell indices per cell, ascending.
    neighbors: Vec<Vec<usize>>,
    /// Dense skip flags indexed by `slot`.
    skip: Vec<bool>,
}

impl NeighborTable {
    pub fn build(cells: &[Cell], cell_size: f64, config: &NeighborConfig) -> Self {
        let cell_number = cells.len();
        let half_width = config.beam_half_width_deg.to_radians();

        let neighbors: Vec<Vec<usize>> = cells
            .iter()
            .map(|cell| {
                cells
                    .iter()
                    .filter(|other| other.index != cell.index && hop_distance(&cell.position, &other.position, cell_size) <= config.max_hop_distance)
                    .map(|other| other.index)
                    .collect()
            })
            .collect();

        let mut skip = vec![false; cell_number * cell_number * SECTORS_PER_CELL * SECTORS_PER_CELL];
        for src in cells {
            for dst in cells {
                if src.index == dst.index {
                    continue;
                }
                let adjacent = neighbors[dst.index].contains(&src.index);
                for sector in &src.sectors {
                    for terminal in &dst.terminals {
                        let key = ChannelKey::new(src.index, sector.index, dst.index, terminal.sector_index);
                        let in_beam = {
                            let toward = bearing(&sector.position.ground(), &terminal.position.ground());
                            angular_difference(toward, sector.boresight) <= half_width
                        };
                        skip[slot(cell_number, &key)] = !(adjacent && in_beam);
                    }
                }
            }
        }

        let skipped = skip.iter().filter(|s| **s).count();
        log::debug!("Neighbor table built: {} cells, {} skipped inter-cell pairs", cell_number, skipped);

        Self { cell_number, neighbors, skip }
    }

    /// Cells whose sectors may interfere with `cell`'s terminals.
    pub fn neighbors(&self, cell: usize) -> &[usize] {
        &self.neighbors[cell]
    }

    /// True when the pair is treated as zero interference. Out-of-range
    /// indices are always skipped; in-range same-cell pairs never are.
    pub fn should_skip(&self, key: &ChannelKey) -> bool {
        let cells = self.cell_number;
        if key.tx_cell as usize >= cells
            || key.rx_cell as usize >= cells
            || key.tx_sector as usize >= SECTORS_PER_CELL
            || key.rx_sector as usize >= SECTORS_PER_CELL
        {
            return true;
        }
        if key.is_intra_cell() {
            return false;
        }
        self.skip[slot(cells, key)]
    }
}

fn slot(cell_number: usize, key: &ChannelKey) -> usize {
    let src = key.tx_cell as usize * SECTORS_PER_CELL + key.tx_sector as usize;
    let dst = key.rx_cell as usize * SECTORS_PER_CELL + key.rx_sector as usize;
    src * cell_number * SECTORS_PER_CELL + dst
}
