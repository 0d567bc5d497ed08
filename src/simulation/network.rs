//! Network state: every materialized channel, keyed by `ChannelKey`.
//!
//! Built once from the topology. Intra-cell pairs (each sector against its own
//! cell's terminals) are always present; inter-cell pairs are present only when
//! the neighbor table does not skip them. Lookups of skipped pairs fail with
//! `SimulationError::Lookup`, so callers consult `NeighborTable::should_skip`
//! first.

use std::collections::HashMap;
use std::sync::Arc;

use super::channel::{Channel, FadingKernel};
use super::geometry::distance3;
use super::linalg::CMatrix;
use super::neighbors::NeighborTable;
use super::signal_calculations::path_gain;
use super::types::{Cell, ChannelKey};
use crate::common::config::RadioConfig;
use crate::common::error::{Result, SimulationError};

/// Derive an independent per-channel seed (SplitMix64 finalizer) so channel
/// trajectories do not depend on iteration order.
fn channel_seed(seed: u64, key: &ChannelKey) -> u64 {
    let mut z = seed ^ (u64::from(key.packed())).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[derive(Debug)]
pub struct NetworkState {
    channels: HashMap<ChannelKey, Channel>,
}

impl NetworkState {
    /// Build all channels using the configured fading model.
    pub fn new(cells: &[Cell], neighbors: &NeighborTable, radio: &RadioConfig, seed: u64) -> Self {
        Self::with_kernel(cells, neighbors, radio, seed, Arc::new(radio.fading))
    }

    /// Build all channels with an explicit fading kernel.
    pub fn with_kernel(cells: &[Cell], neighbors: &NeighborTable, radio: &RadioConfig, seed: u64, kernel: Arc<dyn FadingKernel>) -> Self {
        let mut channels = HashMap::new();
        let mut skipped = 0usize;

        for cell in cells {
            for sector in &cell.sectors {
                for other in cells {
                    for terminal in &other.terminals {
                        let key = ChannelKey::new(cell.index, sector.index, other.index, terminal.sector_index);
                        if neighbors.should_skip(&key) {
                            skipped += 1;
                            continue;
                        }
                        let gain = path_gain(distance3(&sector.position, &terminal.position), radio);
                        let channel = Channel::new(
                            key,
                            radio.antenna_count,
                            radio.codeword_length,
                            gain,
                            Arc::clone(&kernel),
                            channel_seed(seed, &key),
                        );
                        channels.insert(key, channel);
                    }
                }
            }
        }

        log::info!("Network initialized: {} channels, {} skipped pairs", channels.len(), skipped);
        Self { channels }
    }

    /// The channel for `key`, or a lookup error if it was never materialized.
    pub fn channel(&self, key: &ChannelKey) -> Result<&Channel> {
        self.channels.get(key).ok_or(SimulationError::Lookup(*key))
    }

    /// Current CSI of the channel for `key`.
    pub fn csi(&self, key: &ChannelKey) -> Result<&CMatrix> {
        self.channel(key).map(Channel::csi)
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Keys in ascending order.
    pub fn keys(&self) -> Vec<ChannelKey> {
        let mut keys: Vec<ChannelKey> = self.channels.keys().copied().collect();
        keys.sort();
        keys
    }

    /// Advance every channel by one time step.
    pub fn step(&mut self) {
        for channel in self.channels.values_mut() {
            channel.step();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::config::{NeighborConfig, TopologyConfig};
    use crate::simulation::geometry::generate_cells;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn build(n: usize, seed: u64) -> (Vec<Cell>, NeighborTable, NetworkState) {
        let topology = TopologyConfig {
            cell_number: n,
            seed,
            ..TopologyConfig::default()
        };
        let cells = generate_cells(&topology, &mut StdRng::seed_from_u64(seed)).unwrap();
        let table = NeighborTable::build(&cells, topology.cell_size, &NeighborConfig::default());
        let network = NetworkState::new(&cells, &table, &RadioConfig::default(), seed);
        (cells, table, network)
    }

    #[test]
    fn single_cell_has_nine_intra_channels() {
        let (_, _, network) = build(1, 3);
        assert_eq!(network.len(), 9);
        for s in 0..3 {
            for d in 0..3 {
                assert!(network.channel(&ChannelKey::new(0, s, 0, d)).is_ok());
            }
        }
    }

    #[test]
    fn skipped_pairs_are_lookup_errors() {
        let (_, table, network) = build(7, 3);
        let mut inter = 0;
        for a in 0..7 {
            for b in 0..7 {
                for s in 0..3 {
                    for d in 0..3 {
                        let key = ChannelKey::new(a, s, b, d);
                        if table.should_skip(&key) {
                            assert_eq!(network.channel(&key).unwrap_err(), SimulationError::Lookup(key));
                        } else {
                            let channel = network.channel(&key).unwrap();
                            assert_eq!(channel.key(), key);
                            assert_eq!(channel.csi().shape(), (4, 4));
                            if a != b {
                                inter += 1;
                            }
                        }
                    }
                }
            }
        }
        assert_eq!(network.len(), 7 * 9 + inter);
        assert!(network.len() < 7 * 7 * 9);
    }

    #[test]
    fn channel_gain_follows_sector_to_terminal_distance() {
        let (cells, _, network) = build(2, 5);
        let radio = RadioConfig::default();
        for key in network.keys() {
            let sector = &cells[key.tx_cell as usize].sectors[key.tx_sector as usize];
            let terminal = &cells[key.rx_cell as usize].terminals[key.rx_sector as usize];
            let expected = path_gain(distance3(&sector.position, &terminal.position), &radio);
            assert_eq!(network.channel(&key).unwrap().gain(), expected);
        }
    }

    #[test]
    fn step_is_deterministic_for_a_seed() {
        let (_, _, mut a) = build(3, 21);
        let (_, _, mut b) = build(3, 21);
        a.step();
        b.step();
        for key in a.keys() {
            assert_eq!(a.csi(&key).unwrap(), b.csi(&key).unwrap());
        }
    }

    #[test]
    fn channels_own_distinct_csi() {
        let (_, _, network) = build(1, 9);
        let a = network.csi(&ChannelKey::new(0, 0, 0, 0)).unwrap();
        let b = network.csi(&ChannelKey::new(0, 1, 0, 0)).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn per_channel_seeds_differ() {
        let k1 = ChannelKey::new(0, 0, 0, 1);
        let k2 = ChannelKey::new(0, 0, 1, 0);
        assert_ne!(channel_seed(1, &k1), channel_seed(1, &k2));
        assert_ne!(channel_seed(1, &k1), channel_seed(2, &k1));
    }
}
