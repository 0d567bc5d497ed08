//! Type definitions for the simulation.
//!
//! Contains the data structures shared across components:
//! - Positions and the cell/sector/terminal hierarchy
//! - Per-sector decisions with their one-step history
//! - The structured channel key used by the network state

use serde::{Deserialize, Serialize};

/// Every cell is split into three 120° sectors.
pub const SECTORS_PER_CELL: usize = 3;

/// The hex layout supports the center cell plus one ring of six.
pub const MAX_CELLS: usize = 7;

/// Position on the ground plane in meters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Antenna position in meters, `z` being the height above ground.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub fn ground(&self) -> Point {
        Point { x: self.x, y: self.y }
    }
}

/// A sector's resource allocation choice for one time step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Decision {
    /// Index into the configured power levels.
    pub power_index: usize,
    /// Index into the precoding codebook.
    pub precoding_index: usize,
}

impl Decision {
    pub fn new(power_index: usize, precoding_index: usize) -> Self {
        Self { power_index, precoding_index }
    }
}

/// Identifies the channel from sector `(tx_cell, tx_sector)` to the terminal
/// served by sector `(rx_cell, rx_sector)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChannelKey {
    pub tx_cell: u8,
    pub tx_sector: u8,
    pub rx_cell: u8,
    pub rx_sector: u8,
}

impl ChannelKey {
    /// Indices beyond a byte saturate to `u8::MAX`, which no topology contains.
    pub fn new(tx_cell: usize, tx_sector: usize, rx_cell: usize, rx_sector: usize) -> Self {
        let byte = |index: usize| u8::try_from(index).unwrap_or(u8::MAX);
        Self {
            tx_cell: byte(tx_cell),
            tx_sector: byte(tx_sector),
            rx_cell: byte(rx_cell),
            rx_sector: byte(rx_sector),
        }
    }

    pub fn is_intra_cell(&self) -> bool {
        self.tx_cell == self.rx_cell
    }

    /// The same pair with transmitter and receiver roles exchanged.
    pub fn reversed(&self) -> Self {
        Self {
            tx_cell: self.rx_cell,
            tx_sector: self.rx_sector,
            rx_cell: self.tx_cell,
            rx_sector: self.tx_sector,
        }
    }

    /// Packs the key into one integer, used to derive per-channel RNG seeds.
    pub fn packed(&self) -> u32 {
        u32::from_be_bytes([self.tx_cell, self.tx_sector, self.rx_cell, self.rx_sector])
    }
}

impl std::fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{})->({},{})", self.tx_cell, self.tx_sector, self.rx_cell, self.rx_sector)
    }
}

/// One directional antenna array of a cell.
#[derive(Debug, Clone)]
pub struct Sector {
    pub index: usize,
    pub cell_index: usize,
    pub position: Point3,
    /// Direction the sector's beam points at, in radians.
    pub boresight: f64,
    decision: Decision,
    decision_history: Decision,
}

impl Sector {
    pub fn new(index: usize, cell_index: usize, position: Point3, boresight: f64) -> Self {
        Self {
            index,
            cell_index,
            position,
            boresight,
            decision: Decision::default(),
            decision_history: Decision::default(),
        }
    }

    /// Commit a new decision; the previous one becomes the history.
    pub fn set_decision(&mut self, decision: Decision) {
        self.decision_history = self.decision;
        self.decision = decision;
    }

    pub fn decision(&self) -> Decision {
        self.decision
    }

    /// The decision committed one step before the current one.
    pub fn decision_history(&self) -> Decision {
        self.decision_history
    }
}

/// A user terminal served by one sector.
#[derive(Debug, Clone)]
pub struct Terminal {
    pub index: usize,
    pub cell_index: usize,
    pub sector_index: usize,
    pub position: Point3,
}

/// A base station with its three sectors and their terminals.
#[derive(Debug, Clone)]
pub struct Cell {
    pub index: usize,
    pub position: Point,
    pub sectors: [Sector; SECTORS_PER_CELL],
    pub terminals: [Terminal; SECTORS_PER_CELL],
}

impl Cell {
    pub fn decisions(&self) -> [Decision; SECTORS_PER_CELL] {
        [self.sectors[0].decision(), self.sectors[1].decision(), self.sectors[2].decision()]
    }

    pub fn decision_history(&self) -> [Decision; SECTORS_PER_CELL] {
        [
            self.sectors[0].decision_history(),
            self.sectors[1].decision_history(),
            self.sectors[2].decision_history(),
        ]
    }
}
