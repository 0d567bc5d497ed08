//! Hex-grid topology and the geometric helpers built on it.
//!
//! Contains helper functions for:
//! - Cell placement on the center cell plus its first hex ring
//! - Sector antenna placement at three corners of each cell
//! - Terminal placement in an annulus around each sector
//! - Distances, bearings and hex hop distances used by the neighbor filter

use rand::Rng;
use rand::rngs::StdRng;
use std::f64::consts::PI;

use super::types::{Cell, MAX_CELLS, Point, Point3, SECTORS_PER_CELL, Sector, Terminal};
use crate::common::config::TopologyConfig;
use crate::common::error::{Result, SimulationError};

/// Angular width of the arc a sector's terminal is drawn from.
const SECTOR_ARC: f64 = 2.0 * PI / SECTORS_PER_CELL as f64;

/// Tolerance applied when rounding distances to hex hops.
const HOP_EPSILON: f64 = 1e-9;

/// Place `cell_number` cell centers: cell 0 at the origin, cell i on the first
/// ring at angle π/6 + (i-1)·π/3 and distance `cell_size`·√3.
pub fn cell_positions(cell_number: usize, cell_size: f64) -> Result<Vec<Point>> {
    if cell_number == 0 || cell_number > MAX_CELLS {
        return Err(SimulationError::Configuration(format!(
            "cell_number {} must be between 1 and {}",
            cell_number, MAX_CELLS
        )));
    }
    if !(cell_size > 0.0) {
        return Err(SimulationError::Configuration(format!("cell_size {} must be positive", cell_size)));
    }

    let ring = cell_size * 3f64.sqrt();
    let mut positions = Vec::with_capacity(cell_number);
    positions.push(Point { x: 0.0, y: 0.0 });
    for i in 1..cell_number {
        let theta = PI / 6.0 + (i - 1) as f64 * PI / 3.0;
        positions.push(Point {
            x: ring * theta.cos(),
            y: ring * theta.sin(),
        });
    }
    Ok(positions)
}

/// Angle of sector `k`'s antenna corner as seen from the cell center: 240°, 0°, 120°.
fn sector_corner_angle(k: usize) -> f64 {
    (4.0 * PI / 3.0 + k as f64 * SECTOR_ARC).rem_euclid(2.0 * PI)
}

/// Build the three sectors of the cell centered at `center`.
///
/// Each antenna sits on a cell corner at distance `cell_size` and faces back
/// across the cell, so its boresight is the middle of the arc its terminal is
/// drawn from.
pub fn generate_sectors(cell_index: usize, center: &Point, cell_size: f64, bs_height: f64) -> [Sector; SECTORS_PER_CELL] {
    std::array::from_fn(|k| {
        let corner = sector_corner_angle(k);
        let position = Point3 {
            x: center.x + cell_size * corner.cos(),
            y: center.y + cell_size * corner.sin(),
            z: bs_height,
        };
        let boresight = (corner + PI).rem_euclid(2.0 * PI);
        Sector::new(k, cell_index, position, boresight)
    })
}

/// Uniform draws (radius, angle) in [0, 1) for each sector's terminal.
pub type TerminalSeeds = [(f64, f64); SECTORS_PER_CELL];

/// Draw one set of terminal offsets: all radius draws first, then the angles.
pub fn draw_terminal_seeds(rng: &mut StdRng) -> TerminalSeeds {
    let radius: [f64; SECTORS_PER_CELL] = std::array::from_fn(|_| rng.gen_range(0.0..1.0));
    let angle: [f64; SECTORS_PER_CELL] = std::array::from_fn(|_| rng.gen_range(0.0..1.0));
    std::array::from_fn(|i| (radius[i], angle[i]))
}

/// Place one terminal per sector inside the annulus [r_min, r_max] around the
/// sector antenna, within the 120° arc [120°·i, 120°·i + 120°].
pub fn generate_terminals(cell_index: usize, sectors: &[Sector; SECTORS_PER_CELL], seeds: &TerminalSeeds, config: &TopologyConfig) -> [Terminal; SECTORS_PER_CELL] {
    std::array::from_fn(|i| {
        let (radius_seed, angle_seed) = seeds[i];
        let r = (config.r_max - config.r_min) * radius_seed + config.r_min;
        let theta = (angle_seed + i as f64) * SECTOR_ARC;
        let anchor = &sectors[i].position;
        Terminal {
            index: cell_index * SECTORS_PER_CELL + i,
            cell_index,
            sector_index: i,
            position: Point3 {
                x: anchor.x + r * theta.cos(),
                y: anchor.y + r * theta.sin(),
                z: config.ut_height,
            },
        }
    })
}

/// Generate every cell with its sectors and terminals.
///
/// With `shared_terminal_layout` the terminal offsets are drawn once and reused by
/// every cell, so a single model can be shared across cells.
pub fn generate_cells(config: &TopologyConfig, rng: &mut StdRng) -> Result<Vec<Cell>> {
    if !(config.r_min > 0.0) || config.r_min > config.r_max {
        return Err(SimulationError::Configuration(format!(
            "terminal annulus [{}, {}] is invalid",
            config.r_min, config.r_max
        )));
    }
    if config.bs_height < 0.0 || config.ut_height < 0.0 {
        return Err(SimulationError::Configuration("antenna heights must be non-negative".to_string()));
    }

    let positions = cell_positions(config.cell_number, config.cell_size)?;
    let shared_seeds = config.shared_terminal_layout.then(|| draw_terminal_seeds(rng));

    let cells: Vec<Cell> = positions
        .into_iter()
        .enumerate()
        .map(|(index, position)| {
            let sectors = generate_sectors(index, &position, config.cell_size, config.bs_height);
            let seeds = shared_seeds.unwrap_or_else(|| draw_terminal_seeds(rng));
            let terminals = generate_terminals(index, &sectors, &seeds, config);
            Cell {
                index,
                position,
                sectors,
                terminals,
            }
        })
        .collect();

    for cell in &cells {
        log::debug!("Cell {} at ({:.1}, {:.1})", cell.index, cell.position.x, cell.position.y);
    }
    Ok(cells)
}

/// Euclidean distance between two antennas, height included.
pub fn distance3(a: &Point3, b: &Point3) -> f64 {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    let dz = a.z - b.z;
    (dx * dx + dy * dy + dz * dz).sqrt()
}

/// Ground-plane bearing from `from` to `to` in radians, in [0, 2π).
pub fn bearing(from: &Point, to: &Point) -> f64 {
    (to.y - from.y).atan2(to.x - from.x).rem_euclid(2.0 * PI)
}

/// Smallest absolute difference between two angles, in [0, π].
pub fn angular_difference(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(2.0 * PI);
    if d > PI { 2.0 * PI - d } else { d }
}

/// Number of hex hops between two cell centers of a grid with radius `cell_size`.
pub fn hop_distance(a: &Point, b: &Point, cell_size: f64) -> usize {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    let hops = (dx * dx + dy * dy).sqrt() / (cell_size * 3f64.sqrt());
    (hops - HOP_EPSILON).ceil().max(0.0) as usize
}
