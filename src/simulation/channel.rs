//! Channel between one transmitting sector and one receiving terminal.
//!
//! A channel owns its CSI matrix (receive antennas × codeword length) and its
//! own RNG, so stepping channels in any order produces the same trajectory.
//! The small-scale fading process is a pluggable `FadingKernel`.

use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_1_SQRT_2;
use std::sync::Arc;

use super::linalg::CMatrix;
use super::types::ChannelKey;
use crate::common::error::{Result, SimulationError};

/// Numeric kernel drawing and evolving small-scale fading.
///
/// Implementations must keep the CSI distribution stationary: entries drawn by
/// `initial` and entries after any number of `evolve` calls share the same law,
/// zero-mean complex Gaussian with variance `gain`.
pub trait FadingKernel: std::fmt::Debug + Send + Sync {
    fn initial(&self, rows: usize, cols: usize, gain: f64, rng: &mut StdRng) -> CMatrix;
    fn evolve(&self, csi: &mut CMatrix, gain: f64, rng: &mut StdRng);
}

/// Sample one CN(0, 1) entry.
fn complex_gaussian(rng: &mut StdRng) -> Complex64 {
    let re: f64 = rng.sample(StandardNormal);
    let im: f64 = rng.sample(StandardNormal);
    Complex64::new(re * FRAC_1_SQRT_2, im * FRAC_1_SQRT_2)
}

/// Built-in fading processes, selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum FadingModel {
    /// First-order Gauss-Markov Rayleigh fading:
    /// `H ← ρ·H + √(1-ρ²)·√gain·E`, `E ~ CN(0, 1)`.
    GaussMarkov { correlation: f64 },
    /// Independent redraw on every step.
    BlockFading,
    /// Drawn once, never changes.
    Static,
}

impl Default for FadingModel {
    fn default() -> Self {
        FadingModel::GaussMarkov { correlation: 0.9 }
    }
}

impl FadingModel {
    pub fn validate(&self) -> Result<()> {
        match self {
            FadingModel::GaussMarkov { correlation } if !(0.0..=1.0).contains(correlation) => Err(SimulationError::Configuration(format!(
                "fading correlation {} must be within 0..=1",
                correlation
            ))),
            _ => Ok(()),
        }
    }
}

impl FadingKernel for FadingModel {
    fn initial(&self, rows: usize, cols: usize, gain: f64, rng: &mut StdRng) -> CMatrix {
        let amplitude = gain.sqrt();
        CMatrix::from_fn(rows, cols, |_, _| complex_gaussian(rng) * amplitude)
    }

    fn evolve(&self, csi: &mut CMatrix, gain: f64, rng: &mut StdRng) {
        let correlation = match self {
            FadingModel::GaussMarkov { correlation } => *correlation,
            FadingModel::BlockFading => 0.0,
            FadingModel::Static => return,
        };
        let innovation = (1.0 - correlation * correlation).sqrt() * gain.sqrt();
        for entry in csi.as_mut_slice() {
            *entry = *entry * correlation + complex_gaussian(rng) * innovation;
        }
    }
}

/// Wireless link from sector `key.tx_*` to the terminal of sector `key.rx_*`.
#[derive(Debug)]
pub struct Channel {
    key: ChannelKey,
    /// Large-scale power gain (path loss) applied to the fading variance.
    gain: f64,
    csi: CMatrix,
    kernel: Arc<dyn FadingKernel>,
    rng: StdRng,
}

impl Channel {
    pub fn new(key: ChannelKey, rows: usize, cols: usize, gain: f64, kernel: Arc<dyn FadingKernel>, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let csi = kernel.initial(rows, cols, gain, &mut rng);
        Self { key, gain, csi, kernel, rng }
    }

    pub fn key(&self) -> ChannelKey {
        self.key
    }

    #[cfg(test)]
    pub fn gain(&self) -> f64 {
        self.gain
    }

    /// Current channel state information.
    pub fn csi(&self) -> &CMatrix {
        &self.csi
    }

    /// Advance the fading process by one time step.
    pub fn step(&mut self) {
        self.kernel.evolve(&mut self.csi, self.gain, &mut self.rng);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(model: FadingModel, seed: u64) -> Channel {
        Channel::new(ChannelKey::new(0, 0, 0, 0), 4, 2, 1.0, Arc::new(model), seed)
    }

    #[test]
    fn csi_shape_is_constant() {
        let mut ch = channel(FadingModel::default(), 3);
        assert_eq!(ch.csi().shape(), (4, 2));
        for _ in 0..10 {
            ch.step();
            assert_eq!(ch.csi().shape(), (4, 2));
        }
    }

    #[test]
    fn same_seed_same_trajectory() {
        let mut a = channel(FadingModel::default(), 42);
        let mut b = channel(FadingModel::default(), 42);
        for _ in 0..5 {
            a.step();
            b.step();
        }
        assert_eq!(a.csi(), b.csi());
    }

    #[test]
    fn static_fading_never_changes() {
        let mut ch = channel(FadingModel::Static, 1);
        let before = ch.csi().clone();
        ch.step();
        assert_eq!(ch.csi(), &before);
    }

    #[test]
    fn gauss_markov_moves_and_stays_stationary() {
        let mut ch = Channel::new(ChannelKey::new(0, 0, 0, 0), 8, 8, 2.0, Arc::new(FadingModel::GaussMarkov { correlation: 0.5 }), 7);
        let before = ch.csi().clone();
        ch.step();
        assert_ne!(ch.csi(), &before);

        // Average entry power over many steps approaches the configured gain.
        let mut power = 0.0;
        let steps = 2000;
        for _ in 0..steps {
            ch.step();
            power += ch.csi().norm().powi(2) / 64.0;
        }
        let mean = power / steps as f64;
        assert!((mean - 2.0).abs() < 0.2, "mean entry power {}", mean);
    }

    #[test]
    fn correlation_outside_unit_interval_is_rejected() {
        assert!(FadingModel::GaussMarkov { correlation: 1.5 }.validate().is_err());
        assert!(FadingModel::GaussMarkov { correlation: 0.0 }.validate().is_ok());
        assert!(FadingModel::BlockFading.validate().is_ok());
    }
}
