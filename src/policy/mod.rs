//! Decision-making policies.
//!
//! The simulation driver only knows the `Policy` trait: it calls `decide` once
//! per sector per time step and, for learning policies, hands over replay
//! batches. Concrete policies:
//! - `RandomPolicy`: uniform over the action space
//! - `MaxPowerPolicy`: highest power level, random codeword
//! - `EpsilonGreedyPolicy`: learned policy acting greedily on an external
//!   `QEstimator`, exploring with probability epsilon

pub mod replay;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::common::config::{RadioConfig, SimulationConfig};
use crate::simulation::types::Decision;
pub use replay::{Experience, ExperienceReplay, ReplayMemory};

/// Flattened action space over (power level, codeword) pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionSpace {
    pub power_levels: usize,
    pub codebook_size: usize,
}

impl ActionSpace {
    pub fn new(power_levels: usize, codebook_size: usize) -> Self {
        Self { power_levels, codebook_size }
    }

    /// Power levels × codewords of a radio configuration.
    pub fn from_config(radio: &RadioConfig) -> Self {
        Self::new(radio.power_levels_dbm.len(), radio.codebook_size)
    }

    pub fn size(&self) -> usize {
        self.power_levels * self.codebook_size
    }

    pub fn encode(&self, decision: &Decision) -> usize {
        decision.power_index * self.codebook_size + decision.precoding_index
    }

    pub fn decode(&self, index: usize) -> Decision {
        Decision::new(index / self.codebook_size, index % self.codebook_size)
    }

    pub fn sample(&self, rng: &mut StdRng) -> Decision {
        Decision::new(rng.gen_range(0..self.power_levels), rng.gen_range(0..self.codebook_size))
    }
}

/// What a policy may look at when deciding for one sector.
#[derive(Debug, Clone, Copy)]
pub struct DecisionContext<'a> {
    pub cell: usize,
    pub sector: usize,
    /// The cell's feature vector, present when `Policy::needs_observation` is true.
    pub observation: Option<&'a [f64]>,
    /// The sector's previously committed decision.
    pub history: Decision,
    /// Replay memory has not collected a full batch yet.
    pub warming_up: bool,
    /// False during evaluation runs.
    pub explore: bool,
}

pub trait Policy {
    fn name(&self) -> &str;

    fn decide(&mut self, context: &DecisionContext<'_>) -> Decision;

    /// Whether the driver must build observations before calling `decide`.
    fn needs_observation(&self) -> bool {
        false
    }

    /// Train on a replay batch; returns the loss for learning policies.
    fn learn(&mut self, _batch: &[Experience]) -> Option<f64> {
        None
    }

    /// Called once per training epoch.
    fn sync_target(&mut self) {}
}

#[derive(Debug)]
pub struct RandomPolicy {
    actions: ActionSpace,
    rng: StdRng,
}

impl RandomPolicy {
    pub fn new(actions: ActionSpace, seed: u64) -> Self {
        Self {
            actions,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Policy for RandomPolicy {
    fn name(&self) -> &str {
        "random"
    }

    fn decide(&mut self, _context: &DecisionContext<'_>) -> Decision {
        self.actions.sample(&mut self.rng)
    }
}

#[derive(Debug)]
pub struct MaxPowerPolicy {
    actions: ActionSpace,
    rng: StdRng,
}

impl MaxPowerPolicy {
    pub fn new(actions: ActionSpace, seed: u64) -> Self {
        Self {
            actions,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Policy for MaxPowerPolicy {
    fn name(&self) -> &str {
        "max-power"
    }

    fn decide(&mut self, _context: &DecisionContext<'_>) -> Decision {
        Decision::new(self.actions.power_levels - 1, self.rng.gen_range(0..self.actions.codebook_size))
    }
}

/// Action-value function of a learned policy. The model and its training
/// live outside this crate.
pub trait QEstimator {
    /// One value per flattened action for `sector`, given its cell's observation.
    fn q_values(&self, observation: &[f64], sector: usize) -> Vec<f64>;

    /// Fit on a batch of experiences, returning the training loss.
    fn train(&mut self, batch: &[Experience]) -> f64;

    /// Copy online parameters into the target network.
    fn update_target(&mut self);
}

/// Learned policy: greedy on the estimator's action values, uniformly random
/// with probability `epsilon`, during replay warm-up, or without an observation.
#[derive(Debug)]
pub struct EpsilonGreedyPolicy<Q> {
    estimator: Q,
    actions: ActionSpace,
    epsilon: f64,
    rng: StdRng,
}

impl<Q: QEstimator> EpsilonGreedyPolicy<Q> {
    pub fn new(estimator: Q, actions: ActionSpace, epsilon: f64, seed: u64) -> Self {
        Self {
            estimator,
            actions,
            epsilon: epsilon.clamp(0.0, 1.0),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Action space from the radio section, exploration rate from training,
    /// seeded from the topology seed.
    pub fn from_config(estimator: Q, config: &SimulationConfig) -> Self {
        Self::new(
            estimator,
            ActionSpace::from_config(&config.radio),
            config.training.epsilon,
            config.topology.seed,
        )
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn actions(&self) -> ActionSpace {
        self.actions
    }

    pub fn estimator(&self) -> &Q {
        &self.estimator
    }

    fn greedy(&self, observation: &[f64], sector: usize) -> Option<Decision> {
        let values = self.estimator.q_values(observation, sector);
        values
            .iter()
            .take(self.actions.size())
            .enumerate()
            .filter(|(_, v)| !v.is_nan())
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(index, _)| self.actions.decode(index))
    }
}

impl<Q: QEstimator> Policy for EpsilonGreedyPolicy<Q> {
    fn name(&self) -> &str {
        "epsilon-greedy"
    }

    fn decide(&mut self, context: &DecisionContext<'_>) -> Decision {
        let explore = context.warming_up || (context.explore && self.rng.gen_bool(self.epsilon));
        if !explore {
            if let Some(observation) = context.observation {
                if let Some(decision) = self.greedy(observation, context.sector) {
                    return decision;
                }
            }
        }
        self.actions.sample(&mut self.rng)
    }

    fn needs_observation(&self) -> bool {
        true
    }

    fn learn(&mut self, batch: &[Experience]) -> Option<f64> {
        Some(self.estimator.train(batch))
    }

    fn sync_target(&mut self) {
        self.estimator.update_target();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(observation: Option<&[f64]>) -> DecisionContext<'_> {
        DecisionContext {
            cell: 0,
            sector: 1,
            observation,
            history: Decision::default(),
            warming_up: false,
            explore: true,
        }
    }

    /// Prefers the action whose index equals the sector plus the first feature.
    struct FixedEstimator {
        trained: usize,
        synced: usize,
    }

    impl QEstimator for FixedEstimator {
        fn q_values(&self, observation: &[f64], sector: usize) -> Vec<f64> {
            let best = sector + observation[0] as usize;
            (0..6).map(|i| if i == best { 1.0 } else { 0.0 }).collect()
        }

        fn train(&mut self, batch: &[Experience]) -> f64 {
            self.trained += batch.len();
            0.5
        }

        fn update_target(&mut self) {
            self.synced += 1;
        }
    }

    #[test]
    fn action_index_round_trip() {
        let space = ActionSpace::new(4, 3);
        for index in 0..space.size() {
            let decision = space.decode(index);
            assert!(decision.power_index < 4 && decision.precoding_index < 3);
            assert_eq!(space.encode(&decision), index);
        }
        assert_eq!(space.decode(7), Decision::new(2, 1));
    }

    #[test]
    fn random_policy_stays_in_range_and_is_seeded() {
        let space = ActionSpace::new(3, 5);
        let mut a = RandomPolicy::new(space, 9);
        let mut b = RandomPolicy::new(space, 9);
        for _ in 0..200 {
            let d = a.decide(&context(None));
            assert!(d.power_index < 3 && d.precoding_index < 5);
            assert_eq!(d, b.decide(&context(None)));
        }
    }

    #[test]
    fn max_power_always_picks_top_level() {
        let mut policy = MaxPowerPolicy::new(ActionSpace::new(4, 2), 1);
        for _ in 0..50 {
            let d = policy.decide(&context(None));
            assert_eq!(d.power_index, 3);
            assert!(d.precoding_index < 2);
        }
        assert!(!policy.needs_observation());
    }

    #[test]
    fn greedy_follows_estimator_without_exploration() {
        let space = ActionSpace::new(3, 2);
        let mut policy = EpsilonGreedyPolicy::new(FixedEstimator { trained: 0, synced: 0 }, space, 0.0, 4);
        let observation = [2.0];
        // sector 1 + feature 2 => action 3 => (1, 1)
        assert_eq!(policy.decide(&context(Some(&observation))), Decision::new(1, 1));
        assert!(policy.needs_observation());
    }

    #[test]
    fn warm_up_and_missing_observation_fall_back_to_random() {
        let space = ActionSpace::new(3, 2);
        let mut policy = EpsilonGreedyPolicy::new(FixedEstimator { trained: 0, synced: 0 }, space, 0.0, 4);
        let observation = [2.0];
        let mut warm = context(Some(&observation));
        warm.warming_up = true;
        let picks: Vec<Decision> = (0..100).map(|_| policy.decide(&warm)).collect();
        assert!(picks.iter().any(|d| *d != Decision::new(1, 1)));
        let picks: Vec<Decision> = (0..100).map(|_| policy.decide(&context(None))).collect();
        assert!(picks.iter().any(|d| *d != Decision::new(1, 1)));
    }

    #[test]
    fn built_from_training_and_radio_sections() {
        let mut config = SimulationConfig::default();
        config.training.epsilon = 0.0;
        config.radio.power_levels_dbm = vec![0.0, 3.0, 6.0];
        config.radio.codebook_size = 2;
        let mut policy = EpsilonGreedyPolicy::from_config(FixedEstimator { trained: 0, synced: 0 }, &config);
        assert_eq!(policy.epsilon(), 0.0);
        assert_eq!(policy.actions(), ActionSpace::new(3, 2));
        let observation = [4.0];
        // sector 1 + feature 4 => action 5 => (2, 1), never explored away with epsilon 0
        for _ in 0..20 {
            assert_eq!(policy.decide(&context(Some(&observation))), Decision::new(2, 1));
        }

        config.training.epsilon = 0.25;
        let policy = EpsilonGreedyPolicy::from_config(FixedEstimator { trained: 0, synced: 0 }, &config);
        assert_eq!(policy.epsilon(), 0.25);
    }

    #[test]
    fn learning_hooks_reach_the_estimator() {
        let space = ActionSpace::new(3, 2);
        let mut policy = EpsilonGreedyPolicy::new(FixedEstimator { trained: 0, synced: 0 }, space, 1.0, 4);
        let batch = vec![
            Experience {
                state: vec![0.0],
                actions: vec![0, 1, 2],
                reward: 1.0,
                next_state: vec![0.0],
            };
            3
        ];
        assert_eq!(policy.learn(&batch), Some(0.5));
        policy.sync_target();
        assert_eq!(policy.estimator().trained, 3);
        assert_eq!(policy.estimator().synced, 1);
        assert_eq!(RandomPolicy::new(space, 0).learn(&batch), None);
    }
}
