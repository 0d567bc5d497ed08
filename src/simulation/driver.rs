//! Time-stepped simulation driver.
//!
//! One `step` runs the full cycle over the owned `SimulationState`:
//! 1. Decide: query the policy once per sector
//! 2. Commit: write every decision into the ledger
//! 3. Reward: per-cell mean capacity under the committed decisions
//! 4. Advance: evolve every channel
//! 5. Observe: feature vectors from the new channels (learned policies only)
//! 6. Record: reward log, and replay experiences while training
//!
//! There is no intrinsic termination; `train` and `evaluate` run a given
//! number of steps.

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::observation::build_observation;
use super::signal_calculations::calculate_reward;
use super::state::SimulationState;
use super::types::{Decision, SECTORS_PER_CELL};
use crate::common::config::{SimulationConfig, TrainingConfig};
use crate::common::error::Result;
use crate::policy::{ActionSpace, DecisionContext, Experience, ExperienceReplay, Policy, ReplayMemory};

/// Offset applied to the master seed for replay batch sampling.
const REPLAY_SEED_OFFSET: u64 = 0x5eed_0f_ba7c;

/// Per-step rewards and their means in step order, plus the training losses
/// of learning policies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RewardLog {
    pub rewards: Vec<Vec<f64>>,
    pub average_rewards: Vec<f64>,
    /// One entry per learning step.
    pub losses: Vec<f64>,
    /// Mean loss of every completed epoch.
    pub epoch_losses: Vec<f64>,
}

impl RewardLog {
    /// Append one step's per-cell rewards; returns their mean.
    pub fn record(&mut self, rewards: &[f64]) -> f64 {
        let average = if rewards.is_empty() {
            0.0
        } else {
            rewards.iter().sum::<f64>() / rewards.len() as f64
        };
        self.rewards.push(rewards.to_vec());
        self.average_rewards.push(average);
        average
    }

    pub fn record_loss(&mut self, loss: f64) {
        self.losses.push(loss);
    }

    pub fn len(&self) -> usize {
        self.average_rewards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.average_rewards.is_empty()
    }

    pub fn clear(&mut self) {
        self.rewards.clear();
        self.average_rewards.clear();
        self.losses.clear();
        self.epoch_losses.clear();
    }

    /// Mean of the per-step averages, 0 when empty.
    pub fn mean(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        self.average_rewards.iter().sum::<f64>() / self.len() as f64
    }

    /// Export under `<label>-rewards` and `<label>-average-rewards`, and
    /// `<label>-loss` once any loss was recorded.
    pub fn export(&self, label: &str) -> BTreeMap<String, Value> {
        let mut map = BTreeMap::new();
        self.export_into(label, &mut map);
        map
    }

    pub fn export_into(&self, label: &str, map: &mut BTreeMap<String, Value>) {
        map.insert(format!("{}-rewards", label), Value::from(self.rewards.clone()));
        map.insert(format!("{}-average-rewards", label), Value::from(self.average_rewards.clone()));
        if !self.losses.is_empty() {
            map.insert(format!("{}-loss", label), Value::from(self.losses.clone()));
        }
    }
}

/// Running sums of the current training epoch.
#[derive(Debug, Clone, Copy, Default)]
struct EpochProgress {
    index: usize,
    steps: usize,
    reward: f64,
    loss: f64,
}

/// Result of one time step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    /// Committed decisions in `cell * 3 + sector` order.
    pub decisions: Vec<Decision>,
    /// Per-cell rewards in cell index order.
    pub rewards: Vec<f64>,
    pub average: f64,
}

pub struct SimulationDriver {
    state: SimulationState,
    policy: Box<dyn Policy>,
    actions: ActionSpace,
    training: TrainingConfig,
    replay: ReplayMemory,
    rng: StdRng,
    /// Current per-cell observations; empty unless the policy needs them.
    observations: Vec<Vec<f64>>,
    log: RewardLog,
    epoch: EpochProgress,
    explore: bool,
    time_slot: usize,
}

impl SimulationDriver {
    /// Build the simulation state from `config` and drive it with `policy`.
    pub fn new(config: &SimulationConfig, policy: Box<dyn Policy>) -> Result<Self> {
        let state = SimulationState::new(config)?;
        Ok(Self::with_state(state, config, policy))
    }

    pub fn with_state(state: SimulationState, config: &SimulationConfig, policy: Box<dyn Policy>) -> Self {
        let actions = ActionSpace::from_config(&config.radio);
        Self {
            state,
            policy,
            actions,
            training: config.training.clone(),
            replay: ReplayMemory::new(config.training.replay_capacity),
            rng: StdRng::seed_from_u64(config.topology.seed.wrapping_add(REPLAY_SEED_OFFSET)),
            observations: Vec::new(),
            log: RewardLog::default(),
            epoch: EpochProgress::default(),
            explore: true,
            time_slot: 0,
        }
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn policy_name(&self) -> &str {
        self.policy.name()
    }

    pub fn replay(&self) -> &ReplayMemory {
        &self.replay
    }

    pub fn reward_log(&self) -> &RewardLog {
        &self.log
    }

    pub fn clear_reward_log(&mut self) {
        self.log.clear();
    }

    /// Steps run since construction, across all runs.
    pub fn time_slot(&self) -> usize {
        self.time_slot
    }

    /// Swap the policy. Replay memory belongs to the previous policy and is cleared.
    pub fn set_policy(&mut self, policy: Box<dyn Policy>) {
        log::info!("Switching policy {} -> {}", self.policy.name(), policy.name());
        self.policy = policy;
        self.replay.clear();
        self.observations.clear();
        self.epoch = EpochProgress::default();
    }

    fn observe_all(&self) -> Result<Vec<Vec<f64>>> {
        (0..self.state.cells().len()).map(|cell| build_observation(&self.state, cell)).collect()
    }

    /// Run one time step.
    pub fn step(&mut self) -> Result<StepOutcome> {
        let needs_observation = self.policy.needs_observation();
        if needs_observation && self.observations.len() != self.state.cells().len() {
            self.observations = self.observe_all()?;
        }
        let warming_up = self.replay.len() < self.training.batch_size;

        let mut decisions = Vec::with_capacity(self.state.sector_count());
        for cell in self.state.cells() {
            let observation = if needs_observation {
                self.observations.get(cell.index).map(Vec::as_slice)
            } else {
                None
            };
            for sector in &cell.sectors {
                let context = DecisionContext {
                    cell: cell.index,
                    sector: sector.index,
                    observation,
                    history: sector.decision_history(),
                    warming_up,
                    explore: self.explore,
                };
                decisions.push(self.policy.decide(&context));
            }
        }

        self.state.commit(&decisions)?;
        let rewards = calculate_reward(&self.state)?;
        self.state.advance();

        if needs_observation {
            let next = self.observe_all()?;
            if self.explore {
                for (cell, (state, next_state)) in self.observations.iter().zip(&next).enumerate() {
                    let actions = decisions[cell * SECTORS_PER_CELL..(cell + 1) * SECTORS_PER_CELL]
                        .iter()
                        .map(|d| self.actions.encode(d))
                        .collect();
                    self.replay.push(Experience {
                        state: state.clone(),
                        actions,
                        reward: rewards[cell],
                        next_state: next_state.clone(),
                    });
                }
            }
            self.observations = next;
        }

        let average = self.log.record(&rewards);
        self.time_slot += 1;
        log::debug!("Time slot {}: average reward {:.4}", self.time_slot, average);
        Ok(StepOutcome {
            decisions,
            rewards,
            average,
        })
    }

    /// Run `slots` training steps. Once the replay memory holds more than a
    /// batch, every step trains the policy on one batch; `t_step` such
    /// learning steps close an epoch and sync the target. Warm-up steps do not
    /// count toward an epoch. Returns the mean reward over all `slots` steps.
    pub fn train(&mut self, slots: usize) -> Result<f64> {
        self.explore = true;
        let mut total = 0.0;
        for _ in 0..slots {
            let outcome = self.step()?;
            total += outcome.average;

            if self.replay.len() <= self.training.batch_size {
                continue;
            }
            let batch = self.replay.batch(self.training.batch_size, &mut self.rng);
            let Some(loss) = self.policy.learn(&batch) else {
                continue;
            };
            log::debug!("Time slot {}: loss {:.6}", self.time_slot, loss);
            self.log.record_loss(loss);
            self.epoch.steps += 1;
            self.epoch.reward += outcome.average;
            self.epoch.loss += loss;

            if self.epoch.steps == self.training.t_step {
                self.policy.sync_target();
                let steps = self.epoch.steps as f64;
                let epoch_loss = self.epoch.loss / steps;
                self.epoch.index += 1;
                log::info!(
                    "Epoch {} ({}): average reward {:.4}, loss {:.6}",
                    self.epoch.index,
                    self.policy.name(),
                    self.epoch.reward / steps,
                    epoch_loss
                );
                self.log.epoch_losses.push(epoch_loss);
                self.epoch = EpochProgress {
                    index: self.epoch.index,
                    ..EpochProgress::default()
                };
            }
        }
        Ok(if slots == 0 { 0.0 } else { total / slots as f64 })
    }

    /// Run `times` steps without exploration or replay writes. The steps are
    /// returned in their own log and do not enter the driver's reward log.
    pub fn evaluate(&mut self, times: usize) -> Result<RewardLog> {
        let previous = std::mem::take(&mut self.log);
        let explore = std::mem::replace(&mut self.explore, false);
        let mut result = Ok(());
        for _ in 0..times {
            if let Err(e) = self.step() {
                result = Err(e);
                break;
            }
        }
        self.explore = explore;
        let evaluated = std::mem::replace(&mut self.log, previous);
        result?;
        log::info!("Evaluated {} over {} steps: mean reward {:.4}", self.policy.name(), times, evaluated.mean());
        Ok(evaluated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{EpsilonGreedyPolicy, QEstimator, RandomPolicy};
    use crate::simulation::observation::observation_size;
    use std::cell::Cell as Counter;
    use std::rc::Rc;

    struct FixedPolicy(Decision);

    impl Policy for FixedPolicy {
        fn name(&self) -> &str {
            "fixed"
        }

        fn decide(&mut self, _context: &DecisionContext<'_>) -> Decision {
            self.0
        }
    }

    #[derive(Default)]
    struct Counters {
        learned: Counter<usize>,
        synced: Counter<usize>,
    }

    struct CountingEstimator(Rc<Counters>);

    impl QEstimator for CountingEstimator {
        fn q_values(&self, _observation: &[f64], _sector: usize) -> Vec<f64> {
            vec![0.0, 1.0]
        }

        /// Reports the running number of training calls as its loss.
        fn train(&mut self, _batch: &[Experience]) -> f64 {
            self.0.learned.set(self.0.learned.get() + 1);
            self.0.learned.get() as f64
        }

        fn update_target(&mut self) {
            self.0.synced.set(self.0.synced.get() + 1);
        }
    }

    fn scalar_config() -> SimulationConfig {
        let mut config = SimulationConfig::default();
        config.topology.cell_number = 1;
        config.topology.seed = 17;
        config.radio.antenna_count = 1;
        config.radio.codeword_length = 1;
        config.radio.codebook_size = 1;
        config.radio.power_levels_dbm = vec![0.0, 1.0];
        config.radio.noise_power = 1.0;
        config.radio.path_loss_exponent = 0.0;
        config
    }

    fn run_fixed(decision: Decision, steps: usize) -> Vec<Vec<f64>> {
        let mut driver = SimulationDriver::new(&scalar_config(), Box::new(FixedPolicy(decision))).unwrap();
        (0..steps).map(|_| driver.step().unwrap().rewards).collect()
    }

    #[test]
    fn fixed_decisions_are_deterministic_and_power_helps() {
        let high = run_fixed(Decision::new(1, 0), 5);
        assert_eq!(high, run_fixed(Decision::new(1, 0), 5));
        let low = run_fixed(Decision::new(0, 0), 5);
        for (h, l) in high.iter().zip(&low) {
            assert_eq!(h.len(), 1);
            assert!(h[0] > l[0], "{} should exceed {}", h[0], l[0]);
        }
    }

    #[test]
    fn step_commits_decisions_before_advancing() {
        let mut config = SimulationConfig::default();
        config.topology.cell_number = 2;
        let mut driver = SimulationDriver::new(&config, Box::new(RandomPolicy::new(ActionSpace::new(4, 4), 5))).unwrap();
        let first = driver.step().unwrap();
        let second = driver.step().unwrap();
        assert_eq!(second.decisions.len(), 6);
        for cell in driver.state().cells() {
            for sector in &cell.sectors {
                let n = cell.index * SECTORS_PER_CELL + sector.index;
                assert_eq!(sector.decision(), second.decisions[n]);
                assert_eq!(sector.decision_history(), first.decisions[n]);
            }
        }
        assert_eq!(driver.reward_log().len(), 2);
        assert_eq!(driver.reward_log().average_rewards[1], second.average);
        // Baselines do not fill the replay memory.
        assert!(driver.replay().is_empty());
    }

    #[test]
    fn learned_policy_records_chained_experiences() {
        let mut config = SimulationConfig::default();
        config.topology.cell_number = 2;
        config.radio.antenna_count = 2;
        config.radio.codebook_size = 2;
        config.radio.power_levels_dbm = vec![0.0];
        let estimator = CountingEstimator(Rc::new(Counters::default()));
        let policy = EpsilonGreedyPolicy::new(estimator, ActionSpace::new(1, 2), 0.0, 1);
        let mut driver = SimulationDriver::new(&config, Box::new(policy)).unwrap();
        let outcomes: Vec<StepOutcome> = (0..3).map(|_| driver.step().unwrap()).collect();

        assert_eq!(driver.replay().len(), 6);
        let size = observation_size(driver.state());
        let records: Vec<&Experience> = driver.replay().iter().collect();
        for (n, record) in records.iter().enumerate() {
            assert_eq!(record.state.len(), size);
            assert_eq!(record.actions.len(), SECTORS_PER_CELL);
            assert_eq!(record.reward, outcomes[n / 2].rewards[n % 2]);
        }
        // The next state of a cell is its state on the following step.
        assert_eq!(records[0].next_state, records[2].state);
        assert_eq!(records[1].next_state, records[3].state);
    }

    #[test]
    fn train_learns_past_warm_up_and_syncs_each_epoch() {
        let mut config = scalar_config();
        config.training.batch_size = 2;
        config.training.replay_capacity = 10;
        config.training.t_step = 2;
        let counters = Rc::new(Counters::default());
        let policy = EpsilonGreedyPolicy::new(CountingEstimator(counters.clone()), ActionSpace::new(2, 1), 0.5, 3);
        let mut driver = SimulationDriver::new(&config, Box::new(policy)).unwrap();
        let mean = driver.train(5).unwrap();
        assert!(mean.is_finite() && mean > 0.0);
        // One experience per step: learning needs more than a batch, so it starts on step 3.
        assert_eq!(counters.learned.get(), 3);
        // Warm-up steps do not count: one epoch of two learning steps.
        assert_eq!(counters.synced.get(), 1);
        let log = driver.reward_log();
        assert_eq!(log.len(), 5);
        assert!((log.mean() - mean).abs() < 1e-12);
        assert_eq!(log.losses, vec![1.0, 2.0, 3.0]);
        assert_eq!(log.epoch_losses, vec![1.5]);
        assert_eq!(log.export("dql")["dql-loss"], serde_json::json!([1.0, 2.0, 3.0]));

        // The open epoch carries over into the next run.
        driver.train(1).unwrap();
        assert_eq!(counters.synced.get(), 2);
        assert_eq!(driver.reward_log().epoch_losses, vec![1.5, 3.5]);
    }

    #[test]
    fn evaluate_keeps_training_log_and_replay() {
        let config = scalar_config();
        let estimator = CountingEstimator(Rc::new(Counters::default()));
        let policy = EpsilonGreedyPolicy::new(estimator, ActionSpace::new(2, 1), 1.0, 3);
        let mut driver = SimulationDriver::new(&config, Box::new(policy)).unwrap();
        driver.train(2).unwrap();
        let evaluated = driver.evaluate(3).unwrap();
        assert_eq!(evaluated.len(), 3);
        assert_eq!(driver.reward_log().len(), 2);
        assert_eq!(driver.replay().len(), 2);
        assert_eq!(driver.time_slot(), 5);
    }

    #[test]
    fn set_policy_clears_replay() {
        let config = scalar_config();
        let estimator = CountingEstimator(Rc::new(Counters::default()));
        let policy = EpsilonGreedyPolicy::new(estimator, ActionSpace::new(2, 1), 1.0, 3);
        let mut driver = SimulationDriver::new(&config, Box::new(policy)).unwrap();
        driver.train(3).unwrap();
        assert_eq!(driver.replay().len(), 3);
        driver.set_policy(Box::new(FixedPolicy(Decision::new(1, 0))));
        assert!(driver.replay().is_empty());
        assert_eq!(driver.policy_name(), "fixed");
        assert_eq!(driver.step().unwrap().decisions, vec![Decision::new(1, 0); 3]);
    }

    #[test]
    fn reward_log_exports_labelled_series() {
        let mut log = RewardLog::default();
        assert_eq!(log.record(&[1.0, 3.0]), 2.0);
        log.record(&[2.0, 2.0]);
        let map = log.export("random");
        // No losses recorded, so no loss series.
        assert_eq!(map.len(), 2);
        assert_eq!(map["random-average-rewards"], serde_json::json!([2.0, 2.0]));
        assert_eq!(map["random-rewards"], serde_json::json!([[1.0, 3.0], [2.0, 2.0]]));
        log.clear();
        assert!(log.is_empty());
        assert_eq!(log.mean(), 0.0);
    }
}
