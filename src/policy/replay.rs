//! Experience replay for learned policies.

use rand::rngs::StdRng;
use rand::seq::index::sample;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// One transition of one cell: observation, flattened actions of its sectors,
/// the cell reward and the observation after the channels advanced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experience {
    pub state: Vec<f64>,
    pub actions: Vec<usize>,
    pub reward: f64,
    pub next_state: Vec<f64>,
}

pub trait ExperienceReplay {
    fn push(&mut self, experience: Experience);

    /// Up to `size` distinct experiences drawn uniformly without replacement.
    fn batch(&self, size: usize, rng: &mut StdRng) -> Vec<Experience>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Bounded FIFO memory; the oldest experience is dropped when full.
#[derive(Debug, Clone)]
pub struct ReplayMemory {
    capacity: usize,
    buffer: VecDeque<Experience>,
}

impl ReplayMemory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            buffer: VecDeque::with_capacity(capacity.min(1024)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Experience> {
        self.buffer.iter()
    }
}

impl ExperienceReplay for ReplayMemory {
    fn push(&mut self, experience: Experience) {
        if self.capacity == 0 {
            return;
        }
        if self.buffer.len() >= self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(experience);
    }

    fn batch(&self, size: usize, rng: &mut StdRng) -> Vec<Experience> {
        let amount = size.min(self.buffer.len());
        sample(rng, self.buffer.len(), amount)
            .into_iter()
            .map(|i| self.buffer[i].clone())
            .collect()
    }

    fn len(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn experience(reward: f64) -> Experience {
        Experience {
            state: vec![reward],
            actions: vec![0, 0, 0],
            reward,
            next_state: vec![reward + 1.0],
        }
    }

    #[test]
    fn drops_oldest_when_full() {
        let mut memory = ReplayMemory::new(3);
        assert!(memory.is_empty());
        for r in 0..5 {
            memory.push(experience(r as f64));
        }
        assert_eq!(memory.len(), 3);
        let rewards: Vec<f64> = memory.iter().map(|e| e.reward).collect();
        assert_eq!(rewards, vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn batch_draws_distinct_entries() {
        let mut memory = ReplayMemory::new(10);
        for r in 0..10 {
            memory.push(experience(r as f64));
        }
        let mut rng = StdRng::seed_from_u64(3);
        let batch = memory.batch(6, &mut rng);
        assert_eq!(batch.len(), 6);
        let mut rewards: Vec<i64> = batch.iter().map(|e| e.reward as i64).collect();
        rewards.sort_unstable();
        rewards.dedup();
        assert_eq!(rewards.len(), 6);

        assert_eq!(memory.batch(50, &mut rng).len(), 10);
    }

    #[test]
    fn zero_capacity_stores_nothing() {
        let mut memory = ReplayMemory::new(0);
        memory.push(experience(1.0));
        assert!(memory.is_empty());
        assert!(memory.batch(4, &mut StdRng::seed_from_u64(0)).is_empty());
    }
}
