//! Prioritized replay buffer.
//!
//! This module composes the circular transition store with a sum tree over its slots. It
//! supports:
//! - Uniform experience replay
//! - Prioritized experience replay (PER) with importance sampling weights
//! - Sampling restricted to the most recent transitions
mod iw_scheduler;
mod sum_tree;
use super::{PerConfig, ReplayBufferConfig, ReplayStore, TransitionBatch};
use crate::{error::LevelReplayError, ExperienceBufferBase, ReplayBufferBase};
use anyhow::Result;
pub use iw_scheduler::IwScheduler;
use log::{debug, info, trace, warn};
use ndarray::ArrayD;
use rand::{rngs::StdRng, Rng, SeedableRng};
pub use sum_tree::SumTree;

/// State management for Prioritized Experience Replay (PER).
struct PerState {
    /// Priorities of the slots of the store.
    sum_tree: SumTree,

    /// Scheduler for the importance sampling exponent.
    iw_scheduler: IwScheduler,

    /// Largest priority seen so far, given to newly added transitions.
    max_priority: f32,
}

impl PerState {
    fn new(capacity: usize, per_config: &PerConfig) -> Result<Self, LevelReplayError> {
        Ok(Self {
            sum_tree: SumTree::new(capacity)?,
            iw_scheduler: IwScheduler::new(per_config.beta_0, per_config.beta_increment),
            max_priority: 1.0,
        })
    }

    /// Importance sampling weights $w_i=P(i)^{-\beta}$, normalized by the largest weight
    /// in the batch.
    fn weights(&self, ixs: &[usize], beta: f32) -> Result<Vec<f32>, LevelReplayError> {
        let total = self.sum_tree.total();
        let ws = ixs
            .iter()
            .map(|&ix| Ok((self.sum_tree.leaf_priority(ix)? / total).powf(-beta)))
            .collect::<Result<Vec<f32>, LevelReplayError>>()?;
        let w_max = ws.iter().fold(0f32, |m, &w| m.max(w));

        Ok(ws.iter().map(|w| w / w_max).collect())
    }
}

/// A replay buffer with optional prioritized sampling.
///
/// Transitions are kept in a [`ReplayStore`]. When prioritized experience replay is enabled,
/// a [`SumTree`] holds one priority per slot and is updated in lock-step with every write:
/// new transitions get the largest priority seen so far so that they are sampled at least
/// once before being re-scored by the learner.
///
/// # Examples
///
/// ```ignore
/// let config = ReplayBufferConfig::default()
///     .capacity(10000)
///     .state_shape(vec![4])
///     .per_config(Some(PerConfig::default()));
/// let mut buffer = PrioritizedReplayBuffer::build(&config)?;
///
/// buffer.push(transitions)?;
/// let batch = buffer.sample()?;
/// let td_errs = learner.train(&batch);
/// buffer.update_priority(&batch.ix_sample.unwrap(), &td_errs)?;
/// ```
pub struct PrioritizedReplayBuffer {
    store: ReplayStore,

    /// Batch size of [`PrioritizedReplayBuffer::sample`].
    batch_size: usize,

    /// Random number generator for sampling.
    rng: StdRng,

    /// State for prioritized experience replay, if enabled.
    per_state: Option<PerState>,
}

impl PrioritizedReplayBuffer {
    /// Adds a batch of transitions given as separate arrays.
    ///
    /// `is_done` flags are stored inverted, as continuation flags.
    pub fn add(
        &mut self,
        states: ArrayD<f32>,
        actions: Vec<i64>,
        next_states: ArrayD<f32>,
        rewards: Vec<f32>,
        is_done: &[bool],
        tags: Vec<i64>,
    ) -> Result<()> {
        self.push(TransitionBatch::new(
            states,
            actions,
            next_states,
            rewards,
            is_done,
            tags,
        ))
    }

    /// Samples a batch of the configured size.
    pub fn sample(&mut self) -> Result<TransitionBatch> {
        self.batch(self.batch_size)
    }

    /// Samples uniformly among the `c_k` most recently added transitions.
    ///
    /// `c_k` is clamped to `[1, len]`. Weights are all 1 and the importance sampling
    /// exponent is left unchanged.
    pub fn sample_recent(&mut self, size: usize, c_k: usize) -> Result<TransitionBatch> {
        let len = self.store.len();
        if len == 0 {
            return Err(LevelReplayError::EmptyBuffer.into());
        }

        let window = c_k.max(1).min(len);
        if window != c_k {
            warn!("Window of {} transitions clamped to {}", c_k, window);
        }
        let ixs = (0..size)
            .map(|_| self.store.recent_slot(self.rng.gen_range(0..window)))
            .collect::<Vec<_>>();
        trace!("Sampled {} transitions from the latest {}", size, window);

        let mut batch = self.store.sample_indices(&ixs);
        batch.weight = Some(vec![1.0; size]);
        batch.ix_sample = Some(ixs);
        Ok(batch)
    }

    /// Returns `true` if sampling is prioritized.
    pub fn is_prioritized(&self) -> bool {
        self.per_state.is_some()
    }

    /// Maximum number of transitions.
    pub fn capacity(&self) -> usize {
        self.store.capacity()
    }

    /// Batch size of [`PrioritizedReplayBuffer::sample`].
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Current importance sampling exponent.
    pub fn beta(&self) -> Option<f32> {
        self.per_state.as_ref().map(|s| s.iw_scheduler.beta())
    }

    /// Priority given to newly added transitions.
    pub fn max_priority(&self) -> Option<f32> {
        self.per_state.as_ref().map(|s| s.max_priority)
    }

    /// Sum of all priorities.
    pub fn total_priority(&self) -> Option<f32> {
        self.per_state.as_ref().map(|s| s.sum_tree.total())
    }

    /// Priority of slot `ix`.
    pub fn priority(&self, ix: usize) -> Option<f32> {
        self.per_state
            .as_ref()
            .and_then(|s| s.sum_tree.leaf_priority(ix).ok())
    }

    /// Returns the number of terminal transitions in the buffer.
    pub fn num_done_flags(&self) -> usize {
        self.store.not_dones().iter().filter(|&&f| f == 0.0).count()
    }

    /// Returns the sum of all rewards in the buffer.
    pub fn sum_rewards(&self) -> f32 {
        self.store.rewards().iter().sum()
    }
}

impl ExperienceBufferBase for PrioritizedReplayBuffer {
    type Item = TransitionBatch;

    fn len(&self) -> usize {
        self.store.len()
    }

    /// Writes the transitions and, when prioritized, gives every written slot the largest
    /// priority seen so far.
    fn push(&mut self, tr: Self::Item) -> Result<()> {
        let slots = self.store.add(&tr)?;

        if let Some(per_state) = &mut self.per_state {
            for &slot in slots.iter() {
                per_state.sum_tree.set(slot, per_state.max_priority)?;
            }
        }

        Ok(())
    }
}

impl ReplayBufferBase for PrioritizedReplayBuffer {
    type Config = ReplayBufferConfig;
    type Batch = TransitionBatch;

    fn build(config: &Self::Config) -> Result<Self> {
        config.validate()?;
        let capacity = config.capacity;
        let per_state = match &config.per_config {
            Some(per_config) => Some(PerState::new(capacity, per_config)?),
            None => None,
        };
        info!(
            "Replay buffer: capacity={}, state_shape={:?}, prioritized={}",
            capacity,
            config.state_shape,
            per_state.is_some()
        );

        Ok(Self {
            store: ReplayStore::new(capacity, &config.state_shape)?,
            batch_size: config.batch_size,
            rng: StdRng::seed_from_u64(config.seed),
            per_state,
        })
    }

    /// Samples a batch of transitions from the buffer.
    ///
    /// If prioritized experience replay is enabled, samples are selected according to their
    /// priorities and the importance sampling exponent is advanced afterwards. Otherwise,
    /// uniform random sampling is used and all weights are 1.
    fn batch(&mut self, size: usize) -> Result<Self::Batch> {
        let len = self.store.len();
        if len == 0 {
            return Err(LevelReplayError::EmptyBuffer.into());
        }

        let (ixs, weight) = if let Some(per_state) = &mut self.per_state {
            let beta = per_state.iw_scheduler.beta();
            let ixs = per_state.sum_tree.sample(size, &mut self.rng)?;
            let weight = per_state.weights(&ixs, beta)?;
            per_state.iw_scheduler.add_n_samples();
            debug!("beta: {} -> {}", beta, per_state.iw_scheduler.beta());
            (ixs, weight)
        } else {
            let ixs = (0..size)
                .map(|_| self.rng.gen_range(0..len))
                .collect::<Vec<_>>();
            (ixs, vec![1.0; size])
        };
        trace!("Sampled indices: {:?}", ixs);

        let mut batch = self.store.sample_indices(&ixs);
        batch.ix_sample = Some(ixs);
        batch.weight = Some(weight);
        Ok(batch)
    }

    /// Updates the priorities of sampled transitions.
    ///
    /// Priorities are stored as given. Duplicated indices keep their first priority.
    /// Does nothing if prioritized experience replay is disabled. Indices of slots that hold
    /// no transition are rejected.
    fn update_priority(&mut self, ixs: &[usize], priorities: &[f32]) -> Result<()> {
        if let Some(per_state) = &mut self.per_state {
            let len = self.store.len();
            if let Some(&ix) = ixs.iter().find(|&&ix| ix >= len) {
                return Err(LevelReplayError::InvalidIndex {
                    index: ix,
                    capacity: len,
                }
                .into());
            }
            per_state.sum_tree.batch_set(ixs, priorities)?;

            let p_max = priorities.iter().fold(per_state.max_priority, |m, &p| m.max(p));
            if p_max > per_state.max_priority {
                debug!("max_priority: {} -> {}", per_state.max_priority, p_max);
                per_state.max_priority = p_max;
            }
        }
        Ok(())
    }
}
