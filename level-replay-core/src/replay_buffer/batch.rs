//! Batches of transitions exchanged with the replay buffer.
//!
//! The same structure is pushed into the buffer and returned by sampling. Sampled batches
//! additionally carry the slot indices they came from and their importance weights.
use crate::error::LevelReplayError;
use ndarray::{ArrayD, IxDyn};

/// A batch of transitions `(s_t, a_t, s_t+n, r_t, not_done_t, tag)`.
///
/// States are stored as one array whose first axis is the batch axis; the remaining axes are
/// the state shape, which is shared by every transition in a replay buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct TransitionBatch {
    /// States, shape `[batch, state_shape..]`.
    pub states: ArrayD<f32>,

    /// Discrete actions.
    pub actions: Vec<i64>,

    /// Next states, same shape as `states`.
    pub next_states: ArrayD<f32>,

    /// Rewards, possibly aggregated over several steps.
    pub rewards: Vec<f32>,

    /// `1.0` while the episode continues, `0.0` at termination.
    pub not_dones: Vec<f32>,

    /// Auxiliary tags, typically the seed of the level the transition was collected on.
    pub tags: Vec<i64>,

    /// Indices of sampled transitions.
    pub ix_sample: Option<Vec<usize>>,

    /// Importance sampling weights of sampled transitions.
    pub weight: Option<Vec<f32>>,
}

impl TransitionBatch {
    /// Builds a batch from its fields.
    ///
    /// `is_done` flags are inverted into the numeric `not_dones` field.
    pub fn new(
        states: ArrayD<f32>,
        actions: Vec<i64>,
        next_states: ArrayD<f32>,
        rewards: Vec<f32>,
        is_done: &[bool],
        tags: Vec<i64>,
    ) -> Self {
        Self {
            states,
            actions,
            next_states,
            rewards,
            not_dones: is_done.iter().map(|&d| if d { 0.0 } else { 1.0 }).collect(),
            tags,
            ix_sample: None,
            weight: None,
        }
    }

    /// Creates a batch without transitions for the given state shape.
    pub fn empty(state_shape: &[usize]) -> Self {
        let mut shape = vec![0];
        shape.extend_from_slice(state_shape);
        Self {
            states: ArrayD::zeros(IxDyn(&shape)),
            actions: vec![],
            next_states: ArrayD::zeros(IxDyn(&shape)),
            rewards: vec![],
            not_dones: vec![],
            tags: vec![],
            ix_sample: None,
            weight: None,
        }
    }

    /// Returns the number of transitions in the batch.
    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    /// Returns `true` if the batch has no transitions.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Shape of a single state, without the batch axis.
    pub fn state_shape(&self) -> &[usize] {
        &self.states.shape()[1..]
    }

    /// Checks that every field holds the same number of transitions.
    pub fn check(&self) -> Result<(), LevelReplayError> {
        let n = self.len();

        if self.states.ndim() == 0 {
            return Err(LevelReplayError::InvalidBatch(
                "states must have a batch axis".to_string(),
            ));
        }
        if self.states.shape() != self.next_states.shape() {
            return Err(LevelReplayError::InvalidBatch(format!(
                "states {:?} and next states {:?} differ in shape",
                self.states.shape(),
                self.next_states.shape()
            )));
        }

        let lens = [
            ("states", self.states.shape()[0]),
            ("actions", self.actions.len()),
            ("not_dones", self.not_dones.len()),
            ("tags", self.tags.len()),
        ];
        for (name, len) in lens.iter() {
            if *len != n {
                return Err(LevelReplayError::InvalidBatch(format!(
                    "{} has {} entries, rewards has {}",
                    name, len, n
                )));
            }
        }

        Ok(())
    }

    /// Decomposes the batch into its fields.
    #[allow(clippy::type_complexity)]
    pub fn unpack(
        self,
    ) -> (
        ArrayD<f32>,
        Vec<i64>,
        ArrayD<f32>,
        Vec<f32>,
        Vec<f32>,
        Vec<i64>,
        Option<Vec<usize>>,
        Option<Vec<f32>>,
    ) {
        (
            self.states,
            self.actions,
            self.next_states,
            self.rewards,
            self.not_dones,
            self.tags,
            self.ix_sample,
            self.weight,
        )
    }
}
