//! Multi-step transitions for vectorized environments.
//!
//! Each environment process keeps a window of its last `multi_step` states, actions and
//! rewards. When the window is full, or the episode ends, one transition is emitted from the
//! oldest state of the window with the discounted sum of the rewards in the window.
use super::TransitionBatch;
use crate::error::LevelReplayError;
use ndarray::{stack, ArrayD, ArrayViewD, Axis};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Configuration of [`MultiStepProcessor`].
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct MultiStepProcessorConfig {
    /// Number of environment processes.
    pub n_procs: usize,

    /// Number of steps aggregated into one transition.
    pub multi_step: usize,

    /// Discount factor.
    pub gamma: f32,
}

impl Default for MultiStepProcessorConfig {
    fn default() -> Self {
        Self {
            n_procs: 1,
            multi_step: 3,
            gamma: 0.99,
        }
    }
}

impl MultiStepProcessorConfig {
    /// Sets the number of processes.
    pub fn n_procs(mut self, v: usize) -> Self {
        self.n_procs = v;
        self
    }

    /// Sets the number of aggregated steps.
    pub fn multi_step(mut self, v: usize) -> Self {
        self.multi_step = v;
        self
    }

    /// Sets the discount factor.
    pub fn gamma(mut self, v: f32) -> Self {
        self.gamma = v;
        self
    }
}

/// One step of every environment process.
#[derive(Clone, Debug)]
pub struct VecStep {
    /// States the actions were taken in, shape `[n_procs, state_shape..]`.
    pub states: ArrayD<f32>,

    /// Actions taken.
    pub actions: Vec<i64>,

    /// States after the actions.
    pub next_states: ArrayD<f32>,

    /// Immediate rewards.
    pub rewards: Vec<f32>,

    /// Episode termination flags.
    pub is_done: Vec<bool>,

    /// Seeds of the levels being played.
    pub tags: Vec<i64>,
}

#[derive(Default)]
struct Window {
    states: VecDeque<ArrayD<f32>>,
    actions: VecDeque<i64>,
    rewards: VecDeque<f32>,
}

impl Window {
    fn push(&mut self, max_len: usize, state: ArrayD<f32>, action: i64, reward: f32) {
        if self.rewards.len() == max_len {
            self.states.pop_front();
            self.actions.pop_front();
            self.rewards.pop_front();
        }
        self.states.push_back(state);
        self.actions.push_back(action);
        self.rewards.push_back(reward);
    }

    fn clear(&mut self) {
        self.states.clear();
        self.actions.clear();
        self.rewards.clear();
    }

    fn discounted_reward(&self, gamma: f32) -> f32 {
        self.rewards
            .iter()
            .enumerate()
            .map(|(j, r)| r * gamma.powi(j as i32))
            .sum()
    }
}

/// Converts steps of vectorized environments into multi-step transitions.
pub struct MultiStepProcessor {
    config: MultiStepProcessorConfig,
    windows: Vec<Window>,
}

impl MultiStepProcessor {
    /// Builds a processor.
    pub fn build(config: &MultiStepProcessorConfig) -> Result<Self, LevelReplayError> {
        if config.n_procs == 0 || config.multi_step == 0 {
            return Err(LevelReplayError::InvalidConfig(format!(
                "n_procs and multi_step must be positive: {:?}",
                config
            )));
        }

        Ok(Self {
            config: config.clone(),
            windows: (0..config.n_procs).map(|_| Window::default()).collect(),
        })
    }

    /// Discount applied to the value of the state reached after a transition.
    pub fn discount(&self) -> f32 {
        self.config.gamma.powi(self.config.multi_step as i32)
    }

    /// Forgets the pending steps of every process.
    pub fn reset(&mut self) {
        self.windows.iter_mut().for_each(Window::clear);
    }

    fn check(&self, step: &VecStep) -> Result<(), LevelReplayError> {
        let n = self.config.n_procs;
        let lens = [
            step.states.shape().first().copied().unwrap_or(0),
            step.next_states.shape().first().copied().unwrap_or(0),
            step.actions.len(),
            step.rewards.len(),
            step.is_done.len(),
            step.tags.len(),
        ];
        if lens.iter().any(|&l| l != n) || step.states.shape() != step.next_states.shape() {
            return Err(LevelReplayError::InvalidBatch(format!(
                "step does not hold one entry per process ({}): {:?}",
                n, lens
            )));
        }
        Ok(())
    }

    /// Processes one step of every process and returns the emitted transitions.
    ///
    /// The returned batch may be empty. When an episode ends, the window of its process is
    /// emitted once and cleared.
    pub fn process(&mut self, step: &VecStep) -> Result<TransitionBatch, LevelReplayError> {
        self.check(step)?;

        let max_len = self.config.multi_step;
        let gamma = self.config.gamma;
        let mut states = vec![];
        let mut next_states: Vec<ArrayViewD<f32>> = vec![];
        let mut actions = vec![];
        let mut rewards = vec![];
        let mut is_done = vec![];
        let mut tags = vec![];

        for (i, window) in self.windows.iter_mut().enumerate() {
            window.push(
                max_len,
                step.states.index_axis(Axis(0), i).to_owned(),
                step.actions[i],
                step.rewards[i],
            );

            if window.rewards.len() == max_len || step.is_done[i] {
                // A window is never empty right after a push.
                states.push(window.states[0].clone());
                actions.push(window.actions[0]);
                rewards.push(window.discounted_reward(gamma));
                next_states.push(step.next_states.index_axis(Axis(0), i));
                is_done.push(step.is_done[i]);
                tags.push(step.tags[i]);

                if step.is_done[i] {
                    window.clear();
                }
            }
        }

        if rewards.is_empty() {
            return Ok(TransitionBatch::empty(&step.states.shape()[1..]));
        }

        let state_views = states.iter().map(|s| s.view()).collect::<Vec<_>>();
        let to_err = |e: ndarray::ShapeError| LevelReplayError::InvalidBatch(e.to_string());

        Ok(TransitionBatch::new(
            stack(Axis(0), &state_views).map_err(to_err)?,
            actions,
            stack(Axis(0), &next_states).map_err(to_err)?,
            rewards,
            &is_done,
            tags,
        ))
    }
}
