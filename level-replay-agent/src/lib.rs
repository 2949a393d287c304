#![warn(missing_docs)]
//! Learner-side numerics for prioritized replay with categorical value distributions.
//!
//! [`categorical::CategoricalSupport`] builds projected Bellman targets from sampled
//! transitions, and [`util`] turns per-sample errors into priorities for
//! [`level_replay_core::replay_buffer::PrioritizedReplayBuffer`].
pub mod categorical;
pub mod util;
