//! Replay buffers for reinforcement learning over procedurally generated levels.
//!
//! This module provides a fixed-capacity replay buffer with optional prioritized experience
//! replay (PER), together with the pieces a training loop needs around it.
//!
//! # Key Components
//!
//! - [`PrioritizedReplayBuffer`]: circular transition store with a [`SumTree`] priority index
//! - [`TransitionBatch`]: batches pushed into and sampled from the buffer
//! - [`MultiStepProcessor`]: builds multi-step transitions from vectorized environment steps
//! - [`EreScheduler`]: sampling windows for emphasizing recent experience
//!
//! # Examples
//!
//! ```rust
//! use level_replay_core::{
//!     replay_buffer::{PerConfig, PrioritizedReplayBuffer, ReplayBufferConfig, TransitionBatch},
//!     ExperienceBufferBase, ReplayBufferBase,
//! };
//! use ndarray::{ArrayD, IxDyn};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = ReplayBufferConfig::default()
//!     .capacity(1000)
//!     .batch_size(4)
//!     .state_shape(vec![2])
//!     .per_config(Some(PerConfig::default()));
//! let mut buffer = PrioritizedReplayBuffer::build(&config)?;
//!
//! let states = ArrayD::<f32>::zeros(IxDyn(&[3, 2]));
//! buffer.push(TransitionBatch::new(
//!     states.clone(),
//!     vec![0, 1, 2],
//!     states,
//!     vec![0.0, 0.5, 1.0],
//!     &[false, false, true],
//!     vec![7, 7, 7],
//! ))?;
//!
//! let batch = buffer.sample()?;
//! let ixs = batch.ix_sample.clone().unwrap();
//! buffer.update_priority(&ixs, &vec![0.3; ixs.len()])?;
//! # Ok(())
//! # }
//! ```
mod base;
mod batch;
mod config;
mod ere;
mod step_proc;
mod store;
#[cfg(test)]
pub(crate) mod test_util;
pub use base::{IwScheduler, PrioritizedReplayBuffer, SumTree};
pub use batch::TransitionBatch;
pub use config::{PerConfig, ReplayBufferConfig};
pub use ere::{EreConfig, EreScheduler, UpdateOrder};
pub use step_proc::{MultiStepProcessor, MultiStepProcessorConfig, VecStep};
pub use store::ReplayStore;
