#![warn(missing_docs)]
//! Prioritized experience replay for agents trained over procedurally generated levels.
pub mod error;
pub mod replay_buffer;

mod base;
pub use base::{ExperienceBufferBase, ReplayBufferBase};

mod seed_weights;
pub use seed_weights::SeedWeights;

mod shared;
pub use shared::SharedReplayBuffer;
