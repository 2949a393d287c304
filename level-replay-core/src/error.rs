//! Errors in the library.
use thiserror::Error;

/// Errors in the library.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LevelReplayError {
    /// Slot index outside of the addressable range of a sum tree.
    #[error("Invalid index: {index} (capacity {capacity})")]
    InvalidIndex {
        /// The rejected index.
        index: usize,
        /// Number of addressable slots.
        capacity: usize,
    },

    /// Negative or non-finite priority.
    #[error("Invalid priority: {0}")]
    InvalidPriority(f32),

    /// Sampling was requested before any transition was added.
    #[error("Replay buffer is empty")]
    EmptyBuffer,

    /// Sampling was requested while every priority is zero.
    #[error("Sum tree has zero total priority")]
    EmptyTree,

    /// Malformed batch of transitions or priorities.
    #[error("Invalid batch: {0}")]
    InvalidBatch(String),

    /// Rejected configuration.
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// A thread panicked while holding the lock of a shared replay buffer.
    #[error("Replay buffer lock poisoned")]
    LockPoisoned,
}
