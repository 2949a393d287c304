//! Configuration for the replay buffer.
//!
//! This module provides configuration structures for the replay buffer, including:
//! - Basic buffer configuration (capacity, batch size, state shape, seed)
//! - Prioritized Experience Replay (PER) configuration
//! - Serialization and deserialization support
use crate::error::LevelReplayError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    default::Default,
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration for Prioritized Experience Replay (PER).
///
/// # Examples
///
/// ```rust
/// use level_replay_core::replay_buffer::PerConfig;
///
/// let config = PerConfig::default()
///     .alpha(0.6)
///     .beta_0(0.4)
///     .beta_increment(2e-7);
/// ```
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct PerConfig {
    /// Exponent for prioritization.
    ///
    /// The buffer stores priorities as given; learners raise their raw scores to this power
    /// before calling `update_priority`.
    pub alpha: f32,

    /// Initial value of the importance sampling exponent.
    pub beta_0: f32,

    /// Increment of the importance sampling exponent per sampling call.
    /// The exponent never exceeds 1.
    pub beta_increment: f32,
}

impl Default for PerConfig {
    /// `alpha = 0.6`, `beta_0 = 0.4` and `beta_increment = 2e-7`, so that beta reaches 1 after
    /// three million sampling calls.
    fn default() -> Self {
        Self {
            alpha: 0.6,
            beta_0: 0.4,
            beta_increment: 2e-7,
        }
    }
}

impl PerConfig {
    /// Sets the prioritization exponent `alpha`.
    pub fn alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha;
        self
    }

    /// Sets the initial importance sampling exponent `beta_0`.
    pub fn beta_0(mut self, beta_0: f32) -> Self {
        self.beta_0 = beta_0;
        self
    }

    /// Sets the per-call increment of the importance sampling exponent.
    pub fn beta_increment(mut self, beta_increment: f32) -> Self {
        self.beta_increment = beta_increment;
        self
    }
}

/// Configuration for the replay buffer.
///
/// # Examples
///
/// ```rust
/// use level_replay_core::replay_buffer::{PerConfig, ReplayBufferConfig};
///
/// // Uniform sampling
/// let config = ReplayBufferConfig::default()
///     .capacity(10000)
///     .state_shape(vec![4]);
///
/// // Prioritized sampling
/// let config_with_per = ReplayBufferConfig::default()
///     .capacity(10000)
///     .per_config(Some(PerConfig::default()));
/// ```
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct ReplayBufferConfig {
    /// Maximum number of transitions that can be stored in the buffer.
    /// When the buffer is full, new transitions replace the oldest ones.
    pub capacity: usize,

    /// Number of transitions returned by `sample()`.
    pub batch_size: usize,

    /// Shape of a single state.
    pub state_shape: Vec<usize>,

    /// Random seed used for sampling transitions.
    pub seed: u64,

    /// Configuration for prioritized experience replay. If `None`,
    /// transitions are sampled uniformly at random.
    pub per_config: Option<PerConfig>,
}

impl Default for ReplayBufferConfig {
    fn default() -> Self {
        Self {
            capacity: 10000,
            batch_size: 32,
            state_shape: vec![3, 64, 64],
            seed: 42,
            per_config: None,
        }
    }
}

impl ReplayBufferConfig {
    /// Sets the capacity of the replay buffer.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the batch size used by `sample()`.
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Sets the shape of a single state.
    pub fn state_shape(mut self, state_shape: Vec<usize>) -> Self {
        self.state_shape = state_shape;
        self
    }

    /// Sets the random seed for sampling.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the configuration for prioritized experience replay.
    pub fn per_config(mut self, per_config: Option<PerConfig>) -> Self {
        self.per_config = per_config;
        self
    }

    /// Returns `true` if prioritized sampling is enabled.
    pub fn prioritized(&self) -> bool {
        self.per_config.is_some()
    }

    /// Checks the values of the configuration.
    pub fn validate(&self) -> Result<(), LevelReplayError> {
        if self.capacity == 0 {
            return Err(LevelReplayError::InvalidConfig(
                "capacity must be positive".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(LevelReplayError::InvalidConfig(
                "batch_size must be positive".to_string(),
            ));
        }
        if let Some(per_config) = &self.per_config {
            if !(per_config.beta_0 >= 0.0 && per_config.beta_increment >= 0.0) {
                return Err(LevelReplayError::InvalidConfig(format!(
                    "beta_0 and beta_increment must be non-negative: {:?}",
                    per_config
                )));
            }
        }
        Ok(())
    }

    /// Loads the configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves the configuration to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}
