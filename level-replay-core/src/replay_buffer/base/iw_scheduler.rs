//! Scheduling the exponent of importance weight for PER.
use serde::{Deserialize, Serialize};

/// Scheduler of the exponent of importance weight for PER.
///
/// $\beta$ grows linearly with the number of prioritized sampling calls and is capped at 1.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct IwScheduler {
    /// Initial value of $\beta$.
    pub beta_0: f32,

    /// Increment of $\beta$ per sampling call.
    pub beta_increment: f32,

    /// Number of sampling calls so far.
    pub n_samples: usize,
}

impl IwScheduler {
    /// Creates a scheduler.
    pub fn new(beta_0: f32, beta_increment: f32) -> Self {
        Self {
            beta_0,
            beta_increment,
            n_samples: 0,
        }
    }

    /// Gets the exponent of importance sampling weight.
    pub fn beta(&self) -> f32 {
        (self.beta_0 + self.n_samples as f32 * self.beta_increment).min(1.0)
    }

    /// Advances the schedule by one sampling call.
    pub fn add_n_samples(&mut self) {
        self.n_samples += 1;
    }
}
