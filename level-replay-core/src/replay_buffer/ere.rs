//! Emphasizing recent experience (ERE).
//!
//! Within a round of `K` updates, the `k`-th update samples only from the `c_k` most recent
//! transitions, with $c_k = N \eta^{k \cdot 1000 / K}$. Early updates of a round see the whole
//! buffer while later ones concentrate on fresh data.
use log::warn;
use serde::{Deserialize, Serialize};

/// Order in which the windows of a round are visited.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone, Copy)]
pub enum UpdateOrder {
    /// Largest window first.
    OldFirst,

    /// Smallest window first.
    NewFirst,

    /// Random permutation of the windows.
    Random,
}

/// Configuration of [`EreScheduler`].
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct EreConfig {
    /// Value of $\eta$ at the start of training.
    pub eta_0: f32,

    /// Value of $\eta$ at the end of training.
    pub eta_final: f32,

    /// Lower bound of every window.
    pub c_min: usize,

    /// Order of the windows in a round.
    pub update_order: UpdateOrder,

    /// Seed of the random permutation for [`UpdateOrder::Random`].
    pub seed: u64,
}

impl Default for EreConfig {
    fn default() -> Self {
        Self {
            eta_0: 0.996,
            eta_final: 1.0,
            c_min: 5000,
            update_order: UpdateOrder::OldFirst,
            seed: 42,
        }
    }
}

impl EreConfig {
    /// Sets the initial value of $\eta$.
    pub fn eta_0(mut self, v: f32) -> Self {
        self.eta_0 = v;
        self
    }

    /// Sets the final value of $\eta$.
    pub fn eta_final(mut self, v: f32) -> Self {
        self.eta_final = v;
        self
    }

    /// Sets the lower bound of the windows.
    pub fn c_min(mut self, v: usize) -> Self {
        self.c_min = v;
        self
    }

    /// Sets the order of the windows.
    pub fn update_order(mut self, v: UpdateOrder) -> Self {
        self.update_order = v;
        self
    }
}

/// Computes the sampling windows of ERE.
pub struct EreScheduler {
    config: EreConfig,
    rng: fastrand::Rng,
}

impl EreScheduler {
    /// Builds a scheduler.
    pub fn build(config: &EreConfig) -> Self {
        Self {
            config: config.clone(),
            rng: fastrand::Rng::with_seed(config.seed),
        }
    }

    /// Linearly interpolated $\eta$ at step `t` of `total`.
    pub fn current_eta(&self, t: usize, total: usize) -> f32 {
        if total == 0 {
            return self.config.eta_final;
        }
        let frac = t.min(total) as f32 / total as f32;
        self.config.eta_0 + (self.config.eta_final - self.config.eta_0) * frac
    }

    /// Windows $c_k$ for a round of `num_updates` updates on a buffer of `replay_size`.
    pub fn ck_list(&mut self, replay_size: usize, num_updates: usize, eta: f32) -> Vec<usize> {
        if num_updates == 0 {
            return vec![];
        }

        let mut cks = (0..num_updates)
            .map(|k| {
                let e = (k as f64) * 1000.0 / num_updates as f64;
                let ck = (replay_size as f64 * (eta as f64).powf(e)) as usize;
                ck.max(self.config.c_min)
            })
            .collect::<Vec<_>>();

        if replay_size < self.config.c_min {
            warn!(
                "replay_size {} is below c_min {}; every window covers the whole buffer",
                replay_size, self.config.c_min
            );
        }

        match self.config.update_order {
            UpdateOrder::OldFirst => {}
            UpdateOrder::NewFirst => cks.reverse(),
            UpdateOrder::Random => self.rng.shuffle(&mut cks),
        }

        cks
    }
}
