//! Categorical support and the projected Bellman target.
use super::CategoricalConfig;
use level_replay_core::error::LevelReplayError;
use log::info;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, ArrayViewMut1, Axis};

/// Fixed, evenly spaced support of a categorical return distribution.
///
/// Atom `i` sits at $z_i = V_{min} + i \Delta z$ with $\Delta z = (V_{max} - V_{min}) / (N - 1)$.
#[derive(Debug, Clone)]
pub struct CategoricalSupport {
    atoms: usize,
    v_min: f32,
    v_max: f32,
    delta_z: f32,
    support: Array1<f32>,
}

impl CategoricalSupport {
    /// Builds the support.
    ///
    /// Fails when there are fewer than two atoms or when `v_max <= v_min`.
    pub fn build(config: &CategoricalConfig) -> Result<Self, LevelReplayError> {
        if config.atoms < 2 {
            return Err(LevelReplayError::InvalidConfig(format!(
                "at least two atoms are required, got {}",
                config.atoms
            )));
        }
        if !(config.v_max > config.v_min) {
            return Err(LevelReplayError::InvalidConfig(format!(
                "v_max ({}) must be larger than v_min ({})",
                config.v_max, config.v_min
            )));
        }

        let atoms = config.atoms;
        let delta_z = (config.v_max - config.v_min) / (atoms - 1) as f32;
        let support = Array1::from_shape_fn(atoms, |i| config.v_min + i as f32 * delta_z);
        info!(
            "Categorical support: {} atoms in [{}, {}]",
            atoms, config.v_min, config.v_max
        );

        Ok(Self {
            atoms,
            v_min: config.v_min,
            v_max: config.v_max,
            delta_z,
            support,
        })
    }

    /// Number of atoms.
    pub fn atoms(&self) -> usize {
        self.atoms
    }

    /// Spacing between neighbouring atoms.
    pub fn delta_z(&self) -> f32 {
        self.delta_z
    }

    /// Atom locations.
    pub fn support(&self) -> ArrayView1<f32> {
        self.support.view()
    }

    fn check_len(&self, len: usize) -> Result<(), LevelReplayError> {
        if len == self.atoms {
            Ok(())
        } else {
            Err(LevelReplayError::InvalidBatch(format!(
                "distribution has {} atoms, support has {}",
                len, self.atoms
            )))
        }
    }

    /// Projects $r + c \gamma z$, weighted by `next_dist`, back onto the support.
    ///
    /// `continuation` is 0 at the end of an episode and 1 otherwise. The result has the
    /// total mass of `next_dist`.
    pub fn project(
        &self,
        next_dist: &[f32],
        reward: f32,
        discount: f32,
        continuation: f32,
    ) -> Result<Vec<f32>, LevelReplayError> {
        self.check_len(next_dist.len())?;
        let mut m = Array1::zeros(self.atoms);
        self.project_into(
            ArrayView1::from(next_dist),
            reward,
            discount * continuation,
            m.view_mut(),
        );
        Ok(m.to_vec())
    }

    /// Row-wise [`project`](Self::project) for a batch of distributions of shape
    /// `[batch, atoms]`.
    pub fn project_batch(
        &self,
        next_dists: ArrayView2<f32>,
        rewards: &[f32],
        not_dones: &[f32],
        discount: f32,
    ) -> Result<Array2<f32>, LevelReplayError> {
        let (n, atoms) = next_dists.dim();
        self.check_len(atoms)?;
        if rewards.len() != n || not_dones.len() != n {
            return Err(LevelReplayError::InvalidBatch(format!(
                "{} distributions, {} rewards, {} continuation flags",
                n,
                rewards.len(),
                not_dones.len()
            )));
        }

        let mut m = Array2::zeros((n, atoms));
        for (i, (p, out)) in next_dists.outer_iter().zip(m.outer_iter_mut()).enumerate() {
            self.project_into(p, rewards[i], discount * not_dones[i], out);
        }
        Ok(m)
    }

    fn project_into(
        &self,
        p: ArrayView1<f32>,
        reward: f32,
        gamma: f32,
        mut m: ArrayViewMut1<f32>,
    ) {
        let last = (self.atoms - 1) as i64;

        for (&z, &p) in self.support.iter().zip(p.iter()) {
            let tz = (reward + gamma * z).max(self.v_min).min(self.v_max);
            let b = ((tz - self.v_min) / self.delta_z).max(0.0).min(last as f32);
            let mut low = b.floor() as i64;
            let mut up = b.ceil() as i64;

            // b on an atom: split between two neighbours, one of them with zero share.
            if up > 0 && low == up {
                low -= 1;
            }
            if low < last && low == up {
                up += 1;
            }

            m[low as usize] += p * (up as f32 - b);
            m[up as usize] += p * (b - low as f32);
        }
    }

    /// Mean of a distribution over the support.
    pub fn expected_value(&self, dist: ArrayView1<f32>) -> Result<f32, LevelReplayError> {
        self.check_len(dist.len())?;
        Ok(dist.dot(&self.support))
    }

    /// Means of the per-action distributions of shape `[n_actions, atoms]`.
    pub fn expected_values(
        &self,
        dists: ArrayView2<f32>,
    ) -> Result<Array1<f32>, LevelReplayError> {
        self.check_len(dists.len_of(Axis(1)))?;
        Ok(dists.dot(&self.support))
    }

    /// Action with the largest mean. Ties go to the smallest index.
    pub fn greedy_action(&self, dists: ArrayView2<f32>) -> Result<usize, LevelReplayError> {
        let q = self.expected_values(dists)?;
        let mut best: Option<(usize, f32)> = None;
        for (a, &v) in q.iter().enumerate() {
            match best {
                Some((_, bv)) if v <= bv => {}
                _ => best = Some((a, v)),
            }
        }
        best.map(|(a, _)| a)
            .ok_or_else(|| LevelReplayError::InvalidBatch("no action".to_string()))
    }
}
