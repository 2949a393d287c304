//! Replay buffer shared between threads.
use crate::{
    error::LevelReplayError,
    replay_buffer::{PrioritizedReplayBuffer, ReplayBufferConfig, TransitionBatch},
    ExperienceBufferBase, ReplayBufferBase,
};
use anyhow::Result;
use std::sync::{Arc, Mutex, MutexGuard};

/// A cloneable handle to a [`PrioritizedReplayBuffer`].
///
/// Every operation holds the single lock of the buffer for its whole duration, so sampling
/// never observes a priority tree in the middle of an update.
#[derive(Clone)]
pub struct SharedReplayBuffer {
    inner: Arc<Mutex<PrioritizedReplayBuffer>>,
}

impl SharedReplayBuffer {
    /// Builds a buffer and wraps it.
    pub fn build(config: &ReplayBufferConfig) -> Result<Self> {
        Ok(Self::new(PrioritizedReplayBuffer::build(config)?))
    }

    /// Wraps an existing buffer.
    pub fn new(buffer: PrioritizedReplayBuffer) -> Self {
        Self {
            inner: Arc::new(Mutex::new(buffer)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, PrioritizedReplayBuffer>, LevelReplayError> {
        self.inner.lock().map_err(|_| LevelReplayError::LockPoisoned)
    }

    /// See [`ExperienceBufferBase::push`].
    pub fn push(&self, tr: TransitionBatch) -> Result<()> {
        self.lock()?.push(tr)
    }

    /// See [`PrioritizedReplayBuffer::sample`].
    pub fn sample(&self) -> Result<TransitionBatch> {
        self.lock()?.sample()
    }

    /// See [`ReplayBufferBase::batch`].
    pub fn batch(&self, size: usize) -> Result<TransitionBatch> {
        self.lock()?.batch(size)
    }

    /// See [`PrioritizedReplayBuffer::sample_recent`].
    pub fn sample_recent(&self, size: usize, c_k: usize) -> Result<TransitionBatch> {
        self.lock()?.sample_recent(size, c_k)
    }

    /// See [`ReplayBufferBase::update_priority`].
    pub fn update_priority(&self, ixs: &[usize], priorities: &[f32]) -> Result<()> {
        self.lock()?.update_priority(ixs, priorities)
    }

    /// Number of stored transitions.
    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }

    /// Runs `f` with exclusive access to the buffer.
    pub fn with<T>(&self, f: impl FnOnce(&mut PrioritizedReplayBuffer) -> T) -> Result<T> {
        let mut guard = self.lock()?;
        Ok(f(&mut guard))
    }
}

#[cfg(test)]
mod tests {
    use super::SharedReplayBuffer;
    use crate::replay_buffer::{test_util::numbered_batch, PerConfig, ReplayBufferConfig};
    use anyhow::Result;
    use std::thread;

    #[test]
    fn test_shared_across_threads() -> Result<()> {
        let config = ReplayBufferConfig::default()
            .capacity(64)
            .batch_size(8)
            .state_shape(vec![2])
            .per_config(Some(PerConfig::default()));
        let buffer = SharedReplayBuffer::build(&config)?;

        let producer = {
            let buffer = buffer.clone();
            thread::spawn(move || -> Result<()> {
                for i in 0..20 {
                    buffer.push(numbered_batch(i * 4..(i + 1) * 4))?;
                }
                Ok(())
            })
        };

        let mut n_sampled = 0;
        while n_sampled < 50 {
            if buffer.len()? == 0 {
                thread::yield_now();
                continue;
            }
            let batch = buffer.sample()?;
            let ixs = batch.ix_sample.unwrap();
            buffer.update_priority(&ixs, &vec![0.5; ixs.len()])?;
            n_sampled += 1;
        }

        producer.join().unwrap()?;
        assert_eq!(buffer.len()?, 64);
        let total = buffer.with(|b| b.total_priority())?.unwrap();
        let leaf_sum: f32 = buffer.with(|b| (0..64).map(|ix| b.priority(ix).unwrap()).sum())?;
        assert!((total - leaf_sum).abs() < 1e-3);
        Ok(())
    }
}
