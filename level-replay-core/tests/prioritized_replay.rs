use anyhow::Result;
use level_replay_core::{
    error::LevelReplayError,
    replay_buffer::{
        EreConfig, EreScheduler, MultiStepProcessor, MultiStepProcessorConfig, PerConfig,
        PrioritizedReplayBuffer, ReplayBufferConfig, TransitionBatch, VecStep,
    },
    ExperienceBufferBase, ReplayBufferBase, SeedWeights,
};
use ndarray::{ArrayD, IxDyn};
use test_log::test;

/// Transitions `start..end`; state `i` is filled with `i` and its reward is `i`.
fn transitions(start: usize, end: usize) -> TransitionBatch {
    let n = end - start;
    let states = ArrayD::from_shape_fn(IxDyn(&[n, 3]), |ix| (start + ix[0]) as f32);
    let next_states = states.mapv(|v| v + 1.0);
    TransitionBatch::new(
        states,
        (start..end).map(|i| i as i64 % 4).collect(),
        next_states,
        (start..end).map(|i| i as f32).collect(),
        &vec![false; n],
        (start..end).map(|i| (i % 3) as i64).collect(),
    )
}

fn config(capacity: usize, per: Option<PerConfig>) -> ReplayBufferConfig {
    ReplayBufferConfig::default()
        .capacity(capacity)
        .batch_size(16)
        .state_shape(vec![3])
        .per_config(per)
}

#[test]
fn wraparound_keeps_latest_transitions() -> Result<()> {
    let mut buffer = PrioritizedReplayBuffer::build(&config(5, Some(PerConfig::default())))?;
    buffer.push(transitions(0, 3))?;
    buffer.push(transitions(3, 7))?;
    assert_eq!(buffer.len(), 5);

    // Slots 0 and 1 were overwritten by transitions 5 and 6.
    assert_eq!(buffer.sum_rewards(), (2..7).sum::<usize>() as f32);
    assert_eq!(buffer.total_priority(), Some(5.0));

    let batch = buffer.batch(200)?;
    for (&ix, &r) in batch.ix_sample.as_ref().unwrap().iter().zip(batch.rewards.iter()) {
        let expected = if ix < 2 { ix + 5 } else { ix };
        assert_eq!(r, expected as f32);
    }
    assert_eq!(batch.states[IxDyn(&[0, 0])], batch.rewards[0]);
    Ok(())
}

#[test]
fn prioritized_training_loop() -> Result<()> {
    let per = PerConfig::default().beta_0(0.4).beta_increment(0.1);
    let mut buffer = PrioritizedReplayBuffer::build(&config(64, Some(per)))?;
    assert!(matches!(
        buffer.sample().unwrap_err().downcast::<LevelReplayError>()?,
        LevelReplayError::EmptyBuffer
    ));

    buffer.push(transitions(0, 32))?;
    let mut seed_weights = SeedWeights::with_levels(0, 3);

    for step in 0..10 {
        let beta = buffer.beta().unwrap();
        assert!((beta - (0.4 + 0.1 * step as f32).min(1.0)).abs() < 1e-6);

        let batch = buffer.sample()?;
        let ws = batch.weight.as_ref().unwrap();
        assert_eq!(ws.len(), 16);
        assert!(ws.iter().all(|&w| w > 0.0 && w <= 1.0));
        assert!(ws.iter().any(|&w| w == 1.0));
        seed_weights.record(&batch);

        // Large rewards get large priorities.
        let ixs = batch.ix_sample.unwrap();
        let ps = batch.rewards.iter().map(|r| r + 1.0).collect::<Vec<_>>();
        buffer.update_priority(&ixs, &ps)?;
    }
    assert_eq!(buffer.beta(), Some(1.0));
    assert!(seed_weights.iter().all(|(_, w)| w > 0.0));

    // New transitions enter with the largest priority seen so far.
    let max_p = buffer.max_priority().unwrap();
    assert!(max_p > 1.0);
    buffer.push(transitions(32, 33))?;
    assert_eq!(buffer.priority(32), Some(max_p));

    assert!(buffer.update_priority(&[0], &[-1.0]).is_err());
    assert!(buffer.update_priority(&[64], &[1.0]).is_err());
    Ok(())
}

#[test]
fn multi_step_transitions_into_buffer() -> Result<()> {
    let mut proc = MultiStepProcessor::build(
        &MultiStepProcessorConfig::default()
            .n_procs(2)
            .multi_step(2)
            .gamma(0.5),
    )?;
    let mut buffer = PrioritizedReplayBuffer::build(&config(100, None))?;

    for t in 0..6 {
        let step = VecStep {
            states: ArrayD::from_elem(IxDyn(&[2, 3]), t as f32),
            actions: vec![0, 1],
            next_states: ArrayD::from_elem(IxDyn(&[2, 3]), (t + 1) as f32),
            rewards: vec![1.0, 1.0],
            is_done: vec![false, t == 2],
            tags: vec![7, 8],
        };
        buffer.push(proc.process(&step)?)?;
    }

    // Process 0 emits from t = 1 on. Process 1 emits at t = 1, 2 and 4, 5.
    assert_eq!(buffer.len(), 9);
    assert_eq!(buffer.num_done_flags(), 1);

    let batch = buffer.sample()?;
    assert!(batch.weight.unwrap().iter().all(|&w| w == 1.0));
    Ok(())
}

#[test]
fn ere_windows_restrict_sampling() -> Result<()> {
    let mut buffer = PrioritizedReplayBuffer::build(&config(100, Some(PerConfig::default())))?;
    buffer.push(transitions(0, 100))?;
    buffer.push(transitions(100, 120))?;

    let mut ere = EreScheduler::build(&EreConfig::default().c_min(10));
    let eta = ere.current_eta(0, 100);
    let cks = ere.ck_list(buffer.len(), 5, eta);
    assert_eq!(cks[0], 100);

    let beta = buffer.beta();
    for ck in cks {
        let batch = buffer.sample_recent(32, ck)?;
        let oldest = 120 - ck;
        assert!(batch.rewards.iter().all(|&r| r >= oldest as f32));
    }
    assert_eq!(buffer.beta(), beta);
    Ok(())
}
