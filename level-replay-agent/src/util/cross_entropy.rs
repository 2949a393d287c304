//! Cross entropy between a target distribution and predicted log-probabilities.
use level_replay_core::error::LevelReplayError;
use ndarray::{Array1, ArrayView1, ArrayView2};

/// Returns $-\sum_i m_i \log p_i$.
///
/// Atoms where the target is zero do not contribute, even when the log-probability is
/// $-\infty$.
pub fn cross_entropy(
    target: ArrayView1<f32>,
    log_probs: ArrayView1<f32>,
) -> Result<f32, LevelReplayError> {
    if target.len() != log_probs.len() {
        return Err(LevelReplayError::InvalidBatch(format!(
            "target has {} atoms, log-probabilities have {}",
            target.len(),
            log_probs.len()
        )));
    }

    Ok(-target
        .iter()
        .zip(log_probs.iter())
        .filter(|(m, _)| **m != 0.0)
        .map(|(m, lp)| m * lp)
        .sum::<f32>())
}

/// Row-wise [`cross_entropy`] for arrays of shape `[batch, atoms]`.
pub fn cross_entropy_batch(
    targets: ArrayView2<f32>,
    log_probs: ArrayView2<f32>,
) -> Result<Array1<f32>, LevelReplayError> {
    if targets.dim() != log_probs.dim() {
        return Err(LevelReplayError::InvalidBatch(format!(
            "targets {:?} and log-probabilities {:?} differ in shape",
            targets.dim(),
            log_probs.dim()
        )));
    }

    targets
        .outer_iter()
        .zip(log_probs.outer_iter())
        .map(|(m, lp)| cross_entropy(m, lp))
        .collect()
}
