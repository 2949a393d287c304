//! Helpers shared by unit tests.
use super::TransitionBatch;
use ndarray::{Array, IxDyn};
use std::ops::Range;

/// Transitions whose every field encodes its sequence number `i`.
///
/// States have shape `[2]` and hold `[i, i + 0.5]`; next states are offset by 100.
/// Even-numbered transitions are terminal and tags are `1000 + i`.
pub fn numbered_batch(range: Range<usize>) -> TransitionBatch {
    let n = range.len();
    let values = range.clone().map(|i| i as f32).collect::<Vec<_>>();
    let states = Array::from_shape_fn(IxDyn(&[n, 2]), |ix| values[ix[0]] + ix[1] as f32 * 0.5);
    let next_states = states.mapv(|v| v + 100.0);
    let is_done = range.clone().map(|i| i % 2 == 0).collect::<Vec<_>>();

    TransitionBatch::new(
        states,
        range.clone().map(|i| i as i64).collect(),
        next_states,
        values,
        &is_done,
        range.map(|i| 1000 + i as i64).collect(),
    )
}
