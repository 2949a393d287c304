//! Fixed-capacity circular storage of transitions.
use super::TransitionBatch;
use crate::error::LevelReplayError;
use log::trace;
use ndarray::{ArrayD, ArrayViewD, Axis, IxDyn, Slice};
use std::ops::Range;

/// Circular storage of transitions.
///
/// Each field of a transition lives in its own array of length `capacity`. Batches are
/// written contiguously starting at the write pointer and wrap around to the head of the
/// arrays when they run past the end, overwriting the oldest transitions.
#[derive(Clone, Debug)]
pub struct ReplayStore {
    capacity: usize,
    state_shape: Vec<usize>,

    /// Slot the next transition is written to.
    write_ptr: usize,

    /// Number of valid transitions.
    count: usize,

    states: ArrayD<f32>,
    actions: Vec<i64>,
    next_states: ArrayD<f32>,
    rewards: Vec<f32>,
    not_dones: Vec<f32>,
    tags: Vec<i64>,
}

#[inline]
fn write_rows(dst: &mut ArrayD<f32>, at: usize, src: ArrayViewD<f32>) {
    let n = src.shape()[0];
    dst.slice_axis_mut(Axis(0), Slice::from(at..at + n)).assign(&src);
}

#[inline]
fn write_items<T: Copy>(dst: &mut [T], at: usize, src: &[T]) {
    dst[at..at + src.len()].copy_from_slice(src);
}

impl ReplayStore {
    /// Creates an empty store.
    pub fn new(capacity: usize, state_shape: &[usize]) -> Result<Self, LevelReplayError> {
        if capacity == 0 {
            return Err(LevelReplayError::InvalidConfig(
                "capacity must be positive".to_string(),
            ));
        }

        let mut shape = vec![capacity];
        shape.extend_from_slice(state_shape);

        Ok(Self {
            capacity,
            state_shape: state_shape.to_vec(),
            write_ptr: 0,
            count: 0,
            states: ArrayD::zeros(IxDyn(&shape)),
            actions: vec![0; capacity],
            next_states: ArrayD::zeros(IxDyn(&shape)),
            rewards: vec![0.0; capacity],
            not_dones: vec![0.0; capacity],
            tags: vec![0; capacity],
        })
    }

    /// Maximum number of transitions.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of valid transitions.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Returns `true` if nothing has been written yet.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Slot the next transition will be written to.
    pub fn write_ptr(&self) -> usize {
        self.write_ptr
    }

    /// Shape of a single state.
    pub fn state_shape(&self) -> &[usize] {
        &self.state_shape
    }

    /// Stored rewards of valid slots.
    pub fn rewards(&self) -> &[f32] {
        &self.rewards[..self.count]
    }

    /// Stored continuation flags of valid slots.
    pub fn not_dones(&self) -> &[f32] {
        &self.not_dones[..self.count]
    }

    /// Splits a write of `k` transitions at the write pointer into at most two segments,
    /// each given as a range of the batch and the slot it is copied to.
    fn segments(&self, k: usize) -> Vec<(Range<usize>, usize)> {
        if self.write_ptr + k > self.capacity {
            let tail = self.capacity - self.write_ptr;
            vec![(0..tail, self.write_ptr), (tail..k, 0)]
        } else {
            vec![(0..k, self.write_ptr)]
        }
    }

    /// Writes a batch of transitions and returns the slots they occupy, oldest first.
    pub fn add(&mut self, batch: &TransitionBatch) -> Result<Vec<usize>, LevelReplayError> {
        batch.check()?;
        let k = batch.len();
        if k == 0 {
            return Ok(vec![]);
        }
        if k > self.capacity {
            return Err(LevelReplayError::InvalidBatch(format!(
                "batch of {} transitions exceeds capacity {}",
                k, self.capacity
            )));
        }
        if batch.state_shape() != self.state_shape.as_slice() {
            return Err(LevelReplayError::InvalidBatch(format!(
                "state shape {:?} does not match {:?}",
                batch.state_shape(),
                self.state_shape
            )));
        }

        for (range, at) in self.segments(k) {
            let rows = Slice::from(range.clone());
            write_rows(&mut self.states, at, batch.states.slice_axis(Axis(0), rows));
            write_rows(
                &mut self.next_states,
                at,
                batch.next_states.slice_axis(Axis(0), rows),
            );
            write_items(&mut self.actions, at, &batch.actions[range.clone()]);
            write_items(&mut self.rewards, at, &batch.rewards[range.clone()]);
            write_items(&mut self.not_dones, at, &batch.not_dones[range.clone()]);
            write_items(&mut self.tags, at, &batch.tags[range]);
        }

        let slots = (0..k)
            .map(|j| (self.write_ptr + j) % self.capacity)
            .collect::<Vec<_>>();

        self.write_ptr = (self.write_ptr + k) % self.capacity;
        self.count = (self.count + k).min(self.capacity);
        trace!(
            "Added {} transitions, write_ptr={}, count={}",
            k,
            self.write_ptr,
            self.count
        );

        Ok(slots)
    }

    /// Gathers the transitions at the given slots.
    ///
    /// Indices must be smaller than [`ReplayStore::len`]; producers of indices (the sum tree
    /// or a uniform sampler over the valid range) guarantee this.
    pub fn sample_indices(&self, ixs: &[usize]) -> TransitionBatch {
        debug_assert!(ixs.iter().all(|&ix| ix < self.count));

        TransitionBatch {
            states: self.states.select(Axis(0), ixs),
            actions: ixs.iter().map(|&ix| self.actions[ix]).collect(),
            next_states: self.next_states.select(Axis(0), ixs),
            rewards: ixs.iter().map(|&ix| self.rewards[ix]).collect(),
            not_dones: ixs.iter().map(|&ix| self.not_dones[ix]).collect(),
            tags: ixs.iter().map(|&ix| self.tags[ix]).collect(),
            ix_sample: None,
            weight: None,
        }
    }

    /// Slot of the `j`-th most recent transition, `j = 0` being the newest.
    pub fn recent_slot(&self, j: usize) -> usize {
        debug_assert!(j < self.count);
        (self.write_ptr + self.capacity - 1 - j) % self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::ReplayStore;
    use crate::replay_buffer::{test_util::numbered_batch, TransitionBatch};
    use ndarray::{ArrayD, IxDyn};

    fn assert_slot_holds(store: &ReplayStore, slot: usize, i: usize) {
        let b = store.sample_indices(&[slot]);
        assert_eq!(b.actions, vec![i as i64]);
        assert_eq!(b.rewards, vec![i as f32]);
        assert_eq!(b.tags, vec![1000 + i as i64]);
        assert_eq!(b.not_dones, vec![if i % 2 == 0 { 0.0 } else { 1.0 }]);
        assert_eq!(b.states[IxDyn(&[0, 0])], i as f32);
        assert_eq!(b.states[IxDyn(&[0, 1])], i as f32 + 0.5);
        assert_eq!(b.next_states[IxDyn(&[0, 1])], i as f32 + 100.5);
    }

    #[test]
    fn test_contiguous_add() {
        let mut store = ReplayStore::new(8, &[2]).unwrap();
        let slots = store.add(&numbered_batch(0..3)).unwrap();
        assert_eq!(slots, vec![0, 1, 2]);
        assert_eq!(store.len(), 3);
        assert_eq!(store.write_ptr(), 3);
        for i in 0..3 {
            assert_slot_holds(&store, i, i);
        }
    }

    #[test]
    fn test_wraparound() {
        let mut store = ReplayStore::new(5, &[2]).unwrap();
        store.add(&numbered_batch(0..3)).unwrap();
        let slots = store.add(&numbered_batch(3..7)).unwrap();

        assert_eq!(slots, vec![3, 4, 0, 1]);
        assert_eq!(store.len(), 5);
        assert_eq!(store.write_ptr(), 2);

        // Transitions 2..7 survive; 0 and 1 were overwritten by 5 and 6.
        assert_slot_holds(&store, 2, 2);
        assert_slot_holds(&store, 3, 3);
        assert_slot_holds(&store, 4, 4);
        assert_slot_holds(&store, 0, 5);
        assert_slot_holds(&store, 1, 6);

        let mut rewards = store.rewards().to_vec();
        rewards.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(rewards, vec![2.0, 3.0, 4.0, 5.0, 6.0]);

        // Oldest transition sits at the write pointer.
        assert_eq!(store.rewards()[store.write_ptr()], 2.0);
    }

    #[test]
    fn test_exact_fill_wraps_pointer() {
        let mut store = ReplayStore::new(4, &[2]).unwrap();
        store.add(&numbered_batch(0..1)).unwrap();
        let slots = store.add(&numbered_batch(1..4)).unwrap();
        assert_eq!(slots, vec![1, 2, 3]);
        assert_eq!(store.write_ptr(), 0);
        assert_eq!(store.len(), 4);

        store.add(&numbered_batch(4..5)).unwrap();
        assert_slot_holds(&store, 0, 4);
        assert_slot_holds(&store, 1, 1);
    }

    #[test]
    fn test_recent_slot() {
        let mut store = ReplayStore::new(5, &[2]).unwrap();
        store.add(&numbered_batch(0..3)).unwrap();
        assert_eq!(store.recent_slot(0), 2);
        assert_eq!(store.recent_slot(2), 0);

        store.add(&numbered_batch(3..7)).unwrap();
        let recent = (0..5).map(|j| store.recent_slot(j)).collect::<Vec<_>>();
        assert_eq!(recent, vec![1, 0, 4, 3, 2]);
    }

    #[test]
    fn test_invalid_batches() {
        let mut store = ReplayStore::new(4, &[2]).unwrap();
        assert!(store.add(&numbered_batch(0..5)).is_err());

        let mut wrong_shape = numbered_batch(0..2);
        wrong_shape.states = ArrayD::zeros(IxDyn(&[2, 3]));
        wrong_shape.next_states = ArrayD::zeros(IxDyn(&[2, 3]));
        assert!(store.add(&wrong_shape).is_err());

        let mut wrong_len = numbered_batch(0..2);
        wrong_len.tags.pop();
        assert!(store.add(&wrong_len).is_err());

        assert_eq!(store.add(&TransitionBatch::empty(&[2])).unwrap(), Vec::<usize>::new());
        assert!(store.is_empty());
        assert!(ReplayStore::new(0, &[2]).is_err());
    }
}
