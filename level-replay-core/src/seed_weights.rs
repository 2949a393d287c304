//! Accumulated sampling weight per level seed.
//!
//! The training loop owns one [`SeedWeights`] and feeds it every sampled batch. The totals
//! show how much each training level contributed to the updates.
use crate::replay_buffer::TransitionBatch;
use std::collections::BTreeMap;

/// Sampling weight accumulated per tag.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SeedWeights {
    weights: BTreeMap<i64, f32>,
}

impl SeedWeights {
    /// Creates an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an accumulator with an entry at zero for each of the `num_levels` seeds
    /// starting at `start_level`.
    pub fn with_levels(start_level: i64, num_levels: usize) -> Self {
        Self {
            weights: (start_level..start_level + num_levels as i64)
                .map(|s| (s, 0.0))
                .collect(),
        }
    }

    /// Adds the importance weight of every transition of the batch to its tag.
    ///
    /// Transitions of batches without weights count as 1.
    pub fn record(&mut self, batch: &TransitionBatch) {
        match &batch.weight {
            Some(ws) => {
                for (&tag, &w) in batch.tags.iter().zip(ws.iter()) {
                    self.add(tag, w);
                }
            }
            None => self.count(batch),
        }
    }

    /// Adds 1 to the tag of every transition of the batch, ignoring weights.
    pub fn count(&mut self, batch: &TransitionBatch) {
        for &tag in batch.tags.iter() {
            self.add(tag, 1.0);
        }
    }

    /// Adds `w` to the entry of `tag`.
    pub fn add(&mut self, tag: i64, w: f32) {
        *self.weights.entry(tag).or_insert(0.0) += w;
    }

    /// Accumulated weight of `tag`.
    pub fn get(&self, tag: i64) -> Option<f32> {
        self.weights.get(&tag).copied()
    }

    /// Sum of the weights of all tags.
    pub fn total(&self) -> f32 {
        self.weights.values().sum()
    }

    /// Iterates over `(tag, weight)` in increasing tag order.
    pub fn iter(&self) -> impl Iterator<Item = (i64, f32)> + '_ {
        self.weights.iter().map(|(&t, &w)| (t, w))
    }

    /// Sets every entry back to zero, keeping the tags.
    pub fn reset(&mut self) {
        self.weights.values_mut().for_each(|w| *w = 0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::SeedWeights;
    use crate::replay_buffer::TransitionBatch;

    fn batch(tags: Vec<i64>, weight: Option<Vec<f32>>) -> TransitionBatch {
        let mut b = TransitionBatch::empty(&[1]);
        b.tags = tags;
        b.weight = weight;
        b
    }

    #[test]
    fn test_record() {
        let mut sw = SeedWeights::with_levels(10, 3);
        assert_eq!(sw.iter().collect::<Vec<_>>(), vec![(10, 0.0), (11, 0.0), (12, 0.0)]);

        sw.record(&batch(vec![10, 12, 10], Some(vec![0.5, 1.0, 0.25])));
        assert_eq!(sw.get(10), Some(0.75));
        assert_eq!(sw.get(12), Some(1.0));

        sw.record(&batch(vec![11, 42], None));
        assert_eq!(sw.get(11), Some(1.0));
        assert_eq!(sw.get(42), Some(1.0));
        assert_eq!(sw.total(), 3.75);

        sw.count(&batch(vec![10], Some(vec![0.1])));
        assert_eq!(sw.get(10), Some(1.75));

        sw.reset();
        assert_eq!(sw.total(), 0.0);
        assert_eq!(sw.iter().count(), 4);
    }
}
