//! Sum tree for prioritized sampling.
//!
//! Nodes are stored level by level. Level 0 holds the total priority and the last level holds
//! one leaf per slot, padded up to a power of two with zero leaves.
use crate::error::LevelReplayError;
use itertools::Itertools;
use rand::Rng;

/// Priority index over a fixed number of slots.
///
/// Setting a priority and drawing a slot proportionally to its priority both take
/// `O(log capacity)` time.
#[derive(Debug, Clone)]
pub struct SumTree {
    capacity: usize,
    levels: Vec<Vec<f32>>,
}

impl SumTree {
    /// Creates a sum tree with `capacity` addressable leaves, all set to zero.
    pub fn new(capacity: usize) -> Result<Self, LevelReplayError> {
        if capacity == 0 {
            return Err(LevelReplayError::InvalidConfig(
                "capacity of sum tree must be positive".to_string(),
            ));
        }

        // ceil(log2(capacity)) + 1 levels
        let depth = capacity.next_power_of_two().trailing_zeros() as usize;
        let levels = (0..=depth).map(|i| vec![0f32; 1 << i]).collect();

        Ok(Self { capacity, levels })
    }

    /// Returns the number of addressable leaves.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the sum of all priorities.
    pub fn total(&self) -> f32 {
        self.levels[0][0]
    }

    /// Returns the priority stored at leaf `ix`.
    pub fn leaf_priority(&self, ix: usize) -> Result<f32, LevelReplayError> {
        self.check_index(ix)?;
        Ok(self.leaves()[ix])
    }

    fn leaves(&self) -> &[f32] {
        // There is always at least one level.
        &self.levels[self.levels.len() - 1]
    }

    fn check_index(&self, ix: usize) -> Result<(), LevelReplayError> {
        if ix < self.capacity {
            Ok(())
        } else {
            Err(LevelReplayError::InvalidIndex {
                index: ix,
                capacity: self.capacity,
            })
        }
    }

    fn check_priority(p: f32) -> Result<(), LevelReplayError> {
        if p.is_finite() && p >= 0.0 {
            Ok(())
        } else {
            Err(LevelReplayError::InvalidPriority(p))
        }
    }

    /// Writes leaf `ix` and refreshes its ancestors.
    ///
    /// Each ancestor is recomputed as the sum of its two children, so the sum invariant holds
    /// exactly after the walk, without accumulated rounding from repeated differences.
    fn propagate(&mut self, ix: usize, p: f32) {
        let depth = self.levels.len() - 1;
        self.levels[depth][ix] = p;

        let mut ix = ix;
        for level in (0..depth).rev() {
            ix /= 2;
            let (upper, lower) = self.levels.split_at_mut(level + 1);
            let children = &lower[0];
            upper[level][ix] = children[2 * ix] + children[2 * ix + 1];
        }
    }

    /// Sets the priority of slot `ix`.
    pub fn set(&mut self, ix: usize, p: f32) -> Result<(), LevelReplayError> {
        self.check_index(ix)?;
        Self::check_priority(p)?;
        self.propagate(ix, p);
        Ok(())
    }

    /// Sets priorities of several slots at once.
    ///
    /// When an index appears more than once, only its first occurrence is applied.
    /// Every input is validated before the tree is touched.
    pub fn batch_set(&mut self, ixs: &[usize], ps: &[f32]) -> Result<(), LevelReplayError> {
        if ixs.len() != ps.len() {
            return Err(LevelReplayError::InvalidBatch(format!(
                "{} indices but {} priorities",
                ixs.len(),
                ps.len()
            )));
        }

        let updates = ixs
            .iter()
            .copied()
            .zip(ps.iter().copied())
            .unique_by(|(ix, _)| *ix)
            .collect::<Vec<_>>();

        for &(ix, p) in updates.iter() {
            self.check_index(ix)?;
            Self::check_priority(p)?;
        }

        for (ix, p) in updates {
            self.propagate(ix, p);
        }

        Ok(())
    }

    /// Returns the leaf reached by descending the tree with query value `s`.
    ///
    /// At each level, `s` is compared against the left child: if greater, the search goes
    /// right and `s` is reduced by the left sum. A child holding zero is never entered, so
    /// slots with zero priority are never returned while the total is positive.
    pub fn find(&self, s: f32) -> usize {
        let mut s = s;
        let mut ix = 0;

        for nodes in self.levels[1..].iter() {
            ix *= 2;
            let left = nodes[ix];
            let right = nodes[ix + 1];
            if (s > left && right > 0.0) || left == 0.0 {
                s -= left;
                ix += 1;
            }
        }

        ix
    }

    /// Draws `n` slots with replacement, proportionally to their priorities.
    pub fn sample<R: Rng>(&self, n: usize, rng: &mut R) -> Result<Vec<usize>, LevelReplayError> {
        let total = self.total();
        if total <= 0.0 {
            return Err(LevelReplayError::EmptyTree);
        }

        Ok((0..n)
            .map(|_| self.find(total * rng.gen::<f32>()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::SumTree;
    use crate::error::LevelReplayError;
    use rand::{rngs::StdRng, SeedableRng};

    fn assert_sum_invariant(tree: &SumTree) {
        for (level, nodes) in tree.levels.iter().enumerate().skip(1) {
            let parents = &tree.levels[level - 1];
            for (ix, parent) in parents.iter().enumerate() {
                assert_eq!(*parent, nodes[2 * ix] + nodes[2 * ix + 1]);
            }
        }
        let leaf_sum: f32 = tree.leaves().iter().sum();
        assert!((tree.total() - leaf_sum).abs() < 1e-4);
    }

    #[test]
    fn test_levels() {
        let tree = SumTree::new(5).unwrap();
        let sizes = tree.levels.iter().map(|l| l.len()).collect::<Vec<_>>();
        assert_eq!(sizes, vec![1, 2, 4, 8]);

        let tree = SumTree::new(8).unwrap();
        assert_eq!(tree.levels.len(), 4);

        let tree = SumTree::new(1).unwrap();
        assert_eq!(tree.levels.len(), 1);

        assert!(SumTree::new(0).is_err());
    }

    #[test]
    fn test_sum_tree_odd() {
        let data = vec![0.5f32, 0.2, 0.8, 0.3, 1.1, 2.5, 3.9];
        let mut tree = SumTree::new(7).unwrap();
        for (ix, &p) in data.iter().enumerate() {
            tree.set(ix, p).unwrap();
        }
        assert_sum_invariant(&tree);

        assert_eq!(tree.find(0.0), 0);
        assert_eq!(tree.find(0.4), 0);
        assert_eq!(tree.find(0.5), 0);
        assert_eq!(tree.find(0.6), 1);
        assert_eq!(tree.find(1.2), 2);
        assert_eq!(tree.find(1.6), 3);
        assert_eq!(tree.find(2.0), 4);
        assert_eq!(tree.find(2.8), 4);
        assert_eq!(tree.find(9.2), 6);
    }

    #[test]
    fn test_invariant_after_updates() {
        let mut tree = SumTree::new(13).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        for step in 0..500 {
            let ix = rand::Rng::gen_range(&mut rng, 0..13);
            let p = rand::Rng::gen::<f32>(&mut rng) * 10.0;
            if step % 3 == 0 {
                tree.batch_set(&[ix, (ix + 5) % 13], &[p, p * 0.5]).unwrap();
            } else {
                tree.set(ix, p).unwrap();
            }
            assert_sum_invariant(&tree);
        }
    }

    #[test]
    fn test_batch_set_keeps_first_duplicate() {
        let mut tree = SumTree::new(4).unwrap();
        tree.batch_set(&[1, 2, 1], &[3.0, 4.0, 100.0]).unwrap();
        assert_eq!(tree.leaf_priority(1).unwrap(), 3.0);
        assert_eq!(tree.leaf_priority(2).unwrap(), 4.0);
        assert_eq!(tree.total(), 7.0);
        assert_sum_invariant(&tree);
    }

    #[test]
    fn test_invalid_inputs() {
        let mut tree = SumTree::new(4).unwrap();
        assert_eq!(
            tree.set(4, 1.0),
            Err(LevelReplayError::InvalidIndex {
                index: 4,
                capacity: 4
            })
        );
        assert_eq!(tree.set(0, -1.0), Err(LevelReplayError::InvalidPriority(-1.0)));
        assert!(tree.set(0, f32::NAN).is_err());
        assert!(tree.batch_set(&[0, 1], &[1.0]).is_err());

        // A bad entry leaves the tree untouched.
        assert!(tree.batch_set(&[0, 9], &[1.0, 1.0]).is_err());
        assert_eq!(tree.total(), 0.0);
        assert!(tree.leaf_priority(4).is_err());
    }

    #[test]
    fn test_sample_empty_tree() {
        let tree = SumTree::new(4).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(tree.sample(3, &mut rng), Err(LevelReplayError::EmptyTree));
    }

    #[test]
    fn test_sample_proportional() {
        let mut tree = SumTree::new(4).unwrap();
        tree.batch_set(&[0, 1, 2, 3], &[1.0, 3.0, 0.0, 6.0]).unwrap();

        let mut rng = StdRng::seed_from_u64(42);
        let n_samples = 10_000;
        let ixs = tree.sample(n_samples, &mut rng).unwrap();
        let count = |k: usize| ixs.iter().filter(|&&ix| ix == k).count() as f32;

        assert_eq!(count(2), 0.0);
        assert!((count(1) / n_samples as f32 - 0.3).abs() < 0.03);
        assert!((count(3) / n_samples as f32 - 0.6).abs() < 0.03);
        assert!((count(0) / n_samples as f32 - 0.1).abs() < 0.03);
    }

    #[test]
    fn test_zero_leaves_never_sampled() {
        let mut tree = SumTree::new(6).unwrap();
        tree.set(5, 2.0).unwrap();
        // Query values on the boundaries of zero-valued subtrees.
        assert_eq!(tree.find(0.0), 5);
        assert_eq!(tree.find(2.0), 5);

        let mut rng = StdRng::seed_from_u64(1);
        let ixs = tree.sample(1000, &mut rng).unwrap();
        assert!(ixs.iter().all(|&ix| ix == 5));
    }
}
