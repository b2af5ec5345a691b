//! Row and column subsampling.

use rand::rngs::StdRng;
use rand::seq::index;

/// Number of items kept when sampling `ratio` of `n`, at least one.
#[inline]
fn sample_size(n: usize, ratio: f32) -> usize {
    ((ratio as f64 * n as f64).round() as usize).clamp(1, n.max(1))
}

/// Draw `ratio` of `items` without replacement, preserving their order.
///
/// A ratio of 1 (or more) returns every item without touching the RNG.
pub fn sample_subset(items: &[usize], ratio: f32, rng: &mut StdRng) -> Vec<usize> {
    if ratio >= 1.0 || items.len() <= 1 {
        return items.to_vec();
    }
    let k = sample_size(items.len(), ratio);
    let mut picked = index::sample(rng, items.len(), k).into_vec();
    picked.sort_unstable();
    picked.into_iter().map(|i| items[i]).collect()
}

/// Per-tree row subsample.
#[derive(Debug, Clone, Copy)]
pub struct RowSampler {
    pub subsample: f32,
}

impl RowSampler {
    /// Sorted row indices used to grow one tree.
    pub fn sample(&self, n_rows: usize, rng: &mut StdRng) -> Vec<usize> {
        let all: Vec<usize> = (0..n_rows).collect();
        sample_subset(&all, self.subsample, rng)
    }
}

/// Cascading column subsample: per tree, then per level, then per node.
///
/// Each stage samples from the features the previous stage kept.
#[derive(Debug, Clone, Copy)]
pub struct ColumnSampler {
    pub bytree: f32,
    pub bylevel: f32,
    pub bynode: f32,
}

impl ColumnSampler {
    pub fn for_tree(&self, n_features: usize, rng: &mut StdRng) -> Vec<usize> {
        let all: Vec<usize> = (0..n_features).collect();
        sample_subset(&all, self.bytree, rng)
    }

    pub fn for_level(&self, tree_features: &[usize], rng: &mut StdRng) -> Vec<usize> {
        sample_subset(tree_features, self.bylevel, rng)
    }

    pub fn for_node(&self, level_features: &[usize], rng: &mut StdRng) -> Vec<usize> {
        sample_subset(level_features, self.bynode, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn full_ratio_keeps_everything() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(RowSampler { subsample: 1.0 }.sample(5, &mut rng), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn subsample_is_sorted_and_sized() {
        let mut rng = StdRng::seed_from_u64(7);
        let rows = RowSampler { subsample: 0.3 }.sample(100, &mut rng);

        assert_eq!(rows.len(), 30);
        assert!(rows.windows(2).all(|w| w[0] < w[1]));
        assert!(rows.iter().all(|&r| r < 100));
    }

    #[test]
    fn same_seed_same_sample() {
        let a = sample_subset(&(0..50).collect::<Vec<_>>(), 0.5, &mut StdRng::seed_from_u64(3));
        let b = sample_subset(&(0..50).collect::<Vec<_>>(), 0.5, &mut StdRng::seed_from_u64(3));
        assert_eq!(a, b);
    }

    #[test]
    fn column_stages_cascade() {
        let sampler = ColumnSampler {
            bytree: 0.5,
            bylevel: 0.5,
            bynode: 1.0,
        };
        let mut rng = StdRng::seed_from_u64(1);

        let tree = sampler.for_tree(8, &mut rng);
        let level = sampler.for_level(&tree, &mut rng);
        let node = sampler.for_node(&level, &mut rng);

        assert_eq!(tree.len(), 4);
        assert_eq!(level.len(), 2);
        assert_eq!(node, level);
        assert!(level.iter().all(|f| tree.contains(f)));
    }

    #[test]
    fn tiny_ratio_keeps_one() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(sample_subset(&[4, 5, 6], 0.01, &mut rng).len(), 1);
    }
}
