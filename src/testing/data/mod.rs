//! Seeded synthetic datasets.

use ndarray::{Array1, Array2, ArrayView2, Axis};
use rand::prelude::*;

/// Random features, uniform in `[min, max]`, shape `[rows, cols]`.
pub fn random_features(rows: usize, cols: usize, seed: u64, min: f64, max: f64) -> Array2<f64> {
    assert!(max >= min);
    let mut rng = StdRng::seed_from_u64(seed);
    let width = max - min;
    Array2::from_shape_simple_fn((rows, cols), || min + rng.r#gen::<f64>() * width)
}

/// Binary targets (0/1) from a random linear score plus uniform noise, thresholded at 0.
pub fn binary_targets_from_linear_score(
    features: ArrayView2<f64>,
    seed: u64,
    noise_amplitude: f64,
) -> Array1<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    let weights: Vec<f64> = (0..features.ncols())
        .map(|_| rng.r#gen::<f64>() * 2.0 - 1.0)
        .collect();
    let bias = rng.r#gen::<f64>() * 0.2 - 0.1;

    features
        .axis_iter(Axis(0))
        .map(|row| {
            let mut score = bias;
            for (x, w) in row.iter().zip(&weights) {
                score += x * w;
            }
            if noise_amplitude > 0.0 {
                score += (rng.r#gen::<f64>() * 2.0 - 1.0) * noise_amplitude;
            }
            if score > 0.0 {
                1.0
            } else {
                0.0
            }
        })
        .collect()
}

/// Features in `[-1, 1]` with linearly separable-ish binary labels.
pub fn classification_data(rows: usize, cols: usize, seed: u64) -> (Array2<f64>, Array1<f32>) {
    let x = random_features(rows, cols, seed, -1.0, 1.0);
    let y = binary_targets_from_linear_score(x.view(), seed.wrapping_add(1), 0.05);
    (x, y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn features_are_seeded_and_bounded() {
        let a = random_features(10, 3, 5, -2.0, 2.0);
        let b = random_features(10, 3, 5, -2.0, 2.0);

        assert_eq!(a, b);
        assert!(a.iter().all(|v| (-2.0..=2.0).contains(v)));
    }

    #[test]
    fn labels_are_binary() {
        let (x, y) = classification_data(50, 2, 3);
        assert_eq!(y.len(), x.nrows());
        assert!(y.iter().all(|&l| l == 0.0 || l == 1.0));
    }
}
