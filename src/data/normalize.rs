//! Z-score normalization statistics.

use ndarray::{ArrayBase, Data, Dimension};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Scalar mean / standard deviation over the training data.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Normalization {
    pub mean: f64,
    pub std_dev: f64,
}

impl Normalization {
    pub fn new(mean: f64, std_dev: f64) -> Self {
        Self { mean, std_dev }
    }

    /// Population mean and standard deviation of `values`.
    ///
    /// A zero (or undefined) deviation falls back to 1.0 so that constant
    /// signals still normalize to finite values.
    pub fn fit<I>(values: I) -> Self
    where
        I: IntoIterator<Item = f32>,
    {
        let mut count = 0usize;
        let mut sum = 0.0f64;
        let mut sum_sq = 0.0f64;
        for v in values {
            let v = v as f64;
            count += 1;
            sum += v;
            sum_sq += v * v;
        }

        if count == 0 {
            warn!("normalization fitted on no values, using identity");
            return Self::new(0.0, 1.0);
        }

        let mean = sum / count as f64;
        let var = (sum_sq / count as f64 - mean * mean).max(0.0);
        let mut std_dev = var.sqrt();
        if std_dev.is_nan() || std_dev <= f64::EPSILON {
            warn!(mean, "signal has zero variance, using unit standard deviation");
            std_dev = 1.0;
        }

        Self { mean, std_dev }
    }

    pub fn normalize(&self, value: f32) -> f32 {
        ((value as f64 - self.mean) / self.std_dev) as f32
    }

    pub fn denormalize(&self, value: f32) -> f32 {
        (value as f64 * self.std_dev + self.mean) as f32
    }

    /// Denormalize every element of an array.
    pub fn denormalize_array<S, D>(&self, values: &ArrayBase<S, D>) -> ndarray::Array<f32, D>
    where
        S: Data<Elem = f32>,
        D: Dimension,
    {
        values.mapv(|v| self.denormalize(v))
    }
}

impl Default for Normalization {
    fn default() -> Self {
        Self::new(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_fit_population_std() {
        let stats = Normalization::fit(vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_relative_eq!(stats.mean, 5.0, epsilon = 1e-9);
        assert_relative_eq!(stats.std_dev, 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_round_trip() {
        let stats = Normalization::new(10.0, 4.0);
        assert_relative_eq!(stats.normalize(14.0), 1.0);
        assert_relative_eq!(stats.denormalize(stats.normalize(3.5)), 3.5, epsilon = 1e-5);
    }

    #[test]
    fn test_constant_signal_falls_back() {
        let stats = Normalization::fit(vec![3.0; 10]);
        assert_relative_eq!(stats.mean, 3.0);
        assert_relative_eq!(stats.std_dev, 1.0);
    }

    #[test]
    fn test_denormalize_array() {
        let stats = Normalization::new(1.0, 2.0);
        let out = stats.denormalize_array(&array![[0.0f32, 1.0], [-1.0, 0.5]]);
        assert_eq!(out, array![[1.0f32, 3.0], [-1.0, 2.0]]);
    }
}
