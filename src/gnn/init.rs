//! Weight initialisers and dropout masks.

use ndarray::{Array1, Array2, ArrayViewD, ArrayViewMutD};
use ndarray_rand::rand_distr::{Normal, Uniform};
use ndarray_rand::RandomExt;
use rand::Rng;

/// Uniform Xavier (Glorot) initialisation: `U(-a, a)`, `a = gain * sqrt(6 / (fan_in + fan_out))`.
pub fn xavier_uniform<R: Rng + ?Sized>(
    shape: (usize, usize),
    fan_in: usize,
    fan_out: usize,
    gain: f32,
    rng: &mut R,
) -> Array2<f32> {
    let bound = gain * (6.0 / (fan_in + fan_out) as f32).sqrt();
    uniform(shape, bound, rng)
}

/// Normal Xavier (Glorot) initialisation: `N(0, std)`, `std = gain * sqrt(2 / (fan_in + fan_out))`.
pub fn xavier_normal<R: Rng + ?Sized>(
    shape: (usize, usize),
    fan_in: usize,
    fan_out: usize,
    gain: f32,
    rng: &mut R,
) -> Array2<f32> {
    let std = gain * (2.0 / (fan_in + fan_out) as f32).sqrt();
    match Normal::new(0.0f32, std) {
        Ok(dist) => Array2::random_using(shape, dist, rng),
        Err(_) => Array2::zeros(shape),
    }
}

/// `U(-bound, bound)` matrix; a zero bound yields zeros.
pub fn uniform<R: Rng + ?Sized>(shape: (usize, usize), bound: f32, rng: &mut R) -> Array2<f32> {
    if bound > 0.0 {
        Array2::random_using(shape, Uniform::new(-bound, bound), rng)
    } else {
        Array2::zeros(shape)
    }
}

/// `U(-bound, bound)` vector.
pub fn uniform_vec<R: Rng + ?Sized>(len: usize, bound: f32, rng: &mut R) -> Array1<f32> {
    if bound > 0.0 {
        Array1::random_using(len, Uniform::new(-bound, bound), rng)
    } else {
        Array1::zeros(len)
    }
}

/// Inverted-dropout mask: each entry is `0` with probability `p`,
/// otherwise `1 / (1 - p)`.
pub fn dropout_mask<R: Rng + ?Sized>(shape: (usize, usize), p: f32, rng: &mut R) -> Array2<f32> {
    if p <= 0.0 {
        return Array2::ones(shape);
    }
    if p >= 1.0 {
        return Array2::zeros(shape);
    }
    let keep = 1.0 / (1.0 - p);
    Array2::from_shape_simple_fn(shape, || if rng.gen::<f32>() < p { 0.0 } else { keep })
}

/// Tensors exposed to the optimizer, always in the same order.
pub trait Parameterized {
    fn parameters(&self) -> Vec<ArrayViewD<'_, f32>>;

    fn parameters_mut(&mut self) -> Vec<ArrayViewMutD<'_, f32>>;

    /// Total scalar count.
    fn parameter_count(&self) -> usize {
        self.parameters().iter().map(|p| p.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_xavier_uniform_bounds() {
        let mut rng = StdRng::seed_from_u64(0);
        let w = xavier_uniform((128, 32), 32, 128, 1.0, &mut rng);
        let bound = (6.0f32 / 160.0).sqrt();
        assert_eq!(w.dim(), (128, 32));
        assert!(w.iter().all(|v| v.abs() <= bound));
        assert!(w.iter().any(|v| *v != 0.0));
    }

    #[test]
    fn test_xavier_normal_spread() {
        let mut rng = StdRng::seed_from_u64(1);
        let w = xavier_normal((200, 200), 200, 200, 1.0, &mut rng);
        let mean = w.mean().unwrap();
        let var = w.mapv(|v| (v - mean) * (v - mean)).mean().unwrap();
        assert!(mean.abs() < 0.01);
        assert!((var - 2.0 / 400.0).abs() < 5e-4);
    }

    #[test]
    fn test_dropout_mask_extremes() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(dropout_mask((3, 3), 0.0, &mut rng).iter().all(|&v| v == 1.0));
        assert!(dropout_mask((3, 3), 1.0, &mut rng).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_dropout_mask_scaling() {
        let mut rng = StdRng::seed_from_u64(3);
        let mask = dropout_mask((100, 100), 0.5, &mut rng);
        assert!(mask.iter().all(|&v| v == 0.0 || v == 2.0));
        let kept = mask.iter().filter(|&&v| v > 0.0).count();
        assert!(kept > 4500 && kept < 5500);
    }
}
