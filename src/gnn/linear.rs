//! Fully connected projection.

use super::init::{uniform_vec, xavier_uniform, Parameterized};
use crate::core::{Error, Result};
use ndarray::{Array1, Array2, ArrayViewD, ArrayViewMutD, Axis};
use rand::RngCore;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinearParams {
    /// `(out, in)`
    pub weight: Array2<f32>,
    pub bias: Array1<f32>,
}

impl LinearParams {
    pub fn zeros_like(&self) -> Self {
        Self {
            weight: Array2::zeros(self.weight.dim()),
            bias: Array1::zeros(self.bias.len()),
        }
    }
}

impl Parameterized for LinearParams {
    fn parameters(&self) -> Vec<ArrayViewD<'_, f32>> {
        vec![self.weight.view().into_dyn(), self.bias.view().into_dyn()]
    }

    fn parameters_mut(&mut self) -> Vec<ArrayViewMutD<'_, f32>> {
        vec![self.weight.view_mut().into_dyn(), self.bias.view_mut().into_dyn()]
    }
}

/// `y = x Wᵀ + b`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Linear {
    in_features: usize,
    out_features: usize,
    pub params: LinearParams,
}

impl Linear {
    /// Xavier-uniform weight; bias `U(-1/√in, 1/√in)`.
    pub fn new(in_features: usize, out_features: usize, rng: &mut dyn RngCore) -> Self {
        let weight = xavier_uniform((out_features, in_features), in_features, out_features, 1.0, rng);
        let bound = 1.0 / (in_features.max(1) as f32).sqrt();
        let bias = uniform_vec(out_features, bound, rng);
        Self {
            in_features,
            out_features,
            params: LinearParams { weight, bias },
        }
    }

    pub fn in_features(&self) -> usize {
        self.in_features
    }

    pub fn out_features(&self) -> usize {
        self.out_features
    }

    pub fn forward(&self, x: &Array2<f32>) -> Result<Array2<f32>> {
        if x.ncols() != self.in_features {
            return Err(Error::shape_mismatch(
                (x.nrows(), self.in_features),
                x.dim(),
            ));
        }
        Ok(x.dot(&self.params.weight.t()) + &self.params.bias)
    }

    /// Gradients for the parameters and for the input `x`.
    pub fn backward(&self, x: &Array2<f32>, d_output: &Array2<f32>) -> (LinearParams, Array2<f32>) {
        let grads = LinearParams {
            weight: d_output.t().dot(x),
            bias: d_output.sum_axis(Axis(0)),
        };
        (grads, d_output.dot(&self.params.weight))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_forward_known_values() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut layer = Linear::new(2, 1, &mut rng);
        layer.params.weight = array![[2.0, -1.0]];
        layer.params.bias = array![0.5];

        let y = layer.forward(&array![[1.0, 1.0], [3.0, 2.0]]).unwrap();
        assert_eq!(y, array![[1.5], [4.5]]);
    }

    #[test]
    fn test_backward() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut layer = Linear::new(2, 1, &mut rng);
        layer.params.weight = array![[2.0, -1.0]];

        let x = array![[1.0, 1.0], [3.0, 2.0]];
        let (grads, dx) = layer.backward(&x, &array![[1.0], [0.5]]);
        assert_eq!(grads.weight, array![[2.5, 2.0]]);
        assert_eq!(grads.bias, array![1.5]);
        assert_eq!(dx, array![[2.0, -1.0], [1.0, -0.5]]);
    }

    #[test]
    fn test_init_bounds() {
        let mut rng = StdRng::seed_from_u64(0);
        let layer = Linear::new(128, 36, &mut rng);
        let w_bound = (6.0f32 / 164.0).sqrt();
        let b_bound = 1.0 / 128.0f32.sqrt();
        assert!(layer.params.weight.iter().all(|v| v.abs() <= w_bound));
        assert!(layer.params.bias.iter().all(|v| v.abs() <= b_bound));
    }

    #[test]
    fn test_wrong_width() {
        let mut rng = StdRng::seed_from_u64(0);
        let layer = Linear::new(3, 2, &mut rng);
        assert!(layer.forward(&Array2::zeros((1, 4))).is_err());
    }
}
