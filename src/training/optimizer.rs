//! Adam optimizer with L2 weight decay.

use crate::core::{Error, Result};
use crate::gnn::Parameterized;
use ndarray::{ArrayD, Zip};

/// Adam hyperparameters.
#[derive(Clone, Debug)]
pub struct AdamConfig {
    /// Learning rate
    pub learning_rate: f32,
    /// Exponential decay rate for the first moment
    pub beta1: f32,
    /// Exponential decay rate for the second moment
    pub beta2: f32,
    /// Epsilon for numerical stability
    pub epsilon: f32,
    /// L2 penalty added to the gradient
    pub weight_decay: f32,
}

impl Default for AdamConfig {
    fn default() -> Self {
        Self {
            learning_rate: 1e-3,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            weight_decay: 0.0,
        }
    }
}

impl AdamConfig {
    pub fn new(learning_rate: f64, weight_decay: f64) -> Self {
        Self {
            learning_rate: learning_rate as f32,
            weight_decay: weight_decay as f32,
            ..Default::default()
        }
    }
}

/// Adam state: one first/second moment buffer per parameter tensor.
///
/// Implements:
/// 1. g_t = grad + weight_decay * θ
/// 2. m_t = beta1 * m_{t-1} + (1 - beta1) * g_t
/// 3. v_t = beta2 * v_{t-1} + (1 - beta2) * g_t^2
/// 4. θ = θ - lr * m_hat / (sqrt(v_hat) + epsilon)
#[derive(Debug)]
pub struct Adam {
    config: AdamConfig,
    m: Vec<ArrayD<f32>>,
    v: Vec<ArrayD<f32>>,
    t: usize,
}

impl Adam {
    pub fn new(config: AdamConfig) -> Self {
        Self {
            config,
            m: Vec::new(),
            v: Vec::new(),
            t: 0,
        }
    }

    pub fn config(&self) -> &AdamConfig {
        &self.config
    }

    /// Steps taken so far.
    pub fn steps(&self) -> usize {
        self.t
    }

    /// Update `model` in place from `grads` (same tensor order and shapes).
    pub fn step<M, G>(&mut self, model: &mut M, grads: &G) -> Result<()>
    where
        M: Parameterized + ?Sized,
        G: Parameterized + ?Sized,
    {
        let grads = grads.parameters();
        let params = model.parameters_mut();

        if params.len() != grads.len() {
            return Err(Error::shape_mismatch(params.len(), grads.len()));
        }
        for (p, g) in params.iter().zip(grads.iter()) {
            if p.shape() != g.shape() {
                return Err(Error::shape_mismatch(p.shape(), g.shape()));
            }
        }

        if self.m.is_empty() {
            self.m = params.iter().map(|p| ArrayD::zeros(p.raw_dim())).collect();
            self.v = params.iter().map(|p| ArrayD::zeros(p.raw_dim())).collect();
        } else if self.m.len() != params.len() {
            return Err(Error::shape_mismatch(self.m.len(), params.len()));
        }

        self.t += 1;
        let AdamConfig {
            learning_rate: lr,
            beta1,
            beta2,
            epsilon,
            weight_decay,
        } = self.config;
        let bias_correction1 = 1.0 - beta1.powi(self.t as i32);
        let bias_correction2 = 1.0 - beta2.powi(self.t as i32);

        for ((param, grad), (m, v)) in params
            .into_iter()
            .zip(grads.iter())
            .zip(self.m.iter_mut().zip(self.v.iter_mut()))
        {
            Zip::from(param)
                .and(grad)
                .and(m)
                .and(v)
                .for_each(|p, &g, m, v| {
                    let g = g + weight_decay * *p;
                    *m = beta1 * *m + (1.0 - beta1) * g;
                    *v = beta2 * *v + (1.0 - beta2) * g * g;
                    let m_hat = *m / bias_correction1;
                    let v_hat = *v / bias_correction2;
                    *p -= lr * m_hat / (v_hat.sqrt() + epsilon);
                });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{Array1, ArrayViewD, ArrayViewMutD};

    struct Vector(Array1<f32>);

    impl Parameterized for Vector {
        fn parameters(&self) -> Vec<ArrayViewD<'_, f32>> {
            vec![self.0.view().into_dyn()]
        }

        fn parameters_mut(&mut self) -> Vec<ArrayViewMutD<'_, f32>> {
            vec![self.0.view_mut().into_dyn()]
        }
    }

    #[test]
    fn test_first_step_moves_by_learning_rate() {
        let mut params = Vector(Array1::from(vec![1.0, -2.0]));
        let grads = Vector(Array1::from(vec![0.5, -3.0]));
        let mut adam = Adam::new(AdamConfig::new(0.1, 0.0));

        adam.step(&mut params, &grads).unwrap();

        // bias-corrected first step is lr * sign(g)
        assert_relative_eq!(params.0[0], 0.9, epsilon = 1e-5);
        assert_relative_eq!(params.0[1], -1.9, epsilon = 1e-5);
        assert_eq!(adam.steps(), 1);
    }

    #[test]
    fn test_weight_decay_pulls_towards_zero() {
        let mut params = Vector(Array1::from(vec![2.0]));
        let grads = Vector(Array1::from(vec![0.0]));
        let mut adam = Adam::new(AdamConfig::new(0.01, 0.1));

        adam.step(&mut params, &grads).unwrap();
        assert!(params.0[0] < 2.0);
    }

    #[test]
    fn test_converges_on_quadratic() {
        // minimise (x - 3)^2
        let mut params = Vector(Array1::from(vec![0.0]));
        let mut adam = Adam::new(AdamConfig::new(0.1, 0.0));
        for _ in 0..500 {
            let grads = Vector(params.0.mapv(|x| 2.0 * (x - 3.0)));
            adam.step(&mut params, &grads).unwrap();
        }
        assert_relative_eq!(params.0[0], 3.0, epsilon = 1e-2);
    }

    #[test]
    fn test_shape_mismatch() {
        let mut params = Vector(Array1::zeros(2));
        let grads = Vector(Array1::zeros(3));
        let mut adam = Adam::new(AdamConfig::default());
        assert!(adam.step(&mut params, &grads).is_err());
    }
}
