//! Loss and error metrics.

use crate::core::{Error, Result};
use ndarray::{Array2, ArrayBase, Data, Ix2};

fn check_shapes<S1, S2>(pred: &ArrayBase<S1, Ix2>, target: &ArrayBase<S2, Ix2>) -> Result<()>
where
    S1: Data<Elem = f32>,
    S2: Data<Elem = f32>,
{
    if pred.dim() != target.dim() {
        return Err(Error::shape_mismatch(target.dim(), pred.dim()));
    }
    if pred.is_empty() {
        return Err(Error::InvalidData("metric over an empty array".into()));
    }
    Ok(())
}

/// Mean squared error and its gradient w.r.t. `pred`.
pub fn mse(pred: &Array2<f32>, target: &Array2<f32>) -> Result<(f32, Array2<f32>)> {
    check_shapes(pred, target)?;
    let n = pred.len() as f32;
    let diff = pred - target;
    let loss = diff.mapv(|d| d * d).sum() / n;
    let grad = diff * (2.0 / n);
    Ok((loss, grad))
}

/// Mean absolute error.
pub fn mae<S1, S2>(pred: &ArrayBase<S1, Ix2>, target: &ArrayBase<S2, Ix2>) -> Result<f32>
where
    S1: Data<Elem = f32>,
    S2: Data<Elem = f32>,
{
    check_shapes(pred, target)?;
    let total: f32 = pred.iter().zip(target.iter()).map(|(p, t)| (p - t).abs()).sum();
    Ok(total / pred.len() as f32)
}

/// Root mean squared error.
pub fn rmse<S1, S2>(pred: &ArrayBase<S1, Ix2>, target: &ArrayBase<S2, Ix2>) -> Result<f32>
where
    S1: Data<Elem = f32>,
    S2: Data<Elem = f32>,
{
    check_shapes(pred, target)?;
    let total: f32 = pred.iter().zip(target.iter()).map(|(p, t)| (p - t) * (p - t)).sum();
    Ok((total / pred.len() as f32).sqrt())
}

/// Mean absolute percentage error in percent, over non-zero targets only.
///
/// Returns 0 when every target is zero.
pub fn mape<S1, S2>(pred: &ArrayBase<S1, Ix2>, target: &ArrayBase<S2, Ix2>) -> Result<f32>
where
    S1: Data<Elem = f32>,
    S2: Data<Elem = f32>,
{
    check_shapes(pred, target)?;
    let (sum, count) = pred
        .iter()
        .zip(target.iter())
        .filter(|(_, t)| **t != 0.0)
        .fold((0.0f32, 0usize), |(s, c), (p, t)| (s + ((t - p) / t).abs(), c + 1));
    if count == 0 {
        return Ok(0.0);
    }
    Ok(sum / count as f32 * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_mse_and_gradient() {
        let pred = array![[1.0f32, 2.0], [3.0, 4.0]];
        let target = array![[1.0f32, 0.0], [3.0, 6.0]];
        let (loss, grad) = mse(&pred, &target).unwrap();

        assert_relative_eq!(loss, 2.0);
        assert_eq!(grad, array![[0.0f32, 1.0], [0.0, -1.0]]);
    }

    #[test]
    fn test_mae_rmse() {
        let pred = array![[1.0f32, 2.0, 3.0]];
        let target = array![[2.0f32, 2.0, 6.0]];
        assert_relative_eq!(mae(&pred, &target).unwrap(), 4.0 / 3.0);
        assert_relative_eq!(rmse(&pred, &target).unwrap(), (10.0f32 / 3.0).sqrt());
    }

    #[test]
    fn test_mape_skips_zero_targets() {
        let pred = array![[1.0f32, 5.0, 3.0]];
        let target = array![[2.0f32, 0.0, 4.0]];
        assert_relative_eq!(mape(&pred, &target).unwrap(), 37.5);

        let zeros = array![[0.0f32, 0.0]];
        assert_eq!(mape(&zeros, &zeros).unwrap(), 0.0);
    }

    #[test]
    fn test_shape_mismatch() {
        let a = array![[1.0f32, 2.0]];
        let b = array![[1.0f32], [2.0]];
        assert!(mse(&a, &b).is_err());
        assert!(mae(&a, &b).is_err());
    }
}
