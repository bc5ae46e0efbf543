//! Spatio-temporal graph attention network.
//!
//! Graph attention over each node's history window, then two LSTMs that read
//! the (attention-smoothed) window as a time series whose features are the
//! node values, then a linear head producing every node's `P`-step forecast.

use super::attention::{AveragedGatConv, GatCache, GatParams, NUM_HEADS};
use super::init::{dropout_mask, Parameterized};
use super::linear::{Linear, LinearParams};
use super::lstm::{Lstm, LstmCache, LstmParams};
use crate::core::{Error, Result, TrainingConfig};
use crate::graph::GraphBatch;
use ndarray::{Array1, Array2, ArrayViewD, ArrayViewMutD};
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Hidden size of the first recurrent layer.
pub const LSTM1_HIDDEN: usize = 32;
/// Hidden size of the second recurrent layer.
pub const LSTM2_HIDDEN: usize = 128;

/// Architecture hyperparameters; a checkpoint only loads into a model with
/// an equal spec.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub n_nodes: usize,
    pub n_hist: usize,
    pub n_pred: usize,
    pub heads: usize,
    pub dropout: f32,
}

impl ModelSpec {
    pub fn new(n_nodes: usize, n_hist: usize, n_pred: usize, dropout: f32) -> Self {
        Self {
            n_nodes,
            n_hist,
            n_pred,
            heads: NUM_HEADS,
            dropout,
        }
    }

    pub fn from_config(config: &TrainingConfig) -> Self {
        Self::new(
            config.n_node,
            config.n_hist,
            config.n_pred,
            config.dropout as f32,
        )
    }

    fn validate(&self) -> Result<()> {
        if self.n_nodes == 0 || self.n_hist == 0 || self.n_pred == 0 || self.heads == 0 {
            return Err(Error::InvalidConfig(format!(
                "model dimensions must be positive: {:?}",
                self
            )));
        }
        if !(0.0..=1.0).contains(&self.dropout) {
            return Err(Error::InvalidConfig(format!(
                "dropout must be in [0, 1], got {}",
                self.dropout
            )));
        }
        Ok(())
    }
}

/// Model output for one batch.
#[derive(Clone, Debug)]
pub struct Forecast {
    /// `(B * N, P)`, normalized space
    pub predictions: Array2<f32>,
    /// Edge attention, `(E, heads)`
    pub attention: Array2<f32>,
}

/// Activations from a training forward pass.
#[derive(Clone, Debug)]
pub struct ForwardCache {
    gat: GatCache,
    dropout_mask: Option<Array2<f32>>,
    lstm1: LstmCache,
    lstm2: LstmCache,
    last_hidden: Array2<f32>,
}

/// Gradients, laid out like the model's parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct Gradients {
    pub gat: GatParams,
    pub lstm1: LstmParams,
    pub lstm2: LstmParams,
    pub linear: LinearParams,
}

impl Parameterized for Gradients {
    fn parameters(&self) -> Vec<ArrayViewD<'_, f32>> {
        let mut views = self.gat.parameters();
        views.extend(self.lstm1.parameters());
        views.extend(self.lstm2.parameters());
        views.extend(self.linear.parameters());
        views
    }

    fn parameters_mut(&mut self) -> Vec<ArrayViewMutD<'_, f32>> {
        let mut views = self.gat.parameters_mut();
        views.extend(self.lstm1.parameters_mut());
        views.extend(self.lstm2.parameters_mut());
        views.extend(self.linear.parameters_mut());
        views
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StGat {
    spec: ModelSpec,
    gat: AveragedGatConv,
    lstm1: Lstm,
    lstm2: Lstm,
    linear: Linear,
}

impl StGat {
    /// Freshly initialised model.
    pub fn new(spec: ModelSpec, rng: &mut dyn RngCore) -> Result<Self> {
        spec.validate()?;
        let gat = AveragedGatConv::new(spec.n_hist, spec.n_hist, spec.heads, spec.dropout, rng);
        let lstm1 = Lstm::new(spec.n_nodes, LSTM1_HIDDEN, rng);
        let lstm2 = Lstm::new(LSTM1_HIDDEN, LSTM2_HIDDEN, rng);
        let linear = Linear::new(LSTM2_HIDDEN, spec.n_nodes * spec.n_pred, rng);
        Ok(Self {
            spec,
            gat,
            lstm1,
            lstm2,
            linear,
        })
    }

    pub fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    /// Evaluation-mode forward pass (no dropout).
    pub fn forward(&self, batch: &GraphBatch) -> Result<Forecast> {
        self.run(batch, None).map(|(forecast, _)| forecast)
    }

    /// Training-mode forward pass; dropout masks are drawn from `rng`.
    pub fn forward_train(
        &self,
        batch: &GraphBatch,
        rng: &mut dyn RngCore,
    ) -> Result<(Forecast, ForwardCache)> {
        self.run(batch, Some(rng))
    }

    fn run(
        &self,
        batch: &GraphBatch,
        mut rng: Option<&mut dyn RngCore>,
    ) -> Result<(Forecast, ForwardCache)> {
        let (b, n, h, p) = (
            batch.batch_size(),
            self.spec.n_nodes,
            self.spec.n_hist,
            self.spec.n_pred,
        );
        if batch.n_nodes() != n {
            return Err(Error::shape_mismatch(n, batch.n_nodes()));
        }
        if batch.features.ncols() != h {
            return Err(Error::shape_mismatch(h, batch.features.ncols()));
        }

        // Shorter reborrow; `rng` is used again for the output dropout.
        let gat_rng = rng.as_mut().map(|r| &mut **r as &mut dyn RngCore);
        let (gat_out, attention, gat_cache) = self.gat.forward(batch, &batch.features, gat_rng)?;

        let dropout_mask = match rng {
            Some(rng) if self.spec.dropout > 0.0 => {
                Some(dropout_mask(gat_out.dim(), self.spec.dropout, rng))
            }
            _ => None,
        };
        let x = match &dropout_mask {
            Some(mask) => &gat_out * mask,
            None => gat_out,
        };

        // (B*N, H) -> H steps of (B, N)
        let sequence = (0..h)
            .map(|t| Array2::from_shape_vec((b, n), x.column(t).to_vec()))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let (h1, lstm1) = self.lstm1.forward(&sequence)?;
        let (h2, lstm2) = self.lstm2.forward(&h1)?;
        let last_hidden = h2
            .last()
            .cloned()
            .ok_or_else(|| Error::Internal("LSTM produced no steps".into()))?;

        let out = self.linear.forward(&last_hidden)?;
        // (B, N*P) -> (B*N, P)
        let predictions = Array2::from_shape_vec((b * n, p), out.iter().copied().collect())?;

        Ok((
            Forecast {
                predictions,
                attention,
            },
            ForwardCache {
                gat: gat_cache,
                dropout_mask,
                lstm1,
                lstm2,
                last_hidden,
            },
        ))
    }

    /// Gradients of the loss given `d_predictions` (`(B * N, P)`).
    pub fn backward(
        &self,
        batch: &GraphBatch,
        cache: &ForwardCache,
        d_predictions: &Array2<f32>,
    ) -> Result<Gradients> {
        let (b, n, h, p) = (
            batch.batch_size(),
            self.spec.n_nodes,
            self.spec.n_hist,
            self.spec.n_pred,
        );
        if d_predictions.dim() != (b * n, p) {
            return Err(Error::shape_mismatch((b * n, p), d_predictions.dim()));
        }

        let d_out = Array2::from_shape_vec((b, n * p), d_predictions.iter().copied().collect())?;
        let (linear, d_last) = self.linear.backward(&cache.last_hidden, &d_out);

        let mut d_h2 = vec![Array2::zeros((b, LSTM2_HIDDEN)); h];
        d_h2[h - 1] = d_last;
        let (lstm2, d_h1) = self.lstm2.backward(&cache.lstm2, &d_h2)?;
        let (lstm1, d_sequence) = self.lstm1.backward(&cache.lstm1, &d_h1)?;

        // H steps of (B, N) -> (B*N, H)
        let mut d_x = Array2::<f32>::zeros((b * n, h));
        for (t, step) in d_sequence.iter().enumerate() {
            d_x.column_mut(t)
                .assign(&Array1::from_iter(step.iter().copied()));
        }
        if let Some(mask) = &cache.dropout_mask {
            d_x *= mask;
        }

        let gat = self.gat.backward(batch, &cache.gat, &d_x);

        Ok(Gradients {
            gat,
            lstm1,
            lstm2,
            linear,
        })
    }
}

impl Parameterized for StGat {
    fn parameters(&self) -> Vec<ArrayViewD<'_, f32>> {
        let mut views = self.gat.params.parameters();
        views.extend(self.lstm1.params.parameters());
        views.extend(self.lstm2.params.parameters());
        views.extend(self.linear.params.parameters());
        views
    }

    fn parameters_mut(&mut self) -> Vec<ArrayViewMutD<'_, f32>> {
        let mut views = self.gat.params.parameters_mut();
        views.extend(self.lstm1.params.parameters_mut());
        views.extend(self.lstm2.params.parameters_mut());
        views.extend(self.linear.params.parameters_mut());
        views
    }
}
