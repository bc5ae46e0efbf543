//! Single-layer LSTM over a time-major sequence.
//!
//! Parameter layout and gate order (`i, f, g, o`) follow the usual
//! `weight_ih / weight_hh / bias_ih / bias_hh` convention.

use super::init::{xavier_uniform, Parameterized};
use crate::core::{Error, Result};
use ndarray::{s, Array1, Array2, ArrayViewD, ArrayViewMutD, Axis};
use rand::RngCore;
use serde::{Deserialize, Serialize};

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LstmParams {
    /// Input weights, `(4 * hidden, input)`
    pub w_ih: Array2<f32>,
    /// Recurrent weights, `(4 * hidden, hidden)`
    pub w_hh: Array2<f32>,
    pub b_ih: Array1<f32>,
    pub b_hh: Array1<f32>,
}

impl LstmParams {
    pub fn zeros_like(&self) -> Self {
        Self {
            w_ih: Array2::zeros(self.w_ih.dim()),
            w_hh: Array2::zeros(self.w_hh.dim()),
            b_ih: Array1::zeros(self.b_ih.len()),
            b_hh: Array1::zeros(self.b_hh.len()),
        }
    }
}

impl Parameterized for LstmParams {
    fn parameters(&self) -> Vec<ArrayViewD<'_, f32>> {
        vec![
            self.w_ih.view().into_dyn(),
            self.w_hh.view().into_dyn(),
            self.b_ih.view().into_dyn(),
            self.b_hh.view().into_dyn(),
        ]
    }

    fn parameters_mut(&mut self) -> Vec<ArrayViewMutD<'_, f32>> {
        vec![
            self.w_ih.view_mut().into_dyn(),
            self.w_hh.view_mut().into_dyn(),
            self.b_ih.view_mut().into_dyn(),
            self.b_hh.view_mut().into_dyn(),
        ]
    }
}

#[derive(Clone, Debug)]
struct LstmStep {
    x: Array2<f32>,
    h_prev: Array2<f32>,
    c_prev: Array2<f32>,
    i: Array2<f32>,
    f: Array2<f32>,
    g: Array2<f32>,
    o: Array2<f32>,
    tanh_c: Array2<f32>,
}

/// Per-step activations kept for back-propagation through time.
#[derive(Clone, Debug, Default)]
pub struct LstmCache {
    steps: Vec<LstmStep>,
}

impl LstmCache {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Lstm {
    input_size: usize,
    hidden_size: usize,
    pub params: LstmParams,
}

impl Lstm {
    /// Xavier-uniform weight matrices, zero biases.
    pub fn new(input_size: usize, hidden_size: usize, rng: &mut dyn RngCore) -> Self {
        let gates = 4 * hidden_size;
        Self {
            input_size,
            hidden_size,
            params: LstmParams {
                w_ih: xavier_uniform((gates, input_size), input_size, gates, 1.0, rng),
                w_hh: xavier_uniform((gates, hidden_size), hidden_size, gates, 1.0, rng),
                b_ih: Array1::zeros(gates),
                b_hh: Array1::zeros(gates),
            },
        }
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    /// Run the sequence `xs` (each `(batch, input)`) from a zero state.
    ///
    /// Returns the hidden state after every step.
    pub fn forward(&self, xs: &[Array2<f32>]) -> Result<(Vec<Array2<f32>>, LstmCache)> {
        let batch = xs
            .first()
            .map(Array2::nrows)
            .ok_or_else(|| Error::InvalidData("LSTM input sequence is empty".into()))?;
        let hs = self.hidden_size;

        let mut h = Array2::<f32>::zeros((batch, hs));
        let mut c = Array2::<f32>::zeros((batch, hs));
        let mut outputs = Vec::with_capacity(xs.len());
        let mut steps = Vec::with_capacity(xs.len());

        for x in xs {
            if x.dim() != (batch, self.input_size) {
                return Err(Error::shape_mismatch((batch, self.input_size), x.dim()));
            }

            let mut gates = x.dot(&self.params.w_ih.t()) + h.dot(&self.params.w_hh.t());
            gates += &self.params.b_ih;
            gates += &self.params.b_hh;

            let i = gates.slice(s![.., 0..hs]).mapv(sigmoid);
            let f = gates.slice(s![.., hs..2 * hs]).mapv(sigmoid);
            let g = gates.slice(s![.., 2 * hs..3 * hs]).mapv(f32::tanh);
            let o = gates.slice(s![.., 3 * hs..4 * hs]).mapv(sigmoid);

            let c_next = &f * &c + &i * &g;
            let tanh_c = c_next.mapv(f32::tanh);
            let h_next = &o * &tanh_c;

            steps.push(LstmStep {
                x: x.clone(),
                h_prev: h,
                c_prev: c,
                i,
                f,
                g,
                o,
                tanh_c,
            });
            outputs.push(h_next.clone());
            h = h_next;
            c = c_next;
        }

        Ok((outputs, LstmCache { steps }))
    }

    /// Back-propagation through time.
    ///
    /// `d_outputs[t]` is the loss gradient w.r.t. the hidden state emitted at
    /// step `t`. Returns parameter gradients and the gradient w.r.t. each input.
    pub fn backward(
        &self,
        cache: &LstmCache,
        d_outputs: &[Array2<f32>],
    ) -> Result<(LstmParams, Vec<Array2<f32>>)> {
        if d_outputs.len() != cache.steps.len() {
            return Err(Error::shape_mismatch(cache.steps.len(), d_outputs.len()));
        }

        let hs = self.hidden_size;
        let mut grads = self.params.zeros_like();
        let mut d_inputs = vec![Array2::<f32>::zeros((0, 0)); cache.steps.len()];

        let Some(first) = cache.steps.first() else {
            return Ok((grads, d_inputs));
        };
        let batch = first.x.nrows();
        let mut dh_next = Array2::<f32>::zeros((batch, hs));
        let mut dc_next = Array2::<f32>::zeros((batch, hs));

        for (t, step) in cache.steps.iter().enumerate().rev() {
            let dh = &d_outputs[t] + &dh_next;

            let d_o = &dh * &step.tanh_c;
            let dc = &dc_next + &(&dh * &step.o * &step.tanh_c.mapv(|v| 1.0 - v * v));

            let d_f = &dc * &step.c_prev;
            let d_i = &dc * &step.g;
            let d_g = &dc * &step.i;

            let mut d_gates = Array2::<f32>::zeros((batch, 4 * hs));
            d_gates
                .slice_mut(s![.., 0..hs])
                .assign(&(&d_i * &step.i.mapv(|v| v * (1.0 - v))));
            d_gates
                .slice_mut(s![.., hs..2 * hs])
                .assign(&(&d_f * &step.f.mapv(|v| v * (1.0 - v))));
            d_gates
                .slice_mut(s![.., 2 * hs..3 * hs])
                .assign(&(&d_g * &step.g.mapv(|v| 1.0 - v * v)));
            d_gates
                .slice_mut(s![.., 3 * hs..4 * hs])
                .assign(&(&d_o * &step.o.mapv(|v| v * (1.0 - v))));

            grads.w_ih += &d_gates.t().dot(&step.x);
            grads.w_hh += &d_gates.t().dot(&step.h_prev);
            let d_bias = d_gates.sum_axis(Axis(0));
            grads.b_ih += &d_bias;
            grads.b_hh += &d_bias;

            d_inputs[t] = d_gates.dot(&self.params.w_ih);
            dh_next = d_gates.dot(&self.params.w_hh);
            dc_next = &dc * &step.f;
        }

        Ok((grads, d_inputs))
    }
}
