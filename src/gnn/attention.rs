//! Multi-head graph attention with head averaging.
//!
//! Each head projects node features with a shared weight matrix, scores
//! every incoming edge with `LeakyReLU(a_l · z_src + a_r · z_dst)`, and
//! aggregates neighbours by the softmax of those scores. Head outputs are
//! averaged rather than concatenated, so the layer maps `in -> out` for any
//! head count.

use super::init::{dropout_mask, xavier_normal, Parameterized};
use crate::core::{Error, Result};
use crate::graph::GraphBatch;
use ndarray::{s, Array1, Array2, ArrayViewD, ArrayViewMutD, Axis};
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Attention heads used by the forecaster.
pub const NUM_HEADS: usize = 8;

const NEGATIVE_SLOPE: f32 = 0.2;

fn leaky_relu(x: f32) -> f32 {
    if x > 0.0 {
        x
    } else {
        NEGATIVE_SLOPE * x
    }
}

/// Learnable tensors of the attention layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GatParams {
    /// Projection, shape `(heads * out, in)`
    pub fc: Array2<f32>,
    /// Source-side attention vector per head, shape `(heads, out)`
    pub attn_l: Array2<f32>,
    /// Destination-side attention vector per head, shape `(heads, out)`
    pub attn_r: Array2<f32>,
    /// Per-head bias, length `heads * out`
    pub bias: Array1<f32>,
}

impl GatParams {
    pub fn zeros_like(&self) -> Self {
        Self {
            fc: Array2::zeros(self.fc.dim()),
            attn_l: Array2::zeros(self.attn_l.dim()),
            attn_r: Array2::zeros(self.attn_r.dim()),
            bias: Array1::zeros(self.bias.len()),
        }
    }
}

impl Parameterized for GatParams {
    fn parameters(&self) -> Vec<ArrayViewD<'_, f32>> {
        vec![
            self.fc.view().into_dyn(),
            self.attn_l.view().into_dyn(),
            self.attn_r.view().into_dyn(),
            self.bias.view().into_dyn(),
        ]
    }

    fn parameters_mut(&mut self) -> Vec<ArrayViewMutD<'_, f32>> {
        vec![
            self.fc.view_mut().into_dyn(),
            self.attn_l.view_mut().into_dyn(),
            self.attn_r.view_mut().into_dyn(),
            self.bias.view_mut().into_dyn(),
        ]
    }
}

/// Intermediate values kept for the backward pass.
#[derive(Clone, Debug)]
pub struct GatCache {
    /// Input after feature dropout, `(M, in)`
    input: Array2<f32>,
    /// Projected features, `(M, heads * out)`
    z: Array2<f32>,
    /// Edge scores before the LeakyReLU, `(E, heads)`
    scores: Array2<f32>,
    /// Normalized attention, `(E, heads)`
    alpha: Array2<f32>,
}

/// Graph attention convolution whose heads are averaged.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AveragedGatConv {
    in_feats: usize,
    out_feats: usize,
    num_heads: usize,
    feat_drop: f32,
    pub params: GatParams,
}

impl AveragedGatConv {
    /// Create a layer with Xavier-normal weights (gain √2) and zero bias.
    pub fn new(
        in_feats: usize,
        out_feats: usize,
        num_heads: usize,
        feat_drop: f32,
        rng: &mut dyn RngCore,
    ) -> Self {
        let gain = 2.0f32.sqrt();
        let width = num_heads * out_feats;

        let fc = xavier_normal((width, in_feats), in_feats, width, gain, rng);
        // Fans of a (1, heads, out) tensor: in = heads * out, out = out.
        let attn_l = xavier_normal((num_heads, out_feats), width, out_feats, gain, rng);
        let attn_r = xavier_normal((num_heads, out_feats), width, out_feats, gain, rng);

        Self {
            in_feats,
            out_feats,
            num_heads,
            feat_drop,
            params: GatParams {
                fc,
                attn_l,
                attn_r,
                bias: Array1::zeros(width),
            },
        }
    }

    pub fn num_heads(&self) -> usize {
        self.num_heads
    }

    pub fn input_dim(&self) -> usize {
        self.in_feats
    }

    /// Width of the averaged output; independent of the head count.
    pub fn output_dim(&self) -> usize {
        self.out_feats
    }

    fn head(&self, h: usize) -> std::ops::Range<usize> {
        h * self.out_feats..(h + 1) * self.out_feats
    }

    /// Apply the layer to `x` (`(M, in)`) over the batch's edges.
    ///
    /// Feature dropout runs only when `rng` is given. Returns the averaged
    /// output `(M, out)`, the attention matrix `(E, heads)` and the cache.
    pub fn forward(
        &self,
        batch: &GraphBatch,
        x: &Array2<f32>,
        rng: Option<&mut dyn RngCore>,
    ) -> Result<(Array2<f32>, Array2<f32>, GatCache)> {
        let m = batch.total_nodes();
        if x.dim() != (m, self.in_feats) {
            return Err(Error::shape_mismatch((m, self.in_feats), x.dim()));
        }
        if let Some(node) = batch.incoming().iter().position(Vec::is_empty) {
            return Err(Error::ZeroInDegree(node));
        }

        let input = match rng {
            Some(rng) if self.feat_drop > 0.0 => x * &dropout_mask(x.dim(), self.feat_drop, rng),
            _ => x.clone(),
        };

        let heads = self.num_heads;
        let z = input.dot(&self.params.fc.t());

        let mut el = Array2::<f32>::zeros((m, heads));
        let mut er = Array2::<f32>::zeros((m, heads));
        for node in 0..m {
            for h in 0..heads {
                let zh = z.slice(s![node, self.head(h)]);
                el[[node, h]] = zh.dot(&self.params.attn_l.row(h));
                er[[node, h]] = zh.dot(&self.params.attn_r.row(h));
            }
        }

        let edges = batch.edges();
        let mut scores = Array2::<f32>::zeros((edges.len(), heads));
        for (e, &(src, dst)) in edges.iter().enumerate() {
            for h in 0..heads {
                scores[[e, h]] = el[[src, h]] + er[[dst, h]];
            }
        }

        // Edge softmax over the incoming edges of each destination.
        let mut alpha = Array2::<f32>::zeros((edges.len(), heads));
        for inc in batch.incoming() {
            for h in 0..heads {
                let max = inc
                    .iter()
                    .map(|&e| leaky_relu(scores[[e, h]]))
                    .fold(f32::NEG_INFINITY, f32::max);
                let mut sum = 0.0;
                for &e in inc {
                    let w = (leaky_relu(scores[[e, h]]) - max).exp();
                    alpha[[e, h]] = w;
                    sum += w;
                }
                for &e in inc {
                    alpha[[e, h]] /= sum;
                }
            }
        }

        let mut rst = Array2::<f32>::zeros((m, heads * self.out_feats));
        for (e, &(src, dst)) in edges.iter().enumerate() {
            for h in 0..heads {
                let zs = z.slice(s![src, self.head(h)]);
                rst.slice_mut(s![dst, self.head(h)])
                    .scaled_add(alpha[[e, h]], &zs);
            }
        }
        rst += &self.params.bias;

        let mut output = Array2::<f32>::zeros((m, self.out_feats));
        for h in 0..heads {
            output += &rst.slice(s![.., self.head(h)]);
        }
        output /= heads as f32;

        let attention = alpha.clone();
        Ok((
            output,
            attention,
            GatCache {
                input,
                z,
                scores,
                alpha,
            },
        ))
    }

    /// Parameter gradients given `d_output` (`(M, out)`).
    pub fn backward(&self, batch: &GraphBatch, cache: &GatCache, d_output: &Array2<f32>) -> GatParams {
        let heads = self.num_heads;
        let m = batch.total_nodes();
        let edges = batch.edges();
        let GatCache {
            input,
            z,
            scores,
            alpha,
        } = cache;

        let mut d_rst = Array2::<f32>::zeros((m, heads * self.out_feats));
        let shared = d_output / heads as f32;
        for h in 0..heads {
            d_rst.slice_mut(s![.., self.head(h)]).assign(&shared);
        }
        let d_bias = d_rst.sum_axis(Axis(0));

        let mut dz = Array2::<f32>::zeros(z.dim());
        let mut d_alpha = Array2::<f32>::zeros(alpha.dim());
        for (e, &(src, dst)) in edges.iter().enumerate() {
            for h in 0..heads {
                let dr = d_rst.slice(s![dst, self.head(h)]);
                d_alpha[[e, h]] = dr.dot(&z.slice(s![src, self.head(h)]));
                dz.slice_mut(s![src, self.head(h)])
                    .scaled_add(alpha[[e, h]], &dr);
            }
        }

        let mut d_el = Array2::<f32>::zeros((m, heads));
        let mut d_er = Array2::<f32>::zeros((m, heads));
        for inc in batch.incoming() {
            for h in 0..heads {
                let weighted: f32 = inc.iter().map(|&e| alpha[[e, h]] * d_alpha[[e, h]]).sum();
                for &e in inc {
                    let d_act = alpha[[e, h]] * (d_alpha[[e, h]] - weighted);
                    let slope = if scores[[e, h]] > 0.0 { 1.0 } else { NEGATIVE_SLOPE };
                    let d_score = d_act * slope;
                    let (src, dst) = edges[e];
                    d_el[[src, h]] += d_score;
                    d_er[[dst, h]] += d_score;
                }
            }
        }

        let mut d_attn_l = Array2::<f32>::zeros(self.params.attn_l.dim());
        let mut d_attn_r = Array2::<f32>::zeros(self.params.attn_r.dim());
        for node in 0..m {
            for h in 0..heads {
                let zh = z.slice(s![node, self.head(h)]);
                d_attn_l.row_mut(h).scaled_add(d_el[[node, h]], &zh);
                d_attn_r.row_mut(h).scaled_add(d_er[[node, h]], &zh);

                let mut dzh = dz.slice_mut(s![node, self.head(h)]);
                dzh.scaled_add(d_el[[node, h]], &self.params.attn_l.row(h));
                dzh.scaled_add(d_er[[node, h]], &self.params.attn_r.row(h));
            }
        }

        GatParams {
            fc: dz.t().dot(input),
            attn_l: d_attn_l,
            attn_r: d_attn_r,
            bias: d_bias,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Edge, Graph, GraphSample};
    use approx::assert_relative_eq;
    use ndarray_rand::rand_distr::Uniform;
    use ndarray_rand::RandomExt;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn batch(n: usize, h: usize, b: usize, rng: &mut StdRng) -> GraphBatch {
        let graph = Graph::fully_connected(n);
        let samples: Vec<GraphSample> = (0..b)
            .map(|_| {
                GraphSample::new(
                    Array2::random_using((n, h), Uniform::new(-1.0, 1.0), rng),
                    Array2::zeros((n, 1)),
                )
                .unwrap()
            })
            .collect();
        let refs: Vec<&GraphSample> = samples.iter().collect();
        GraphBatch::collate(&graph, &refs).unwrap()
    }

    #[test]
    fn test_output_width_is_input_width_for_any_head_count() {
        let mut rng = StdRng::seed_from_u64(0);
        let b = batch(4, 12, 2, &mut rng);
        for heads in [1, 3, NUM_HEADS] {
            let layer = AveragedGatConv::new(12, 12, heads, 0.0, &mut rng);
            let (out, attn, _) = layer.forward(&b, &b.features, None).unwrap();
            assert_eq!(out.dim(), (8, 12));
            assert_eq!(attn.dim(), (b.edges().len(), heads));
            assert_eq!(layer.output_dim(), 12);
        }
    }

    #[test]
    fn test_attention_sums_to_one_per_destination() {
        let mut rng = StdRng::seed_from_u64(1);
        let b = batch(5, 6, 3, &mut rng);
        let layer = AveragedGatConv::new(6, 6, NUM_HEADS, 0.0, &mut rng);
        let (_, attn, _) = layer.forward(&b, &b.features, None).unwrap();

        for inc in b.incoming() {
            for h in 0..NUM_HEADS {
                let total: f32 = inc.iter().map(|&e| attn[[e, h]]).sum();
                assert_relative_eq!(total, 1.0, epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn test_single_self_loop_copies_projection() {
        let mut rng = StdRng::seed_from_u64(2);
        let graph = Graph::new(1, vec![Edge { src: 0, dst: 0, weight: 1.0 }]).unwrap();
        let sample = GraphSample::new(Array2::from_elem((1, 3), 0.5), Array2::zeros((1, 1))).unwrap();
        let b = GraphBatch::collate(&graph, &[&sample]).unwrap();

        let layer = AveragedGatConv::new(3, 3, 2, 0.0, &mut rng);
        let (out, _, _) = layer.forward(&b, &b.features, None).unwrap();

        let z = b.features.dot(&layer.params.fc.t());
        let expected = (&z.slice(s![.., 0..3]) + &z.slice(s![.., 3..6])) / 2.0;
        for (a, e) in out.iter().zip(expected.iter()) {
            assert_relative_eq!(*a, *e, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_edge_weights_do_not_change_attention() {
        let mut rng = StdRng::seed_from_u64(6);
        let unit = Graph::from_adjacency(&ndarray::array![[0.0, 1.0], [1.0, 0.0]]).unwrap();
        let scaled = Graph::from_adjacency(&ndarray::array![[0.0, 0.2], [7.5, 0.0]]).unwrap();
        assert_ne!(unit, scaled);

        let sample = GraphSample::new(
            Array2::random_using((2, 4), Uniform::new(-1.0, 1.0), &mut rng),
            Array2::zeros((2, 1)),
        )
        .unwrap();
        let layer = AveragedGatConv::new(4, 4, 2, 0.0, &mut rng);

        let a = GraphBatch::collate(&unit, &[&sample]).unwrap();
        let b = GraphBatch::collate(&scaled, &[&sample]).unwrap();
        let (out_a, attn_a, _) = layer.forward(&a, &a.features, None).unwrap();
        let (out_b, attn_b, _) = layer.forward(&b, &b.features, None).unwrap();
        assert_eq!(out_a, out_b);
        assert_eq!(attn_a, attn_b);
    }

    #[test]
    fn test_zero_in_degree_is_an_error() {
        let mut rng = StdRng::seed_from_u64(3);
        let graph = Graph::new(2, vec![Edge { src: 0, dst: 0, weight: 1.0 }]).unwrap();
        let sample = GraphSample::new(Array2::zeros((2, 3)), Array2::zeros((2, 1))).unwrap();
        let b = GraphBatch::collate(&graph, &[&sample]).unwrap();

        let layer = AveragedGatConv::new(3, 3, 2, 0.0, &mut rng);
        assert!(matches!(
            layer.forward(&b, &b.features, None),
            Err(Error::ZeroInDegree(1))
        ));
    }

    #[test]
    fn test_wrong_input_width() {
        let mut rng = StdRng::seed_from_u64(4);
        let b = batch(3, 5, 1, &mut rng);
        let layer = AveragedGatConv::new(4, 4, 2, 0.0, &mut rng);
        assert!(matches!(
            layer.forward(&b, &b.features, None),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_parameter_count() {
        let mut rng = StdRng::seed_from_u64(5);
        let layer = AveragedGatConv::new(12, 12, NUM_HEADS, 0.0, &mut rng);
        let width = NUM_HEADS * 12;
        assert_eq!(layer.params.parameter_count(), width * 12 + 2 * width + width);
    }
}
