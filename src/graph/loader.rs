//! Mini-batch iteration over a slice of samples.

use super::batch::{GraphBatch, GraphSample};
use super::topology::Graph;
use crate::core::{Error, Result};
use rand::seq::SliceRandom;
use rand::Rng;

/// Iterates samples in fixed-size batches; the last batch may be short.
pub struct BatchLoader<'a> {
    graph: &'a Graph,
    samples: &'a [GraphSample],
    batch_size: usize,
    order: Vec<usize>,
}

impl<'a> BatchLoader<'a> {
    /// Loader in dataset order.
    pub fn new(graph: &'a Graph, samples: &'a [GraphSample], batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(Error::InvalidConfig("batch size must be positive".into()));
        }
        Ok(Self {
            graph,
            samples,
            batch_size,
            order: (0..samples.len()).collect(),
        })
    }

    /// Permute the sample order; call once per epoch for shuffled training.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.order.shuffle(rng);
    }

    /// Number of batches.
    pub fn len(&self) -> usize {
        self.samples.len().div_ceil(self.batch_size)
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn graph(&self) -> &Graph {
        self.graph
    }

    /// Collate batches lazily.
    pub fn iter(&self) -> impl Iterator<Item = Result<GraphBatch>> + '_ {
        self.order.chunks(self.batch_size).map(move |chunk| {
            let picked: Vec<&GraphSample> = chunk.iter().map(|&i| &self.samples[i]).collect();
            GraphBatch::collate(self.graph, &picked)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn samples(count: usize) -> Vec<GraphSample> {
        (0..count)
            .map(|i| {
                GraphSample::new(
                    Array2::from_elem((2, 3), i as f32),
                    Array2::zeros((2, 1)),
                )
                .unwrap()
            })
            .collect()
    }

    #[test]
    fn test_batch_count_and_last_batch() {
        let graph = Graph::fully_connected(2);
        let data = samples(7);
        let loader = BatchLoader::new(&graph, &data, 3).unwrap();

        assert_eq!(loader.len(), 3);
        let sizes: Vec<usize> = loader.iter().map(|b| b.unwrap().batch_size()).collect();
        assert_eq!(sizes, vec![3, 3, 1]);
    }

    #[test]
    fn test_order_preserved_without_shuffle() {
        let graph = Graph::fully_connected(2);
        let data = samples(4);
        let loader = BatchLoader::new(&graph, &data, 2).unwrap();

        let first = loader.iter().next().unwrap().unwrap();
        assert_eq!(first.features[[0, 0]], 0.0);
        assert_eq!(first.features[[2, 0]], 1.0);
    }

    #[test]
    fn test_shuffle_keeps_every_sample() {
        let graph = Graph::fully_connected(2);
        let data = samples(10);
        let mut loader = BatchLoader::new(&graph, &data, 4).unwrap();
        loader.shuffle(&mut StdRng::seed_from_u64(7));

        let mut seen: Vec<i32> = loader
            .iter()
            .flat_map(|b| {
                let b = b.unwrap();
                (0..b.batch_size())
                    .map(|i| b.features[[i * 2, 0]] as i32)
                    .collect::<Vec<_>>()
            })
            .collect();
        seen.sort();
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_zero_batch_size() {
        let graph = Graph::fully_connected(2);
        let data = samples(1);
        assert!(BatchLoader::new(&graph, &data, 0).is_err());
    }
}
