use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::SeedableRng;
use stgat::core::TrainingConfig;
use stgat::data::{DatasetSource, SyntheticSource};
use stgat::gnn::{ModelSpec, StGat};
use stgat::graph::{GraphBatch, GraphSample};
use stgat::training::mse;

/// Helper to build one batch of `batch_size` graphs from the synthetic signal
fn setup(n_nodes: usize, batch_size: usize) -> (StGat, GraphBatch) {
    let config = TrainingConfig::default();
    let source = SyntheticSource {
        n_nodes,
        ..Default::default()
    };
    let dataset = source.build(&config).unwrap();
    let picked: Vec<&GraphSample> = dataset.samples.iter().take(batch_size).collect();
    let batch = GraphBatch::collate(&dataset.graph, &picked).unwrap();

    let mut rng = StdRng::seed_from_u64(0);
    let spec = ModelSpec::new(n_nodes, config.n_hist, config.n_pred, 0.2);
    (StGat::new(spec, &mut rng).unwrap(), batch)
}

/// Benchmark: evaluation-mode forward pass
fn bench_forward(c: &mut Criterion) {
    let mut group = c.benchmark_group("forward");

    for n_nodes in [4, 16, 64].iter() {
        let (model, batch) = setup(*n_nodes, 50);
        group.throughput(Throughput::Elements(batch.total_nodes() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n_nodes), &batch, |b, batch| {
            b.iter(|| black_box(model.forward(batch).unwrap()));
        });
    }

    group.finish();
}

/// Benchmark: training step without the optimizer update
fn bench_forward_backward(c: &mut Criterion) {
    let mut group = c.benchmark_group("forward_backward");

    for n_nodes in [4, 16].iter() {
        let (model, batch) = setup(*n_nodes, 50);
        let mut rng = StdRng::seed_from_u64(1);
        group.bench_with_input(BenchmarkId::from_parameter(n_nodes), &batch, |b, batch| {
            b.iter(|| {
                let (forecast, cache) = model.forward_train(batch, &mut rng).unwrap();
                let (_, d_pred) = mse(&forecast.predictions, &batch.targets).unwrap();
                black_box(model.backward(batch, &cache, &d_pred).unwrap())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_forward, bench_forward_backward);
criterion_main!(benches);
