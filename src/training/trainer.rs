//! Epoch loop, evaluation and full training runs.

use super::loss::{mae, mape, mse, rmse};
use super::optimizer::{Adam, AdamConfig};
use super::schedule::is_validation_epoch;
use crate::core::{Error, Result, TrainingConfig};
use crate::data::{Normalization, ProcessedDataset};
use crate::gnn::{ModelSpec, StGat};
use crate::graph::BatchLoader;
use crate::persist::AttentionSnapshot;
use ndarray::{s, Array2, Array3};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tracing::{debug, info};

/// Metrics and denormalized outputs of one evaluation pass.
#[derive(Clone, Debug)]
pub struct EvalReport {
    pub mae: f32,
    pub rmse: f32,
    pub mape: f32,
    /// `(batches, batch_size * N, P)`; rows past a short last batch are zero
    pub y_pred: Array3<f32>,
    /// Same layout as `y_pred`
    pub y_truth: Array3<f32>,
}

/// Knobs for [`fit`].
#[derive(Clone, Debug, Default)]
pub struct FitOptions {
    pub epochs: usize,
    /// Reshuffle the training loader every epoch
    pub shuffle: bool,
    /// Epochs whose per-batch attention is captured
    pub attention_epochs: Vec<usize>,
}

/// What a [`fit`] run produced besides the updated model.
#[derive(Clone, Debug, Default)]
pub struct FitOutcome {
    /// Mean training loss per epoch
    pub train_losses: Vec<f32>,
    /// MAE of the most recent validation pass
    pub val_mae: Option<f32>,
    pub attention: Vec<AttentionSnapshot>,
}

/// A model trained by [`model_train`].
#[derive(Clone, Debug)]
pub struct TrainedModel {
    pub model: StGat,
    pub outcome: FitOutcome,
}

/// One optimisation pass over every batch; returns the mean batch loss.
pub fn train_epoch(
    model: &mut StGat,
    loader: &BatchLoader<'_>,
    optimizer: &mut Adam,
    rng: &mut dyn RngCore,
) -> Result<f32> {
    run_epoch(model, loader, optimizer, rng, None)
}

fn run_epoch(
    model: &mut StGat,
    loader: &BatchLoader<'_>,
    optimizer: &mut Adam,
    rng: &mut dyn RngCore,
    mut attention: Option<&mut Vec<Array2<f32>>>,
) -> Result<f32> {
    if loader.is_empty() {
        return Err(Error::InvalidData("no training samples".into()));
    }

    let mut total = 0.0f32;
    let mut batches = 0usize;
    for batch in loader.iter() {
        let batch = batch?;
        let (forecast, cache) = model.forward_train(&batch, &mut *rng)?;
        let (loss, d_pred) = mse(&forecast.predictions, &batch.targets)?;
        let grads = model.backward(&batch, &cache, &d_pred)?;
        optimizer.step(model, &grads)?;

        if let Some(store) = attention.as_deref_mut() {
            store.push(forecast.attention);
        }
        total += loss;
        batches += 1;
    }
    Ok(total / batches as f32)
}

/// Evaluation pass without dropout; metrics are computed on denormalized
/// values and averaged over batches.
pub fn evaluate(
    model: &StGat,
    loader: &BatchLoader<'_>,
    stats: &Normalization,
    label: &str,
) -> Result<EvalReport> {
    if loader.is_empty() {
        return Err(Error::InvalidData(format!("no samples to evaluate ({label})")));
    }

    let rows = loader.batch_size() * loader.graph().n_nodes();
    let horizon = model.spec().n_pred;
    let mut y_pred = Array3::<f32>::zeros((loader.len(), rows, horizon));
    let mut y_truth = Array3::<f32>::zeros((loader.len(), rows, horizon));
    let (mut mae_sum, mut rmse_sum, mut mape_sum) = (0.0f32, 0.0f32, 0.0f32);

    for (i, batch) in loader.iter().enumerate() {
        let batch = batch?;
        let forecast = model.forward(&batch)?;
        let pred = stats.denormalize_array(&forecast.predictions);
        let truth = stats.denormalize_array(&batch.targets);

        mae_sum += mae(&pred, &truth)?;
        rmse_sum += rmse(&pred, &truth)?;
        mape_sum += mape(&pred, &truth)?;

        let used = pred.nrows();
        y_pred.slice_mut(s![i, ..used, ..]).assign(&pred);
        y_truth.slice_mut(s![i, ..used, ..]).assign(&truth);
    }

    let batches = loader.len() as f32;
    let report = EvalReport {
        mae: mae_sum / batches,
        rmse: rmse_sum / batches,
        mape: mape_sum / batches,
        y_pred,
        y_truth,
    };
    info!(
        split = label,
        mae = report.mae,
        rmse = report.rmse,
        mape = report.mape,
        "evaluation"
    );
    Ok(report)
}

/// Train for `options.epochs`, validating every few epochs and on the last.
pub fn fit(
    model: &mut StGat,
    optimizer: &mut Adam,
    train: &mut BatchLoader<'_>,
    val: &BatchLoader<'_>,
    stats: &Normalization,
    options: &FitOptions,
    rng: &mut dyn RngCore,
) -> Result<FitOutcome> {
    let mut outcome = FitOutcome::default();

    for epoch in 0..options.epochs {
        if options.shuffle {
            train.shuffle(&mut *rng);
        }

        let capture = options.attention_epochs.contains(&epoch);
        let mut attention = Vec::new();
        let loss = run_epoch(
            model,
            train,
            optimizer,
            &mut *rng,
            capture.then_some(&mut attention),
        )?;
        debug!(epoch, loss, "epoch finished");
        outcome.train_losses.push(loss);

        outcome
            .attention
            .extend(attention.into_iter().enumerate().map(|(batch, weights)| {
                AttentionSnapshot {
                    epoch,
                    batch,
                    weights,
                }
            }));

        if is_validation_epoch(epoch, options.epochs) {
            let report = evaluate(model, val, stats, "Valid")?;
            info!(epoch, train_loss = loss, val_mae = report.mae, "validation");
            outcome.val_mae = Some(report.mae);
        }
    }

    Ok(outcome)
}

/// Train a fresh model on the dataset's train split for `config.epochs`.
///
/// The training loader is reshuffled every epoch. Attention is captured for
/// the epochs listed in `attention_epochs`.
pub fn model_train(
    dataset: &ProcessedDataset,
    config: &TrainingConfig,
    attention_epochs: &[usize],
) -> Result<TrainedModel> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut model = StGat::new(ModelSpec::from_config(config), &mut rng)?;
    let mut optimizer = Adam::new(AdamConfig::new(config.initial_lr, config.weight_decay));

    let mut train = BatchLoader::new(&dataset.graph, dataset.train(), config.batch_size)?;
    let val = BatchLoader::new(&dataset.graph, dataset.val(), config.batch_size)?;

    info!(
        epochs = config.epochs,
        train_samples = dataset.train().len(),
        val_samples = dataset.val().len(),
        parameters = crate::gnn::Parameterized::parameter_count(&model),
        "training model"
    );

    let options = FitOptions {
        epochs: config.epochs,
        shuffle: true,
        attention_epochs: attention_epochs.to_vec(),
    };
    let outcome = fit(
        &mut model,
        &mut optimizer,
        &mut train,
        &val,
        &dataset.stats,
        &options,
        &mut rng,
    )?;

    Ok(TrainedModel { model, outcome })
}
