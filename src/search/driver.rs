//! Grid-search driver.
//!
//! A trial is one (hyperparameter set, fold) pair. Each trial trains a fresh
//! model for the learning rate's epoch budget on the fold's training prefix,
//! validates on the window right after it and records the final validation
//! MAE. Trials are addressed by index so separate processes can each run one.

use super::folds::{Fold, FoldSchedule};
use super::grid::{HyperParams, ParamGrid};
use super::results::{ResultRecord, ResultsSink};
use crate::core::{Error, Result, TrainingConfig};
use crate::data::{DatasetSource, ProcessedDataset};
use crate::gnn::{ModelSpec, StGat};
use crate::graph::BatchLoader;
use crate::training::{epoch_budget, fit, Adam, AdamConfig, FitOptions};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{error, info};

/// The dataset built for the most recent window sizes.
///
/// Consecutive trials that share `N_HIST` and `N_PRED` reuse it.
#[derive(Debug, Default)]
pub struct DatasetCache {
    last_history_length: Option<usize>,
    last_prediction_length: Option<usize>,
    dataset: Option<ProcessedDataset>,
    builds: usize,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times a dataset was (re)built.
    pub fn builds(&self) -> usize {
        self.builds
    }

    /// Dataset for `config.n_hist` / `config.n_pred`, rebuilt only when those
    /// changed. Node count and statistics are written back into `config`.
    pub fn get_or_build(
        &mut self,
        source: &dyn DatasetSource,
        config: &mut TrainingConfig,
    ) -> Result<&ProcessedDataset> {
        let stale = self.last_history_length != Some(config.n_hist)
            || self.last_prediction_length != Some(config.n_pred)
            || self.dataset.is_none();

        if stale {
            info!(
                n_hist = config.n_hist,
                n_pred = config.n_pred,
                "window sizes changed, regenerating graph dataset"
            );
            let dataset = source.build(config)?;
            self.last_history_length = Some(config.n_hist);
            self.last_prediction_length = Some(config.n_pred);
            self.builds += 1;
            self.dataset = Some(dataset);
        }

        match &self.dataset {
            Some(dataset) => {
                dataset.apply_to(config);
                Ok(dataset)
            }
            None => Err(Error::Internal("dataset cache empty after build".into())),
        }
    }
}

/// Result of one finished trial.
#[derive(Clone, Debug, PartialEq)]
pub struct TrialOutcome {
    pub params: HyperParams,
    pub fold: usize,
    pub train_ratio: f64,
    pub train_size: usize,
    pub val_size: usize,
    pub epochs: usize,
    pub mae: f64,
}

/// All trials run for one hyperparameter set.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchSummary {
    pub params: HyperParams,
    pub trials: Vec<TrialOutcome>,
    /// `Σ train_ratio · mae` over the trials, divided by the number of folds
    /// in scope
    pub weighted_mae: f64,
}

pub struct GridSearchDriver<'a> {
    config: TrainingConfig,
    grid: ParamGrid,
    schedule: FoldSchedule,
    source: &'a dyn DatasetSource,
    sink: &'a dyn ResultsSink,
    cache: DatasetCache,
}

impl<'a> GridSearchDriver<'a> {
    pub fn new(
        config: TrainingConfig,
        grid: ParamGrid,
        source: &'a dyn DatasetSource,
        sink: &'a dyn ResultsSink,
    ) -> Self {
        Self {
            config,
            grid,
            schedule: FoldSchedule::default(),
            source,
            sink,
            cache: DatasetCache::new(),
        }
    }

    pub fn with_schedule(mut self, schedule: FoldSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn grid(&self) -> &ParamGrid {
        &self.grid
    }

    pub fn schedule(&self) -> &FoldSchedule {
        &self.schedule
    }

    pub fn cache(&self) -> &DatasetCache {
        &self.cache
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Run the single trial at (`param_index`, `fold_index`).
    pub fn run_trial(&mut self, param_index: usize, fold_index: usize) -> Result<SearchSummary> {
        let params = self.grid.combination(param_index)?;
        self.schedule.train_ratio(fold_index)?;
        self.run_param_set(params, &[fold_index])
    }

    /// Run every fold of every combination in enumeration order.
    pub fn run_all(&mut self) -> Result<Vec<SearchSummary>> {
        if self.grid.is_empty() {
            return Err(Error::InvalidConfig("hyperparameter grid is empty".into()));
        }
        let folds: Vec<usize> = (0..self.schedule.len()).collect();
        let combinations: Vec<HyperParams> = self.grid.iter().collect();
        combinations
            .into_iter()
            .map(|params| self.run_param_set(params, &folds))
            .collect()
    }

    fn run_param_set(&mut self, params: HyperParams, folds: &[usize]) -> Result<SearchSummary> {
        info!(?params, "testing hyperparameters");

        self.config.n_hist = params.n_hist;
        self.config.n_pred = params.n_pred;
        let dataset = self.cache.get_or_build(self.source, &mut self.config)?;
        let num_graphs = dataset.len();

        let mut trials = Vec::with_capacity(folds.len());
        let mut weighted = 0.0f64;

        for &fold_index in folds {
            let Some(fold) = self.schedule.fold(fold_index, num_graphs)? else {
                error!(
                    fold = fold_index,
                    num_graphs,
                    "dataset too small for this fold's train and validation windows"
                );
                break;
            };

            let outcome = run_fold(dataset, &self.config, params, &fold)?;
            weighted += outcome.train_ratio * outcome.mae;
            self.sink
                .append(&ResultRecord::now(params, outcome.train_ratio, outcome.mae))?;
            trials.push(outcome);
        }

        let weighted_mae = weighted / folds.len().max(1) as f64;
        info!(?params, weighted_mae, "hyperparameter set finished");
        Ok(SearchSummary {
            params,
            trials,
            weighted_mae,
        })
    }
}

/// Train a fresh model on one fold and report its final validation MAE.
fn run_fold(
    dataset: &ProcessedDataset,
    config: &TrainingConfig,
    params: HyperParams,
    fold: &Fold,
) -> Result<TrialOutcome> {
    let epochs = epoch_budget(params.initial_lr)?;

    let train_samples = &dataset.samples[fold.train.clone()];
    let val_samples = &dataset.samples[fold.val.clone()];
    let mut train = BatchLoader::new(&dataset.graph, train_samples, config.batch_size)?;
    let val = BatchLoader::new(&dataset.graph, val_samples, config.batch_size)?;

    info!(
        fold = fold.index,
        train = train_samples.len(),
        train_ratio = fold.train_ratio,
        val = val_samples.len(),
        epochs,
        "starting fold"
    );

    let mut rng = StdRng::seed_from_u64(config.seed);
    let spec = ModelSpec::new(
        dataset.n_nodes(),
        params.n_hist,
        params.n_pred,
        params.dropout as f32,
    );
    let mut model = StGat::new(spec, &mut rng)?;
    let mut optimizer = Adam::new(AdamConfig::new(params.initial_lr, params.weight_decay));

    let options = FitOptions {
        epochs,
        shuffle: false,
        attention_epochs: Vec::new(),
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

    // Release the trial's weights and optimizer state before the next one.
    drop(optimizer);
    drop(model);

    let mae = outcome
        .val_mae
        .ok_or_else(|| Error::Internal("fold finished without validation".into()))?;
    info!(fold = fold.index, mae, epochs, "fold finished");

    Ok(TrialOutcome {
        params,
        fold: fold.index,
        train_ratio: fold.train_ratio,
        train_size: train_samples.len(),
        val_size: val_samples.len(),
        epochs,
        mae: mae as f64,
    })
}
