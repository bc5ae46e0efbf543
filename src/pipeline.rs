//! Train-or-load run pipeline.
//!
//! Builds the dataset, reuses a saved model when allowed, otherwise trains
//! (and optionally saves) one, then evaluates it on the test split.

use crate::core::{Result, RunOptions, TrainingConfig};
use crate::data::DatasetSource;
use crate::gnn::{ModelSpec, StGat};
use crate::graph::BatchLoader;
use crate::persist::{load_pretrained, save_attention, save_model, AttentionSnapshot};
use crate::training::{attention_epochs, evaluate, model_train, EvalReport};
use std::path::{Path, PathBuf};
use tracing::info;

pub const MODEL_FILE: &str = "model.bin";
pub const ATTENTION_FILE: &str = "attention.bin";

/// Where a run keeps its model and its per-run artifacts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunPaths {
    /// `<root>/models/<name>`, shared across runs
    pub model_dir: PathBuf,
    /// `<root>/runs/<name>/<timestamp>`, unique per run
    pub runs_dir: PathBuf,
}

impl RunPaths {
    pub fn model_path(&self) -> PathBuf {
        self.model_dir.join(MODEL_FILE)
    }

    pub fn attention_path(&self) -> PathBuf {
        self.model_dir.join(ATTENTION_FILE)
    }
}

/// Create the model and run directories for experiment `name` under `root`.
pub fn setup_directories(root: impl AsRef<Path>, name: &str) -> Result<RunPaths> {
    let root = root.as_ref();
    let model_dir = root.join("models").join(name);
    let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S%.3f").to_string();
    let runs_dir = root.join("runs").join(name).join(stamp);

    std::fs::create_dir_all(&model_dir)?;
    std::fs::create_dir_all(&runs_dir)?;
    info!(model_dir = %model_dir.display(), runs_dir = %runs_dir.display(), "directories ready");

    Ok(RunPaths {
        model_dir,
        runs_dir,
    })
}

/// Outcome of [`run`].
#[derive(Debug)]
pub struct RunReport {
    /// Config with node count and statistics filled in
    pub config: TrainingConfig,
    pub model: StGat,
    pub attention: Vec<AttentionSnapshot>,
    /// Whether the model was trained in this run (as opposed to loaded)
    pub trained: bool,
    pub test: EvalReport,
}

pub fn run(
    mut config: TrainingConfig,
    source: &dyn DatasetSource,
    paths: &RunPaths,
    options: &RunOptions,
) -> Result<RunReport> {
    config.validate()?;
    let dataset = source.build(&config)?;
    dataset.apply_to(&mut config);
    config.checkpoint_dir = paths.runs_dir.clone();

    let spec = ModelSpec::from_config(&config);
    let pretrained = if options.retrain {
        None
    } else {
        load_pretrained(paths.model_path(), paths.attention_path(), &spec)?
    };

    let (model, attention, trained) = match pretrained {
        Some((model, attention)) => (model, attention, false),
        None => {
            let capture = if options.save_attention {
                attention_epochs(config.epochs)
            } else {
                Vec::new()
            };
            let trained = model_train(&dataset, &config, &capture)?;
            let attention = trained.outcome.attention;

            if options.save_attention {
                save_attention(paths.attention_path(), &attention)?;
            }
            if options.save_model {
                save_model(&trained.model, paths.model_path())?;
            }
            (trained.model, attention, true)
        }
    };

    let test_loader = BatchLoader::new(&dataset.graph, dataset.test(), config.batch_size)?;
    let test = evaluate(&model, &test_loader, &dataset.stats, "Test")?;

    Ok(RunReport {
        config,
        model,
        attention,
        trained,
        test,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::SyntheticSource;
    use tempfile::tempdir;

    fn config() -> TrainingConfig {
        TrainingConfig {
            batch_size: 8,
            epochs: 2,
            n_hist: 4,
            n_pred: 2,
            initial_lr: 1e-3,
            ..Default::default()
        }
    }

    fn source() -> SyntheticSource {
        SyntheticSource {
            n_nodes: 3,
            n_slots: 72,
            ..Default::default()
        }
    }

    #[test]
    fn test_setup_directories() {
        let root = tempdir().unwrap();
        let paths = setup_directories(root.path(), "demo").unwrap();
        assert!(paths.model_dir.is_dir());
        assert!(paths.runs_dir.is_dir());
        assert!(paths.runs_dir.starts_with(root.path().join("runs").join("demo")));
        assert_eq!(paths.model_path(), root.path().join("models/demo/model.bin"));
    }

    #[test]
    fn test_train_save_then_load() {
        let root = tempdir().unwrap();
        let paths = setup_directories(root.path(), "demo").unwrap();
        let options = RunOptions {
            retrain: false,
            save_model: true,
            save_attention: true,
        };

        let first = run(config(), &source(), &paths, &options).unwrap();
        assert!(first.trained);
        assert_eq!(first.config.n_node, 3);
        assert!(!first.attention.is_empty());
        assert!(paths.model_path().exists());
        assert!(paths.attention_path().exists());

        let second = run(config(), &source(), &paths, &options).unwrap();
        assert!(!second.trained);
        assert_eq!(second.model, first.model);
        assert_eq!(second.attention, first.attention);
        assert_eq!(second.test.y_pred, first.test.y_pred);
    }

    #[test]
    fn test_missing_attention_forces_training() {
        let root = tempdir().unwrap();
        let paths = setup_directories(root.path(), "demo").unwrap();
        let options = RunOptions {
            retrain: false,
            save_model: true,
            save_attention: false,
        };

        run(config(), &source(), &paths, &options).unwrap();
        assert!(paths.model_path().exists());
        assert!(!paths.attention_path().exists());

        let again = run(config(), &source(), &paths, &options).unwrap();
        assert!(again.trained);
    }
}
