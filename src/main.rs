//! stgat - spatio-temporal graph attention forecasting CLI

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use stgat::core::{Result, RunOptions, TrainingConfig};
use stgat::data::{DatasetSource, SignalSource, SyntheticSource};
use stgat::monitoring::{init_logging, LogConfig, LogFormat};
use stgat::search::{GridSearchDriver, JsonLinesResultsLog, JsonResultsLog, ParamGrid, ResultsSink};
use stgat::{pipeline, viz};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "stgat")]
#[command(about = "Spatio-temporal graph attention forecaster", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct DataArgs {
    /// Training configuration (JSON, upper-case keys)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Recorded signal (JSON with `signal`, optional `adjacency`, `slots_per_day`)
    #[arg(long, conflicts_with = "synthetic")]
    signal: Option<PathBuf>,

    /// Use the built-in synthetic signal
    #[arg(long)]
    synthetic: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Train (or load) a model and evaluate it on the test split
    Train {
        #[command(flatten)]
        data: DataArgs,

        /// Directory holding models and runs
        #[arg(long, default_value = ".")]
        root: PathBuf,

        /// Experiment name
        #[arg(long, default_value = "Predicting_Breadcrumbs_Movement")]
        name: String,

        /// Load a saved model instead of training when one exists
        #[arg(long)]
        reuse: bool,

        /// Do not save the trained model
        #[arg(long)]
        no_save: bool,

        /// Capture attention at the first, middle and last epoch
        #[arg(long)]
        save_attention: bool,

        /// Plot predictions for these nodes (repeatable)
        #[arg(long = "plot-node")]
        plot_nodes: Vec<usize>,

        /// Overlay every horizon step in the plots
        #[arg(long)]
        full: bool,

        /// Days to show in the plots
        #[arg(long)]
        days: Option<usize>,
    },

    /// Run one (hyperparameter set, fold) trial of the grid search
    Search {
        /// Index into the hyperparameter grid
        param_index: usize,

        /// Fold index (0 -> 70 %, 1 -> 80 %, 2 -> 90 % training data)
        fold_index: usize,

        #[command(flatten)]
        data: DataArgs,

        /// Hyperparameter grid (JSON, upper-case keys)
        #[arg(short, long)]
        grid: Option<PathBuf>,

        /// Results log
        #[arg(short, long, default_value = "results.json")]
        results: PathBuf,

        /// Append one JSON record per line instead of rewriting the document
        #[arg(long)]
        jsonl: bool,
    },

    /// Print the number of hyperparameter combinations
    GridSize {
        /// Hyperparameter grid (JSON, upper-case keys)
        #[arg(short, long)]
        grid: Option<PathBuf>,
    },
}

fn load_config(path: Option<&Path>) -> Result<TrainingConfig> {
    match path {
        Some(path) => TrainingConfig::from_json_file(path),
        None => Ok(TrainingConfig::default()),
    }
}

fn load_grid(path: Option<&Path>) -> Result<ParamGrid> {
    match path {
        Some(path) => ParamGrid::from_json_file(path),
        None => Ok(ParamGrid::default()),
    }
}

fn load_source(data: &DataArgs, config: &mut TrainingConfig) -> Result<Box<dyn DatasetSource>> {
    match &data.signal {
        Some(path) => {
            let source = SignalSource::from_json_file(path)?;
            if let Some(slots) = source.slots_per_day() {
                config.slots_per_day = slots;
            }
            Ok(Box::new(source))
        }
        None => {
            if !data.synthetic {
                info!("no --signal given, using the synthetic signal");
            }
            let source = SyntheticSource {
                seed: config.seed,
                slots_per_day: config.slots_per_day,
                ..Default::default()
            };
            Ok(Box::new(source))
        }
    }
}

fn execute(command: Commands) -> Result<()> {
    match command {
        Commands::Train {
            data,
            root,
            name,
            reuse,
            no_save,
            save_attention,
            plot_nodes,
            full,
            days,
        } => {
            let mut config = load_config(data.config.as_deref())?;
            let source = load_source(&data, &mut config)?;
            let paths = pipeline::setup_directories(&root, &name)?;
            let options = RunOptions {
                retrain: !reuse,
                save_model: !no_save,
                save_attention,
            };

            let report = pipeline::run(config, source.as_ref(), &paths, &options)?;
            info!(
                trained = report.trained,
                mae = report.test.mae,
                rmse = report.test.rmse,
                mape = report.test.mape,
                "test evaluation"
            );

            let plot_dir = paths.runs_dir.join("predictions");
            for (rank, node) in plot_nodes.into_iter().enumerate() {
                let label = node.to_string();
                let plot = if full {
                    viz::plot_prediction_full
                } else {
                    viz::plot_prediction
                };
                plot(&report.test, node, &label, rank, &report.config, days, &plot_dir)?;
            }
            Ok(())
        }

        Commands::Search {
            param_index,
            fold_index,
            data,
            grid,
            results,
            jsonl,
        } => {
            let mut config = load_config(data.config.as_deref())?;
            let grid = load_grid(grid.as_deref())?;
            let source = load_source(&data, &mut config)?;
            let sink: Box<dyn ResultsSink> = if jsonl {
                Box::new(JsonLinesResultsLog::new(results))
            } else {
                Box::new(JsonResultsLog::new(results))
            };

            let mut driver = GridSearchDriver::new(config, grid, source.as_ref(), sink.as_ref());
            let summary = driver.run_trial(param_index, fold_index)?;
            for trial in &summary.trials {
                info!(
                    fold = trial.fold,
                    train_ratio = trial.train_ratio,
                    mae = trial.mae,
                    epochs = trial.epochs,
                    "trial recorded"
                );
            }
            Ok(())
        }

        Commands::GridSize { grid } => {
            let grid = load_grid(grid.as_deref())?;
            println!("{}", grid.len());
            Ok(())
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut log_config = if cli.debug {
        LogConfig::debug()
    } else {
        LogConfig::default()
    };
    if cli.json_logs {
        log_config.format = LogFormat::Json;
    }
    if let Err(e) = init_logging(&log_config) {
        eprintln!("failed to initialise logging: {e}");
    }

    match execute(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "command failed");
            ExitCode::FAILURE
        }
    }
}
