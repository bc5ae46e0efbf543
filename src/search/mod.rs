//! Search Module
//!
//! Expanding-window hyperparameter grid search:
//! - `ParamGrid`: Cartesian grid with a stable enumeration order
//! - `FoldSchedule`: growing training prefix with a fixed validation window
//! - `ResultsSink`: where finished trials are recorded
//! - `GridSearchDriver`: runs selected (hyperparameters, fold) trials

pub mod driver;
pub mod folds;
pub mod grid;
pub mod results;

pub use driver::{DatasetCache, GridSearchDriver, SearchSummary, TrialOutcome};
pub use folds::{Fold, FoldSchedule, TRAIN_RATIOS, VAL_RATIO};
pub use grid::{HyperParams, ParamGrid};
pub use results::{JsonLinesResultsLog, JsonResultsLog, ResultRecord, ResultsFile, ResultsSink};
