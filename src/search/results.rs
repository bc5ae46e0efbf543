//! Trial results logs.
//!
//! Two on-disk layouts share the [`ResultsSink`] contract:
//!
//! - [`JsonResultsLog`]: a single `{"Results": [...]}` document that is read,
//!   extended in memory and rewritten on every append. The rewrite goes
//!   through a temporary file and a rename, so readers never observe a torn
//!   file, but two processes appending at the same time can still lose one
//!   of the records.
//! - [`JsonLinesResultsLog`]: one JSON record per line, appended with a
//!   single write on an append-mode handle. Concurrent appenders do not lose
//!   records.

use super::grid::HyperParams;
use crate::core::{completion_time, Result};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// One finished (hyperparameters, fold) trial.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub params: HyperParams,
    pub train_percent: f64,
    pub mae: f64,
    pub completion_time: String,
}

impl ResultRecord {
    /// Record stamped with the current local time.
    pub fn now(params: HyperParams, train_percent: f64, mae: f64) -> Self {
        Self {
            params,
            train_percent,
            mae,
            completion_time: completion_time(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultsFile {
    #[serde(rename = "Results")]
    pub results: Vec<ResultRecord>,
}

/// Destination for trial results.
pub trait ResultsSink {
    fn append(&self, record: &ResultRecord) -> Result<()>;

    /// Every record written so far, in append order.
    fn load(&self) -> Result<ResultsFile>;
}

/// `{"Results": [...]}` document, rewritten on each append.
#[derive(Clone, Debug)]
pub struct JsonResultsLog {
    path: PathBuf,
}

impl JsonResultsLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "results.json".to_string());
        self.path
            .with_file_name(format!(".{}.{}.tmp", name, std::process::id()))
    }

    fn write(&self, file: &ResultsFile) -> Result<()> {
        let mut bytes = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut bytes, formatter);
        file.serialize(&mut ser)?;

        let temp = self.temp_path();
        std::fs::write(&temp, &bytes)?;
        std::fs::rename(&temp, &self.path)?;
        Ok(())
    }
}

impl ResultsSink for JsonResultsLog {
    fn append(&self, record: &ResultRecord) -> Result<()> {
        let mut file = self.load()?;
        file.results.push(record.clone());
        self.write(&file)?;
        debug!(path = %self.path.display(), records = file.results.len(), "results rewritten");
        Ok(())
    }

    fn load(&self) -> Result<ResultsFile> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ResultsFile::default()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Append-only log with one JSON record per line.
#[derive(Clone, Debug)]
pub struct JsonLinesResultsLog {
    path: PathBuf,
}

impl JsonLinesResultsLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ResultsSink for JsonLinesResultsLog {
    fn append(&self, record: &ResultRecord) -> Result<()> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(&line)?;
        debug!(path = %self.path.display(), "result appended");
        Ok(())
    }

    fn load(&self) -> Result<ResultsFile> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ResultsFile::default()),
            Err(e) => return Err(e.into()),
        };

        let results = text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(serde_json::from_str)
            .collect::<std::result::Result<Vec<ResultRecord>, _>>()?;
        Ok(ResultsFile { results })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(i: usize) -> ResultRecord {
        ResultRecord {
            params: HyperParams {
                n_hist: 12,
                n_pred: 9,
                dropout: 0.2,
                initial_lr: 1e-3,
                weight_decay: 5e-5,
            },
            train_percent: 0.7 + 0.1 * (i % 3) as f64,
            mae: 1.5 + i as f64,
            completion_time: format!("2025-01-0{} 12:00:00.000000", i + 1),
        }
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let json = JsonResultsLog::new(dir.path().join("results.json"));
        let lines = JsonLinesResultsLog::new(dir.path().join("results.jsonl"));
        assert!(json.load().unwrap().results.is_empty());
        assert!(lines.load().unwrap().results.is_empty());
    }

    #[test]
    fn test_rewrite_log_keeps_order_and_values() {
        let dir = tempdir().unwrap();
        let log = JsonResultsLog::new(dir.path().join("results.json"));

        for i in 0..5 {
            log.append(&record(i)).unwrap();
        }

        let loaded = log.load().unwrap();
        let expected: Vec<ResultRecord> = (0..5).map(record).collect();
        assert_eq!(loaded.results, expected);

        // no temp file left behind
        let entries = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn test_rewrite_log_layout() {
        let dir = tempdir().unwrap();
        let log = JsonResultsLog::new(dir.path().join("results.json"));
        log.append(&record(0)).unwrap();

        let text = std::fs::read_to_string(log.path()).unwrap();
        assert!(text.starts_with("{\n    \"Results\": [\n        {\n            \"params\""));

        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        let first = &value["Results"][0];
        assert_eq!(first["params"]["N_HIST"], 12);
        assert_eq!(first["train_percent"], 0.7);
        assert_eq!(first["mae"], 1.5);
    }

    #[test]
    fn test_reads_existing_document() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("results.json");
        std::fs::write(
            &path,
            r#"{"Results": [{"params": {"N_HIST": 24, "N_PRED": 9, "DROPOUT": 0.5,
                "INITIAL_LR": 0.0005, "WEIGHT_DECAY": 0.0001}, "train_percent": 0.9,
                "mae": 3.25, "completion_time": "2025-02-01 08:00:00.000001"}]}"#,
        )
        .unwrap();

        let log = JsonResultsLog::new(&path);
        log.append(&record(1)).unwrap();
        let loaded = log.load().unwrap();
        assert_eq!(loaded.results.len(), 2);
        assert_eq!(loaded.results[0].params.n_hist, 24);
        assert_eq!(loaded.results[1], record(1));
    }

    #[test]
    fn test_jsonl_appends() {
        let dir = tempdir().unwrap();
        let log = JsonLinesResultsLog::new(dir.path().join("results.jsonl"));
        for i in 0..4 {
            log.append(&record(i)).unwrap();
        }

        let text = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(text.lines().count(), 4);
        let expected: Vec<ResultRecord> = (0..4).map(record).collect();
        assert_eq!(log.load().unwrap().results, expected);
    }

    #[test]
    fn test_record_now_stamps_time() {
        let r = ResultRecord::now(record(0).params, 0.8, 2.0);
        assert_eq!(r.completion_time.len(), 26);
    }
}
