//! Prediction vs. truth charts for a single node.

use super::canvas::{blue_shades, colors, Canvas, PlotConfig};
use crate::core::{Error, Result, TrainingConfig};
use crate::training::EvalReport;
use ndarray::Array3;
use std::path::{Path, PathBuf};
use tracing::info;

/// Time series of one node at one horizon step.
///
/// `y` is `(chunks, batch_size * n_nodes, P)` as produced by evaluation; the
/// chunks are read as `(chunks, batch_size, n_nodes, P)` and flattened over
/// chunk and batch position.
pub fn node_series(
    y: &Array3<f32>,
    batch_size: usize,
    n_nodes: usize,
    node: usize,
    horizon: usize,
) -> Result<Vec<f32>> {
    let (chunks, rows, steps) = y.dim();
    if rows != batch_size * n_nodes {
        return Err(Error::shape_mismatch(
            (chunks, batch_size * n_nodes, steps),
            y.dim(),
        ));
    }
    if node >= n_nodes {
        return Err(Error::IndexOutOfRange {
            what: "node",
            index: node,
            len: n_nodes,
        });
    }
    if horizon >= steps {
        return Err(Error::IndexOutOfRange {
            what: "horizon",
            index: horizon,
            len: steps,
        });
    }

    let mut series = Vec::with_capacity(chunks * batch_size);
    for chunk in 0..chunks {
        for b in 0..batch_size {
            series.push(y[[chunk, b * n_nodes + node, horizon]]);
        }
    }
    Ok(series)
}

/// `<dir>/rank{rank}_node{label}_predicted_densities.png`
pub fn prediction_path(dir: &Path, rank: usize, node_label: &str) -> PathBuf {
    dir.join(format!("rank{rank}_node{node_label}_predicted_densities.png"))
}

/// Number of slots covering whole days, capped by `num_days`.
fn visible_slots(total: usize, slots_per_day: usize, num_days: Option<usize>) -> Result<usize> {
    if slots_per_day == 0 {
        return Err(Error::InvalidConfig("SLOTS_PER_DAY must be positive".into()));
    }
    let total_days = total / slots_per_day;
    let days = match num_days {
        Some(d) if d <= total_days => d,
        _ => total_days,
    };
    if days == 0 {
        return Err(Error::InvalidData(format!(
            "{} slots do not cover one day of {} slots",
            total, slots_per_day
        )));
    }
    Ok(days * slots_per_day)
}

fn value_range<'a>(series: impl IntoIterator<Item = &'a [f32]>) -> (f64, f64) {
    series
        .into_iter()
        .flatten()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v as f64), hi.max(v as f64))
        })
}

fn points(values: &[f32], shift: usize) -> Vec<(f64, f64)> {
    values
        .iter()
        .enumerate()
        .map(|(t, &v)| ((t + shift) as f64, v as f64))
        .collect()
}

fn save(canvas: Canvas, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    canvas.into_image().save(path)?;
    Ok(())
}

/// Truth (red, solid) against the first-step prediction (blue, dashed) for
/// `node`, truncated to whole days.
pub fn plot_prediction(
    report: &EvalReport,
    node: usize,
    node_label: &str,
    rank: usize,
    config: &TrainingConfig,
    num_days: Option<usize>,
    dir: &Path,
) -> Result<PathBuf> {
    let truth = node_series(&report.y_truth, config.batch_size, config.n_node, node, 0)?;
    let pred = node_series(&report.y_pred, config.batch_size, config.n_node, node, 0)?;

    let end = visible_slots(truth.len(), config.slots_per_day, num_days)?;
    let (truth, pred) = (&truth[..end], &pred[..end]);

    let (lo, hi) = value_range([truth, pred]);
    let mut canvas = Canvas::new(PlotConfig::default(), (end - 1) as f64, lo, hi);
    canvas.polyline(&points(truth, 0), colors::RED, false);
    canvas.polyline(&points(pred, 0), colors::BLUE, true);

    let path = prediction_path(dir, rank, node_label);
    save(canvas, &path)?;
    info!(
        node = node_label,
        days = end / config.slots_per_day,
        path = %path.display(),
        "prediction visualization saved"
    );
    Ok(path)
}

/// Truth against every horizon step, step `i` shifted right by `i` slots and
/// drawn in progressively darker blue.
pub fn plot_prediction_full(
    report: &EvalReport,
    node: usize,
    node_label: &str,
    rank: usize,
    config: &TrainingConfig,
    num_days: Option<usize>,
    dir: &Path,
) -> Result<PathBuf> {
    let steps = report.y_pred.dim().2;
    let truth = node_series(&report.y_truth, config.batch_size, config.n_node, node, 0)?;
    let end = visible_slots(truth.len(), config.slots_per_day, num_days)?;
    let truth = &truth[..end];

    let mut horizons = Vec::with_capacity(steps);
    for step in 0..steps {
        let series = node_series(&report.y_pred, config.batch_size, config.n_node, node, step)?;
        // shifted by `step`, so only `end - step` points stay in view
        let keep = end.saturating_sub(step);
        horizons.push(series[..keep].to_vec());
    }

    let (lo, hi) = value_range(
        std::iter::once(truth).chain(horizons.iter().map(|s| s.as_slice())),
    );
    let mut canvas = Canvas::new(PlotConfig::default(), (end - 1) as f64, lo, hi);
    canvas.polyline(&points(truth, 0), colors::RED, false);
    for (step, (series, color)) in horizons.iter().zip(blue_shades(steps)).enumerate() {
        canvas.polyline(&points(series, step), color, true);
    }

    let path = prediction_path(dir, rank, node_label);
    save(canvas, &path)?;
    info!(
        node = node_label,
        horizons = steps,
        path = %path.display(),
        "full prediction visualization saved"
    );
    Ok(path)
}
