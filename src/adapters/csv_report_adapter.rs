//! CSV report adapter implementing ReportPort.
//!
//! Writes `index.csv`, `weights.csv`, `weights_by_period.csv` and
//! `metrics.csv` into the output directory.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::domain::error::IdxtrackError;
use crate::domain::pipeline::IndexBuild;
use crate::ports::report_port::ReportPort;

fn csv_error(e: csv::Error) -> IdxtrackError {
    IdxtrackError::Io(e.into())
}

pub struct CsvReportAdapter;

impl CsvReportAdapter {
    fn write_index(build: &IndexBuild, dir: &Path) -> Result<(), IdxtrackError> {
        let bench: HashMap<_, _> = build
            .benchmark
            .points
            .iter()
            .map(|p| (p.date, p.level))
            .collect();

        let mut wtr = csv::Writer::from_path(dir.join("index.csv")).map_err(csv_error)?;
        wtr.write_record(["date", build.label.as_str(), build.config.universe.label()])
            .map_err(csv_error)?;
        for point in &build.index.points {
            let bench_level = bench
                .get(&point.date)
                .map(|l| format!("{:.6}", l))
                .unwrap_or_default();
            wtr.write_record([
                point.date.format("%Y-%m-%d").to_string(),
                format!("{:.6}", point.level),
                bench_level,
            ])
            .map_err(csv_error)?;
        }
        wtr.flush()?;
        Ok(())
    }

    fn write_weights(build: &IndexBuild, dir: &Path) -> Result<(), IdxtrackError> {
        let mut latest = csv::Writer::from_path(dir.join("weights.csv")).map_err(csv_error)?;
        latest.write_record(["id", "weight"]).map_err(csv_error)?;
        if let Some((_, weights)) = build.latest_weights() {
            for (id, w) in weights.iter() {
                latest
                    .write_record([id.to_string(), format!("{:.8}", w)])
                    .map_err(csv_error)?;
            }
        }
        latest.flush()?;

        let mut history =
            csv::Writer::from_path(dir.join("weights_by_period.csv")).map_err(csv_error)?;
        history
            .write_record(["period", "id", "weight"])
            .map_err(csv_error)?;
        for (period, weights) in &build.weights {
            for (id, w) in weights.iter() {
                history
                    .write_record([period.to_string(), id.to_string(), format!("{:.8}", w)])
                    .map_err(csv_error)?;
            }
        }
        history.flush()?;
        Ok(())
    }

    fn write_metrics(build: &IndexBuild, dir: &Path) -> Result<(), IdxtrackError> {
        let mut wtr = csv::Writer::from_path(dir.join("metrics.csv")).map_err(csv_error)?;
        wtr.write_record(["metric", "value", "error"])
            .map_err(csv_error)?;
        for (label, value) in build.report.rows() {
            let (value, error) = match value {
                Ok(v) => (format!("{:.4}", v), String::new()),
                Err(e) => (String::new(), e.to_string()),
            };
            wtr.write_record([label.to_string(), value, error])
                .map_err(csv_error)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

impl ReportPort for CsvReportAdapter {
    fn write(&self, build: &IndexBuild, output_dir: &str) -> Result<(), IdxtrackError> {
        let dir = Path::new(output_dir);
        fs::create_dir_all(dir)?;
        Self::write_index(build, dir)?;
        Self::write_weights(build, dir)?;
        Self::write_metrics(build, dir)?;
        tracing::info!(dir = %dir.display(), "report written");
        Ok(())
    }
}
