//! Performance analytics for a rebased index against its benchmark.

use crate::domain::error::{IdxtrackError, Stage};
use crate::domain::index_config::AnalyticsParams;
use crate::domain::index_series::IndexSeries;
use chrono::NaiveDate;
use std::collections::HashMap;

/// Seven independent metrics; one failing does not hide the others.
///
/// Returns, drawdown and volatility are in percent. Sharpe, beta and alpha
/// are plain ratios, alpha annualized.
#[derive(Debug)]
pub struct PerformanceReport {
    pub total_return: Result<f64, IdxtrackError>,
    pub annualized_return: Result<f64, IdxtrackError>,
    pub max_drawdown: Result<f64, IdxtrackError>,
    pub annualized_volatility: Result<f64, IdxtrackError>,
    pub sharpe_ratio: Result<f64, IdxtrackError>,
    pub beta: Result<f64, IdxtrackError>,
    pub alpha: Result<f64, IdxtrackError>,
}

impl PerformanceReport {
    pub fn compute(
        index: &IndexSeries,
        benchmark: &IndexSeries,
        params: &AnalyticsParams,
    ) -> Self {
        let returns = simple_returns(index);
        let annualized_return = annualized_return(&returns, params.periods_per_year);
        let annualized_volatility = annualized_volatility(&returns, params.periods_per_year);
        let sharpe_ratio = sharpe_ratio(&annualized_return, &annualized_volatility, params);
        let regression = regress(&returns, &simple_returns(benchmark));

        Self {
            total_return: total_return(index),
            annualized_return,
            max_drawdown: max_drawdown(index),
            annualized_volatility,
            sharpe_ratio,
            beta: regression.as_ref().map(|r| r.slope).map_err(clone_err),
            alpha: regression.map(|r| r.intercept * params.periods_per_year),
        }
    }

    /// `(label, value)` in display order.
    pub fn rows(&self) -> [(&'static str, &Result<f64, IdxtrackError>); 7] {
        [
            ("Total return (%)", &self.total_return),
            ("Annualized return (%)", &self.annualized_return),
            ("Max drawdown (%)", &self.max_drawdown),
            ("Annualized volatility (%)", &self.annualized_volatility),
            ("Sharpe ratio", &self.sharpe_ratio),
            ("Beta", &self.beta),
            ("Alpha", &self.alpha),
        ]
    }
}

fn clone_err(err: &IdxtrackError) -> IdxtrackError {
    match err {
        IdxtrackError::InsufficientData { stage, reason } => {
            IdxtrackError::insufficient(*stage, reason.clone())
        }
        other => IdxtrackError::insufficient(Stage::Analytics, other.to_string()),
    }
}

fn insufficient(reason: impl Into<String>) -> IdxtrackError {
    IdxtrackError::insufficient(Stage::Analytics, reason)
}

/// Period-over-period simple returns, keyed by the later date.
fn simple_returns(series: &IndexSeries) -> Vec<(NaiveDate, f64)> {
    series
        .points
        .windows(2)
        .filter(|w| w[0].level != 0.0)
        .map(|w| (w[1].date, w[1].level / w[0].level - 1.0))
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(var.sqrt())
}

/// Last level over first, in percent. Needs two points.
pub fn total_return(series: &IndexSeries) -> Result<f64, IdxtrackError> {
    if series.len() < 2 {
        return Err(insufficient(format!(
            "total return needs two points, found {}",
            series.len()
        )));
    }
    match (series.first(), series.last()) {
        (Some(first), Some(last)) if first.level != 0.0 => {
            Ok((last.level / first.level - 1.0) * 100.0)
        }
        _ => Err(insufficient("series starts at zero")),
    }
}

/// `((1 + mean return)^periods_per_year − 1) × 100`.
fn annualized_return(
    returns: &[(NaiveDate, f64)],
    periods_per_year: f64,
) -> Result<f64, IdxtrackError> {
    if returns.is_empty() {
        return Err(insufficient("no returns to annualize"));
    }
    let values: Vec<f64> = returns.iter().map(|&(_, r)| r).collect();
    Ok(((1.0 + mean(&values)).powf(periods_per_year) - 1.0) * 100.0)
}

/// Most negative peak-to-trough move, in percent (≤ 0).
pub fn max_drawdown(series: &IndexSeries) -> Result<f64, IdxtrackError> {
    if series.is_empty() {
        return Err(insufficient("empty series"));
    }
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;
    for level in series.levels() {
        peak = peak.max(level);
        if peak > 0.0 {
            worst = worst.min((level - peak) / peak);
        }
    }
    Ok(worst * 100.0)
}

fn annualized_volatility(
    returns: &[(NaiveDate, f64)],
    periods_per_year: f64,
) -> Result<f64, IdxtrackError> {
    let values: Vec<f64> = returns.iter().map(|&(_, r)| r).collect();
    sample_std(&values)
        .map(|std| std * periods_per_year.sqrt() * 100.0)
        .ok_or_else(|| insufficient("volatility needs at least two returns"))
}

/// `(annualized return − rf × 100) / annualized volatility`.
///
/// `risk_free_rate` is a fraction (0.01 is 1%). Return and volatility are in
/// percent, so the rate is subtracted as `rf × 100` percentage points, not as
/// the raw fraction.
fn sharpe_ratio(
    annualized_return: &Result<f64, IdxtrackError>,
    annualized_volatility: &Result<f64, IdxtrackError>,
    params: &AnalyticsParams,
) -> Result<f64, IdxtrackError> {
    let ret = annualized_return.as_ref().map_err(clone_err)?;
    let vol = annualized_volatility.as_ref().map_err(clone_err)?;
    if *vol == 0.0 {
        return Err(insufficient("zero volatility"));
    }
    Ok((ret - params.risk_free_rate * 100.0) / vol)
}

struct Regression {
    slope: f64,
    intercept: f64,
}

/// OLS of index returns on benchmark returns over their common dates.
fn regress(
    index: &[(NaiveDate, f64)],
    benchmark: &[(NaiveDate, f64)],
) -> Result<Regression, IdxtrackError> {
    let bench: HashMap<NaiveDate, f64> = benchmark.iter().copied().collect();
    let (ys, xs): (Vec<f64>, Vec<f64>) = index
        .iter()
        .filter_map(|(date, y)| bench.get(date).map(|x| (*y, *x)))
        .unzip();
    if xs.len() < 2 {
        return Err(insufficient(format!(
            "regression needs two common returns, found {}",
            xs.len()
        )));
    }

    let mx = mean(&xs);
    let my = mean(&ys);
    let sxx: f64 = xs.iter().map(|x| (x - mx).powi(2)).sum();
    if sxx == 0.0 {
        return Err(insufficient("benchmark returns have zero variance"));
    }
    let sxy: f64 = xs.iter().zip(&ys).map(|(x, y)| (x - mx) * (y - my)).sum();
    let slope = sxy / sxx;
    Ok(Regression {
        slope,
        intercept: my - slope * mx,
    })
}
