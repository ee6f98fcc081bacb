//! Factor values and the screening primitives that filter a universe.

use crate::domain::error::IdxtrackError;
use crate::domain::price_panel::PricePanel;
use chrono::NaiveDate;
use std::cmp::Ordering;
use std::collections::HashSet;

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Ordered instrument → value mapping. Order is preserved by every operation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FactorSeries {
    entries: Vec<(String, f64)>,
}

impl FactorSeries {
    pub fn new(entries: Vec<(String, f64)>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[(String, f64)] {
        &self.entries
    }

    pub fn ids(&self) -> Vec<&str> {
        self.entries.iter().map(|(id, _)| id.as_str()).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.entries.iter().map(|&(_, v)| v).collect()
    }

    pub fn get(&self, id: &str) -> Option<f64> {
        self.entries.iter().find(|(i, _)| i == id).map(|&(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(id, v)| (id.as_str(), *v))
    }
}

impl FromIterator<(String, f64)> for FactorSeries {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Simple daily returns, same shape as the source panel.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnsPanel {
    pub dates: Vec<NaiveDate>,
    pub instruments: Vec<String>,
    pub columns: Vec<Vec<Option<f64>>>,
}

/// `p[t] / p[t-1] - 1`; missing where either price is missing or the prior price is zero.
pub fn daily_returns(panel: &PricePanel) -> ReturnsPanel {
    let columns = panel
        .columns
        .iter()
        .map(|col| {
            let mut out = Vec::with_capacity(col.len());
            if !col.is_empty() {
                out.push(None);
            }
            out.extend(col.windows(2).map(|w| match (w[0], w[1]) {
                (Some(prev), Some(curr)) if prev != 0.0 => Some(curr / prev - 1.0),
                _ => None,
            }));
            out
        })
        .collect();

    ReturnsPanel {
        dates: panel.dates.clone(),
        instruments: panel.instruments.clone(),
        columns,
    }
}

fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some(variance.sqrt())
}

/// Sample standard deviation of daily returns × √252 per instrument.
///
/// Instruments with fewer than two returns are omitted.
pub fn annualized_volatility(returns: &ReturnsPanel) -> FactorSeries {
    returns
        .instruments
        .iter()
        .zip(&returns.columns)
        .filter_map(|(id, col)| {
            let present: Vec<f64> = col.iter().flatten().copied().collect();
            sample_std(&present).map(|std| (id.clone(), std * TRADING_DAYS_PER_YEAR.sqrt()))
        })
        .collect()
}

/// Sum of each instrument's present returns (0 when it has none).
pub fn cumulative_returns(returns: &ReturnsPanel) -> FactorSeries {
    returns
        .instruments
        .iter()
        .zip(&returns.columns)
        .map(|(id, col)| (id.clone(), col.iter().flatten().sum::<f64>()))
        .collect()
}

/// Quantile with linear interpolation between order statistics.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64))
}

/// Keep entries at or above the `q`-quantile.
///
/// `q = 0.4` keeps roughly the top 60%; the screen parameters are tuned to
/// this convention.
pub fn percentile_filter(series: &FactorSeries, q: f64) -> Result<FactorSeries, IdxtrackError> {
    if !(0.0..=1.0).contains(&q) {
        return Err(IdxtrackError::Configuration {
            reason: format!("quantile {} outside [0, 1]", q),
        });
    }
    let Some(threshold) = quantile(&series.values(), q) else {
        return Ok(FactorSeries::default());
    };
    Ok(series
        .entries
        .iter()
        .filter(|&&(_, v)| v >= threshold)
        .cloned()
        .collect())
}

/// Ids of `a`, in `a`'s order, that also appear in `b`.
pub fn intersect(a: &FactorSeries, b: &FactorSeries) -> Vec<String> {
    let in_b: HashSet<&str> = b.entries.iter().map(|(id, _)| id.as_str()).collect();
    a.entries
        .iter()
        .filter(|(id, _)| in_b.contains(id.as_str()))
        .map(|(id, _)| id.clone())
        .collect()
}

/// The `n` instruments with the largest summed return, best first.
///
/// Equal sums are ordered by ascending id so the selection is deterministic.
pub fn top_n_by_cumulative_return(returns: &ReturnsPanel, n: usize) -> Vec<String> {
    let mut sums = cumulative_returns(returns).entries;
    sums.sort_by(|(id_a, a), (id_b, b)| {
        b.partial_cmp(a)
            .unwrap_or(Ordering::Equal)
            .then_with(|| id_a.cmp(id_b))
    });
    sums.into_iter().take(n).map(|(id, _)| id).collect()
}

/// Reduce `series` to the ids in `ids`, keeping `series` order. Unknown ids are ignored.
pub fn restrict(series: &FactorSeries, ids: &[String]) -> FactorSeries {
    let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
    series
        .entries
        .iter()
        .filter(|(id, _)| wanted.contains(id.as_str()))
        .cloned()
        .collect()
}
