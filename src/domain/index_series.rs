//! Index level series: tracking, stitching across rebalancing periods, rebasing.

use crate::domain::error::{IdxtrackError, Stage};
use crate::domain::index_config::Currency;
use crate::domain::price_panel::PricePanel;
use crate::domain::weights::WeightVector;
use chrono::NaiveDate;
use std::collections::HashMap;

pub const REBASE_LEVEL: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexPoint {
    pub date: NaiveDate,
    pub level: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexSeries {
    pub points: Vec<IndexPoint>,
    pub currency: Currency,
}

impl IndexSeries {
    pub fn new(points: Vec<IndexPoint>, currency: Currency) -> Self {
        Self { points, currency }
    }

    pub fn from_levels(dates: &[NaiveDate], levels: &[f64], currency: Currency) -> Self {
        Self {
            points: dates
                .iter()
                .zip(levels)
                .map(|(&date, &level)| IndexPoint { date, level })
                .collect(),
            currency,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<IndexPoint> {
        self.points.first().copied()
    }

    pub fn last(&self) -> Option<IndexPoint> {
        self.points.last().copied()
    }

    pub fn levels(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.level).collect()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    /// `level / from × to` for every point, so the point at `from` lands exactly on `to`.
    fn rescaled(&self, from: f64, to: f64) -> Self {
        Self {
            points: self
                .points
                .iter()
                .map(|p| IndexPoint {
                    date: p.date,
                    level: p.level / from * to,
                })
                .collect(),
            currency: self.currency,
        }
    }

    /// Scale so the first level equals `base`.
    pub fn rebase(&self, base: f64) -> Result<Self, IdxtrackError> {
        match self.first() {
            Some(p) if p.level != 0.0 && p.level.is_finite() => Ok(self.rescaled(p.level, base)),
            Some(_) => Err(IdxtrackError::insufficient(
                Stage::Rebase,
                "cannot rebase a series starting at zero",
            )),
            None => Err(IdxtrackError::insufficient(
                Stage::Rebase,
                "cannot rebase an empty series",
            )),
        }
    }
}

/// Level on each panel date: `Σ weight_i × price_i`.
///
/// Weighted instruments missing from the panel, or without a price on a
/// date, contribute nothing to that date's level.
pub fn track(panel: &PricePanel, weights: &WeightVector) -> IndexSeries {
    let legs: Vec<(usize, f64)> = weights
        .iter()
        .filter_map(|(id, w)| panel.instrument_index(id).map(|col| (col, w)))
        .collect();
    if legs.len() < weights.len() {
        tracing::debug!(
            weighted = weights.len(),
            priced = legs.len(),
            "weighted instruments missing from price panel"
        );
    }

    let points = (0..panel.len())
        .map(|t| IndexPoint {
            date: panel.dates[t],
            level: legs
                .iter()
                .filter_map(|&(col, w)| panel.price(t, col).map(|p| w * p))
                .sum(),
        })
        .collect();

    IndexSeries::new(points, panel.currency)
}

/// Rescale `new_series` so it starts at `previous_series`'s last level.
pub fn stitch(
    new_series: &IndexSeries,
    previous_series: &IndexSeries,
) -> Result<IndexSeries, IdxtrackError> {
    let anchor = previous_series
        .last()
        .ok_or_else(|| IdxtrackError::insufficient(Stage::Track, "previous period is empty"))?;
    let start = new_series
        .first()
        .ok_or_else(|| IdxtrackError::insufficient(Stage::Track, "new period is empty"))?;
    if start.level == 0.0 || !start.level.is_finite() {
        return Err(IdxtrackError::insufficient(
            Stage::Track,
            format!("period starting {} has zero level", start.date),
        ));
    }
    Ok(new_series.rescaled(start.level, anchor.level))
}

/// Append periods in the given order. Stitching is the caller's job.
pub fn concatenate_periods(periods: &[IndexSeries]) -> IndexSeries {
    let currency = periods.first().map_or(Currency::Usd, |s| s.currency);
    IndexSeries::new(
        periods.iter().flat_map(|s| s.points.iter().copied()).collect(),
        currency,
    )
}

/// Stitch each period onto the one before it and concatenate.
///
/// Empty periods are skipped; the next non-empty period anchors on the last
/// non-empty one.
pub fn chain_periods(periods: &[IndexSeries]) -> Result<IndexSeries, IdxtrackError> {
    let mut stitched: Vec<IndexSeries> = Vec::with_capacity(periods.len());
    for (n, period) in periods.iter().enumerate() {
        if period.is_empty() {
            tracing::warn!(period = n, "skipping empty tracking period");
            continue;
        }
        let next = match stitched.last() {
            Some(prev) => stitch(period, prev)?,
            None => period.clone(),
        };
        stitched.push(next);
    }
    Ok(concatenate_periods(&stitched))
}

/// Restrict both series to their common dates and rebase each to 100 there.
pub fn align_and_rebase(
    index: &IndexSeries,
    benchmark: &IndexSeries,
) -> Result<(IndexSeries, IndexSeries), IdxtrackError> {
    let bench_by_date: HashMap<NaiveDate, f64> =
        benchmark.points.iter().map(|p| (p.date, p.level)).collect();

    let mut idx_points = Vec::new();
    let mut bench_points = Vec::new();
    for p in &index.points {
        if let Some(&level) = bench_by_date.get(&p.date) {
            idx_points.push(*p);
            bench_points.push(IndexPoint {
                date: p.date,
                level,
            });
        }
    }
    if idx_points.is_empty() {
        return Err(IdxtrackError::insufficient(
            Stage::Rebase,
            "index and benchmark share no dates",
        ));
    }

    let aligned_index = IndexSeries::new(idx_points, index.currency).rebase(REBASE_LEVEL)?;
    let aligned_bench = IndexSeries::new(bench_points, benchmark.currency).rebase(REBASE_LEVEL)?;
    Ok((aligned_index, aligned_bench))
}
