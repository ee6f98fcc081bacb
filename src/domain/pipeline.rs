//! End-to-end index build: load, screen, weight, track, convert, rebase, analyze.

use crate::domain::error::{IdxtrackError, Stage, StageFailure};
use crate::domain::fx::convert;
use crate::domain::index_config::{IndexConfig, IndexType};
use crate::domain::index_series::{align_and_rebase, chain_periods, track, IndexSeries};
use crate::domain::market_data::MarketData;
use crate::domain::metrics::PerformanceReport;
use crate::domain::period::{Half, PeriodKey};
use crate::domain::price_panel::PricePanel;
use crate::domain::qualitative::QualitativeTable;
use crate::domain::screen::{self, ConstituentSet};
use crate::domain::weights::{compute_weights, WeightVector};
use std::collections::BTreeMap;

/// Everything a finished run produces.
#[derive(Debug)]
pub struct IndexBuild {
    pub label: String,
    pub config: IndexConfig,
    /// Custom index, rebased to 100 on the first date shared with the benchmark.
    pub index: IndexSeries,
    pub benchmark: IndexSeries,
    /// Weights keyed by the period they were held over.
    pub weights: BTreeMap<PeriodKey, WeightVector>,
    pub report: PerformanceReport,
}

impl IndexBuild {
    /// Weights of the most recent tracking period.
    pub fn latest_weights(&self) -> Option<(PeriodKey, &WeightVector)> {
        self.weights.iter().next_back().map(|(k, w)| (*k, w))
    }
}

trait AtStage<T> {
    fn at(self, stage: Stage) -> Result<T, StageFailure>;
}

impl<T> AtStage<T> for Result<T, IdxtrackError> {
    fn at(self, stage: Stage) -> Result<T, StageFailure> {
        self.map_err(|e| StageFailure::new(stage, e))
    }
}

/// One formation step: the set chosen on formation data and the window it is held over.
struct Formation {
    period: PeriodKey,
    constituents: ConstituentSet,
    holding: PricePanel,
}

/// Run the whole pipeline for `config` against `data`.
pub fn build_index(
    data: &MarketData<'_>,
    config: &IndexConfig,
) -> Result<IndexBuild, StageFailure> {
    config.check().at(Stage::Load)?;
    if config.source_currency != data.source_currency() {
        return Err(StageFailure::new(
            Stage::Load,
            IdxtrackError::Configuration {
                reason: format!(
                    "source prices are read as {} but the index expects {}",
                    data.source_currency(),
                    config.source_currency
                ),
            },
        ));
    }
    tracing::info!(
        index = %config.index_label(),
        universe = %config.universe,
        currency = %config.currency,
        "building index"
    );

    let panel = data.price_panel(config.universe).at(Stage::Load)?;
    let benchmark = data.reference_series(config.universe).at(Stage::Load)?;
    let fx = if config.currency != panel.currency {
        Some(data.fx_rates().at(Stage::Load)?)
    } else {
        None
    };

    let mut formations = Vec::new();
    for year in config.schedule.formation_years() {
        let table = data.qualitative(config.universe, year).at(Stage::Load)?;
        formations.extend(form(&panel, &table, year, config).at(Stage::Screen)?);
    }
    tracing::info!(periods = formations.len(), "screened all formation periods");

    let mut weights = BTreeMap::new();
    let mut periods = BTreeMap::new();
    for formation in formations {
        let w = compute_weights(&formation.constituents.capitalization).at(Stage::Weight)?;
        let series = track(&formation.holding, &w);
        tracing::debug!(
            period = %formation.period,
            constituents = w.len(),
            points = series.len(),
            "tracked period"
        );
        periods.insert(formation.period, series);
        weights.insert(formation.period, w);
    }

    let periods: Vec<IndexSeries> = periods.into_values().collect();
    let chained = chain_periods(&periods).at(Stage::Track)?;

    let converted = match &fx {
        Some(fx) => convert(&chained, fx, config.currency).at(Stage::Convert)?,
        None => chained,
    };

    let (index, benchmark) = align_and_rebase(&converted, &benchmark).at(Stage::Rebase)?;
    let report = PerformanceReport::compute(&index, &benchmark, &config.analytics);
    tracing::info!(points = index.len(), "index build complete");

    Ok(IndexBuild {
        label: config.index_label(),
        config: config.clone(),
        index,
        benchmark,
        weights,
        report,
    })
}

/// Screen formation year `year` and pair each selection with its holding window.
fn form(
    panel: &PricePanel,
    table: &QualitativeTable,
    year: i32,
    config: &IndexConfig,
) -> Result<Vec<Formation>, IdxtrackError> {
    let params = &config.screen;
    let next = PeriodKey::year(year + 1);
    match config.index_type {
        IndexType::HighVolHighValuation => {
            let history = panel.slice_by_year_range(config.schedule.history_start, year);
            Ok(vec![Formation {
                period: next,
                constituents: screen::high_vol_valuation(&history, table, params)?,
                holding: panel.slice_by_year_range(next.year, next.year),
            }])
        }
        IndexType::Momentum => {
            let (first, second) = panel.slice_by_half_year(year, year);
            let (hold_first, hold_second) = panel.slice_by_half_year(next.year, next.year);
            Ok(vec![
                Formation {
                    period: PeriodKey::half(next.year, Half::First),
                    constituents: screen::momentum(&first, table, params)?,
                    holding: hold_first,
                },
                Formation {
                    period: PeriodKey::half(next.year, Half::Second),
                    constituents: screen::momentum(&second, table, params)?,
                    holding: hold_second,
                },
            ])
        }
        IndexType::Geographic => {
            let country = config.country.as_deref().unwrap_or_default();
            let constituents = screen::geographic(table, country, params)?;
            let holding = panel
                .select_instruments(&constituents.ids)
                .slice_by_year_range(next.year, next.year);
            Ok(vec![Formation {
                period: next,
                constituents,
                holding,
            }])
        }
    }
}
