//! Screen recipes: select a year's constituents and their capitalizations.

use crate::domain::error::IdxtrackError;
use crate::domain::factor::{
    annualized_volatility, daily_returns, intersect, percentile_filter, restrict,
    top_n_by_cumulative_return, FactorSeries,
};
use crate::domain::index_config::ScreenParams;
use crate::domain::price_panel::PricePanel;
use crate::domain::qualitative::QualitativeTable;

/// Screened instruments plus the capitalization that weights them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConstituentSet {
    /// Ordered and duplicate-free.
    pub ids: Vec<String>,
    /// Capitalization of the ids that have one, in table order.
    pub capitalization: FactorSeries,
}

impl ConstituentSet {
    /// Attach capitalizations from `table` to `ids`, dropping repeats.
    pub fn from_ids(
        mut ids: Vec<String>,
        table: &QualitativeTable,
        params: &ScreenParams,
    ) -> Result<Self, IdxtrackError> {
        let mut seen = std::collections::HashSet::new();
        ids.retain(|id| seen.insert(id.clone()));
        let capitalization = restrict(&table.numeric(&params.capitalization_attribute)?, &ids);
        Ok(Self {
            ids,
            capitalization,
        })
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// High volatility ∩ high valuation.
///
/// `history` is the price window volatility is measured over; `table` holds
/// the formation year's fundamentals.
pub fn high_vol_valuation(
    history: &PricePanel,
    table: &QualitativeTable,
    params: &ScreenParams,
) -> Result<ConstituentSet, IdxtrackError> {
    let volatility = annualized_volatility(&daily_returns(history));
    let volatile = percentile_filter(&volatility, params.volatility_quantile)?;

    let valuation = table.numeric(&params.valuation_attribute)?;
    let expensive = percentile_filter(&valuation, params.valuation_quantile)?;

    let ids = intersect(&volatile, &expensive);
    tracing::debug!(
        year = table.year,
        volatile = volatile.len(),
        expensive = expensive.len(),
        selected = ids.len(),
        "high-vol/high-valuation screen"
    );
    ConstituentSet::from_ids(ids, table, params)
}

/// Top `momentum_top_n` instruments by summed daily return over `window`.
pub fn momentum(
    window: &PricePanel,
    table: &QualitativeTable,
    params: &ScreenParams,
) -> Result<ConstituentSet, IdxtrackError> {
    let ids = top_n_by_cumulative_return(&daily_returns(window), params.momentum_top_n);
    tracing::debug!(year = table.year, selected = ids.len(), "momentum screen");
    ConstituentSet::from_ids(ids, table, params)
}

/// Instruments whose country attribute matches `country`.
pub fn geographic(
    table: &QualitativeTable,
    country: &str,
    params: &ScreenParams,
) -> Result<ConstituentSet, IdxtrackError> {
    let matched = table.filter_by_attribute(&params.country_attribute, country)?;
    tracing::debug!(year = table.year, country, selected = matched.len(), "geographic screen");
    ConstituentSet::from_ids(matched.ids, table, params)
}
