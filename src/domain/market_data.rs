//! Data access layer: turns raw sheets from a [`DataPort`] into domain tables.

use crate::domain::error::IdxtrackError;
use crate::domain::fx::FxTable;
use crate::domain::index_config::{Currency, UniverseId};
use crate::domain::index_series::{IndexPoint, IndexSeries};
use crate::domain::price_panel::PricePanel;
use crate::domain::qualitative::QualitativeTable;
use crate::domain::sheet::{
    parse_date, parse_number, price_sheet_name, qualitative_sheet_name, FOREX_SHEET, INDEX_SHEET,
};
use crate::ports::data_port::DataPort;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Load and clean the universe's price sheet (`{TICKER}_PX_LAST`).
pub fn load_price_panel(
    port: &dyn DataPort,
    universe: UniverseId,
    currency: Currency,
) -> Result<PricePanel, IdxtrackError> {
    let sheet = port.fetch_sheet(&price_sheet_name(universe.ticker()))?;
    let panel = PricePanel::from_sheet(&sheet, currency)?.clean();
    tracing::info!(
        universe = %universe,
        dates = panel.len(),
        instruments = panel.instrument_count(),
        "loaded price panel"
    );
    Ok(panel)
}

/// Load `Qualitativ_{year}`, restricted to the panel's instruments in panel order.
pub fn load_qualitative(
    port: &dyn DataPort,
    panel: &PricePanel,
    year: i32,
) -> Result<QualitativeTable, IdxtrackError> {
    let sheet = port.fetch_sheet(&qualitative_sheet_name(year))?;
    let table = QualitativeTable::from_sheet(&sheet, year)?.restrict_to_panel(panel);
    tracing::debug!(year, rows = table.len(), "loaded qualitative table");
    Ok(table)
}

/// Load the universe benchmark from the `Index` sheet.
///
/// The value column is headed `{TICKER} Index`; its dates sit in the column
/// immediately to the left.
pub fn load_reference_series(
    port: &dyn DataPort,
    universe: UniverseId,
    currency: Currency,
) -> Result<IndexSeries, IdxtrackError> {
    let sheet = port.fetch_sheet(INDEX_SHEET)?;
    let label = format!("{} Index", universe.ticker());
    let value_col = match sheet.column_index(&label) {
        Some(col) if col > 0 => col,
        Some(_) => {
            return Err(IdxtrackError::Configuration {
                reason: format!("benchmark column '{}' has no date column to its left", label),
            });
        }
        None => {
            return Err(IdxtrackError::Configuration {
                reason: format!("benchmark column '{}' not found in sheet {}", label, sheet.name),
            });
        }
    };
    let date_col = value_col - 1;

    let mut points: Vec<IndexPoint> = (0..sheet.row_count())
        .filter_map(|row| {
            let date = sheet.cell(row, date_col).and_then(parse_date)?;
            let level = sheet.cell(row, value_col).and_then(parse_number)?;
            Some(IndexPoint { date, level })
        })
        .collect();
    points.sort_by_key(|p| p.date);
    points.dedup_by_key(|p| p.date);

    tracing::info!(benchmark = %label, points = points.len(), "loaded reference series");
    Ok(IndexSeries::new(points, currency))
}

pub fn load_fx_rates(port: &dyn DataPort) -> Result<FxTable, IdxtrackError> {
    let table = FxTable::from_sheet(&port.fetch_sheet(FOREX_SHEET)?)?;
    tracing::info!(dates = table.len(), pairs = table.pairs.len(), "loaded FX rates");
    Ok(table)
}

/// Sorted distinct values of the country attribute in `Qualitativ_{year}`.
pub fn list_countries(
    port: &dyn DataPort,
    year: i32,
    attribute: &str,
) -> Result<Vec<String>, IdxtrackError> {
    let sheet = port.fetch_sheet(&qualitative_sheet_name(year))?;
    let values = QualitativeTable::from_sheet(&sheet, year)?.distinct_values(attribute)?;
    Ok(values
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect::<std::collections::BTreeSet<_>>()
        .into_iter()
        .collect())
}

/// Memoizing front for the loaders above.
///
/// Each table is read and cleaned at most once per `MarketData`; failed loads
/// are not cached.
pub struct MarketData<'a> {
    port: &'a dyn DataPort,
    source_currency: Currency,
    panels: RefCell<HashMap<UniverseId, Rc<PricePanel>>>,
    qualitative: RefCell<HashMap<(UniverseId, i32), Rc<QualitativeTable>>>,
    references: RefCell<HashMap<UniverseId, Rc<IndexSeries>>>,
    fx: RefCell<Option<Rc<FxTable>>>,
}

impl<'a> MarketData<'a> {
    pub fn new(port: &'a dyn DataPort, source_currency: Currency) -> Self {
        Self {
            port,
            source_currency,
            panels: RefCell::new(HashMap::new()),
            qualitative: RefCell::new(HashMap::new()),
            references: RefCell::new(HashMap::new()),
            fx: RefCell::new(None),
        }
    }

    pub fn source_currency(&self) -> Currency {
        self.source_currency
    }

    pub fn price_panel(&self, universe: UniverseId) -> Result<Rc<PricePanel>, IdxtrackError> {
        if let Some(panel) = self.panels.borrow().get(&universe) {
            return Ok(Rc::clone(panel));
        }
        let panel = Rc::new(load_price_panel(self.port, universe, self.source_currency)?);
        self.panels.borrow_mut().insert(universe, Rc::clone(&panel));
        Ok(panel)
    }

    pub fn qualitative(
        &self,
        universe: UniverseId,
        year: i32,
    ) -> Result<Rc<QualitativeTable>, IdxtrackError> {
        if let Some(table) = self.qualitative.borrow().get(&(universe, year)) {
            return Ok(Rc::clone(table));
        }
        let panel = self.price_panel(universe)?;
        let table = Rc::new(load_qualitative(self.port, &panel, year)?);
        self.qualitative
            .borrow_mut()
            .insert((universe, year), Rc::clone(&table));
        Ok(table)
    }

    pub fn reference_series(&self, universe: UniverseId) -> Result<Rc<IndexSeries>, IdxtrackError> {
        if let Some(series) = self.references.borrow().get(&universe) {
            return Ok(Rc::clone(series));
        }
        let series = Rc::new(load_reference_series(
            self.port,
            universe,
            self.source_currency,
        )?);
        self.references
            .borrow_mut()
            .insert(universe, Rc::clone(&series));
        Ok(series)
    }

    pub fn fx_rates(&self) -> Result<Rc<FxTable>, IdxtrackError> {
        if let Some(fx) = self.fx.borrow().as_ref() {
            return Ok(Rc::clone(fx));
        }
        let fx = Rc::new(load_fx_rates(self.port)?);
        *self.fx.borrow_mut() = Some(Rc::clone(&fx));
        Ok(fx)
    }
}
