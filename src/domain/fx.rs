//! Spot currency conversion through EUR cross rates.
//!
//! The rate table quotes `EURUSD`, `EURGBP`, ... per date. Conversion routes
//! through USD: the source leg brings values to USD, the target leg takes USD
//! to the requested currency. Rows without a needed quote are dropped.

use crate::domain::error::IdxtrackError;
use crate::domain::index_config::Currency;
use crate::domain::index_series::{IndexPoint, IndexSeries};
use crate::domain::price_panel::PricePanel;
use crate::domain::sheet::{parse_date, parse_number, Sheet};
use chrono::NaiveDate;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct FxTable {
    pub pairs: Vec<String>,
    rates: HashMap<NaiveDate, Vec<Option<f64>>>,
}

impl FxTable {
    pub fn new(pairs: Vec<String>) -> Self {
        Self {
            pairs,
            rates: HashMap::new(),
        }
    }

    /// Add one dated row of quotes, in `pairs` order.
    pub fn insert(&mut self, date: NaiveDate, quotes: Vec<Option<f64>>) {
        self.rates.insert(date, quotes);
    }

    /// Parse the forex sheet; columns right of the date column are pairs.
    pub fn from_sheet(sheet: &Sheet) -> Result<Self, IdxtrackError> {
        let date_col = sheet.date_column()?;
        let pairs: Vec<String> = sheet.headers[date_col + 1..]
            .iter()
            .map(|h| h.trim().to_uppercase())
            .collect();
        let mut table = Self::new(pairs);
        for row in 0..sheet.row_count() {
            let Some(date) = sheet.cell(row, date_col).and_then(parse_date) else {
                continue;
            };
            let quotes = (0..table.pairs.len())
                .map(|i| sheet.cell(row, date_col + 1 + i).and_then(parse_number))
                .collect();
            table.insert(date, quotes);
        }
        if table.is_empty() && sheet.row_count() > 0 {
            return Err(IdxtrackError::InvalidData {
                what: format!("sheet {}", sheet.name),
                reason: format!("no row of column {} holds a date", date_col),
            });
        }
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    fn pair_index(&self, pair: &str) -> Result<usize, IdxtrackError> {
        self.pairs
            .iter()
            .position(|p| p == pair)
            .ok_or_else(|| IdxtrackError::unavailable(format!("FX pair {}", pair)))
    }

    pub fn rate(&self, pair: &str, date: NaiveDate) -> Option<f64> {
        let i = self.pairs.iter().position(|p| p == pair)?;
        self.rates
            .get(&date)
            .and_then(|row| row.get(i).copied().flatten())
            .filter(|r| *r > 0.0)
    }

    /// Multiplier taking a value in `from` on `date` to `to`, if quoted.
    pub fn factor(&self, from: Currency, to: Currency, date: NaiveDate) -> Option<f64> {
        if from == to {
            return Some(1.0);
        }
        Some(self.to_usd(from, date)? * self.from_usd(to, date)?)
    }

    fn to_usd(&self, from: Currency, date: NaiveDate) -> Option<f64> {
        Some(1.0 / self.from_usd(from, date)?)
    }

    fn from_usd(&self, to: Currency, date: NaiveDate) -> Option<f64> {
        match to {
            Currency::Usd => Some(1.0),
            Currency::Eur => Some(1.0 / self.rate("EURUSD", date)?),
            other => {
                let cross = self.rate(&format!("EUR{}", other.code()), date)?;
                Some(cross / self.rate("EURUSD", date)?)
            }
        }
    }

    /// Fail early when a pair the conversion needs has no column at all.
    fn check_pairs(&self, from: Currency, to: Currency) -> Result<(), IdxtrackError> {
        if from == to {
            return Ok(());
        }
        for c in [from, to] {
            if c != Currency::Usd {
                self.pair_index("EURUSD")?;
            }
            if c != Currency::Usd && c != Currency::Eur {
                self.pair_index(&format!("EUR{}", c.code()))?;
            }
        }
        Ok(())
    }
}

/// Dated values quoted in a currency.
pub trait Denominated: Sized {
    fn currency(&self) -> Currency;

    fn row_dates(&self) -> Vec<NaiveDate>;

    /// Keep rows with a factor, multiplying their values; drop the rest.
    fn scale_rows(&self, factors: &[Option<f64>], currency: Currency) -> Self;
}

impl Denominated for IndexSeries {
    fn currency(&self) -> Currency {
        self.currency
    }

    fn row_dates(&self) -> Vec<NaiveDate> {
        self.dates()
    }

    fn scale_rows(&self, factors: &[Option<f64>], currency: Currency) -> Self {
        let points = self
            .points
            .iter()
            .zip(factors)
            .filter_map(|(p, f)| {
                f.map(|f| IndexPoint {
                    date: p.date,
                    level: p.level * f,
                })
            })
            .collect();
        IndexSeries::new(points, currency)
    }
}

impl Denominated for PricePanel {
    fn currency(&self) -> Currency {
        self.currency
    }

    fn row_dates(&self) -> Vec<NaiveDate> {
        self.dates.clone()
    }

    fn scale_rows(&self, factors: &[Option<f64>], currency: Currency) -> Self {
        let rows: Vec<(usize, f64)> = factors
            .iter()
            .enumerate()
            .filter_map(|(t, f)| f.map(|f| (t, f)))
            .collect();
        PricePanel {
            dates: rows.iter().map(|&(t, _)| self.dates[t]).collect(),
            instruments: self.instruments.clone(),
            columns: self
                .columns
                .iter()
                .map(|col| rows.iter().map(|&(t, f)| col[t].map(|p| p * f)).collect())
                .collect(),
            currency,
        }
    }
}

/// Re-express `value` in `target`. Converting to the current currency is a no-op.
pub fn convert<T: Denominated + Clone>(
    value: &T,
    fx: &FxTable,
    target: Currency,
) -> Result<T, IdxtrackError> {
    let source = value.currency();
    if source == target {
        return Ok(value.clone());
    }
    fx.check_pairs(source, target)?;

    let factors: Vec<Option<f64>> = value
        .row_dates()
        .into_iter()
        .map(|date| fx.factor(source, target, date))
        .collect();
    let dropped = factors.iter().filter(|f| f.is_none()).count();
    if dropped > 0 {
        tracing::debug!(%source, %target, dropped, "rows without FX quote dropped");
    }
    Ok(value.scale_rows(&factors, target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn fx() -> FxTable {
        let mut table = FxTable::new(vec!["EURUSD".into(), "EURGBP".into(), "EURJPY".into()]);
        table.insert(d(2020, 1, 1), vec![Some(1.25), Some(0.8), Some(120.0)]);
        table.insert(d(2020, 1, 2), vec![Some(1.10), Some(0.9), None]);
        table
    }

    fn usd_series() -> IndexSeries {
        IndexSeries::from_levels(
            &[d(2020, 1, 1), d(2020, 1, 2), d(2020, 1, 3)],
            &[100.0, 110.0, 120.0],
            Currency::Usd,
        )
    }

    #[test]
    fn usd_to_usd_is_noop() {
        let s = usd_series();
        assert_eq!(convert(&s, &fx(), Currency::Usd).unwrap(), s);
    }

    #[test]
    fn usd_to_eur_divides_by_eurusd_and_drops_unquoted_rows() {
        let eur = convert(&usd_series(), &fx(), Currency::Eur).unwrap();
        assert_eq!(eur.currency, Currency::Eur);
        assert_eq!(eur.dates(), vec![d(2020, 1, 1), d(2020, 1, 2)]);
        assert_relative_eq!(eur.levels()[0], 80.0, epsilon = 1e-9);
        assert_relative_eq!(eur.levels()[1], 100.0, epsilon = 1e-9);
    }

    #[test]
    fn usd_to_gbp_uses_eur_cross() {
        let gbp = convert(&usd_series(), &fx(), Currency::Gbp).unwrap();
        // 100 USD / 1.25 = 80 EUR; × 0.8 = 64 GBP.
        assert_relative_eq!(gbp.levels()[0], 64.0, epsilon = 1e-9);
    }

    #[test]
    fn missing_cross_quote_drops_row() {
        let jpy = convert(&usd_series(), &fx(), Currency::Jpy).unwrap();
        assert_eq!(jpy.dates(), vec![d(2020, 1, 1)]);
        assert_relative_eq!(jpy.levels()[0], 9600.0, epsilon = 1e-6);
    }

    #[test]
    fn missing_pair_column_is_data_unavailable() {
        let err = convert(&usd_series(), &fx(), Currency::Cny).unwrap_err();
        assert!(matches!(err, IdxtrackError::DataUnavailable { .. }));
    }

    #[test]
    fn eur_back_to_usd_round_trips() {
        let s = usd_series();
        let back = convert(&convert(&s, &fx(), Currency::Eur).unwrap(), &fx(), Currency::Usd).unwrap();
        assert_eq!(back.len(), 2);
        for (a, b) in back.levels().iter().zip(s.levels()) {
            assert_relative_eq!(*a, b, epsilon = 1e-9);
        }
    }

    #[test]
    fn panel_conversion_scales_every_column() {
        let panel = PricePanel::new(
            vec![d(2020, 1, 1), d(2020, 1, 3)],
            vec!["A".into(), "B".into()],
            vec![vec![Some(125.0), Some(1.0)], vec![None, Some(2.0)]],
            Currency::Usd,
        )
        .unwrap();
        let eur = convert(&panel, &fx(), Currency::Eur).unwrap();
        assert_eq!(eur.dates, vec![d(2020, 1, 1)]);
        assert_relative_eq!(eur.column("A").unwrap()[0].unwrap(), 100.0, epsilon = 1e-9);
        assert_eq!(eur.column("B").unwrap()[0], None);
    }

    #[test]
    fn from_sheet_reads_pairs() {
        let mut sheet = Sheet::new("Forex", vec!["".into(), "Date".into(), "eurusd".into()]);
        sheet.push_row(&["0", "2020-01-01", "1.12"]);
        let table = FxTable::from_sheet(&sheet).unwrap();
        assert_eq!(table.pairs, vec!["EURUSD"]);
        assert_eq!(table.rate("EURUSD", d(2020, 1, 1)), Some(1.12));
        assert_eq!(table.rate("EURUSD", d(2020, 1, 2)), None);
    }

    #[test]
    fn from_sheet_finds_dates_right_of_index_column() {
        let mut sheet = Sheet::new(
            "Forex",
            vec!["Unnamed: 0".into(), "Dates".into(), "EURUSD".into()],
        );
        sheet.push_row(&["0", "2020-01-01", "1.10"]);
        sheet.push_row(&["1", "2020-01-02", "1.11"]);
        let table = FxTable::from_sheet(&sheet).unwrap();
        assert_eq!(table.pairs, vec!["EURUSD"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rate("EURUSD", d(2020, 1, 2)), Some(1.11));

        let mut undated = Sheet::new("Forex", vec!["Date".into(), "EURUSD".into()]);
        undated.push_row(&["soon", "1.10"]);
        assert!(matches!(
            FxTable::from_sheet(&undated),
            Err(IdxtrackError::InvalidData { .. })
        ));
    }
}
