//! Dated price panel: rows are trading dates, columns are instruments.

use crate::domain::error::IdxtrackError;
use crate::domain::index_config::Currency;
use crate::domain::period::Half;
use crate::domain::sheet::{parse_date, parse_number, Sheet};
use chrono::{Datelike, NaiveDate};
use std::collections::HashSet;

/// Columns missing more than this share of rows are dropped at ingestion.
pub const MAX_MISSING_RATIO: f64 = 0.10;

#[derive(Debug, Clone, PartialEq)]
pub struct PricePanel {
    pub dates: Vec<NaiveDate>,
    pub instruments: Vec<String>,
    /// Column-major: `columns[i][t]` is the price of `instruments[i]` on `dates[t]`.
    pub columns: Vec<Vec<Option<f64>>>,
    pub currency: Currency,
}

impl PricePanel {
    /// Build a panel, sorting rows by date. Duplicate dates are rejected.
    pub fn new(
        dates: Vec<NaiveDate>,
        instruments: Vec<String>,
        columns: Vec<Vec<Option<f64>>>,
        currency: Currency,
    ) -> Result<Self, IdxtrackError> {
        if instruments.len() != columns.len() {
            return Err(IdxtrackError::InvalidData {
                what: "price panel".into(),
                reason: format!(
                    "{} instruments but {} columns",
                    instruments.len(),
                    columns.len()
                ),
            });
        }
        if let Some(col) = columns.iter().position(|c| c.len() != dates.len()) {
            return Err(IdxtrackError::InvalidData {
                what: "price panel".into(),
                reason: format!(
                    "column {} has {} rows, expected {}",
                    instruments[col],
                    columns[col].len(),
                    dates.len()
                ),
            });
        }

        let mut order: Vec<usize> = (0..dates.len()).collect();
        order.sort_by_key(|&i| dates[i]);
        if let Some(w) = order.windows(2).find(|w| dates[w[0]] == dates[w[1]]) {
            return Err(IdxtrackError::InvalidData {
                what: "price panel".into(),
                reason: format!("duplicate date {}", dates[w[0]]),
            });
        }

        let sorted_dates = order.iter().map(|&i| dates[i]).collect();
        let sorted_columns = columns
            .iter()
            .map(|col| order.iter().map(|&i| col[i]).collect())
            .collect();

        Ok(Self {
            dates: sorted_dates,
            instruments,
            columns: sorted_columns,
            currency,
        })
    }

    /// Parse a price sheet without any missing-data cleanup.
    ///
    /// Columns right of the date column are instruments; rows whose date
    /// cell does not parse are skipped.
    pub fn from_sheet(sheet: &Sheet, currency: Currency) -> Result<Self, IdxtrackError> {
        let date_col = sheet.date_column()?;
        let instruments: Vec<String> = sheet.headers[date_col + 1..]
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut dates = Vec::with_capacity(sheet.row_count());
        let mut columns: Vec<Vec<Option<f64>>> =
            vec![Vec::with_capacity(sheet.row_count()); instruments.len()];

        for row in 0..sheet.row_count() {
            let Some(date) = sheet.cell(row, date_col).and_then(parse_date) else {
                continue;
            };
            dates.push(date);
            for (i, column) in columns.iter_mut().enumerate() {
                column.push(sheet.cell(row, date_col + 1 + i).and_then(parse_number));
            }
        }

        if dates.is_empty() && sheet.row_count() > 0 {
            return Err(IdxtrackError::InvalidData {
                what: format!("sheet {}", sheet.name),
                reason: format!("no row of column {} holds a date", date_col),
            });
        }
        Self::new(dates, instruments, columns, currency)
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn instrument_count(&self) -> usize {
        self.instruments.len()
    }

    pub fn instrument_index(&self, id: &str) -> Option<usize> {
        self.instruments.iter().position(|i| i == id)
    }

    pub fn column(&self, id: &str) -> Option<&[Option<f64>]> {
        self.instrument_index(id).map(|i| self.columns[i].as_slice())
    }

    pub fn price(&self, row: usize, col: usize) -> Option<f64> {
        self.columns.get(col).and_then(|c| c.get(row)).copied().flatten()
    }

    /// Drop columns whose missing share exceeds `max_missing_ratio`.
    pub fn drop_sparse_columns(self, max_missing_ratio: f64) -> Self {
        let rows = self.dates.len() as f64;
        let threshold = (1.0 - max_missing_ratio) * rows;
        let mut instruments = Vec::with_capacity(self.instruments.len());
        let mut columns = Vec::with_capacity(self.columns.len());

        for (id, column) in self.instruments.into_iter().zip(self.columns) {
            let present = column.iter().filter(|p| p.is_some()).count() as f64;
            if present >= threshold {
                instruments.push(id);
                columns.push(column);
            } else {
                tracing::debug!(instrument = %id, present, rows, "dropping sparse price column");
            }
        }

        Self {
            dates: self.dates,
            instruments,
            columns,
            currency: self.currency,
        }
    }

    /// Fill each gap with the last known price in its column.
    pub fn forward_fill(mut self) -> Self {
        for column in &mut self.columns {
            let mut last = None;
            for cell in column.iter_mut() {
                match cell {
                    Some(v) => last = Some(*v),
                    None => *cell = last,
                }
            }
        }
        self
    }

    /// Ingestion cleanup: drop sparse columns, then forward-fill.
    pub fn clean(self) -> Self {
        let before = self.instrument_count();
        let panel = self.drop_sparse_columns(MAX_MISSING_RATIO).forward_fill();
        let dropped = before - panel.instrument_count();
        if dropped > 0 {
            tracing::warn!(
                dropped,
                kept = panel.instrument_count(),
                "dropped sparse price columns"
            );
        }
        panel
    }

    /// Rows whose date satisfies `keep`, same columns.
    pub fn filter_rows(&self, keep: impl Fn(NaiveDate) -> bool) -> Self {
        let rows: Vec<usize> = (0..self.dates.len())
            .filter(|&t| keep(self.dates[t]))
            .collect();
        Self {
            dates: rows.iter().map(|&t| self.dates[t]).collect(),
            instruments: self.instruments.clone(),
            columns: self
                .columns
                .iter()
                .map(|col| rows.iter().map(|&t| col[t]).collect())
                .collect(),
            currency: self.currency,
        }
    }

    /// Rows whose calendar year lies in `[y0, y1]`.
    pub fn slice_by_year_range(&self, y0: i32, y1: i32) -> Self {
        self.filter_rows(|d| d.year() >= y0 && d.year() <= y1)
    }

    /// Split `[y0, y1]` into January to June rows and July to December rows.
    pub fn slice_by_half_year(&self, y0: i32, y1: i32) -> (Self, Self) {
        let range = self.slice_by_year_range(y0, y1);
        let first = range.filter_rows(|d| Half::of(d) == Half::First);
        let second = range.filter_rows(|d| Half::of(d) == Half::Second);
        (first, second)
    }

    /// Keep only the listed instruments, in panel order.
    pub fn select_instruments(&self, ids: &[String]) -> Self {
        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let keep: Vec<usize> = (0..self.instruments.len())
            .filter(|&i| wanted.contains(self.instruments[i].as_str()))
            .collect();
        Self {
            dates: self.dates.clone(),
            instruments: keep.iter().map(|&i| self.instruments[i].clone()).collect(),
            columns: keep.iter().map(|&i| self.columns[i].clone()).collect(),
            currency: self.currency,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn sheet(rows: &[&[&str]]) -> Sheet {
        let mut sheet = Sheet::new(
            "SPX_PX_LAST",
            vec!["".into(), "Date".into(), "AAA".into(), "BBB".into()],
        );
        for row in rows {
            sheet.push_row(row);
        }
        sheet
    }

    #[test]
    fn from_sheet_sorts_and_skips_undated_rows() {
        let sheet = sheet(&[
            &["0", "2020-01-03", "3", "30"],
            &["1", "", "9", "9"],
            &["2", "2020-01-02", "2", "20"],
        ]);
        let panel = PricePanel::from_sheet(&sheet, Currency::Usd).unwrap();
        assert_eq!(panel.dates, vec![d(2020, 1, 2), d(2020, 1, 3)]);
        assert_eq!(panel.instruments, vec!["AAA", "BBB"]);
        assert_eq!(panel.column("AAA").unwrap(), &[Some(2.0), Some(3.0)]);
    }

    #[test]
    fn from_sheet_skips_leading_index_column() {
        let mut sheet = Sheet::new(
            "SPX_PX_LAST",
            vec!["Unnamed: 0".into(), "Dates".into(), "AAA".into()],
        );
        sheet.push_row(&["0", "2018-01-02", "10"]);
        sheet.push_row(&["1", "2018-01-03", "11"]);
        let panel = PricePanel::from_sheet(&sheet, Currency::Usd).unwrap().clean();
        assert_eq!(panel.dates, vec![d(2018, 1, 2), d(2018, 1, 3)]);
        assert_eq!(panel.instruments, vec!["AAA"]);
        assert_eq!(panel.column("AAA").unwrap(), &[Some(10.0), Some(11.0)]);
    }

    #[test]
    fn from_sheet_without_dated_rows_fails() {
        let sheet = sheet(&[&["0", "n/a", "1", "1"], &["1", "", "2", "2"]]);
        let err = PricePanel::from_sheet(&sheet, Currency::Usd).unwrap_err();
        assert!(matches!(err, IdxtrackError::InvalidData { .. }));
    }

    #[test]
    fn duplicate_dates_rejected() {
        let sheet = sheet(&[&["0", "2020-01-02", "1", "1"], &["1", "2020-01-02", "2", "2"]]);
        let err = PricePanel::from_sheet(&sheet, Currency::Usd).unwrap_err();
        assert!(matches!(err, IdxtrackError::InvalidData { .. }));
    }

    #[test]
    fn clean_drops_columns_over_ten_percent_missing() {
        let dates: Vec<_> = (1..=10).map(|i| d(2020, 1, i)).collect();
        let full: Vec<_> = (0..10).map(|i| Some(i as f64 + 1.0)).collect();
        let mut one_missing = full.clone();
        one_missing[4] = None;
        let mut two_missing = full.clone();
        two_missing[4] = None;
        two_missing[5] = None;

        let panel = PricePanel::new(
            dates,
            vec!["FULL".into(), "ONE".into(), "TWO".into()],
            vec![full, one_missing, two_missing],
            Currency::Usd,
        )
        .unwrap()
        .clean();

        assert_eq!(panel.instruments, vec!["FULL", "ONE"]);
        // Gap on row 4 forward-filled from row 3.
        assert_eq!(panel.column("ONE").unwrap()[4], Some(4.0));
    }

    #[test]
    fn forward_fill_leaves_leading_gap() {
        let panel = PricePanel::new(
            vec![d(2020, 1, 1), d(2020, 1, 2), d(2020, 1, 3)],
            vec!["A".into()],
            vec![vec![None, Some(5.0), None]],
            Currency::Usd,
        )
        .unwrap()
        .forward_fill();
        assert_eq!(panel.column("A").unwrap(), &[None, Some(5.0), Some(5.0)]);
    }

    #[test]
    fn slice_by_year_range_inclusive() {
        let panel = PricePanel::new(
            vec![d(2017, 12, 29), d(2018, 1, 2), d(2019, 12, 31), d(2020, 1, 2)],
            vec!["A".into()],
            vec![vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0)]],
            Currency::Usd,
        )
        .unwrap();
        let slice = panel.slice_by_year_range(2018, 2019);
        assert_eq!(slice.dates, vec![d(2018, 1, 2), d(2019, 12, 31)]);
        assert_eq!(slice.column("A").unwrap(), &[Some(2.0), Some(3.0)]);
    }

    #[test]
    fn slice_by_half_year_splits_at_july() {
        let panel = PricePanel::new(
            vec![d(2019, 6, 28), d(2019, 7, 1), d(2020, 2, 3), d(2020, 8, 3)],
            vec!["A".into()],
            vec![vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0)]],
            Currency::Usd,
        )
        .unwrap();
        let (first, second) = panel.slice_by_half_year(2019, 2020);
        assert_eq!(first.dates, vec![d(2019, 6, 28), d(2020, 2, 3)]);
        assert_eq!(second.dates, vec![d(2019, 7, 1), d(2020, 8, 3)]);
    }

    #[test]
    fn select_instruments_keeps_panel_order() {
        let panel = PricePanel::new(
            vec![d(2020, 1, 1)],
            vec!["A".into(), "B".into(), "C".into()],
            vec![vec![Some(1.0)], vec![Some(2.0)], vec![Some(3.0)]],
            Currency::Usd,
        )
        .unwrap();
        let selected = panel.select_instruments(&["C".into(), "A".into(), "Z".into()]);
        assert_eq!(selected.instruments, vec!["A", "C"]);
    }
}
