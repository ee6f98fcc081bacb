//! Raw tabular sheets as exposed by a data source.
//!
//! A [`Sheet`] is a header row plus string cells. Interpretation (which
//! column holds dates, which cells are numeric) happens in the data access
//! layer, so every source adapter only has to produce cells.

use crate::domain::error::IdxtrackError;
use chrono::{NaiveDate, NaiveDateTime};

pub const FOREX_SHEET: &str = "Forex";
pub const INDEX_SHEET: &str = "Index";

pub fn price_sheet_name(ticker: &str) -> String {
    format!("{}_PX_LAST", ticker)
}

pub fn qualitative_sheet_name(year: i32) -> String {
    format!("Qualitativ_{}", year)
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sheet {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, headers: Vec<String>) -> Self {
        Self {
            name: name.into(),
            headers,
            rows: Vec::new(),
        }
    }

    /// Append a row, treating blank strings as empty cells.
    pub fn push_row<S: AsRef<str>>(&mut self, cells: &[S]) {
        let row = cells
            .iter()
            .map(|c| {
                let trimmed = c.as_ref().trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            })
            .collect();
        self.rows.push(row);
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .and_then(|c| c.as_deref())
    }

    pub fn column_index(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.trim() == header)
    }

    /// The column holding dates: the first header reading `date` or `dates`
    /// (any case), else the first column whose first filled cell is a date.
    pub fn date_column(&self) -> Result<usize, IdxtrackError> {
        if let Some(col) = self.headers.iter().position(|h| {
            let h = h.trim();
            h.eq_ignore_ascii_case("date") || h.eq_ignore_ascii_case("dates")
        }) {
            return Ok(col);
        }
        (0..self.column_count())
            .find(|&col| {
                self.rows
                    .iter()
                    .find_map(|row| row.get(col).and_then(|c| c.as_deref()))
                    .and_then(parse_date)
                    .is_some()
            })
            .ok_or_else(|| IdxtrackError::InvalidData {
                what: format!("sheet {}", self.name),
                reason: "no date column".into(),
            })
    }
}

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d"];
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Parse a date cell. Spreadsheet exports sometimes carry a midnight time.
pub fn parse_date(cell: &str) -> Option<NaiveDate> {
    let s = cell.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|dt| dt.date())
        })
}

/// Parse a numeric cell; `None` for anything that does not coerce to a finite number.
pub fn parse_number(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}
