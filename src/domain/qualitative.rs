//! Per-instrument fundamental attributes for one reference year.

use crate::domain::error::IdxtrackError;
use crate::domain::factor::FactorSeries;
use crate::domain::price_panel::PricePanel;
use crate::domain::sheet::{parse_number, Sheet};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct QualitativeTable {
    pub year: i32,
    pub ids: Vec<String>,
    pub attributes: Vec<String>,
    /// Row-major: `cells[r][a]` is attribute `attributes[a]` of `ids[r]`.
    pub cells: Vec<Vec<Option<String>>>,
}

impl QualitativeTable {
    /// Parse a qualitative sheet: first column is the instrument id.
    ///
    /// Rows without an id are skipped; a repeated id keeps its first row.
    pub fn from_sheet(sheet: &Sheet, year: i32) -> Result<Self, IdxtrackError> {
        if sheet.headers.is_empty() {
            return Err(IdxtrackError::InvalidData {
                what: format!("sheet {}", sheet.name),
                reason: "no columns".into(),
            });
        }
        let attributes: Vec<String> = sheet.headers[1..]
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut ids = Vec::with_capacity(sheet.row_count());
        let mut cells = Vec::with_capacity(sheet.row_count());
        let mut seen = std::collections::HashSet::new();
        for row in 0..sheet.row_count() {
            let Some(id) = sheet.cell(row, 0) else {
                continue;
            };
            if !seen.insert(id.to_string()) {
                tracing::warn!(sheet = %sheet.name, id, "duplicate qualitative row ignored");
                continue;
            }
            ids.push(id.to_string());
            cells.push(
                (0..attributes.len())
                    .map(|a| sheet.cell(row, a + 1).map(str::to_string))
                    .collect(),
            );
        }

        Ok(Self {
            year,
            ids,
            attributes,
            cells,
        })
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    fn attribute_index(&self, attribute: &str) -> Result<usize, IdxtrackError> {
        self.attributes
            .iter()
            .position(|a| a == attribute)
            .ok_or_else(|| {
                IdxtrackError::unavailable(format!(
                    "attribute {} in qualitative data for {}",
                    attribute, self.year
                ))
            })
    }

    /// Keep rows whose id is a panel instrument, in panel column order.
    pub fn restrict_to_panel(&self, panel: &PricePanel) -> Self {
        let by_id: HashMap<&str, usize> = self
            .ids
            .iter()
            .enumerate()
            .map(|(r, id)| (id.as_str(), r))
            .collect();
        let rows: Vec<usize> = panel
            .instruments
            .iter()
            .filter_map(|id| by_id.get(id.as_str()).copied())
            .collect();
        self.select_rows(&rows)
    }

    fn select_rows(&self, rows: &[usize]) -> Self {
        Self {
            year: self.year,
            ids: rows.iter().map(|&r| self.ids[r].clone()).collect(),
            attributes: self.attributes.clone(),
            cells: rows.iter().map(|&r| self.cells[r].clone()).collect(),
        }
    }

    /// Numeric view of an attribute. Cells that do not coerce are excluded.
    pub fn numeric(&self, attribute: &str) -> Result<FactorSeries, IdxtrackError> {
        let a = self.attribute_index(attribute)?;
        Ok(self
            .ids
            .iter()
            .zip(&self.cells)
            .filter_map(|(id, row)| {
                row[a]
                    .as_deref()
                    .and_then(parse_number)
                    .map(|v| (id.clone(), v))
            })
            .collect())
    }

    /// Raw string view of an attribute, empty cells omitted.
    pub fn text(&self, attribute: &str) -> Result<Vec<(String, String)>, IdxtrackError> {
        let a = self.attribute_index(attribute)?;
        Ok(self
            .ids
            .iter()
            .zip(&self.cells)
            .filter_map(|(id, row)| row[a].clone().map(|v| (id.clone(), v)))
            .collect())
    }

    /// Rows whose `attribute` matches `target` (case-insensitive substring).
    pub fn filter_by_attribute(
        &self,
        attribute: &str,
        target: &str,
    ) -> Result<Self, IdxtrackError> {
        let a = self.attribute_index(attribute)?;
        let needle = target.trim().to_lowercase();
        let rows: Vec<usize> = self
            .cells
            .iter()
            .enumerate()
            .filter(|(_, row)| {
                !needle.is_empty()
                    && row[a]
                        .as_deref()
                        .is_some_and(|v| v.trim().to_lowercase().contains(&needle))
            })
            .map(|(r, _)| r)
            .collect();
        Ok(self.select_rows(&rows))
    }

    /// Sorted distinct values of a text attribute.
    pub fn distinct_values(&self, attribute: &str) -> Result<Vec<String>, IdxtrackError> {
        let mut values: Vec<String> = self
            .text(attribute)?
            .into_iter()
            .map(|(_, v)| v)
            .collect();
        values.sort();
        values.dedup();
        Ok(values)
    }
}
