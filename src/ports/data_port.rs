//! Data access port trait.

use crate::domain::error::IdxtrackError;
use crate::domain::sheet::Sheet;

/// A tabular market-data source exposing named sheets.
pub trait DataPort {
    /// Fetch a sheet by name. A missing sheet is `DataUnavailable`.
    fn fetch_sheet(&self, name: &str) -> Result<Sheet, IdxtrackError>;

    fn list_sheets(&self) -> Result<Vec<String>, IdxtrackError>;
}
