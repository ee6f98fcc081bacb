//! CSV directory data adapter: sheet `NAME` is the file `NAME.csv`.

use crate::domain::error::IdxtrackError;
use crate::domain::sheet::Sheet;
use crate::ports::data_port::DataPort;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, sheet: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", sheet))
    }
}

impl DataPort for CsvAdapter {
    fn fetch_sheet(&self, name: &str) -> Result<Sheet, IdxtrackError> {
        let path = self.csv_path(name);
        let content = fs::read_to_string(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => IdxtrackError::unavailable(format!("sheet {}", name)),
            _ => IdxtrackError::Source {
                reason: format!("failed to read {}: {}", path.display(), e),
            },
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(content.trim_start_matches('\u{feff}').as_bytes());

        let headers = rdr
            .headers()
            .map_err(|e| IdxtrackError::Source {
                reason: format!("CSV header error in {}: {}", path.display(), e),
            })?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        let mut sheet = Sheet::new(name, headers);

        for result in rdr.records() {
            let record = result.map_err(|e| IdxtrackError::Source {
                reason: format!("CSV parse error in {}: {}", path.display(), e),
            })?;
            sheet.push_row(&record.iter().collect::<Vec<_>>());
        }

        Ok(sheet)
    }

    fn list_sheets(&self) -> Result<Vec<String>, IdxtrackError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| IdxtrackError::Source {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut sheets = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| IdxtrackError::Source {
                reason: format!("directory entry error: {}", e),
            })?;

            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            if let Some(sheet) = name_str.strip_suffix(".csv") {
                sheets.push(sheet.to_string());
            }
        }

        sheets.sort();
        Ok(sheets)
    }
}
