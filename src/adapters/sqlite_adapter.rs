//! SQLite data adapter: sheets stored cell by cell.
//!
//! Table `sheet_cells(sheet, row, col, value)`; row 0 holds the headers and a
//! NULL value is an empty cell.

use crate::domain::error::IdxtrackError;
use crate::domain::sheet::Sheet;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;

fn pool_error(e: r2d2::Error) -> IdxtrackError {
    IdxtrackError::Source {
        reason: e.to_string(),
    }
}

fn query_error(e: rusqlite::Error) -> IdxtrackError {
    IdxtrackError::Source {
        reason: e.to_string(),
    }
}

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteAdapter {
    /// Open the database at `[sqlite] path`, falling back to `[source] path`.
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, IdxtrackError> {
        let db_path = config
            .get_string("sqlite", "path")
            .or_else(|| config.get_string("source", "path"))
            .ok_or_else(|| IdxtrackError::ConfigMissing {
                section: "source".into(),
                key: "path".into(),
            })?;

        let pool_size = config.get_int("sqlite", "pool_size", 4).max(1) as u32;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(pool_error)?;

        Ok(Self { pool })
    }

    pub fn in_memory() -> Result<Self, IdxtrackError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(pool_error)?;

        Ok(Self { pool })
    }

    pub fn initialize_schema(&self) -> Result<(), IdxtrackError> {
        let conn = self.pool.get().map_err(pool_error)?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS sheet_cells (
                sheet TEXT NOT NULL,
                row INTEGER NOT NULL,
                col INTEGER NOT NULL,
                value TEXT,
                PRIMARY KEY (sheet, row, col)
            );
            CREATE INDEX IF NOT EXISTS idx_sheet_cells_sheet ON sheet_cells(sheet);",
        )
        .map_err(query_error)?;

        Ok(())
    }

    /// Replace a stored sheet with `sheet`.
    pub fn insert_sheet(&self, sheet: &Sheet) -> Result<(), IdxtrackError> {
        let mut conn = self.pool.get().map_err(pool_error)?;
        let tx = conn.transaction().map_err(query_error)?;

        tx.execute("DELETE FROM sheet_cells WHERE sheet = ?1", params![sheet.name])
            .map_err(query_error)?;

        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO sheet_cells (sheet, row, col, value) VALUES (?1, ?2, ?3, ?4)",
                )
                .map_err(query_error)?;

            for (col, header) in sheet.headers.iter().enumerate() {
                stmt.execute(params![sheet.name, 0i64, col as i64, header])
                    .map_err(query_error)?;
            }
            for (r, row) in sheet.rows.iter().enumerate() {
                for (col, value) in row.iter().enumerate() {
                    stmt.execute(params![sheet.name, (r + 1) as i64, col as i64, value])
                        .map_err(query_error)?;
                }
            }
        }

        tx.commit().map_err(query_error)?;
        Ok(())
    }
}

impl DataPort for SqliteAdapter {
    fn fetch_sheet(&self, name: &str) -> Result<Sheet, IdxtrackError> {
        let conn = self.pool.get().map_err(pool_error)?;

        let mut stmt = conn
            .prepare(
                "SELECT row, col, value FROM sheet_cells
                 WHERE sheet = ?1
                 ORDER BY row ASC, col ASC",
            )
            .map_err(query_error)?;

        let cells = stmt
            .query_map(params![name], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, Option<String>>(2)?,
                ))
            })
            .map_err(query_error)?;

        let mut headers: Vec<String> = Vec::new();
        let mut rows: Vec<Vec<String>> = Vec::new();
        for cell in cells {
            let (r, c, value) = cell.map_err(query_error)?;
            let (r, c) = (r as usize, c as usize);
            let target = if r == 0 {
                &mut headers
            } else {
                if rows.len() < r {
                    rows.resize_with(r, Vec::new);
                }
                &mut rows[r - 1]
            };
            if target.len() <= c {
                target.resize(c + 1, String::new());
            }
            target[c] = value.unwrap_or_default();
        }

        if headers.is_empty() && rows.is_empty() {
            return Err(IdxtrackError::unavailable(format!("sheet {}", name)));
        }

        let mut sheet = Sheet::new(name, headers);
        for row in &rows {
            sheet.push_row(row);
        }
        Ok(sheet)
    }

    fn list_sheets(&self) -> Result<Vec<String>, IdxtrackError> {
        let conn = self.pool.get().map_err(pool_error)?;

        let mut stmt = conn
            .prepare("SELECT DISTINCT sheet FROM sheet_cells ORDER BY sheet")
            .map_err(query_error)?;

        let rows = stmt
            .query_map([], |row| row.get(0))
            .map_err(query_error)?;

        let mut sheets = Vec::new();
        for row in rows {
            sheets.push(row.map_err(query_error)?);
        }

        Ok(sheets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EmptyConfig;

    impl ConfigPort for EmptyConfig {
        fn get_string(&self, _section: &str, _key: &str) -> Option<String> {
            None
        }
        fn get_int(&self, _section: &str, _key: &str, default: i64) -> i64 {
            default
        }
        fn get_double(&self, _section: &str, _key: &str, default: f64) -> f64 {
            default
        }
        fn get_bool(&self, _section: &str, _key: &str, default: bool) -> bool {
            default
        }
    }

    fn seeded() -> SqliteAdapter {
        let adapter = SqliteAdapter::in_memory().unwrap();
        adapter.initialize_schema().unwrap();
        let mut sheet = Sheet::new(
            "Qualitativ_2018",
            vec!["Ticker".into(), "COUNTRY".into(), "CUR_MKT_CAP".into()],
        );
        sheet.push_row(&["AAA", "FRANCE", "12.5"]);
        sheet.push_row(&["BBB", "", "3"]);
        adapter.insert_sheet(&sheet).unwrap();
        adapter
    }

    #[test]
    fn from_config_missing_path() {
        let config = EmptyConfig;
        let result = SqliteAdapter::from_config(&config);
        match result {
            Err(IdxtrackError::ConfigMissing { section, key }) => {
                assert_eq!(section, "source");
                assert_eq!(key, "path");
            }
            Err(other) => panic!("expected ConfigMissing, got: {other}"),
            Ok(_) => panic!("expected error, got Ok"),
        }
    }

    #[test]
    fn in_memory_initialization() {
        let adapter = SqliteAdapter::in_memory().unwrap();
        adapter.initialize_schema().unwrap();
        assert!(adapter.list_sheets().unwrap().is_empty());
    }

    #[test]
    fn sheet_survives_storage() {
        let adapter = seeded();
        let sheet = adapter.fetch_sheet("Qualitativ_2018").unwrap();
        assert_eq!(sheet.headers, vec!["Ticker", "COUNTRY", "CUR_MKT_CAP"]);
        assert_eq!(sheet.row_count(), 2);
        assert_eq!(sheet.cell(0, 2), Some("12.5"));
        assert_eq!(sheet.cell(1, 1), None);
    }

    #[test]
    fn insert_sheet_replaces_previous_content() {
        let adapter = seeded();
        let mut smaller = Sheet::new("Qualitativ_2018", vec!["Ticker".into()]);
        smaller.push_row(&["ZZZ"]);
        adapter.insert_sheet(&smaller).unwrap();

        let sheet = adapter.fetch_sheet("Qualitativ_2018").unwrap();
        assert_eq!(sheet.headers, vec!["Ticker"]);
        assert_eq!(sheet.row_count(), 1);
    }

    #[test]
    fn missing_sheet_is_data_unavailable() {
        let adapter = seeded();
        let err = adapter.fetch_sheet("Forex").unwrap_err();
        assert!(matches!(err, IdxtrackError::DataUnavailable { .. }));
    }

    #[test]
    fn list_sheets_sorted() {
        let adapter = seeded();
        adapter.insert_sheet(&Sheet::new("Forex", vec!["Date".into()])).unwrap();
        assert_eq!(adapter.list_sheets().unwrap(), vec!["Forex", "Qualitativ_2018"]);
    }
}
