#![allow(dead_code)]

use chrono::{Datelike, Duration, NaiveDate};
use idxtrack::domain::error::IdxtrackError;
use idxtrack::domain::index_config::{Currency, IndexConfig, IndexType, Schedule, UniverseId};
use idxtrack::domain::sheet::Sheet;
use idxtrack::ports::data_port::DataPort;
use std::cell::Cell;
use std::collections::HashMap;
use std::path::Path;

pub struct MockDataPort {
    pub sheets: HashMap<String, Sheet>,
    pub errors: HashMap<String, String>,
    pub fetches: Cell<usize>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            sheets: HashMap::new(),
            errors: HashMap::new(),
            fetches: Cell::new(0),
        }
    }

    pub fn with_sheet(mut self, sheet: Sheet) -> Self {
        self.sheets.insert(sheet.name.clone(), sheet);
        self
    }

    pub fn without_sheet(mut self, name: &str) -> Self {
        self.sheets.remove(name);
        self
    }

    pub fn with_error(mut self, name: &str, reason: &str) -> Self {
        self.errors.insert(name.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_sheet(&self, name: &str) -> Result<Sheet, IdxtrackError> {
        self.fetches.set(self.fetches.get() + 1);
        if let Some(reason) = self.errors.get(name) {
            return Err(IdxtrackError::Source {
                reason: reason.clone(),
            });
        }
        self.sheets
            .get(name)
            .cloned()
            .ok_or_else(|| IdxtrackError::unavailable(format!("sheet {}", name)))
    }

    fn list_sheets(&self) -> Result<Vec<String>, IdxtrackError> {
        let mut names: Vec<String> = self.sheets.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// Weekly dates (Mondays) from the first Monday of 2016 to the end of 2021.
pub fn trading_dates() -> Vec<NaiveDate> {
    let mut dates = Vec::new();
    let mut d = date("2016-01-04");
    while d.year() <= 2021 {
        dates.push(d);
        d += Duration::days(7);
    }
    dates
}

pub const INSTRUMENTS: [&str; 6] = ["AAA", "BBB", "CCC", "DDD", "EEE", "FFF"];

/// Deterministic price path: drift plus an oscillation whose size sets volatility.
pub fn price(instrument: usize, t: usize) -> f64 {
    let base: f64 = [20.0, 35.0, 50.0, 80.0, 12.0, 60.0][instrument];
    let drift: f64 = [0.004, 0.002, -0.001, 0.003, 0.001, 0.0005][instrument];
    let swing: f64 = [0.02, 0.10, 0.05, 0.15, 0.01, 0.08][instrument];
    let t = t as f64;
    base * (1.0 + drift).powf(t) * (1.0 + swing * (t * (0.7 + instrument as f64 * 0.3)).sin())
}

pub fn price_sheet(ticker: &str) -> Sheet {
    let mut headers = vec!["Date".to_string()];
    headers.extend(INSTRUMENTS.iter().map(|s| s.to_string()));
    let mut sheet = Sheet::new(format!("{}_PX_LAST", ticker), headers);
    for (t, d) in trading_dates().iter().enumerate() {
        let mut row = vec![d.format("%Y-%m-%d").to_string()];
        row.extend((0..INSTRUMENTS.len()).map(|i| format!("{:.6}", price(i, t))));
        sheet.push_row(&row);
    }
    sheet
}

/// Prices that alternate leadership by half year: AAA, BBB and CCC rise
/// from January to June while DDD, EEE and FFF fall, and the reverse from
/// July to December.
pub fn seasonal_price_sheet(ticker: &str) -> Sheet {
    let mut headers = vec!["Date".to_string()];
    headers.extend(INSTRUMENTS.iter().map(|s| s.to_string()));
    let mut sheet = Sheet::new(format!("{}_PX_LAST", ticker), headers);
    let mut levels: [f64; 6] = [100.0; 6];
    for (t, d) in trading_dates().iter().enumerate() {
        if t > 0 {
            let first_half = d.month() <= 6;
            for (i, level) in levels.iter_mut().enumerate() {
                let leads = (i < 3) == first_half;
                *level *= if leads { 1.01 } else { 0.995 };
            }
        }
        let mut row = vec![d.format("%Y-%m-%d").to_string()];
        row.extend(levels.iter().map(|p| format!("{:.6}", p)));
        sheet.push_row(&row);
    }
    sheet
}

pub const COUNTRIES: [&str; 6] = [
    "FRANCE",
    "France ",
    "UNITED STATES",
    "UNITED STATES",
    "GERMANY",
    "UNITED STATES",
];

/// Fundamentals for `year`; capitalizations grow a little each year.
pub fn qualitative_sheet(year: i32) -> Sheet {
    let mut sheet = Sheet::new(
        format!("Qualitativ_{}", year),
        vec![
            "Ticker".into(),
            "COUNTRY".into(),
            "CUR_MKT_CAP".into(),
            "PE_RATIO".into(),
        ],
    );
    let caps: [f64; 6] = [100.0, 300.0, 250.0, 50.0, 400.0, 150.0];
    let pe: [f64; 6] = [12.0, 35.0, 18.0, 40.0, 9.0, 28.0];
    let growth = 1.0 + (year - 2018) as f64 * 0.1;
    for i in 0..INSTRUMENTS.len() {
        sheet.push_row(&[
            INSTRUMENTS[i].to_string(),
            COUNTRIES[i].to_string(),
            format!("{}", caps[i] * growth),
            format!("{}", pe[i]),
        ]);
    }
    sheet
}

pub fn index_sheet() -> Sheet {
    let mut sheet = Sheet::new(
        "Index",
        vec![
            "Date".into(),
            "SPX Index".into(),
            "Date".into(),
            "SXXP Index".into(),
        ],
    );
    for (t, d) in trading_dates().iter().enumerate() {
        let d = d.format("%Y-%m-%d").to_string();
        let t = t as f64;
        sheet.push_row(&[
            d.clone(),
            format!("{:.4}", 2000.0 * (1.0 + 0.0015 * t + 0.02 * (t * 0.4).sin())),
            d,
            format!("{:.4}", 350.0 * (1.0 + 0.001 * t + 0.03 * (t * 0.3).cos())),
        ]);
    }
    sheet
}

/// Constant EUR crosses: USD to EUR multiplies by 0.8.
pub fn forex_sheet() -> Sheet {
    forex_sheet_with(|_| Some(1.25))
}

/// EUR crosses with the EURUSD quote chosen per date.
pub fn forex_sheet_with(eurusd: impl Fn(NaiveDate) -> Option<f64>) -> Sheet {
    let mut sheet = Sheet::new(
        "Forex",
        vec![
            "Date".into(),
            "EURUSD".into(),
            "EURGBP".into(),
            "EURJPY".into(),
        ],
    );
    for d in trading_dates() {
        let usd = eurusd(d).map(|r| r.to_string()).unwrap_or_default();
        sheet.push_row(&[d.format("%Y-%m-%d").to_string(), usd, "0.8".into(), "125".into()]);
    }
    sheet
}

/// A complete source: both universes, three qualitative years, benchmarks and FX.
pub fn universe_port() -> MockDataPort {
    MockDataPort::new()
        .with_sheet(price_sheet("SPX"))
        .with_sheet(price_sheet("SXXP"))
        .with_sheet(qualitative_sheet(2018))
        .with_sheet(qualitative_sheet(2019))
        .with_sheet(qualitative_sheet(2020))
        .with_sheet(index_sheet())
        .with_sheet(forex_sheet())
}

pub fn make_config(
    currency: Currency,
    index_type: IndexType,
    country: Option<&str>,
) -> IndexConfig {
    let mut config = IndexConfig::new(
        currency,
        UniverseId::Sp500,
        index_type,
        country.map(str::to_string),
    )
    .unwrap();
    config.schedule = Schedule {
        history_start: 2016,
        first_formation_year: 2018,
        last_formation_year: 2020,
    };
    config.screen.momentum_top_n = 3;
    config
}

/// Write every sheet of `port` as `NAME.csv` under `dir`.
pub fn write_csv_sheets(port: &MockDataPort, dir: &Path) {
    for sheet in port.sheets.values() {
        let mut wtr = csv::Writer::from_path(dir.join(format!("{}.csv", sheet.name))).unwrap();
        wtr.write_record(&sheet.headers).unwrap();
        for row in &sheet.rows {
            wtr.write_record(row.iter().map(|c| c.as_deref().unwrap_or("")))
                .unwrap();
        }
        wtr.flush().unwrap();
    }
}
