//! Resolved configuration for one index build.
//!
//! The pipeline receives a fully validated, immutable [`IndexConfig`]; nothing
//! downstream reads ambient settings.

use crate::domain::error::IdxtrackError;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Currency {
    Usd,
    Eur,
    Gbp,
    Jpy,
    Cny,
}

impl Currency {
    pub const ALL: [Currency; 5] = [
        Currency::Usd,
        Currency::Eur,
        Currency::Gbp,
        Currency::Jpy,
        Currency::Cny,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
            Currency::Jpy => "JPY",
            Currency::Cny => "CNY",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = IdxtrackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        Currency::ALL
            .into_iter()
            .find(|c| c.code() == upper)
            .ok_or_else(|| IdxtrackError::Configuration {
                reason: format!("unsupported currency '{}'", s.trim()),
            })
    }
}

/// The two supported equity universes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniverseId {
    Sp500,
    Stoxx600,
}

impl UniverseId {
    /// Ticker used for the price sheet and the benchmark column.
    pub fn ticker(self) -> &'static str {
        match self {
            UniverseId::Sp500 => "SPX",
            UniverseId::Stoxx600 => "SXXP",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            UniverseId::Sp500 => "S&P500",
            UniverseId::Stoxx600 => "Eurostoxx600",
        }
    }
}

impl fmt::Display for UniverseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for UniverseId {
    type Err = IdxtrackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().replace([' ', '-', '_'], "").as_str() {
            "S&P500" | "SP500" | "SPX" => Ok(UniverseId::Sp500),
            "EUROSTOXX600" | "STOXX600" | "SXXP" => Ok(UniverseId::Stoxx600),
            _ => Err(IdxtrackError::Configuration {
                reason: format!("unsupported universe '{}'", s.trim()),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexType {
    HighVolHighValuation,
    Momentum,
    Geographic,
}

impl IndexType {
    pub fn label(self) -> &'static str {
        match self {
            IndexType::HighVolHighValuation => "High vol PER",
            IndexType::Momentum => "Momentum 6 months",
            IndexType::Geographic => "Geographic",
        }
    }

    /// Semi-annual rebalancing (momentum) versus yearly.
    pub fn is_semi_annual(self) -> bool {
        matches!(self, IndexType::Momentum)
    }
}

impl fmt::Display for IndexType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for IndexType {
    type Err = IdxtrackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace([' ', '_', '&'], "-").as_str() {
            "high-vol-per" | "high-vol-high-valuation" | "high-vol" => {
                Ok(IndexType::HighVolHighValuation)
            }
            "momentum" | "momentum-6-months" => Ok(IndexType::Momentum),
            "geographic" | "geographique" | "country" => Ok(IndexType::Geographic),
            _ => Err(IdxtrackError::Configuration {
                reason: format!("unsupported index type '{}'", s.trim()),
            }),
        }
    }
}

/// Rebalancing calendar: weights formed in year Y are held over year Y + 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub history_start: i32,
    pub first_formation_year: i32,
    pub last_formation_year: i32,
}

impl Schedule {
    pub fn formation_years(&self) -> impl Iterator<Item = i32> + '_ {
        self.first_formation_year..=self.last_formation_year
    }
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            history_start: 2010,
            first_formation_year: 2018,
            last_formation_year: 2020,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScreenParams {
    pub volatility_quantile: f64,
    pub valuation_quantile: f64,
    pub valuation_attribute: String,
    pub capitalization_attribute: String,
    pub country_attribute: String,
    pub momentum_top_n: usize,
}

impl Default for ScreenParams {
    fn default() -> Self {
        Self {
            volatility_quantile: 0.4,
            valuation_quantile: 0.7,
            valuation_attribute: "PE_RATIO".into(),
            capitalization_attribute: "CUR_MKT_CAP".into(),
            country_attribute: "COUNTRY".into(),
            momentum_top_n: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalyticsParams {
    /// Annual rate as a fraction (0.01 = 1%), subtracted from percent
    /// returns as percentage points.
    pub risk_free_rate: f64,
    pub periods_per_year: f64,
}

impl Default for AnalyticsParams {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.01,
            periods_per_year: 12.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexConfig {
    pub currency: Currency,
    pub universe: UniverseId,
    pub index_type: IndexType,
    pub country: Option<String>,
    /// Currency the source prices are quoted in.
    pub source_currency: Currency,
    pub schedule: Schedule,
    pub screen: ScreenParams,
    pub analytics: AnalyticsParams,
}

impl IndexConfig {
    /// Build a config with default schedule, screen and analytics parameters.
    ///
    /// Fails with `Configuration` when a geographic index has no country.
    pub fn new(
        currency: Currency,
        universe: UniverseId,
        index_type: IndexType,
        country: Option<String>,
    ) -> Result<Self, IdxtrackError> {
        let config = Self {
            currency,
            universe,
            index_type,
            country,
            source_currency: Currency::Usd,
            schedule: Schedule::default(),
            screen: ScreenParams::default(),
            analytics: AnalyticsParams::default(),
        };
        config.check()?;
        Ok(config)
    }

    /// Cross-field checks on an assembled config.
    pub fn check(&self) -> Result<(), IdxtrackError> {
        let country = self
            .country
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty());
        if self.index_type == IndexType::Geographic && country.is_none() {
            return Err(IdxtrackError::Configuration {
                reason: "a geographic index requires a country".into(),
            });
        }
        if self.schedule.first_formation_year > self.schedule.last_formation_year {
            return Err(IdxtrackError::Configuration {
                reason: "first_formation_year must not be after last_formation_year".into(),
            });
        }
        if self.schedule.history_start > self.schedule.first_formation_year {
            return Err(IdxtrackError::Configuration {
                reason: "history_start must not be after first_formation_year".into(),
            });
        }
        Ok(())
    }

    /// Display label of the custom index.
    pub fn index_label(&self) -> String {
        match (self.index_type, &self.country) {
            (IndexType::Geographic, Some(country)) => format!("Index {}", country.trim()),
            (index_type, _) => index_type.label().to_string(),
        }
    }
}
