//! Configuration validation.
//!
//! Checks every index, schedule, screen and analytics key before a build runs.

use crate::domain::error::IdxtrackError;
use crate::domain::index_config::{Currency, IndexType, UniverseId};
use crate::ports::config_port::ConfigPort;
use std::str::FromStr;

pub fn validate_index_config(config: &dyn ConfigPort) -> Result<(), IdxtrackError> {
    validate_source(config)?;
    validate_index(config)?;
    validate_schedule(config)?;
    validate_screen(config)?;
    validate_analytics(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> IdxtrackError {
    IdxtrackError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn required(config: &dyn ConfigPort, section: &str, key: &str) -> Result<String, IdxtrackError> {
    match config.get_string(section, key) {
        Some(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        _ => Err(IdxtrackError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }),
    }
}

fn parsed<T: FromStr<Err = IdxtrackError>>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<T, IdxtrackError> {
    required(config, section, key)?
        .parse()
        .map_err(|e: IdxtrackError| invalid(section, key, e.to_string()))
}

/// A numeric key, or `default` when absent or blank. Present but unparseable is invalid.
fn number<T: FromStr>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: T,
) -> Result<T, IdxtrackError> {
    match config.get_string(section, key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| invalid(section, key, format!("'{}' is not a number", raw.trim()))),
        _ => Ok(default),
    }
}

fn validate_source(config: &dyn ConfigPort) -> Result<(), IdxtrackError> {
    let kind = required(config, "source", "kind")?;
    match kind.to_lowercase().as_str() {
        "csv" => {
            required(config, "source", "path")?;
        }
        "sqlite" => {
            if config.get_string("sqlite", "path").is_none() {
                required(config, "source", "path")?;
            }
        }
        other => {
            return Err(invalid(
                "source",
                "kind",
                format!("unknown source kind '{}'", other),
            ));
        }
    }
    Ok(())
}

fn validate_index(config: &dyn ConfigPort) -> Result<(), IdxtrackError> {
    parsed::<Currency>(config, "index", "currency")?;
    parsed::<UniverseId>(config, "index", "universe")?;
    let index_type = parsed::<IndexType>(config, "index", "type")?;
    if let Some(source) = config.get_string("index", "source_currency") {
        source
            .parse::<Currency>()
            .map_err(|e| invalid("index", "source_currency", e.to_string()))?;
    }

    let country = config
        .get_string("index", "country")
        .filter(|c| !c.trim().is_empty());
    if index_type == IndexType::Geographic && country.is_none() {
        return Err(IdxtrackError::Configuration {
            reason: "a geographic index requires [index] country".into(),
        });
    }
    Ok(())
}

fn validate_schedule(config: &dyn ConfigPort) -> Result<(), IdxtrackError> {
    let start = number::<i64>(config, "schedule", "history_start", 2010)?;
    let first = number::<i64>(config, "schedule", "first_formation_year", 2018)?;
    let last = number::<i64>(config, "schedule", "last_formation_year", 2020)?;
    if first > last {
        return Err(invalid(
            "schedule",
            "first_formation_year",
            "first_formation_year must not be after last_formation_year",
        ));
    }
    if start > first {
        return Err(invalid(
            "schedule",
            "history_start",
            "history_start must not be after first_formation_year",
        ));
    }
    Ok(())
}

fn validate_quantile(
    config: &dyn ConfigPort,
    key: &str,
    default: f64,
) -> Result<(), IdxtrackError> {
    let q = number(config, "screen", key, default)?;
    if !(0.0..=1.0).contains(&q) {
        return Err(invalid("screen", key, format!("{} must be between 0 and 1", key)));
    }
    Ok(())
}

fn validate_screen(config: &dyn ConfigPort) -> Result<(), IdxtrackError> {
    validate_quantile(config, "volatility_quantile", 0.4)?;
    validate_quantile(config, "valuation_quantile", 0.7)?;
    if number::<i64>(config, "screen", "momentum_top_n", 100)? <= 0 {
        return Err(invalid("screen", "momentum_top_n", "momentum_top_n must be positive"));
    }
    for key in [
        "valuation_attribute",
        "capitalization_attribute",
        "country_attribute",
    ] {
        if config
            .get_string("screen", key)
            .is_some_and(|v| v.trim().is_empty())
        {
            return Err(invalid("screen", key, format!("{} must not be empty", key)));
        }
    }
    Ok(())
}

fn validate_analytics(config: &dyn ConfigPort) -> Result<(), IdxtrackError> {
    let rate = number::<f64>(config, "analytics", "risk_free_rate", 0.01)?;
    if !(0.0..1.0).contains(&rate) {
        return Err(invalid(
            "analytics",
            "risk_free_rate",
            "risk_free_rate must be between 0 and 1",
        ));
    }
    if number::<f64>(config, "analytics", "periods_per_year", 12.0)? <= 0.0 {
        return Err(invalid(
            "analytics",
            "periods_per_year",
            "periods_per_year must be positive",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    const VALID: &str = r#"
[source]
kind = csv
path = data

[index]
currency = EUR
universe = S&P500
type = momentum

[schedule]
history_start = 2010
first_formation_year = 2018
last_formation_year = 2020

[screen]
volatility_quantile = 0.4
valuation_quantile = 0.7
momentum_top_n = 100

[analytics]
risk_free_rate = 0.01
periods_per_year = 12
"#;

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    fn with(replace: &str, by: &str) -> FileConfigAdapter {
        assert!(VALID.contains(replace));
        make_config(&VALID.replace(replace, by))
    }

    #[test]
    fn valid_config_passes() {
        assert!(validate_index_config(&make_config(VALID)).is_ok());
    }

    #[test]
    fn missing_source_path_fails() {
        let err = validate_index_config(&with("path = data\n", "")).unwrap_err();
        assert!(matches!(err, IdxtrackError::ConfigMissing { key, .. } if key == "path"));
    }

    #[test]
    fn unknown_source_kind_fails() {
        let err = validate_index_config(&with("kind = csv", "kind = xlsx")).unwrap_err();
        assert!(matches!(err, IdxtrackError::ConfigInvalid { key, .. } if key == "kind"));
    }

    #[test]
    fn unsupported_currency_fails() {
        let err = validate_index_config(&with("currency = EUR", "currency = CHF")).unwrap_err();
        assert!(
            matches!(err, IdxtrackError::ConfigInvalid { section, key, .. } if section == "index" && key == "currency")
        );
    }

    #[test]
    fn unknown_universe_fails() {
        let err = validate_index_config(&with("universe = S&P500", "universe = NIKKEI")).unwrap_err();
        assert!(matches!(err, IdxtrackError::ConfigInvalid { key, .. } if key == "universe"));
    }

    #[test]
    fn missing_type_fails() {
        let err = validate_index_config(&with("type = momentum\n", "")).unwrap_err();
        assert!(matches!(err, IdxtrackError::ConfigMissing { key, .. } if key == "type"));
    }

    #[test]
    fn geographic_without_country_fails() {
        let err = validate_index_config(&with("type = momentum", "type = geographic")).unwrap_err();
        assert!(matches!(err, IdxtrackError::Configuration { .. }));
    }

    #[test]
    fn geographic_with_country_passes() {
        let config = with("type = momentum", "type = geographic\ncountry = FRANCE");
        assert!(validate_index_config(&config).is_ok());
    }

    #[test]
    fn inverted_schedule_fails() {
        let err = validate_index_config(&with(
            "first_formation_year = 2018",
            "first_formation_year = 2022",
        ))
        .unwrap_err();
        assert!(
            matches!(err, IdxtrackError::ConfigInvalid { key, .. } if key == "first_formation_year")
        );
    }

    #[test]
    fn history_after_formation_fails() {
        let err =
            validate_index_config(&with("history_start = 2010", "history_start = 2019")).unwrap_err();
        assert!(matches!(err, IdxtrackError::ConfigInvalid { key, .. } if key == "history_start"));
    }

    #[test]
    fn quantile_out_of_range_fails() {
        let err = validate_index_config(&with(
            "valuation_quantile = 0.7",
            "valuation_quantile = 1.7",
        ))
        .unwrap_err();
        assert!(
            matches!(err, IdxtrackError::ConfigInvalid { key, .. } if key == "valuation_quantile")
        );
    }

    #[test]
    fn non_numeric_values_fail() {
        let err = validate_index_config(&with(
            "volatility_quantile = 0.4",
            "volatility_quantile = abc",
        ))
        .unwrap_err();
        assert!(matches!(
            err,
            IdxtrackError::ConfigInvalid { section, key, .. }
                if section == "screen" && key == "volatility_quantile"
        ));

        let err = validate_index_config(&with("history_start = 2010", "history_start = 20x0"))
            .unwrap_err();
        assert!(matches!(err, IdxtrackError::ConfigInvalid { key, .. } if key == "history_start"));

        let err = validate_index_config(&with("momentum_top_n = 100", "momentum_top_n = 2.5"))
            .unwrap_err();
        assert!(matches!(err, IdxtrackError::ConfigInvalid { key, .. } if key == "momentum_top_n"));

        let err = validate_index_config(&with("periods_per_year = 12", "periods_per_year = monthly"))
            .unwrap_err();
        assert!(
            matches!(err, IdxtrackError::ConfigInvalid { key, .. } if key == "periods_per_year")
        );
    }

    #[test]
    fn zero_top_n_fails() {
        let err =
            validate_index_config(&with("momentum_top_n = 100", "momentum_top_n = 0")).unwrap_err();
        assert!(matches!(err, IdxtrackError::ConfigInvalid { key, .. } if key == "momentum_top_n"));
    }

    #[test]
    fn risk_free_rate_out_of_range_fails() {
        let err =
            validate_index_config(&with("risk_free_rate = 0.01", "risk_free_rate = 1.5")).unwrap_err();
        assert!(matches!(err, IdxtrackError::ConfigInvalid { key, .. } if key == "risk_free_rate"));
    }

    #[test]
    fn non_positive_periods_per_year_fails() {
        let err = validate_index_config(&with("periods_per_year = 12", "periods_per_year = 0"))
            .unwrap_err();
        assert!(
            matches!(err, IdxtrackError::ConfigInvalid { key, .. } if key == "periods_per_year")
        );
    }
}
