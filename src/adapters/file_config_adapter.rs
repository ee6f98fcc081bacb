//! INI file configuration adapter.

use crate::domain::error::IdxtrackError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, IdxtrackError> {
        let mut config = Ini::new();
        config
            .load(path.as_ref())
            .map_err(|reason| IdxtrackError::ConfigParse {
                file: path.as_ref().display().to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, IdxtrackError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| IdxtrackError::ConfigParse {
                file: "<string>".into(),
                reason,
            })?;
        Ok(Self { config })
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.trim().to_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" => Some(false),
            _ => None,
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.config
            .getint(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.config
            .getfloat(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.config
            .get(section, key)
            .as_deref()
            .and_then(Self::parse_bool)
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    const SAMPLE: &str = r#"
[source]
kind = csv
path = /data/bloomberg

[index]
currency = EUR
universe = S&P500
type = geographic
country = UNITED STATES

[schedule]
first_formation_year = 2018

[screen]
volatility_quantile = 0.4
momentum_top_n = 50

[output]
overwrite = yes
"#;

    #[test]
    fn from_string_parses_index_sections() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(
            adapter.get_string("source", "path"),
            Some("/data/bloomberg".to_string())
        );
        assert_eq!(
            adapter.get_string("index", "universe"),
            Some("S&P500".to_string())
        );
        assert_eq!(
            adapter.get_string("index", "country"),
            Some("UNITED STATES".to_string())
        );
    }

    #[test]
    fn get_string_returns_none_for_missing_key() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(adapter.get_string("index", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
    }

    #[test]
    fn get_int_reads_value_or_default() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(adapter.get_int("schedule", "first_formation_year", 0), 2018);
        assert_eq!(adapter.get_int("schedule", "last_formation_year", 2020), 2020);
        assert_eq!(adapter.get_int("index", "currency", 7), 7);
    }

    #[test]
    fn get_double_reads_value_or_default() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(adapter.get_double("screen", "volatility_quantile", 0.0), 0.4);
        assert_eq!(adapter.get_double("screen", "valuation_quantile", 0.7), 0.7);
        assert_eq!(adapter.get_double("index", "type", 9.5), 9.5);
    }

    #[test]
    fn get_bool_accepts_common_spellings() {
        let adapter =
            FileConfigAdapter::from_string("[output]\na = true\nb = yes\nc = 1\nd = off\n")
                .unwrap();
        assert!(adapter.get_bool("output", "a", false));
        assert!(adapter.get_bool("output", "b", false));
        assert!(adapter.get_bool("output", "c", false));
        assert!(!adapter.get_bool("output", "d", true));
        assert!(adapter.get_bool("output", "missing", true));
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config(SAMPLE);
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(adapter.get_string("source", "kind"), Some("csv".to_string()));
    }

    #[test]
    fn from_file_missing_is_config_parse_error() {
        let Err(err) = FileConfigAdapter::from_file("/nonexistent/path/idxtrack.ini") else {
            panic!("a missing file should not load");
        };
        assert!(matches!(err, IdxtrackError::ConfigParse { file, .. } if file.contains("idxtrack.ini")));
    }
}
