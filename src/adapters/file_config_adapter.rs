//! INI file configuration adapter.

use crate::domain::error::RegimeError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, RegimeError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config.load(path).map_err(|reason| RegimeError::ConfigParse {
            file: path.display().to_string(),
            reason,
        })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, RegimeError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| RegimeError::ConfigParse {
                file: "<string>".to_string(),
                reason,
            })?;
        Ok(Self { config })
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

    fn entries(&self) -> Vec<(String, String)> {
        let mut entries: Vec<(String, String)> = self
            .config
            .get_map_ref()
            .iter()
            .flat_map(|(section, keys)| {
                keys.keys()
                    .map(move |key| (section.clone(), key.clone()))
            })
            .collect();
        entries.sort();
        entries
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

    #[test]
    fn from_string_parses_sections() {
        let content = r#"
[instruments]
core = QQQ
leveraged_long = TQQQ

[trend_filter]
noise_mode = volume
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(
            adapter.get_string("instruments", "core"),
            Some("QQQ".to_string())
        );
        assert_eq!(
            adapter.get_string("trend_filter", "noise_mode"),
            Some("volume".to_string())
        );
    }

    #[test]
    fn get_string_returns_none_for_missing_key() {
        let adapter = FileConfigAdapter::from_string("[trend]\nfast_ma = 50\n").unwrap();
        assert_eq!(adapter.get_string("trend", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
    }

    #[test]
    fn get_int_reads_signed_values() {
        let adapter =
            FileConfigAdapter::from_string("[volatility]\nrealized_window = 21\nx = -4\n").unwrap();
        assert_eq!(adapter.get_int("volatility", "realized_window", 0), 21);
        assert_eq!(adapter.get_int("volatility", "x", 0), -4);
    }

    #[test]
    fn get_int_returns_default_for_missing_or_non_numeric() {
        let adapter = FileConfigAdapter::from_string("[trend]\nslow_ma = abc\n").unwrap();
        assert_eq!(adapter.get_int("trend", "slow_ma", 200), 200);
        assert_eq!(adapter.get_int("trend", "fast_ma", 50), 50);
    }

    #[test]
    fn get_double_reads_negative_exposure() {
        let adapter = FileConfigAdapter::from_string("[cells]\nbear_volatile = -0.5\n").unwrap();
        assert_eq!(adapter.get_double("cells", "bear_volatile", 0.0), -0.5);
    }

    #[test]
    fn get_double_returns_default_for_non_numeric() {
        let adapter =
            FileConfigAdapter::from_string("[drawdown]\nsoft_threshold = ten\n").unwrap();
        assert_eq!(adapter.get_double("drawdown", "soft_threshold", 0.1), 0.1);
    }

    #[test]
    fn entries_are_sorted_and_lowercased() {
        let adapter =
            FileConfigAdapter::from_string("[Trend]\nSlow_MA = 100\nfast_ma = 20\n[exposure]\nmax = 1\n")
                .unwrap();
        assert_eq!(
            adapter.entries(),
            vec![
                ("exposure".to_string(), "max".to_string()),
                ("trend".to_string(), "fast_ma".to_string()),
                ("trend".to_string(), "slow_ma".to_string()),
            ]
        );
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config("[data]\ndir = /var/bars\n");
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(adapter.get_string("data", "dir"), Some("/var/bars".to_string()));
    }

    #[test]
    fn from_file_missing_is_parse_error() {
        let result = FileConfigAdapter::from_file("/nonexistent/path/config.ini");
        assert!(matches!(result, Err(RegimeError::ConfigParse { file, .. }) if file.contains("config.ini")));
    }
}
