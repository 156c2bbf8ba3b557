//! INI file configuration adapter.

use crate::domain::error::VolshieldError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

#[derive(Debug)]
pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, VolshieldError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config.load(path).map_err(|reason| VolshieldError::ConfigParse {
            file: path.display().to_string(),
            reason,
        })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, VolshieldError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| VolshieldError::ConfigParse {
                file: "<string>".into(),
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
    fn from_string_parses_all_sections() {
        let content = r#"
[backtest]
start_date = 2020-01-01
initial_capital = 100000.0

[universe]
crypto = BTCUSD, ETHUSD
benchmark = SPY

[sizing]
exposure_ceiling = 0.95
exposure_policy = per_instrument

[policy]
momentum_threshold = 55

[indicators]
supertrend_period = 10
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(
            adapter.get_string("universe", "crypto"),
            Some("BTCUSD, ETHUSD".to_string())
        );
        assert_eq!(adapter.get_double("sizing", "exposure_ceiling", 0.0), 0.95);
        assert_eq!(
            adapter.get_string("sizing", "exposure_policy"),
            Some("per_instrument".to_string())
        );
        assert_eq!(adapter.get_double("policy", "momentum_threshold", 0.0), 55.0);
        assert_eq!(adapter.get_int("indicators", "supertrend_period", 0), 10);
    }

    #[test]
    fn missing_keys_and_sections() {
        let adapter = FileConfigAdapter::from_string("[sizing]\nmin_weight = 0.05\n").unwrap();
        assert_eq!(adapter.get_string("sizing", "max_weight"), None);
        assert_eq!(adapter.get_string("universe", "crypto"), None);
        assert_eq!(adapter.get_string("sizing", "min_weight"), Some("0.05".to_string()));
    }

    #[test]
    fn numeric_defaults_for_missing_or_garbage() {
        let adapter = FileConfigAdapter::from_string(
            "[indicators]\nrsi_period = ten\n[sizing]\nleverage = lots\n",
        )
        .unwrap();
        assert_eq!(adapter.get_int("indicators", "rsi_period", 10), 10);
        assert_eq!(adapter.get_int("indicators", "atr_period", 14), 14);
        assert_eq!(adapter.get_double("sizing", "leverage", 3.0), 3.0);
        assert_eq!(adapter.get_double("sizing", "target_volatility", 0.12), 0.12);
    }


    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config("[backtest]\ndata_dir = /var/bars\n");
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(
            adapter.get_string("backtest", "data_dir"),
            Some("/var/bars".to_string())
        );
    }

    #[test]
    fn from_file_missing_is_parse_error() {
        let err = FileConfigAdapter::from_file("/nonexistent/path/config.ini").unwrap_err();
        assert!(
            matches!(err, VolshieldError::ConfigParse { ref file, .. } if file.contains("config.ini"))
        );
    }
}
