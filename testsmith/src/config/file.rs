//! Config file loading.

use super::parser::parse_ini;
use super::settings::Config;
use ini::Ini;
use std::path::Path;
use thiserror::Error;

/// Errors loading or validating a config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read or is not valid INI.
    #[error("failed to read config file: {0}")]
    Read(#[from] ini::Error),

    /// A key has a value that does not parse or is out of range.
    #[error("invalid value for [{section}] {key} = '{value}': {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },
}

/// Loads configuration from an INI file, overlaying defaults.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let ini = Ini::load_from_file(path)?;
    parse_ini(&ini)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[intake]\nmin_body_len = 75").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.intake.min_body_len, 75);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = load_config("/nonexistent/testsmith.ini");
        assert!(matches!(result, Err(ConfigError::Read(_))));
    }
}
