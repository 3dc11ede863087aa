use std::{fs, io::ErrorKind, path::Path};

use tracing::{debug, instrument};

use super::{Config, ConfigPaths};
use crate::{AppError, Result};

impl Config {
    /// Loads the main configuration file, or defaults when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration directory cannot be determined,
    /// or the file exists but cannot be read or parsed.
    pub fn load() -> Result<Config> {
        let path = ConfigPaths::main_config()?;
        if !path.exists() {
            debug!(path = %path.display(), "No configuration file, using defaults");
            return Ok(Config::default());
        }
        Self::load_from_path(&path)
    }

    /// Loads and validates the configuration at `path`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::IoError` if the file cannot be read,
    /// `AppError::TomlParseError` if it is not a valid configuration, and
    /// `AppError::InvalidConfigField` if a value is out of range.
    #[instrument]
    pub fn load_from_path(path: &Path) -> Result<Config> {
        let content = fs::read_to_string(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => AppError::IoError {
                path: path.to_path_buf(),
                details: "configuration file not found".to_string(),
            },
            _ => AppError::io(e, path),
        })?;

        let config: Config =
            toml::from_str(&content).map_err(|e| AppError::toml_parse(e, Some(path)))?;
        config.validate()?;
        Ok(config)
    }

    /// Parses and validates configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::TomlParseError` for malformed input and
    /// `AppError::InvalidConfigField` for out-of-range values.
    pub fn from_toml_str(content: &str) -> Result<Config> {
        let config: Config = toml::from_str(content).map_err(|e| AppError::toml_parse(e, None))?;
        config.validate()?;
        Ok(config)
    }

    /// Renders the configuration as TOML.
    ///
    /// # Errors
    ///
    /// Returns `AppError::TomlSerialize` if serialization fails.
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    fn validate(&self) -> Result<()> {
        self.bridge.settings().map(|_| ())
    }
}
