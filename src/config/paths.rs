use std::{
    env, fs,
    io::{Error, ErrorKind},
    path::PathBuf,
};

const APP_DIR: &str = "native-video-bridge";

/// Locates configuration and log files following the XDG Base Directory layout.
pub struct ConfigPaths;

impl ConfigPaths {
    /// Configuration directory: `$XDG_CONFIG_HOME/native-video-bridge`,
    /// falling back to `$HOME/.config/native-video-bridge`.
    ///
    /// # Errors
    /// Returns an error if neither `XDG_CONFIG_HOME` nor `HOME` is set
    pub fn config_dir() -> Result<PathBuf, Error> {
        Self::xdg_base("XDG_CONFIG_HOME", ".config").map(|base| base.join(APP_DIR))
    }

    /// Path of the main configuration file.
    ///
    /// # Errors
    /// Returns an error if the configuration directory cannot be determined
    pub fn main_config() -> Result<PathBuf, Error> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Log directory under `$XDG_STATE_HOME` (or `$HOME/.local/state`).
    ///
    /// Creates the directory if it doesn't exist.
    ///
    /// # Errors
    /// Returns an error if no base directory is set or it cannot be created
    pub fn log_dir() -> Result<PathBuf, Error> {
        let log_dir = Self::xdg_base("XDG_STATE_HOME", ".local/state")?
            .join(APP_DIR)
            .join("logs");

        if !log_dir.exists() {
            fs::create_dir_all(&log_dir)?;
        }

        Ok(log_dir)
    }

    fn xdg_base(var: &str, home_fallback: &str) -> Result<PathBuf, Error> {
        env::var(var)
            .ok()
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from)
            .or_else(|| {
                env::var("HOME")
                    .ok()
                    .map(|home| PathBuf::from(home).join(home_fallback))
            })
            .ok_or_else(|| {
                Error::new(
                    ErrorKind::NotFound,
                    format!("Neither {var} nor HOME environment variable found"),
                )
            })
    }
}
