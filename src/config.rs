mod settings;
pub mod types;

use std::fs;
use std::path::{Path, PathBuf};

pub use settings::{GenerationSettings, Setting, SettingsError};
pub use types::{Config, CorrelationConfig, ReconnectConfig, ServerConfig, TimingConfig};

const CONFIG_DIR: &str = "writeup";
const CONFIG_FILE: &str = "config.toml";

/// Result of loading configuration
///
/// A broken file never stops the program: defaults are used and the reason
/// is handed back so the caller can report it.
#[derive(Debug)]
pub struct ConfigResult {
    pub config: Config,
    pub warning: Option<String>,
}

pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|p| p.join(".config").join(CONFIG_DIR).join(CONFIG_FILE))
}

/// Load the config from the default location
pub fn load_config() -> ConfigResult {
    match config_path() {
        Some(path) => load_config_from_path(&path),
        None => ConfigResult {
            config: Config::default(),
            warning: None,
        },
    }
}

pub fn load_config_from_path(path: &Path) -> ConfigResult {
    let contents = match fs::read_to_string(path) {
        Ok(c) => c,
        // Missing file is the normal case
        Err(_) => {
            return ConfigResult {
                config: Config::default(),
                warning: None,
            };
        }
    };

    match toml::from_str::<Config>(&contents) {
        Ok(config) => ConfigResult {
            config,
            warning: None,
        },
        Err(e) => ConfigResult {
            config: Config::default(),
            warning: Some(format!(
                "Invalid config at {}, using defaults: {}",
                path.display(),
                e.message()
            )),
        },
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
