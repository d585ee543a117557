//! Generation parameters sent with every request
//!
//! Adjustable while a session runs; each accepted change is followed by an
//! immediate re-send so the writer sees its effect.

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SettingsError {
    #[error("temperature must be a finite number >= 0, got {0}")]
    Temperature(f64),

    #[error("{name} must be at least 1")]
    Zero { name: &'static str },

    #[error("unknown setting `{0}`")]
    Unknown(String),

    #[error("invalid value `{value}` for {name}")]
    Value { name: String, value: String },
}

/// One runtime settings change
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Setting {
    Temperature(f64),
    TopK(u32),
    Length(u32),
    BatchSize(u32),
}

impl Setting {
    /// Parse a `name value` pair as typed by the user
    pub fn parse(name: &str, value: &str) -> Result<Self, SettingsError> {
        let invalid = || SettingsError::Value {
            name: name.to_string(),
            value: value.to_string(),
        };

        match name {
            "temperature" => value
                .parse()
                .map(Setting::Temperature)
                .map_err(|_| invalid()),
            "top_k" => value.parse().map(Setting::TopK).map_err(|_| invalid()),
            "length" => value.parse().map(Setting::Length).map_err(|_| invalid()),
            "batch_size" => value
                .parse()
                .map(Setting::BatchSize)
                .map_err(|_| invalid()),
            _ => Err(SettingsError::Unknown(name.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// Sampling randomness
    pub temperature: f64,
    /// Width of the candidate token pool
    pub top_k: u32,
    /// Maximum tokens per candidate
    pub length: u32,
    /// Number of candidates requested
    pub batch_size: u32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_k: 10,
            length: 40,
            batch_size: 4,
        }
    }
}

impl GenerationSettings {
    /// Validate and apply a change; the settings are untouched on error
    pub fn apply(&mut self, setting: Setting) -> Result<(), SettingsError> {
        match setting {
            Setting::Temperature(t) => {
                if !t.is_finite() || t < 0.0 {
                    return Err(SettingsError::Temperature(t));
                }
                self.temperature = t;
            }
            Setting::TopK(k) => self.top_k = non_zero("top_k", k)?,
            Setting::Length(n) => self.length = non_zero("length", n)?,
            Setting::BatchSize(n) => self.batch_size = non_zero("batch_size", n)?,
        }
        Ok(())
    }
}

fn non_zero(name: &'static str, value: u32) -> Result<u32, SettingsError> {
    if value == 0 {
        return Err(SettingsError::Zero { name });
    }
    Ok(value)
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod settings_tests;
