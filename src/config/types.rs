// Configuration type definitions

use std::time::Duration;

use serde::Deserialize;

use super::settings::GenerationSettings;

pub const DEFAULT_ENDPOINT: &str = "wss://open.senrigan.io/ws/async/writeup/gpt2_medium/session/";

/// Where the generation service lives
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Base URL; the per-session identifier is appended to it
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            endpoint: default_endpoint(),
        }
    }
}

/// Send timing and prompt shaping
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub poll_interval_ms: u64,
    pub min_send_interval_ms: u64,
    pub prompt_window_chars: usize,
    pub tail_compare_chars: usize,
}

impl Default for TimingConfig {
    fn default() -> Self {
        TimingConfig {
            poll_interval_ms: 1500,
            min_send_interval_ms: 1000,
            prompt_window_chars: 1500,
            tail_compare_chars: 10,
        }
    }
}

impl TimingConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn min_send_interval(&self) -> Duration {
        Duration::from_millis(self.min_send_interval_ms)
    }
}

/// Reconnect backoff
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Fraction of each delay that may be shaved off at random, 0.0 to 1.0
    pub jitter: f64,
    /// Consecutive failures before connectivity is reported as degraded
    pub max_retries: u32,
    /// How long a connection must stay up (or deliver a frame) before it
    /// no longer counts as a failed attempt
    pub stable_after_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        ReconnectConfig {
            initial_delay_ms: 500,
            max_delay_ms: 30_000,
            jitter: 0.5,
            max_retries: 8,
            stable_after_ms: 5_000,
        }
    }
}

/// Response correlation
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CorrelationConfig {
    /// Tag outbound frames with a `seq` number
    pub sequence_tags: bool,
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub generation: GenerationSettings,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub reconnect: ReconnectConfig,
    #[serde(default)]
    pub correlation: CorrelationConfig,
}
