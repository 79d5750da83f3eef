// =============================================================================
// Engine configuration
// =============================================================================
//
// Loaded from an optional JSON file on disk, falling back to built-in
// defaults when the file is missing or fails to parse. Every field carries
// a `#[serde(default = "...")]` so older config files on disk never fail to
// deserialize after a field is added.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

fn default_tick_interval_ms() -> u64 {
    500
}

fn default_broadcast_every_n_ticks() -> u64 {
    2
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_history_length() -> usize {
    60
}

fn default_trading_window_ticks() -> u64 {
    12
}

fn default_close_window_ticks() -> u64 {
    8
}

fn default_max_active_stocks() -> usize {
    110
}

fn default_performance_tracker_len() -> usize {
    1460
}

fn default_ticks_per_cycle() -> u64 {
    7300
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    #[serde(default = "default_broadcast_every_n_ticks")]
    pub broadcast_every_n_ticks: u64,

    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default = "default_history_length")]
    pub history_length: usize,

    #[serde(default = "default_trading_window_ticks")]
    pub trading_window_ticks: u64,

    #[serde(default = "default_close_window_ticks")]
    pub close_window_ticks: u64,

    #[serde(default = "default_max_active_stocks")]
    pub max_active_stocks: usize,

    #[serde(default = "default_performance_tracker_len")]
    pub performance_tracker_len: usize,

    #[serde(default = "default_ticks_per_cycle")]
    pub ticks_per_cycle: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            broadcast_every_n_ticks: default_broadcast_every_n_ticks(),
            bind_addr: default_bind_addr(),
            history_length: default_history_length(),
            trading_window_ticks: default_trading_window_ticks(),
            close_window_ticks: default_close_window_ticks(),
            max_active_stocks: default_max_active_stocks(),
            performance_tracker_len: default_performance_tracker_len(),
            ticks_per_cycle: default_ticks_per_cycle(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from `path`, falling back to defaults (with a
    /// warning) if the file is missing or malformed. The `MARKETSIM_FAST_TICKS`
    /// environment variable, when set, overrides `tick_interval_ms` for local
    /// development and fast test runs.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let mut config = match std::fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str::<Self>(&raw) {
                Ok(config) => config,
                Err(err) => {
                    warn!(?err, path = %path.display(), "failed to parse engine config, using defaults");
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        };

        if let Ok(fast) = std::env::var("MARKETSIM_FAST_TICKS") {
            if let Ok(ms) = fast.parse::<u64>() {
                config.tick_interval_ms = ms;
            }
        }

        config
    }

    /// Persist configuration to `path` atomically: write to a temp file in
    /// the same directory, then rename over the destination.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let tmp_path = path.with_extension("tmp");

        let serialized =
            serde_json::to_string_pretty(self).context("serializing engine config")?;
        std::fs::write(&tmp_path, serialized)
            .with_context(|| format!("writing temp config to {}", tmp_path.display()))?;
        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("renaming temp config into {}", path.display()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_contract_constants() {
        let config = EngineConfig::default();
        assert_eq!(config.tick_interval_ms, 500);
        assert_eq!(config.history_length, 60);
        assert_eq!(config.trading_window_ticks, 12);
        assert_eq!(config.close_window_ticks, 8);
        assert_eq!(config.max_active_stocks, 110);
        assert_eq!(config.ticks_per_cycle, 7300);
    }

    #[test]
    fn deserializes_empty_json_to_defaults() {
        let config: EngineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.tick_interval_ms, 500);
    }

    #[test]
    fn deserializes_partial_json() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"tick_interval_ms": 250}"#).unwrap();
        assert_eq!(config.tick_interval_ms, 250);
        assert_eq!(config.broadcast_every_n_ticks, 2);
    }

    #[test]
    fn load_falls_back_to_defaults_on_missing_file() {
        let config = EngineConfig::load("/nonexistent/path/does/not/exist.json");
        assert_eq!(config.tick_interval_ms, 500);
    }

    #[test]
    fn save_then_load_roundtrips() {
        let dir = std::env::temp_dir().join(format!(
            "marketsim_config_test_{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");

        let mut config = EngineConfig::default();
        config.tick_interval_ms = 750;
        config.save(&path).unwrap();

        let loaded = EngineConfig::load(&path);
        assert_eq!(loaded.tick_interval_ms, 750);

        std::fs::remove_dir_all(&dir).ok();
    }
}
