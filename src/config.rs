// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Application configuration management.
//!
//! Configuration is stored as TOML via `confy`. Missing keys fall back to
//! their defaults, so older files keep loading as new settings are added.

use std::path::PathBuf;
use std::time::Duration;

use opensky_client::{Coordinate, DEFAULT_FEED_URL};
use serde::{Deserialize, Serialize};

const APP_NAME: &str = "flightwatch";
const CONFIG_NAME: &str = "config";

/// Environment variable that overrides the configured flight API key
pub const API_KEY_ENV: &str = "FLIGHTWATCH_API_KEY";

/// Application configuration stored in TOML format
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AppConfig {
    /// Configuration schema version for migrations
    #[serde(default = "default_config_version")]
    pub config_version: u32,

    /// State-vector feed endpoint
    #[serde(default = "default_feed_url")]
    pub feed_url: String,

    /// Seconds between polls
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Quiet period before a viewport change is applied
    #[serde(default = "default_viewport_debounce_ms")]
    pub viewport_debounce_ms: u64,

    /// Only show aircraft inside the viewport
    #[serde(default = "default_true")]
    pub viewport_aware: bool,

    #[serde(default = "default_initial_center_lat")]
    pub initial_center_lat: f64,

    #[serde(default)]
    pub initial_center_lon: f64,

    #[serde(default = "default_initial_zoom")]
    pub initial_zoom: u8,

    /// Zoom level used when jumping to a search result
    #[serde(default = "default_search_zoom")]
    pub search_zoom: u8,

    #[serde(default = "default_screen_width_px")]
    pub screen_width_px: u32,

    #[serde(default = "default_screen_height_px")]
    pub screen_height_px: u32,

    /// Flight status API key (optional, env var takes precedence)
    #[serde(default)]
    pub flight_api_key: Option<String>,

    /// Simulated latency of the mock flight status source
    #[serde(default = "default_mock_latency_ms")]
    pub mock_latency_ms: u64,

    /// Override for the recent searches file
    #[serde(default)]
    pub recent_flights_path: Option<PathBuf>,
}

// Default value functions for serde
fn default_config_version() -> u32 {
    1
}

fn default_feed_url() -> String {
    DEFAULT_FEED_URL.to_string()
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_viewport_debounce_ms() -> u64 {
    300
}

fn default_true() -> bool {
    true
}

fn default_initial_center_lat() -> f64 {
    20.0
}

fn default_initial_zoom() -> u8 {
    2
}

fn default_search_zoom() -> u8 {
    8
}

fn default_screen_width_px() -> u32 {
    1280
}

fn default_screen_height_px() -> u32 {
    720
}

fn default_mock_latency_ms() -> u64 {
    1500
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_version: default_config_version(),
            feed_url: default_feed_url(),
            poll_interval_secs: default_poll_interval_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            viewport_debounce_ms: default_viewport_debounce_ms(),
            viewport_aware: true,
            initial_center_lat: default_initial_center_lat(),
            initial_center_lon: 0.0,
            initial_zoom: default_initial_zoom(),
            search_zoom: default_search_zoom(),
            screen_width_px: default_screen_width_px(),
            screen_height_px: default_screen_height_px(),
            flight_api_key: None,
            mock_latency_ms: default_mock_latency_ms(),
            recent_flights_path: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from disk, creating it with defaults if missing
    pub fn load() -> Result<Self, confy::ConfyError> {
        confy::load(APP_NAME, CONFIG_NAME)
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<(), confy::ConfyError> {
        confy::store(APP_NAME, CONFIG_NAME, self)
    }

    /// Get the config file path for display to user
    pub fn get_config_path() -> Result<PathBuf, confy::ConfyError> {
        confy::get_configuration_file_path(APP_NAME, CONFIG_NAME)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn viewport_debounce(&self) -> Duration {
        Duration::from_millis(self.viewport_debounce_ms)
    }

    pub fn mock_latency(&self) -> Duration {
        Duration::from_millis(self.mock_latency_ms)
    }

    pub fn initial_center(&self) -> Coordinate {
        Coordinate::new(self.initial_center_lat, self.initial_center_lon)
    }

    /// Flight API key, from the environment first, then from config
    pub fn flight_api_key(&self) -> Option<String> {
        resolve_api_key(
            std::env::var(API_KEY_ENV).ok().as_deref(),
            self.flight_api_key.as_deref(),
        )
    }
}

fn resolve_api_key(env_key: Option<&str>, config_key: Option<&str>) -> Option<String> {
    env_key
        .filter(|k| !k.is_empty())
        .or(config_key.filter(|k| !k.is_empty()))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.feed_url, "https://opensky-network.org/api/states/all");
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
        assert_eq!(config.viewport_debounce(), Duration::from_millis(300));
        assert_eq!(config.search_zoom, 8);
        assert!(config.viewport_aware);
    }

    #[test]
    fn test_missing_keys_use_defaults() {
        let config: AppConfig = serde_json::from_value(serde_json::json!({
            "poll_interval_secs": 30,
            "viewport_aware": false,
        }))
        .unwrap();
        assert_eq!(config.poll_interval_secs, 30);
        assert!(!config.viewport_aware);
        assert_eq!(config.request_timeout_secs, 10);
        assert_eq!(config.initial_zoom, 2);
    }

    #[test]
    fn test_env_key_wins() {
        assert_eq!(resolve_api_key(Some("env"), Some("cfg")), Some("env".to_string()));
        assert_eq!(resolve_api_key(Some(""), Some("cfg")), Some("cfg".to_string()));
        assert_eq!(resolve_api_key(None, Some("")), None);
        assert_eq!(resolve_api_key(None, None), None);
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let config = AppConfig {
            poll_interval_secs: 0,
            ..AppConfig::default()
        };
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
    }
}
