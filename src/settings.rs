use std::time::Duration;

use config::Config;
use serde::Deserialize;
use tracing::warn;

use crate::parser::absolutize;

/// Runtime knobs, overridable through `LUMA_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub base_url: String,
    pub nav_timeout_ms: u64,
    pub settle_ms: u64,
    pub scroll_pause_ms: u64,
    pub scroll_count: usize,
    pub discover_scroll_count: usize,
    pub discover_cap: usize,
    pub fallback_year: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: "https://lu.ma".to_string(),
            nav_timeout_ms: 30_000,
            settle_ms: 2_000,
            scroll_pause_ms: 1_000,
            scroll_count: 5,
            discover_scroll_count: 3,
            discover_cap: 5,
            fallback_year: 2025,
        }
    }
}

impl Settings {
    pub fn load() -> Self {
        let loaded = Config::builder()
            .add_source(config::Environment::with_prefix("LUMA").try_parsing(true))
            .build()
            .and_then(|c| c.try_deserialize::<Settings>());

        match loaded {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Ignoring invalid LUMA_* settings: {}", e);
                Settings::default()
            }
        }
    }

    pub fn nav_timeout(&self) -> Duration {
        Duration::from_millis(self.nav_timeout_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn scroll_pause(&self) -> Duration {
        Duration::from_millis(self.scroll_pause_ms)
    }

    /// Full URL of a site-relative page.
    pub fn page_url(&self, path: &str) -> String {
        absolutize(&self.base_url, path)
    }
}
