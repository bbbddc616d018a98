//! Navigator configuration

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::result::NavkeepResult;

/// Default session storage key
pub const DEFAULT_STORAGE_KEY: &str = "navkeep:session";

/// Navigator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct NavigatorConfig {
    /// Key of the session record
    pub storage_key: String,
    /// Wait before re-querying a newly matched level (ms)
    pub settle_delay_ms: u64,
    /// How long scroll restoration keeps trying (ms)
    pub scroll_restore_timeout_ms: u64,
    /// Upper bound on the loading-guard reset round-trip (ms)
    pub guard_reset_timeout_ms: u64,
    /// Run detection on attribute changes too
    pub observe_attributes: bool,
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            settle_delay_ms: 500,
            scroll_restore_timeout_ms: 5000,
            guard_reset_timeout_ms: 2000,
            observe_attributes: false,
        }
    }
}

impl NavigatorConfig {
    /// Create default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the storage key
    #[must_use]
    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    /// Set the settle delay
    #[must_use]
    pub const fn with_settle_delay_ms(mut self, ms: u64) -> Self {
        self.settle_delay_ms = ms;
        self
    }

    /// Set the scroll restoration timeout
    #[must_use]
    pub const fn with_scroll_restore_timeout_ms(mut self, ms: u64) -> Self {
        self.scroll_restore_timeout_ms = ms;
        self
    }

    /// Set the guard reset timeout
    #[must_use]
    pub const fn with_guard_reset_timeout_ms(mut self, ms: u64) -> Self {
        self.guard_reset_timeout_ms = ms;
        self
    }

    /// Observe attribute mutations
    #[must_use]
    pub const fn with_observe_attributes(mut self, observe: bool) -> Self {
        self.observe_attributes = observe;
        self
    }

    /// Settle delay as a duration
    #[must_use]
    pub const fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Scroll restoration timeout as a duration
    #[must_use]
    pub const fn scroll_restore_timeout(&self) -> Duration {
        Duration::from_millis(self.scroll_restore_timeout_ms)
    }

    /// Guard reset timeout as a duration
    #[must_use]
    pub const fn guard_reset_timeout(&self) -> Duration {
        Duration::from_millis(self.guard_reset_timeout_ms)
    }

    /// Load from a `.json` file, or YAML for any other extension.
    /// Missing fields take their defaults.
    pub fn from_path(path: &Path) -> NavkeepResult<Self> {
        let raw = fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Ok(serde_json::from_str(&raw)?)
        } else {
            Ok(serde_yaml_ng::from_str(&raw)?)
        }
    }
}
