//! # Backoffice Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     KEDAI_DB_PATH=/var/lib/kedai/kedai.db                              │
//! │     KEDAI_MARKUP_GOFOOD=20                                             │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/kedai-pos/kedai.toml (Linux)                             │
//! │     ~/Library/Application Support/id.kedai.pos/kedai.toml (macOS)      │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [store]
//! name = "Kedai Kopi Senja"
//! utc_offset_minutes = 420
//!
//! [database]
//! path = "/var/lib/kedai/kedai.db"
//! max_connections = 5
//!
//! [pricing]
//! price_step = 500
//!
//! [pricing.markups]
//! gofood = 20
//! grabfood = 18.5
//!
//! [checkout]
//! max_attempts = 5
//! require_open_session = true
//!
//! [drafts]
//! ttl_hours = 24
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info, warn};

use kedai_core::validation::validate_markup;
use kedai_core::{
    ChannelMarkups, Percentage, PriceBook, DEFAULT_UTC_OFFSET_MINUTES, DRAFT_TTL_HOURS,
    MAX_CHECKOUT_ATTEMPTS, PRICE_STEP,
};

/// Environment variable prefix for per-platform markups.
const MARKUP_ENV_PREFIX: &str = "KEDAI_MARKUP_";

/// Largest real-world UTC offset (UTC+14).
const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Sections
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub name: String,
    /// Offset of the business day from UTC, in minutes.
    pub utc_offset_minutes: i32,
}

impl Default for StoreSettings {
    fn default() -> Self {
        StoreSettings {
            name: "Kedai".to_string(),
            utc_offset_minutes: DEFAULT_UTC_OFFSET_MINUTES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Database file. Defaults to the platform data directory.
    pub path: Option<PathBuf>,
    pub max_connections: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: None,
            max_connections: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingSettings {
    /// Delivery prices round to the nearest multiple of this.
    pub price_step: i64,
    /// Platform slug → markup percent (e.g. `gofood = 20`).
    pub markups: BTreeMap<String, f64>,
}

impl Default for PricingSettings {
    fn default() -> Self {
        PricingSettings {
            price_step: PRICE_STEP,
            markups: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckoutSettings {
    /// Attempts before a contended checkout gives up.
    pub max_attempts: u32,
    pub require_open_session: bool,
}

impl Default for CheckoutSettings {
    fn default() -> Self {
        CheckoutSettings {
            max_attempts: MAX_CHECKOUT_ATTEMPTS,
            require_open_session: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DraftSettings {
    pub ttl_hours: i64,
}

impl Default for DraftSettings {
    fn default() -> Self {
        DraftSettings {
            ttl_hours: DRAFT_TTL_HOURS,
        }
    }
}

// =============================================================================
// App Config
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub store: StoreSettings,

    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub pricing: PricingSettings,

    #[serde(default)]
    pub checkout: CheckoutSettings,

    #[serde(default)]
    pub drafts: DraftSettings,
}

impl AppConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (kedai.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = Self::from_toml_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(std::env::vars());
        config.validate()?;

        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Applies `KEDAI_*` overrides from key/value pairs.
    ///
    /// Unparseable values are logged and ignored.
    pub fn apply_overrides<I>(&mut self, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            if let Some(slug) = key.strip_prefix(MARKUP_ENV_PREFIX) {
                match value.trim().parse::<f64>() {
                    Ok(pct) => {
                        debug!(platform = %slug, pct, "Overriding markup from environment");
                        self.pricing.markups.insert(slug.to_lowercase(), pct);
                    }
                    Err(_) => warn!(key = %key, value = %value, "Ignoring unparseable markup"),
                }
                continue;
            }

            match key.as_str() {
                "KEDAI_STORE_NAME" => self.store.name = value,
                "KEDAI_UTC_OFFSET_MINUTES" => {
                    parse_into(&key, &value, &mut self.store.utc_offset_minutes)
                }
                "KEDAI_DB_PATH" => {
                    debug!(path = %value, "Overriding database path from environment");
                    self.database.path = Some(PathBuf::from(value));
                }
                "KEDAI_DB_MAX_CONNECTIONS" => {
                    parse_into(&key, &value, &mut self.database.max_connections)
                }
                "KEDAI_PRICE_STEP" => parse_into(&key, &value, &mut self.pricing.price_step),
                "KEDAI_CHECKOUT_MAX_ATTEMPTS" => {
                    parse_into(&key, &value, &mut self.checkout.max_attempts)
                }
                "KEDAI_REQUIRE_OPEN_SESSION" => {
                    parse_into(&key, &value, &mut self.checkout.require_open_session)
                }
                "KEDAI_DRAFT_TTL_HOURS" => parse_into(&key, &value, &mut self.drafts.ttl_hours),
                _ => {}
            }
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.store.name.trim().is_empty() {
            return Err(ConfigError::Invalid("store.name must not be empty".into()));
        }

        if self.store.utc_offset_minutes.abs() > MAX_UTC_OFFSET_MINUTES {
            return Err(ConfigError::Invalid(format!(
                "store.utc_offset_minutes must be within ±{}, got {}",
                MAX_UTC_OFFSET_MINUTES, self.store.utc_offset_minutes
            )));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        if self.pricing.price_step <= 0 {
            return Err(ConfigError::Invalid(
                "pricing.price_step must be greater than 0".into(),
            ));
        }

        for (platform, pct) in &self.pricing.markups {
            if !pct.is_finite() || *pct < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "markup for {} must be a non-negative number",
                    platform
                )));
            }
            validate_markup(Percentage::from_percent(*pct))
                .map_err(|e| ConfigError::Invalid(format!("markup for {}: {}", platform, e)))?;
        }

        if self.checkout.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "checkout.max_attempts must be at least 1".into(),
            ));
        }

        if self.drafts.ttl_hours <= 0 {
            return Err(ConfigError::Invalid(
                "drafts.ttl_hours must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Channel pricing built from the `[pricing]` section.
    pub fn price_book(&self) -> PriceBook {
        let mut markups = ChannelMarkups::new();
        for (platform, pct) in &self.pricing.markups {
            markups.set(platform, Percentage::from_percent(*pct));
        }
        PriceBook::new(markups).with_step(self.pricing.price_step)
    }

    pub fn draft_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.drafts.ttl_hours)
    }

    /// Configured database file, or `kedai.db` in the platform data directory.
    pub fn database_path(&self) -> Option<PathBuf> {
        self.database.path.clone().or_else(|| {
            directories::ProjectDirs::from("id", "kedai", "pos")
                .map(|dirs| dirs.data_dir().join("kedai.db"))
        })
    }

    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("id", "kedai", "pos")
            .map(|dirs| dirs.config_dir().join("kedai.toml"))
    }
}

fn parse_into<T: std::str::FromStr>(key: &str, value: &str, slot: &mut T) {
    match value.trim().parse() {
        Ok(parsed) => *slot = parsed,
        Err(_) => warn!(key = %key, value = %value, "Ignoring unparseable environment override"),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
