//! # Application Configuration
//!
//! Settings for the `parknow` CLI.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     PARKNOW_DB_PATH=./parknow.db                                       │
//! │     PARKNOW_RECEIPT_VISIBILITY=always                                  │
//! │     PARKNOW_UTC_OFFSET_MINUTES=-180                                    │
//! │     PARKNOW_CATALOG_URL=https://parallelum.com.br/fipe/api/v1          │
//! │     PARKNOW_CATALOG_ENABLED=false                                      │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/parknow/parknow.toml (Linux)                             │
//! │     ~/Library/Application Support/com.parknow.parknow/parknow.toml     │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # parknow.toml
//! [database]
//! path = "/var/lib/parknow/parknow.db"
//! max_connections = 5
//!
//! [rental]
//! receipt_visibility = "while_rented"  # while_rented | always
//! countdown_tick_ms = 1000
//! utc_offset_minutes = -180            # Brasília
//!
//! [catalog]
//! enabled = true
//! base_url = "https://parallelum.com.br/fipe/api/v1"
//! timeout_secs = 10
//! ```

use chrono::{FixedOffset, Offset, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use parknow_core::ReceiptVisibility;

/// Earliest and latest UTC offsets in use anywhere, in minutes.
const MIN_UTC_OFFSET_MINUTES: i32 = -12 * 60;
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

    #[error("Could not determine the application data directory")]
    NoDataDir,
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Database Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file. Unset means `parknow.db` in the platform data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: None,
            max_connections: default_max_connections(),
        }
    }
}

// =============================================================================
// Rental Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RentalSettings {
    /// Whether the last receipt stays visible after the rental expires.
    #[serde(default)]
    pub receipt_visibility: ReceiptVisibility,

    /// Countdown refresh period (milliseconds).
    #[serde(default = "default_countdown_tick")]
    pub countdown_tick_ms: u64,

    /// Offset used to format receipt timestamps.
    /// Default: -180 (America/Sao_Paulo, no DST)
    #[serde(default = "default_utc_offset")]
    pub utc_offset_minutes: i32,
}

fn default_countdown_tick() -> u64 {
    1_000
}

fn default_utc_offset() -> i32 {
    -180
}

impl Default for RentalSettings {
    fn default() -> Self {
        RentalSettings {
            receipt_visibility: ReceiptVisibility::default(),
            countdown_tick_ms: default_countdown_tick(),
            utc_offset_minutes: default_utc_offset(),
        }
    }
}

// =============================================================================
// Catalog Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// FIPE API root (the `/carros/...` paths are appended).
    #[serde(default = "default_catalog_url")]
    pub base_url: String,

    #[serde(default = "default_catalog_timeout")]
    pub timeout_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_catalog_url() -> String {
    "https://parallelum.com.br/fipe/api/v1".to_string()
}

fn default_catalog_timeout() -> u64 {
    10
}

impl Default for CatalogSettings {
    fn default() -> Self {
        CatalogSettings {
            enabled: true,
            base_url: default_catalog_url(),
            timeout_secs: default_catalog_timeout(),
        }
    }
}

// =============================================================================
// App Config
// =============================================================================

/// Complete CLI configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub rental: RentalSettings,

    #[serde(default)]
    pub catalog: CatalogSettings,
}

impl AppConfig {
    /// Loads configuration from file and environment.
    ///
    /// ## Loading Order
    /// 1. Start with defaults
    /// 2. Load from `config_path`, or the platform config file, when present
    /// 3. Apply environment variable overrides
    /// 4. Validate
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                config = Self::from_file(&path)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    fn from_file(path: &Path) -> ConfigResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        if self.rental.countdown_tick_ms == 0 {
            return Err(ConfigError::Invalid(
                "rental.countdown_tick_ms must be greater than 0".into(),
            ));
        }

        let offset = self.rental.utc_offset_minutes;
        if !(MIN_UTC_OFFSET_MINUTES..=MAX_UTC_OFFSET_MINUTES).contains(&offset) {
            return Err(ConfigError::Invalid(format!(
                "rental.utc_offset_minutes must be between {} and {}, got {}",
                MIN_UTC_OFFSET_MINUTES, MAX_UTC_OFFSET_MINUTES, offset
            )));
        }

        if self.catalog.enabled {
            let url = &self.catalog.base_url;
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigError::Invalid(format!(
                    "catalog.base_url must start with http:// or https://, got: {}",
                    url
                )));
            }
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies `PARKNOW_*` overrides read through `lookup`.
    ///
    /// Values that fail to parse are logged and ignored.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("PARKNOW_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = Some(PathBuf::from(path));
        }

        if let Some(visibility) = lookup("PARKNOW_RECEIPT_VISIBILITY") {
            match visibility.parse() {
                Ok(parsed) => self.rental.receipt_visibility = parsed,
                Err(e) => warn!(value = %visibility, "Ignoring PARKNOW_RECEIPT_VISIBILITY: {}", e),
            }
        }

        if let Some(offset) = lookup("PARKNOW_UTC_OFFSET_MINUTES") {
            match offset.trim().parse::<i32>() {
                Ok(minutes) => self.rental.utc_offset_minutes = minutes,
                Err(e) => warn!(value = %offset, "Ignoring PARKNOW_UTC_OFFSET_MINUTES: {}", e),
            }
        }

        if let Some(url) = lookup("PARKNOW_CATALOG_URL") {
            debug!(url = %url, "Overriding catalog URL from environment");
            self.catalog.base_url = url;
        }

        if let Some(enabled) = lookup("PARKNOW_CATALOG_ENABLED") {
            match enabled.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.catalog.enabled = true,
                "0" | "false" | "no" | "off" => self.catalog.enabled = false,
                _ => warn!(value = %enabled, "Ignoring PARKNOW_CATALOG_ENABLED"),
            }
        }
    }

    fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("com", "parknow", "parknow")
    }

    fn default_config_path() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().join("parknow.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Resolves the database file, creating the data directory if needed.
    pub fn database_path(&self) -> ConfigResult<PathBuf> {
        if let Some(path) = &self.database.path {
            return Ok(path.clone());
        }

        let dirs = Self::project_dirs().ok_or(ConfigError::NoDataDir)?;
        let data_dir = dirs.data_dir();
        std::fs::create_dir_all(data_dir)?;

        Ok(data_dir.join("parknow.db"))
    }

    /// Offset receipts are formatted in. Falls back to UTC if out of range.
    pub fn display_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.rental.utc_offset_minutes * 60).unwrap_or_else(|| Utc.fix())
    }

    pub fn countdown_tick(&self) -> Duration {
        Duration::from_millis(self.rental.countdown_tick_ms)
    }

    pub fn receipt_visibility(&self) -> ReceiptVisibility {
        self.rental.receipt_visibility
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.receipt_visibility(), ReceiptVisibility::WhileRented);
        assert_eq!(config.countdown_tick(), Duration::from_secs(1));
        assert_eq!(config.display_offset().local_minus_utc(), -3 * 3600);
        assert!(config.catalog.enabled);
        assert_eq!(config.database.max_connections, 5);
    }

    #[test]
    fn test_parse_partial_toml() {
        let config: AppConfig = toml::from_str(
            r#"
            [rental]
            receipt_visibility = "always"

            [catalog]
            enabled = false
            "#,
        )
        .unwrap();

        assert_eq!(config.receipt_visibility(), ReceiptVisibility::Always);
        assert_eq!(config.rental.utc_offset_minutes, -180);
        assert!(!config.catalog.enabled);
        assert_eq!(config.catalog.timeout_secs, 10);
        assert!(config.database.path.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::default();
        config.apply_overrides(lookup(&[
            ("PARKNOW_DB_PATH", "/tmp/parknow-test.db"),
            ("PARKNOW_RECEIPT_VISIBILITY", "always"),
            ("PARKNOW_UTC_OFFSET_MINUTES", "60"),
            ("PARKNOW_CATALOG_URL", "http://localhost:9000"),
            ("PARKNOW_CATALOG_ENABLED", "off"),
        ]));

        assert_eq!(
            config.database.path,
            Some(PathBuf::from("/tmp/parknow-test.db"))
        );
        assert_eq!(config.receipt_visibility(), ReceiptVisibility::Always);
        assert_eq!(config.display_offset().local_minus_utc(), 3600);
        assert_eq!(config.catalog.base_url, "http://localhost:9000");
        assert!(!config.catalog.enabled);
    }

    #[test]
    fn test_invalid_env_values_ignored() {
        let mut config = AppConfig::default();
        config.apply_overrides(lookup(&[
            ("PARKNOW_RECEIPT_VISIBILITY", "sometimes"),
            ("PARKNOW_UTC_OFFSET_MINUTES", "abc"),
            ("PARKNOW_CATALOG_ENABLED", "maybe"),
        ]));

        assert_eq!(config.receipt_visibility(), ReceiptVisibility::WhileRented);
        assert_eq!(config.rental.utc_offset_minutes, -180);
        assert!(config.catalog.enabled);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.rental.utc_offset_minutes = 15 * 60;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = AppConfig::default();
        config.rental.countdown_tick_ms = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.catalog.base_url = "ftp://example.com".to_string();
        assert!(config.validate().is_err());

        config.catalog.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let path = std::env::temp_dir().join("parknow-missing-config-test.toml");
        let config = AppConfig::load(Some(path)).unwrap();
        assert_eq!(config.rental.countdown_tick_ms, 1_000);
    }

    #[test]
    fn test_explicit_database_path() {
        let mut config = AppConfig::default();
        config.database.path = Some(PathBuf::from(":memory:"));
        assert_eq!(config.database_path().unwrap(), PathBuf::from(":memory:"));
    }
}
