//! # Back-Office Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     AQUAROUTE_PORT=8080                                                │
//! │     AQUAROUTE_DB_PATH=/srv/aquaroute/aquaroute.db                      │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/aquaroute/aquaroute.toml (Linux)                         │
//! │     AQUAROUTE_CONFIG=/etc/aquaroute.toml to point elsewhere            │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     127.0.0.1:8080, ./aquaroute.db, CLP, IVA 19%                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [server]
//! bind_address = "0.0.0.0"
//! port = 8080
//! session_idle_minutes = 240
//!
//! [database]
//! path = "/srv/aquaroute/aquaroute.db"
//! max_connections = 5
//!
//! [business]
//! name = "Agua Pura Maipú"
//! currency_code = "CLP"
//! currency_symbol = "$"
//! currency_decimals = 0
//! tax_rate_bps = 1900
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info, warn};

use aquaroute_core::TaxRate;
use aquaroute_db::DbConfig;

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

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    /// Cart sessions untouched this long are discarded.
    pub session_idle_minutes: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_address: "127.0.0.1".to_string(),
            port: 8080,
            session_idle_minutes: 240,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            path: PathBuf::from("aquaroute.db"),
            max_connections: 5,
        }
    }
}

/// Company settings shown on documents and used for tax.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BusinessConfig {
    pub name: String,
    /// ISO 4217.
    pub currency_code: String,
    pub currency_symbol: String,
    pub currency_decimals: u32,
    /// 1900 = 19%.
    pub tax_rate_bps: u32,
}

impl Default for BusinessConfig {
    fn default() -> Self {
        BusinessConfig {
            name: "AquaRoute".to_string(),
            currency_code: "CLP".to_string(),
            currency_symbol: "$".to_string(),
            currency_decimals: 0,
            tax_rate_bps: TaxRate::IVA.bps(),
        }
    }
}

/// Everything the service reads at startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub business: BusinessConfig,
}

impl AppConfig {
    /// Loads defaults, then the file (if present), then environment
    /// overrides, then validates.
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        let path = config_path
            .or_else(|| std::env::var("AQUAROUTE_CONFIG").ok().map(PathBuf::from))
            .or_else(Self::default_config_path);

        if let Some(path) = path {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("server.port must not be 0".into()));
        }

        if self.server.session_idle_minutes <= 0 {
            return Err(ConfigError::Invalid(
                "server.session_idle_minutes must be greater than 0".into(),
            ));
        }

        if self.database.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("database.path must not be empty".into()));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        aquaroute_core::validation::validate_tax_rate_bps(self.business.tax_rate_bps)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(addr) = std::env::var("AQUAROUTE_BIND_ADDRESS") {
            self.server.bind_address = addr;
        }

        if let Ok(port) = std::env::var("AQUAROUTE_PORT") {
            match port.parse::<u16>() {
                Ok(p) => {
                    debug!(port = p, "Overriding port from environment");
                    self.server.port = p;
                }
                Err(_) => warn!(port = %port, "Ignoring invalid AQUAROUTE_PORT"),
            }
        }

        if let Ok(minutes) = std::env::var("AQUAROUTE_SESSION_IDLE_MINUTES") {
            match minutes.parse::<i64>() {
                Ok(m) => self.server.session_idle_minutes = m,
                Err(_) => warn!(value = %minutes, "Ignoring invalid AQUAROUTE_SESSION_IDLE_MINUTES"),
            }
        }

        if let Ok(path) = std::env::var("AQUAROUTE_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Ok(max) = std::env::var("AQUAROUTE_DB_MAX_CONNECTIONS") {
            if let Ok(m) = max.parse::<u32>() {
                self.database.max_connections = m;
            }
        }

        if let Ok(name) = std::env::var("AQUAROUTE_BUSINESS_NAME") {
            self.business.name = name;
        }

        if let Ok(bps) = std::env::var("AQUAROUTE_TAX_RATE_BPS") {
            match bps.parse::<u32>() {
                Ok(b) => self.business.tax_rate_bps = b,
                Err(_) => warn!(value = %bps, "Ignoring invalid AQUAROUTE_TAX_RATE_BPS"),
            }
        }
    }

    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("cl", "aquaroute", "aquaroute")
            .map(|dirs| dirs.config_dir().join("aquaroute.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.bind_address, self.server.port)
    }

    pub fn session_idle(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.server.session_idle_minutes)
    }

    pub fn tax_rate(&self) -> TaxRate {
        TaxRate::from_bps(self.business.tax_rate_bps)
    }

    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database.path).max_connections(self.database.max_connections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.tax_rate(), TaxRate::IVA);
        assert_eq!(config.bind_address(), "127.0.0.1:8080");
    }

    #[test]
    fn test_validation() {
        let mut config = AppConfig::default();
        config.business.tax_rate_bps = 10_001;
        assert!(config.validate().is_err());

        config.business.tax_rate_bps = 1900;
        config.server.port = 0;
        assert!(config.validate().is_err());

        config.server.port = 8080;
        config.server.session_idle_minutes = 0;
        assert!(config.validate().is_err());

        config.server.session_idle_minutes = 30;
        config.database.path = PathBuf::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [server]
            port = 9000

            [business]
            name = "Agua Pura"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.bind_address, "127.0.0.1");
        assert_eq!(config.business.name, "Agua Pura");
        assert_eq!(config.business.tax_rate_bps, 1900);
        assert_eq!(config.database.max_connections, 5);
    }

    #[test]
    fn test_toml_serialization() {
        let toml_str = toml::to_string_pretty(&AppConfig::default()).unwrap();
        assert!(toml_str.contains("[server]"));
        assert!(toml_str.contains("[database]"));
        assert!(toml_str.contains("[business]"));
    }
}
