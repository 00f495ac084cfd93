//! Configuration management with validation and defaults
//!
//! Configuration is layered: built-in defaults, then an optional TOML file,
//! then `TUPLAUS_*` environment variables. The binary applies CLI flags last.

use crate::errors::{ConfigurationError, TuplausResult};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::{env, path::Path, time::Duration};

/// Top-level service configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TuplausConfig {
    pub api: ApiConfig,
    pub storage: StorageConfig,
    pub game: GameConfig,
    pub monitoring: MonitoringConfig,
}

/// HTTP gateway configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub request_timeout_secs: u64,
    /// Exposes the add-player / dump / delete-everything routes
    pub enable_debug_routes: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 7777,
            allowed_origins: vec!["*".to_string()],
            request_timeout_secs: 30,
            enable_debug_routes: false,
        }
    }
}

/// Ledger storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_directory: String,
    /// Keep the ledger in process memory instead of RocksDB
    pub in_memory: bool,
    pub write_buffer_size_mb: usize,
    pub max_write_buffer_number: usize,
    pub compression_type: CompressionType,
    /// Whether to clear database on startup (testing only!)
    pub clear_on_start: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum CompressionType {
    None,
    Snappy,
    Lz4,
    Zstd,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_directory: "./DB/tuplaus_ledger".to_string(),
            in_memory: false,
            write_buffer_size_mb: 64,
            max_write_buffer_number: 4,
            compression_type: CompressionType::Lz4,
            clear_on_start: false,
        }
    }
}

/// Settlement rules and limits
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Upper bound for a single bet; `None` means only the balance limits it
    pub max_bet: Option<Decimal>,
    /// Deadline for a single ledger call before it counts as a persistence failure
    pub persistence_timeout_ms: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            max_bet: None,
            persistence_timeout_ms: 5_000,
        }
    }
}

/// Logging and metrics configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub enable_metrics: bool,
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            enable_metrics: true,
            log_filter: "tuplaus=info,tower_http=info".to_string(),
        }
    }
}

impl TuplausConfig {
    /// Local development: in-memory ledger with debug routes enabled
    pub fn development() -> Self {
        Self {
            api: ApiConfig {
                enable_debug_routes: true,
                ..Default::default()
            },
            storage: StorageConfig {
                in_memory: true,
                ..Default::default()
            },
            monitoring: MonitoringConfig {
                log_filter: "tuplaus=debug,tower_http=debug".to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Production deployment with a persistent ledger
    pub fn production() -> Self {
        Self {
            storage: StorageConfig {
                write_buffer_size_mb: 128,
                clear_on_start: false,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Load defaults, an optional TOML file and environment overrides, then validate
    pub fn load(path: Option<&Path>) -> TuplausResult<Self> {
        let mut config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::default(),
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    fn load_from_file(path: &Path) -> TuplausResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConfigurationError::LoadFailed(format!("Failed to read {}: {}", path.display(), e))
        })?;

        toml::from_str(&content)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to parse TOML: {}", e)).into())
    }

    fn apply_env_overrides(&mut self) -> TuplausResult<()> {
        if let Ok(host) = env::var("TUPLAUS_API_HOST") {
            self.api.host = host;
        }
        if let Ok(port) = env::var("TUPLAUS_API_PORT") {
            self.api.port = port.parse().map_err(|_| ConfigurationError::InvalidValue {
                field: "TUPLAUS_API_PORT".to_string(),
                value: port,
                reason: "Invalid port number".to_string(),
            })?;
        }
        if let Ok(enabled) = env::var("TUPLAUS_DEBUG_ROUTES") {
            self.api.enable_debug_routes = enabled.parse().map_err(|_| ConfigurationError::InvalidValue {
                field: "TUPLAUS_DEBUG_ROUTES".to_string(),
                value: enabled,
                reason: "Invalid boolean value".to_string(),
            })?;
        }
        if let Ok(data_dir) = env::var("TUPLAUS_DATA_DIR") {
            self.storage.data_directory = data_dir;
        }
        if let Ok(timeout) = env::var("TUPLAUS_PERSISTENCE_TIMEOUT_MS") {
            self.game.persistence_timeout_ms = timeout.parse().map_err(|_| ConfigurationError::InvalidValue {
                field: "TUPLAUS_PERSISTENCE_TIMEOUT_MS".to_string(),
                value: timeout,
                reason: "Invalid timeout value".to_string(),
            })?;
        }

        Ok(())
    }

    /// Validate configuration for logical consistency
    pub fn validate(&self) -> TuplausResult<()> {
        if self.api.port == 0 {
            return Err(ConfigurationError::InvalidValue {
                field: "api.port".to_string(),
                value: "0".to_string(),
                reason: "Port cannot be zero".to_string(),
            }
            .into());
        }

        if self.api.request_timeout_secs == 0 {
            return Err(ConfigurationError::InvalidValue {
                field: "api.request_timeout_secs".to_string(),
                value: "0".to_string(),
                reason: "Request timeout must be > 0".to_string(),
            }
            .into());
        }

        if !self.storage.in_memory && self.storage.data_directory.is_empty() {
            return Err(ConfigurationError::MissingRequired("storage.data_directory".to_string()).into());
        }

        if self.game.persistence_timeout_ms == 0 {
            return Err(ConfigurationError::InvalidValue {
                field: "game.persistence_timeout_ms".to_string(),
                value: "0".to_string(),
                reason: "Persistence timeout must be > 0".to_string(),
            }
            .into());
        }

        if let Some(max_bet) = self.game.max_bet {
            if max_bet <= Decimal::ZERO {
                return Err(ConfigurationError::InvalidValue {
                    field: "game.max_bet".to_string(),
                    value: max_bet.to_string(),
                    reason: "Maximum bet must be positive".to_string(),
                }
                .into());
            }
        }

        Ok(())
    }

    pub fn persistence_timeout(&self) -> Duration {
        Duration::from_millis(self.game.persistence_timeout_ms)
    }
}
