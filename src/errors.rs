//! Error types for the tuplaus service
//!
//! Process-level errors (configuration, storage, startup). Settlement and
//! ledger outcomes have their own tagged errors next to the code that
//! produces them.

use std::fmt;

/// Root error type for process-level operations
#[derive(Debug)]
pub enum TuplausError {
    /// Configuration related errors
    Configuration(ConfigurationError),

    /// Storage system errors
    Storage(StorageError),

    /// Server startup and listener errors
    Server(String),
}

/// Configuration and validation errors
#[derive(Debug)]
pub enum ConfigurationError {
    ValidationFailed(String),
    MissingRequired(String),
    InvalidValue { field: String, value: String, reason: String },
    LoadFailed(String),
}

/// Storage system errors
#[derive(Debug)]
pub enum StorageError {
    DatabaseOpenFailed(String),
    ReadFailed(String),
    WriteFailed(String),
    CorruptedData(String),
    PermissionDenied(String),
}

impl fmt::Display for TuplausError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TuplausError::Configuration(e) => write!(f, "Configuration error: {}", e),
            TuplausError::Storage(e) => write!(f, "Storage error: {}", e),
            TuplausError::Server(msg) => write!(f, "Server error: {}", msg),
        }
    }
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigurationError::ValidationFailed(msg) => write!(f, "Validation failed: {}", msg),
            ConfigurationError::MissingRequired(field) => write!(f, "Missing required field: {}", field),
            ConfigurationError::InvalidValue { field, value, reason } => {
                write!(f, "Invalid value for {}: '{}' ({})", field, value, reason)
            }
            ConfigurationError::LoadFailed(msg) => write!(f, "Failed to load configuration: {}", msg),
        }
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::DatabaseOpenFailed(msg) => write!(f, "Database open failed: {}", msg),
            StorageError::ReadFailed(msg) => write!(f, "Read failed: {}", msg),
            StorageError::WriteFailed(msg) => write!(f, "Write failed: {}", msg),
            StorageError::CorruptedData(msg) => write!(f, "Corrupted data: {}", msg),
            StorageError::PermissionDenied(path) => write!(f, "Permission denied: {}", path),
        }
    }
}

impl std::error::Error for TuplausError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TuplausError::Configuration(e) => Some(e),
            TuplausError::Storage(e) => Some(e),
            TuplausError::Server(_) => None,
        }
    }
}

impl std::error::Error for ConfigurationError {}
impl std::error::Error for StorageError {}

impl From<ConfigurationError> for TuplausError {
    fn from(e: ConfigurationError) -> Self {
        TuplausError::Configuration(e)
    }
}

impl From<StorageError> for TuplausError {
    fn from(e: StorageError) -> Self {
        TuplausError::Storage(e)
    }
}

// External error conversions
impl From<rocksdb::Error> for TuplausError {
    fn from(e: rocksdb::Error) -> Self {
        TuplausError::Storage(StorageError::WriteFailed(e.to_string()))
    }
}

impl From<std::io::Error> for TuplausError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::PermissionDenied => {
                TuplausError::Storage(StorageError::PermissionDenied(e.to_string()))
            }
            std::io::ErrorKind::AddrInUse | std::io::ErrorKind::AddrNotAvailable => {
                TuplausError::Server(e.to_string())
            }
            _ => TuplausError::Storage(StorageError::ReadFailed(e.to_string())),
        }
    }
}

impl From<serde_json::Error> for TuplausError {
    fn from(e: serde_json::Error) -> Self {
        TuplausError::Storage(StorageError::CorruptedData(e.to_string()))
    }
}

impl From<toml::de::Error> for TuplausError {
    fn from(e: toml::de::Error) -> Self {
        TuplausError::Configuration(ConfigurationError::LoadFailed(e.to_string()))
    }
}

// Convenience type alias for Results
pub type TuplausResult<T> = Result<T, TuplausError>;
