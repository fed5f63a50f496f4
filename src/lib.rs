//! dom4in collector: a resumable census of short domain labels
//!
//! This crate enumerates every label of a bounded length over a charset (and,
//! separately, every dictionary word) under a fixed set of TLDs, probes each
//! candidate's DNS registration and HTTP liveness, and rolls the results into
//! per-block aggregates that are uploaded to the dom4in backend.

pub mod aggregate;
pub mod backend;
pub mod collector;
pub mod config;
pub mod label;
pub mod probe;
pub mod resolver;
pub mod state;
pub mod storage;
pub mod words;

use thiserror::Error;

/// Main error type for collector operations
#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Word source error: {0}")]
    WordSource(#[from] words::WordSourceError),

    #[error("Backend error: {0}")]
    Backend(#[from] backend::BackendError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cursor state does not match configuration: {0}")]
    CursorMismatch(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for collector operations
pub type Result<T> = std::result::Result<T, CollectorError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use aggregate::{BlockAggregate, BlockPayload};
pub use collector::{BlockOutcome, BlockReport, Collector};
pub use config::Config;
pub use label::{decode_label, encode_label, space_size};
pub use probe::{Classification, Prober, ProductState, UsageState};
pub use resolver::ResolverPool;
