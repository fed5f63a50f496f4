//! Configuration module for the collector
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use dom4in_collector::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("collector.toml")).unwrap();
//! println!("Enumerating up to length {}", config.enumeration.max_length);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    BackendConfig, Config, EnumerationConfig, PosPaths, ProbeConfig, ResolverConfig,
    ScheduleConfig, StorageConfig, WordsConfig,
};

pub use validation::MAX_SUPPORTED_LENGTH;

// Re-export parser functions
pub use parser::{config_hash, load_config, load_config_with_hash, parse_config};
