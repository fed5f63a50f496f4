use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration from TOML text
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash over the settings that shape the census
///
/// Logged at start-up and recorded with every block so ledger rows can be
/// matched to the configuration that produced them. Only the label space,
/// the resolvers, the enabled modes and the word list take part: comments,
/// formatting, timeouts, storage paths and the API key do not move the hash.
///
/// # Arguments
///
/// * `config` - A parsed configuration
///
/// # Returns
///
/// The hex-encoded digest (64 characters).
pub fn config_hash(config: &Config) -> String {
    let mut hasher = Sha256::new();
    let mut field = |name: &str, value: &str| {
        hasher.update(name.as_bytes());
        hasher.update(b"=");
        hasher.update(value.as_bytes());
        hasher.update(b"\n");
    };

    field("charset", &config.enumeration.charset);
    field("max-length", &config.enumeration.max_length.to_string());
    field("tlds", &config.enumeration.tlds.join(","));
    for resolver in &config.resolvers {
        field("resolver", &format!("{} {}", resolver.name, resolver.url));
    }
    field("short-mode", &config.schedule.short_mode.to_string());
    field("word-mode", &config.schedule.word_mode.to_string());
    if let Some(words) = &config.words {
        field("words", &words.path.display().to_string());
        field("words-max-length", &words.max_length.to_string());
    }

    hex::encode(hasher.finalize())
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = config_hash(&config);
    Ok((config, hash))
}
