use crate::config::types::{
    BackendConfig, Config, EnumerationConfig, ProbeConfig, ResolverConfig, ScheduleConfig,
};
use crate::label::space_size;
use crate::ConfigError;
use url::Url;

/// Longest label length the collector will enumerate
pub const MAX_SUPPORTED_LENGTH: u32 = 12;

/// Most probes allowed in flight at once
pub const MAX_WORKERS: usize = 1024;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_enumeration_config(&config.enumeration)?;
    validate_resolvers(&config.resolvers)?;
    validate_probe_config(&config.probe)?;
    validate_schedule_config(&config.schedule, config)?;
    validate_backend_config(&config.backend)?;
    Ok(())
}

/// Validates the label space: charset, max length, and TLD list
fn validate_enumeration_config(config: &EnumerationConfig) -> Result<(), ConfigError> {
    let mut seen = Vec::new();
    for c in config.charset.chars() {
        if seen.contains(&c) {
            return Err(ConfigError::Validation(format!(
                "charset contains duplicate symbol '{}'",
                c
            )));
        }
        if !(c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-') {
            return Err(ConfigError::Validation(format!(
                "charset symbol '{}' is not valid in a domain label",
                c
            )));
        }
        seen.push(c);
    }
    if seen.is_empty() {
        return Err(ConfigError::Validation("charset cannot be empty".to_string()));
    }

    if config.max_length < 1 || config.max_length > MAX_SUPPORTED_LENGTH {
        return Err(ConfigError::Validation(format!(
            "max-length must be between 1 and {}, got {}",
            MAX_SUPPORTED_LENGTH, config.max_length
        )));
    }

    if space_size(seen.len(), config.max_length).is_none() {
        return Err(ConfigError::Validation(format!(
            "{} symbols at length {} overflow a 64-bit index",
            seen.len(),
            config.max_length
        )));
    }

    if config.tlds.is_empty() {
        return Err(ConfigError::Validation("tlds cannot be empty".to_string()));
    }

    for tld in &config.tlds {
        validate_tld(tld)?;
    }

    Ok(())
}

/// Validates a single TLD (no leading dot, lowercase)
fn validate_tld(tld: &str) -> Result<(), ConfigError> {
    if tld.is_empty() {
        return Err(ConfigError::Validation("TLD cannot be empty".to_string()));
    }

    if !tld
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "TLD '{}' must be lowercase letters, digits, or hyphens without a leading dot",
            tld
        )));
    }

    if tld.starts_with('-') || tld.ends_with('-') {
        return Err(ConfigError::Validation(format!(
            "TLD '{}' cannot start or end with '-'",
            tld
        )));
    }

    Ok(())
}

/// Validates the resolver list
fn validate_resolvers(resolvers: &[ResolverConfig]) -> Result<(), ConfigError> {
    if resolvers.is_empty() {
        return Err(ConfigError::Validation(
            "at least one [[resolver]] must be configured".to_string(),
        ));
    }

    for resolver in resolvers {
        if resolver.name.is_empty() {
            return Err(ConfigError::Validation(
                "resolver name cannot be empty".to_string(),
            ));
        }
        validate_http_url(&resolver.url, &format!("resolver '{}'", resolver.name))?;
    }

    Ok(())
}

/// Validates prober settings
fn validate_probe_config(config: &ProbeConfig) -> Result<(), ConfigError> {
    if config.workers > MAX_WORKERS {
        return Err(ConfigError::Validation(format!(
            "workers must be at most {}, got {}",
            MAX_WORKERS, config.workers
        )));
    }

    if config.dns_timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "dns-timeout-ms must be > 0".to_string(),
        ));
    }

    if config.http_timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "http-timeout-ms must be > 0".to_string(),
        ));
    }

    if config.site_scheme != "https" && config.site_scheme != "http" {
        return Err(ConfigError::Validation(format!(
            "site-scheme must be 'http' or 'https', got '{}'",
            config.site_scheme
        )));
    }

    if config.user_agent.is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates the batch-mode flags against the rest of the config
fn validate_schedule_config(schedule: &ScheduleConfig, config: &Config) -> Result<(), ConfigError> {
    if !schedule.short_mode && !schedule.word_mode {
        return Err(ConfigError::Validation(
            "at least one of short-mode or word-mode must be enabled".to_string(),
        ));
    }

    if schedule.word_mode && config.words.is_none() {
        return Err(ConfigError::Validation(
            "word-mode requires a [words] section".to_string(),
        ));
    }

    if let Some(words) = &config.words {
        if words.max_length < 1 {
            return Err(ConfigError::Validation(
                "words max-length must be >= 1".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates backend credentials
fn validate_backend_config(config: &BackendConfig) -> Result<(), ConfigError> {
    validate_http_url(&config.base_url, "backend base-url")?;

    if config.api_key.trim().is_empty() {
        return Err(ConfigError::Validation(
            "backend api-key cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates that a URL parses and uses an HTTP(S) scheme
fn validate_http_url(raw: &str, what: &str) -> Result<(), ConfigError> {
    let url = Url::parse(raw)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid URL for {}: {}", what, e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::InvalidUrl(format!(
            "URL for {} must use http or https, got '{}'",
            what, raw
        )));
    }

    Ok(())
}
