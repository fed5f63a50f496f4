use crate::label::Charset;
use crate::ConfigError;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for the collector
///
/// Loaded once at process start and treated as an immutable snapshot for
/// the whole run.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub enumeration: EnumerationConfig,
    #[serde(rename = "resolver", default)]
    pub resolvers: Vec<ResolverConfig>,
    #[serde(default)]
    pub probe: ProbeConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub words: Option<WordsConfig>,
    pub backend: BackendConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Label space configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EnumerationConfig {
    /// TLDs to enumerate under, in iteration order
    pub tlds: Vec<String>,

    /// Ordered label symbols
    #[serde(default = "default_charset")]
    pub charset: String,

    /// Longest label length enumerated in short mode
    #[serde(rename = "max-length", default = "default_max_length")]
    pub max_length: u32,
}

/// One DNS-over-HTTPS resolver
#[derive(Debug, Clone, Deserialize)]
pub struct ResolverConfig {
    /// Resolver name used in logs
    pub name: String,

    /// DoH JSON endpoint (queried with `?name=<domain>&type=A`)
    pub url: String,

    /// Minimum time between queries to this resolver (milliseconds)
    #[serde(rename = "min-delay-ms", default)]
    pub min_delay_ms: Option<u64>,
}

/// Prober behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ProbeConfig {
    /// Concurrent probe workers; 0 probes sequentially
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Pause after each probe in sequential mode (milliseconds)
    #[serde(rename = "min-request-delay-ms", default)]
    pub min_request_delay_ms: u64,

    /// Deadline for a single DoH query (milliseconds)
    #[serde(rename = "dns-timeout-ms", default = "default_timeout_ms")]
    pub dns_timeout_ms: u64,

    /// Deadline for the HTTP liveness fetch (milliseconds)
    #[serde(rename = "http-timeout-ms", default = "default_timeout_ms")]
    pub http_timeout_ms: u64,

    /// Scheme used for the HTTP liveness fetch
    #[serde(rename = "site-scheme", default = "default_site_scheme")]
    pub site_scheme: String,

    /// User agent sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

/// Block loop configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    /// Enumerate fixed-length charset labels
    #[serde(rename = "short-mode", default = "default_true")]
    pub short_mode: bool,

    /// Enumerate dictionary words
    #[serde(rename = "word-mode", default)]
    pub word_mode: bool,

    /// Pause between blocks (milliseconds)
    #[serde(rename = "block-pause-ms", default)]
    pub block_pause_ms: u64,
}

/// Word source configuration
#[derive(Debug, Clone, Deserialize)]
pub struct WordsConfig {
    /// Word list, one word per line
    pub path: PathBuf,

    /// Longest word kept from the list
    #[serde(rename = "max-length", default = "default_word_max_length")]
    pub max_length: u32,

    /// Optional part-of-speech lists
    #[serde(default)]
    pub pos: PosPaths,
}

/// Paths to the per-part-of-speech word lists
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PosPaths {
    pub noun: Option<PathBuf>,
    pub verb: Option<PathBuf>,
    pub adj: Option<PathBuf>,
    pub adv: Option<PathBuf>,
}

/// Aggregate backend configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the backend (e.g. "https://dom4in.net")
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Value sent in the `x-admin-api-key` header
    #[serde(rename = "api-key")]
    pub api_key: String,
}

/// Local state file locations
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Length cursor file
    #[serde(rename = "pointer-path", default = "default_pointer_path")]
    pub pointer_path: PathBuf,

    /// Word cursor file
    #[serde(rename = "word-cursor-path", default = "default_word_cursor_path")]
    pub word_cursor_path: PathBuf,

    /// SQLite block ledger
    #[serde(rename = "ledger-path", default = "default_ledger_path")]
    pub ledger_path: PathBuf,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            min_request_delay_ms: 0,
            dns_timeout_ms: default_timeout_ms(),
            http_timeout_ms: default_timeout_ms(),
            site_scheme: default_site_scheme(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            short_mode: true,
            word_mode: false,
            block_pause_ms: 0,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            pointer_path: default_pointer_path(),
            word_cursor_path: default_word_cursor_path(),
            ledger_path: default_ledger_path(),
        }
    }
}

fn default_charset() -> String {
    "abcdefghijklmnopqrstuvwxyz".to_string()
}

fn default_max_length() -> u32 {
    6
}

fn default_workers() -> usize {
    16
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_site_scheme() -> String {
    "https".to_string()
}

fn default_user_agent() -> String {
    format!(
        "dom4in-collector/{} (+https://dom4in.net)",
        env!("CARGO_PKG_VERSION")
    )
}

fn default_true() -> bool {
    true
}

fn default_word_max_length() -> u32 {
    10
}

fn default_pointer_path() -> PathBuf {
    PathBuf::from("state/state_pointer.json")
}

fn default_word_cursor_path() -> PathBuf {
    PathBuf::from("state/word_pointer.json")
}

fn default_ledger_path() -> PathBuf {
    PathBuf::from("state/ledger.db")
}

impl Config {
    /// Builds the label charset
    pub fn charset(&self) -> Result<Charset, ConfigError> {
        Charset::new(&self.enumeration.charset)
            .map_err(|e| ConfigError::Validation(format!("Invalid charset: {}", e)))
    }
}

impl ResolverConfig {
    /// Minimum delay between queries, zero when unset
    pub fn min_delay(&self) -> Duration {
        Duration::from_millis(self.min_delay_ms.unwrap_or(0))
    }
}

impl ProbeConfig {
    pub fn dns_timeout(&self) -> Duration {
        Duration::from_millis(self.dns_timeout_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    pub fn min_request_delay(&self) -> Duration {
        Duration::from_millis(self.min_request_delay_ms)
    }
}
