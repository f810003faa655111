//! Intake service configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `INTAKE_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `KICKSDB_API_KEY` - Marketplace catalog API key
//!
//! ## Optional
//! - `INTAKE_HOST` - Bind address (default: 127.0.0.1)
//! - `INTAKE_PORT` - Listen port (default: 3002)
//! - `KICKSDB_BASE_URL` - Marketplace catalog base URL (default: <https://api.kicks.dev>)
//! - `UPCITEMDB_BASE_URL` - Barcode registry base URL (default: <https://api.upcitemdb.com>)
//! - `UPCITEMDB_USER_KEY` - Paid-plan registry key (trial endpoint is used without it)
//! - `UPCITEMDB_KEY_TYPE` - Registry key type header (default: 3scale)
//! - `PROVIDER_TIMEOUT_SECS` - Per-call provider timeout (default: 8)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Sentry error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Sentry traces sample rate (default: 1.0)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_KICKSDB_BASE_URL: &str = "https://api.kicks.dev";
const DEFAULT_UPCITEMDB_BASE_URL: &str = "https://api.upcitemdb.com";
const DEFAULT_UPCITEMDB_KEY_TYPE: &str = "3scale";
const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 8;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Intake service configuration.
#[derive(Debug, Clone)]
pub struct IntakeConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Marketplace catalog configuration
    pub kicksdb: KicksDbConfig,
    /// Barcode registry configuration
    pub upcitemdb: UpcItemDbConfig,
    /// Upper bound on a single provider call
    pub provider_timeout: Duration,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// Marketplace catalog (KicksDB) configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct KicksDbConfig {
    /// API base URL
    pub base_url: String,
    /// Bearer API key
    pub api_key: SecretString,
}

impl std::fmt::Debug for KicksDbConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KicksDbConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

/// Barcode registry (UPCitemdb) configuration.
///
/// Without a user key the free trial endpoint is used.
#[derive(Clone)]
pub struct UpcItemDbConfig {
    /// API base URL
    pub base_url: String,
    /// Paid-plan user key
    pub user_key: Option<SecretString>,
    /// Value of the `key_type` header sent with the user key
    pub key_type: String,
}

impl std::fmt::Debug for UpcItemDbConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpcItemDbConfig")
            .field("base_url", &self.base_url)
            .field("user_key", &self.user_key.as_ref().map(|_| "[REDACTED]"))
            .field("key_type", &self.key_type)
            .finish()
    }
}

impl IntakeConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("INTAKE_DATABASE_URL")?;
        let host = get_env_or_default("INTAKE_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("INTAKE_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("INTAKE_PORT", "3002")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("INTAKE_PORT".to_string(), e.to_string()))?;
        let provider_timeout = parse_timeout_secs(get_optional_env("PROVIDER_TIMEOUT_SECS"))?;

        let kicksdb = KicksDbConfig::from_env()?;
        let upcitemdb = UpcItemDbConfig::from_env();
        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);

        Ok(Self {
            database_url,
            host,
            port,
            kicksdb,
            upcitemdb,
            provider_timeout,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl KicksDbConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: get_env_or_default("KICKSDB_BASE_URL", DEFAULT_KICKSDB_BASE_URL),
            api_key: get_validated_secret("KICKSDB_API_KEY")?,
        })
    }
}

impl UpcItemDbConfig {
    /// Load registry configuration from environment.
    ///
    /// A weak user key is only warned about; the trial endpoint still works.
    fn from_env() -> Self {
        let user_key = get_optional_env("UPCITEMDB_USER_KEY").map(|key| {
            if let Err(e) = validate_secret_strength(&key, "UPCITEMDB_USER_KEY") {
                tracing::warn!("UPCITEMDB_USER_KEY validation warning: {e}");
            }
            SecretString::from(key)
        });

        Self {
            base_url: get_env_or_default("UPCITEMDB_BASE_URL", DEFAULT_UPCITEMDB_BASE_URL),
            user_key,
            key_type: get_env_or_default("UPCITEMDB_KEY_TYPE", DEFAULT_UPCITEMDB_KEY_TYPE),
        }
    }
}

impl Default for UpcItemDbConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_UPCITEMDB_BASE_URL.to_string(),
            user_key: None,
            key_type: DEFAULT_UPCITEMDB_KEY_TYPE.to_string(),
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL` (used by Fly.io postgres attach).
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse the provider timeout, rejecting zero.
fn parse_timeout_secs(value: Option<String>) -> Result<Duration, ConfigError> {
    let Some(raw) = value else {
        return Ok(Duration::from_secs(DEFAULT_PROVIDER_TIMEOUT_SECS));
    };
    let secs = raw.parse::<u64>().map_err(|e| {
        ConfigError::InvalidEnvVar("PROVIDER_TIMEOUT_SECS".to_string(), e.to_string())
    })?;
    if secs == 0 {
        return Err(ConfigError::InvalidEnvVar(
            "PROVIDER_TIMEOUT_SECS".to_string(),
            "must be at least 1 second".to_string(),
        ));
    }
    Ok(Duration::from_secs(secs))
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use the key issued by the provider."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
