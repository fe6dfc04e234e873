//! BIG-IQ client configuration.
//!
//! One control-plane host per configuration. Credentials are either a
//! username/password pair (HTTP Basic) or a token, which supersedes them.
//! Override via environment variables or explicit construction for
//! staging/testing.

use std::time::Duration;

use url::Url;
use zeroize::Zeroizing;

use crate::poll::PollPolicy;

/// Default per-call timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Configuration for connecting to a BIG-IQ control plane.
///
/// Custom `Debug` implementation redacts `password` and `token`
/// to prevent credential leakage in log output.
#[derive(Clone)]
pub struct BigIqConfig {
    /// Control-plane base URL, e.g. <https://10.0.90.253:443>.
    pub host: Url,
    /// Username for HTTP Basic auth and token login.
    pub username: String,
    /// Password for HTTP Basic auth and token login.
    pub password: Zeroizing<String>,
    /// Pre-issued auth token. When present, Basic auth is never sent.
    pub token: Option<Zeroizing<String>>,
    /// Login provider for token sessions (usually `tmos` or `local`).
    pub login_provider: Option<String>,
    /// Per-call timeout in seconds.
    pub timeout_secs: u64,
    /// Skip TLS certificate verification (appliances often ship self-signed certs).
    pub accept_invalid_certs: bool,
    /// Overrides the default `User-Agent`.
    pub user_agent: Option<String>,
    /// Spacing and bounds for lifecycle status polling.
    pub poll: PollPolicy,
}

impl std::fmt::Debug for BigIqConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BigIqConfig")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("login_provider", &self.login_provider)
            .field("timeout_secs", &self.timeout_secs)
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .field("user_agent", &self.user_agent)
            .field("poll", &self.poll)
            .finish()
    }
}

impl BigIqConfig {
    /// Build a Basic-auth configuration for `host` (scheme and port optional).
    pub fn new(host: &str, port: Option<&str>, username: &str, password: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            host: normalize_host("host", host, port)?,
            username: username.to_string(),
            password: Zeroizing::new(password.to_string()),
            token: None,
            login_provider: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            accept_invalid_certs: false,
            user_agent: None,
            poll: PollPolicy::default(),
        })
    }

    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `BIGIQ_HOST` (required; `https://` is assumed when no scheme is given)
    /// - `BIGIQ_PORT` (optional, appended to the host)
    /// - `BIGIQ_USERNAME` (default: `admin`)
    /// - `BIGIQ_PASSWORD` (default: empty)
    /// - `BIGIQ_TOKEN` (optional; supersedes username/password)
    /// - `BIGIQ_LOGIN_PROVIDER` (optional; enables token login on connect)
    /// - `BIGIQ_TIMEOUT_SECS` (default: 60)
    /// - `BIGIQ_INSECURE_TLS` (`1`/`true` disables certificate verification)
    /// - `BIGIQ_POLL_INTERVAL_MS` (default: 2000)
    /// - `BIGIQ_POLL_MAX_INTERVAL_MS` (default: 15000)
    /// - `BIGIQ_POLL_MAX_WAIT_SECS` (default: 600)
    pub fn from_env() -> Result<Self, ConfigError> {
        let raw_host = std::env::var("BIGIQ_HOST").map_err(|_| ConfigError::MissingHost)?;
        let port = std::env::var("BIGIQ_PORT").ok();
        let defaults = PollPolicy::default();

        Ok(Self {
            host: normalize_host("BIGIQ_HOST", &raw_host, port.as_deref())?,
            username: std::env::var("BIGIQ_USERNAME").unwrap_or_else(|_| "admin".to_string()),
            password: Zeroizing::new(std::env::var("BIGIQ_PASSWORD").unwrap_or_default()),
            token: std::env::var("BIGIQ_TOKEN")
                .ok()
                .filter(|t| !t.is_empty())
                .map(Zeroizing::new),
            login_provider: std::env::var("BIGIQ_LOGIN_PROVIDER")
                .ok()
                .filter(|p| !p.is_empty()),
            timeout_secs: env_number("BIGIQ_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?,
            accept_invalid_certs: env_flag("BIGIQ_INSECURE_TLS"),
            user_agent: None,
            poll: PollPolicy {
                interval: Duration::from_millis(env_number(
                    "BIGIQ_POLL_INTERVAL_MS",
                    defaults.interval.as_millis() as u64,
                )?),
                max_interval: Duration::from_millis(env_number(
                    "BIGIQ_POLL_MAX_INTERVAL_MS",
                    defaults.max_interval.as_millis() as u64,
                )?),
                max_wait: Duration::from_secs(env_number(
                    "BIGIQ_POLL_MAX_WAIT_SECS",
                    defaults.max_wait.as_secs(),
                )?),
                ..defaults
            },
        })
    }

    /// Create a configuration pointing at a local mock server (for testing).
    ///
    /// Uses a short call timeout and a millisecond-scale poll policy.
    pub fn local_mock(uri: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            host: normalize_host("local_mock", uri, None)?,
            username: "admin".to_string(),
            password: Zeroizing::new("admin".to_string()),
            token: None,
            login_provider: None,
            timeout_secs: 5,
            accept_invalid_certs: false,
            user_agent: None,
            poll: PollPolicy::fast(),
        })
    }

    /// Per-call timeout as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Prefix `https://` when no scheme is present and append an explicit port.
fn normalize_host(var: &str, host: &str, port: Option<&str>) -> Result<Url, ConfigError> {
    let mut raw = if host.starts_with("http://") || host.starts_with("https://") {
        host.trim_end_matches('/').to_string()
    } else {
        format!("https://{}", host.trim_end_matches('/'))
    };
    if let Some(port) = port.filter(|p| !p.is_empty()) {
        raw.push(':');
        raw.push_str(port);
    }
    Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl(var.to_string(), e.to_string()))
}

fn env_number(var: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e: std::num::ParseIntError| ConfigError::InvalidNumber(var.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}

fn env_flag(var: &str) -> bool {
    std::env::var(var)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("BIGIQ_HOST environment variable is required")]
    MissingHost,
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("invalid number for {0}: {1}")]
    InvalidNumber(String, String),
}
