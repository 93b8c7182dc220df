//! Engine configuration.
//!
//! Values are layered with `figment`: built-in defaults, then an optional
//! TOML file, then the environment (`FETCH_RETRY`, `FETCH_TIMEOUT`,
//! `DEBUG_LEVEL`). The TLS compatibility switches are presence flags read
//! from the environment once, at load time.

use std::path::Path;
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

use crate::effects::TransportConfig;
use crate::error::ConfigError;

/// Environment keys merged over the file configuration.
const ENV_KEYS: &[&str] = &["FETCH_RETRY", "FETCH_TIMEOUT", "DEBUG_LEVEL"];

/// Presence disables TLS peer verification. The second spelling is kept
/// for setups written against older releases.
const NO_VERIFY_PEER_VARS: &[&str] = &["SSL_NO_VERIFY_PEER", "SSL_NO_VERFIRY_PEER"];

/// Presence disables TLS hostname verification.
const NO_VERIFY_HOSTNAME_VAR: &str = "SSL_NO_VERIFY_HOSTNAME";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Retries after the first attempt. Total attempts = 1 + `fetch_retry`.
    ///
    /// Default: 3
    pub fetch_retry: u32,

    /// Per-attempt timeout in seconds, `0` for none.
    ///
    /// Default: 0
    pub fetch_timeout: u64,

    /// Process debug verbosity. Anything above `0` turns on transport
    /// verbose output.
    pub debug_level: u8,

    /// Longest single wait for transport activity in the poll loop.
    ///
    /// Default: 1000
    pub poll_interval_ms: u64,

    /// Base delay between attempts, doubled per retry. `0` retries at once.
    ///
    /// Default: 0
    pub retry_backoff_ms: u64,

    /// Try the next mirror on `404` instead of failing at once.
    ///
    /// Default: false
    pub advance_on_not_found: bool,

    /// Skip TLS peer verification. Never on unless asked for.
    pub ssl_no_verify_peer: bool,

    /// Skip TLS hostname verification. Never on unless asked for.
    pub ssl_no_verify_hostname: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            fetch_retry:            3,
            fetch_timeout:          0,
            debug_level:            0,
            poll_interval_ms:       1000,
            retry_backoff_ms:       0,
            advance_on_not_found:   false,
            ssl_no_verify_peer:     false,
            ssl_no_verify_hostname: false,
        }
    }
}

impl FetchConfig {
    /// Defaults, then `path` if given, then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::from_figment(Self::figment(path))
    }

    /// The layered provider stack, for callers that merge more sources.
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(FetchConfig::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::raw().only(ENV_KEYS))
    }

    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let mut config: FetchConfig = figment.extract()?;
        config.apply_tls_env();
        Ok(config)
    }

    fn apply_tls_env(&mut self) {
        if NO_VERIFY_PEER_VARS.iter().any(|var| std::env::var_os(var).is_some()) {
            self.ssl_no_verify_peer = true;
        }
        if std::env::var_os(NO_VERIFY_HOSTNAME_VAR).is_some() {
            self.ssl_no_verify_hostname = true;
        }
    }

    #[must_use]
    pub fn fetch_retry(mut self, retries: u32) -> Self {
        self.fetch_retry = retries;
        self
    }

    #[must_use]
    pub fn fetch_timeout(mut self, seconds: u64) -> Self {
        self.fetch_timeout = seconds;
        self
    }

    #[must_use]
    pub fn debug_level(mut self, level: u8) -> Self {
        self.debug_level = level;
        self
    }

    #[must_use]
    pub fn poll_interval_ms(mut self, millis: u64) -> Self {
        self.poll_interval_ms = millis;
        self
    }

    #[must_use]
    pub fn retry_backoff_ms(mut self, millis: u64) -> Self {
        self.retry_backoff_ms = millis;
        self
    }

    #[must_use]
    pub fn advance_on_not_found(mut self, advance: bool) -> Self {
        self.advance_on_not_found = advance;
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.fetch_timeout > 0).then(|| Duration::from_secs(self.fetch_timeout))
    }

    pub fn poll_interval(&self) -> Duration { Duration::from_millis(self.poll_interval_ms.max(1)) }

    pub fn retry_backoff(&self) -> Duration { Duration::from_millis(self.retry_backoff_ms) }

    pub fn verbose(&self) -> bool { self.debug_level > 0 }

    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            tls_no_verify_peer:     self.ssl_no_verify_peer,
            tls_no_verify_hostname: self.ssl_no_verify_hostname,
            verbose:                self.verbose(),
        }
    }
}
