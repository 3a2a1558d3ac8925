//! Optional TOML configuration file for the relay.
//!
//! Every key is optional.  A key that is present overrides the built-in
//! default; a command-line flag or environment variable overrides the file.
//!
//! # Example file
//!
//! ```toml
//! bind = "0.0.0.0"
//! port = 3000
//! log_level = "debug"
//!
//! [keepalive]
//! ping_interval_secs = 25
//! ping_timeout_secs = 20
//!
//! [limits]
//! outbox_capacity = 64
//! hub_capacity = 1024
//! ```
//!
//! Unknown keys are rejected so that a typo (`prot = 3001`) fails loudly at
//! startup instead of being silently ignored.

use std::net::{AddrParseError, IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::domain::{InvalidConfig, RelayConfig};

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("I/O error reading config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// `bind` is not an IP address.
    #[error("invalid bind address '{value}': {source}")]
    InvalidBind {
        value: String,
        #[source]
        source: AddrParseError,
    },

    /// The merged values are outside what the server can run with.
    #[error("invalid setting: {0}")]
    Invalid(#[from] InvalidConfig),
}

// ── File schema ───────────────────────────────────────────────────────────────

/// Contents of the TOML file, exactly as written by the operator.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// IP address to listen on, e.g. `"127.0.0.1"`.
    pub bind: Option<String>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
    #[serde(default)]
    pub keepalive: KeepaliveSection,
    #[serde(default)]
    pub limits: LimitsSection,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct KeepaliveSection {
    pub ping_interval_secs: Option<u64>,
    pub ping_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LimitsSection {
    pub outbox_capacity: Option<usize>,
    pub hub_capacity: Option<usize>,
}

impl ConfigFile {
    /// Parses TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML or unknown keys.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Reads and parses the file at `path`.
    ///
    /// Unlike a settings file the application writes itself, this file is
    /// named explicitly by the operator, so a missing file is an error.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read and
    /// [`ConfigError::Parse`] if it is not valid.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Overlays the keys present in the file on top of `base`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBind`] if `bind` is not an IP address and
    /// [`ConfigError::Invalid`] if the result fails
    /// [`RelayConfig::validate`].
    pub fn apply(&self, base: RelayConfig) -> Result<RelayConfig, ConfigError> {
        let mut cfg = base;

        let ip = match &self.bind {
            Some(value) => value
                .parse::<IpAddr>()
                .map_err(|source| ConfigError::InvalidBind {
                    value: value.clone(),
                    source,
                })?,
            None => cfg.bind_addr.ip(),
        };
        let port = self.port.unwrap_or(cfg.bind_addr.port());
        cfg.bind_addr = SocketAddr::new(ip, port);

        if let Some(secs) = self.keepalive.ping_interval_secs {
            cfg.ping_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = self.keepalive.ping_timeout_secs {
            cfg.ping_timeout = Duration::from_secs(secs);
        }
        if let Some(capacity) = self.limits.outbox_capacity {
            cfg.outbox_capacity = capacity;
        }
        if let Some(capacity) = self.limits.hub_capacity {
            cfg.hub_capacity = capacity;
        }
        if let Some(level) = &self.log_level {
            cfg.log_level = level.clone();
        }

        cfg.validate()?;
        Ok(cfg)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
