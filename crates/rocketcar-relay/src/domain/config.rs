//! Relay configuration types.
//!
//! [`RelayConfig`] is the single source of truth for all runtime settings.
//! It is assembled once in `main.rs` from CLI arguments, environment
//! variables, and an optional TOML file, then handed to the server by value.
//! Nothing in the relay reads the environment on its own.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

/// Port the original RocketCar server listened on.
pub const DEFAULT_PORT: u16 = 3000;
/// Seconds between server-sent WebSocket pings.
pub const DEFAULT_PING_INTERVAL_SECS: u64 = 25;
/// Extra seconds of silence tolerated after a ping before closing.
pub const DEFAULT_PING_TIMEOUT_SECS: u64 = 20;
/// Events queued per connection before deliveries are dropped.
pub const DEFAULT_OUTBOX_CAPACITY: usize = 64;
/// Commands queued for the hub before connection readers wait.
pub const DEFAULT_HUB_CAPACITY: usize = 1024;
pub const DEFAULT_LOG_LEVEL: &str = "info";
/// Upper bound for either keepalive setting (one day).
pub const MAX_KEEPALIVE_SECS: u64 = 86_400;

/// A [`RelayConfig`] value the server cannot run with.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidConfig {
    /// Pings would be sent in a busy loop.
    #[error("ping interval must be greater than zero")]
    ZeroPingInterval,

    #[error("{field} must not exceed one day")]
    KeepaliveTooLong { field: &'static str },

    /// A queue of capacity zero cannot be created.
    #[error("{field} must be greater than zero")]
    ZeroCapacity { field: &'static str },
}

/// All runtime configuration for the relay server.
///
/// # Example
///
/// ```rust
/// use rocketcar_relay::domain::RelayConfig;
///
/// let cfg = RelayConfig::default();
/// assert_eq!(cfg.bind_addr.port(), 3000);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RelayConfig {
    /// Address the WebSocket listener binds to.
    ///
    /// `0.0.0.0` lets phones on the same LAN reach the server.
    pub bind_addr: SocketAddr,

    /// How often the server sends a WebSocket ping to each peer.
    pub ping_interval: Duration,

    /// How long past a missed ping the server waits before dropping a silent
    /// peer.  A connection is closed after `ping_interval + ping_timeout`
    /// without any inbound frame.
    pub ping_timeout: Duration,

    /// Capacity of each connection's outbound event queue.
    pub outbox_capacity: usize,

    /// Capacity of the hub's inbound command queue.
    pub hub_capacity: usize,

    /// Fallback `tracing` filter when `RUST_LOG` is not set.
    pub log_level: String,
}

impl RelayConfig {
    /// Longest a connection may stay silent before it is treated as gone.
    ///
    /// Saturates instead of overflowing; [`validate`](Self::validate) keeps
    /// real configurations far below that.
    pub fn idle_timeout(&self) -> Duration {
        self.ping_interval.saturating_add(self.ping_timeout)
    }

    /// Checks the values every connection task relies on.
    ///
    /// # Errors
    ///
    /// Returns the first [`InvalidConfig`] found: a zero ping interval, a
    /// keepalive longer than [`MAX_KEEPALIVE_SECS`], or a zero queue capacity.
    pub fn validate(&self) -> Result<(), InvalidConfig> {
        let max = Duration::from_secs(MAX_KEEPALIVE_SECS);
        if self.ping_interval.is_zero() {
            return Err(InvalidConfig::ZeroPingInterval);
        }
        if self.ping_interval > max {
            return Err(InvalidConfig::KeepaliveTooLong {
                field: "ping_interval",
            });
        }
        if self.ping_timeout > max {
            return Err(InvalidConfig::KeepaliveTooLong {
                field: "ping_timeout",
            });
        }
        if self.outbox_capacity == 0 {
            return Err(InvalidConfig::ZeroCapacity {
                field: "outbox_capacity",
            });
        }
        if self.hub_capacity == 0 {
            return Err(InvalidConfig::ZeroCapacity {
                field: "hub_capacity",
            });
        }
        Ok(())
    }
}

impl Default for RelayConfig {
    /// | Field           | Default        |
    /// |-----------------|----------------|
    /// | bind_addr       | `0.0.0.0:3000` |
    /// | ping_interval   | 25 seconds     |
    /// | ping_timeout    | 20 seconds     |
    /// | outbox_capacity | 64             |
    /// | hub_capacity    | 1024           |
    /// | log_level       | `info`         |
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            ping_interval: Duration::from_secs(DEFAULT_PING_INTERVAL_SECS),
            ping_timeout: Duration::from_secs(DEFAULT_PING_TIMEOUT_SECS),
            outbox_capacity: DEFAULT_OUTBOX_CAPACITY,
            hub_capacity: DEFAULT_HUB_CAPACITY,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
