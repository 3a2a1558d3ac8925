//! RocketCar relay server: entry point.
//!
//! This binary accepts WebSocket connections from RocketCar desktop games and
//! from phones acting as controllers, pairs them one-to-one, and relays
//! messages between each pair.
//!
//! # Usage
//!
//! ```text
//! rocketcar-relay [OPTIONS]
//!
//! Options:
//!   --port            <PORT>  WebSocket listener port [default: 3000]
//!   --bind            <IP>    Address to bind [default: 0.0.0.0]
//!   --ping-interval   <SECS>  Keepalive ping interval [default: 25]
//!   --ping-timeout    <SECS>  Extra silence tolerated after a ping [default: 20]
//!   --outbox-capacity <N>     Events queued per connection [default: 64]
//!   --log-level       <LEVEL> Log filter when RUST_LOG is unset [default: info]
//!   --config          <FILE>  Optional TOML config file
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable                     | Flag                |
//! |------------------------------|---------------------|
//! | `PORT`                       | `--port`            |
//! | `ROCKETCAR_BIND`             | `--bind`            |
//! | `ROCKETCAR_PING_INTERVAL`    | `--ping-interval`   |
//! | `ROCKETCAR_PING_TIMEOUT`     | `--ping-timeout`    |
//! | `ROCKETCAR_OUTBOX_CAPACITY`  | `--outbox-capacity` |
//! | `ROCKETCAR_LOG_LEVEL`        | `--log-level`       |
//! | `ROCKETCAR_CONFIG`           | `--config`          |
//!
//! Precedence, highest first: command-line flag, environment variable,
//! config file, built-in default.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rocketcar_relay::domain::RelayConfig;
use rocketcar_relay::infrastructure::{run_server, ConfigFile};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// RocketCar relay server.
///
/// Every option is optional: an unset option falls back to the config file,
/// then to the built-in default.
#[derive(Debug, Parser)]
#[command(
    name = "rocketcar-relay",
    about = "Pairs RocketCar desktop games with mobile controllers over WebSocket",
    version
)]
struct Cli {
    /// TCP port for the WebSocket server.
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// IP address to bind.  `0.0.0.0` lets phones on the LAN connect.
    #[arg(long, env = "ROCKETCAR_BIND")]
    bind: Option<IpAddr>,

    /// Seconds between keepalive pings.
    #[arg(long, env = "ROCKETCAR_PING_INTERVAL")]
    ping_interval: Option<u64>,

    /// Seconds of extra silence tolerated after a ping before the connection
    /// is dropped.
    #[arg(long, env = "ROCKETCAR_PING_TIMEOUT")]
    ping_timeout: Option<u64>,

    /// Events queued per connection before deliveries are dropped.
    #[arg(long, env = "ROCKETCAR_OUTBOX_CAPACITY")]
    outbox_capacity: Option<usize>,

    /// `tracing` filter used when `RUST_LOG` is not set.
    #[arg(long, env = "ROCKETCAR_LOG_LEVEL")]
    log_level: Option<String>,

    /// Path of an optional TOML config file.
    #[arg(long, env = "ROCKETCAR_CONFIG")]
    config: Option<PathBuf>,
}

impl Cli {
    /// Resolves the final [`RelayConfig`]: defaults, then the file (if any),
    /// then flags and environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or is invalid, or if
    /// the merged settings fail [`RelayConfig::validate`] (zero ping interval,
    /// keepalive over a day, zero capacity).
    fn into_relay_config(self) -> anyhow::Result<RelayConfig> {
        let mut cfg = RelayConfig::default();

        if let Some(path) = &self.config {
            cfg = ConfigFile::load(path)
                .and_then(|file| file.apply(cfg))
                .with_context(|| format!("invalid config file {}", path.display()))?;
        }

        let ip = self.bind.unwrap_or(cfg.bind_addr.ip());
        let port = self.port.unwrap_or(cfg.bind_addr.port());
        cfg.bind_addr = SocketAddr::new(ip, port);

        if let Some(secs) = self.ping_interval {
            cfg.ping_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = self.ping_timeout {
            cfg.ping_timeout = Duration::from_secs(secs);
        }
        if let Some(capacity) = self.outbox_capacity {
            cfg.outbox_capacity = capacity;
        }
        if let Some(level) = self.log_level {
            cfg.log_level = level;
        }

        cfg.validate().context("invalid relay settings")?;
        Ok(cfg)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

/// Program entry point.
///
/// # What happens at startup
///
/// 1. CLI arguments (and their environment fallbacks) are parsed with `clap`.
/// 2. The config file, if named, is merged underneath them into a
///    [`RelayConfig`].
/// 3. `tracing_subscriber` is initialised: `RUST_LOG` wins, otherwise the
///    configured log level.
/// 4. A Ctrl+C handler is spawned; it clears a shared `AtomicBool`.
/// 5. [`run_server`] binds the port and accepts connections until the flag
///    is cleared.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Cli::parse().into_relay_config()?;

    // ── Logging setup ─────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    info!(
        "RocketCar relay starting: bind={}, ping_interval={:?}, ping_timeout={:?}",
        config.bind_addr, config.ping_interval, config.ping_timeout
    );

    // ── Graceful shutdown flag ────────────────────────────────────────────────
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);

    // The accept loop in `run_server` checks this flag every 200 ms.
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C; shutting down");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => {
                tracing::error!("failed to listen for Ctrl+C signal: {e}");
            }
        }
    });

    run_server(config, running).await?;

    info!("RocketCar relay stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// A CLI with every option unset, independent of the test environment.
    fn empty_cli() -> Cli {
        Cli {
            port: None,
            bind: None,
            ping_interval: None,
            ping_timeout: None,
            outbox_capacity: None,
            log_level: None,
            config: None,
        }
    }

    #[test]
    fn test_cli_port_flag_parses() {
        let cli = Cli::parse_from(["rocketcar-relay", "--port", "4000"]);
        assert_eq!(cli.port, Some(4000));
    }

    #[test]
    fn test_cli_bind_flag_parses_ip() {
        let cli = Cli::parse_from(["rocketcar-relay", "--bind", "127.0.0.1"]);
        assert_eq!(cli.bind, Some(IpAddr::from([127, 0, 0, 1])));
    }

    #[test]
    fn test_cli_rejects_hostname_bind() {
        let result = Cli::try_parse_from(["rocketcar-relay", "--bind", "localhost"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_cli_gives_defaults() {
        // Arrange / Act
        let config = empty_cli().into_relay_config().unwrap();

        // Assert
        assert_eq!(config, RelayConfig::default());
    }

    #[test]
    fn test_flags_override_defaults() {
        // Arrange
        let cli = Cli {
            port: Some(8080),
            bind: Some(IpAddr::from([127, 0, 0, 1])),
            ping_interval: Some(10),
            ping_timeout: Some(5),
            outbox_capacity: Some(4),
            log_level: Some("debug".to_string()),
            config: None,
        };

        // Act
        let config = cli.into_relay_config().unwrap();

        // Assert
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.ping_interval, Duration::from_secs(10));
        assert_eq!(config.ping_timeout, Duration::from_secs(5));
        assert_eq!(config.idle_timeout(), Duration::from_secs(15));
        assert_eq!(config.outbox_capacity, 4);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_port_flag_keeps_default_bind_ip() {
        let cli = Cli {
            port: Some(9999),
            ..empty_cli()
        };
        let config = cli.into_relay_config().unwrap();
        assert!(config.bind_addr.ip().is_unspecified());
        assert_eq!(config.bind_addr.port(), 9999);
    }

    #[test]
    fn test_zero_outbox_capacity_is_error() {
        let cli = Cli {
            outbox_capacity: Some(0),
            ..empty_cli()
        };
        assert!(cli.into_relay_config().is_err());
    }

    #[test]
    fn test_zero_ping_interval_is_error() {
        // Arrange
        let cli = Cli {
            ping_interval: Some(0),
            ..empty_cli()
        };

        // Act
        let result = cli.into_relay_config();

        // Assert
        let err = result.unwrap_err();
        assert!(format!("{err:#}").contains("ping interval"));
    }

    #[test]
    fn test_huge_ping_timeout_is_error_not_panic() {
        let cli = Cli {
            ping_interval: Some(u64::MAX),
            ping_timeout: Some(u64::MAX),
            ..empty_cli()
        };
        assert!(cli.into_relay_config().is_err());
    }

    #[test]
    fn test_missing_config_file_is_error() {
        let cli = Cli {
            config: Some(PathBuf::from("/nonexistent/rocketcar/relay.toml")),
            ..empty_cli()
        };
        assert!(cli.into_relay_config().is_err());
    }

    #[test]
    fn test_flag_beats_config_file() {
        // Arrange: the file sets port and log level, the flag sets port only
        let dir = std::env::temp_dir().join(format!("rocketcar_cli_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("relay.toml");
        std::fs::write(&path, "port = 5000\nlog_level = \"warn\"\n").unwrap();
        let cli = Cli {
            port: Some(6000),
            config: Some(path),
            ..empty_cli()
        };

        // Act
        let config = cli.into_relay_config().unwrap();

        // Assert
        assert_eq!(config.bind_addr.port(), 6000);
        assert_eq!(config.log_level, "warn");

        // Cleanup
        std::fs::remove_dir_all(&dir).ok();
    }
}
