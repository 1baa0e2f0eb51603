//! Server configuration and CLI argument parsing
//!
//! All settings can be supplied as CLI arguments or environment variables
//! (with the FLOODGATE_ prefix); CLI arguments take precedence. Everything
//! here is fixed for the lifetime of the process.
//!
//! # Example Usage
//!
//! ```bash
//! # Using CLI arguments
//! floodgate --port 4000 --limiter-rps 2 --limiter-burst 4
//!
//! # Using environment variables
//! export FLOODGATE_PORT=4000
//! export FLOODGATE_LIMITER_ENABLED=false
//! floodgate
//! ```

use anyhow::{Result, anyhow};
use clap::Parser;
use std::time::Duration;

/// Main configuration structure for the server
#[derive(Debug, Clone)]
pub struct Config {
    /// Host address to bind to
    pub host: String,
    /// Port number to listen on
    pub port: u16,
    /// Environment label (development|staging|production)
    pub env: String,
    /// Per-client rate limiter configuration
    pub limiter: LimiterConfig,
    /// Shutdown drain deadlines
    pub shutdown: ShutdownConfig,
    /// Logging level (error, warn, info, debug, trace)
    pub log_level: String,
}

/// Per-client rate limiter configuration
#[derive(Debug, Clone)]
pub struct LimiterConfig {
    /// Whether throttling is applied at all
    pub enabled: bool,
    /// Token refill rate, requests per second
    pub rps: f64,
    /// Maximum burst size per client
    pub burst: u32,
    /// How often the staleness sweep runs
    pub sweep_interval: Duration,
    /// How long an idle client survives before eviction
    pub staleness: Duration,
}

/// The two independent shutdown deadlines
///
/// In-flight HTTP connections get the short one; background tasks get the
/// longer one. Both are enforced even against waits that would otherwise
/// block forever.
#[derive(Debug, Clone)]
pub struct ShutdownConfig {
    /// Hard deadline for draining in-flight requests
    pub request_drain_timeout: Duration,
    /// Absolute deadline for draining background tasks
    pub task_drain_timeout: Duration,
}

/// Command-line arguments for the server
#[derive(Parser, Debug)]
#[command(
    name = "floodgate",
    about = "JSON API server with per-client throttling",
    long_about = "A JSON API server with per-client request throttling, supervised \
background tasks, and coordinated graceful shutdown.\n\nEnvironment variables with \
the FLOODGATE_ prefix are supported. CLI arguments take precedence."
)]
pub struct Args {
    #[arg(
        long,
        value_name = "HOST",
        help = "Host address to bind to",
        default_value = "127.0.0.1",
        env = "FLOODGATE_HOST"
    )]
    pub host: String,
    #[arg(
        long,
        value_name = "PORT",
        help = "API server port",
        default_value_t = 4000,
        env = "FLOODGATE_PORT"
    )]
    pub port: u16,
    #[arg(
        long,
        value_name = "NAME",
        help = "Environment (development|staging|production)",
        default_value = "development",
        env = "FLOODGATE_ENV"
    )]
    pub env: String,

    // Rate limiter
    #[arg(
        long,
        value_name = "BOOL",
        help = "Enable the per-client rate limiter",
        default_value_t = true,
        action = clap::ArgAction::Set,
        env = "FLOODGATE_LIMITER_ENABLED"
    )]
    pub limiter_enabled: bool,
    #[arg(
        long,
        value_name = "N",
        help = "Rate limiter maximum requests per second",
        default_value_t = 2.0,
        env = "FLOODGATE_LIMITER_RPS"
    )]
    pub limiter_rps: f64,
    #[arg(
        long,
        value_name = "N",
        help = "Rate limiter maximum burst",
        default_value_t = 4,
        env = "FLOODGATE_LIMITER_BURST"
    )]
    pub limiter_burst: u32,
    #[arg(
        long,
        value_name = "SECS",
        help = "Interval between throttle staleness sweeps (seconds)",
        default_value_t = 60,
        env = "FLOODGATE_LIMITER_SWEEP_INTERVAL"
    )]
    pub limiter_sweep_interval: u64,
    #[arg(
        long,
        value_name = "SECS",
        help = "Idle time before a client's throttle state is evicted (seconds)",
        default_value_t = 180,
        env = "FLOODGATE_LIMITER_STALENESS"
    )]
    pub limiter_staleness: u64,

    // Shutdown
    #[arg(
        long,
        value_name = "SECS",
        help = "Deadline for draining in-flight requests on shutdown (seconds)",
        default_value_t = 5,
        env = "FLOODGATE_REQUEST_DRAIN_TIMEOUT"
    )]
    pub request_drain_timeout: u64,
    #[arg(
        long,
        value_name = "SECS",
        help = "Deadline for draining background tasks on shutdown (seconds)",
        default_value_t = 30,
        env = "FLOODGATE_TASK_DRAIN_TIMEOUT"
    )]
    pub task_drain_timeout: u64,

    // General options
    #[arg(
        long,
        value_name = "LEVEL",
        help = "Log level: error, warn, info, debug, trace",
        default_value = "info",
        env = "FLOODGATE_LOG_LEVEL"
    )]
    pub log_level: String,
}

impl Config {
    /// Build configuration from environment variables and CLI arguments
    ///
    /// Clap handles the precedence: CLI arguments, then environment
    /// variables, then defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the resulting configuration is invalid.
    pub fn from_env_and_args() -> Result<Self> {
        Self::from_args(Args::parse())
    }

    fn from_args(args: Args) -> Result<Self> {
        let config = Config {
            host: args.host,
            port: args.port,
            env: args.env,
            limiter: LimiterConfig {
                enabled: args.limiter_enabled,
                rps: args.limiter_rps,
                burst: args.limiter_burst,
                sweep_interval: Duration::from_secs(args.limiter_sweep_interval),
                staleness: Duration::from_secs(args.limiter_staleness),
            },
            shutdown: ShutdownConfig {
                request_drain_timeout: Duration::from_secs(args.request_drain_timeout),
                task_drain_timeout: Duration::from_secs(args.task_drain_timeout),
            },
            log_level: args.log_level,
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error for a non-positive refill rate, a zero burst,
    /// a zero sweep interval, or a zero drain deadline.
    fn validate(&self) -> Result<()> {
        if self.limiter.rps <= 0.0 || !self.limiter.rps.is_finite() {
            return Err(anyhow!(
                "limiter rps must be a positive number, got {}",
                self.limiter.rps
            ));
        }
        if self.limiter.burst == 0 {
            return Err(anyhow!("limiter burst must be at least 1"));
        }
        if self.limiter.sweep_interval.is_zero() {
            return Err(anyhow!("limiter sweep interval must be non-zero"));
        }
        if self.limiter.staleness.is_zero() {
            return Err(anyhow!("limiter staleness must be non-zero"));
        }
        if self.shutdown.request_drain_timeout.is_zero()
            || self.shutdown.task_drain_timeout.is_zero()
        {
            return Err(anyhow!("shutdown drain timeouts must be non-zero"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        Config {
            host: "127.0.0.1".to_string(),
            port: 4000,
            env: "development".to_string(),
            limiter: LimiterConfig {
                enabled: true,
                rps: 2.0,
                burst: 4,
                sweep_interval: Duration::from_secs(60),
                staleness: Duration::from_secs(180),
            },
            shutdown: ShutdownConfig {
                request_drain_timeout: Duration::from_secs(5),
                task_drain_timeout: Duration::from_secs(30),
            },
            log_level: "info".to_string(),
        }
    }

    #[test]
    fn test_default_style_config_is_valid() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_rps() {
        let mut config = valid_config();
        config.limiter.rps = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_negative_rps() {
        let mut config = valid_config();
        config.limiter.rps = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_burst() {
        let mut config = valid_config();
        config.limiter.burst = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_drain_timeouts() {
        let mut config = valid_config();
        config.shutdown.request_drain_timeout = Duration::ZERO;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.shutdown.task_drain_timeout = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_sweep_interval() {
        let mut config = valid_config();
        config.limiter.sweep_interval = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_args_parse_with_defaults() {
        let args = Args::try_parse_from(["floodgate"]).unwrap();
        let config = Config::from_args(args).unwrap();

        assert_eq!(config.port, 4000);
        assert!(config.limiter.enabled);
        assert_eq!(config.limiter.burst, 4);
        assert_eq!(config.shutdown.request_drain_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_args_disable_limiter() {
        let args = Args::try_parse_from(["floodgate", "--limiter-enabled", "false"]).unwrap();
        let config = Config::from_args(args).unwrap();
        assert!(!config.limiter.enabled);
    }
}
