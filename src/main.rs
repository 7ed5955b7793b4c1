//! Watcher daemon binary
//!
//! Entry point for the access point watcher. Loads configuration,
//! applies command line overrides, and keeps the daemon alive until
//! Ctrl+C: a daemon failure is logged and the daemon is rebuilt after a
//! short pause rather than taking the process down.

use apwatch::{
    daemon::{Daemon, DaemonConfig},
    ApWatchError, Result,
};
use clap::{Arg, Command};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Default configuration file path
const DEFAULT_CONFIG_PATH: &str = "/etc/apwatch/daemon.toml";

/// Pause before rebuilding a failed daemon
const RESTART_DELAY: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("apwatch")
        .version(env!("CARGO_PKG_VERSION"))
        .about("802.11 beacon fingerprint watcher daemon")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value(DEFAULT_CONFIG_PATH),
        )
        .arg(
            Arg::new("device")
                .short('d')
                .long("device")
                .value_name("PATH")
                .help("Capture device to read beacon frames from"),
        )
        .arg(
            Arg::new("script")
                .short('s')
                .long("script")
                .value_name("FILE")
                .help("Extraction script to compile"),
        )
        .arg(
            Arg::new("store-root")
                .long("store-root")
                .value_name("DIR")
                .help("Root directory for fingerprint tables"),
        )
        .arg(
            Arg::new("interval")
                .short('i')
                .long("interval")
                .value_name("MS")
                .help("Polling interval in milliseconds"),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("Log level (trace, debug, info, warn, error)"),
        )
        .get_matches();

    let config_path = PathBuf::from(matches.get_one::<String>("config").unwrap());
    let mut config = load_configuration(&config_path)?;

    if let Some(device) = matches.get_one::<String>("device") {
        config.capture.device = PathBuf::from(device);
    }
    if let Some(script) = matches.get_one::<String>("script") {
        config.script.path = PathBuf::from(script);
    }
    if let Some(root) = matches.get_one::<String>("store-root") {
        config.store.root = PathBuf::from(root);
    }
    if let Some(interval) = matches.get_one::<String>("interval") {
        config.capture.poll_interval_ms = interval
            .parse()
            .map_err(|_| ApWatchError::Config(format!("Invalid interval '{}'", interval)))?;
    }
    if let Some(level) = matches.get_one::<String>("log-level") {
        config.logging.level = level.clone();
    }
    config.validate()?;

    init_logging(&config.logging.level)?;
    info!("Starting apwatch v{}", env!("CARGO_PKG_VERSION"));

    tokio::select! {
        result = supervise(config) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
            Ok(())
        }
    }
}

/// Initialize the logging system.
fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(level)
        .map_err(|e| ApWatchError::Config(format!("Invalid log level '{}': {}", level, e)))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    Ok(())
}

/// Load configuration, falling back to defaults when the file is absent.
fn load_configuration(config_path: &PathBuf) -> Result<DaemonConfig> {
    if !config_path.exists() {
        warn!(
            "Configuration file not found: {}, using defaults",
            config_path.display()
        );
        return Ok(DaemonConfig::default());
    }

    DaemonConfig::load_from_file(config_path)
}

/// Run the daemon and rebuild it after a failure.
async fn supervise(config: DaemonConfig) -> Result<()> {
    loop {
        // A bad config or script will not fix itself, so startup errors
        // are fatal; only a running daemon gets rebuilt.
        let mut daemon = Daemon::new(config.clone())?;
        if let Err(e) = daemon.run().await {
            error!("Daemon failed: {}", e);
        }

        warn!("Restarting daemon in {:?}", RESTART_DELAY);
        tokio::time::sleep(RESTART_DELAY).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_constants() {
        assert_eq!(DEFAULT_CONFIG_PATH, "/etc/apwatch/daemon.toml");
        assert_eq!(RESTART_DELAY, Duration::from_secs(5));
    }

    #[test]
    fn test_load_nonexistent_config_uses_defaults() {
        let path = PathBuf::from("/nonexistent/daemon.toml");
        let config = load_configuration(&path).unwrap();
        assert_eq!(config.logging.level, "info");
    }
}
