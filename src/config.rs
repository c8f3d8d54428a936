//! Configuration and CLI argument handling

use std::{path::PathBuf, time::Duration};
use clap::Parser;

use crate::controller::MAX_DURATION_SECS;

/// CLI argument parsing structure
#[derive(Parser, Debug, Clone)]
#[command(name = "rest-timer")]
#[command(about = "Rest-timer daemon that keeps one countdown in sync across a household's devices")]
#[command(version)]
pub struct Config {
    /// Port to bind the server to
    #[arg(short, long, default_value = "20590")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Household whose shared timer this device follows
    #[arg(long, default_value = "default")]
    pub household: String,

    /// Default rest duration in seconds
    #[arg(short, long, default_value = "90", value_parser = clap::value_parser!(u64).range(1..=MAX_DURATION_SECS))]
    pub rest_seconds: u64,

    /// Longest single wait of the background scheduler, in seconds
    #[arg(long, default_value = "30", value_parser = clap::value_parser!(u64).range(1..))]
    pub max_interval_secs: u64,

    /// How often the scheduler is woken to recover missed expiries, in seconds
    #[arg(long, default_value = "15", value_parser = clap::value_parser!(u64).range(1..))]
    pub wake_interval_secs: u64,

    /// How often the shared store is re-read, in seconds
    #[arg(long, default_value = "10", value_parser = clap::value_parser!(u64).range(1..))]
    pub refresh_interval_secs: u64,

    /// File backing the scheduler's local cache (in memory when omitted)
    #[arg(long)]
    pub cache_file: Option<PathBuf>,

    /// File backing the household expiry store (in memory when omitted)
    #[arg(long)]
    pub shared_store_file: Option<PathBuf>,

    /// notify-send compatible program for desktop notifications
    #[arg(long)]
    pub notify_command: Option<String>,

    /// Ring the terminal bell when the countdown completes
    #[arg(long)]
    pub bell: bool,

    /// Route the UI should open when a notification is clicked
    #[arg(long, default_value = "/gym")]
    pub app_route: String,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the server address as a formatted string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }

    pub fn max_interval(&self) -> Duration {
        Duration::from_secs(self.max_interval_secs)
    }

    pub fn wake_interval(&self) -> Duration {
        Duration::from_secs(self.wake_interval_secs)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_rest_timer_constants() {
        let config = Config::try_parse_from(["rest-timer"]).unwrap();
        assert_eq!(config.rest_seconds, 90);
        assert_eq!(config.max_interval(), Duration::from_secs(30));
        assert_eq!(config.app_route, "/gym");
        assert_eq!(config.address(), "127.0.0.1:20590");
        assert_eq!(config.log_level(), "info");
    }

    #[test]
    fn zero_rest_seconds_is_rejected() {
        assert!(Config::try_parse_from(["rest-timer", "--rest-seconds", "0"]).is_err());
        assert!(Config::try_parse_from(["rest-timer", "--rest-seconds", "86401"]).is_err());
    }

    #[test]
    fn file_backed_stores_are_optional() {
        let config = Config::try_parse_from([
            "rest-timer",
            "--household",
            "flat-7",
            "--cache-file",
            "/tmp/cache.json",
            "-v",
        ])
        .unwrap();
        assert_eq!(config.household, "flat-7");
        assert_eq!(config.cache_file, Some(PathBuf::from("/tmp/cache.json")));
        assert_eq!(config.shared_store_file, None);
        assert_eq!(config.log_level(), "debug");
    }
}
