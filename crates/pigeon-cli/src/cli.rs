//! Command-line argument definitions for the demo binaries.

use anyhow::Context;
use clap::Parser;
use pigeon_jobs::JobRunnerConfig;
use pigeon_watch::{TimestampSource, WatcherConfig};
use std::path::PathBuf;

/// Watch a directory and report fresh and purgeable files until Ctrl+C.
#[derive(Debug, Parser)]
#[command(name = "pigeon-watch")]
#[command(version, about, long_about = None)]
pub struct WatchCli {
    /// Directory to watch
    #[arg(default_value = ".")]
    pub dir: PathBuf,

    /// Seconds between scans (overrides the config file)
    #[arg(short, long, env = "PIGEON_INTERVAL")]
    pub interval: Option<u64>,

    /// Directory levels below the root to scan (0 = root only)
    #[arg(short, long)]
    pub depth: Option<usize>,

    /// File timestamp compared against the threshold
    #[arg(short, long, value_enum)]
    pub timestamp: Option<CliTimestamp>,

    /// Configuration file path
    #[arg(short, long, env = "PIGEON_CONFIG")]
    pub config: Option<PathBuf>,
}

impl WatchCli {
    /// Load the config file, if any, and apply command-line overrides
    pub fn watcher_config(&self) -> anyhow::Result<WatcherConfig> {
        let mut config = match &self.config {
            Some(path) => WatcherConfig::from_file(path)
                .with_context(|| format!("Failed to load {}", path.display()))?,
            None => WatcherConfig::default(),
        };

        if let Some(secs) = self.interval {
            config.poll_interval_ms = secs.saturating_mul(1000);
        }
        if let Some(depth) = self.depth {
            config.max_depth = Some(depth);
        }
        if let Some(timestamp) = self.timestamp {
            config.timestamp = timestamp.into();
        }

        Ok(config)
    }
}

/// Timestamp options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CliTimestamp {
    /// Creation time (default)
    Created,
    /// Last access time
    Accessed,
    /// Last modification time
    Modified,
}

impl From<CliTimestamp> for TimestampSource {
    fn from(timestamp: CliTimestamp) -> Self {
        match timestamp {
            CliTimestamp::Created => TimestampSource::Created,
            CliTimestamp::Accessed => TimestampSource::Accessed,
            CliTimestamp::Modified => TimestampSource::Modified,
        }
    }
}

/// Drive a shared counter to a target with lock-guarded jobs.
#[derive(Debug, Parser)]
#[command(name = "pigeon-counter")]
#[command(version, about, long_about = None)]
pub struct CounterCli {
    /// Value at which to stop
    #[arg(short, long, default_value_t = 30)]
    pub target: i64,

    /// Configuration file path
    #[arg(short, long, env = "PIGEON_CONFIG")]
    pub config: Option<PathBuf>,
}

impl CounterCli {
    /// Load the runner configuration, falling back to defaults
    pub fn runner_config(&self) -> anyhow::Result<JobRunnerConfig> {
        match &self.config {
            Some(path) => JobRunnerConfig::from_file(path)
                .with_context(|| format!("Failed to load {}", path.display())),
            None => Ok(JobRunnerConfig::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_watch_defaults() {
        let cli = WatchCli::try_parse_from(["pigeon-watch"]).unwrap();
        assert_eq!(cli.dir, PathBuf::from("."));

        let config = cli.watcher_config().unwrap();
        assert_eq!(config, WatcherConfig::default());
    }

    #[test]
    fn test_watch_overrides_config_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("watch.toml");
        fs::write(&path, "poll_interval_ms = 500\nmax_depth = 4\n").unwrap();

        let cli = WatchCli::try_parse_from([
            "pigeon-watch",
            "/tmp",
            "--config",
            path.to_str().unwrap(),
            "--depth",
            "0",
            "--timestamp",
            "modified",
        ])
        .unwrap();
        let config = cli.watcher_config().unwrap();

        assert_eq!(config.poll_interval(), Duration::from_millis(500));
        assert_eq!(config.max_depth, Some(0));
        assert_eq!(config.timestamp, TimestampSource::Modified);
    }

    #[test]
    fn test_watch_interval_in_seconds() {
        let cli = WatchCli::try_parse_from(["pigeon-watch", "--interval", "3"]).unwrap();
        let config = cli.watcher_config().unwrap();
        assert_eq!(config.poll_interval(), Duration::from_secs(3));
    }

    #[test]
    fn test_invalid_timestamp_rejected() {
        let result = WatchCli::try_parse_from(["pigeon-watch", "--timestamp", "birthday"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_config_file_is_error() {
        let cli = CounterCli::try_parse_from(["pigeon-counter", "--config", "/not/here.toml"])
            .unwrap();
        assert!(cli.runner_config().is_err());
    }

    #[test]
    fn test_counter_default_target() {
        let cli = CounterCli::try_parse_from(["pigeon-counter"]).unwrap();
        assert_eq!(cli.target, 30);
        assert_eq!(cli.runner_config().unwrap(), JobRunnerConfig::default());
    }
}
