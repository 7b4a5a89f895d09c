//! Tracing setup
//!
//! Stderr gets warnings (more with `-v`), or whatever `RUST_LOG` asks for.
//! Every run also writes a debug-level log file named after its start time.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::{expand_path, LoggingConfig};

/// `<dir>/<YYYYmmdd_HHMMSS>.log`
pub fn log_file_path(dir: &Path, started: DateTime<Local>) -> PathBuf {
    dir.join(format!("{}.log", started.format("%Y%m%d_%H%M%S")))
}

fn stderr_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Install the global subscriber; returns the log file path when file logging is on
pub fn init(config: &LoggingConfig, verbose: u8) -> Result<Option<PathBuf>> {
    let stderr_filter = if verbose == 0 {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(stderr_level(0)))
    } else {
        EnvFilter::new(format!("fin_agent={}", stderr_level(verbose)))
    };
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(stderr_filter);

    let mut log_path = None;
    let mut text_layer = None;
    let mut json_layer = None;

    if config.file {
        let dir = expand_path(&config.dir)?;
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;
        let path = log_file_path(&dir, Local::now());
        let file = File::create(&path)
            .with_context(|| format!("Failed to create log file: {}", path.display()))?;

        let file_filter = EnvFilter::new("fin_agent=debug,info");
        if config.json {
            json_layer = Some(
                fmt::layer()
                    .json()
                    .with_writer(Mutex::new(file))
                    .with_filter(file_filter),
            );
        } else {
            text_layer = Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .with_filter(file_filter),
            );
        }
        log_path = Some(path);
    }

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(text_layer)
        .with(json_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(log_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_log_file_name() {
        let started = Local.with_ymd_and_hms(2025, 3, 9, 14, 5, 7).unwrap();
        let path = log_file_path(Path::new("debug"), started);
        assert_eq!(path, PathBuf::from("debug/20250309_140507.log"));
    }

    #[test]
    fn test_stderr_levels() {
        assert_eq!(stderr_level(0), "warn");
        assert_eq!(stderr_level(1), "info");
        assert_eq!(stderr_level(7), "trace");
    }
}
