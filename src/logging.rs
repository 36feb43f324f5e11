//! Logging setup: stderr at the configured level, plus an optional daily
//! log file (`repodeck_YYYYMMDD.log`) that always records debug output.

use chrono::{Local, NaiveDate};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// `dir/repodeck_20240501.log`
pub fn daily_log_path(dir: &Path, date: NaiveDate) -> PathBuf {
    dir.join(format!("repodeck_{}.log", date.format("%Y%m%d")))
}

/// Open (append) today's log file under `dir`, creating the directory.
pub fn open_daily_log(dir: &Path, date: NaiveDate) -> io::Result<File> {
    fs::create_dir_all(dir)?;
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(daily_log_path(dir, date))
}

/// Install the global subscriber. `RUST_LOG` overrides `level` for stderr.
/// A log file that cannot be opened is reported and skipped.
pub fn init(level: &str, log_dir: Option<&Path>) {
    let stderr_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("repodeck={}", level)));
    let stderr_layer = fmt::layer()
        .with_target(false)
        .with_writer(io::stderr)
        .with_filter(stderr_filter);

    let mut open_error = None;
    let file_layer = log_dir.and_then(|dir| match open_daily_log(dir, Local::now().date_naive()) {
        Ok(file) => Some(
            fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .with_filter(EnvFilter::new("repodeck=debug")),
        ),
        Err(e) => {
            open_error = Some((dir.to_path_buf(), e));
            None
        }
    });

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .init();

    if let Some((dir, e)) = open_error {
        tracing::warn!(dir = %dir.display(), error = %e, "cannot open log file, logging to stderr only");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_daily_log_path() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        assert_eq!(
            daily_log_path(Path::new("/tmp/logs"), date),
            PathBuf::from("/tmp/logs/repodeck_20240501.log")
        );
    }

    #[test]
    fn test_open_daily_log_appends() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("nested").join("logs");
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();

        writeln!(open_daily_log(&dir, date).unwrap(), "first").unwrap();
        writeln!(open_daily_log(&dir, date).unwrap(), "second").unwrap();

        let content = fs::read_to_string(daily_log_path(&dir, date)).unwrap();
        assert_eq!(content, "first\nsecond\n");
    }
}
