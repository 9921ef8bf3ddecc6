//! Logging initialisation.
//!
//! Logs always go to stderr, filtered by `RUST_LOG` (default `info`). When
//! `HOVERCLIP_LOG=1` is set or the config enables file logging, they are also
//! written to `hoverclip/hoverclip.log` under the user data directory.
//!
//! Keep the returned guard alive for the duration of the process so buffered
//! lines are flushed on exit.

use std::io;
use std::path::PathBuf;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LogConfig;

pub struct LogGuard {
    _file_guard: Option<tracing_appender::non_blocking::WorkerGuard>,
}

pub fn init(config: &LogConfig) -> LogGuard {
    let default_filter = config.filter.as_deref().unwrap_or("info");
    let filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let file_enabled = config.file || std::env::var("HOVERCLIP_LOG").as_deref() == Ok("1");

    let file_dir = file_enabled.then(|| prepare_log_dir(log_dir().unwrap_or_else(std::env::temp_dir)));

    let file_guard = match file_dir {
        Some(Ok(dir)) => {
            let file_appender = tracing_appender::rolling::never(&dir, "hoverclip.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

            tracing_subscriber::registry()
                .with(filter())
                .with(fmt::layer().with_writer(std::io::stderr))
                .with(file_layer)
                .init();

            tracing::info!(dir = %dir.display(), "file logging enabled");
            Some(guard)
        }
        other => {
            tracing_subscriber::registry()
                .with(filter())
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();

            if let Some(Err((dir, error))) = other {
                tracing::warn!(dir = %dir.display(), %error, "cannot create log directory, logging to stderr only");
            }
            None
        }
    };

    LogGuard {
        _file_guard: file_guard,
    }
}

fn prepare_log_dir(dir: PathBuf) -> Result<PathBuf, (PathBuf, io::Error)> {
    match std::fs::create_dir_all(&dir) {
        Ok(()) => Ok(dir),
        Err(error) => Err((dir, error)),
    }
}

fn log_dir() -> Option<PathBuf> {
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        let mut p = PathBuf::from(xdg);
        p.push("hoverclip");
        return Some(p);
    }
    let home = std::env::var("HOME").ok()?;
    let mut p = PathBuf::from(home);
    #[cfg(target_os = "macos")]
    {
        p.push("Library");
        p.push("Logs");
    }
    #[cfg(not(target_os = "macos"))]
    {
        p.push(".local");
        p.push("share");
    }
    p.push("hoverclip");
    Some(p)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_dir_under_a_file_is_reported() {
        let blocker = std::env::temp_dir().join(format!("hoverclip-log-blocker-{}", std::process::id()));
        std::fs::write(&blocker, b"").unwrap();

        let dir = blocker.join("logs");
        let (failed, error) = prepare_log_dir(dir.clone()).unwrap_err();
        assert_eq!(failed, dir);
        assert_ne!(error.kind(), io::ErrorKind::NotFound);

        std::fs::remove_file(&blocker).unwrap();
    }

    #[test]
    fn existing_log_dir_is_accepted() {
        let dir = std::env::temp_dir();
        assert_eq!(prepare_log_dir(dir.clone()).unwrap(), dir);
    }
}
