//! Logging setup for the admin binary and embedding crawlers.
//!
//! - Human-readable output on stderr so command output on stdout stays clean
//! - Optional daily-rotated JSON file in a dedicated folder
//! - `RUST_LOG` filtering, defaulting to "info"

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Build the env filter, falling back to `default_level` when `RUST_LOG` is unset.
pub fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize the tracing subscriber.
///
/// When `log_dir` is given, structured JSON logs are also written to
/// `<log_dir>/crawl-state.json.log`, rotated daily. The returned guard flushes
/// the background writer on drop and must be kept alive by the caller.
///
/// # Environment Variables
/// * `RUST_LOG` - Controls log level filtering (default: "info")
///   Examples:
///   - `RUST_LOG=debug`
///   - `RUST_LOG=crawl_state_redis=trace,redis=warn`
pub fn init_logging(
    log_dir: Option<&Path>,
    verbose: bool,
) -> Result<Option<WorkerGuard>, Box<dyn std::error::Error>> {
    let default_level = if verbose { "debug" } else { "info" };

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .with_filter(env_filter(default_level));

    let (json_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, "crawl-state.json.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .json()
                .with_writer(writer)
                .with_target(true)
                .with_thread_ids(true)
                .with_line_number(true)
                .with_current_span(true)
                .with_span_list(true)
                .with_filter(env_filter(default_level));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .try_init()?;

    if let Some(dir) = log_dir {
        tracing::debug!("JSON logs: {}/crawl-state.json.log", dir.display());
    }

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_env_filter_fallback() {
        // An invalid directive never panics, it falls back to info.
        let filter = env_filter("not a [valid directive");
        assert!(!filter.to_string().is_empty());
    }

    #[test]
    fn test_logging_initialization() {
        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join("logs");

        // A second init in the same process fails instead of panicking,
        // either way the directory is created first.
        let _ = init_logging(Some(log_path.as_path()), false);
        assert!(log_path.exists());
    }
}
