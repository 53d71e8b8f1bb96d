//! Tracing setup for the command line tool.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::HenhouseConfig;

/// Build the event filter; `RUST_LOG` wins over the configured filter.
pub fn env_filter(config: &HenhouseConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize tracing to stderr, or to a daily rotating file.
///
/// The returned guard flushes the file writer on drop and must be kept alive
/// for the life of the process.
pub fn init_logging(config: &HenhouseConfig) -> Option<WorkerGuard> {
    if !config.log_to_file {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter(config))
            .with_writer(std::io::stderr)
            .init();
        return None;
    }

    let log_dir = config.log_dir();
    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        eprintln!("Failed to create log directory {:?}: {}", log_dir, e);
        // Fall back to stderr logging
        tracing_subscriber::fmt()
            .with_env_filter(env_filter(config))
            .with_writer(std::io::stderr)
            .init();
        return None;
    }

    let file_appender = tracing_appender::rolling::daily(&log_dir, "henhouse.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter(config))
        .with_ansi(false) // No ANSI colors in log files
        .init();

    tracing::info!("Logging initialized to {:?}", log_dir);
    Some(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_filter_accepts_config_directives() {
        let config = HenhouseConfig {
            log_filter: "henhouse=debug,rusqlite=warn".to_string(),
            ..Default::default()
        };
        let filter = env_filter(&config);
        assert!(!filter.to_string().is_empty());
    }
}
