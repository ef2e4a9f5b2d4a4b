//! Tracing setup shared by the binaries.
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::{expand_path, LoggingConfig};
use crate::error::{Error, Result};

const QUIET_TARGETS: [&str; 5] = ["lance", "lancedb", "reqwest", "hyper", "tokenizers"];

fn filter_for(level: &str) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    let mut directives = level.to_string();
    for target in QUIET_TARGETS {
        directives.push_str(&format!(",{target}=warn"));
    }
    EnvFilter::new(directives)
}

/// Installs the global subscriber: stderr output (text or JSON) plus an
/// optional daily-rolling JSON file. Keep the returned guard alive for the
/// lifetime of the process so buffered file output gets flushed.
pub fn init(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let stderr_layer = if config.json {
        tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr).with_filter(filter_for(&config.level)).boxed()
    } else {
        tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr).with_filter(filter_for(&config.level)).boxed()
    };

    let (file_layer, guard) = match config.file_dir.as_deref() {
        Some(dir) => {
            let dir = expand_path(dir);
            std::fs::create_dir_all(&dir)?;
            let appender = tracing_appender::rolling::daily(&dir, "eventrag.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer().json().with_writer(writer).with_filter(filter_for(&config.level)).boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| Error::InvalidConfig(format!("logging already initialised: {e}")))?;
    Ok(guard)
}
