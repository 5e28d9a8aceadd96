use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use anyhow::Result;
use tracing::Dispatch;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Layer};

use crate::config::LoggingConfig;

/// Filter directive for this crate. `RUST_LOG` wins when set.
pub fn filter_directive(config: &LoggingConfig, verbose: bool) -> String {
    if let Ok(directive) = std::env::var("RUST_LOG") {
        if !directive.trim().is_empty() {
            return directive;
        }
    }
    let level = if verbose { "debug" } else { config.level.as_str() };
    format!("{}={}", env!("CARGO_CRATE_NAME"), level)
}

/// Build the subscriber: console on stderr plus an append-only log file
/// without ANSI colors. If the file cannot be opened the console layer is
/// kept on its own.
pub fn build_dispatch(config: &LoggingConfig, verbose: bool) -> Dispatch {
    let directive = filter_directive(config, verbose);

    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(EnvFilter::new(&directive));

    let file_layer = config.file.as_deref().and_then(|path| match open_log_file(path) {
        Ok(file) => Some(
            fmt::layer()
                .with_writer(Mutex::new(file))
                .with_target(false)
                .with_ansi(false)
                .with_filter(EnvFilter::new(&directive)),
        ),
        Err(e) => {
            eprintln!("Warning: cannot open log file {}: {}", path.display(), e);
            None
        }
    });

    let subscriber = tracing_subscriber::registry().with(console).with(file_layer);
    Dispatch::new(subscriber)
}

fn open_log_file(path: &Path) -> Result<std::fs::File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(OpenOptions::new().create(true).append(true).open(path)?)
}

/// Install the dispatch for the whole process. Called once from `main`.
pub fn initialize_logging(config: &LoggingConfig, verbose: bool) -> Result<()> {
    let dispatch = build_dispatch(config, verbose);
    tracing::dispatcher::set_global_default(dispatch)
        .map_err(|e| anyhow::anyhow!("failed to install logger: {}", e))?;
    Ok(())
}
