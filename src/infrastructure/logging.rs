//! Logging system configuration and initialization
//!
//! - Console and/or file output
//! - Optional JSON formatting
//! - `RUST_LOG` overrides the configured filter entirely
//! - Dependency noise (reqwest, hyper, html5ever) is suppressed unless TRACE is requested

use anyhow::{Result, anyhow};
use lazy_static::lazy_static;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::info;
use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub use crate::infrastructure::config::LoggingConfig;

// Keeps the non-blocking file writer alive for the lifetime of the process
lazy_static! {
    static ref LOG_GUARDS: Mutex<Vec<WorkerGuard>> = Mutex::new(Vec::new());
}

/// Log directory next to the executable, falling back to the working directory
pub fn get_log_directory() -> PathBuf {
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(std::path::Path::to_path_buf))
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_default());

    exe_dir.join("logs")
}

/// Build the filter used when `RUST_LOG` is not set
pub fn build_env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    let mut filter = EnvFilter::try_new(&config.level)
        .map_err(|e| anyhow!("Invalid log level '{}': {}", config.level, e))?;

    if !config.level.to_lowercase().contains("trace") {
        for directive in [
            "reqwest=info",
            "hyper=warn",
            "hyper_util=warn",
            "h2=warn",
            "html5ever=warn",
            "selectors=warn",
        ] {
            filter = filter.add_directive(
                directive
                    .parse()
                    .map_err(|e| anyhow!("Invalid directive '{}': {}", directive, e))?,
            );
        }
    }

    for (module, level) in &config.module_filters {
        let directive = format!("{module}={level}");
        filter = filter.add_directive(
            directive
                .parse()
                .map_err(|e| anyhow!("Invalid module filter '{}': {}", directive, e))?,
        );
    }

    Ok(filter)
}

/// Initialize logging with custom configuration
pub fn init_logging_with_config(config: &LoggingConfig) -> Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => build_env_filter(config)?,
    };

    let registry = Registry::default().with(env_filter);

    let console_layer = config.console_output.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
    });

    let (file_writer, log_dir) = if config.file_output {
        let log_dir = config.log_dir.clone().unwrap_or_else(get_log_directory);
        std::fs::create_dir_all(&log_dir)
            .map_err(|e| anyhow!("Failed to create log directory {:?}: {}", log_dir, e))?;

        let appender = match config.rotation.as_str() {
            "daily" => rolling::daily(&log_dir, &config.file_name),
            _ => rolling::never(&log_dir, &config.file_name),
        };
        let (writer, guard) = non_blocking(appender);
        LOG_GUARDS
            .lock()
            .map_err(|_| anyhow!("Log guard registry poisoned"))?
            .push(guard);
        (Some(writer), Some(log_dir))
    } else {
        (None, None)
    };

    if console_layer.is_none() && file_writer.is_none() {
        return Err(anyhow!("No logging output configured"));
    }

    let init_result = if config.json_format {
        let file_layer = file_writer.map(|writer| {
            fmt::layer()
                .json()
                .with_writer(writer)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_ansi(false)
        });
        registry.with(console_layer).with(file_layer).try_init()
    } else {
        let file_layer = file_writer.map(|writer| {
            fmt::layer()
                .with_writer(writer)
                .with_target(false)
                .with_ansi(false)
        });
        registry.with(console_layer).with(file_layer).try_init()
    };
    init_result.map_err(|e| anyhow!("Failed to install tracing subscriber: {}", e))?;

    info!("Logging system initialized");
    info!("Log level: {}", config.level);
    if let Some(log_dir) = log_dir {
        info!("Log directory: {:?}", log_dir);
    }

    Ok(())
}
