//! ---
//! cb_section: "01-logging"
//! cb_subsection: "module"
//! cb_type: "source"
//! cb_scope: "code"
//! cb_description: "Console and rolling-file tracing for study runs."
//! cb_version: "v0.1.0"
//! cb_owner: "protection-studies"
//! ---
use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::daily;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LoggingConfig;

const LOG_ENV: &str = "CAPBANK_LOG";

/// Console format. The log file is always structured JSON.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    #[default]
    StructuredJson,
    Pretty,
}

/// Keeps the file writer alive; buffered events are flushed when it drops.
#[must_use = "dropping the guard stops the log file writer"]
#[derive(Debug)]
pub struct TracingGuard(WorkerGuard);

/// Install the global subscriber: console events on stderr plus a daily JSON file.
///
/// Stdout stays free for tables and exported documents. The filter comes from
/// `CAPBANK_LOG`, then `RUST_LOG`, then `info`.
pub fn init_tracing(service_name: &str, config: &LoggingConfig) -> Result<TracingGuard> {
    std::fs::create_dir_all(&config.directory)?;
    let prefix = config.file_prefix.as_deref().unwrap_or(service_name);
    let file_name = format!("{prefix}.log");

    let file_appender = daily(&config.directory, &file_name);
    let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);

    let filter = match std::env::var(LOG_ENV) {
        Ok(directive) => EnvFilter::try_new(&directive).unwrap_or_else(|err| {
            eprintln!("invalid {LOG_ENV} directive '{directive}' ({err}); using info");
            EnvFilter::new("info")
        }),
        Err(_) => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    let console_layer = match config.format {
        LogFormat::StructuredJson => fmt::layer()
            .with_target(false)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .json()
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .with_target(true)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_writer(std::io::stderr)
            .boxed(),
    };

    let file_layer = fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .json()
        .with_writer(file_writer)
        .boxed();

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .ok();

    info!(
        service = %service_name,
        log_file = %config.directory.join(&file_name).display(),
        format = ?config.format,
        "tracing initialised"
    );
    Ok(TracingGuard(file_guard))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_flushes_log_file_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let config = LoggingConfig {
            directory: dir.path().join("logs"),
            format: LogFormat::Pretty,
            file_prefix: Some("unit-test".into()),
        };
        let guard = init_tracing("capbank-test", &config).unwrap();
        info!(study = "flush-check", "study finished");
        drop(guard);

        let mut contents = String::new();
        for entry in std::fs::read_dir(&config.directory).unwrap() {
            let path = entry.unwrap().path();
            let name = path.file_name().unwrap().to_string_lossy().into_owned();
            assert!(name.starts_with("unit-test.log"), "unexpected file {name}");
            contents.push_str(&std::fs::read_to_string(&path).unwrap());
        }
        assert!(contents.contains("tracing initialised"));
        assert!(contents.contains("flush-check"));
    }
}
