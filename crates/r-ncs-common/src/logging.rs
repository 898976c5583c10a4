//! ---
//! ncs_section: "01-core-functionality"
//! ncs_subsection: "module"
//! ncs_type: "source"
//! ncs_scope: "code"
//! ncs_description: "Shared primitives and utilities for the console runtime."
//! ncs_version: "v0.0.0-prealpha"
//! ncs_owner: "tbd"
//! ---
use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::daily;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::registry::Registry;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LoggingConfig;

const LOG_ENV: &str = "R_NCS_LOG";
const DEFAULT_DIRECTIVE: &str = "info";

/// Writer guards; dropping them would lose buffered lines.
static GUARDS: OnceCell<[WorkerGuard; 2]> = OnceCell::new();

/// Format of the stderr log stream. The file log is always JSON.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    StructuredJson,
    #[default]
    Pretty,
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Install the process-wide subscriber.
///
/// * `R_NCS_LOG` overrides the log filter (e.g. `info`, `debug,r_ncs_apps=trace`).
///   When unset the standard `RUST_LOG` variable is honoured, finally defaulting to
///   `info`.
/// * Console output goes to stderr so it never interleaves with command output on
///   stdout, while a rolling daily JSON file keeps the operational log.
///
/// A second call keeps the first subscriber.
pub fn init_tracing(service_name: &str, config: &LoggingConfig) -> Result<()> {
    std::fs::create_dir_all(&config.directory).with_context(|| {
        format!("unable to create log directory {}", config.directory.display())
    })?;
    let prefix = config.file_prefix.as_deref().unwrap_or(service_name);

    let (file_writer, file_guard) =
        tracing_appender::non_blocking(daily(&config.directory, format!("{prefix}.log")));
    let (stderr_writer, stderr_guard) = tracing_appender::non_blocking(std::io::stderr());
    let _ = GUARDS.set([file_guard, stderr_guard]);

    let layers = vec![
        console_layer(config.format, stderr_writer),
        fmt::layer()
            .with_target(true)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .json()
            .with_writer(file_writer)
            .boxed(),
    ];

    let installed = tracing_subscriber::registry()
        .with(layers)
        .with(env_filter(std::env::var(LOG_ENV).ok()))
        .try_init()
        .is_ok();

    info!(
        service = %service_name,
        log_dir = %config.directory.display(),
        format = ?config.format,
        installed,
        "tracing initialised"
    );
    Ok(())
}

fn console_layer(format: LogFormat, writer: NonBlocking) -> BoxedLayer {
    match format {
        LogFormat::StructuredJson => fmt::layer()
            .with_target(false)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .json()
            .with_writer(writer)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .with_target(false)
            .without_time()
            .with_writer(writer)
            .boxed(),
    }
}

/// Filter from an explicit directive, else `RUST_LOG`, else `info`.
fn env_filter(directive: Option<String>) -> EnvFilter {
    match directive {
        Some(directive) => EnvFilter::try_new(&directive).unwrap_or_else(|err| {
            eprintln!("invalid {LOG_ENV} directive '{directive}' ({err}); using {DEFAULT_DIRECTIVE}");
            EnvFilter::new(DEFAULT_DIRECTIVE)
        }),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn explicit_directive_wins() {
        let filter = env_filter(Some("debug,r_ncs_apps=trace".to_owned()));
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::TRACE));
    }

    #[test]
    fn invalid_directive_falls_back_to_info() {
        let filter = env_filter(Some("r_ncs=loud".to_owned()));
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::INFO));
    }

    #[test]
    fn log_format_uses_kebab_case() {
        #[derive(Deserialize)]
        struct Holder {
            format: LogFormat,
        }
        let holder: Holder = toml::from_str("format = \"structured-json\"").unwrap();
        assert_eq!(holder.format, LogFormat::StructuredJson);
        assert_eq!(LogFormat::default(), LogFormat::Pretty);
    }
}
