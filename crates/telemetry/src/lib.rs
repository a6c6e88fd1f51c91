//! Logging and tracing bootstrap.

use anyhow::anyhow;
use bookstore_kernel::settings::{LogFormat, TelemetrySettings};
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured filter directive. Fails if a global
/// subscriber is already installed.
pub fn init(settings: &TelemetrySettings) -> anyhow::Result<()> {
    let env_directive = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = build_filter(env_directive.as_deref(), &settings.filter)?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match settings.log_format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().flatten_event(true).try_init(),
    }
    .map_err(|err| anyhow!("failed to install tracing subscriber: {}", err))?;

    tracing::info!(
        target: "bookstore-telemetry",
        format = ?settings.log_format,
        "telemetry initialized"
    );

    Ok(())
}

/// Parse `env_directive` if it is set and valid, otherwise `fallback`.
fn build_filter(env_directive: Option<&str>, fallback: &str) -> anyhow::Result<EnvFilter> {
    if let Some(filter) = env_directive.and_then(|directive| EnvFilter::try_new(directive).ok()) {
        return Ok(filter);
    }

    EnvFilter::try_new(fallback).map_err(|err| anyhow!("invalid log filter '{}': {}", fallback, err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_fallback_is_reported() {
        let err = build_filter(None, "bookstore=loud").unwrap_err();
        assert!(err.to_string().contains("invalid log filter 'bookstore=loud'"));
    }

    #[test]
    fn env_directive_wins() {
        let filter = build_filter(Some("bookstore=debug"), "bookstore=loud").unwrap();
        assert_eq!(filter.to_string(), "bookstore=debug");
    }

    #[test]
    fn invalid_env_directive_falls_back() {
        let filter = build_filter(Some("bookstore=loud"), "warn").unwrap();
        assert_eq!(filter.to_string(), "warn");
    }
}
