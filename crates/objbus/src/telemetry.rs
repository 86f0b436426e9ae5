//! Structured telemetry initialisation.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use tracing::{Subscriber, info, subscriber::SetGlobalDefaultError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

use objbus_config::{Config, LogFormat};

use crate::dispatch::DISPATCH_TARGET;

const TELEMETRY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::telemetry");

/// Level applied to per-call dispatch events unless the filter names them.
const QUIET_DISPATCH_LEVEL: &str = "warn";

static TELEMETRY_GUARD: OnceCell<()> = OnceCell::new();

/// Handle returned when telemetry has been initialised.
#[derive(Debug, Default, Clone, Copy)]
pub struct TelemetryHandle;

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The configured log filter expression did not parse.
    #[error("invalid log filter: {0}")]
    Filter(String),
    /// Another global subscriber was already installed.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(SetGlobalDefaultError),
}

/// Installs the global tracing subscriber on first use.
///
/// Later calls return a fresh [`TelemetryHandle`] without touching global
/// state, whatever configuration they pass.
///
/// # Errors
///
/// Returns [`TelemetryError::Filter`] for an unparsable
/// [`Config::log_filter`] and [`TelemetryError::Subscriber`] when a
/// subscriber from elsewhere already owns the global slot.
pub fn initialise(config: &Config) -> Result<TelemetryHandle, TelemetryError> {
    TELEMETRY_GUARD
        .get_or_try_init(|| install_subscriber(config))
        .map(|_| TelemetryHandle)
}

/// Parses the configured filter, keeping dispatch events quiet unless a
/// directive targets them explicitly.
fn build_filter(expression: &str) -> Result<EnvFilter, TelemetryError> {
    let expression = if expression.contains(DISPATCH_TARGET) {
        expression.to_owned()
    } else if expression.trim().is_empty() {
        format!("{DISPATCH_TARGET}={QUIET_DISPATCH_LEVEL}")
    } else {
        format!("{expression},{DISPATCH_TARGET}={QUIET_DISPATCH_LEVEL}")
    };
    EnvFilter::try_new(&expression).map_err(|error| TelemetryError::Filter(error.to_string()))
}

fn install_subscriber(config: &Config) -> Result<(), TelemetryError> {
    let filter = build_filter(config.log_filter())?;

    let builder = |filter: EnvFilter| {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .with_level(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_writer(io::stderr)
            .with_ansi(io::stderr().is_terminal())
            .with_timer(fmt::time::UtcTime::rfc_3339())
    };

    let subscriber: Box<dyn Subscriber + Send + Sync> = match config.log_format() {
        LogFormat::Json => Box::new(builder(filter).json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(builder(filter).compact().finish()),
    };

    tracing::subscriber::set_global_default(subscriber).map_err(TelemetryError::Subscriber)?;
    info!(
        target: TELEMETRY_TARGET,
        format = %config.log_format(),
        filter = config.log_filter(),
        "telemetry installed"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn initialise_is_idempotent() {
        let config = Config::default();
        initialise(&config).expect("first initialisation");
        initialise(&config).expect("second initialisation");
    }

    #[test]
    fn rejects_unparsable_filters_before_installing() {
        let config = Config {
            log_filter: "objbus=loudest".to_owned(),
            ..Config::default()
        };
        let error = install_subscriber(&config).expect_err("filter should not parse");
        assert!(matches!(error, TelemetryError::Filter(_)));
    }

    #[rstest]
    #[case("info")]
    #[case("objbus::registry=trace")]
    #[case("")]
    fn dispatch_events_stay_quiet_by_default(#[case] expression: &str) {
        let filter = build_filter(expression).expect("filter parses");
        assert!(
            filter.to_string().contains("objbus::dispatch=warn"),
            "{filter} should quieten dispatch"
        );
    }

    #[test]
    fn explicit_dispatch_directives_are_kept() {
        let filter = build_filter("info,objbus::dispatch=trace").expect("filter parses");
        let rendered = filter.to_string();
        assert!(rendered.contains("objbus::dispatch=trace"), "{rendered}");
        assert!(!rendered.contains("objbus::dispatch=warn"), "{rendered}");
    }
}
