//! Process-level setup: configuration, telemetry and the bus context.

use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use thiserror::Error;
use tracing::info;

use objbus_config::Config;

use crate::context::{BusConnector, BusContext, CONTEXT_TARGET};
use crate::telemetry::{self, TelemetryError};

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the configuration.
    ///
    /// # Errors
    ///
    /// Returns the layered loader's error.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
}

/// Loads configuration, installs telemetry and builds a [`BusContext`].
///
/// No connection is opened; the context dials each bus on first use.
///
/// # Errors
///
/// Returns [`BootstrapError::Configuration`] when the loader fails and
/// [`BootstrapError::Telemetry`] when the subscriber cannot be installed.
pub fn bootstrap_with<C>(
    loader: &dyn ConfigLoader,
    connector: C,
) -> Result<BusContext<C>, BootstrapError>
where
    C: BusConnector,
{
    let config = loader
        .load()
        .map_err(|source| BootstrapError::Configuration { source })?;
    telemetry::initialise(&config).map_err(|source| BootstrapError::Telemetry { source })?;

    info!(
        target: CONTEXT_TARGET,
        session_bus = %config.session_bus(),
        system_bus = %config.system_bus(),
        "bus context ready"
    );
    Ok(BusContext::new(config, connector))
}

/// [`bootstrap_with`] using [`SystemConfigLoader`].
///
/// # Errors
///
/// See [`bootstrap_with`].
pub fn bootstrap<C>(connector: C) -> Result<BusContext<C>, BootstrapError>
where
    C: BusConnector,
{
    bootstrap_with(&SystemConfigLoader, connector)
}
