//! Shared configuration for `objbus` services.
//!
//! Values are layered by `ortho_config`: built-in defaults, then a
//! configuration file, then `OBJBUS_*` environment variables, then command
//! line flags. Applications embedding the registry usually call
//! [`Config::load`] once at startup and pass the result to the bootstrap.

mod address;
mod defaults;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

pub use address::{AddressEntry, BusAddress, BusAddressParseError};
pub use defaults::{
    DEFAULT_LOG_FILTER, DEFAULT_SYSTEM_BUS_SOCKET, SESSION_BUS_ADDRESS_ENV, default_log_filter,
    default_log_filter_string, default_log_format, default_session_bus, default_system_bus,
};

/// Supported logging output formats.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// One JSON object per event.
    #[default]
    Json,
    /// Human-readable single line output.
    Compact,
}

/// Errors encountered while parsing a [`LogFormat`] from text.
pub type LogFormatParseError = strum::ParseError;

/// Resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "OBJBUS")]
pub struct Config {
    /// Address of the per-login session bus.
    #[serde(default = "default_session_bus")]
    #[ortho_config(default = default_session_bus())]
    pub session_bus: BusAddress,
    /// Address of the system-wide bus.
    #[serde(default = "default_system_bus")]
    #[ortho_config(default = default_system_bus())]
    pub system_bus: BusAddress,
    /// `tracing` filter directive, e.g. `info,objbus::dispatch=debug`.
    #[serde(default = "default_log_filter_string")]
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Output format for log events.
    #[serde(default = "default_log_format")]
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            session_bus: default_session_bus(),
            system_bus: default_system_bus(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Address of the session bus.
    #[must_use]
    pub fn session_bus(&self) -> &BusAddress {
        &self.session_bus
    }

    /// Address of the system bus.
    #[must_use]
    pub fn system_bus(&self) -> &BusAddress {
        &self.system_bus
    }

    /// Log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Log output format.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }
}
