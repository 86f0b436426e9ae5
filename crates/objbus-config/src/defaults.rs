use std::env;

use camino::Utf8PathBuf;

use crate::address::BusAddress;
use crate::LogFormat;

/// Environment variable the session bus daemon exports to its clients.
pub const SESSION_BUS_ADDRESS_ENV: &str = "DBUS_SESSION_BUS_ADDRESS";

/// Well-known socket of the system-wide bus.
pub const DEFAULT_SYSTEM_BUS_SOCKET: &str = "/var/run/dbus/system_bus_socket";

/// Default log filter expression.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default log filter expression.
#[must_use]
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format.
#[must_use]
pub fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Address of the system bus.
#[must_use]
pub fn default_system_bus() -> BusAddress {
    BusAddress::unix_path(DEFAULT_SYSTEM_BUS_SOCKET)
}

/// Address of the session bus.
///
/// Prefers the address advertised in [`SESSION_BUS_ADDRESS_ENV`], then the
/// conventional `bus` socket inside the user runtime directory, and finally
/// falls back to `autolaunch:`.
#[must_use]
pub fn default_session_bus() -> BusAddress {
    if let Some(address) = env::var(SESSION_BUS_ADDRESS_ENV)
        .ok()
        .and_then(|value| value.parse::<BusAddress>().ok())
    {
        return address;
    }

    match runtime_base_directory() {
        Some(dir) => BusAddress::unix_path(dir.join("bus")),
        None => BusAddress::autolaunch(),
    }
}

fn runtime_base_directory() -> Option<Utf8PathBuf> {
    dirs::runtime_dir().and_then(|path| Utf8PathBuf::from_path_buf(path).ok())
}
