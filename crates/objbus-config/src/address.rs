use std::fmt;
use std::str::FromStr;

use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One `transport:key=value,...` entry of a bus address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressEntry {
    transport: String,
    options: Vec<(String, String)>,
}

impl AddressEntry {
    /// Transport name, for example `unix` or `tcp`.
    #[must_use]
    pub fn transport(&self) -> &str {
        self.transport.as_str()
    }

    /// Looks up the raw (still percent-encoded) value of an option.
    #[must_use]
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    /// Options in declaration order.
    pub fn options(&self) -> impl Iterator<Item = (&str, &str)> {
        self.options
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    fn parse(entry: &str, whole: &str) -> Result<Self, BusAddressParseError> {
        let Some((transport, rest)) = entry.split_once(':') else {
            return Err(BusAddressParseError::MissingTransport(whole.to_owned()));
        };
        if transport.is_empty() {
            return Err(BusAddressParseError::MissingTransport(whole.to_owned()));
        }

        let mut options = Vec::new();
        for pair in rest.split(',').filter(|pair| !pair.is_empty()) {
            let Some((key, value)) = pair.split_once('=') else {
                return Err(BusAddressParseError::MalformedOption {
                    address: whole.to_owned(),
                    option: pair.to_owned(),
                });
            };
            if key.is_empty() {
                return Err(BusAddressParseError::MalformedOption {
                    address: whole.to_owned(),
                    option: pair.to_owned(),
                });
            }
            if options.iter().any(|(existing, _): &(String, String)| existing == key) {
                return Err(BusAddressParseError::DuplicateOption {
                    address: whole.to_owned(),
                    key: key.to_owned(),
                });
            }
            options.push((key.to_owned(), value.to_owned()));
        }

        Ok(Self {
            transport: transport.to_owned(),
            options,
        })
    }
}

impl fmt::Display for AddressEntry {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}:", self.transport)?;
        for (index, (key, value)) in self.options.iter().enumerate() {
            if index > 0 {
                formatter.write_str(",")?;
            }
            write!(formatter, "{key}={value}")?;
        }
        Ok(())
    }
}

/// Bus address as understood by the message-bus transports.
///
/// An address is a `;`-separated list of entries tried in order, each of the
/// form `transport:key=value,...`. The core never connects on its own; the
/// address is handed verbatim to the connector.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct BusAddress {
    entries: Vec<AddressEntry>,
}

impl BusAddress {
    /// Builds a `unix:path=...` address.
    #[must_use]
    pub fn unix_path(path: impl AsRef<Utf8Path>) -> Self {
        Self {
            entries: vec![AddressEntry {
                transport: "unix".to_owned(),
                options: vec![("path".to_owned(), path.as_ref().to_string())],
            }],
        }
    }

    /// Builds an `autolaunch:` address, used when no session bus is known.
    #[must_use]
    pub fn autolaunch() -> Self {
        Self {
            entries: vec![AddressEntry {
                transport: "autolaunch".to_owned(),
                options: Vec::new(),
            }],
        }
    }

    /// Entries in the order a connector should try them.
    #[must_use]
    pub fn entries(&self) -> &[AddressEntry] {
        self.entries.as_slice()
    }

    /// Returns the first entry.
    #[must_use]
    pub fn primary(&self) -> Option<&AddressEntry> {
        self.entries.first()
    }
}

impl fmt::Display for BusAddress {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, entry) in self.entries.iter().enumerate() {
            if index > 0 {
                formatter.write_str(";")?;
            }
            write!(formatter, "{entry}")?;
        }
        Ok(())
    }
}

impl FromStr for BusAddress {
    type Err = BusAddressParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(BusAddressParseError::Empty);
        }

        let entries = trimmed
            .split(';')
            .filter(|entry| !entry.is_empty())
            .map(|entry| AddressEntry::parse(entry, trimmed))
            .collect::<Result<Vec<_>, _>>()?;
        if entries.is_empty() {
            return Err(BusAddressParseError::Empty);
        }
        Ok(Self { entries })
    }
}

impl TryFrom<String> for BusAddress {
    type Error = BusAddressParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BusAddress> for String {
    fn from(address: BusAddress) -> Self {
        address.to_string()
    }
}

/// Errors encountered while parsing a [`BusAddress`] from text.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusAddressParseError {
    /// The address was blank.
    #[error("bus address is empty")]
    Empty,
    /// An entry had no `transport:` prefix.
    #[error("missing transport in bus address '{0}'")]
    MissingTransport(String),
    /// An option was not a `key=value` pair.
    #[error("malformed option '{option}' in bus address '{address}'")]
    MalformedOption {
        /// Full address text.
        address: String,
        /// Offending option text.
        option: String,
    },
    /// The same key appeared twice in one entry.
    #[error("duplicate option '{key}' in bus address '{address}'")]
    DuplicateOption {
        /// Full address text.
        address: String,
        /// Repeated key.
        key: String,
    },
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn parses_unix_path_address() {
        let address: BusAddress = "unix:path=/run/dbus/system_bus_socket"
            .parse()
            .expect("valid address");
        let entry = address.primary().expect("one entry");
        assert_eq!(entry.transport(), "unix");
        assert_eq!(entry.option("path"), Some("/run/dbus/system_bus_socket"));
    }

    #[test]
    fn parses_multiple_entries_in_order() {
        let address: BusAddress = "unix:abstract=/tmp/dbus-x,guid=abc;tcp:host=localhost,port=4000"
            .parse()
            .expect("valid address");
        let transports: Vec<_> = address.entries().iter().map(AddressEntry::transport).collect();
        assert_eq!(transports, ["unix", "tcp"]);
        assert_eq!(address.entries()[1].option("port"), Some("4000"));
    }

    #[test]
    fn display_round_trips_text() {
        let text = "unix:path=/tmp/bus,guid=1234;autolaunch:";
        let address: BusAddress = text.parse().expect("valid address");
        assert_eq!(address.to_string(), text);
    }

    #[test]
    fn unix_path_constructor_matches_parsed_form() {
        let built = BusAddress::unix_path("/var/run/dbus/system_bus_socket");
        let parsed: BusAddress = "unix:path=/var/run/dbus/system_bus_socket"
            .parse()
            .expect("valid address");
        assert_eq!(built, parsed);
    }

    #[rstest]
    #[case("", BusAddressParseError::Empty)]
    #[case("   ", BusAddressParseError::Empty)]
    #[case(";", BusAddressParseError::Empty)]
    #[case("path=/tmp/bus", BusAddressParseError::MissingTransport("path=/tmp/bus".to_owned()))]
    #[case(":path=/tmp/bus", BusAddressParseError::MissingTransport(":path=/tmp/bus".to_owned()))]
    fn rejects_malformed_addresses(#[case] input: &str, #[case] expected: BusAddressParseError) {
        let error = input.parse::<BusAddress>().expect_err("address should fail");
        assert_eq!(error, expected);
    }

    #[test]
    fn rejects_option_without_value_separator() {
        let error = "unix:path".parse::<BusAddress>().expect_err("should fail");
        assert!(matches!(error, BusAddressParseError::MalformedOption { .. }));
    }

    #[test]
    fn rejects_duplicate_keys() {
        let error = "unix:path=/a,path=/b"
            .parse::<BusAddress>()
            .expect_err("should fail");
        assert!(matches!(
            error,
            BusAddressParseError::DuplicateOption { ref key, .. } if key == "path"
        ));
    }
}
