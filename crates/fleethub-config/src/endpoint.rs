use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// TCP address the hub listens on for device sessions.
///
/// Parses from either `tcp://host:port` or a bare `host:port` pair and
/// serialises back to the URL form, so the same text works in configuration
/// files, environment variables, and command-line flags.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct ListenEndpoint {
    host: String,
    port: u16,
}

impl ListenEndpoint {
    /// Builds an endpoint from its parts.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Host name or address to bind.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// TCP port to bind. Zero asks the OS for an ephemeral port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for ListenEndpoint {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(formatter, "tcp://[{}]:{}", self.host, self.port)
        } else {
            write!(formatter, "tcp://{}:{}", self.host, self.port)
        }
    }
}

impl FromStr for ListenEndpoint {
    type Err = EndpointParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        if input.contains("://") {
            return parse_url(input);
        }
        parse_host_port(input)
    }
}

impl TryFrom<String> for ListenEndpoint {
    type Error = EndpointParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ListenEndpoint> for String {
    fn from(endpoint: ListenEndpoint) -> Self {
        endpoint.to_string()
    }
}

fn parse_url(input: &str) -> Result<ListenEndpoint, EndpointParseError> {
    let url = Url::parse(input)?;
    if url.scheme() != "tcp" {
        return Err(EndpointParseError::UnsupportedScheme(
            url.scheme().to_owned(),
        ));
    }
    let host = url
        .host_str()
        .filter(|host| !host.is_empty())
        .ok_or_else(|| EndpointParseError::MissingHost(input.to_owned()))?;
    let port = url
        .port()
        .ok_or_else(|| EndpointParseError::MissingPort(input.to_owned()))?;
    // `Url` keeps the brackets around IPv6 literals; the socket resolver does not.
    let host = host.trim_start_matches('[').trim_end_matches(']');
    Ok(ListenEndpoint::new(host, port))
}

fn parse_host_port(input: &str) -> Result<ListenEndpoint, EndpointParseError> {
    let Some((host, port)) = input.rsplit_once(':') else {
        return Err(EndpointParseError::MissingPort(input.to_owned()));
    };
    if host.is_empty() {
        return Err(EndpointParseError::MissingHost(input.to_owned()));
    }
    let port = port
        .parse::<u16>()
        .map_err(|_| EndpointParseError::InvalidPort(input.to_owned()))?;
    Ok(ListenEndpoint::new(host, port))
}

/// Errors encountered while parsing a [`ListenEndpoint`] from text.
#[derive(Debug, Error)]
pub enum EndpointParseError {
    /// Scheme was not recognised.
    #[error("unsupported listen scheme '{0}'")]
    UnsupportedScheme(String),
    /// TCP host name was missing.
    #[error("missing TCP host in '{0}'")]
    MissingHost(String),
    /// TCP port was missing from the address.
    #[error("missing TCP port in '{0}'")]
    MissingPort(String),
    /// TCP port was not a number in range.
    #[error("invalid TCP port in '{0}'")]
    InvalidPort(String),
    /// URL failed to parse.
    #[error(transparent)]
    Url(#[from] url::ParseError),
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn display_uses_tcp_url() {
        let endpoint = ListenEndpoint::new("0.0.0.0", 8080);
        assert_eq!(endpoint.to_string(), "tcp://0.0.0.0:8080");
    }

    #[rstest]
    #[case("tcp://127.0.0.1:9000", "127.0.0.1", 9000)]
    #[case("127.0.0.1:9000", "127.0.0.1", 9000)]
    #[case("localhost:0", "localhost", 0)]
    #[case("tcp://[::1]:8080", "::1", 8080)]
    fn parses_supported_forms(#[case] input: &str, #[case] host: &str, #[case] port: u16) {
        let endpoint: ListenEndpoint = input.parse().expect("endpoint should parse");
        assert_eq!(endpoint.host(), host);
        assert_eq!(endpoint.port(), port);
    }

    #[rstest]
    #[case("unix:///tmp/hub.sock")]
    #[case("tcp://127.0.0.1")]
    #[case(":8080")]
    #[case("127.0.0.1:http")]
    #[case("127.0.0.1")]
    fn rejects_malformed_forms(#[case] input: &str) {
        assert!(input.parse::<ListenEndpoint>().is_err(), "{input} should fail");
    }
}
