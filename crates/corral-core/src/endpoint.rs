//! Network endpoints of server processes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Address of one server process.
///
/// Endpoints are immutable once declared and are written as `host:port`
/// everywhere they appear on the wire or in topology files.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Endpoint {
    host: String,
    port: u16,
}

impl Endpoint {
    /// Creates an endpoint from its parts.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Shorthand for a loopback endpoint on `127.0.0.1`.
    #[must_use]
    pub fn loopback(port: u16) -> Self {
        Self::new("127.0.0.1", port)
    }

    /// Returns the host part.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for Endpoint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |message: &str| Error::InvalidEndpoint {
            input: s.to_string(),
            message: message.to_string(),
        };

        let (host, port) = s.rsplit_once(':').ok_or_else(|| invalid("missing port"))?;
        if host.is_empty() {
            return Err(invalid("missing host"));
        }
        if host.contains('/') {
            return Err(invalid("host must not contain '/'"));
        }
        let port = port
            .parse::<u16>()
            .map_err(|e| invalid(&format!("port must be a u16: {e}")))?;
        if port == 0 {
            return Err(invalid("port must be non-zero"));
        }

        Ok(Self::new(host, port))
    }
}

impl TryFrom<String> for Endpoint {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Endpoint> for String {
    fn from(endpoint: Endpoint) -> Self {
        endpoint.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_host_and_port() {
        let endpoint: Endpoint = "127.0.0.1:40011".parse().unwrap();
        assert_eq!(endpoint.host(), "127.0.0.1");
        assert_eq!(endpoint.port(), 40011);
        assert_eq!(endpoint.to_string(), "127.0.0.1:40011");
    }

    #[test]
    fn test_parse_rejects_malformed_input() {
        assert!("localhost".parse::<Endpoint>().is_err());
        assert!(":40011".parse::<Endpoint>().is_err());
        assert!("localhost:port".parse::<Endpoint>().is_err());
        assert!("localhost:0".parse::<Endpoint>().is_err());
        assert!("rs1/localhost:40011".parse::<Endpoint>().is_err());
    }

    #[test]
    fn test_serde_uses_string_form() {
        let endpoint = Endpoint::new("localhost", 40101);
        let json = serde_json::to_string(&endpoint).unwrap();
        assert_eq!(json, "\"localhost:40101\"");

        let back: Endpoint = serde_json::from_str(&json).unwrap();
        assert_eq!(back, endpoint);
        assert!(serde_json::from_str::<Endpoint>("\"nope\"").is_err());
    }
}
