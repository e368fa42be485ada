use serde::{Deserialize, Serialize};
use std::fmt;

const DUMMY_TLS_KEY: &str = include_str!("../fixtures/key.pem");
const DUMMY_TLS_CERT: &str = include_str!("../fixtures/cert.pem");

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Http,
    Https,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Http => f.write_str("http"),
            Protocol::Https => f.write_str("https"),
        }
    }
}

/// Partial server settings supplied by a test.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpServerConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<Protocol>,
    /// PEM encoded private key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// PEM encoded certificate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cert: Option<String>,
    /// PKCS#12 bundle, used instead of `key` and `cert`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pfx: Option<Vec<u8>>,
}

/// Complete server settings returned by [`given_http_server_config`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub protocol: Protocol,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cert: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pfx: Option<Vec<u8>>,
}

impl ServerConfig {
    pub fn is_tls(&self) -> bool {
        self.protocol == Protocol::Https
    }

    /// `protocol://host:port`, for building request URIs once the server is
    /// listening. Port 0 is kept as is.
    pub fn base_uri(&self) -> Result<http::Uri, http::uri::InvalidUri> {
        format!("{}://{}:{}", self.protocol, self.host, self.port).parse()
    }
}

/// Server settings that work well in test environments.
///
/// The host defaults to IPv4 `127.0.0.1` and the port to `0`, so the OS
/// picks a free ephemeral port. With `protocol: https` a dummy key and
/// certificate are filled in, unless the caller supplied both `key` and
/// `cert` or a `pfx` bundle.
pub fn given_http_server_config(custom: Option<HttpServerConfig>) -> ServerConfig {
    let custom = custom.unwrap_or_default();
    let mut config = ServerConfig {
        host: custom.host.unwrap_or_else(|| "127.0.0.1".to_string()),
        port: custom.port.unwrap_or(0),
        protocol: custom.protocol.unwrap_or_default(),
        key: custom.key,
        cert: custom.cert,
        pfx: custom.pfx,
    };
    if config.is_tls() {
        setup_tls_config(&mut config);
    }
    config
}

fn setup_tls_config(config: &mut ServerConfig) {
    if config.key.is_some() && config.cert.is_some() {
        return;
    }
    if config.pfx.is_some() {
        return;
    }
    config.key = Some(DUMMY_TLS_KEY.to_string());
    config.cert = Some(DUMMY_TLS_CERT.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_to_ephemeral_localhost() {
        let config = given_http_server_config(None);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 0);
        assert_eq!(config.protocol, Protocol::Http);
        assert_eq!(config.key, None);
        assert_eq!(
            config.base_uri().map(|u| u.to_string()).ok(),
            Some("http://127.0.0.1:0/".to_string())
        );
    }

    #[test]
    fn keeps_custom_host_and_port() {
        let config = given_http_server_config(Some(HttpServerConfig {
            host: Some("localhost".into()),
            port: Some(3000),
            ..Default::default()
        }));
        assert_eq!((config.host.as_str(), config.port), ("localhost", 3000));
    }

    #[test]
    fn https_gets_dummy_tls_material() {
        let config = given_http_server_config(Some(HttpServerConfig {
            protocol: Some(Protocol::Https),
            ..Default::default()
        }));
        assert!(config.key.as_deref().is_some_and(|k| k.contains("PRIVATE KEY")));
        assert!(config.cert.as_deref().is_some_and(|c| c.contains("BEGIN CERTIFICATE")));
    }

    #[test]
    fn https_keeps_caller_tls_material() {
        let config = given_http_server_config(Some(HttpServerConfig {
            protocol: Some(Protocol::Https),
            key: Some("my key".into()),
            cert: Some("my cert".into()),
            ..Default::default()
        }));
        assert_eq!(config.key.as_deref(), Some("my key"));
        assert_eq!(config.cert.as_deref(), Some("my cert"));

        let config = given_http_server_config(Some(HttpServerConfig {
            protocol: Some(Protocol::Https),
            pfx: Some(vec![1, 2, 3]),
            ..Default::default()
        }));
        assert_eq!(config.key, None);

        // A key alone is not enough, both are replaced.
        let config = given_http_server_config(Some(HttpServerConfig {
            protocol: Some(Protocol::Https),
            key: Some("my key".into()),
            ..Default::default()
        }));
        assert_eq!(config.key.as_deref(), Some(DUMMY_TLS_KEY));
    }
}
