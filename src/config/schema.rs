//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML files and
//! every field has a default, so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};

use crate::http::middleware::DEFAULT_MAX_BODY_BYTES;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct HttpErrConfig {
    /// Server-side error middleware settings.
    pub server: ServerConfig,

    /// Error-intercepting client settings.
    pub client: ClientConfig,

    /// Logging settings for the binaries.
    pub logging: LoggingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1:8080").
    pub bind_address: String,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,

    /// How much of an unreported error response body the middleware captures.
    pub max_error_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
            request_timeout_secs: 30,
            max_error_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

/// Client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// How much of a failed response body is buffered.
    pub max_error_body_bytes: usize,

    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            max_error_body_bytes: DEFAULT_MAX_BODY_BYTES,
            connect_timeout_secs: 5,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directives, overridden by `RUST_LOG`.
    pub filter: String,

    /// Colored output.
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "httperr=info,tower_http=info".to_string(),
            ansi: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config: HttpErrConfig = toml::from_str("").unwrap();
        assert_eq!(config.server.bind_address, "127.0.0.1:8080");
        assert_eq!(config.client.max_error_body_bytes, DEFAULT_MAX_BODY_BYTES);
        assert!(config.logging.ansi);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config: HttpErrConfig = toml::from_str(
            r#"
            [server]
            bind_address = "0.0.0.0:9000"

            [client]
            max_error_body_bytes = 4096
            "#,
        )
        .unwrap();
        assert_eq!(config.server.bind_address, "0.0.0.0:9000");
        assert_eq!(config.server.request_timeout_secs, 30);
        assert_eq!(config.client.max_error_body_bytes, 4096);
        assert_eq!(config.client.connect_timeout_secs, 5);
    }
}
