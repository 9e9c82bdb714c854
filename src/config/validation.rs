//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, limits > 0, parsable addresses)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: HttpErrConfig → Result<(), Vec<ValidationError>>

use std::net::SocketAddr;

use tracing_subscriber::EnvFilter;

use crate::config::schema::HttpErrConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("server.bind_address {0:?} is not a socket address")]
    BindAddress(String),
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    #[error("logging.filter {0:?} is not a valid filter")]
    Filter(String),
}

/// Check `config`, collecting every problem found.
pub fn validate_config(config: &HttpErrConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.server.bind_address.clone()));
    }
    if config.server.request_timeout_secs == 0 {
        errors.push(ValidationError::Zero("server.request_timeout_secs"));
    }
    if config.server.max_error_body_bytes == 0 {
        errors.push(ValidationError::Zero("server.max_error_body_bytes"));
    }
    if config.client.max_error_body_bytes == 0 {
        errors.push(ValidationError::Zero("client.max_error_body_bytes"));
    }
    if config.client.connect_timeout_secs == 0 {
        errors.push(ValidationError::Zero("client.connect_timeout_secs"));
    }
    if EnvFilter::try_new(&config.logging.filter).is_err() {
        errors.push(ValidationError::Filter(config.logging.filter.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
