//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber for the binaries
//! - Log errors on their way to the wire, private causes included
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - Filter comes from config, `RUST_LOG` overrides it
//! - Private causes go to the log only, never to the client

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::{Error, StatusError, Value};

/// Install the global subscriber. Later calls are ignored.
pub fn init(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.filter));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_ansi(config.ansi))
        .try_init();
}

/// Log `err` before it is rendered.
///
/// A `StatusError` with a private cause logs the cause and status code, a
/// `Value` logs its cause. Anything else logs its message.
pub fn log_error(err: &Error) {
    if let Some(status) = err.downcast_ref::<StatusError>() {
        match &status.private_error {
            Some(private) => tracing::error!(
                status_code = status.effective_status_code(),
                error = %private,
                "Request failed"
            ),
            None => tracing::debug!(
                status_code = status.effective_status_code(),
                "Request failed"
            ),
        }
    } else if let Some(value) = err.downcast_ref::<Value>() {
        tracing::error!(
            status_code = value.effective_status_code(),
            public = value.public,
            error = %value.err,
            "Request failed"
        );
    } else {
        tracing::error!(error = %err, "Request failed");
    }
}
