//! HTTP errors that are also HTTP responses.
//!
//! Server side, handlers fail with an [`Error`]; errors that know how to
//! render themselves ([`StatusError`], [`Value`], or any type wrapped with
//! [`Error::render`]) become the response, everything else becomes a
//! generic 500. The [`http::ErrorLayer`] middleware funnels both returned
//! errors and plain 4xx/5xx responses through one `on_error` hook.
//!
//! Client side, [`client::Client`] turns 4xx/5xx responses back into
//! errors, optionally decoding a structured JSON body.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod observability;

pub use config::HttpErrConfig;
pub use error::status::{self, StatusError};
pub use error::value::{public, Value};
pub use error::{write, BoxError, Error, ResponseError, WriteResponse};
pub use http::{report_error, ErrorLayer, ErrorReporter, ResponseWriter};
