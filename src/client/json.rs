//! Structured JSON error bodies.
//!
//! Many services answer failures with a JSON object such as
//! `{"message": "...", "code": 42}`. Declaring a matching type lets the
//! transport hand callers that type instead of a raw response:
//!
//! ```rust,no_run
//! use httperr::client::Client;
//!
//! #[derive(Debug, serde::Deserialize, thiserror::Error)]
//! #[error("{message} ({code})")]
//! struct ApiError {
//!     message: String,
//!     code: i64,
//! }
//!
//! let client = Client::default().json::<ApiError>();
//! ```

use std::error::Error as StdError;

use axum::http::Request;
use serde::de::DeserializeOwned;

use crate::error::{BoxError, ResponseError};

/// An `on_error` hook that decodes the buffered body as `T`.
///
/// Each failing response is decoded into a fresh `T`. A body that is not
/// valid JSON, does not match `T`, or was truncated at the buffering limit
/// yields `None` so the transport falls back to the plain `ResponseError`.
pub fn json_decoder<T>(
) -> impl Fn(&Request<()>, &ResponseError) -> Option<BoxError> + Send + Sync + 'static
where
    T: DeserializeOwned + StdError + Send + Sync + 'static,
{
    |_request: &Request<()>, response: &ResponseError| {
        if response.is_truncated() {
            tracing::debug!(
                status = %response.status_code,
                "Error body was truncated, not decoding"
            );
            return None;
        }
        match serde_json::from_slice::<T>(response.body()) {
            Ok(decoded) => Some(Box::new(decoded) as BoxError),
            Err(e) => {
                tracing::debug!(
                    status = %response.status_code,
                    error = %e,
                    "Error body is not the expected JSON shape"
                );
                None
            }
        }
    }
}
