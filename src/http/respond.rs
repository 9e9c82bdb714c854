//! axum integration: error types as handler return values.
//!
//! Handlers can return `Result<impl IntoResponse, httperr::Error>` (or one
//! of the concrete error types). The error is rendered generically and
//! also carried on the response, so an enclosing error middleware hands it
//! to `on_error` unchanged instead of a flattened `ResponseError`.

use axum::response::{IntoResponse, Response};

use crate::error::{Error, StatusError, Value};
use crate::http::middleware::ReturnedError;
use crate::http::ResponseWriter;
use crate::observability::logging::log_error;

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        log_error(&self);
        respond(self)
    }
}

impl IntoResponse for StatusError {
    fn into_response(self) -> Response {
        respond(self.into())
    }
}

impl IntoResponse for Value {
    fn into_response(self) -> Response {
        respond(self.into())
    }
}

fn respond(err: Error) -> Response {
    let mut w = ResponseWriter::new();
    err.render_into(&mut w);
    let mut response = w.into_response();
    response.extensions_mut().insert(ReturnedError::new(err));
    response
}
