//! Status-code errors and the table of well-known ones.

use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use axum::http::{header, HeaderValue, StatusCode};

use crate::error::WriteResponse;
use crate::http::ResponseWriter;

const DEFAULT_STATUS_CODE: u16 = 500;

/// An error modeled as an HTTP status code.
///
/// A zero (or otherwise invalid) `status_code` means 500; an empty `status`
/// means the standard reason phrase for the effective code. Defaults are
/// resolved on read and never stored.
#[derive(Clone, Default)]
pub struct StatusError {
    /// The HTTP status code, `0` when unset.
    pub status_code: u16,
    /// The status text shown to the client, `None` when unset.
    pub status: Option<Cow<'static, str>>,
    /// A cause that is never shown to the client but may be logged.
    pub private_error: Option<Arc<dyn StdError + Send + Sync + 'static>>,
}

impl StatusError {
    /// An error with only the status code set.
    pub const fn with_code(status_code: u16) -> Self {
        Self {
            status_code,
            status: None,
            private_error: None,
        }
    }

    pub fn from_status(status: StatusCode) -> Self {
        Self::with_code(status.as_u16())
    }

    /// Replace the displayed status text.
    pub fn with_status(mut self, status: impl Into<Cow<'static, str>>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Attach a private cause.
    pub fn with_private<E>(mut self, error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        self.private_error = Some(Arc::new(error));
        self
    }

    pub fn effective_status_code(&self) -> u16 {
        effective_code(self.status_code)
    }

    pub fn effective_status_text(&self) -> Cow<'static, str> {
        match &self.status {
            Some(text) if !text.is_empty() => text.clone(),
            _ => Cow::Borrowed(status_text(self.effective_status_code())),
        }
    }
}

/// Resolve a possibly-unset status code. Codes that cannot go on the wire
/// resolve to 500 as well, so the text always matches the code sent.
pub(crate) fn effective_code(status_code: u16) -> u16 {
    match StatusCode::from_u16(status_code) {
        Ok(_) => status_code,
        Err(_) => DEFAULT_STATUS_CODE,
    }
}

/// The standard reason phrase for `code`, or `""` when there is none.
pub fn status_text(code: u16) -> &'static str {
    StatusCode::from_u16(code)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("")
}

/// Write a `text/plain` error response: status line, then `text` and a newline.
pub(crate) fn write_plain(w: &mut ResponseWriter, status_code: u16, text: &str) {
    let status = StatusCode::from_u16(status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let headers = w.headers_mut();
    headers.remove(header::CONTENT_LENGTH);
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );

    w.write_header(status);
    w.write_body(text.as_bytes());
    w.write_body(b"\n");
}

impl WriteResponse for StatusError {
    fn write_response(&self, w: &mut ResponseWriter) {
        write_plain(w, self.effective_status_code(), &self.effective_status_text());
    }
}

impl fmt::Display for StatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}",
            self.effective_status_code(),
            self.effective_status_text()
        )
    }
}

impl fmt::Debug for StatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusError")
            .field("status_code", &self.status_code)
            .field("status", &self.status)
            .field("private_error", &self.private_error.as_ref().map(|e| e.to_string()))
            .finish()
    }
}

impl StdError for StatusError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.private_error
            .as_deref()
            .map(|e| e as &(dyn StdError + 'static))
    }
}

impl PartialEq for StatusError {
    fn eq(&self, other: &Self) -> bool {
        self.effective_status_code() == other.effective_status_code()
            && self.effective_status_text() == other.effective_status_text()
    }
}

impl From<StatusCode> for StatusError {
    fn from(status: StatusCode) -> Self {
        Self::from_status(status)
    }
}

// Client errors
pub const BAD_REQUEST: StatusError = StatusError::with_code(400);
pub const UNAUTHORIZED: StatusError = StatusError::with_code(401);
pub const PAYMENT_REQUIRED: StatusError = StatusError::with_code(402);
pub const FORBIDDEN: StatusError = StatusError::with_code(403);
pub const NOT_FOUND: StatusError = StatusError::with_code(404);
pub const METHOD_NOT_ALLOWED: StatusError = StatusError::with_code(405);
pub const NOT_ACCEPTABLE: StatusError = StatusError::with_code(406);
pub const PROXY_AUTHENTICATION_REQUIRED: StatusError = StatusError::with_code(407);
pub const REQUEST_TIMEOUT: StatusError = StatusError::with_code(408);
pub const CONFLICT: StatusError = StatusError::with_code(409);
pub const GONE: StatusError = StatusError::with_code(410);
pub const LENGTH_REQUIRED: StatusError = StatusError::with_code(411);
pub const PRECONDITION_FAILED: StatusError = StatusError::with_code(412);
pub const PAYLOAD_TOO_LARGE: StatusError = StatusError::with_code(413);
pub const URI_TOO_LONG: StatusError = StatusError::with_code(414);
pub const UNSUPPORTED_MEDIA_TYPE: StatusError = StatusError::with_code(415);
pub const RANGE_NOT_SATISFIABLE: StatusError = StatusError::with_code(416);
pub const EXPECTATION_FAILED: StatusError = StatusError::with_code(417);
pub const TEAPOT: StatusError = StatusError::with_code(418);
pub const MISDIRECTED_REQUEST: StatusError = StatusError::with_code(421);
pub const UNPROCESSABLE_ENTITY: StatusError = StatusError::with_code(422);
pub const LOCKED: StatusError = StatusError::with_code(423);
pub const FAILED_DEPENDENCY: StatusError = StatusError::with_code(424);
pub const TOO_EARLY: StatusError = StatusError::with_code(425);
pub const UPGRADE_REQUIRED: StatusError = StatusError::with_code(426);
pub const PRECONDITION_REQUIRED: StatusError = StatusError::with_code(428);
pub const TOO_MANY_REQUESTS: StatusError = StatusError::with_code(429);
pub const REQUEST_HEADER_FIELDS_TOO_LARGE: StatusError = StatusError::with_code(431);
pub const UNAVAILABLE_FOR_LEGAL_REASONS: StatusError = StatusError::with_code(451);

// Server errors
pub const INTERNAL_SERVER_ERROR: StatusError = StatusError::with_code(500);
pub const NOT_IMPLEMENTED: StatusError = StatusError::with_code(501);
pub const BAD_GATEWAY: StatusError = StatusError::with_code(502);
pub const SERVICE_UNAVAILABLE: StatusError = StatusError::with_code(503);
pub const GATEWAY_TIMEOUT: StatusError = StatusError::with_code(504);
pub const HTTP_VERSION_NOT_SUPPORTED: StatusError = StatusError::with_code(505);
pub const VARIANT_ALSO_NEGOTIATES: StatusError = StatusError::with_code(506);
pub const INSUFFICIENT_STORAGE: StatusError = StatusError::with_code(507);
pub const LOOP_DETECTED: StatusError = StatusError::with_code(508);
pub const NOT_EXTENDED: StatusError = StatusError::with_code(510);
pub const NETWORK_AUTHENTICATION_REQUIRED: StatusError = StatusError::with_code(511);
