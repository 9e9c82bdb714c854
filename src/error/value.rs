//! Errors that separate what the client may see from what went wrong.

use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt;

use crate::error::status::{effective_code, status_text, write_plain};
use crate::error::{BoxError, WriteResponse};
use crate::http::ResponseWriter;

/// An error with an internal cause and an explicit policy for what the
/// client is shown.
///
/// Display text precedence when rendering:
/// 1. `status`, verbatim, when set
/// 2. the cause's message, when `public`
/// 3. the standard reason phrase for the effective status code
pub struct Value {
    /// The cause may be shown to the client.
    pub public: bool,
    /// Display text override.
    pub status: Option<Cow<'static, str>>,
    /// HTTP status code, `0` means 500.
    pub status_code: u16,
    pub err: BoxError,
}

impl Value {
    /// A private error: the client sees only standard status text.
    pub fn new(err: impl Into<BoxError>) -> Self {
        Self {
            public: false,
            status: None,
            status_code: 0,
            err: err.into(),
        }
    }

    pub fn with_status_code(mut self, status_code: u16) -> Self {
        self.status_code = status_code;
        self
    }

    pub fn with_status(mut self, status: impl Into<Cow<'static, str>>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn effective_status_code(&self) -> u16 {
        effective_code(self.status_code)
    }

    /// The text a client is shown.
    pub fn display_text(&self) -> Cow<'_, str> {
        match &self.status {
            Some(text) if !text.is_empty() => Cow::Borrowed(text.as_ref()),
            _ if self.public => Cow::Owned(self.err.to_string()),
            _ => Cow::Borrowed(status_text(self.effective_status_code())),
        }
    }
}

/// A `Value` whose cause is safe to show the client.
pub fn public(status_code: u16, err: impl Into<BoxError>) -> Value {
    Value {
        public: true,
        status: None,
        status_code,
        err: err.into(),
    }
}

impl WriteResponse for Value {
    fn write_response(&self, w: &mut ResponseWriter) {
        write_plain(w, self.effective_status_code(), &self.display_text());
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.err, f)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Value")
            .field("public", &self.public)
            .field("status", &self.status)
            .field("status_code", &self.status_code)
            .field("err", &self.err)
            .finish()
    }
}

impl StdError for Value {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(self.err.as_ref())
    }
}
