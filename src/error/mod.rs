//! Error values that speak HTTP.
//!
//! # Data Flow
//! ```text
//! handler failure
//!     → Error (renderable: StatusError / Value / opted-in type)
//!     → Error (opaque: anything else)
//!     → write() dispatch
//!         renderable → WriteResponse::write_response
//!         opaque     → StatusError { private_error } → generic 500
//!     → ResponseWriter → wire
//! ```
//!
//! # Design Decisions
//! - Rendering is a capability (`WriteResponse`), chosen when the `Error`
//!   is built, so third-party types opt in with `Error::render`
//! - Opaque errors never reach the client with their own message
//! - `Error` is deliberately not `std::error::Error`; it converts into
//!   `BoxError` instead so it can be stored as a cause

pub mod response;
pub mod status;
pub mod value;

use std::error::Error as StdError;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use crate::http::ResponseWriter;

pub use response::ResponseError;
pub use status::StatusError;
pub use value::Value;

/// Boxed, thread-safe error used for causes and transport failures.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Types that know how to write themselves as a complete HTTP response.
pub trait WriteResponse {
    /// Commit status line, headers and body to `w`.
    fn write_response(&self, w: &mut ResponseWriter);
}

/// Object-safe union of the render capability and `std::error::Error`.
trait Renderable: WriteResponse + StdError + Send + Sync + 'static {
    fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static);
    fn into_error(self: Box<Self>) -> BoxError;
}

impl<T> Renderable for T
where
    T: WriteResponse + StdError + Send + Sync + 'static,
{
    fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self
    }

    fn into_error(self: Box<Self>) -> BoxError {
        self
    }
}

enum Repr {
    Render(Box<dyn Renderable>),
    Opaque(BoxError),
}

/// An error flowing through handlers, middleware and hooks.
pub struct Error {
    repr: Repr,
}

impl Error {
    /// Wrap an arbitrary error. It renders as a generic 500.
    pub fn new<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self {
            repr: Repr::Opaque(Box::new(error)),
        }
    }

    /// Create an opaque error from a plain message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::new(MessageError(message.into()))
    }

    /// Wrap an error that renders itself.
    pub fn render<E>(error: E) -> Self
    where
        E: WriteResponse + StdError + Send + Sync + 'static,
    {
        Self {
            repr: Repr::Render(Box::new(error)),
        }
    }

    /// Whether this error carries the render capability.
    pub fn is_renderable(&self) -> bool {
        matches!(self.repr, Repr::Render(_))
    }

    /// Borrow the wrapped error.
    pub fn as_std(&self) -> &(dyn StdError + Send + Sync + 'static) {
        match &self.repr {
            Repr::Render(r) => r.as_error(),
            Repr::Opaque(e) => e.as_ref(),
        }
    }

    pub fn is<T: StdError + 'static>(&self) -> bool {
        self.as_std().is::<T>()
    }

    pub fn downcast_ref<T: StdError + 'static>(&self) -> Option<&T> {
        self.as_std().downcast_ref::<T>()
    }

    /// Take the wrapped error back out if it is a `T`.
    pub fn downcast<T: StdError + 'static>(self) -> Result<T, Self> {
        if !self.is::<T>() {
            return Err(self);
        }
        let boxed = match self.repr {
            Repr::Render(r) => r.into_error(),
            Repr::Opaque(e) => e,
        };
        match boxed.downcast::<T>() {
            Ok(value) => Ok(*value),
            // unreachable after the `is` check; keep the error opaque
            Err(e) => Err(Self {
                repr: Repr::Opaque(e),
            }),
        }
    }

    /// Render `self` into `w`. See [`write`].
    pub fn write_response(self, w: &mut ResponseWriter) {
        write(w, self)
    }

    /// Render without giving up the error. Opaque errors still render as a
    /// generic 500.
    pub(crate) fn render_into(&self, w: &mut ResponseWriter) {
        match &self.repr {
            Repr::Render(r) => r.write_response(w),
            Repr::Opaque(_) => StatusError::default().write_response(w),
        }
    }
}

/// Write `err` to `w`.
///
/// Errors with the render capability produce their own response. Anything
/// else becomes a `StatusError` holding the original as its private cause,
/// which renders as `500 Internal Server Error` without leaking the message.
pub fn write(w: &mut ResponseWriter, err: Error) {
    match err.repr {
        Repr::Render(r) => r.write_response(w),
        Repr::Opaque(e) => StatusError {
            private_error: Some(Arc::from(e)),
            ..StatusError::default()
        }
        .write_response(w),
    }
}

impl Deref for Error {
    type Target = dyn StdError + Send + Sync + 'static;

    fn deref(&self) -> &Self::Target {
        self.as_std()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.as_std(), f)
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_std(), f)
    }
}

impl From<StatusError> for Error {
    fn from(error: StatusError) -> Self {
        Self::render(error)
    }
}

impl From<Value> for Error {
    fn from(error: Value) -> Self {
        Self::render(error)
    }
}

impl From<ResponseError> for Error {
    fn from(error: ResponseError) -> Self {
        Self::new(error)
    }
}

impl From<BoxError> for Error {
    fn from(error: BoxError) -> Self {
        Self {
            repr: Repr::Opaque(error),
        }
    }
}

impl From<Error> for BoxError {
    fn from(error: Error) -> Self {
        match error.repr {
            Repr::Render(r) => r.into_error(),
            Repr::Opaque(e) => e,
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct MessageError(String);
