//! Error-capturing middleware.
//!
//! # Data Flow
//! ```text
//! request
//!     → attach ErrorReporter (fresh slot per request)
//!     → inner service produces a response (status/body held back)
//!     → resolve:
//!         error returned by handler → effective error = returned
//!         reported error            → effective error = reported
//!         status >= 400             → effective error = ResponseError
//!           (body fails mid-stream  → effective error = the read error)
//!         otherwise                 → inner response passes through
//!     → on_error(writer, head, effective error)
//!         Ok(())   → writer is the response
//!         Err(e)   → write(writer, e)
//! ```
//!
//! # Design Decisions
//! - Headers set by the inner service are kept on the final response; the
//!   hook can add to them but starts from what the handler produced
//! - Successful responses are not buffered, so streaming bodies survive
//! - The reported-error slot lives in request extensions, never in globals
//! - Errors returned from axum handlers ride on the rendered response and
//!   reach `on_error` unchanged, like reported ones

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};

use axum::body::Body;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{header, HeaderMap, Request};
use axum::response::Response;
use tower::{Layer, Service};

use crate::error::{write, Error, ResponseError, StatusError};
use crate::http::ResponseWriter;

/// Default cap on how much of a failed response body is captured.
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Per-request slot for an explicitly reported error.
///
/// Cloning shares the slot. A fresh one is attached to every request the
/// [`Middleware`] sees.
#[derive(Clone, Default)]
pub struct ErrorReporter {
    slot: Arc<Mutex<Option<Error>>>,
}

impl ErrorReporter {
    /// Report `err` for this request. The last report wins.
    pub fn report(&self, err: impl Into<Error>) {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            tracing::debug!("Replacing previously reported error");
        }
        *slot = Some(err.into());
    }

    fn take(&self) -> Option<Error> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).take()
    }
}

/// An error an axum handler returned, carried on the response it rendered.
#[derive(Clone)]
pub(crate) struct ReturnedError(ErrorReporter);

impl ReturnedError {
    pub(crate) fn new(err: Error) -> Self {
        let slot = ErrorReporter::default();
        slot.report(err);
        Self(slot)
    }
}

/// Report `err` for the request being handled by a [`Middleware`].
///
/// Returns `false`, and drops `err`, when the request did not pass through
/// the middleware.
pub fn report_error<B>(request: &Request<B>, err: impl Into<Error>) -> bool {
    match request.extensions().get::<ErrorReporter>() {
        Some(reporter) => {
            reporter.report(err);
            true
        }
        None => {
            tracing::warn!(uri = %request.uri(), "report_error called outside error middleware");
            false
        }
    }
}

impl<S> FromRequestParts<S> for ErrorReporter
where
    S: Send + Sync,
{
    type Rejection = StatusError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<ErrorReporter>()
            .cloned()
            .ok_or_else(|| {
                tracing::error!("ErrorReporter extractor used without error middleware");
                StatusError::default()
            })
    }
}

/// A body-less copy of the request as the inner service received it.
pub(crate) fn request_head<B>(request: &Request<B>) -> Request<()> {
    let mut head = Request::new(());
    *head.method_mut() = request.method().clone();
    *head.uri_mut() = request.uri().clone();
    *head.version_mut() = request.version();
    *head.headers_mut() = request.headers().clone();
    *head.extensions_mut() = request.extensions().clone();
    head
}

/// Wraps a service and routes its failures through one `on_error` hook.
///
/// The hook receives the writer for the final response, the request head
/// and the effective error. It either writes the response itself and
/// returns `Ok(())`, or returns an error to be written generically. Doing
/// both is a usage error: the returned error's status line is ignored.
pub struct Middleware<S, F> {
    inner: S,
    on_error: Arc<F>,
    max_body_bytes: usize,
}

impl<S, F> Middleware<S, F>
where
    F: Fn(&mut ResponseWriter, &Request<()>, Error) -> Result<(), Error>,
{
    pub fn new(inner: S, on_error: F) -> Self {
        Self {
            inner,
            on_error: Arc::new(on_error),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    /// Cap how much of a failed response body is captured.
    pub fn max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }
}

impl<S: Clone, F> Clone for Middleware<S, F> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            on_error: self.on_error.clone(),
            max_body_bytes: self.max_body_bytes,
        }
    }
}

impl<S, F> Service<Request<Body>> for Middleware<S, F>
where
    S: Service<Request<Body>, Response = Response, Error = Infallible> + Clone + Send + 'static,
    S::Future: Send + 'static,
    F: Fn(&mut ResponseWriter, &Request<()>, Error) -> Result<(), Error> + Send + Sync + 'static,
{
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Response, Infallible>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<Body>) -> Self::Future {
        // Drive the instance that was polled ready; leave a fresh clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let on_error = self.on_error.clone();
        let max_body_bytes = self.max_body_bytes;

        Box::pin(async move {
            let reporter = ErrorReporter::default();
            request.extensions_mut().insert(reporter.clone());
            let head = request_head(&request);

            let response = inner.call(request).await?;
            match capture(&reporter, response, max_body_bytes).await {
                Captured::Passed(response) => Ok(response),
                Captured::Failed(writer, err) => Ok(resolve(on_error.as_ref(), &head, writer, err)),
            }
        })
    }
}

/// Outcome of inspecting the inner service's response.
enum Captured {
    Failed(ResponseWriter, Error),
    Passed(Response),
}

async fn capture(reporter: &ErrorReporter, response: Response, max_body_bytes: usize) -> Captured {
    let (mut parts, body) = response.into_parts();
    let returned = parts
        .extensions
        .remove::<ReturnedError>()
        .and_then(|returned| returned.0.take());

    // a returned error comes after anything reported during the handler
    if let Some(err) = returned.or_else(|| reporter.take()) {
        tracing::trace!(status = %parts.status, "Discarding response in favour of handler error");
        return Captured::Failed(failure_writer(parts.headers), err);
    }

    if parts.status.as_u16() < 400 {
        return Captured::Passed(Response::from_parts(parts, body));
    }

    let headers = parts.headers.clone();
    match ResponseError::from_parts(parts, body, max_body_bytes).await {
        Ok(captured) => {
            tracing::trace!(status = %captured.status_code, "Captured unreported error response");
            Captured::Failed(failure_writer(headers), captured.into())
        }
        Err(e) => {
            tracing::warn!(error = %e, "Error response body failed mid-stream");
            Captured::Failed(failure_writer(headers), Error::from(e))
        }
    }
}

/// Writer for the final response, starting from the handler's headers.
fn failure_writer(mut headers: HeaderMap) -> ResponseWriter {
    // the handler's body is replaced, so its length no longer applies
    headers.remove(header::CONTENT_LENGTH);
    ResponseWriter::with_headers(headers)
}

fn resolve<F>(on_error: &F, head: &Request<()>, mut writer: ResponseWriter, err: Error) -> Response
where
    F: Fn(&mut ResponseWriter, &Request<()>, Error) -> Result<(), Error>,
{
    if let Err(replacement) = on_error(&mut writer, head, err) {
        if writer.is_committed() {
            tracing::warn!("on_error both wrote a response and returned an error");
        }
        write(&mut writer, replacement);
    }
    writer.into_response()
}

/// Applies [`Middleware`] with the given `on_error` hook.
pub struct ErrorLayer<F> {
    on_error: Arc<F>,
    max_body_bytes: usize,
}

impl<F> ErrorLayer<F>
where
    F: Fn(&mut ResponseWriter, &Request<()>, Error) -> Result<(), Error>,
{
    pub fn new(on_error: F) -> Self {
        Self {
            on_error: Arc::new(on_error),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    pub fn max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }
}

impl<F> Clone for ErrorLayer<F> {
    fn clone(&self) -> Self {
        Self {
            on_error: self.on_error.clone(),
            max_body_bytes: self.max_body_bytes,
        }
    }
}

impl<S, F> Layer<S> for ErrorLayer<F> {
    type Service = Middleware<S, F>;

    fn layer(&self, inner: S) -> Self::Service {
        Middleware {
            inner,
            on_error: self.on_error.clone(),
            max_body_bytes: self.max_body_bytes,
        }
    }
}

/// An `on_error` hook that writes every error generically.
pub fn write_error(
    _w: &mut ResponseWriter,
    _request: &Request<()>,
    err: Error,
) -> Result<(), Error> {
    Err(err)
}
