//! Adapter from fallible functions to request handlers.

use std::convert::Infallible;
use std::future::{ready, Ready};
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use tower::Service;

use crate::error::{write, Error};
use crate::http::ResponseWriter;

/// A handler written as `fn(&mut ResponseWriter, Request) -> Result<(), Error>`.
///
/// On `Ok` whatever the function wrote is the response. On `Err` the error
/// is written through [`write`] after anything the function already wrote.
pub struct HandlerFn<F> {
    f: Arc<F>,
}

impl<F> HandlerFn<F>
where
    F: Fn(&mut ResponseWriter, Request<Body>) -> Result<(), Error>,
{
    pub fn new(f: F) -> Self {
        Self { f: Arc::new(f) }
    }
}

/// Shorthand for [`HandlerFn::new`].
pub fn handler_fn<F>(f: F) -> HandlerFn<F>
where
    F: Fn(&mut ResponseWriter, Request<Body>) -> Result<(), Error>,
{
    HandlerFn::new(f)
}

impl<F> Clone for HandlerFn<F> {
    fn clone(&self) -> Self {
        Self { f: self.f.clone() }
    }
}

impl<F> Service<Request<Body>> for HandlerFn<F>
where
    F: Fn(&mut ResponseWriter, Request<Body>) -> Result<(), Error>,
{
    type Response = Response;
    type Error = Infallible;
    type Future = Ready<Result<Response, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let mut w = ResponseWriter::new();
        if let Err(err) = (self.f)(&mut w, request) {
            write(&mut w, err);
        }
        ready(Ok(w.into_response()))
    }
}
