//! Error-intercepting HTTP client.
//!
//! # Data Flow
//! ```text
//! Client::request()
//!     → ErrorTransport (tower Service)
//!     → inner transport (hyper-util by default)
//!     → status < 400: response returned untouched
//!     → status >= 400: body buffered → on_error hook → ClientError
//! ```
//!
//! # Design Decisions
//! - The transport is a tower `Service`, so any client stack can be wrapped
//! - Transport failures never reach the hook

pub mod json;
pub mod transport;

pub use json::json_decoder;
pub use transport::{ClientError, ErrorTransport, ErrorTransportLayer, OnError};

use std::error::Error as StdError;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use bytes::Bytes;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use serde::de::DeserializeOwned;
use tower::{Service, ServiceExt};

use crate::config::ClientConfig;
use crate::error::{BoxError, ResponseError};

/// The default transport: a pooled hyper client over plain HTTP.
pub type HyperClient = hyper_util::client::legacy::Client<HttpConnector, Body>;

/// HTTP client that reports 4xx/5xx responses as errors.
#[derive(Clone)]
pub struct Client<S = HyperClient> {
    transport: ErrorTransport<S>,
}

impl Client<HyperClient> {
    /// Build a hyper-backed client from configuration.
    pub fn new(config: &ClientConfig) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(config.connect_timeout_secs)));

        let inner =
            hyper_util::client::legacy::Client::builder(TokioExecutor::new()).build(connector);
        Self::from_transport(inner).max_body_bytes(config.max_error_body_bytes)
    }

    /// Issue a GET for `uri`.
    pub async fn get(&self, uri: &str) -> Result<Response<hyper::body::Incoming>, ClientError> {
        let request = Request::get(uri)
            .body(Body::empty())
            .map_err(|e| ClientError::Transport(e.into()))?;
        self.request(request).await
    }
}

impl Default for Client<HyperClient> {
    fn default() -> Self {
        Self::new(&ClientConfig::default())
    }
}

impl<S> Client<S> {
    /// Wrap an arbitrary transport service.
    pub fn from_transport(inner: S) -> Self {
        Self {
            transport: ErrorTransport::new(inner),
        }
    }

    /// Decode failed response bodies as JSON `T`.
    pub fn json<T>(self) -> Self
    where
        T: DeserializeOwned + StdError + Send + Sync + 'static,
    {
        Self {
            transport: self.transport.json::<T>(),
        }
    }

    /// Install a custom hook for failed responses.
    pub fn on_error<F>(self, hook: F) -> Self
    where
        F: Fn(&Request<()>, &ResponseError) -> Option<BoxError> + Send + Sync + 'static,
    {
        Self {
            transport: self.transport.on_error(hook),
        }
    }

    pub fn max_body_bytes(self, limit: usize) -> Self {
        Self {
            transport: self.transport.max_body_bytes(limit),
        }
    }

    pub fn transport(&self) -> &ErrorTransport<S> {
        &self.transport
    }

    /// Send `request`, failing on transport errors and error statuses.
    pub async fn request<ReqBody, ResBody>(
        &self,
        request: Request<ReqBody>,
    ) -> Result<Response<ResBody>, ClientError>
    where
        S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
        S::Error: Into<BoxError>,
        S::Future: Send + 'static,
        ReqBody: Send + 'static,
        ResBody: http_body::Body<Data = Bytes> + Send + 'static,
        ResBody::Error: Into<BoxError>,
    {
        self.transport.clone().oneshot(request).await
    }
}
