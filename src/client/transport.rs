//! Error-intercepting client transport.
//!
//! # Responsibilities
//! - Forward requests to the wrapped transport
//! - Pass transport failures through unchanged
//! - Turn 4xx/5xx responses into errors, structured when a hook decodes them
//!
//! # Design Decisions
//! - Successful responses are returned as-is, body untouched
//! - Failed responses are buffered once (bounded) so both the hook and the
//!   caller can read the body
//! - Hook failures to decode are silent: the caller gets a `ResponseError`
//! - A body that fails mid-read is a transport failure, never a `ResponseError`
//! - An over-limit body keeps its leading bytes and is marked truncated

use std::error::Error as StdError;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use tower::{Layer, Service};

use crate::client::json::json_decoder;
use crate::error::{BoxError, ResponseError};
use crate::http::middleware::{request_head, DEFAULT_MAX_BODY_BYTES};

/// Hook invoked for every response with status >= 400.
///
/// Returning `Some` fails the call with that error; `None` falls back to
/// the `ResponseError`.
pub type OnError = Arc<dyn Fn(&Request<()>, &ResponseError) -> Option<BoxError> + Send + Sync>;

/// Failure of a call made through [`ErrorTransport`].
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The wrapped transport failed (connect, timeout, protocol...).
    #[error(transparent)]
    Transport(BoxError),
    /// The server answered with status >= 400.
    #[error(transparent)]
    Status(ResponseError),
    /// The `on_error` hook produced an error, e.g. a decoded JSON body.
    #[error(transparent)]
    Structured(BoxError),
}

impl ClientError {
    /// The failed response, when no hook replaced it.
    pub fn response(&self) -> Option<&ResponseError> {
        match self {
            ClientError::Status(err) => Some(err),
            _ => None,
        }
    }

    pub fn status_code(&self) -> Option<StatusCode> {
        self.response().map(|err| err.status_code)
    }

    /// The structured error, if it is a `T`.
    pub fn structured<T: StdError + 'static>(&self) -> Option<&T> {
        match self {
            ClientError::Structured(err) => err.downcast_ref::<T>(),
            _ => None,
        }
    }

    /// The underlying error of any variant, if it is a `T`.
    pub fn downcast_ref<T: StdError + 'static>(&self) -> Option<&T> {
        match self {
            ClientError::Transport(err) | ClientError::Structured(err) => {
                err.downcast_ref::<T>()
            }
            ClientError::Status(err) => {
                (err as &(dyn StdError + 'static)).downcast_ref::<T>()
            }
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::Transport(_))
    }
}

/// A transport that fails calls answered with status >= 400.
pub struct ErrorTransport<S> {
    inner: S,
    on_error: Option<OnError>,
    max_body_bytes: usize,
}

impl<S> ErrorTransport<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            on_error: None,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    /// Install a custom hook for failed responses.
    pub fn on_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Request<()>, &ResponseError) -> Option<BoxError> + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(hook));
        self
    }

    /// Decode failed response bodies as JSON `T`.
    pub fn json<T>(self) -> Self
    where
        T: DeserializeOwned + StdError + Send + Sync + 'static,
    {
        self.on_error(json_decoder::<T>())
    }

    /// Cap how much of a failed response body is buffered.
    pub fn max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }
}

impl<S: Clone> Clone for ErrorTransport<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            on_error: self.on_error.clone(),
            max_body_bytes: self.max_body_bytes,
        }
    }
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for ErrorTransport<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Error: Into<BoxError>,
    S::Future: Send + 'static,
    ReqBody: Send + 'static,
    ResBody: http_body::Body<Data = Bytes> + Send + 'static,
    ResBody::Error: Into<BoxError>,
{
    type Response = Response<ResBody>;
    type Error = ClientError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, ClientError>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner
            .poll_ready(cx)
            .map_err(|e| ClientError::Transport(e.into()))
    }

    fn call(&mut self, request: Request<ReqBody>) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let on_error = self.on_error.clone();
        let max_body_bytes = self.max_body_bytes;

        Box::pin(async move {
            let head = request_head(&request);

            let response = inner
                .call(request)
                .await
                .map_err(|e| ClientError::Transport(e.into()))?;

            if response.status().as_u16() < 400 {
                return Ok(response);
            }

            let (parts, body) = response.into_parts();
            let failed = ResponseError::from_parts(parts, Body::new(body), max_body_bytes)
                .await
                .map_err(ClientError::Transport)?;

            tracing::debug!(
                method = %head.method(),
                uri = %head.uri(),
                status = %failed.status_code,
                "Request failed with error status"
            );

            if let Some(hook) = on_error {
                if let Some(err) = hook(&head, &failed) {
                    return Err(ClientError::Structured(err));
                }
            }
            Err(ClientError::Status(failed))
        })
    }
}

/// Applies [`ErrorTransport`] to a client service.
#[derive(Clone)]
pub struct ErrorTransportLayer {
    on_error: Option<OnError>,
    max_body_bytes: usize,
}

impl Default for ErrorTransportLayer {
    fn default() -> Self {
        Self {
            on_error: None,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl ErrorTransportLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Request<()>, &ResponseError) -> Option<BoxError> + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(hook));
        self
    }

    pub fn json<T>(self) -> Self
    where
        T: DeserializeOwned + StdError + Send + Sync + 'static,
    {
        self.on_error(json_decoder::<T>())
    }

    pub fn max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }
}

impl<S> Layer<S> for ErrorTransportLayer {
    type Service = ErrorTransport<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ErrorTransport {
            inner,
            on_error: self.on_error.clone(),
            max_body_bytes: self.max_body_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::VecDeque;
    use std::convert::Infallible;
    use std::io;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tower::{service_fn, ServiceExt};

    #[derive(Debug, PartialEq, Deserialize, thiserror::Error)]
    #[error("{message} ({code})")]
    struct ApiError {
        message: String,
        code: i64,
    }

    fn backend(
        status: u16,
        body: &'static str,
    ) -> impl Service<
        Request<Body>,
        Response = Response<Body>,
        Error = Infallible,
        Future = impl Future<Output = Result<Response<Body>, Infallible>> + Send,
    > + Clone
           + Send
           + 'static {
        service_fn(move |_req: Request<Body>| async move {
            Ok::<_, Infallible>(
                Response::builder()
                    .status(status)
                    .header("x-backend", "mock")
                    .body(Body::from(body))
                    .unwrap(),
            )
        })
    }

    fn get() -> Request<Body> {
        Request::builder().uri("/foo").body(Body::empty()).unwrap()
    }

    const GROB: &str = r#"{"message": "cannot frob the grob", "code": 1}"#;

    #[tokio::test]
    async fn success_is_returned_unmodified() {
        let transport = ErrorTransport::new(backend(200, r#"{"ok": true}"#)).json::<ApiError>();
        let response = transport.oneshot(get()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body.as_ref(), br#"{"ok": true}"#);
    }

    #[tokio::test]
    async fn error_status_becomes_response_error() {
        let transport = ErrorTransport::new(backend(400, GROB));
        let err = transport.oneshot(get()).await.unwrap_err();

        let failed = err.response().expect("ResponseError");
        assert_eq!(err.to_string(), "Bad Request");
        assert_eq!(failed.status_code, StatusCode::BAD_REQUEST);
        assert_eq!(failed.headers["x-backend"], "mock");
        assert_eq!(failed.body().as_ref(), GROB.as_bytes());
        assert_eq!(failed.body().as_ref(), GROB.as_bytes());
    }

    #[tokio::test]
    async fn json_body_is_decoded() {
        let transport = ErrorTransport::new(backend(400, GROB)).json::<ApiError>();
        let err = transport.oneshot(get()).await.unwrap_err();

        let api = err.structured::<ApiError>().expect("decoded error");
        assert_eq!(
            api,
            &ApiError {
                message: "cannot frob the grob".into(),
                code: 1,
            }
        );
        assert_eq!(err.to_string(), "cannot frob the grob (1)");
    }

    #[tokio::test]
    async fn malformed_json_falls_back() {
        let transport = ErrorTransport::new(backend(400, "{invalid json")).json::<ApiError>();
        let err = transport.oneshot(get()).await.unwrap_err();

        assert!(err.structured::<ApiError>().is_none());
        let failed = err.response().expect("ResponseError");
        assert_eq!(failed.status_code, StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Bad Request");
        assert_eq!(failed.body().as_ref(), b"{invalid json");
    }

    #[tokio::test]
    async fn transport_failure_passes_through() {
        #[derive(Debug, thiserror::Error)]
        #[error("connection refused")]
        struct Refused;

        let failing = service_fn(|_req: Request<Body>| async {
            Err::<Response<Body>, _>(Refused)
        });
        let transport = ErrorTransportLayer::new().json::<ApiError>().layer(failing);
        let err = transport.oneshot(get()).await.unwrap_err();

        assert!(err.is_transport());
        assert_eq!(err.to_string(), "connection refused");
        match err {
            ClientError::Transport(inner) => assert!(inner.is::<Refused>()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn custom_hook_sees_request_and_response() {
        let transport = ErrorTransport::new(backend(503, "busy")).on_error(|req, resp| {
            assert_eq!(req.uri().path(), "/foo");
            assert_eq!(resp.status_code, StatusCode::SERVICE_UNAVAILABLE);
            Some(format!("{} is busy", req.uri().path()).into())
        });
        let err = transport.oneshot(get()).await.unwrap_err();
        assert_eq!(err.to_string(), "/foo is busy");
    }

    #[tokio::test]
    async fn hook_declining_yields_response_error() {
        let transport = ErrorTransport::new(backend(500, "boom")).on_error(|_, _| None);
        let err = transport.oneshot(get()).await.unwrap_err();
        assert_eq!(err.status_code(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    }

    /// A body that yields its frames in order, then ends.
    #[derive(Debug)]
    struct ScriptedBody {
        frames: VecDeque<Result<Bytes, io::Error>>,
    }

    impl ScriptedBody {
        fn new(frames: Vec<Result<Bytes, io::Error>>) -> Self {
            Self {
                frames: frames.into(),
            }
        }
    }

    impl http_body::Body for ScriptedBody {
        type Data = Bytes;
        type Error = io::Error;

        fn poll_frame(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
        ) -> Poll<Option<Result<http_body::Frame<Bytes>, io::Error>>> {
            Poll::Ready(self.frames.pop_front().map(|r| r.map(http_body::Frame::data)))
        }
    }

    #[tokio::test]
    async fn body_failure_mid_read_is_transport_error() {
        let hook_called = Arc::new(AtomicBool::new(false));
        let called = hook_called.clone();

        let flaky = service_fn(|_req: Request<Body>| async {
            let body = ScriptedBody::new(vec![
                Ok(Bytes::from_static(br#"{"message": "half"#)),
                Err(io::Error::new(io::ErrorKind::ConnectionReset, "connection reset")),
            ]);
            Ok::<_, Infallible>(Response::builder().status(502).body(body).unwrap())
        });
        let transport = ErrorTransport::new(flaky).on_error(move |_, _| {
            called.store(true, Ordering::SeqCst);
            None
        });
        let err = transport.oneshot(get()).await.unwrap_err();

        assert!(err.is_transport(), "unexpected {err:?}");
        assert!(err.response().is_none());
        assert!(!hook_called.load(Ordering::SeqCst));
        let cause = err.downcast_ref::<io::Error>().expect("io::Error cause");
        assert_eq!(cause.kind(), io::ErrorKind::ConnectionReset);
    }

    #[tokio::test]
    async fn complete_multi_frame_body_is_buffered() {
        let chunked = service_fn(|_req: Request<Body>| async {
            let body = ScriptedBody::new(vec![
                Ok(Bytes::from_static(br#"{"message": "cannot frob "#)),
                Ok(Bytes::from_static(br#"the grob", "code": 1}"#)),
            ]);
            Ok::<_, Infallible>(Response::builder().status(400).body(body).unwrap())
        });
        let transport = ErrorTransport::new(chunked).json::<ApiError>();
        let err = transport.oneshot(get()).await.unwrap_err();
        assert_eq!(err.to_string(), "cannot frob the grob (1)");
    }

    #[tokio::test]
    async fn oversized_body_is_truncated_and_not_decoded() {
        let big = format!(r#"{{"message": "{}", "code": 1}}"#, "x".repeat(4096));
        let big: &'static str = Box::leak(big.into_boxed_str());

        let transport = ErrorTransport::new(backend(400, big))
            .json::<ApiError>()
            .max_body_bytes(1024);
        let err = transport.oneshot(get()).await.unwrap_err();

        assert!(err.structured::<ApiError>().is_none());
        let failed = err.response().expect("ResponseError");
        assert!(failed.is_truncated());
        assert_eq!(failed.body().len(), 1024);
        assert_eq!(failed.body().as_ref(), &big.as_bytes()[..1024]);

        let transport = ErrorTransport::new(backend(400, big))
            .json::<ApiError>()
            .max_body_bytes(8192);
        let err = transport.oneshot(get()).await.unwrap_err();
        assert_eq!(err.structured::<ApiError>().map(|e| e.code), Some(1));
    }
}
