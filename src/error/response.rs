//! A received (or captured) HTTP response treated as an error.

use std::fmt;
use std::future::poll_fn;
use std::pin::Pin;

use axum::body::Body;
use axum::http::response::Parts;
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use bytes::{Bytes, BytesMut};
use http_body::Body as _;
use hyper::ext::ReasonPhrase;

use crate::error::BoxError;

/// A failed HTTP response: status, headers and the buffered body.
///
/// Produced by the client transport for 4xx/5xx responses and by the server
/// middleware when a handler fails without reporting an error. It does not
/// render itself; `write()` turns it into a generic 500 so the captured
/// body is never echoed to the client.
#[derive(Clone)]
pub struct ResponseError {
    pub status_code: StatusCode,
    /// Status text, e.g. "Bad Request".
    pub status: String,
    pub headers: HeaderMap,
    body: Bytes,
    truncated: bool,
}

impl ResponseError {
    pub fn new(status_code: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status_code,
            status: reason(status_code, None),
            headers,
            body,
            truncated: false,
        }
    }

    /// Override the status text, e.g. with a non-standard reason phrase.
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    /// Buffer `response`'s body (at most `limit` bytes) and wrap it.
    ///
    /// Bytes past `limit` are dropped and the error is marked truncated. A
    /// body that fails mid-stream is an error, not an empty body.
    pub async fn from_response(response: Response, limit: usize) -> Result<Self, BoxError> {
        let (parts, body) = response.into_parts();
        Self::from_parts(parts, body, limit).await
    }

    /// Like [`from_response`](Self::from_response) for an already split response.
    ///
    /// The status text is the reason phrase received on the wire when there
    /// was a non-standard one.
    pub async fn from_parts(parts: Parts, body: Body, limit: usize) -> Result<Self, BoxError> {
        let (body, truncated) = read_bounded(body, limit).await?;
        if truncated {
            tracing::warn!(
                status = %parts.status,
                limit,
                "Error response body exceeds limit, keeping the first bytes"
            );
        }

        let wire = parts.extensions.get::<ReasonPhrase>();
        Ok(Self {
            status_code: parts.status,
            status: reason(parts.status, wire),
            headers: parts.headers,
            body,
            truncated,
        })
    }

    /// The buffered body. Can be read any number of times.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Whether the body was cut off at the buffering limit.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// A fresh readable stream over the buffered body.
    pub fn into_body(self) -> Body {
        Body::from(self.body)
    }

    /// Rebuild the original response, e.g. to forward it unchanged.
    pub fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status_code;
        *response.headers_mut() = self.headers;
        response
    }
}

fn reason(status_code: StatusCode, wire: Option<&ReasonPhrase>) -> String {
    wire.and_then(|phrase| std::str::from_utf8(phrase.as_bytes()).ok())
        .or(status_code.canonical_reason())
        .map(str::to_string)
        .unwrap_or_else(|| status_code.as_str().to_string())
}

/// Read at most `limit` bytes of `body`; the flag reports whether more followed.
async fn read_bounded(mut body: Body, limit: usize) -> Result<(Bytes, bool), BoxError> {
    let mut buf = BytesMut::new();
    while let Some(frame) = poll_fn(|cx| Pin::new(&mut body).poll_frame(cx)).await {
        let frame = frame.map_err(axum::Error::into_inner)?;
        let Ok(data) = frame.into_data() else {
            continue;
        };
        let room = limit - buf.len();
        if data.len() > room {
            buf.extend_from_slice(&data[..room]);
            return Ok((buf.freeze(), true));
        }
        buf.extend_from_slice(&data);
    }
    Ok((buf.freeze(), false))
}

impl fmt::Display for ResponseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.status)
    }
}

impl fmt::Debug for ResponseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseError")
            .field("status_code", &self.status_code)
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body_len", &self.body.len())
            .field("truncated", &self.truncated)
            .finish()
    }
}

impl std::error::Error for ResponseError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{write, Error};
    use crate::http::ResponseWriter;

    #[test]
    fn message_is_status_text() {
        let err = ResponseError::new(StatusCode::BAD_REQUEST, HeaderMap::new(), Bytes::new());
        assert_eq!(err.to_string(), "Bad Request");

        let err = err.with_status("Bad Grob");
        assert_eq!(err.to_string(), "Bad Grob");
    }

    #[tokio::test]
    async fn buffers_body_repeatably() {
        let response = Response::builder()
            .status(StatusCode::BAD_GATEWAY)
            .header("x-upstream", "a")
            .body(Body::from("upstream down"))
            .unwrap();

        let err = ResponseError::from_response(response, 1024).await.unwrap();
        assert_eq!(err.status_code, StatusCode::BAD_GATEWAY);
        assert_eq!(err.headers["x-upstream"], "a");
        assert_eq!(err.body().as_ref(), b"upstream down");
        assert_eq!(err.body().as_ref(), b"upstream down");
        assert!(!err.is_truncated());

        let bytes = axum::body::to_bytes(err.into_body(), usize::MAX).await.unwrap();
        assert_eq!(bytes.as_ref(), b"upstream down");
    }

    #[tokio::test]
    async fn oversized_body_keeps_leading_bytes() {
        let response = Response::builder()
            .status(StatusCode::INTERNAL_SERVER_ERROR)
            .body(Body::from(vec![b'x'; 64]))
            .unwrap();

        let err = ResponseError::from_response(response, 16).await.unwrap();
        assert_eq!(err.status_code, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.body().as_ref(), &[b'x'; 16][..]);
        assert!(err.is_truncated());
    }

    #[tokio::test]
    async fn body_at_exact_limit_is_complete() {
        let response = Response::builder()
            .status(StatusCode::CONFLICT)
            .body(Body::from(vec![b'y'; 16]))
            .unwrap();

        let err = ResponseError::from_response(response, 16).await.unwrap();
        assert_eq!(err.body().len(), 16);
        assert!(!err.is_truncated());
    }

    #[tokio::test]
    async fn wire_reason_phrase_is_kept() {
        let mut response = Response::builder()
            .status(599)
            .body(Body::empty())
            .unwrap();
        response
            .extensions_mut()
            .insert(ReasonPhrase::try_from(&b"Grob Overload"[..]).unwrap());

        let err = ResponseError::from_response(response, 1024).await.unwrap();
        assert_eq!(err.to_string(), "Grob Overload");
    }

    #[test]
    fn nonstandard_code_falls_back_to_number() {
        let status = StatusCode::from_u16(599).unwrap();
        let err = ResponseError::new(status, HeaderMap::new(), Bytes::new());
        assert_eq!(err.to_string(), "599");
    }

    #[test]
    fn never_echoed_to_client() {
        let err = ResponseError::new(
            StatusCode::NOT_FOUND,
            HeaderMap::new(),
            Bytes::from_static(b"secret detail"),
        );
        let mut w = ResponseWriter::new();
        write(&mut w, Error::from(err));
        assert_eq!(w.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
        assert_eq!(w.body(), b"Internal Server Error\n");
    }
}
