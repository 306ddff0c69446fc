//! Request handling.
//!
//! # Responsibilities
//! - Assign a request ID (caller-supplied or UUID v4) and echo it back
//! - Convert an axum request into an [`InboundRequest`]
//!
//! # Design Decisions
//! - The ID lives in request extensions, not headers, so the relay never
//!   forwards an ID the caller did not send
//! - Only body-bearing methods have their body read, and the configured
//!   limit is enforced before and during the read

use axum::{
    body::{to_bytes, Body},
    extract::Request,
    http::{header::CONTENT_LENGTH, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use http_body_util::LengthLimitError;
use tracing::Instrument;
use uuid::Uuid;

use crate::error::RelayError;
use crate::relay::translate::{carries_body, InboundBody, InboundRequest};

/// Header carrying the request ID.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Correlation ID for one inbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(String);

impl RequestId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn from_header(value: &HeaderValue) -> Option<Self> {
        value
            .to_str()
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(|v| Self(v.to_string()))
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Access the request ID stored by [`request_id_middleware`].
pub trait RequestIdExt {
    fn request_id(&self) -> Option<&RequestId>;
}

impl<B> RequestIdExt for axum::http::Request<B> {
    fn request_id(&self) -> Option<&RequestId> {
        self.extensions().get::<RequestId>()
    }
}

/// Attach a [`RequestId`], run the rest of the stack inside a span carrying
/// it, and set `x-request-id` on the response.
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let id = request
        .headers()
        .get(&X_REQUEST_ID)
        .and_then(RequestId::from_header)
        .unwrap_or_else(RequestId::generate);
    request.extensions_mut().insert(id.clone());

    let span = tracing::info_span!("request", request_id = %id);
    let mut response = next.run(request).instrument(span).await;

    if let Ok(value) = HeaderValue::from_str(id.as_str()) {
        response.headers_mut().insert(X_REQUEST_ID, value);
    }
    response
}

impl InboundRequest {
    /// Read an axum request into an [`InboundRequest`].
    pub async fn from_request(
        request: axum::http::Request<Body>,
        max_body: usize,
    ) -> Result<Self, RelayError> {
        let (parts, body) = request.into_parts();
        let raw_query = parts.uri.query().map(str::to_owned);

        let body = if carries_body(&parts.method) {
            let declared_length = parts
                .headers
                .get(CONTENT_LENGTH)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            if declared_length.is_some_and(|len| len > max_body as u64) {
                return Err(RelayError::BodyTooLarge { limit: max_body });
            }

            let bytes = to_bytes(body, max_body).await.map_err(|e| {
                let inner = e.into_inner();
                if inner.downcast_ref::<LengthLimitError>().is_some() {
                    RelayError::BodyTooLarge { limit: max_body }
                } else {
                    RelayError::InboundBody(inner.to_string())
                }
            })?;
            Some(InboundBody {
                bytes,
                declared_length,
            })
        } else {
            None
        };

        Ok(Self {
            method: parts.method,
            raw_query,
            headers: parts.headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Method;

    fn request(method: Method, uri: &str, body: &'static [u8]) -> axum::http::Request<Body> {
        axum::http::Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn keeps_raw_query_encoded() {
        let inbound = InboundRequest::from_request(
            request(Method::GET, "/proxy?http%3A%2F%2Fexample.com%2F%3Fa%3D1", b""),
            1024,
        )
        .await
        .unwrap();
        assert_eq!(inbound.raw_query.as_deref(), Some("http%3A%2F%2Fexample.com%2F%3Fa%3D1"));
        assert!(inbound.body.is_none());
    }

    #[tokio::test]
    async fn get_body_is_not_read() {
        let inbound = InboundRequest::from_request(request(Method::GET, "/proxy?x", b"ignored"), 1)
            .await
            .unwrap();
        assert!(inbound.body.is_none());
    }

    #[tokio::test]
    async fn post_body_read_with_declared_length() {
        let req = axum::http::Request::builder()
            .method(Method::POST)
            .uri("/proxy?x")
            .header(CONTENT_LENGTH, "4")
            .body(Body::from(&b"\x00\x01\x02\x03"[..]))
            .unwrap();
        let inbound = InboundRequest::from_request(req, 1024).await.unwrap();
        let body = inbound.body.unwrap();
        assert_eq!(&body.bytes[..], b"\x00\x01\x02\x03");
        assert_eq!(body.declared_length, Some(4));
    }

    #[tokio::test]
    async fn oversized_declared_body_rejected() {
        let req = axum::http::Request::builder()
            .method(Method::POST)
            .uri("/proxy?x")
            .header(CONTENT_LENGTH, "4096")
            .body(Body::empty())
            .unwrap();
        let err = InboundRequest::from_request(req, 1024).await.unwrap_err();
        assert!(matches!(err, RelayError::BodyTooLarge { limit: 1024 }));
    }

    #[tokio::test]
    async fn oversized_undeclared_body_rejected() {
        let err = InboundRequest::from_request(request(Method::POST, "/proxy?x", b"0123456789"), 4)
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::BodyTooLarge { limit: 4 }));
    }

    #[test]
    fn blank_header_id_is_ignored() {
        assert!(RequestId::from_header(&HeaderValue::from_static("  ")).is_none());
        assert_eq!(
            RequestId::from_header(&HeaderValue::from_static("abc")).unwrap().as_str(),
            "abc"
        );
    }
}
