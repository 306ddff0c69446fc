//! Response write-back.
//!
//! # Responsibilities
//! - Turn a [`RelayResponse`] into the HTTP response sent to the caller
//! - Put the failure class in the status text of 500 responses
//!
//! # Design Decisions
//! - The body is written only once it has been read in full
//! - HTTP/2 has no status text, so the class is also sent as `x-relay-error`

use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, HeaderName, HeaderValue},
    response::{IntoResponse, Response},
};
use hyper::ext::ReasonPhrase;

use crate::relay::RelayResponse;

/// Header carrying the failure class of a 500 response.
pub const X_RELAY_ERROR: HeaderName = HeaderName::from_static("x-relay-error");

impl IntoResponse for RelayResponse {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            RelayResponse::Relayed {
                content_type, body, ..
            } => {
                let mut response = (status, body).into_response();
                // Drop the default octet-stream type; the remote's type, if any, is the only one sent.
                response.headers_mut().remove(CONTENT_TYPE);
                if let Some(value) = content_type.and_then(|ct| HeaderValue::from_str(&ct).ok()) {
                    response.headers_mut().insert(CONTENT_TYPE, value);
                }
                response
            }
            RelayResponse::Failed { class, body } => {
                let mut response = match body {
                    Some(body) => (status, body).into_response(),
                    None => (status, Body::empty()).into_response(),
                };
                response
                    .headers_mut()
                    .insert(X_RELAY_ERROR, HeaderValue::from_static(class.as_str()));
                response
                    .extensions_mut()
                    .insert(ReasonPhrase::from_static(class.as_str().as_bytes()));
                response
            }
            RelayResponse::Denied
            | RelayResponse::Empty
            | RelayResponse::PayloadTooLarge
            | RelayResponse::BadRequest => (status, Body::empty()).into_response(),
        }
    }
}
