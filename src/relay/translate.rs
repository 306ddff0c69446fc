//! Inbound → outbound request translation.
//!
//! # Header policy
//! - `connection`, `host`, `referer`, `user-agent`, `content-length`: dropped
//! - `accept`: moved to [`OutboundRequest::accept`]
//! - `content-type`: moved to [`OutboundRequest::content_type`]
//! - everything else: copied with its values untouched
//!
//! No network I/O happens here.

use axum::body::Bytes;
use axum::http::header::{
    HeaderName, ACCEPT, CONNECTION, CONTENT_LENGTH, CONTENT_TYPE, HOST, REFERER, USER_AGENT,
};
use axum::http::{HeaderMap, HeaderValue, Method};

use crate::error::RelayError;
use crate::relay::target::{extract_target, TargetUri};

/// Headers that belong to the inbound hop and are never forwarded.
pub static EXCLUDED_HEADERS: [HeaderName; 5] = [CONNECTION, HOST, REFERER, USER_AGENT, CONTENT_LENGTH];

/// The request as received by the relay.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub method: Method,
    /// Raw, still percent-encoded query string.
    pub raw_query: Option<String>,
    pub headers: HeaderMap,
    /// Present only for body-bearing methods.
    pub body: Option<InboundBody>,
}

#[derive(Debug, Clone)]
pub struct InboundBody {
    pub bytes: Bytes,
    /// The caller's `content-length`, if it sent one.
    pub declared_length: Option<u64>,
}

/// The request the relay will issue to the target.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub target: TargetUri,
    /// Pass-through headers. Never contains the excluded names, `accept` or
    /// `content-type`.
    pub headers: HeaderMap,
    pub accept: Option<HeaderValue>,
    pub content_type: Option<HeaderValue>,
    pub body: Option<OutboundBody>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundBody {
    pub bytes: Bytes,
    pub content_length: u64,
}

/// Whether `method` carries a body outbound.
pub fn carries_body(method: &Method) -> bool {
    *method == Method::POST
}

/// Build the outbound request, failing only when no target is present.
pub fn translate(inbound: InboundRequest) -> Result<OutboundRequest, RelayError> {
    let target = extract_target(inbound.raw_query.as_deref())?;
    let (headers, accept, content_type) = filter_headers(&inbound.headers);

    let body = if carries_body(&inbound.method) {
        Some(match inbound.body {
            Some(InboundBody { bytes, declared_length }) => OutboundBody {
                content_length: declared_length.unwrap_or(bytes.len() as u64),
                bytes,
            },
            None => OutboundBody {
                bytes: Bytes::new(),
                content_length: 0,
            },
        })
    } else {
        None
    };

    Ok(OutboundRequest {
        method: inbound.method,
        target,
        headers,
        accept,
        content_type,
        body,
    })
}

/// Split inbound headers into pass-through headers, accept and content-type.
///
/// Multiple `accept` values are joined into one list value; for
/// `content-type` the first value wins.
pub fn filter_headers(
    inbound: &HeaderMap,
) -> (HeaderMap, Option<HeaderValue>, Option<HeaderValue>) {
    let mut headers = HeaderMap::with_capacity(inbound.keys_len());
    let mut accept = None;
    let mut content_type = None;

    for name in inbound.keys() {
        if EXCLUDED_HEADERS.contains(name) {
            continue;
        }
        if name == ACCEPT {
            accept = join_values(inbound.get_all(name).iter());
        } else if name == CONTENT_TYPE {
            content_type = inbound.get(name).cloned();
        } else {
            for value in inbound.get_all(name) {
                headers.append(name.clone(), value.clone());
            }
        }
    }

    (headers, accept, content_type)
}

fn join_values<'a>(mut values: impl Iterator<Item = &'a HeaderValue>) -> Option<HeaderValue> {
    let first = values.next()?.clone();
    let rest: Vec<&HeaderValue> = values.collect();
    if rest.is_empty() {
        return Some(first);
    }
    let mut joined = first.as_bytes().to_vec();
    for value in rest {
        joined.extend_from_slice(b", ");
        joined.extend_from_slice(value.as_bytes());
    }
    HeaderValue::from_bytes(&joined).ok()
}
