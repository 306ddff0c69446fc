//! The relay itself: translate → execute → read loop → write-back.
//!
//! [`relay`] is a plain function of the inbound request and an executor.
//! Every failure is folded into a [`RelayResponse`]; nothing propagates.

use axum::body::Bytes;
use axum::http::StatusCode;

use crate::error::{ExecutionError, FailureClass, RelayError};
use crate::observability::metrics;
use crate::relay::buffer::{GrowableBuffer, INITIAL_CAPACITY};
use crate::relay::executor::{Executor, OutboundResponse};
use crate::relay::translate::{translate, InboundRequest};

/// Per-request knobs.
#[derive(Debug, Clone)]
pub struct RelaySettings {
    pub initial_buffer_size: usize,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            initial_buffer_size: INITIAL_CAPACITY,
        }
    }
}

/// What gets written back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayResponse {
    /// Remote answered; its content type and exact body pass through.
    Relayed {
        status: StatusCode,
        content_type: Option<String>,
        body: Bytes,
    },
    /// No target: 403, no body.
    Denied,
    /// Outbound failure: 500 with the class as status text.
    Failed {
        class: FailureClass,
        body: Option<Bytes>,
    },
    /// Executor produced nothing: finish with no body.
    Empty,
    /// Inbound body over the limit.
    PayloadTooLarge,
    /// Inbound body unreadable.
    BadRequest,
}

impl RelayResponse {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayResponse::Relayed { status, .. } => *status,
            RelayResponse::Denied => StatusCode::FORBIDDEN,
            RelayResponse::Failed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            RelayResponse::Empty => StatusCode::OK,
            RelayResponse::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            RelayResponse::BadRequest => StatusCode::BAD_REQUEST,
        }
    }

    /// Label used in logs and metrics.
    pub fn outcome(&self) -> &'static str {
        match self {
            RelayResponse::Relayed { .. } => "relayed",
            RelayResponse::Denied => "missing_target",
            RelayResponse::Failed { class, .. } => class.as_str(),
            RelayResponse::Empty => "no_response",
            RelayResponse::PayloadTooLarge => "body_too_large",
            RelayResponse::BadRequest => "bad_body",
        }
    }
}

impl From<RelayError> for RelayResponse {
    fn from(err: RelayError) -> Self {
        match err {
            RelayError::MissingTarget => RelayResponse::Denied,
            RelayError::BodyTooLarge { .. } => RelayResponse::PayloadTooLarge,
            RelayError::InboundBody(_) => RelayResponse::BadRequest,
            RelayError::Execution(ExecutionError { class, body, .. }) => {
                RelayResponse::Failed { class, body }
            }
            RelayError::NoResponse => RelayResponse::Empty,
        }
    }
}

/// Relay one request through `executor`.
pub async fn relay<E>(executor: &E, inbound: InboundRequest, settings: &RelaySettings) -> RelayResponse
where
    E: Executor + ?Sized,
{
    match try_relay(executor, inbound, settings).await {
        Ok(response) => response,
        Err(err) => {
            match &err {
                RelayError::MissingTarget => tracing::debug!("Rejecting request without target"),
                RelayError::Execution(e) => tracing::warn!(
                    class = %e.class,
                    error = %e.message,
                    "Outbound request failed"
                ),
                other => tracing::warn!(error = %other, "Relay failed"),
            }
            RelayResponse::from(err)
        }
    }
}

async fn try_relay<E>(
    executor: &E,
    inbound: InboundRequest,
    settings: &RelaySettings,
) -> Result<RelayResponse, RelayError>
where
    E: Executor + ?Sized,
{
    let outbound = translate(inbound)?;
    tracing::debug!(
        method = %outbound.method,
        target = %outbound.target,
        forwarded_headers = outbound.headers.len(),
        "Relaying request"
    );

    let OutboundResponse {
        status,
        content_type,
        mut body,
    } = executor
        .execute(outbound)
        .await?
        .ok_or(RelayError::NoResponse)?;

    let mut buffer = GrowableBuffer::with_capacity(settings.initial_buffer_size);
    let bytes = buffer
        .fill_from(&mut body)
        .await
        .map_err(ExecutionError::receive)?;
    metrics::record_body(bytes, buffer.growths());

    tracing::debug!(
        status = %status,
        bytes,
        growths = buffer.growths(),
        "Response body read"
    );

    Ok(RelayResponse::Relayed {
        status,
        content_type,
        body: buffer.into_bytes(),
    })
}
