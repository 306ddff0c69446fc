//! Error taxonomy for the relay.
//!
//! Every variant is recovered inside the handler and turned into an HTTP
//! response; nothing here escapes to the host server as a fault.

use axum::body::Bytes;
use thiserror::Error;

/// Classification of an outbound failure.
///
/// The name is sent back to the caller as the status text of the 500
/// response, so the strings are part of the wire contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureClass {
    /// DNS lookup for the target host failed.
    NameResolutionFailure,
    /// TCP/TLS connection could not be established, or the target was not
    /// a usable absolute URI.
    ConnectFailure,
    /// The outbound client gave up waiting.
    Timeout,
    /// The remote answered with a 4xx/5xx status.
    ProtocolError,
    /// The request could not be written to the remote.
    SendFailure,
    /// The response body could not be read to completion.
    ReceiveFailure,
    UnknownError,
}

impl FailureClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureClass::NameResolutionFailure => "NameResolutionFailure",
            FailureClass::ConnectFailure => "ConnectFailure",
            FailureClass::Timeout => "Timeout",
            FailureClass::ProtocolError => "ProtocolError",
            FailureClass::SendFailure => "SendFailure",
            FailureClass::ReceiveFailure => "ReceiveFailure",
            FailureClass::UnknownError => "UnknownError",
        }
    }
}

impl std::fmt::Display for FailureClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The outbound call failed.
///
/// Carries the remote error body when the remote produced one, so it can be
/// forwarded to the caller.
#[derive(Debug, Error)]
#[error("{class}: {message}")]
pub struct ExecutionError {
    pub class: FailureClass,
    pub message: String,
    pub body: Option<Bytes>,
}

impl ExecutionError {
    pub fn new(class: FailureClass, message: impl Into<String>) -> Self {
        Self {
            class,
            message: message.into(),
            body: None,
        }
    }

    /// Attach the remote's error body. Empty bodies are dropped.
    pub fn with_body(mut self, body: Option<Bytes>) -> Self {
        self.body = body.filter(|b| !b.is_empty());
        self
    }

    /// A failure while draining the response stream.
    pub fn receive(err: std::io::Error) -> Self {
        Self::new(FailureClass::ReceiveFailure, err.to_string())
    }
}

/// Errors produced while relaying a single request.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The query string held no usable target URI.
    #[error("no target URI in query string")]
    MissingTarget,

    /// Inbound body exceeded the configured limit.
    #[error("request body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },

    /// Inbound body could not be read.
    #[error("failed to read request body: {0}")]
    InboundBody(String),

    /// Outbound execution raised a network-level fault.
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    /// Outbound execution produced neither a response nor a fault.
    #[error("outbound execution returned no response")]
    NoResponse,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_names_are_stable() {
        assert_eq!(FailureClass::ConnectFailure.to_string(), "ConnectFailure");
        assert_eq!(FailureClass::NameResolutionFailure.as_str(), "NameResolutionFailure");
        assert_eq!(FailureClass::ProtocolError.as_str(), "ProtocolError");
    }

    #[test]
    fn empty_error_body_is_dropped() {
        let err = ExecutionError::new(FailureClass::ProtocolError, "404")
            .with_body(Some(Bytes::new()));
        assert!(err.body.is_none());

        let err = ExecutionError::new(FailureClass::ProtocolError, "404")
            .with_body(Some(Bytes::from_static(b"gone")));
        assert_eq!(err.body.as_deref(), Some(&b"gone"[..]));
    }

    #[test]
    fn execution_error_display_includes_class() {
        let err = ExecutionError::new(FailureClass::Timeout, "deadline elapsed");
        assert_eq!(err.to_string(), "Timeout: deadline elapsed");
    }
}
