//! Outbound request execution.
//!
//! [`Executor`] is the capability the relay is handed; [`ReqwestExecutor`]
//! is the production implementation. Timeouts belong to the client, not to
//! the relay. Environment proxy settings are ignored: the relay talks to the
//! target directly.

use std::time::Duration;

use async_trait::async_trait;
use axum::http::header::{ACCEPT, CONTENT_LENGTH, CONTENT_TYPE, TRANSFER_ENCODING};
use axum::http::StatusCode;
use futures_util::TryStreamExt;
use tokio::io::AsyncRead;
use tokio_util::io::StreamReader;

use crate::config::TimeoutConfig;
use crate::error::{ExecutionError, FailureClass};
use crate::relay::translate::OutboundRequest;

/// Response from the target, body not yet read.
pub struct OutboundResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    /// Stream of unknown total length.
    pub body: Box<dyn AsyncRead + Send + Unpin>,
}

impl std::fmt::Debug for OutboundResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutboundResponse")
            .field("status", &self.status)
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

/// Executes one outbound request.
///
/// `Ok(None)` means the call neither failed nor produced a response.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(
        &self,
        request: OutboundRequest,
    ) -> Result<Option<OutboundResponse>, ExecutionError>;
}

/// [`Executor`] backed by a `reqwest` client.
///
/// Remote 4xx/5xx statuses are surfaced as [`FailureClass::ProtocolError`]
/// faults carrying the remote body.
#[derive(Debug, Clone)]
pub struct ReqwestExecutor {
    client: reqwest::Client,
}

impl ReqwestExecutor {
    pub fn new(timeouts: &TimeoutConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .timeout(Duration::from_secs(timeouts.request_secs))
            .no_proxy()
            .build()?;
        Ok(Self { client })
    }

    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Executor for ReqwestExecutor {
    async fn execute(
        &self,
        request: OutboundRequest,
    ) -> Result<Option<OutboundResponse>, ExecutionError> {
        let url = request.target.parse().map_err(|e| {
            ExecutionError::new(
                FailureClass::ConnectFailure,
                format!("invalid target URI {:?}: {}", request.target.as_str(), e),
            )
        })?;

        let mut headers = request.headers;
        // The body is fully buffered; framing is set from its length, and a
        // forwarded `transfer-encoding` would make the client drop `content-length`.
        headers.remove(TRANSFER_ENCODING);

        let mut builder = self.client.request(request.method, url).headers(headers);
        if let Some(accept) = request.accept {
            builder = builder.header(ACCEPT, accept);
        }
        if let Some(content_type) = request.content_type {
            builder = builder.header(CONTENT_TYPE, content_type);
        }
        if let Some(body) = request.body {
            builder = builder
                .header(CONTENT_LENGTH, body.content_length)
                .body(body.bytes);
        }

        let response = builder.send().await.map_err(classify)?;
        let status = response.status();

        if status.is_client_error() || status.is_server_error() {
            let body = response.bytes().await.ok();
            return Err(ExecutionError::new(
                FailureClass::ProtocolError,
                format!("remote responded {}", status),
            )
            .with_body(body));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        let stream = response.bytes_stream().map_err(std::io::Error::other);
        Ok(Some(OutboundResponse {
            status,
            content_type,
            body: Box::new(StreamReader::new(Box::pin(stream))),
        }))
    }
}

/// Map a `reqwest` failure onto a [`FailureClass`].
pub fn classify(err: reqwest::Error) -> ExecutionError {
    let class = if err.is_timeout() {
        FailureClass::Timeout
    } else if err.is_connect() {
        if mentions_dns(&err) {
            FailureClass::NameResolutionFailure
        } else {
            FailureClass::ConnectFailure
        }
    } else if err.is_builder() || err.is_request() || err.is_body() {
        FailureClass::SendFailure
    } else if err.is_decode() {
        FailureClass::ReceiveFailure
    } else if err.is_status() || err.is_redirect() {
        FailureClass::ProtocolError
    } else {
        FailureClass::UnknownError
    };
    ExecutionError::new(class, error_chain(&err))
}

fn mentions_dns(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if e.to_string().to_ascii_lowercase().contains("dns error") {
            return true;
        }
        current = e.source();
    }
    false
}

fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut current = err.source();
    while let Some(e) = current {
        message.push_str(": ");
        message.push_str(&e.to_string());
        current = e.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::target::extract_target;
    use axum::http::{HeaderMap, Method};

    fn request_to(target: &str) -> OutboundRequest {
        OutboundRequest {
            method: Method::GET,
            target: extract_target(Some(target)).unwrap(),
            headers: HeaderMap::new(),
            accept: None,
            content_type: None,
            body: None,
        }
    }

    #[tokio::test]
    async fn unparseable_target_is_a_connect_failure() {
        let executor = ReqwestExecutor::new(&TimeoutConfig::default()).unwrap();
        let err = executor.execute(request_to("not a uri")).await.unwrap_err();
        assert_eq!(err.class, FailureClass::ConnectFailure);
        assert!(err.body.is_none());
    }

    #[tokio::test]
    async fn relative_target_is_a_connect_failure() {
        let executor = ReqwestExecutor::new(&TimeoutConfig::default()).unwrap();
        let err = executor.execute(request_to("/only/a/path")).await.unwrap_err();
        assert_eq!(err.class, FailureClass::ConnectFailure);
    }

    #[tokio::test]
    async fn refused_connection_is_a_connect_failure() {
        // Bind then drop to get a port nothing listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let executor = ReqwestExecutor::new(&TimeoutConfig::default()).unwrap();
        let err = executor
            .execute(request_to(&format!("http://{}/", addr)))
            .await
            .unwrap_err();
        assert_eq!(err.class, FailureClass::ConnectFailure);
    }
}
