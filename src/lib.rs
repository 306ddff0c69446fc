//! Same-origin HTTP relay library.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod relay;

pub use config::RelayConfig;
pub use error::{ExecutionError, FailureClass, RelayError};
pub use http::RelayServer;
pub use lifecycle::Shutdown;
pub use relay::{relay, Executor, RelayResponse};
