//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID, read into InboundRequest)
//!     → relay (translate, execute, buffer)
//!     → response.rs (status, content type, body, reason phrase)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{request_id_middleware, RequestId, RequestIdExt, X_REQUEST_ID};
pub use response::X_RELAY_ERROR;
pub use server::{AppState, RelayServer};
