//! Same-origin relay core.
//!
//! # Data Flow
//! ```text
//! InboundRequest
//!     → target.rs (decode query string into TargetUri)
//!     → translate.rs (filter headers, copy POST body) → OutboundRequest
//!     → executor.rs (issue the call) → OutboundResponse
//!     → buffer.rs (read body of unknown length)
//!     → handler.rs → RelayResponse
//! ```
//!
//! # Design Decisions
//! - Stateless per request: nothing outlives a single call to `relay`
//! - No retries, no caching, no streaming before the body is complete
//! - Every failure becomes a response value

pub mod buffer;
pub mod executor;
pub mod handler;
pub mod target;
pub mod translate;

pub use buffer::{GrowableBuffer, ReadState};
pub use executor::{Executor, OutboundResponse, ReqwestExecutor};
pub use handler::{relay, RelayResponse, RelaySettings};
pub use target::{encode_target, extract_target, TargetUri};
pub use translate::{InboundBody, InboundRequest, OutboundBody, OutboundRequest};
