//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! relay + http layers produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request ID is attached to every log line of a request via a span
//! - Metrics stay no-ops unless the exporter is enabled

pub mod logging;
pub mod metrics;
