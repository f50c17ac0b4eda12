//! Observability subsystem.
//!
//! # Design Decisions
//! - Structured logging via tracing; the audit trail itself goes through
//!   the sink, not the logging layer (echo is a convenience copy)
//! - Metrics are cheap atomic updates; the Prometheus endpoint is optional

pub mod logging;
pub mod metrics;
