//! Environment-routing reverse proxy with a structured audit trail.
//!
//! # Architecture Overview
//!
//! ```text
//!                   ┌────────────────────────────────────────────────┐
//!                   │                  AUDIT PROXY                    │
//!                   │                                                 │
//!   Client Request  │  ┌─────────┐   ┌──────────┐   ┌─────────────┐  │
//!   ────────────────┼─▶│  http   │──▶│ routing  │──▶│   http      │──┼──▶ Upstream
//!                   │  │ server  │   │ (prefix) │   │  forwarder  │  │    (per env)
//!                   │  └────┬────┘   └──────────┘   └──────┬──────┘  │
//!                   │       │                              │         │
//!                   │       ▼                              ▼         │
//!                   │  ┌──────────────────────────────────────────┐  │
//!                   │  │   intercept: entries, capture, codec     │  │
//!                   │  └────────────────────┬─────────────────────┘  │
//!                   │                       ▼                        │
//!                   │  ┌──────────────────────────────────────────┐  │
//!                   │  │  sink: per-env buffers → daily log files │  │
//!                   │  └──────────────────────────────────────────┘  │
//!                   │                                                 │
//!                   │  config · lifecycle · observability             │
//!                   └────────────────────────────────────────────────┘
//! ```
//!
//! The first path segment of every inbound request selects one of a fixed
//! set of environments; the rest of the path is forwarded to that
//! environment's upstream with the prefix stripped. Around each call the
//! interception layer records request and response entries — headers,
//! bounded bodies (decompressed for the log), status, and timing — which
//! the sink batches into per-environment daily files. Logging failures
//! degrade the audit record only; they never affect what the client
//! receives.

// Core subsystems
pub mod config;
pub mod http;
pub mod intercept;
pub mod routing;
pub mod sink;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
