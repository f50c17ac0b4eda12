//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, proxy handler)
//!     → [environment router resolves the upstream]
//!     → forward.rs (outbound call, header hygiene)
//!     → [interception layer records the exchange]
//!     → response relayed to client
//! ```

pub mod forward;
pub mod server;

pub use server::HttpServer;
