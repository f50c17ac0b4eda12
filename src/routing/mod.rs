//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request path
//!     → router.rs (first-segment lookup)
//!     → Return: Resolved { environment, rewritten_path } or no-match
//!
//! Router compilation (at startup):
//!     EnvironmentConfig[]
//!     → Parse upstream URLs
//!     → Freeze as immutable EnvironmentRouter
//! ```
//!
//! # Design Decisions
//! - The environment prefix is never forwarded upstream
//! - Unknown prefixes are an explicit no-match: the caller answers 400 and
//!   makes no upstream call
//! - Deterministic: same path always resolves to the same environment

pub mod router;

pub use router::{Environment, EnvironmentRouter, Resolved};
