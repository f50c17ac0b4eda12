//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Initialize subsystems → Start listener
//!
//! Shutdown (shutdown.rs):
//!     SIGINT/SIGTERM → broadcast trigger → stop accepting →
//!     drain connections → final log flush → exit
//! ```

pub mod shutdown;

pub use shutdown::{spawn_signal_listener, Shutdown};
