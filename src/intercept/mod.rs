//! Request/response interception subsystem.
//!
//! # Data Flow
//! ```text
//! proxy handler
//!     → capture.rs (should this body be logged? render it)
//!     → codec.rs (decode per content-encoding)
//!     → entry.rs (build the request/response/error record)
//!     → serialized line handed to the log sink
//! ```
//!
//! # Design Decisions
//! - Interception observes; it never alters what the client receives
//! - Decode and UTF-8 failures degrade the audit record inline, they do not
//!   fail the request
//! - Entries are serialized at enqueue time so the sink deals only in lines

pub mod capture;
pub mod codec;
pub mod entry;

pub use capture::CaptureDecision;
pub use codec::ContentEncoding;
pub use entry::LogEntry;
