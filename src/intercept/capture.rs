//! Body capture policy.
//!
//! # Responsibilities
//! - Decide whether a response body is captured (size-threshold policy)
//! - Render captured bytes for the audit log: decode, UTF-8, excerpt
//! - Degrade gracefully on decode failure without touching the proxy path
//!
//! # Design Decisions
//! - The decision reads the declared `content-length`, not the received
//!   bytes: an unknown length (chunked transfer) is never captured
//! - Exactly-at-threshold is captured; one byte over is not
//! - Request bodies are excerpted to a character budget; response bodies are
//!   already bounded by the capture threshold and stored whole

use crate::intercept::codec::{self, ContentEncoding};

/// Whether a response body will be captured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureDecision {
    Capture,
    /// Metadata-only; carries the `body_omitted` reason.
    Skip(String),
}

/// Decide from the declared `content-length` whether to capture a body.
pub fn decide(content_length: Option<u64>, max_body_bytes: u64) -> CaptureDecision {
    match content_length {
        Some(n) if n <= max_body_bytes => CaptureDecision::Capture,
        Some(n) => CaptureDecision::Skip(format!(
            "body not logged: {n} bytes exceeds capture threshold"
        )),
        None => CaptureDecision::Skip("body not logged: unknown length".to_string()),
    }
}

/// Render a captured response body for the audit entry.
///
/// Decodes per the declared encoding and interprets the result as UTF-8
/// (lossy). When decoding fails the raw bytes are rendered instead, behind
/// an inline error marker; the failure never propagates.
pub fn render_response_body(bytes: &[u8], encoding: &ContentEncoding) -> String {
    match codec::decode(encoding, bytes) {
        Ok(decoded) => String::from_utf8_lossy(&decoded).into_owned(),
        Err(err) => format!(
            "[error decoding body: {err}] {}",
            String::from_utf8_lossy(bytes)
        ),
    }
}

/// Render a request body excerpt, or `None` for an empty body.
pub fn render_request_body(bytes: &[u8], excerpt_chars: usize) -> Option<String> {
    if bytes.is_empty() {
        return None;
    }
    let text = String::from_utf8_lossy(bytes);
    Some(excerpt(&text, excerpt_chars, bytes.len()))
}

/// Truncate `text` to a character budget, appending an explicit marker so
/// log readers can tell the capture is partial.
fn excerpt(text: &str, budget_chars: usize, total_bytes: usize) -> String {
    match text.char_indices().nth(budget_chars) {
        None => text.to_string(),
        Some((cut, _)) => format!(
            "{}... [truncated, {} bytes total]",
            &text[..cut],
            total_bytes
        ),
    }
}
