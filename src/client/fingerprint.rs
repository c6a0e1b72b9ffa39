//! Wrong-backend detection for success responses.
//!
//! A 200 is only a success if it came from the analysis backend. Two shapes
//! are known to come from somewhere else:
//!
//! - the legacy envelope served by the obsolete `/api/analysis` route
//!   (`response.summary` + `response.key_insights`, no `response.summary_ai`,
//!   and no `model`, `engine` or `data_analysis.document_type`; the current
//!   backend's document replies carry those);
//! - an HTML document, which is what a static host returns when a stale
//!   route falls through to the single-page app's index.

use super::transport::WireResponse;
use crate::payload::AnalysisEnvelope;

/// Reason the response is not from the expected backend, if it isn't.
pub fn detect_mismatch(response: &WireResponse) -> Option<String> {
    if is_html(response) {
        return Some("received an HTML document instead of an analysis response".to_string());
    }

    let envelope = AnalysisEnvelope::parse(&response.body)?;
    if envelope.is_legacy() {
        return Some(
            "response matches the legacy envelope (summary/key_insights without summary_ai)"
                .to_string(),
        );
    }
    None
}

fn is_html(response: &WireResponse) -> bool {
    let declared = response
        .content_type
        .as_deref()
        .is_some_and(|ct| ct.to_ascii_lowercase().starts_with("text/html"));
    if declared {
        return true;
    }

    let head: String = String::from_utf8_lossy(&response.body[..response.body.len().min(64)])
        .trim_start()
        .chars()
        .take(15)
        .collect::<String>()
        .to_ascii_lowercase();
    head.starts_with("<!doctype html") || head.starts_with("<html")
}
