//! Human-readable and JSON views of the endpoint binding.
//!
//! The status report answers the questions asked when a deployed build talks
//! to the wrong backend: which URL is active, where it came from, which epoch
//! it belongs to, and why every other source lost.

use crate::endpoint::{BindingState, EndpointStatus};
use crate::errors::DispatchError;
use colored::*;
use std::fmt::Write;

/// Render the status as an indented terminal report.
pub fn render_status(status: &EndpointStatus) -> String {
    let mut out = String::new();
    let state = match status.state {
        BindingState::Bound => "bound".green().bold(),
        BindingState::Idle => "idle".yellow(),
        BindingState::Invalidated => "invalidated".yellow(),
        BindingState::Failed => "failed".red().bold(),
    };

    let _ = writeln!(out, "{}", "Endpoint status".bold());
    let _ = writeln!(out, "  state:       {}", state);
    match (&status.endpoint, status.provenance) {
        (Some(url), Some(kind)) => {
            let _ = writeln!(out, "  endpoint:    {}", url.as_str().cyan());
            let _ = writeln!(out, "  provenance:  {}", kind);
        }
        _ => {
            let _ = writeln!(out, "  endpoint:    {}", "(none)".dimmed());
        }
    }
    let _ = writeln!(out, "  epoch:       {}", status.epoch);
    if let Some(at) = status.resolved_at {
        let _ = writeln!(out, "  resolved at: {}", at.format("%Y-%m-%d %H:%M:%S UTC"));
    }

    if !status.rejected.is_empty() {
        let _ = writeln!(out, "{}", "Skipped sources".bold());
        for rejected in &status.rejected {
            let value = rejected
                .value
                .as_deref()
                .map(|v| format!(" ({})", v))
                .unwrap_or_default();
            let _ = writeln!(
                out,
                "  - {} [priority {}]{}: {}",
                rejected.kind, rejected.priority, value, rejected.reason
            );
        }
    }

    if let Some(error) = &status.last_error {
        let _ = writeln!(out, "{} {}", "error:".red().bold(), error);
    }
    out
}

/// Pretty JSON form of the status.
pub fn status_json(status: &EndpointStatus) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(status)
}

/// One-line hint telling the operator what to look at next.
pub fn hint_for(error: &DispatchError) -> &'static str {
    match error {
        DispatchError::Configuration { .. } => {
            "set --endpoint, the configured environment variable, or endpoint.default_origin"
        }
        DispatchError::NotBound { .. } => {
            "the endpoint binding was invalidated; resolve it again before sending"
        }
        DispatchError::Transport { .. } => {
            "the backend is unreachable; check network access and that the service is up"
        }
        DispatchError::EndpointMismatch { .. } => {
            "the endpoint answered with another backend's response; correct the configuration and re-resolve"
        }
        DispatchError::Remote { status_code, .. } if (400..500).contains(status_code) => {
            "the backend rejected the request; check the payload"
        }
        DispatchError::Remote { .. } => "the backend failed while processing the request",
        DispatchError::Cancelled { .. } => "the request was cancelled",
    }
}

/// Multi-line error report with code, category, and hint.
pub fn render_error(error: &DispatchError) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} [{}] {}",
        "error:".red().bold(),
        error.code(),
        error
    );
    let _ = writeln!(out, "  category: {}", error.category());
    if let DispatchError::Remote { body, .. } = error {
        if !body.is_empty() {
            let _ = writeln!(out, "  body:     {}", body);
        }
    }
    let _ = writeln!(out, "  hint:     {}", hint_for(error));
    out
}
