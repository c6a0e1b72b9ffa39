//! Endpoint sources, validation, and epoch-versioned resolution.
//!
//! An endpoint can come from three places, tried in priority order:
//!
//! 1. an explicit runtime override,
//! 2. an environment variable,
//! 3. a compiled-in (or configured) default origin.
//!
//! [`select_endpoint`] is the pure selection rule. [`EndpointResolver`] wraps
//! it with the active binding and its epoch counter.

mod resolver;
mod sources;
mod validate;

pub use resolver::{BindingState, EndpointResolver, EndpointStatus};
pub use sources::{EndpointSource, SourceKind, Sources, COMPILED_DEFAULT_ENDPOINT};
pub use validate::{validate_source, RejectedSource, Rejection, UrlRules};

use crate::errors::DispatchError;
use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::{Serialize, Serializer};

pub(crate) fn serialize_url<S: Serializer>(url: &Url, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(url)
}

pub(crate) fn serialize_opt_url<S: Serializer>(
    url: &Option<Url>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match url {
        Some(url) => serializer.collect_str(url),
        None => serializer.serialize_none(),
    }
}

/// The single chosen base URL for one epoch.
///
/// Immutable once created; the resolver hands it out as `Arc<ResolvedEndpoint>`
/// so in-flight calls keep the snapshot they started with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedEndpoint {
    #[serde(serialize_with = "serialize_url")]
    pub url: Url,
    pub provenance: SourceKind,
    pub epoch: u64,
    pub resolved_at: DateTime<Utc>,
}

impl ResolvedEndpoint {
    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    /// Full request URL for `path`, joined without doubling slashes.
    pub fn request_url(&self, path: &str) -> String {
        let mut url = self.url.clone();
        if !path.is_empty() {
            let joined = format!(
                "{}/{}",
                url.path().trim_end_matches('/'),
                path.trim_start_matches('/')
            );
            url.set_path(&joined);
        }
        url.to_string()
    }
}

/// Outcome of the pure selection step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub url: Url,
    pub kind: SourceKind,
    pub priority: i32,
    pub rejected: Vec<RejectedSource>,
}

/// Pick the valid source with the lowest priority.
///
/// Ties go to the source listed first. Deterministic and side-effect free.
pub fn select_endpoint(
    sources: &[EndpointSource],
    rules: &UrlRules,
) -> Result<Selection, (DispatchError, Vec<RejectedSource>)> {
    let mut rejected = Vec::new();
    let mut best: Option<(i32, SourceKind, Url)> = None;

    for source in sources {
        match validate_source(source, rules) {
            Ok(url) => {
                let better = best
                    .as_ref()
                    .is_none_or(|(priority, _, _)| source.priority < *priority);
                if better {
                    best = Some((source.priority, source.kind, url));
                }
            }
            Err(reason) => rejected.push(RejectedSource {
                kind: source.kind,
                priority: source.priority,
                value: source.value.clone(),
                reason,
            }),
        }
    }

    match best {
        Some((priority, kind, url)) => Ok(Selection {
            url,
            kind,
            priority,
            rejected,
        }),
        None => Err((DispatchError::configuration("no valid endpoint"), rejected)),
    }
}
