use super::{select_endpoint, RejectedSource, ResolvedEndpoint, SourceKind, Sources, UrlRules};
use crate::config::EndpointConfig;
use crate::env::EnvVars;
use crate::errors::DispatchError;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use reqwest::Url;
use serde::Serialize;
use std::sync::Arc;

/// Lifecycle of the endpoint binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BindingState {
    /// Never resolved.
    Idle,
    /// A validated endpoint is active.
    Bound,
    /// The previous binding was dropped; the next `resolve` reruns selection.
    Invalidated,
    /// The last resolution found no valid source.
    Failed,
}

/// Snapshot for the diagnostics surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointStatus {
    pub state: BindingState,
    #[serde(serialize_with = "super::serialize_opt_url")]
    pub endpoint: Option<Url>,
    pub provenance: Option<SourceKind>,
    /// Epoch of the active binding, or of the last one before invalidation.
    pub epoch: u64,
    pub resolved_at: Option<DateTime<Utc>>,
    pub rejected: Vec<RejectedSource>,
    pub last_error: Option<String>,
}

#[derive(Debug)]
struct Binding {
    state: BindingState,
    active: Option<Arc<ResolvedEndpoint>>,
    epoch: u64,
    rejected: Vec<RejectedSource>,
    last_error: Option<String>,
}

/// Owns the sources and the epoch-versioned binding.
///
/// `resolve` is idempotent until `invalidate` is called. Readers get an
/// `Arc<ResolvedEndpoint>` snapshot, so invalidating never disturbs a call
/// that already captured one.
#[derive(Debug)]
pub struct EndpointResolver {
    sources: Sources,
    rules: UrlRules,
    binding: RwLock<Binding>,
}

impl EndpointResolver {
    pub fn new(sources: impl Into<Sources>, rules: UrlRules) -> Self {
        Self {
            sources: sources.into(),
            rules,
            binding: RwLock::new(Binding {
                state: BindingState::Idle,
                active: None,
                epoch: 0,
                rejected: Vec::new(),
                last_error: None,
            }),
        }
    }

    /// Build the standard override > environment > default chain.
    pub fn from_config(
        override_value: Option<String>,
        env: &dyn EnvVars,
        config: &EndpointConfig,
    ) -> Self {
        Self::new(
            Sources::standard(override_value, env, config),
            UrlRules::from(config),
        )
    }

    pub fn sources(&self) -> &Sources {
        &self.sources
    }

    /// Return the active binding, running selection first if there is none.
    pub fn resolve(&self) -> Result<Arc<ResolvedEndpoint>, DispatchError> {
        if let Some(active) = self.binding.read().active.clone() {
            return Ok(active);
        }

        let _span = tracing::debug_span!("resolve").entered();
        let mut binding = self.binding.write();
        // Another caller may have resolved while we waited for the lock.
        if let Some(active) = binding.active.clone() {
            return Ok(active);
        }

        tracing::debug!(
            sources = self.sources.len(),
            previous_epoch = binding.epoch,
            "resolving endpoint"
        );

        match select_endpoint(self.sources.as_slice(), &self.rules) {
            Ok(selection) => {
                for rejected in &selection.rejected {
                    tracing::debug!(
                        kind = %rejected.kind,
                        reason = %rejected.reason,
                        "endpoint source skipped"
                    );
                }
                binding.epoch += 1;
                let resolved = Arc::new(ResolvedEndpoint {
                    url: selection.url,
                    provenance: selection.kind,
                    epoch: binding.epoch,
                    resolved_at: Utc::now(),
                });
                tracing::info!(
                    endpoint = %resolved.url,
                    provenance = %resolved.provenance,
                    epoch = resolved.epoch,
                    "endpoint bound"
                );
                binding.state = BindingState::Bound;
                binding.active = Some(Arc::clone(&resolved));
                binding.rejected = selection.rejected;
                binding.last_error = None;
                Ok(resolved)
            }
            Err((err, rejected)) => {
                for source in &rejected {
                    tracing::warn!(
                        kind = %source.kind,
                        reason = %source.reason,
                        "endpoint source rejected"
                    );
                }
                tracing::error!(error = %err, "endpoint resolution failed");
                binding.state = BindingState::Failed;
                binding.rejected = rejected;
                binding.last_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Drop the active binding. Returns the epoch that was dropped, if any.
    pub fn invalidate(&self) -> Option<u64> {
        let mut binding = self.binding.write();
        let dropped = binding.active.take().map(|active| active.epoch);
        if let Some(epoch) = dropped {
            tracing::info!(epoch, "endpoint binding invalidated");
            binding.state = BindingState::Invalidated;
        }
        dropped
    }

    /// The active binding without triggering resolution.
    pub fn current(&self) -> Option<Arc<ResolvedEndpoint>> {
        self.binding.read().active.clone()
    }

    pub fn epoch(&self) -> u64 {
        self.binding.read().epoch
    }

    pub fn status(&self) -> EndpointStatus {
        let binding = self.binding.read();
        let active = binding.active.as_deref();
        EndpointStatus {
            state: binding.state,
            endpoint: active.map(|a| a.url.clone()),
            provenance: active.map(|a| a.provenance),
            epoch: binding.epoch,
            resolved_at: active.map(|a| a.resolved_at),
            rejected: binding.rejected.clone(),
            last_error: binding.last_error.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::EndpointSource;

    fn resolver(values: [Option<&str>; 3]) -> EndpointResolver {
        let kinds = [
            SourceKind::ExplicitOverride,
            SourceKind::EnvironmentVariable,
            SourceKind::CompiledDefault,
        ];
        let sources: Vec<_> = kinds
            .into_iter()
            .zip(values)
            .map(|(kind, value)| EndpointSource::new(kind, value.map(str::to_string)))
            .collect();
        EndpointResolver::new(sources, UrlRules::default())
    }

    #[test]
    fn test_starts_idle() {
        let r = resolver([None, None, Some("https://d.example/")]);
        let status = r.status();
        assert_eq!(status.state, BindingState::Idle);
        assert_eq!(status.epoch, 0);
        assert!(r.current().is_none());
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let r = resolver([None, Some("https://env.example/"), None]);
        let first = r.resolve().unwrap();
        let second = r.resolve().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.epoch, 1);
        assert_eq!(r.epoch(), 1);
    }

    #[test]
    fn test_invalidate_bumps_epoch_on_next_resolve() {
        let r = resolver([None, Some("https://env.example/"), None]);
        let first = r.resolve().unwrap();
        assert_eq!(r.invalidate(), Some(1));
        assert_eq!(r.status().state, BindingState::Invalidated);
        assert!(r.current().is_none());

        let second = r.resolve().unwrap();
        assert!(second.epoch > first.epoch);
        assert_eq!(second.url, first.url);
        // the old snapshot is untouched
        assert_eq!(first.epoch, 1);
    }

    #[test]
    fn test_invalidate_without_binding_is_noop() {
        let r = resolver([None, None, Some("https://d.example/")]);
        assert_eq!(r.invalidate(), None);
        assert_eq!(r.status().state, BindingState::Idle);
    }

    #[test]
    fn test_failure_records_rejections() {
        let r = resolver([Some(""), Some("https://stale.example/api/analysis"), None]);
        let err = r.resolve().unwrap_err();
        assert!(matches!(err, DispatchError::Configuration { .. }));

        let status = r.status();
        assert_eq!(status.state, BindingState::Failed);
        assert_eq!(status.epoch, 0);
        assert_eq!(status.rejected.len(), 3);
        assert_eq!(status.last_error.as_deref(), Some("configuration error: no valid endpoint"));
    }

    #[test]
    fn test_status_reports_binding() {
        let r = resolver([None, Some("bad"), Some("https://fallback.example/")]);
        r.resolve().unwrap();
        let status = r.status();
        assert_eq!(status.state, BindingState::Bound);
        assert_eq!(status.provenance, Some(SourceKind::CompiledDefault));
        assert_eq!(status.rejected.len(), 2);
        assert!(status.resolved_at.is_some());
    }
}
