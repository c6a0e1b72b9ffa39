use crate::config::EndpointConfig;
use crate::env::EnvVars;
use serde::Serialize;
use std::fmt;

/// Endpoint baked in at build time via `INSIGHTLINK_DEFAULT_ENDPOINT`.
///
/// Absent unless the variable was set when the crate was compiled. Build-time
/// injection is exactly the mechanism that goes missing in some pipelines, so
/// its absence is a normal case rather than an error.
pub const COMPILED_DEFAULT_ENDPOINT: Option<&str> = option_env!("INSIGHTLINK_DEFAULT_ENDPOINT");

/// Which kind of configuration produced a candidate endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    ExplicitOverride,
    EnvironmentVariable,
    CompiledDefault,
}

impl SourceKind {
    /// Priority used when a source is built without an explicit one.
    pub const fn default_priority(self) -> i32 {
        match self {
            Self::ExplicitOverride => 0,
            Self::EnvironmentVariable => 10,
            Self::CompiledDefault => 20,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ExplicitOverride => "explicit-override",
            Self::EnvironmentVariable => "environment-variable",
            Self::CompiledDefault => "compiled-default",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One candidate origin for the base URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointSource {
    pub kind: SourceKind,
    pub value: Option<String>,
    pub priority: i32,
}

impl EndpointSource {
    pub fn new(kind: SourceKind, value: Option<String>) -> Self {
        Self::with_priority(kind, value, kind.default_priority())
    }

    pub fn with_priority(kind: SourceKind, value: Option<String>, priority: i32) -> Self {
        Self {
            kind,
            value,
            priority,
        }
    }
}

/// Ordered set of sources, built once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sources {
    sources: Vec<EndpointSource>,
}

impl Sources {
    pub fn new(sources: Vec<EndpointSource>) -> Self {
        Self { sources }
    }

    /// Standard three-source setup: override, `config.env_var` read from
    /// `env`, then the configured default origin or the compiled one.
    pub fn standard(
        override_value: Option<String>,
        env: &dyn EnvVars,
        config: &EndpointConfig,
    ) -> Self {
        let default_value = config
            .default_origin
            .clone()
            .or_else(|| COMPILED_DEFAULT_ENDPOINT.map(str::to_string));

        Self::new(vec![
            EndpointSource::new(SourceKind::ExplicitOverride, override_value),
            EndpointSource::new(SourceKind::EnvironmentVariable, env.var(&config.env_var)),
            EndpointSource::new(SourceKind::CompiledDefault, default_value),
        ])
    }

    pub fn push(&mut self, source: EndpointSource) {
        self.sources.push(source);
    }

    pub fn as_slice(&self) -> &[EndpointSource] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl From<Vec<EndpointSource>> for Sources {
    fn from(sources: Vec<EndpointSource>) -> Self {
        Self::new(sources)
    }
}
