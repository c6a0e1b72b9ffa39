use super::{EndpointSource, SourceKind};
use crate::config::EndpointConfig;
use reqwest::Url;
use serde::Serialize;
use std::fmt;

/// Validation rules applied to every candidate URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlRules {
    /// Path suffixes that only ever reach an obsolete backend.
    pub deprecated_path_suffixes: Vec<String>,
}

impl Default for UrlRules {
    fn default() -> Self {
        Self::from(&EndpointConfig::default())
    }
}

impl From<&EndpointConfig> for UrlRules {
    fn from(config: &EndpointConfig) -> Self {
        Self {
            deprecated_path_suffixes: config
                .deprecated_path_suffixes
                .iter()
                .map(|suffix| normalize_path(suffix).to_ascii_lowercase())
                .filter(|suffix| !suffix.is_empty())
                .collect(),
        }
    }
}

/// Why a source was not eligible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "kebab-case")]
pub enum Rejection {
    Absent,
    Empty,
    Malformed { detail: String },
    UnsupportedScheme { scheme: String },
    MissingHost,
    QueryOrFragment,
    DeprecatedPath { suffix: String },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => f.write_str("not set"),
            Self::Empty => f.write_str("empty value"),
            Self::Malformed { detail } => write!(f, "malformed URL ({})", detail),
            Self::UnsupportedScheme { scheme } => {
                write!(f, "scheme `{}` is not http or https", scheme)
            }
            Self::MissingHost => f.write_str("URL has no host"),
            Self::QueryOrFragment => f.write_str("base URL carries a query or fragment"),
            Self::DeprecatedPath { suffix } => {
                write!(f, "path ends in deprecated route `{}`", suffix)
            }
        }
    }
}

/// A source that lost, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedSource {
    pub kind: SourceKind,
    pub priority: i32,
    pub value: Option<String>,
    #[serde(flatten)]
    pub reason: Rejection,
}

/// Check one source, returning its parsed URL when eligible.
pub fn validate_source(source: &EndpointSource, rules: &UrlRules) -> Result<Url, Rejection> {
    let raw = source.value.as_deref().ok_or(Rejection::Absent)?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Rejection::Empty);
    }

    let url = Url::parse(trimmed).map_err(|e| Rejection::Malformed {
        detail: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(Rejection::UnsupportedScheme {
                scheme: other.to_string(),
            })
        }
    }

    if url.host_str().is_none_or(str::is_empty) {
        return Err(Rejection::MissingHost);
    }

    if url.query().is_some() || url.fragment().is_some() {
        return Err(Rejection::QueryOrFragment);
    }

    let path = normalize_path(url.path()).to_ascii_lowercase();
    if let Some(suffix) = rules
        .deprecated_path_suffixes
        .iter()
        .find(|suffix| path.ends_with(suffix.as_str()))
    {
        return Err(Rejection::DeprecatedPath {
            suffix: suffix.clone(),
        });
    }

    Ok(url)
}

/// Leading slash kept, trailing slashes dropped.
fn normalize_path(path: &str) -> String {
    let trimmed = path.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}
