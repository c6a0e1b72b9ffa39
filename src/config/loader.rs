use std::fs;
use std::path::{Path, PathBuf};

use super::InsightConfig;
use crate::errors::ConfigError;

pub const CONFIG_FILE_NAME: &str = ".insightlink.toml";

const MAX_TRAVERSAL_DEPTH: usize = 10;

/// Parse and validate config from a TOML string.
pub fn parse_config(contents: &str, path: &Path) -> Result<InsightConfig, ConfigError> {
    let config = toml::from_str::<InsightConfig>(contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    validate_config(&config)?;
    Ok(config)
}

/// Field-level checks shared by file loading and command-line overrides.
pub fn validate_config(config: &InsightConfig) -> Result<(), ConfigError> {
    if config.endpoint.env_var.trim().is_empty() {
        return Err(ConfigError::invalid("endpoint.env_var", "must not be empty"));
    }
    let path = &config.endpoint.request_path;
    if !path.is_empty() && !path.starts_with('/') {
        return Err(ConfigError::invalid(
            "endpoint.request_path",
            format!("`{}` must be empty or start with '/'", path),
        ));
    }
    if !(0.0..=1.0).contains(&config.retry.jitter_factor) {
        return Err(ConfigError::invalid(
            "retry.jitter_factor",
            "must be between 0.0 and 1.0",
        ));
    }
    if config.client.request_timeout_seconds == 0 {
        return Err(ConfigError::invalid(
            "client.request_timeout_seconds",
            "must be greater than zero",
        ));
    }
    if config.client.connect_timeout_seconds == 0 {
        return Err(ConfigError::invalid(
            "client.connect_timeout_seconds",
            "must be greater than zero",
        ));
    }
    Ok(())
}

/// Load a config file from an explicit path. Missing files are an error here.
pub fn load_config_from_path(path: &Path) -> Result<InsightConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config = parse_config(&contents, path)?;
    tracing::debug!(path = %path.display(), "loaded config");
    Ok(config)
}

/// Directory ancestors of `start`, nearest first, up to `max_depth` entries.
pub fn directory_ancestors(start: PathBuf, max_depth: usize) -> impl Iterator<Item = PathBuf> {
    std::iter::successors(Some(start), |dir| {
        let mut parent = dir.clone();
        if parent.pop() {
            Some(parent)
        } else {
            None
        }
    })
    .take(max_depth)
}

fn try_load(path: &Path) -> Option<Result<InsightConfig, ConfigError>> {
    match fs::read_to_string(path) {
        Ok(contents) => Some(parse_config(&contents, path)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(source) => Some(Err(ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })),
    }
}

/// Find the nearest `.insightlink.toml` above `start`, then fall back to the
/// user config directory. No file at all yields the defaults; a file that
/// exists but is broken is an error rather than a silent fallback.
pub fn load_config(start: &Path) -> Result<InsightConfig, ConfigError> {
    let user_config = dirs::config_dir().map(|dir| dir.join("insightlink").join("config.toml"));

    let found = directory_ancestors(start.to_path_buf(), MAX_TRAVERSAL_DEPTH)
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .chain(user_config)
        .find_map(|path| try_load(&path).map(|result| (path, result)));

    match found {
        Some((path, result)) => {
            let config = result?;
            tracing::debug!(path = %path.display(), "loaded config");
            Ok(config)
        }
        None => {
            tracing::debug!(
                depth = MAX_TRAVERSAL_DEPTH,
                "no config file found, using defaults"
            );
            Ok(InsightConfig::default())
        }
    }
}
