//! Config file discovery and layered loading.
//!
//! Implements the `Config::load()` algorithm:
//! 1. Parse embedded `defaults.toml` → base
//! 2. Merge the user config (`<config dir>/evstore/config.toml`) if present
//! 3. Merge the explicit config file (argument, else `EVSTORE_CONFIG`)
//! 4. Apply env var fallbacks for fields no file set
//! 5. Deserialize the merged tree → `Config`
//! 6. Validate

use std::collections::HashMap;
use std::hash::BuildHasher;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::env::{apply_env_fallbacks, collect_env_vars};
use crate::error::{ConfigError, ConfigResult};
use crate::merge::{ConfigLayer, FieldSources, deep_merge_tracking, record_leaves};
use crate::show::ResolvedConfig;
use crate::types::Config;
use crate::validate;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Env var naming an explicit config file when none is passed.
pub const CONFIG_PATH_VAR: &str = "EVSTORE_CONFIG";

/// Maximum allowed config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// Load configuration from the process environment and the platform
/// config directory.
///
/// # Errors
///
/// Returns a [`ConfigError`] if a config file is unreadable or malformed, or
/// if the merged configuration fails validation.
pub fn load(config_file: Option<&Path>) -> ConfigResult<ResolvedConfig> {
    let user_file = user_config_path();
    load_from(config_file, user_file.as_deref(), &collect_env_vars())
}

/// Load configuration from explicit layers.
///
/// `user_file` is skipped when missing; `config_file` must exist.
///
/// # Errors
///
/// Returns a [`ConfigError`] if a config file is unreadable or malformed, or
/// if the merged configuration fails validation.
pub fn load_from<S: BuildHasher>(
    config_file: Option<&Path>,
    user_file: Option<&Path>,
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<ResolvedConfig> {
    // 1. Embedded defaults.
    let mut merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError {
            path: "<embedded defaults>".to_owned(),
            source: e,
        })?;

    let mut field_sources = FieldSources::new();
    let mut loaded_files = Vec::new();
    record_leaves(&merged, "", &ConfigLayer::Defaults, &mut field_sources);

    // 2. User config.
    if let Some(path) = user_file
        && let Some(overlay) = try_load_file(path)?
    {
        deep_merge_tracking(&mut merged, &overlay, "", &ConfigLayer::User, &mut field_sources);
        loaded_files.push(path.display().to_string());
        info!(path = %path.display(), "loaded user config");
    }

    // 3. Explicit config file.
    let explicit = config_file
        .map(Path::to_path_buf)
        .or_else(|| env_vars.get(CONFIG_PATH_VAR).map(PathBuf::from));
    if let Some(path) = explicit {
        let overlay = read_file(&path)?;
        deep_merge_tracking(&mut merged, &overlay, "", &ConfigLayer::File, &mut field_sources);
        loaded_files.push(path.display().to_string());
        info!(path = %path.display(), "loaded config file");
    }

    // 4. Env var fallbacks.
    let env_count = apply_env_fallbacks(&mut merged, &mut field_sources, env_vars);
    if env_count > 0 {
        debug!(count = env_count, "applied environment variable fallbacks");
    }

    // 5. Deserialize.
    let config: Config =
        merged
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::ParseError {
                path: "<merged config>".to_owned(),
                source: e,
            })?;

    // 6. Validate.
    validate::validate(&config)?;

    Ok(ResolvedConfig {
        config,
        field_sources,
        loaded_files,
    })
}

/// Load a config from a single file (no layering, no env fallbacks).
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read, parsed, or
/// validated.
pub fn load_file(path: &Path) -> ConfigResult<Config> {
    let value = read_file(path)?;
    let config: Config = value
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::ParseError {
            path: path.display().to_string(),
            source: e,
        })?;
    validate::validate(&config)?;
    Ok(config)
}

/// Path of the user-level config file, if the platform has a config dir.
#[must_use]
pub fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "evstore")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Read and parse a file that must exist.
fn read_file(path: &Path) -> ConfigResult<toml::Value> {
    let metadata = std::fs::metadata(path).map_err(|e| ConfigError::ReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    check_size(path, &metadata)?;
    parse_file(path)
}

/// Try to load a file, returning `None` if it doesn't exist.
fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    let metadata = match std::fs::metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "config file not found, skipping");
            return Ok(None);
        },
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.display().to_string(),
                source: e,
            });
        },
    };
    check_size(path, &metadata)?;
    parse_file(path).map(Some)
}

/// Reject files over [`MAX_CONFIG_FILE_SIZE`] before reading them.
fn check_size(path: &Path, metadata: &std::fs::Metadata) -> ConfigResult<()> {
    if metadata.len() > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!(
                "config file is {} bytes, exceeding the {MAX_CONFIG_FILE_SIZE} byte limit",
                metadata.len()
            ),
        });
    }
    Ok(())
}

fn parse_file(path: &Path) -> ConfigResult<toml::Value> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })
}
