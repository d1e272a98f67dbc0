//! Deep merge of TOML layers with per-field source tracking.
//!
//! The merge works on raw [`toml::Value`] trees, so a key missing from an
//! overlay never resets the value set by a lower layer.

use std::collections::HashMap;
use std::fmt;

/// Which configuration layer a value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigLayer {
    /// Compiled-in defaults (`defaults.toml`).
    Defaults,
    /// User-level configuration (`<config dir>/evstore/config.toml`).
    User,
    /// A config file passed explicitly to the loader.
    File,
    /// Environment variable fallback.
    Environment,
}

impl ConfigLayer {
    /// Whether the layer is a config file.
    #[must_use]
    pub fn is_file(&self) -> bool {
        matches!(self, Self::User | Self::File)
    }
}

impl fmt::Display for ConfigLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Defaults => write!(f, "defaults"),
            Self::User => write!(f, "user"),
            Self::File => write!(f, "file"),
            Self::Environment => write!(f, "env"),
        }
    }
}

/// Dotted field path to the layer that last set it.
pub type FieldSources = HashMap<String, ConfigLayer>;

/// Deep-merge `overlay` into `base`, recording `layer` for every leaf the
/// overlay sets.
///
/// Tables merge per key. Scalars and arrays replace the base value.
pub fn deep_merge_tracking(
    base: &mut toml::Value,
    overlay: &toml::Value,
    prefix: &str,
    layer: &ConfigLayer,
    sources: &mut FieldSources,
) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let path = join_path(prefix, key);
                if let Some(base_val) = base_table.get_mut(key) {
                    deep_merge_tracking(base_val, overlay_val, &path, layer, sources);
                } else {
                    base_table.insert(key.clone(), overlay_val.clone());
                    record_leaves(overlay_val, &path, layer, sources);
                }
            }
        },
        (base, overlay) => {
            *base = overlay.clone();
            record_leaves(overlay, prefix, layer, sources);
        },
    }
}

/// Record `layer` for every leaf below `prefix`.
pub fn record_leaves(
    val: &toml::Value,
    prefix: &str,
    layer: &ConfigLayer,
    sources: &mut FieldSources,
) {
    if let toml::Value::Table(table) = val {
        for (key, child) in table {
            record_leaves(child, &join_path(prefix, key), layer, sources);
        }
    } else {
        sources.insert(prefix.to_owned(), layer.clone());
    }
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_owned()
    } else {
        format!("{prefix}.{key}")
    }
}
