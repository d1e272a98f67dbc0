//! Environment variable fallbacks.
//!
//! Env vars are a fallback, not an override: they only apply to fields that
//! no config file set.

use std::collections::HashMap;
use std::hash::BuildHasher;

use tracing::debug;

use crate::merge::{ConfigLayer, FieldSources};

/// Mapping from environment variable name to config field path.
struct EnvMapping {
    var_name: &'static str,
    field_path: &'static str,
}

/// All supported `EVSTORE_*` env var mappings.
const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        var_name: "EVSTORE_FAILURE_POLICY",
        field_path: "dispatch.failure_policy",
    },
    EnvMapping {
        var_name: "EVSTORE_CATCH_PANICS",
        field_path: "dispatch.catch_panics",
    },
    EnvMapping {
        var_name: "EVSTORE_LOG",
        field_path: "logging.level",
    },
    EnvMapping {
        var_name: "EVSTORE_LOG_FORMAT",
        field_path: "logging.format",
    },
];

/// Names of every environment variable the loader reads.
#[must_use]
pub fn supported_vars() -> Vec<&'static str> {
    ENV_MAPPINGS.iter().map(|m| m.var_name).collect()
}

/// Apply environment variable fallbacks to fields no config file set.
///
/// Returns the number of env vars applied.
pub fn apply_env_fallbacks<S: BuildHasher>(
    merged: &mut toml::Value,
    sources: &mut FieldSources,
    env_vars: &HashMap<String, String, S>,
) -> usize {
    let mut count: usize = 0;

    for mapping in ENV_MAPPINGS {
        if sources
            .get(mapping.field_path)
            .is_some_and(ConfigLayer::is_file)
        {
            continue;
        }

        let Some(val) = env_vars.get(mapping.var_name) else {
            continue;
        };

        debug!(
            var = mapping.var_name,
            field = mapping.field_path,
            "applying env var fallback"
        );
        set_field(merged, mapping.field_path, coerce_to_toml_value(mapping.field_path, val));
        sources.insert(mapping.field_path.to_owned(), ConfigLayer::Environment);
        count = count.saturating_add(1);
    }

    count
}

/// Set a dotted `path` in the tree, creating intermediate tables.
fn set_field(root: &mut toml::Value, path: &str, value: toml::Value) {
    let Some((parents, leaf)) = path.rsplit_once('.') else {
        if let Some(table) = root.as_table_mut() {
            table.insert(path.to_owned(), value);
        }
        return;
    };

    let mut current = root;
    for segment in parents.split('.') {
        let Some(table) = current.as_table_mut() else {
            return;
        };
        current = table
            .entry(segment.to_owned())
            .or_insert(toml::Value::Table(toml::map::Map::new()));
    }

    if let Some(table) = current.as_table_mut() {
        table.insert(leaf.to_owned(), value);
    }
}

/// Coerce a string env value to the TOML type of its field.
///
/// Values that do not parse stay strings, so deserialization reports them.
fn coerce_to_toml_value(path: &str, val: &str) -> toml::Value {
    match path {
        "dispatch.catch_panics" => val
            .trim()
            .parse::<bool>()
            .map_or_else(|_| toml::Value::String(val.to_owned()), toml::Value::Boolean),
        "dispatch.failure_policy" => {
            toml::Value::String(val.trim().to_ascii_lowercase().replace('-', "_"))
        },
        _ => toml::Value::String(val.to_owned()),
    }
}

/// Collect all current environment variables into a map.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn test_apply_env_fallbacks() {
        let mut merged: toml::Value = toml::from_str("[dispatch]\ncatch_panics = true").unwrap();
        let mut sources = FieldSources::new();
        sources.insert("dispatch.catch_panics".to_owned(), ConfigLayer::Defaults);
        let env = make_env(&[("EVSTORE_CATCH_PANICS", "false"), ("EVSTORE_LOG", "debug")]);

        let count = apply_env_fallbacks(&mut merged, &mut sources, &env);

        assert_eq!(count, 2);
        assert_eq!(merged["dispatch"]["catch_panics"].as_bool(), Some(false));
        assert_eq!(merged["logging"]["level"].as_str(), Some("debug"));
        assert_eq!(
            sources.get("logging.level"),
            Some(&ConfigLayer::Environment)
        );
    }

    #[test]
    fn test_env_fallback_skips_file_values() {
        let mut merged: toml::Value = toml::from_str("[logging]\nlevel = \"warn\"").unwrap();
        let mut sources = FieldSources::new();
        sources.insert("logging.level".to_owned(), ConfigLayer::File);

        let env = make_env(&[("EVSTORE_LOG", "trace")]);
        let count = apply_env_fallbacks(&mut merged, &mut sources, &env);

        assert_eq!(count, 0);
        assert_eq!(merged["logging"]["level"].as_str(), Some("warn"));
    }

    #[test]
    fn test_failure_policy_is_normalized() {
        let v = coerce_to_toml_value("dispatch.failure_policy", " Stop-On-First ");
        assert_eq!(v.as_str(), Some("stop_on_first"));
    }

    #[test]
    fn test_unparseable_bool_stays_string() {
        let v = coerce_to_toml_value("dispatch.catch_panics", "sometimes");
        assert_eq!(v.as_str(), Some("sometimes"));
    }

    #[test]
    fn test_supported_vars() {
        assert!(supported_vars().contains(&"EVSTORE_LOG_FORMAT"));
    }
}
