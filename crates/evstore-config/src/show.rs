//! Source-annotated rendering of the resolved configuration.

use std::fmt::Write as _;

use crate::error::{ConfigError, ConfigResult};
use crate::merge::FieldSources;
use crate::types::Config;

/// A resolved configuration together with source annotations.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The final merged configuration.
    pub config: Config,
    /// Dotted field path → which layer set the value.
    pub field_sources: FieldSources,
    /// Config files that were loaded, in precedence order.
    pub loaded_files: Vec<String>,
}

/// Output format for [`ResolvedConfig::show`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowFormat {
    /// TOML with a trailing comment naming each value's source.
    Toml,
    /// JSON, for programmatic consumption.
    Json,
}

impl ResolvedConfig {
    /// Render the resolved configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::RenderError`] if serialization fails.
    pub fn show(&self, format: ShowFormat) -> ConfigResult<String> {
        match format {
            ShowFormat::Toml => self.show_toml(),
            ShowFormat::Json => serde_json::to_string_pretty(&self.config).map_err(|e| {
                ConfigError::RenderError {
                    message: e.to_string(),
                }
            }),
        }
    }

    fn show_toml(&self) -> ConfigResult<String> {
        let rendered =
            toml::to_string_pretty(&self.config).map_err(|e| ConfigError::RenderError {
                message: e.to_string(),
            })?;

        let mut output = String::from("# Resolved evstore configuration\n");
        for path in &self.loaded_files {
            let _ = writeln!(output, "# loaded: {path}");
        }
        output.push('\n');

        let mut section = String::new();
        for line in rendered.lines() {
            let trimmed = line.trim();
            if let Some(name) = trimmed.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
                name.clone_into(&mut section);
            }

            let source = trimmed
                .split_once('=')
                .map(|(key, _)| format!("{section}.{}", key.trim()))
                .and_then(|field| self.field_sources.get(&field));

            match source {
                Some(layer) => {
                    let _ = writeln!(output, "{line}  # [{layer}]");
                },
                None => {
                    output.push_str(line);
                    output.push('\n');
                },
            }
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::ConfigLayer;

    fn resolved() -> ResolvedConfig {
        let mut field_sources = FieldSources::new();
        field_sources.insert("dispatch.catch_panics".to_owned(), ConfigLayer::Environment);
        field_sources.insert("logging.level".to_owned(), ConfigLayer::Defaults);
        ResolvedConfig {
            config: Config::default(),
            field_sources,
            loaded_files: vec!["/tmp/evstore.toml".to_owned()],
        }
    }

    #[test]
    fn test_toml_annotations() {
        let output = resolved().show(ShowFormat::Toml).unwrap();

        assert!(output.contains("# loaded: /tmp/evstore.toml"));
        assert!(output.contains("catch_panics = true  # [env]"));
        assert!(output.contains("level = \"info\"  # [defaults]"));
    }

    #[test]
    fn test_json_round_trips() {
        let output = resolved().show(ShowFormat::Json).unwrap();
        let parsed: Config = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed, Config::default());
    }
}
