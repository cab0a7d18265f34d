//! Settings of the factory itself, layered from TOML files and environment
//! overrides.
//!
//! ```toml
//! [context]
//! path = "config/beans.xml"
//! force_reload = false
//!
//! [variables]
//! ambiguity = "longest-match"   # or "strict"
//!
//! [evaluator]
//! enabled = true
//! max_depth = 64
//! ```

mod env;
mod error;
mod file;
mod source;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer};

pub use env::EnvOverrides;
pub use error::SettingsError;
pub use file::FileSource;
pub use source::{SettingsEntry, SettingsSource};

use crate::evaluator::DEFAULT_MAX_DEPTH;
use crate::variables::AmbiguityPolicy;

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct FactorySettings {
    pub context: ContextSettings,
    pub variables: VariableSettings,
    pub evaluator: EvaluatorSettings,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct ContextSettings {
    /// Context document loaded when the factory is built.
    #[serde(deserialize_with = "path_from_scalar")]
    pub path: Option<PathBuf>,
    pub force_reload: bool,
}

/// Accepts numeric file names, which environment overrides type as numbers.
fn path_from_scalar<'de, D>(deserializer: D) -> Result<Option<PathBuf>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Text(PathBuf),
        Int(i64),
        Float(f64),
    }

    let path = match Scalar::deserialize(deserializer)? {
        Scalar::Text(path) => path,
        Scalar::Int(i) => PathBuf::from(i.to_string()),
        Scalar::Float(f) => PathBuf::from(f.to_string()),
    };
    Ok(Some(path))
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct VariableSettings {
    pub ambiguity: AmbiguityPolicy,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EvaluatorSettings {
    pub enabled: bool,
    pub max_depth: usize,
}

impl Default for EvaluatorSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Loads [`FactorySettings`] from layered sources.
///
/// Sources apply in registration order, later ones overriding earlier ones;
/// nested tables merge recursively.
///
/// ```no_run
/// use bean_factory::settings::SettingsBuilder;
///
/// let settings = SettingsBuilder::new()
///     .with_file("factory.toml", true)
///     .with_env("BEANS", "__")
///     .with_file("factory.local.toml", false)
///     .build()?;
/// # Ok::<(), bean_factory::settings::SettingsError>(())
/// ```
#[derive(Debug, Default)]
#[must_use = "builders do nothing until .build() is called"]
pub struct SettingsBuilder {
    sources: Vec<Box<dyn SettingsSource>>,
}

impl SettingsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a TOML file. Missing optional files are skipped.
    pub fn with_file(self, path: impl AsRef<Path>, required: bool) -> Self {
        self.with_source(FileSource::new(path, required))
    }

    /// Adds overrides from `PREFIX<separator>SECTION<separator>FIELD` variables.
    pub fn with_env(self, prefix: impl Into<String>, separator: impl Into<String>) -> Self {
        self.with_source(EnvOverrides::new(prefix, separator))
    }

    pub fn with_source(mut self, source: impl SettingsSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    pub fn build(self) -> Result<FactorySettings, SettingsError> {
        let mut merged = toml::Table::new();
        for source in &self.sources {
            for entry in source.entries()? {
                source::apply_entry(&mut merged, entry);
            }
        }
        let settings = toml::Value::Table(merged).try_into()?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let settings = SettingsBuilder::new().build().unwrap();

        assert_eq!(settings, FactorySettings::default());
        assert!(settings.evaluator.enabled);
        assert_eq!(settings.evaluator.max_depth, DEFAULT_MAX_DEPTH);
        assert_eq!(settings.variables.ambiguity, AmbiguityPolicy::LongestMatch);
        assert_eq!(settings.context.path, None);
    }

    #[test]
    fn test_layering_file_then_env() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[context]\npath = \"beans.xml\"\n\n[evaluator]\nenabled = true\nmax_depth = 10"
        )
        .unwrap();

        let settings = SettingsBuilder::new()
            .with_file(file.path(), true)
            .with_source(EnvOverrides::from_vars(
                "BEANS",
                "__",
                [
                    ("BEANS__EVALUATOR__ENABLED", "false"),
                    ("BEANS__VARIABLES__AMBIGUITY", "strict"),
                ],
            ))
            .build()
            .unwrap();

        assert_eq!(settings.context.path, Some(PathBuf::from("beans.xml")));
        assert!(!settings.evaluator.enabled);
        assert_eq!(settings.evaluator.max_depth, 10);
        assert_eq!(settings.variables.ambiguity, AmbiguityPolicy::Strict);
    }

    #[test]
    fn test_numeric_context_path_from_env() {
        let build = |raw: &str| {
            SettingsBuilder::new()
                .with_source(EnvOverrides::from_vars("BEANS", "__", [("BEANS__CONTEXT__PATH", raw)]))
                .build()
                .unwrap()
                .context
                .path
        };

        assert_eq!(build("2024"), Some(PathBuf::from("2024")));
        assert_eq!(build("1.5"), Some(PathBuf::from("1.5")));
        assert_eq!(build("007"), Some(PathBuf::from("007")));
    }

    #[test]
    fn test_invalid_value_is_reported() {
        let result = SettingsBuilder::new()
            .with_source(EnvOverrides::from_vars(
                "BEANS",
                "__",
                [("BEANS__VARIABLES__AMBIGUITY", "sometimes")],
            ))
            .build();

        assert!(matches!(result, Err(SettingsError::DeserializeError(_))));
    }
}
