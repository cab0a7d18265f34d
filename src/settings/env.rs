use toml::Value;

use super::source::{SettingsEntry, SettingsSource};
use super::SettingsError;

/// Settings overrides read from environment variables.
///
/// `BEANS__EVALUATOR__ENABLED=false` with prefix `BEANS` and separator `__`
/// sets `evaluator.enabled`. Path segments are lower-cased and values coerced
/// to the most specific TOML type.
#[derive(Debug, Clone)]
pub struct EnvOverrides {
    prefix: String,
    separator: String,
    vars: Option<Vec<(String, String)>>,
}

impl EnvOverrides {
    /// Reads the process environment when entries are requested.
    pub fn new(prefix: impl Into<String>, separator: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            separator: separator.into(),
            vars: None,
        }
    }

    /// Reads from a fixed snapshot instead of the process environment.
    pub fn from_vars<I, K, V>(prefix: impl Into<String>, separator: impl Into<String>, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            prefix: prefix.into(),
            separator: separator.into(),
            vars: Some(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect()),
        }
    }

    fn path_of(&self, key: &str) -> Option<Vec<String>> {
        if self.separator.is_empty() {
            return None;
        }
        let rest = key
            .strip_prefix(self.prefix.as_str())?
            .strip_prefix(self.separator.as_str())?;
        if rest.is_empty() {
            return None;
        }
        Some(rest.split(self.separator.as_str()).map(str::to_lowercase).collect())
    }
}

impl SettingsSource for EnvOverrides {
    fn entries(&self) -> Result<Vec<SettingsEntry>, SettingsError> {
        let vars: Vec<(String, String)> = match &self.vars {
            Some(vars) => vars.clone(),
            None => std::env::vars().collect(),
        };

        let mut entries: Vec<SettingsEntry> = vars
            .iter()
            .filter_map(|(key, value)| {
                self.path_of(key)
                    .map(|path| SettingsEntry::at_path(path, coerce(value)))
            })
            .collect();
        // deterministic layering regardless of environment order
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }
}

/// Coerces to bool, integer or float only when the typed value prints back
/// as `raw`; anything else stays a string.
fn coerce(raw: &str) -> Value {
    if raw.eq_ignore_ascii_case("true") {
        return Value::Boolean(true);
    }
    if raw.eq_ignore_ascii_case("false") {
        return Value::Boolean(false);
    }
    if let Ok(i) = raw.parse::<i64>() {
        if i.to_string() == raw {
            return Value::Integer(i);
        }
    }
    if let Ok(f) = raw.parse::<f64>() {
        if f.is_finite() && f.to_string() == raw {
            return Value::Float(f);
        }
    }
    Value::String(raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_maps_prefixed_vars_to_paths() {
        let source = EnvOverrides::from_vars(
            "BEANS",
            "__",
            [
                ("BEANS__EVALUATOR__ENABLED", "false"),
                ("BEANS__VARIABLES__AMBIGUITY", "strict"),
                ("OTHER__EVALUATOR__ENABLED", "true"),
                ("BEANS__", "ignored"),
            ],
        );

        let entries = source.entries().unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].path, vec!["evaluator", "enabled"]);
        assert_eq!(entries[0].value, Value::Boolean(false));
        assert_eq!(entries[1].path, vec!["variables", "ambiguity"]);
        assert_eq!(entries[1].value, Value::String("strict".into()));
    }

    #[test]
    fn test_coercion() {
        assert_eq!(coerce("TRUE"), Value::Boolean(true));
        assert_eq!(coerce("42"), Value::Integer(42));
        assert_eq!(coerce("-7"), Value::Integer(-7));
        assert_eq!(coerce("1.5"), Value::Float(1.5));
        assert_eq!(coerce("1.2.3"), Value::String("1.2.3".into()));
        assert_eq!(coerce("007"), Value::String("007".into()));
        assert_eq!(coerce("+1"), Value::String("+1".into()));
        assert_eq!(coerce("1.50"), Value::String("1.50".into()));
        assert_eq!(coerce("inf"), Value::String("inf".into()));
        assert_eq!(coerce("beans.xml"), Value::String("beans.xml".into()));
    }
}
