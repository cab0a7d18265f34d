//! The variable table and `$name` substitution.
//!
//! Variables are registered under their name prefixed with [`VARIABLE_MARKER`]
//! and substituted as literal tokens. The first registration of a name wins;
//! later declarations of the same name are ignored.
//!
//! Environment entries are registered in two explicit phases: [`VariableTable::register`]
//! followed by [`VariableTable::backpatch`], which rewrites every scalar entry
//! already in the table that mentions the new name. This lets a variable such
//! as `$keys=/home/$USER/.ssh` pick up `USER` declared afterwards.

use indexmap::IndexMap;
use serde::Deserialize;
use tracing::{debug, trace};

use crate::environment::Environment;
use crate::value::{ArrayValue, Value};
use crate::{Error, Result};

/// Prefix marking a variable reference.
pub const VARIABLE_MARKER: char = '$';

/// What to do when several variables occur in the same scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AmbiguityPolicy {
    /// A variable whose every occurrence sits inside an occurrence of a longer
    /// matching variable is ignored (`$x` in `$xx-suffix`). Any remaining
    /// conflict is an error.
    #[default]
    LongestMatch,
    /// Any two distinct matching variables are an error.
    Strict,
}

/// Named variables in registration order, keyed by marked name.
#[derive(Debug, Clone, Default)]
pub struct VariableTable {
    entries: IndexMap<String, Value>,
    policy: AmbiguityPolicy,
}

impl VariableTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: AmbiguityPolicy) -> Self {
        Self {
            entries: IndexMap::new(),
            policy,
        }
    }

    pub fn policy(&self) -> AmbiguityPolicy {
        self.policy
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Looks a variable up by its bare name (without the marker).
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(&marked(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Registers `name` unless it is already present. Returns whether the
    /// value was stored.
    pub fn register(&mut self, name: &str, value: Value) -> bool {
        if self.contains(name) {
            trace!(variable = name, "variable already registered, keeping first value");
            return false;
        }
        debug!(variable = name, "registered variable");
        self.entries.insert(marked(name), value);
        true
    }

    /// Replaces literal occurrences of `$name` with `replacement` in every
    /// scalar entry. Array entries are left untouched.
    pub fn backpatch(&mut self, name: &str, replacement: &str) -> usize {
        let token = marked(name);
        let mut patched = 0;
        for value in self.entries.values_mut() {
            if let Value::Str(text) = value {
                if text.contains(&token) {
                    *text = text.replace(&token, replacement);
                    patched += 1;
                }
            }
        }
        if patched > 0 {
            trace!(variable = name, patched, "back-patched variables");
        }
        patched
    }

    /// Declares an environment reference: the value must exist; on first
    /// sight it is registered and then back-patched into earlier entries.
    pub fn declare_environment(&mut self, name: &str, env: &dyn Environment) -> Result<()> {
        let value = env
            .var(name)
            .ok_or_else(|| Error::UndefinedEnvironment(name.to_string()))?;
        if self.register(name, Value::Str(value.clone())) {
            self.backpatch(name, &value);
        }
        Ok(())
    }

    /// Substitutes at most one variable into `input`.
    ///
    /// A scalar variable replaces every literal occurrence of its marked
    /// name. An array variable replaces the whole input. Several distinct
    /// candidates raise [`Error::AmbiguousVariable`], subject to the table's
    /// [`AmbiguityPolicy`].
    pub fn substitute(&self, input: &str) -> Result<Value> {
        if !input.contains(VARIABLE_MARKER) {
            return Ok(Value::Str(input.to_string()));
        }

        let matching: Vec<(&String, &Value)> = self
            .entries
            .iter()
            .filter(|(name, _)| input.contains(name.as_str()))
            .collect();

        let candidates: Vec<(&String, &Value)> = match self.policy {
            AmbiguityPolicy::Strict => matching,
            AmbiguityPolicy::LongestMatch => matching
                .iter()
                .copied()
                .filter(|(name, _)| !is_shadowed(input, name, &matching))
                .collect(),
        };

        match candidates.as_slice() {
            [] => Ok(Value::Str(input.to_string())),
            [(name, value)] => {
                trace!(variable = %name, "substituting variable");
                Ok(match value {
                    Value::Array(_) => (*value).clone(),
                    other => Value::Str(input.replace(name.as_str(), &other.to_string())),
                })
            }
            _ => Err(Error::AmbiguousVariable {
                input: input.to_string(),
                candidates: candidates.iter().map(|(name, _)| (*name).clone()).collect(),
            }),
        }
    }

    /// Substitutes into every string leaf of `value`, recursing into arrays.
    pub fn substitute_value(&self, value: Value) -> Result<Value> {
        match value {
            Value::Str(text) => self.substitute(&text),
            Value::Array(array) => {
                let mut resolved = ArrayValue::new();
                for (key, item) in array {
                    resolved.insert(key, self.substitute_value(item)?);
                }
                Ok(Value::Array(resolved))
            }
            other => Ok(other),
        }
    }
}

fn marked(name: &str) -> String {
    let mut key = String::with_capacity(name.len() + 1);
    key.push(VARIABLE_MARKER);
    key.push_str(name);
    key
}

/// True when every occurrence of `name` lies within an occurrence of a longer
/// matching name.
fn is_shadowed(input: &str, name: &str, matching: &[(&String, &Value)]) -> bool {
    let longer: Vec<&str> = matching
        .iter()
        .map(|(other, _)| other.as_str())
        .filter(|other| other.len() > name.len() && other.contains(name))
        .collect();
    if longer.is_empty() {
        return false;
    }

    input.match_indices(name).all(|(start, _)| {
        let end = start + name.len();
        longer.iter().any(|other| {
            input
                .match_indices(other)
                .any(|(outer, _)| outer <= start && end <= outer + other.len())
        })
    })
}
