//! Builds [`ArrayValue`]s from `<value>` declarations.
//!
//! ```xml
//! <bean name="hosts" impl="array">
//!     <value key="primary">db1</value>
//!     <value key="replica,fallback">db2</value>
//!     <value key="replica">db3</value>
//!     <value>unkeyed</value>
//!     <value key="limits"><bean impl="array"><value>1</value></bean></value>
//!     <value key="size"><bean impl="evaluate" value="64 * 1024"/></value>
//! </bean>
//! ```
//!
//! Repeated keys merge into a sequence: `replica` above ends up as
//! `[db2, db3]` while `fallback` keeps `db2`.

use tracing::warn;

use crate::definition::ImplementationKind;
use crate::document::Element;
use crate::evaluator::{EvalError, Evaluator};
use crate::value::{ArrayKey, ArrayValue, Value};
use crate::variables::VariableTable;
use crate::{Error, Result};

/// Builds arrays from declarations, substituting variables into scalar values.
pub struct ArrayBuilder<'a> {
    variables: &'a VariableTable,
    evaluator: &'a dyn Evaluator,
}

impl<'a> ArrayBuilder<'a> {
    pub fn new(variables: &'a VariableTable, evaluator: &'a dyn Evaluator) -> Self {
        Self {
            variables,
            evaluator,
        }
    }

    /// Builds the array declared by the `<value>` children of `element`.
    pub fn build(&self, element: &Element) -> Result<ArrayValue> {
        let mut result = ArrayValue::new();

        for node in element.children_named("value") {
            let key = Some(node.attr("key")).filter(|k| !k.is_empty());

            let Some(nested) = node.child("bean") else {
                let text = self.variables.substitute(node.text().trim())?;
                match key {
                    Some(key) => populate_array(&mut result, key, text),
                    None => result.push(text),
                }
                continue;
            };

            let implementation = nested.attr("impl");
            match ImplementationKind::classify(implementation) {
                ImplementationKind::Array => {
                    let sub = Value::Array(self.build(nested)?);
                    match key {
                        Some(key) => populate_array(&mut result, key, sub),
                        None => result.push(sub),
                    }
                }
                ImplementationKind::Evaluate => {
                    let expression = nested.attr("value");
                    let evaluated = self.evaluate(expression)?;
                    if key.is_none() {
                        warn!(expression, "evaluated value has no key, storing under the empty key");
                    }
                    result.insert(ArrayKey::parse(key.unwrap_or("")), evaluated);
                }
                _ => {
                    return Err(Error::InvalidNestedImplementation(implementation.to_string()));
                }
            }
        }

        Ok(result)
    }

    /// Substitutes variables into `expression` and evaluates it.
    pub fn evaluate(&self, expression: &str) -> Result<Value> {
        let source = match self.variables.substitute(expression)? {
            Value::Str(source) => source,
            other => {
                return Err(Error::Evaluation {
                    expression: expression.to_string(),
                    source: EvalError::runtime(format!(
                        "expression resolved to a non-text value '{other}'"
                    )),
                })
            }
        };
        self.evaluator
            .evaluate(&source)
            .map_err(|source_err| Error::Evaluation {
                expression: source.clone(),
                source: source_err,
            })
    }
}

/// Inserts `value` under every comma-separated key in `keys`.
///
/// An absent key takes the value directly; an existing array entry gets the
/// value appended; an existing scalar entry becomes `[existing, value]`.
pub fn populate_array(array: &mut ArrayValue, keys: &str, value: Value) {
    for key in keys.split(',') {
        let key = ArrayKey::parse(key.trim());
        match array.get_mut(&key) {
            Some(Value::Array(existing)) => existing.push(value.clone()),
            Some(existing) => {
                let first = std::mem::take(existing);
                *existing = Value::Array(ArrayValue::from_values([first, value.clone()]));
            }
            None => {
                array.insert(key, value.clone());
            }
        }
    }
}
