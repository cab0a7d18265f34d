//! Pluggable evaluation of `evaluate` beans and values.
//!
//! The factory never executes host code from configuration. Expressions go
//! through an [`Evaluator`]; the default [`ExpressionEvaluator`] understands a
//! small expression language:
//!
//! ```text
//! 1024 * 1024;                      // Int(1048576)
//! 'cache-' . upper("eu") . 7        // Str("cache-EU7")
//! array('a' => 1, 'b' => [2, 3])    // keyed array with a nested sequence
//! join(',', range(1, 3))            // Str("1,2,3")
//! ```

mod lexer;
mod parser;

use thiserror::Error;

use crate::value::Value;

/// Default nesting limit for parenthesised expressions and array literals.
pub const DEFAULT_MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum EvalError {
    #[error("syntax error at offset {position}: {message}")]
    Syntax { position: usize, message: String },

    #[error("{0}")]
    Runtime(String),

    #[error("expressions nested deeper than {0} levels")]
    TooDeep(usize),

    #[error("expression evaluation is disabled")]
    Disabled,
}

impl EvalError {
    pub(crate) fn syntax(position: usize, message: impl Into<String>) -> Self {
        EvalError::Syntax {
            position,
            message: message.into(),
        }
    }

    pub(crate) fn runtime(message: impl Into<String>) -> Self {
        EvalError::Runtime(message.into())
    }

    /// Byte offset of a syntax error.
    pub fn position(&self) -> Option<usize> {
        match self {
            EvalError::Syntax { position, .. } => Some(*position),
            _ => None,
        }
    }
}

/// Turns expression text into a value.
pub trait Evaluator {
    fn evaluate(&self, source: &str) -> Result<Value, EvalError>;
}

impl<E: Evaluator + ?Sized> Evaluator for Box<E> {
    fn evaluate(&self, source: &str) -> Result<Value, EvalError> {
        (**self).evaluate(source)
    }
}

/// The built-in expression language.
#[derive(Debug, Clone, Copy)]
pub struct ExpressionEvaluator {
    max_depth: usize,
}

impl ExpressionEvaluator {
    pub fn new() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(max_depth: usize) -> Self {
        Self { max_depth }
    }
}

impl Default for ExpressionEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl Evaluator for ExpressionEvaluator {
    fn evaluate(&self, source: &str) -> Result<Value, EvalError> {
        let tokens = lexer::tokenize(source)?;
        parser::Parser::new(tokens, source.len(), self.max_depth).parse()
    }
}

/// Rejects every expression.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledEvaluator;

impl Evaluator for DisabledEvaluator {
    fn evaluate(&self, _source: &str) -> Result<Value, EvalError> {
        Err(EvalError::Disabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ArrayValue;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn eval(source: &str) -> Value {
        ExpressionEvaluator::new().evaluate(source).unwrap()
    }

    #[rstest]
    #[case("1 + 2 * 3", Value::Int(7))]
    #[case("(1 + 2) * 3;", Value::Int(9))]
    #[case("1024 * 1024;", Value::Int(1_048_576))]
    #[case("7 / 2", Value::Float(3.5))]
    #[case("8 / 2", Value::Int(4))]
    #[case("7 % 3", Value::Int(1))]
    #[case("-2 + 0.5", Value::Float(-1.5))]
    #[case("'3' + 4", Value::Int(7))]
    #[case("true", Value::Bool(true))]
    #[case("null", Value::Null)]
    fn test_scalar_expressions(#[case] source: &str, #[case] expected: Value) {
        assert_eq!(eval(source), expected);
    }

    #[rstest]
    #[case("'a' . 'b' . 1", "ab1")]
    #[case("\"cache-\" . upper('eu')", "cache-EU")]
    #[case("'n=' . 2 + 3", "n=5")]
    #[case("lower('ABC') . trim('  x ')", "abcx")]
    #[case("join('-', range(1, 3))", "1-2-3")]
    fn test_string_expressions(#[case] source: &str, #[case] expected: &str) {
        assert_eq!(eval(source), Value::from(expected));
    }

    #[test]
    fn test_array_literals() {
        let value = eval("array('a' => 1, 'b' => [2, 3], 'c')");
        let array = value.as_array().unwrap();

        assert_eq!(array.get_key("a"), Some(&Value::Int(1)));
        assert_eq!(
            array.get_key("b"),
            Some(&Value::Array(ArrayValue::from_values([Value::Int(2), Value::Int(3)])))
        );
        assert_eq!(array.get_key("0"), Some(&Value::from("c")));
    }

    #[test]
    fn test_len_of_string_and_array() {
        assert_eq!(eval("len('abcd')"), Value::Int(4));
        assert_eq!(eval("len([1, 2, 3])"), Value::Int(3));
    }

    #[rstest]
    #[case("1 / 0")]
    #[case("5 % 0")]
    #[case("'x' * 2")]
    #[case("nope(1)")]
    #[case("1 +")]
    #[case("1 2")]
    #[case("upper()")]
    fn test_invalid_expressions(#[case] source: &str) {
        assert!(ExpressionEvaluator::new().evaluate(source).is_err());
    }

    #[test]
    fn test_nesting_limit() {
        let source = format!("{}1{}", "(".repeat(10), ")".repeat(10));
        let result = ExpressionEvaluator::with_max_depth(4).evaluate(&source);
        assert_eq!(result, Err(EvalError::TooDeep(4)));
        assert_eq!(ExpressionEvaluator::new().evaluate(&source), Ok(Value::Int(1)));
    }

    #[test]
    fn test_disabled_evaluator() {
        assert_eq!(DisabledEvaluator.evaluate("1"), Err(EvalError::Disabled));
    }
}
