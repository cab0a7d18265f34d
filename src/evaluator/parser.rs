//! Recursive-descent evaluation.
//!
//! Precedence, loosest first: `.` concatenation, `+ -`, `* / %`, unary `-`.

use super::lexer::{Spanned, Token};
use super::EvalError;
use crate::value::{ArrayKey, ArrayValue, Value};

const MAX_RANGE_LEN: i64 = 10_000;

pub(super) struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    end: usize,
    depth: usize,
    max_depth: usize,
}

enum Number {
    Int(i64),
    Float(f64),
}

impl Parser {
    pub(super) fn new(tokens: Vec<Spanned>, end: usize, max_depth: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            end,
            depth: 0,
            max_depth,
        }
    }

    pub(super) fn parse(mut self) -> Result<Value, EvalError> {
        if self.tokens.is_empty() {
            return Err(EvalError::syntax(0, "empty expression"));
        }
        let value = self.concat()?;
        self.eat(&Token::Semicolon);
        if let Some((token, offset)) = self.tokens.get(self.pos) {
            return Err(EvalError::syntax(*offset, format!("unexpected {token:?}")));
        }
        Ok(value)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn offset(&self) -> usize {
        self.tokens.get(self.pos).map_or(self.end, |(_, o)| *o)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(t, _)| t.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<(), EvalError> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(EvalError::syntax(self.offset(), format!("expected {expected:?}")))
        }
    }

    fn enter(&mut self) -> Result<(), EvalError> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(EvalError::TooDeep(self.max_depth));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn concat(&mut self) -> Result<Value, EvalError> {
        let mut value = self.additive()?;
        while self.eat(&Token::Dot) {
            let rhs = self.additive()?;
            value = Value::Str(format!("{}{}", text_of(&value)?, text_of(&rhs)?));
        }
        Ok(value)
    }

    fn additive(&mut self) -> Result<Value, EvalError> {
        let mut value = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => Token::Plus,
                Some(Token::Minus) => Token::Minus,
                _ => return Ok(value),
            };
            self.pos += 1;
            let rhs = self.term()?;
            value = arithmetic(&op, &value, &rhs)?;
        }
    }

    fn term(&mut self) -> Result<Value, EvalError> {
        let mut value = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => Token::Star,
                Some(Token::Slash) => Token::Slash,
                Some(Token::Percent) => Token::Percent,
                _ => return Ok(value),
            };
            self.pos += 1;
            let rhs = self.unary()?;
            value = arithmetic(&op, &value, &rhs)?;
        }
    }

    fn unary(&mut self) -> Result<Value, EvalError> {
        if self.eat(&Token::Minus) {
            self.enter()?;
            let operand = self.unary()?;
            self.leave();
            return match number(&operand)? {
                Number::Int(i) => i
                    .checked_neg()
                    .map(Value::Int)
                    .ok_or_else(|| EvalError::runtime("integer overflow")),
                Number::Float(f) => Ok(Value::Float(-f)),
            };
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Value, EvalError> {
        let offset = self.offset();
        match self.advance() {
            Some(Token::Int(i)) => Ok(Value::Int(i)),
            Some(Token::Float(f)) => Ok(Value::Float(f)),
            Some(Token::Str(s)) => Ok(Value::Str(s)),
            Some(Token::LParen) => {
                self.enter()?;
                let value = self.concat()?;
                self.expect(&Token::RParen)?;
                self.leave();
                Ok(value)
            }
            Some(Token::LBracket) => self.array(&Token::RBracket),
            Some(Token::Ident(name)) => self.identifier(&name, offset),
            Some(token) => Err(EvalError::syntax(offset, format!("unexpected {token:?}"))),
            None => Err(EvalError::syntax(offset, "unexpected end of expression")),
        }
    }

    fn identifier(&mut self, name: &str, offset: usize) -> Result<Value, EvalError> {
        match name {
            "true" => return Ok(Value::Bool(true)),
            "false" => return Ok(Value::Bool(false)),
            "null" => return Ok(Value::Null),
            _ => {}
        }
        if !self.eat(&Token::LParen) {
            return Err(EvalError::syntax(offset, format!("unknown identifier '{name}'")));
        }
        if name == "array" {
            return self.array(&Token::RParen);
        }

        self.enter()?;
        let mut args = Vec::new();
        if !self.eat(&Token::RParen) {
            loop {
                args.push(self.concat()?);
                if self.eat(&Token::RParen) {
                    break;
                }
                self.expect(&Token::Comma)?;
            }
        }
        self.leave();
        call(name, &args)
    }

    /// Parses array entries after the opening delimiter up to `close`.
    fn array(&mut self, close: &Token) -> Result<Value, EvalError> {
        self.enter()?;
        let mut array = ArrayValue::new();
        while !self.eat(close) {
            let first = self.concat()?;
            if self.eat(&Token::Arrow) {
                let value = self.concat()?;
                array.insert(key_of(&first)?, value);
            } else {
                array.push(first);
            }
            if !self.eat(&Token::Comma) {
                self.expect(close)?;
                break;
            }
        }
        self.leave();
        Ok(Value::Array(array))
    }
}

fn key_of(value: &Value) -> Result<ArrayKey, EvalError> {
    match value {
        Value::Int(i) => Ok(ArrayKey::Index(*i)),
        Value::Str(s) => Ok(ArrayKey::parse(s)),
        Value::Bool(b) => Ok(ArrayKey::Index(i64::from(*b))),
        Value::Null => Ok(ArrayKey::Name(String::new())),
        Value::Float(f) => Ok(ArrayKey::Index(*f as i64)),
        Value::Array(_) => Err(EvalError::runtime("an array cannot be used as a key")),
    }
}

fn text_of(value: &Value) -> Result<String, EvalError> {
    match value {
        Value::Array(_) => Err(EvalError::runtime("cannot convert an array to text")),
        other => Ok(other.to_string()),
    }
}

fn number(value: &Value) -> Result<Number, EvalError> {
    match value {
        Value::Int(i) => Ok(Number::Int(*i)),
        Value::Float(f) => Ok(Number::Float(*f)),
        Value::Bool(b) => Ok(Number::Int(i64::from(*b))),
        Value::Null => Ok(Number::Int(0)),
        Value::Str(s) => {
            let trimmed = s.trim();
            if let Ok(i) = trimmed.parse::<i64>() {
                Ok(Number::Int(i))
            } else if let Ok(f) = trimmed.parse::<f64>() {
                Ok(Number::Float(f))
            } else {
                Err(EvalError::runtime(format!("'{s}' is not a number")))
            }
        }
        Value::Array(_) => Err(EvalError::runtime("arithmetic on an array")),
    }
}

fn arithmetic(op: &Token, lhs: &Value, rhs: &Value) -> Result<Value, EvalError> {
    let overflow = || EvalError::runtime("integer overflow");
    match (number(lhs)?, number(rhs)?) {
        (Number::Int(a), Number::Int(b)) => match op {
            Token::Plus => a.checked_add(b).map(Value::Int).ok_or_else(overflow),
            Token::Minus => a.checked_sub(b).map(Value::Int).ok_or_else(overflow),
            Token::Star => a.checked_mul(b).map(Value::Int).ok_or_else(overflow),
            Token::Slash => {
                if b == 0 {
                    return Err(EvalError::runtime("division by zero"));
                }
                if a.checked_rem(b) == Some(0) {
                    a.checked_div(b).map(Value::Int).ok_or_else(overflow)
                } else {
                    Ok(Value::Float(a as f64 / b as f64))
                }
            }
            Token::Percent => modulo(a, b),
            _ => Err(EvalError::runtime(format!("unsupported operator {op:?}"))),
        },
        (a, b) => {
            let a = as_f64(a);
            let b = as_f64(b);
            match op {
                Token::Plus => Ok(Value::Float(a + b)),
                Token::Minus => Ok(Value::Float(a - b)),
                Token::Star => Ok(Value::Float(a * b)),
                Token::Slash if b == 0.0 => Err(EvalError::runtime("division by zero")),
                Token::Slash => Ok(Value::Float(a / b)),
                Token::Percent => modulo(a as i64, b as i64),
                _ => Err(EvalError::runtime(format!("unsupported operator {op:?}"))),
            }
        }
    }
}

fn modulo(a: i64, b: i64) -> Result<Value, EvalError> {
    if b == 0 {
        return Err(EvalError::runtime("modulo by zero"));
    }
    a.checked_rem(b)
        .map(Value::Int)
        .ok_or_else(|| EvalError::runtime("integer overflow"))
}

fn as_f64(n: Number) -> f64 {
    match n {
        Number::Int(i) => i as f64,
        Number::Float(f) => f,
    }
}

fn call(name: &str, args: &[Value]) -> Result<Value, EvalError> {
    let arity = |expected: usize| {
        if args.len() == expected {
            Ok(())
        } else {
            Err(EvalError::runtime(format!(
                "{name}() expects {expected} argument(s), got {}",
                args.len()
            )))
        }
    };

    match name {
        "upper" => {
            arity(1)?;
            Ok(Value::Str(text_of(&args[0])?.to_uppercase()))
        }
        "lower" => {
            arity(1)?;
            Ok(Value::Str(text_of(&args[0])?.to_lowercase()))
        }
        "trim" => {
            arity(1)?;
            Ok(Value::Str(text_of(&args[0])?.trim().to_string()))
        }
        "len" => {
            arity(1)?;
            let len = match &args[0] {
                Value::Array(a) => a.len(),
                other => text_of(other)?.chars().count(),
            };
            i64::try_from(len)
                .map(Value::Int)
                .map_err(|_| EvalError::runtime("length out of range"))
        }
        "join" => {
            arity(2)?;
            let separator = text_of(&args[0])?;
            let array = args[1]
                .as_array()
                .ok_or_else(|| EvalError::runtime("join() expects an array"))?;
            let parts = array.values().map(text_of).collect::<Result<Vec<_>, _>>()?;
            Ok(Value::Str(parts.join(&separator)))
        }
        "range" => {
            arity(2)?;
            let (start, end) = match (number(&args[0])?, number(&args[1])?) {
                (Number::Int(a), Number::Int(b)) => (a, b),
                _ => return Err(EvalError::runtime("range() expects integers")),
            };
            if end.checked_sub(start).map_or(true, |span| !(0..MAX_RANGE_LEN).contains(&span)) {
                return Err(EvalError::runtime(format!("invalid range {start}..{end}")));
            }
            Ok(Value::Array(ArrayValue::from_values((start..=end).map(Value::Int))))
        }
        _ => Err(EvalError::runtime(format!("unknown function '{name}'"))),
    }
}
