use super::EvalError;

#[derive(Debug, Clone, PartialEq)]
pub(super) enum Token {
    Int(i64),
    Float(f64),
    Str(String),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Dot,
    Comma,
    Arrow,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Semicolon,
}

/// A token and the byte offset where it starts.
pub(super) type Spanned = (Token, usize);

pub(super) fn tokenize(source: &str) -> Result<Vec<Spanned>, EvalError> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let start = pos;
        let ch = bytes[pos];
        match ch {
            b' ' | b'\t' | b'\r' | b'\n' => {
                pos += 1;
                continue;
            }
            b'0'..=b'9' => {
                let (token, end) = number(source, pos)?;
                tokens.push((token, start));
                pos = end;
                continue;
            }
            b'\'' | b'"' => {
                let (text, end) = string(source, pos)?;
                tokens.push((Token::Str(text), start));
                pos = end;
                continue;
            }
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => {
                let end = source[pos..]
                    .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                    .map_or(source.len(), |n| pos + n);
                tokens.push((Token::Ident(source[pos..end].to_string()), start));
                pos = end;
                continue;
            }
            _ => {}
        }

        let token = match ch {
            b'+' => Token::Plus,
            b'-' => Token::Minus,
            b'*' => Token::Star,
            b'/' => Token::Slash,
            b'%' => Token::Percent,
            b'.' => Token::Dot,
            b',' => Token::Comma,
            b'(' => Token::LParen,
            b')' => Token::RParen,
            b'[' => Token::LBracket,
            b']' => Token::RBracket,
            b';' => Token::Semicolon,
            b'=' if bytes.get(pos + 1) == Some(&b'>') => {
                pos += 1;
                Token::Arrow
            }
            _ => {
                let found = source[pos..].chars().next().unwrap_or('?');
                return Err(EvalError::syntax(start, format!("unexpected character '{found}'")));
            }
        };
        pos += 1;
        tokens.push((token, start));
    }

    Ok(tokens)
}

fn number(source: &str, start: usize) -> Result<(Token, usize), EvalError> {
    let bytes = source.as_bytes();
    let mut end = start;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let is_float = end + 1 < bytes.len() && bytes[end] == b'.' && bytes[end + 1].is_ascii_digit();
    if is_float {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
        let text = &source[start..end];
        let value = text
            .parse::<f64>()
            .map_err(|_| EvalError::syntax(start, format!("invalid number '{text}'")))?;
        return Ok((Token::Float(value), end));
    }

    let text = &source[start..end];
    let value = text
        .parse::<i64>()
        .map_err(|_| EvalError::syntax(start, format!("integer '{text}' out of range")))?;
    Ok((Token::Int(value), end))
}

/// Reads a quoted string. Backslash escapes the quote character and itself.
fn string(source: &str, start: usize) -> Result<(String, usize), EvalError> {
    let mut chars = source[start..].char_indices();
    let quote = match chars.next() {
        Some((_, q)) => q,
        None => return Err(EvalError::syntax(start, "expected string")),
    };

    let mut text = String::new();
    while let Some((offset, ch)) = chars.next() {
        match ch {
            '\\' => match chars.next() {
                Some((_, 'n')) if quote == '"' => text.push('\n'),
                Some((_, 't')) if quote == '"' => text.push('\t'),
                Some((_, escaped)) if escaped == quote || escaped == '\\' => text.push(escaped),
                Some((_, other)) => {
                    text.push('\\');
                    text.push(other);
                }
                None => break,
            },
            c if c == quote => return Ok((text, start + offset + c.len_utf8())),
            c => text.push(c),
        }
    }

    Err(EvalError::syntax(start, "unterminated string"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        tokenize(source).unwrap().into_iter().map(|(t, _)| t).collect()
    }

    #[test]
    fn test_tokenize_arithmetic() {
        assert_eq!(
            kinds("1024 * 2.5;"),
            vec![Token::Int(1024), Token::Star, Token::Float(2.5), Token::Semicolon]
        );
    }

    #[test]
    fn test_tokenize_array_entries() {
        assert_eq!(
            kinds("array('a' => \"b\")"),
            vec![
                Token::Ident("array".into()),
                Token::LParen,
                Token::Str("a".into()),
                Token::Arrow,
                Token::Str("b".into()),
                Token::RParen,
            ]
        );
    }

    #[test]
    fn test_concatenation_dot_is_not_a_float() {
        assert_eq!(
            kinds("1 . 'x'"),
            vec![Token::Int(1), Token::Dot, Token::Str("x".into())]
        );
        assert_eq!(kinds("1.x"), vec![Token::Int(1), Token::Dot, Token::Ident("x".into())]);
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(kinds(r"'it\'s'"), vec![Token::Str("it's".into())]);
        assert_eq!(kinds(r#""a\nb""#), vec![Token::Str("a\nb".into())]);
    }

    #[test]
    fn test_unterminated_string() {
        let err = tokenize("'abc").unwrap_err();
        assert_eq!(err.position(), Some(0));
    }

    #[test]
    fn test_unexpected_character() {
        assert!(tokenize("1 # 2").is_err());
    }
}
