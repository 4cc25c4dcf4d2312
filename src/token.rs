//! Expression tokenizer built from small parser functions.
//!
//! Each parser takes `(input, offset, tokens)` and returns the new offset and the token
//! sequence with its match appended. [`seq`] threads both through two parsers left to
//! right without backtracking. The tokenizer recognizes a prefix: input left after the
//! last parser is not an error.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Number,
    Operator,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Matched text without surrounding whitespace.
    pub value: String,
}

impl Token {
    pub fn new(kind: TokenKind, value: impl Into<String>) -> Self {
        Token {
            kind,
            value: value.into(),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.kind {
            TokenKind::Number => write!(f, "num({})", self.value),
            TokenKind::Operator => write!(f, "op({})", self.value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenizeError {
    #[error("expected number literal at offset {offset}")]
    NumberExpected { offset: usize },
    #[error("expected binary operator '-', '+', '&', '|', or '^' at offset {offset}")]
    OperatorExpected { offset: usize },
}

pub type ParseResult = Result<(usize, Vec<Token>), TokenizeError>;

/// Accepted binary operators.
pub const OPERATORS: &[char] = &['-', '+', '&', '|', '^'];

/// `\s*[0-9]+\s*`
pub fn number(s: &str, i: usize, mut ts: Vec<Token>) -> ParseResult {
    let err = TokenizeError::NumberExpected { offset: i };
    let start = skip_ws(s, i).ok_or(err.clone())?;
    let len = s[start..].bytes().take_while(u8::is_ascii_digit).count();
    if len == 0 {
        return Err(err);
    }
    let end = start + len;
    ts.push(Token::new(TokenKind::Number, &s[start..end]));
    Ok((skip_ws(s, end).unwrap_or(end), ts))
}

/// `\s*[-+&|^]\s*`
pub fn operator(s: &str, i: usize, mut ts: Vec<Token>) -> ParseResult {
    let err = TokenizeError::OperatorExpected { offset: i };
    let start = skip_ws(s, i).ok_or(err.clone())?;
    match s[start..].chars().next() {
        Some(c) if OPERATORS.contains(&c) => {
            let end = start + c.len_utf8();
            ts.push(Token::new(TokenKind::Operator, &s[start..end]));
            Ok((skip_ws(s, end).unwrap_or(end), ts))
        }
        _ => Err(err),
    }
}

/// Run `p1`, then `p2` from where `p1` stopped.
pub fn seq<P1, P2>(p1: P1, p2: P2) -> impl Fn(&str, usize, Vec<Token>) -> ParseResult
where
    P1: Fn(&str, usize, Vec<Token>) -> ParseResult,
    P2: Fn(&str, usize, Vec<Token>) -> ParseResult,
{
    move |s: &str, i: usize, ts: Vec<Token>| {
        let (i, ts) = p1(s, i, ts)?;
        p2(s, i, ts)
    }
}

/// `number operator number`
pub fn expression() -> impl Fn(&str, usize, Vec<Token>) -> ParseResult {
    seq(number, seq(operator, number))
}

/// Tokenize the leading expression of `s`.
pub fn tokenize(s: &str) -> Result<Vec<Token>, TokenizeError> {
    expression()(s, 0, Vec::new()).map(|(_, ts)| ts)
}

/// Offset of the first non-whitespace char at or after `i`; `None` if `i` is not a char boundary.
fn skip_ws(s: &str, i: usize) -> Option<usize> {
    let rest = s.get(i..)?;
    Some(i + rest.len() - rest.trim_start().len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(v: &str) -> Token {
        Token::new(TokenKind::Number, v)
    }

    fn op(v: &str) -> Token {
        Token::new(TokenKind::Operator, v)
    }

    #[test]
    fn simple_expression() {
        assert_eq!(tokenize("12 + 7").unwrap(), vec![num("12"), op("+"), num("7")]);
    }

    #[test]
    fn every_operator() {
        for o in OPERATORS {
            let src = format!("1{}2", o);
            assert_eq!(tokenize(&src).unwrap()[1], op(&o.to_string()));
        }
    }

    #[test]
    fn surrounding_whitespace() {
        assert_eq!(
            tokenize("  3\t^  40  ").unwrap(),
            vec![num("3"), op("^"), num("40")]
        );
    }

    #[test]
    fn number_expected() {
        assert_eq!(tokenize("abc"), Err(TokenizeError::NumberExpected { offset: 0 }));
        assert_eq!(tokenize(""), Err(TokenizeError::NumberExpected { offset: 0 }));
        assert_eq!(tokenize("1 +"), Err(TokenizeError::NumberExpected { offset: 3 }));
    }

    #[test]
    fn operator_expected() {
        assert_eq!(tokenize("5 * 3"), Err(TokenizeError::OperatorExpected { offset: 2 }));
        assert_eq!(tokenize("5"), Err(TokenizeError::OperatorExpected { offset: 1 }));
    }

    #[test]
    fn trailing_input_is_ignored() {
        let (offset, ts) = expression()("1-2 and more", 0, Vec::new()).unwrap();
        assert_eq!(ts, vec![num("1"), op("-"), num("2")]);
        assert_eq!(offset, 4);
    }

    #[test]
    fn seq_appends_to_existing_tokens() {
        let p = seq(operator, number);
        let (offset, ts) = p("1 | 9", 1, vec![num("1")]).unwrap();
        assert_eq!(offset, 5);
        assert_eq!(ts, vec![num("1"), op("|"), num("9")]);
    }

    #[test]
    fn seq_is_associative() {
        let left = seq(seq(number, operator), number);
        let right = seq(number, seq(operator, number));
        for src in ["12+7", "5 * 3", "x", "8 & 1 tail"] {
            assert_eq!(left(src, 0, Vec::new()), right(src, 0, Vec::new()), "{}", src);
        }
    }

    #[test]
    fn offset_inside_multibyte_char_fails_cleanly() {
        assert_eq!(number("é1", 1, Vec::new()), Err(TokenizeError::NumberExpected { offset: 1 }));
    }
}
