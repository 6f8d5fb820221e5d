// src/params/expr.rs — Field-level grammar for parameter records
//
// Record fields are either C string literals (possibly several adjacent
// ones) or small integer expressions built from literals, a fixed table of
// symbolic constants, unary signs, `*`, `+`, `-` and parentheses. Nothing
// else is evaluated.

use thiserror::Error;

use crate::core::types::SENTINEL_CEILING;

/// Symbolic constants that appear in parameter definitions, with the values
/// they stand for. Signed-int maxima map to the probing ceiling.
pub const SYMBOLIC_CONSTANTS: &[(&str, i64)] = &[
    ("GGC_MIN_EXPAND_DEFAULT", 30),
    ("GGC_MIN_HEAPSIZE_DEFAULT", 4096),
    ("INT_MAX", SENTINEL_CEILING),
    ("INT32_MAX", SENTINEL_CEILING),
    ("HOST_WIDE_INT_MAX", SENTINEL_CEILING),
];

pub fn lookup_constant(name: &str) -> Option<i64> {
    SYMBOLIC_CONSTANTS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, v)| *v)
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("expected 5 or 6 fields, found {0}")]
    FieldCount(usize),

    #[error("unterminated record")]
    Unterminated,

    #[error("malformed string literal: {0}")]
    BadString(String),

    #[error("invalid parameter name: {0:?}")]
    BadName(String),

    #[error("malformed integer expression {field:?}: {reason}")]
    BadNumber { field: String, reason: String },

    #[error("unknown symbolic constant {0}")]
    UnknownSymbol(String),

    #[error("integer overflow in {0:?}")]
    Overflow(String),

    #[error("default {default} is below minimum {min}")]
    DefaultBelowMin { default: i64, min: i64 },
}

/// Decode one field made of adjacent C string literals into their
/// concatenation. Whitespace between literals is allowed.
pub fn string_field(field: &str) -> Result<String, RecordError> {
    let mut out = String::new();
    let mut chars = field.trim().chars().peekable();
    let mut literals = 0;

    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        match chars.next() {
            None => break,
            Some('"') => {}
            Some(_) => return Err(RecordError::BadString(field.trim().to_string())),
        }
        literals += 1;
        loop {
            match chars.next() {
                None => return Err(RecordError::BadString(field.trim().to_string())),
                Some('"') => break,
                Some('\\') => match chars.next() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('\n') => {}
                    Some(c) => out.push(c),
                    None => return Err(RecordError::BadString(field.trim().to_string())),
                },
                Some(c) => out.push(c),
            }
        }
    }

    if literals == 0 {
        return Err(RecordError::BadString(field.trim().to_string()));
    }
    Ok(out)
}

/// A parameter name: a quoted literal, or a bare `[A-Za-z0-9_-]+` token.
pub fn name_field(field: &str) -> Result<String, RecordError> {
    let trimmed = field.trim();
    let name = if trimmed.starts_with('"') {
        string_field(trimmed)?
    } else {
        trimmed.to_string()
    };
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(name)
    } else {
        Err(RecordError::BadName(trimmed.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Int(i64),
    Ident(String),
    Star,
    Plus,
    Minus,
    LParen,
    RParen,
}

fn bad(field: &str, reason: impl Into<String>) -> RecordError {
    RecordError::BadNumber {
        field: field.trim().to_string(),
        reason: reason.into(),
    }
}

fn tokenize(field: &str) -> Result<Vec<Token>, RecordError> {
    let bytes = field.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        match c {
            b' ' | b'\t' | b'\n' | b'\r' => i += 1,
            b'*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            b'+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            b'-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            b'(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            b')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            b'0'..=b'9' => {
                let start = i;
                while i < bytes.len() && bytes[i].is_ascii_alphanumeric() {
                    i += 1;
                }
                tokens.push(Token::Int(int_literal(field, &field[start..i])?));
            }
            c if c.is_ascii_alphabetic() || c == b'_' => {
                let start = i;
                while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                    i += 1;
                }
                tokens.push(Token::Ident(field[start..i].to_string()));
            }
            _ => return Err(bad(field, format!("unexpected character {:?}", c as char))),
        }
    }

    Ok(tokens)
}

/// Decimal or hex literal, with C integer suffixes (`U`, `L`) ignored.
fn int_literal(field: &str, text: &str) -> Result<i64, RecordError> {
    let digits = text.trim_end_matches(&['u', 'U', 'l', 'L'][..]);
    let parsed = if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        i64::from_str_radix(hex, 16)
    } else {
        digits.parse::<i64>()
    };
    parsed.map_err(|_| bad(field, format!("bad integer literal {text:?}")))
}

struct ExprParser<'a> {
    field: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'a> ExprParser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        t
    }

    // sum := product (('+' | '-') product)*
    fn sum(&mut self) -> Result<i64, RecordError> {
        let mut acc = self.product()?;
        while let Some(op) = self.peek().cloned() {
            let rhs = match op {
                Token::Plus | Token::Minus => {
                    self.pos += 1;
                    self.product()?
                }
                _ => break,
            };
            let combined = match op {
                Token::Plus => acc.checked_add(rhs),
                _ => acc.checked_sub(rhs),
            };
            acc = combined.ok_or_else(|| RecordError::Overflow(self.field.trim().to_string()))?;
        }
        Ok(acc)
    }

    // product := unary ('*' unary)*
    fn product(&mut self) -> Result<i64, RecordError> {
        let mut acc = self.unary()?;
        while self.peek() == Some(&Token::Star) {
            self.pos += 1;
            let rhs = self.unary()?;
            acc = acc
                .checked_mul(rhs)
                .ok_or_else(|| RecordError::Overflow(self.field.trim().to_string()))?;
        }
        Ok(acc)
    }

    // unary := ('-' | '+') unary | atom
    fn unary(&mut self) -> Result<i64, RecordError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                self.unary()?
                    .checked_neg()
                    .ok_or_else(|| RecordError::Overflow(self.field.trim().to_string()))
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.atom(),
        }
    }

    fn atom(&mut self) -> Result<i64, RecordError> {
        match self.advance() {
            Some(Token::Int(v)) => Ok(v),
            Some(Token::Ident(name)) => {
                lookup_constant(&name).ok_or(RecordError::UnknownSymbol(name))
            }
            Some(Token::LParen) => {
                let v = self.sum()?;
                match self.advance() {
                    Some(Token::RParen) => Ok(v),
                    _ => Err(bad(self.field, "unbalanced parenthesis")),
                }
            }
            Some(t) => Err(bad(self.field, format!("unexpected token {t:?}"))),
            None => Err(bad(self.field, "empty expression")),
        }
    }
}

/// Evaluate an integer field.
pub fn int_field(field: &str) -> Result<i64, RecordError> {
    let tokens = tokenize(field)?;
    let mut parser = ExprParser {
        field,
        tokens,
        pos: 0,
    };
    let value = parser.sum()?;
    if parser.pos != parser.tokens.len() {
        return Err(bad(field, "trailing tokens"));
    }
    Ok(value)
}
