//! Splitting source text into lexemes, using the recognizers of the
//! [`Parser`].
//!
//! A `.` which is not part of a number starts a comment running to
//! the end of the line.  Integer literals use the octal convention
//! (a leading zero means octal) and may contain `_` separators.
use std::fmt::{self, Display, Formatter};
use std::ops::Range;

use tracing::{event, span, Level};

use crate::parser::{ParseError, Parser};

#[cfg(test)]
mod tests;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Symbol(String),
    Integer(u64),
    Punctuation(char),
    Newline,
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            Token::Symbol(name) => write!(f, "symbol {name}"),
            Token::Integer(n) => write!(f, "integer {n} (octal {n:o})"),
            Token::Punctuation(ch) => write!(f, "punctuation {ch:?}"),
            Token::Newline => f.write_str("newline"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lexeme {
    pub token: Token,
    pub span: Range<usize>,
}

/// Failure to scan source text, with the position at which scanning
/// stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanFailure {
    pub position: usize,
    pub error: ParseError,
}

impl Display for ScanFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "at position {}: {}", self.position, self.error)
    }
}

impl std::error::Error for ScanFailure {}

fn skip_blanks(parser: &mut Parser) {
    // Newlines are lexemes in their own right.
    while let Ok(ch) = parser.peek_next_char() {
        if ch == b'\n' || !crate::parser::is_white_space(ch) {
            break;
        }
        // peek_next_char succeeded, so this cannot fail.
        let _ = parser.next_char();
    }
}

fn skip_comment(parser: &mut Parser) {
    while let Ok(ch) = parser.peek_next_char() {
        if ch == b'\n' {
            break;
        }
        let _ = parser.next_char();
    }
}

/// Scan the whole of `text`.
///
/// # Errors
///
/// Fails if a symbol is too long.
pub fn scan(text: &str) -> Result<Vec<Lexeme>, ScanFailure> {
    let span = span!(Level::DEBUG, "scan", len = text.len());
    let _enter = span.enter();

    let mut parser = Parser::new(text);
    let mut result = Vec::new();
    loop {
        skip_blanks(&mut parser);
        let start = parser.position();
        let token = match parser.parse_symbol() {
            Ok(Some(name)) => Token::Symbol(name),
            Err(error) => {
                event!(Level::WARN, "scan failed at {start}: {error}");
                return Err(ScanFailure {
                    position: start,
                    error,
                });
            }
            Ok(None) => match parser.parse_integer(true, true) {
                Some(value) => Token::Integer(value),
                None => match parser.next_char() {
                    Err(ParseError::OutOfData) => break,
                    Err(error) => {
                        return Err(ScanFailure {
                            position: start,
                            error,
                        });
                    }
                    Ok(b'\n') => Token::Newline,
                    Ok(b'.') => {
                        skip_comment(&mut parser);
                        continue;
                    }
                    Ok(ch) => Token::Punctuation(char::from(ch)),
                },
            },
        };
        event!(Level::TRACE, "{start}..{}: {token}", parser.position());
        result.push(Lexeme {
            token,
            span: start..parser.position(),
        });
    }
    event!(Level::DEBUG, "scanned {} lexemes", result.len());
    Ok(result)
}
