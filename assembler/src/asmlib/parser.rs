//! A backtrackable cursor over an immutable text buffer.
//!
//! The assembler front end builds its grammar out of the small
//! recognizers defined here.  Each recognizer works at the cursor.
//! A recognizer which matches moves the cursor past what it matched;
//! one which does not match leaves the cursor where it was, so that
//! the caller can try an alternative.  A caller which wants to back
//! out of a longer sequence of matches saves [`Parser::position`]
//! and later restores it with [`Parser::set_position`].
//!
//! There are three kinds of outcome:
//!
//! - a match (`true`, `Some(..)` or `Ok(Some(..))`),
//! - no match (`false`, `None` or `Ok(None)`) with the cursor
//!   unchanged,
//! - a [`ParseError`], meaning the grammar cannot continue.
//!
//! The text is treated as a sequence of 8-bit code units.  Only ASCII
//! has any meaning to the character classes.
use std::error::Error;
use std::fmt::{self, Display, Formatter};

use tracing::{event, Level};

#[cfg(test)]
mod tests;

/// Symbols longer than this are rejected.
pub const MAX_SYMBOL_LENGTH: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// An attempt to move the cursor outside the text.
    InvalidPosition { requested: usize, len: usize },
    /// An attempt to read a character at the end of the text.
    OutOfData,
    /// A symbol was recognized but has more than
    /// [`MAX_SYMBOL_LENGTH`] characters.
    SymbolTooLong(String),
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            ParseError::InvalidPosition { requested, len } => {
                write!(f, "invalid position {requested} in text of length {len}")
            }
            ParseError::OutOfData => f.write_str("out of data"),
            ParseError::SymbolTooLong(symbol) => {
                write!(
                    f,
                    "symbol {symbol} is too long (the limit is {MAX_SYMBOL_LENGTH} characters)"
                )
            }
        }
    }
}

impl Error for ParseError {}

#[must_use]
pub fn is_alphabetic(ch: u8) -> bool {
    ch.is_ascii_alphabetic()
}

#[must_use]
pub fn is_decimal_digit(ch: u8) -> bool {
    ch.is_ascii_digit()
}

/// Space, tab, carriage return and line feed.  Other ASCII control
/// characters (form feed, for example) are not white space here.
#[must_use]
pub fn is_white_space(ch: u8) -> bool {
    matches!(ch, b' ' | b'\t' | b'\r' | b'\n')
}

fn is_symbol_start(ch: u8) -> bool {
    is_alphabetic(ch) || ch == b'$'
}

fn is_symbol_continuation(ch: u8) -> bool {
    is_alphabetic(ch) || is_decimal_digit(ch) || ch == b'_' || ch == b'$'
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parser {
    text: Vec<u8>,
    index: usize,
}

impl Parser {
    /// Create a parser with its cursor at the start of `text`.
    pub fn new<T: AsRef<[u8]>>(text: T) -> Parser {
        Parser {
            text: text.as_ref().to_vec(),
            index: 0,
        }
    }

    #[must_use]
    pub fn position(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.text.len() - self.index
    }

    #[must_use]
    pub fn at_end(&self) -> bool {
        self.index >= self.text.len()
    }

    /// The text which has not yet been consumed.
    #[must_use]
    pub fn rest(&self) -> &[u8] {
        &self.text[self.index..]
    }

    /// Move the cursor forward by `count` positions.  Moving exactly
    /// to the end of the text is allowed.
    ///
    /// # Errors
    ///
    /// `InvalidPosition` if the cursor would land beyond the end of
    /// the text; the cursor is not moved.
    pub fn advance(&mut self, count: usize) -> Result<(), ParseError> {
        match self.index.checked_add(count) {
            Some(target) if target <= self.text.len() => {
                self.index = target;
                Ok(())
            }
            _ => Err(ParseError::InvalidPosition {
                requested: self.index.saturating_add(count),
                len: self.text.len(),
            }),
        }
    }

    /// Move the cursor to `index`, which may be the end position.
    ///
    /// # Errors
    ///
    /// `InvalidPosition` if `index` is beyond the end of the text.
    pub fn set_position(&mut self, index: usize) -> Result<(), ParseError> {
        if index > self.text.len() {
            Err(ParseError::InvalidPosition {
                requested: index,
                len: self.text.len(),
            })
        } else {
            self.index = index;
            Ok(())
        }
    }

    /// Return the character at the cursor and move past it.
    ///
    /// # Errors
    ///
    /// `OutOfData` at the end of the text.
    pub fn next_char(&mut self) -> Result<u8, ParseError> {
        let ch = self.peek_next_char()?;
        self.index += 1;
        Ok(ch)
    }

    /// Return the character at the cursor without moving.
    ///
    /// # Errors
    ///
    /// `OutOfData` at the end of the text.
    pub fn peek_next_char(&self) -> Result<u8, ParseError> {
        self.text
            .get(self.index)
            .copied()
            .ok_or(ParseError::OutOfData)
    }

    /// Consume `ch` if it is the character at the cursor.
    pub fn parse_character(&mut self, ch: u8) -> bool {
        if self.peek_next_char() == Ok(ch) {
            self.index += 1;
            true
        } else {
            false
        }
    }

    /// Report whether the remaining text starts with `token`.  This
    /// is a lookahead: the cursor does not move even on a match, and
    /// the caller commits with [`Parser::advance`].
    #[must_use]
    pub fn parse_token(&self, token: &str) -> bool {
        self.rest().starts_with(token.as_bytes())
    }

    /// As [`Parser::parse_token`], but ignoring ASCII case.
    #[must_use]
    pub fn parse_token_case_insensitive(&self, token: &str) -> bool {
        let token = token.as_bytes();
        self.remaining() >= token.len() && self.rest()[..token.len()].eq_ignore_ascii_case(token)
    }

    /// Move past any white space, returning the number of characters
    /// skipped.
    pub fn skip_white_space(&mut self) -> usize {
        let count = self
            .rest()
            .iter()
            .take_while(|ch| is_white_space(**ch))
            .count();
        self.index += count;
        count
    }

    /// Recognize an unsigned integer literal.
    ///
    /// When `allow_octal` is set, a literal whose first digit is `0`
    /// is read in radix 8; otherwise in radix 10.  Either way every
    /// decimal digit belongs to the literal, so `09` reads as 9.
    /// When `allow_separator` is set, underscores are consumed
    /// wherever they appear after the first digit, including at the
    /// end.
    ///
    /// On a match, returns the value and leaves the cursor after the
    /// last digit or separator.  Overflow wraps silently.  Returns
    /// `None`, without moving, if the cursor is not on a decimal
    /// digit.
    pub fn parse_integer(&mut self, allow_octal: bool, allow_separator: bool) -> Option<u64> {
        let first = self.peek_next_char().ok()?;
        if !is_decimal_digit(first) {
            return None;
        }
        let radix: u64 = if allow_octal && first == b'0' { 8 } else { 10 };

        let mut value: u64 = 0;
        loop {
            match self.peek_next_char() {
                Ok(ch) if is_decimal_digit(ch) => {
                    value = value.wrapping_mul(radix).wrapping_add(u64::from(ch - b'0'));
                    self.index += 1;
                }
                Ok(b'_') if allow_separator => {
                    self.index += 1;
                }
                _ => break,
            }
        }
        Some(value)
    }

    /// Recognize a symbol: a letter or `$`, followed by any number of
    /// letters, digits, `_` or `$`.
    ///
    /// # Errors
    ///
    /// `SymbolTooLong` if the symbol is longer than
    /// [`MAX_SYMBOL_LENGTH`]; the cursor is left where it was.
    pub fn parse_symbol(&mut self) -> Result<Option<String>, ParseError> {
        match self.peek_next_char() {
            Ok(ch) if is_symbol_start(ch) => (),
            _ => return Ok(None),
        }
        let len = 1 + self.rest()[1..]
            .iter()
            .take_while(|ch| is_symbol_continuation(**ch))
            .count();
        let symbol: String = self.rest()[..len].iter().map(|ch| char::from(*ch)).collect();
        if len > MAX_SYMBOL_LENGTH {
            event!(
                Level::DEBUG,
                "rejecting symbol {symbol} at position {}",
                self.index
            );
            return Err(ParseError::SymbolTooLong(symbol));
        }
        self.index += len;
        Ok(Some(symbol))
    }
}
