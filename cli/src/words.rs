//! Conversion between text files of words and the packed byte format.
use std::path::PathBuf;

use tracing::{event, Level};

use assembler::Parser;
use base::prelude::*;

use super::{read_file, write_file, Fail};

/// Read words written as integers, separated by white space.
fn parse_words(path: &PathBuf, text: &[u8]) -> Result<Vec<Word36>, Fail> {
    let mut parser = Parser::new(text);
    let mut words = Vec::new();
    loop {
        parser.skip_white_space();
        if parser.at_end() {
            return Ok(words);
        }
        let position = parser.position();
        let bad_input = |detail: String| Fail::BadInput {
            path: path.clone(),
            position,
            detail,
        };
        let value = parser
            .parse_integer(true, true)
            .ok_or_else(|| bad_input("expected a number".to_string()))?;
        // The parser reads 8 and 9 as digits even in an octal literal.
        let literal = &text[position..parser.position()];
        if literal.first() == Some(&b'0') && literal.iter().any(|ch| matches!(ch, b'8' | b'9')) {
            return Err(bad_input(format!(
                "{} is not an octal number",
                String::from_utf8_lossy(literal)
            )));
        }
        match parser.peek_next_char() {
            Ok(ch) if !assembler::is_white_space(ch) => {
                return Err(bad_input(format!(
                    "unexpected character {:?} after a number",
                    char::from(ch)
                )));
            }
            _ => (),
        }
        let word = Word36::try_from(value)
            .map_err(|_| bad_input(format!("{value:o} does not fit in 36 bits")))?;
        words.push(word);
    }
}

pub(crate) fn pack(input: &PathBuf, output: &PathBuf) -> Result<(), Fail> {
    let text = read_file(input)?;
    let mut words = parse_words(input, &text)?;
    if words.len() % 2 != 0 {
        event!(
            Level::WARN,
            "{} holds an odd number of words, padding with a zero word",
            input.display()
        );
        words.push(Word36::ZERO);
    }
    let bytes = pack_words(&words)?;
    event!(
        Level::INFO,
        "packed {} words into {} bytes",
        words.len(),
        bytes.len()
    );
    write_file(output, &bytes)
}

pub(crate) fn format_words(words: &[Word36]) -> String {
    words.iter().map(|w| format!("0{w:012o}\n")).collect()
}

pub(crate) fn unpack(input: &PathBuf, output: &PathBuf) -> Result<(), Fail> {
    let bytes = read_file(input)?;
    let words = unpack_bytes(&bytes)?;
    event!(Level::INFO, "unpacked {} words", words.len());
    write_file(output, format_words(&words).as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path() -> PathBuf {
        PathBuf::from("words.txt")
    }

    #[test]
    fn test_parse_words() {
        let words = parse_words(&path(), b" 0777 12\n0123_456\t0\n").expect("valid words");
        assert_eq!(
            words,
            vec![
                Word36::new(0o777),
                Word36::new(12),
                Word36::new(0o123_456),
                Word36::ZERO
            ]
        );
    }

    #[test]
    fn test_reject_garbage() {
        match parse_words(&path(), b"017 X") {
            Err(Fail::BadInput { position, .. }) => assert_eq!(position, 4),
            other => panic!("expected bad input, got {other:?}"),
        }
        match parse_words(&path(), b"0189") {
            Err(Fail::BadInput { position, .. }) => assert_eq!(position, 0),
            other => panic!("expected bad input, got {other:?}"),
        }
        match parse_words(&path(), b"1 07_9 ") {
            Err(Fail::BadInput { position, .. }) => assert_eq!(position, 2),
            other => panic!("expected bad input, got {other:?}"),
        }
        assert_eq!(
            parse_words(&path(), b"189 17_ ").expect("decimal words"),
            vec![Word36::new(189), Word36::new(17)]
        );
    }

    #[test]
    fn test_reject_oversized_word() {
        assert!(parse_words(&path(), b"01000000000000").is_err());
        assert!(parse_words(&path(), b"0777777777777").is_ok());
    }

    #[test]
    fn test_format_reads_back() {
        let words = vec![Word36::new(0o123_456_712_345), Word36::MAX];
        let text = format_words(&words);
        assert_eq!(text, "0123456712345\n0777777777777\n");
        assert_eq!(
            parse_words(&path(), text.as_bytes()).expect("valid words"),
            words
        );
    }
}
