use test_strategy::proptest;

use super::*;

#[test]
fn test_character_classes() {
    assert!(is_alphabetic(b'q'));
    assert!(is_alphabetic(b'Q'));
    assert!(!is_alphabetic(b'$'));
    assert!(is_decimal_digit(b'7'));
    assert!(!is_decimal_digit(b'a'));
    for ch in [b' ', b'\t', b'\r', b'\n'] {
        assert!(is_white_space(ch));
    }
    assert!(!is_white_space(0x0C));
    assert!(!is_white_space(b'_'));
}

#[test]
fn test_empty_text() {
    let mut parser = Parser::new("");
    assert!(parser.at_end());
    assert_eq!(parser.remaining(), 0);
    assert_eq!(parser.next_char(), Err(ParseError::OutOfData));
    assert_eq!(parser.peek_next_char(), Err(ParseError::OutOfData));
    assert!(!parser.parse_character(b'x'));
    assert_eq!(parser.parse_integer(true, true), None);
    assert_eq!(parser.parse_symbol(), Ok(None));
    assert_eq!(parser.skip_white_space(), 0);
    assert_eq!(parser.set_position(0), Ok(()));
}

#[test]
fn test_advance_and_set_position() {
    let mut parser = Parser::new("abc");
    assert_eq!(parser.advance(2), Ok(()));
    assert_eq!(parser.position(), 2);
    assert_eq!(
        parser.advance(2),
        Err(ParseError::InvalidPosition {
            requested: 4,
            len: 3
        })
    );
    assert_eq!(parser.position(), 2);
    assert_eq!(parser.advance(1), Ok(()));
    assert!(parser.at_end());

    // The end position itself is valid.
    assert_eq!(parser.set_position(3), Ok(()));
    assert!(parser.set_position(4).is_err());
    assert_eq!(parser.position(), 3);
    assert_eq!(parser.set_position(0), Ok(()));
    assert_eq!(parser.next_char(), Ok(b'a'));
}

#[test]
fn test_next_and_peek() {
    let mut parser = Parser::new("xy");
    assert_eq!(parser.peek_next_char(), Ok(b'x'));
    assert_eq!(parser.position(), 0);
    assert_eq!(parser.next_char(), Ok(b'x'));
    assert_eq!(parser.next_char(), Ok(b'y'));
    assert_eq!(parser.next_char(), Err(ParseError::OutOfData));
    assert_eq!(parser.position(), 2);
}

#[test]
fn test_parse_character() {
    let mut parser = Parser::new("+-");
    assert!(!parser.parse_character(b'-'));
    assert_eq!(parser.position(), 0);
    assert!(parser.parse_character(b'+'));
    assert!(parser.parse_character(b'-'));
    assert!(parser.at_end());
}

#[test]
fn test_tokens_do_not_advance() {
    let parser = Parser::new("@ASG,T file");
    assert!(parser.parse_token("@ASG"));
    assert!(!parser.parse_token("@asg"));
    assert!(parser.parse_token_case_insensitive("@asg"));
    assert!(!parser.parse_token_case_insensitive("@asg,tx file and more"));
    assert_eq!(parser.position(), 0);
}

#[test]
fn test_skip_white_space() {
    let mut parser = Parser::new(" \t\r\n x");
    assert_eq!(parser.skip_white_space(), 5);
    assert_eq!(parser.peek_next_char(), Ok(b'x'));
    assert_eq!(parser.skip_white_space(), 0);
}

#[test]
fn test_octal_literal_with_separator() {
    let mut parser = Parser::new("0123_456");
    assert_eq!(parser.parse_integer(true, true), Some(42798));
    assert!(parser.at_end());
}

#[test]
fn test_decimal_literal_with_separator() {
    let mut parser = Parser::new("42_000");
    assert_eq!(parser.parse_integer(false, true), Some(42000));
    assert!(parser.at_end());
}

#[test]
fn test_leading_zero_is_decimal_without_octal() {
    let mut parser = Parser::new("0123");
    assert_eq!(parser.parse_integer(false, false), Some(123));
}

#[test]
fn test_separator_not_allowed() {
    let mut parser = Parser::new("42_000");
    assert_eq!(parser.parse_integer(false, false), Some(42));
    assert_eq!(parser.peek_next_char(), Ok(b'_'));
}

#[test]
fn test_trailing_separator_is_consumed() {
    let mut parser = Parser::new("12_ ");
    assert_eq!(parser.parse_integer(false, true), Some(12));
    assert_eq!(parser.position(), 3);

    let mut parser = Parser::new("17__,");
    assert_eq!(parser.parse_integer(false, true), Some(17));
    assert_eq!(parser.peek_next_char(), Ok(b','));
}

#[test]
fn test_octal_literal_takes_every_decimal_digit() {
    let mut parser = Parser::new("09");
    assert_eq!(parser.parse_integer(true, false), Some(9));
    assert_eq!(parser.position(), 2);

    let mut parser = Parser::new("0178,");
    assert_eq!(parser.parse_integer(true, false), Some(0o170 + 8));
    assert_eq!(parser.peek_next_char(), Ok(b','));
}

#[test]
fn test_integer_no_match() {
    let mut parser = Parser::new("_12");
    assert_eq!(parser.parse_integer(true, true), None);
    assert_eq!(parser.position(), 0);
}

#[test]
fn test_integer_overflow_wraps() {
    // 2^64 wraps to zero.
    let mut parser = Parser::new("18446744073709551616");
    assert_eq!(parser.parse_integer(false, false), Some(0));
    assert!(parser.at_end());
}

#[test]
fn test_symbol() {
    let mut parser = Parser::new("$SETC12345");
    assert_eq!(parser.parse_symbol(), Ok(Some("$SETC12345".to_string())));
    assert!(parser.at_end());
}

#[test]
fn test_symbol_stops_at_punctuation() {
    let mut parser = Parser::new("a_b$1,x");
    assert_eq!(parser.parse_symbol(), Ok(Some("a_b$1".to_string())));
    assert_eq!(parser.peek_next_char(), Ok(b','));
}

#[test]
fn test_symbol_of_maximum_length() {
    let mut parser = Parser::new("ABCDEFGHIJKL");
    assert_eq!(parser.parse_symbol(), Ok(Some("ABCDEFGHIJKL".to_string())));
}

#[test]
fn test_symbol_too_long() {
    let mut parser = Parser::new("ABCDEFGHIJKLM");
    assert_eq!(
        parser.parse_symbol(),
        Err(ParseError::SymbolTooLong("ABCDEFGHIJKLM".to_string()))
    );
    assert_eq!(parser.position(), 0);
}

#[test]
fn test_symbol_no_match() {
    for text in ["1ABC", "_ABC", " ABC"] {
        let mut parser = Parser::new(text);
        assert_eq!(parser.parse_symbol(), Ok(None), "text {text:?}");
        assert_eq!(parser.position(), 0);
    }
}

#[test]
fn test_backtracking() {
    let mut parser = Parser::new("LABEL 12");
    let mark = parser.position();
    assert!(parser.parse_symbol().expect("short symbol").is_some());
    parser.skip_white_space();
    assert_eq!(parser.parse_integer(false, false), Some(12));
    parser.set_position(mark).expect("mark is valid");
    assert_eq!(parser.parse_symbol(), Ok(Some("LABEL".to_string())));
}

#[proptest]
fn recognizers_never_move_backwards(text: String) {
    let mut parser = Parser::new(&text);
    let len = text.len();
    while !parser.at_end() {
        let before = parser.position();
        parser.skip_white_space();
        let _ = parser.parse_integer(true, true);
        let _ = parser.parse_symbol();
        let after_recognizers = parser.position();
        assert!(after_recognizers >= before);
        assert!(after_recognizers <= len);
        if after_recognizers == before {
            // Nothing matched; step over one character.
            assert!(parser.next_char().is_ok());
        }
        assert!(parser.position() <= len);
    }
}

#[proptest]
fn failed_integer_leaves_cursor(text: String) {
    let mut parser = Parser::new(&text);
    if parser.parse_integer(true, true).is_none() {
        assert_eq!(parser.position(), 0);
    } else {
        assert!(parser.position() > 0);
    }
}
