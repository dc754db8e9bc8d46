use super::*;

fn scan_tokens_only(input: &str) -> Result<Vec<Token>, ScanFailure> {
    scan(input).map(|lexemes| lexemes.into_iter().map(|lex| lex.token).collect())
}

fn scan_slices(input: &str) -> Vec<(Token, &str)> {
    scan(input)
        .expect("input should scan")
        .into_iter()
        .map(|lex| (lex.token, &input[lex.span]))
        .collect()
}

#[test]
fn test_empty_input() {
    assert_eq!(scan_tokens_only(""), Ok(Vec::new()));
    assert_eq!(scan_tokens_only("  \t "), Ok(Vec::new()));
}

#[test]
fn test_instruction_line() {
    assert_eq!(
        scan_slices("TAG  LA,U A0,0177 . load\nJ TAG\n"),
        vec![
            (Token::Symbol("TAG".to_string()), "TAG"),
            (Token::Symbol("LA".to_string()), "LA"),
            (Token::Punctuation(','), ","),
            (Token::Symbol("U".to_string()), "U"),
            (Token::Symbol("A0".to_string()), "A0"),
            (Token::Punctuation(','), ","),
            (Token::Integer(0o177), "0177"),
            (Token::Newline, "\n"),
            (Token::Symbol("J".to_string()), "J"),
            (Token::Symbol("TAG".to_string()), "TAG"),
            (Token::Newline, "\n"),
        ]
    );
}

#[test]
fn test_separated_literal() {
    assert_eq!(
        scan_tokens_only("1_000+$X"),
        Ok(vec![
            Token::Integer(1000),
            Token::Punctuation('+'),
            Token::Symbol("$X".to_string()),
        ])
    );
}

#[test]
fn test_comment_at_end_of_text() {
    assert_eq!(
        scan_tokens_only("X . no newline follows"),
        Ok(vec![Token::Symbol("X".to_string())])
    );
}

#[test]
fn test_symbol_too_long() {
    assert_eq!(
        scan_tokens_only("OK\n  VERYLONGSYMBOLNAME"),
        Err(ScanFailure {
            position: 5,
            error: ParseError::SymbolTooLong("VERYLONGSYMBOLNAME".to_string()),
        })
    );
}
