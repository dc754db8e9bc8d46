//! Listing the lexemes of a source file.
use std::io::Write;
use std::path::PathBuf;

use tracing::{event, Level};

use assembler::{Lexeme, Token};

use super::{read_file, Fail};

fn describe(lexeme: &Lexeme) -> String {
    format!(
        "{}..{}\t{}",
        lexeme.span.start, lexeme.span.end, lexeme.token
    )
}

pub(crate) fn scan<W: Write>(input: &PathBuf, out: &mut W) -> Result<(), Fail> {
    let bytes = read_file(input)?;
    let text = String::from_utf8_lossy(&bytes);
    let lexemes = assembler::scan(&text).map_err(|failure| Fail::BadInput {
        path: input.clone(),
        position: failure.position,
        detail: failure.error.to_string(),
    })?;
    event!(
        Level::DEBUG,
        "{} holds {} lexemes",
        input.display(),
        lexemes.len()
    );
    for lexeme in lexemes
        .iter()
        .filter(|lexeme| lexeme.token != Token::Newline)
    {
        writeln!(out, "{}", describe(lexeme)).map_err(|error| Fail::Io {
            path: PathBuf::from("-"),
            error,
        })?;
    }
    Ok(())
}
