//! Character set conversions.
//!
//! Text is stored in words in one of two ways:
//!
//! - Fieldata: six 6-bit characters per word.  Fieldata has no lower
//!   case; lower-case ASCII letters are folded to upper case on the
//!   way in.  Directory control records keep qualifiers, filenames,
//!   keys and reel numbers in Fieldata.
//! - ASCII: four 9-bit quarters per word, each holding one 8-bit
//!   character.
//!
//! Both forms are padded on the right with spaces.
use super::subword::{join_quarters, join_sixths, quarters, sixths};
use super::word36::Word36;


/// The Fieldata space character.
pub const FIELDATA_SPACE: u8 = 0o05;

/// Number of Fieldata characters in one word.
pub const FIELDATA_CHARS_PER_WORD: usize = 6;

/// Number of ASCII characters in one word.
pub const ASCII_CHARS_PER_WORD: usize = 4;

const ASCII_FROM_FIELDATA: [u8; 64] = [
    b'@', b'[', b']', b'#', b'^', b' ', b'A', b'B', //
    b'C', b'D', b'E', b'F', b'G', b'H', b'I', b'J', //
    b'K', b'L', b'M', b'N', b'O', b'P', b'Q', b'R', //
    b'S', b'T', b'U', b'V', b'W', b'X', b'Y', b'Z', //
    b')', b'-', b'+', b'<', b'=', b'>', b'&', b'$', //
    b'*', b'(', b'%', b':', b'?', b'!', b',', b'\\', //
    b'0', b'1', b'2', b'3', b'4', b'5', b'6', b'7', //
    b'8', b'9', b'\'', b';', b'/', b'.', b'"', b'_', //
];

// Indexed by 7-bit ASCII.  Control characters have no Fieldata
// equivalent and become spaces.
const FIELDATA_FROM_ASCII: [u8; 128] = [
    0o05, 0o05, 0o05, 0o05, 0o05, 0o05, 0o05, 0o05, 0o05, 0o05, 0o05, 0o05, 0o05, 0o05, 0o05, 0o05,
    0o05, 0o05, 0o05, 0o05, 0o05, 0o05, 0o05, 0o05, 0o05, 0o05, 0o05, 0o05, 0o05, 0o05, 0o05, 0o05,
    0o05, 0o55, 0o76, 0o03, 0o47, 0o52, 0o46, 0o72, 0o51, 0o40, 0o50, 0o42, 0o56, 0o41, 0o75, 0o74,
    0o60, 0o61, 0o62, 0o63, 0o64, 0o65, 0o66, 0o67, 0o70, 0o71, 0o53, 0o73, 0o43, 0o44, 0o45, 0o54,
    0o00, 0o06, 0o07, 0o10, 0o11, 0o12, 0o13, 0o14, 0o15, 0o16, 0o17, 0o20, 0o21, 0o22, 0o23, 0o24,
    0o25, 0o26, 0o27, 0o30, 0o31, 0o32, 0o33, 0o34, 0o35, 0o36, 0o37, 0o01, 0o57, 0o02, 0o04, 0o77,
    0o00, 0o06, 0o07, 0o10, 0o11, 0o12, 0o13, 0o14, 0o15, 0o16, 0o17, 0o20, 0o21, 0o22, 0o23, 0o24,
    0o25, 0o26, 0o27, 0o30, 0o31, 0o32, 0o33, 0o34, 0o35, 0o36, 0o37, 0o54, 0o57, 0o55, 0o04, 0o77,
];

/// Convert one ASCII byte to Fieldata.  Bytes above 0x7F are treated
/// as their low 7 bits.
#[must_use]
pub fn fieldata_from_ascii(ch: u8) -> u8 {
    FIELDATA_FROM_ASCII[usize::from(ch & 0x7F)]
}

/// Convert one Fieldata code (only the low six bits are used) to
/// ASCII.
#[must_use]
pub fn ascii_from_fieldata(code: u8) -> u8 {
    ASCII_FROM_FIELDATA[usize::from(code & 0o77)]
}

fn fieldata_word_from_bytes(bytes: &[u8]) -> Word36 {
    let mut codes = [FIELDATA_SPACE; FIELDATA_CHARS_PER_WORD];
    for (slot, ch) in codes.iter_mut().zip(bytes) {
        *slot = fieldata_from_ascii(*ch);
    }
    join_sixths(codes)
}

impl Word36 {
    /// Pack up to six characters of `s` as Fieldata, left-justified
    /// and space-filled.  Characters beyond the sixth are ignored.
    #[must_use]
    pub fn from_fieldata_str(s: &str) -> Word36 {
        fieldata_word_from_bytes(s.as_bytes())
    }

    /// Pack up to four characters of `s` as 9-bit ASCII quarters,
    /// left-justified and space-filled.
    #[must_use]
    pub fn from_ascii_str(s: &str) -> Word36 {
        let mut codes = [u16::from(b' '); ASCII_CHARS_PER_WORD];
        for (slot, ch) in codes.iter_mut().zip(s.bytes()) {
            *slot = u16::from(ch);
        }
        join_quarters(codes)
    }

    /// Decode the word as six Fieldata characters (padding included).
    #[must_use]
    pub fn to_fieldata_string(&self) -> String {
        sixths(*self)
            .iter()
            .map(|code| char::from(ascii_from_fieldata(*code)))
            .collect()
    }

    /// Decode the word as four ASCII characters (padding included).
    /// Only the low eight bits of each quarter are used.
    #[must_use]
    pub fn to_ascii_string(&self) -> String {
        quarters(*self)
            .iter()
            .map(|q| char::from((q & 0o377) as u8))
            .collect()
    }
}

/// Pack `s` as Fieldata into exactly `word_count` words, space-filled.
/// Characters which do not fit are dropped.
#[must_use]
pub fn fieldata_words(s: &str, word_count: usize) -> Vec<Word36> {
    let bytes = s.as_bytes();
    (0..word_count)
        .map(|wx| {
            let start = (wx * FIELDATA_CHARS_PER_WORD).min(bytes.len());
            let end = ((wx + 1) * FIELDATA_CHARS_PER_WORD).min(bytes.len());
            fieldata_word_from_bytes(&bytes[start..end])
        })
        .collect()
}

/// Decode a run of Fieldata words, removing the trailing space
/// padding.
#[must_use]
pub fn fieldata_string(words: &[Word36]) -> String {
    let text: String = words.iter().map(Word36::to_fieldata_string).collect();
    text.trim_end_matches(' ').to_string()
}

/// Pack `s` as ASCII into exactly `word_count` words, space-filled.
#[must_use]
pub fn ascii_words(s: &str, word_count: usize) -> Vec<Word36> {
    let bytes = s.as_bytes();
    (0..word_count)
        .map(|wx| {
            let mut codes = [u16::from(b' '); ASCII_CHARS_PER_WORD];
            for (cx, slot) in codes.iter_mut().enumerate() {
                if let Some(ch) = bytes.get(wx * ASCII_CHARS_PER_WORD + cx) {
                    *slot = u16::from(*ch);
                }
            }
            join_quarters(codes)
        })
        .collect()
}

/// Decode a run of ASCII words, removing the trailing space padding.
#[must_use]
pub fn ascii_string(words: &[Word36]) -> String {
    let text: String = words.iter().map(Word36::to_ascii_string).collect();
    text.trim_end_matches(' ').to_string()
}
