//! Basic error reporting.

use std::error::Error;
use std::fmt::{self, Debug, Display, Formatter};

/// Represents a failure to convert a native value into a `Word36` or
/// into one of its sub-word fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConversionFailed {
    TooLarge,
    TooSmall,
}

impl Error for ConversionFailed {}

impl Display for ConversionFailed {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            ConversionFailed::TooLarge => f.write_str("value is too large for a 36-bit word"),
            ConversionFailed::TooSmall => f.write_str("value is too small for a 36-bit word"),
        }
    }
}

/// Describes why a transfer between words and packed bytes could
/// not be performed.  No partial transfer happens when one of these
/// is returned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PackingError {
    /// Words are packed in pairs, so the word count must be even.
    LengthNotEven(usize),
    /// The requested extent runs off the end of one of the buffers.
    RangeExceedsBuffer {
        /// Which side of the transfer was too short ("word" or "byte").
        buffer: &'static str,
        offset: usize,
        needed: usize,
        available: usize,
    },
    /// A byte sequence to be unpacked is not a whole number of
    /// 9-byte groups.
    NotWholeBlocks(usize),
}

impl Error for PackingError {}

impl Display for PackingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            PackingError::LengthNotEven(count) => {
                write!(f, "word count {count} is not even")
            }
            PackingError::RangeExceedsBuffer {
                buffer,
                offset,
                needed,
                available,
            } => {
                write!(
                    f,
                    "{buffer} range at offset {offset} of length {needed} exceeds buffer of length {available}"
                )
            }
            PackingError::NotWholeBlocks(len) => {
                write!(f, "byte length {len} is not a multiple of 9")
            }
        }
    }
}
