//! The prelude exports the types which almost every user of the
//! base crate needs: the word itself, its buffer and their errors.
pub use super::buffer::{pack_words, unpack_bytes, Word36Buffer};
pub use super::error::*;
pub use super::onescomplement::Sign;
pub use super::subword::{join_halves, split_halves};
pub use super::w36;
pub use super::word36::Word36;
