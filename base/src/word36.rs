//! `Word36` is the basic machine word of the 1100-series
//! architecture.  Every register, every directory control record and
//! every block transferred to or from a disk or tape is made of these
//! words.
//!
//! The value is held in a `u64` of which only the bottom 36 bits are
//! significant.  Every constructor and every operation masks its
//! result so that bits 36-63 are always zero.  We never mutate a word
//! in place; the setters return a new word.
//!
//! Sub-word fields are named the way the hardware documentation names
//! them, counting from the most significant end of the word:
//!
//! | Field  | Width | Bits            |
//! | ------ | ----- | --------------- |
//! | H1, H2 | 18    | 35-18, 17-0     |
//! | T1-T3  | 12    | 35-24, 23-12, 11-0 |
//! | Q1-Q4  | 9     | 35-27, 26-18, 17-9, 8-0 |
//! | S1-S6  | 6     | 35-30, ..., 5-0 |
use std::fmt::{self, Debug, Display, Formatter, Octal};

use serde::{Deserialize, Serialize};

use super::error::ConversionFailed;

#[cfg(test)]
mod tests;

/// A 36-bit machine word.
///
/// Equality is bitwise, so positive zero and negative zero compare
/// unequal.  Use [`Word36::is_zero`] when the arithmetic value
/// matters.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u64", try_from = "u64")]
pub struct Word36 {
    bits: u64,
}

/// This macro generates a getter and a value-returning setter for a
/// fixed sub-word field.  `$shift` is the bit position of the least
/// significant bit of the field and `$mask` is the (unshifted) field
/// mask.
macro_rules! subword_field {
    ($get:ident, $set:ident, $T:ty, $shift:expr, $mask:expr, $doc:expr) => {
        #[doc = concat!("Extract ", $doc, ".")]
        #[must_use]
        pub const fn $get(&self) -> $T {
            ((self.bits >> $shift) & $mask) as $T
        }

        #[doc = concat!("Return a copy of this word with ", $doc, " replaced.  Excess high bits of `value` are discarded.")]
        #[must_use]
        pub const fn $set(self, value: $T) -> Word36 {
            let field: u64 = ($mask as u64) << $shift;
            Word36 {
                bits: (self.bits & !field) | (((value as u64) & $mask) << $shift),
            }
        }
    };
}

impl Word36 {
    /// All 36 value bits set.
    pub const MASK: u64 = 0o777_777_777_777;
    /// The sign bit (bit 35) when the word is treated as a
    /// ones-complement integer.
    pub const SIGN_BIT: u64 = 0o400_000_000_000;

    pub const POSITIVE_ZERO: Word36 = Word36 { bits: 0 };
    pub const NEGATIVE_ZERO: Word36 = Word36 { bits: Self::MASK };
    pub const ZERO: Word36 = Self::POSITIVE_ZERO;
    pub const MAX: Word36 = Word36 { bits: Self::MASK };

    /// Construct a word from a 64-bit magnitude, silently discarding
    /// bits 36-63.
    #[must_use]
    pub const fn new(value: u64) -> Word36 {
        Word36 {
            bits: value & Self::MASK,
        }
    }

    /// Construct a word at compile time; out-of-range constants fail
    /// to compile rather than being masked.  This is what the
    /// [`w36!`](crate::w36) macro expands to.
    #[must_use]
    pub const fn from_const<const N: u64>() -> Word36 {
        struct Helper<const M: u64>;
        impl<const M: u64> Helper<M> {
            const W: Word36 = {
                if M > Word36::MASK {
                    panic!("input value is out of range")
                } else {
                    Word36 { bits: M }
                }
            };
        }
        Helper::<N>::W
    }

    /// Construct a word from its two halves.
    #[must_use]
    pub const fn from_halves(h1: u32, h2: u32) -> Word36 {
        Word36::ZERO.with_h1(h1).with_h2(h2)
    }

    /// The whole word as a native value.
    #[must_use]
    pub const fn w(&self) -> u64 {
        self.bits
    }

    /// Return a new word holding `value` (masked to 36 bits).  This
    /// exists alongside [`Word36::new`] so that field-oriented code
    /// can read uniformly (`w.with_w(..)`, `w.with_h1(..)`).
    #[must_use]
    pub const fn with_w(self, value: u64) -> Word36 {
        Word36::new(value)
    }

    subword_field!(h1, with_h1, u32, 18, 0o777_777, "H1 (bits 35-18)");
    subword_field!(h2, with_h2, u32, 0, 0o777_777, "H2 (bits 17-0)");

    subword_field!(t1, with_t1, u16, 24, 0o7777, "T1 (bits 35-24)");
    subword_field!(t2, with_t2, u16, 12, 0o7777, "T2 (bits 23-12)");
    subword_field!(t3, with_t3, u16, 0, 0o7777, "T3 (bits 11-0)");

    subword_field!(q1, with_q1, u16, 27, 0o777, "Q1 (bits 35-27)");
    subword_field!(q2, with_q2, u16, 18, 0o777, "Q2 (bits 26-18)");
    subword_field!(q3, with_q3, u16, 9, 0o777, "Q3 (bits 17-9)");
    subword_field!(q4, with_q4, u16, 0, 0o777, "Q4 (bits 8-0)");

    subword_field!(s1, with_s1, u8, 30, 0o77, "S1 (bits 35-30)");
    subword_field!(s2, with_s2, u8, 24, 0o77, "S2 (bits 29-24)");
    subword_field!(s3, with_s3, u8, 18, 0o77, "S3 (bits 23-18)");
    subword_field!(s4, with_s4, u8, 12, 0o77, "S4 (bits 17-12)");
    subword_field!(s5, with_s5, u8, 6, 0o77, "S5 (bits 11-6)");
    subword_field!(s6, with_s6, u8, 0, 0o77, "S6 (bits 5-0)");

    /// True when the sign bit (bit 35) is set.
    #[must_use]
    pub const fn is_negative(&self) -> bool {
        self.bits & Self::SIGN_BIT != 0
    }

    /// True for both ones-complement zeroes: all bits clear (+0) and
    /// all 36 bits set (-0).
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.bits == 0 || self.bits == Self::MASK
    }

    /// Replace negative zero with positive zero; any other value is
    /// returned unchanged.
    #[must_use]
    pub const fn eliminate_negative_zero(self) -> Word36 {
        if self.bits == Self::MASK {
            Word36::POSITIVE_ZERO
        } else {
            self
        }
    }

    // Trait methods cannot be const, so these work-alikes of the
    // std::ops implementations below exist for use in const
    // contexts.

    #[must_use]
    pub const fn and(self, mask: u64) -> Word36 {
        Word36 {
            bits: self.bits & mask & Self::MASK,
        }
    }

    #[must_use]
    pub const fn or(self, mask: u64) -> Word36 {
        Word36 {
            bits: (self.bits | mask) & Self::MASK,
        }
    }

    #[must_use]
    pub const fn xor(self, mask: u64) -> Word36 {
        Word36 {
            bits: (self.bits ^ mask) & Self::MASK,
        }
    }
}

impl Display for Word36 {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "{:012o}", self.bits)
    }
}

impl Octal for Word36 {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        Octal::fmt(&self.bits, f)
    }
}

impl Debug for Word36 {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "Word36{{bits: {:#014o}}}", self.bits)
    }
}

impl std::ops::Not for Word36 {
    type Output = Word36;
    fn not(self) -> Word36 {
        self.xor(Word36::MASK)
    }
}

impl std::ops::BitAnd<u64> for Word36 {
    type Output = Word36;
    fn bitand(self, mask: u64) -> Word36 {
        self.and(mask)
    }
}

impl std::ops::BitAnd for Word36 {
    type Output = Word36;
    fn bitand(self, rhs: Word36) -> Word36 {
        self.and(rhs.bits)
    }
}

impl std::ops::BitOr<u64> for Word36 {
    type Output = Word36;
    fn bitor(self, mask: u64) -> Word36 {
        self.or(mask)
    }
}

impl std::ops::BitOr for Word36 {
    type Output = Word36;
    fn bitor(self, rhs: Word36) -> Word36 {
        self.or(rhs.bits)
    }
}

impl std::ops::BitXor<u64> for Word36 {
    type Output = Word36;
    fn bitxor(self, mask: u64) -> Word36 {
        self.xor(mask)
    }
}

impl std::ops::BitXor for Word36 {
    type Output = Word36;
    fn bitxor(self, rhs: Word36) -> Word36 {
        self.xor(rhs.bits)
    }
}

/// This macro implements conversions from native types which always
/// fit into a word.
macro_rules! from_native_type_to_word {
    ($($from:ty)*) => {
        $(
            impl From<$from> for Word36 {
                fn from(n: $from) -> Word36 {
                    Word36 { bits: n.into() }
                }
            }
        )*
    }
}

from_native_type_to_word!(u8 u16 u32);

impl From<Word36> for u64 {
    fn from(w: Word36) -> u64 {
        w.bits
    }
}

impl TryFrom<u64> for Word36 {
    type Error = ConversionFailed;
    fn try_from(n: u64) -> Result<Word36, ConversionFailed> {
        if n > Word36::MASK {
            Err(ConversionFailed::TooLarge)
        } else {
            Ok(Word36 { bits: n })
        }
    }
}

impl TryFrom<usize> for Word36 {
    type Error = ConversionFailed;
    fn try_from(n: usize) -> Result<Word36, ConversionFailed> {
        match u64::try_from(n) {
            Ok(bits) => Word36::try_from(bits),
            Err(_) => Err(ConversionFailed::TooLarge),
        }
    }
}
