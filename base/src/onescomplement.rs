//! Ones-complement arithmetic on 36-bit words.
//!
//! The architecture represents signed integers in ones-complement
//! form: negation is bitwise inversion and there are two zeroes.
//! These helpers convert between that representation and native
//! two's-complement `i64` values.
use super::word36::Word36;

/// The sign of a number.  Although in a ones-complement system all
/// values have a sign bit, we treat both zeroes as `Zero` in order to
/// simplify working with native types and ones-complement types
/// together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    Negative = -1, // <= -1
    Zero = 0,      // +0 or -0
    Positive = 1,  // >= +1
}

/// The largest magnitude representable in a ones-complement word.
const MAGNITUDE_MASK: u64 = 0o377_777_777_777;

impl Word36 {
    #[must_use]
    pub fn signum(&self) -> Sign {
        if self.is_zero() {
            Sign::Zero
        } else if self.is_negative() {
            Sign::Negative
        } else {
            Sign::Positive
        }
    }

    /// The additive inverse.  In ones-complement this is the same
    /// thing as the logical complement.
    #[must_use]
    pub fn negate(self) -> Word36 {
        !self
    }

    /// Interpret the word as a ones-complement integer.  Both zeroes
    /// yield 0.
    #[must_use]
    pub fn to_native(self) -> i64 {
        if self.is_negative() {
            // The magnitude of a negative value is its complement.
            // `(!self).w()` is at most MAGNITUDE_MASK, so this fits.
            -((!self).w() as i64)
        } else {
            self.w() as i64
        }
    }

    /// Convert a native integer to ones-complement.  Magnitudes which
    /// do not fit in 35 bits are truncated.
    #[must_use]
    pub fn from_native(n: i64) -> Word36 {
        let magnitude: u64 = n.unsigned_abs() & MAGNITUDE_MASK;
        if n < 0 {
            !Word36::new(magnitude)
        } else {
            Word36::new(magnitude)
        }
    }

    /// Ones-complement addition.  The sum of two negative zeroes is
    /// negative zero; any other zero result is positive zero.
    #[must_use]
    pub fn ones_complement_add(self, rhs: Word36) -> Word36 {
        if self == Word36::NEGATIVE_ZERO && rhs == Word36::NEGATIVE_ZERO {
            return Word36::NEGATIVE_ZERO;
        }
        Word36::from_native(self.to_native() + rhs.to_native())
    }
}

/// Sign-extend a 12-bit value to a full word.
#[must_use]
pub fn sign_extend_12(value: u64) -> Word36 {
    sign_extend(value, 12)
}

/// Sign-extend an 18-bit value to a full word.
#[must_use]
pub fn sign_extend_18(value: u64) -> Word36 {
    sign_extend(value, 18)
}

/// Sign-extend a 24-bit value to a full word.
#[must_use]
pub fn sign_extend_24(value: u64) -> Word36 {
    sign_extend(value, 24)
}

fn sign_extend(value: u64, width: u32) -> Word36 {
    let field_mask: u64 = (1 << width) - 1;
    let value = value & field_mask;
    if value & (1 << (width - 1)) == 0 {
        Word36::new(value)
    } else {
        Word36::new(value | (Word36::MASK & !field_mask))
    }
}
