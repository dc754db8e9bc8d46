//! Various convenience utilities for splitting 36-bit words into
//! smaller components and for joining them together.
use crate::word36::Word36;

/// Split a word into its two 18-bit halves, most significant first.
#[must_use]
pub fn split_halves(w: Word36) -> (u32, u32) {
    (w.h1(), w.h2())
}

/// Join two 18-bit values into a word.  Excess bits are discarded.
#[must_use]
pub fn join_halves(left: u32, right: u32) -> Word36 {
    Word36::from_halves(left, right)
}

/// Split a word into four 9-bit quarters, ordered from Q1 (most
/// significant) to Q4.
#[must_use]
pub fn quarters(w: Word36) -> [u16; 4] {
    [w.q1(), w.q2(), w.q3(), w.q4()]
}

/// Join four 9-bit quarters (Q1 first) into a word.
#[must_use]
pub fn join_quarters(q: [u16; 4]) -> Word36 {
    Word36::ZERO
        .with_q1(q[0])
        .with_q2(q[1])
        .with_q3(q[2])
        .with_q4(q[3])
}

/// Split a word into six 6-bit sixths, ordered from S1 (most
/// significant) to S6.
#[must_use]
pub fn sixths(w: Word36) -> [u8; 6] {
    [w.s1(), w.s2(), w.s3(), w.s4(), w.s5(), w.s6()]
}

/// Join six 6-bit values (S1 first) into a word.
#[must_use]
pub fn join_sixths(s: [u8; 6]) -> Word36 {
    s.iter()
        .fold(Word36::ZERO, |w, sixth| {
            Word36::new((w.w() << 6) | u64::from(sixth & 0o77))
        })
}

/// Split a word into three 12-bit thirds, ordered from T1 (most
/// significant) to T3.
#[must_use]
pub fn thirds(w: Word36) -> [u16; 3] {
    [w.t1(), w.t2(), w.t3()]
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! assert_octal_eq {
        ($left:expr, $right:expr $(,)?) => {{
            match (&$left, &$right) {
                (left_val, right_val) => {
                    if !(*left_val == *right_val) {
                        panic!(
                            "Assertion failed: {:>#014o} != {:>#014o}",
                            left_val, right_val
                        );
                    }
                }
            }
        }};
    }

    #[test]
    fn test_join_halves() {
        assert_octal_eq!(
            join_halves(0o123_456, 0o525_252),
            Word36::new(0o123_456_525_252)
        );
        // Excess bits of either half are discarded.
        assert_octal_eq!(
            join_halves(0o7_123_456, 0o3_525_252),
            Word36::new(0o123_456_525_252)
        );
    }

    #[test]
    fn test_split_halves() {
        assert_eq!(
            split_halves(Word36::new(0o123_456_525_252)),
            (0o123_456, 0o525_252)
        );
    }

    #[test]
    fn test_quarters() {
        let w = Word36::new(0o123_456_525_252);
        assert_eq!(quarters(w), [0o123, 0o456, 0o525, 0o252]);
        assert_octal_eq!(join_quarters(quarters(w)), w);
    }

    #[test]
    fn test_sixths() {
        let w = Word36::new(0o12_34_56_70_01_77);
        assert_eq!(sixths(w), [0o12, 0o34, 0o56, 0o70, 0o01, 0o77]);
        assert_octal_eq!(join_sixths(sixths(w)), w);
    }

    #[test]
    fn test_thirds() {
        assert_eq!(
            thirds(Word36::new(0o1234_5670_7777)),
            [0o1234, 0o5670, 0o7777]
        );
    }
}
