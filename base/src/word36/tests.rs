use test_strategy::proptest;

use super::{ConversionFailed, Word36};

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
fn test_new_masks_to_36_bits() {
    assert_eq!(Word36::new(0o7_777_777_777_777).w(), Word36::MASK);
    assert_eq!(Word36::new(1 << 36).w(), 0);
    assert_eq!(Word36::new(u64::MAX).w(), Word36::MASK);
}

#[test]
fn test_try_from_u64() {
    assert_eq!(Word36::try_from(0o777_777_777_777_u64), Ok(Word36::MAX));
    assert_eq!(
        Word36::try_from(0o1_000_000_000_000_u64),
        Err(ConversionFailed::TooLarge)
    );
}

#[test]
fn test_w36_macro() {
    let m: Word36 = crate::w36!(40_u64);
    let n: Word36 = Word36::from(40_u32);
    assert_eq!(m, n);
}

#[test]
fn test_halves() {
    let w = Word36::new(0o123_456_701_234);
    assert_octal_eq!(w.h1(), 0o123_456_u32);
    assert_octal_eq!(w.h2(), 0o701_234_u32);
    assert_octal_eq!(w.with_h1(0o777_777), Word36::new(0o777_777_701_234));
    assert_octal_eq!(w.with_h2(0), Word36::new(0o123_456_000_000));
}

#[test]
fn test_quarters() {
    let w = Word36::new(0o123_456_701_234);
    assert_eq!([w.q1(), w.q2(), w.q3(), w.q4()], [0o123, 0o456, 0o701, 0o234]);
    assert_octal_eq!(w.with_q2(0o777), Word36::new(0o123_777_701_234));
    assert_octal_eq!(w.with_q4(0o1_001), Word36::new(0o123_456_701_001));
}

#[test]
fn test_sixths() {
    let w = Word36::new(0o12_34_56_70_12_34);
    assert_eq!(
        [w.s1(), w.s2(), w.s3(), w.s4(), w.s5(), w.s6()],
        [0o12, 0o34, 0o56, 0o70, 0o12, 0o34]
    );
    assert_octal_eq!(w.with_s1(0o77), Word36::new(0o77_34_56_70_12_34));
    assert_octal_eq!(w.with_s4(0), Word36::new(0o12_34_56_00_12_34));
    assert_octal_eq!(w.with_s6(0o1_01), Word36::new(0o12_34_56_70_12_01));
}

#[test]
fn test_thirds() {
    let w = Word36::new(0o1234_5670_1234);
    assert_eq!([w.t1(), w.t2(), w.t3()], [0o1234, 0o5670, 0o1234]);
    assert_octal_eq!(w.with_t3(0o7777), Word36::new(0o1234_5670_7777));
}

#[test]
fn test_zero_duality() {
    assert!(Word36::POSITIVE_ZERO.is_zero());
    assert!(Word36::NEGATIVE_ZERO.is_zero());
    assert!(!Word36::new(1).is_zero());
    assert_ne!(Word36::POSITIVE_ZERO, Word36::NEGATIVE_ZERO);
    assert_eq!(
        Word36::NEGATIVE_ZERO.eliminate_negative_zero(),
        Word36::POSITIVE_ZERO
    );
    assert_eq!(Word36::new(5).eliminate_negative_zero(), Word36::new(5));
}

#[test]
fn test_logical_operations() {
    let a = Word36::new(0o707_070_707_070);
    let b = Word36::new(0o770_077_007_700);
    assert_octal_eq!(a & b, Word36::new(0o700_070_007_000));
    assert_octal_eq!(a | b, Word36::new(0o777_077_707_770));
    assert_octal_eq!(a ^ b, Word36::new(0o077_007_700_770));
    assert_octal_eq!(!a, Word36::new(0o070_707_070_707));
    assert_octal_eq!(a & u64::MAX, a);
    assert_octal_eq!(a | u64::MAX, Word36::MAX);
}

#[test]
fn test_display() {
    assert_eq!(Word36::new(0o1234).to_string(), "000000001234");
    assert_eq!(format!("{:?}", Word36::new(8)), "Word36{bits: 0o000000000010}");
}

#[proptest]
fn every_operation_is_canonical(
    #[strategy(0u64..=Word36::MASK)] a: u64,
    #[strategy(0u64..=Word36::MASK)] b: u64,
    wide: u64,
) {
    let (a, b) = (Word36::new(a), Word36::new(b));
    for w in [
        Word36::new(wide),
        a & b,
        a | b,
        a ^ b,
        !a,
        a | wide,
        a ^ wide,
        a.with_h1(wide as u32),
        a.with_q3(wide as u16),
        a.with_s2(wide as u8),
    ] {
        assert_eq!(w.w() & !Word36::MASK, 0);
    }
}

#[proptest]
fn sign_bit_matches_is_negative(#[strategy(0u64..=Word36::MASK)] raw: u64) {
    let w = Word36::new(raw);
    assert_eq!(w.is_negative(), (raw >> 35) & 1 == 1);
}
