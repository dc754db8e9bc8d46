//! F-cycle numbering.
//!
//! Absolute F-cycle numbers run from 1 to 999 and then wrap back to
//! 1.  A file set holds a window of cycles ending at its highest
//! absolute cycle; the "age" of a cycle is its distance below the
//! highest cycle, taking the wrap into account.
use std::fmt::{self, Display, Formatter};

use serde::Serialize;

use super::error::{MfdError, MfdErrorKind, MfdResult};

pub const MAX_ABSOLUTE_CYCLE: u32 = 999;

/// How a caller names a cycle of a file set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CycleSpecifier {
    /// An absolute F-cycle, 1..=999.
    Absolute(u32),
    /// 0 is the latest live cycle, -1 the one before that and so on.
    /// +1 is the cycle which is being created.
    Relative(i32),
    Unspecified,
}

impl CycleSpecifier {
    pub(crate) fn validate(self) -> MfdResult<CycleSpecifier> {
        match self {
            CycleSpecifier::Absolute(n) if !(1..=MAX_ABSOLUTE_CYCLE).contains(&n) => {
                Err(MfdError::new(
                    MfdErrorKind::InvalidRequest,
                    format!("absolute cycle {n} is outside 1..={MAX_ABSOLUTE_CYCLE}"),
                ))
            }
            CycleSpecifier::Relative(n) if n > 1 || n <= -(MAX_ABSOLUTE_CYCLE as i32) => {
                Err(MfdError::new(
                    MfdErrorKind::InvalidRequest,
                    format!("relative cycle {n:+} is not valid"),
                ))
            }
            spec => Ok(spec),
        }
    }
}

impl Display for CycleSpecifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            CycleSpecifier::Absolute(n) => write!(f, "({n})"),
            CycleSpecifier::Relative(n) => write!(f, "({n:+})"),
            CycleSpecifier::Unspecified => Ok(()),
        }
    }
}

/// The life cycle of one file cycle.
///
/// A cycle is created either `Cataloging` (it becomes `Live` when its
/// creator catalogs it) or directly `Live`.  Deleting a live cycle
/// which someone still has assigned makes it `Dropping`; it becomes
/// `Dropped`, and disappears from the directory, when the last
/// assignment is released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CycleState {
    Cataloging,
    Live,
    Dropping,
    Dropped,
}

impl CycleState {
    /// Whether the cycle counts towards the F-cycle count of its
    /// file set.
    #[must_use]
    pub fn is_counted(self) -> bool {
        matches!(self, CycleState::Live | CycleState::Dropping)
    }

    pub(crate) fn code(self) -> u8 {
        match self {
            CycleState::Cataloging => 0,
            CycleState::Live => 1,
            CycleState::Dropping => 2,
            CycleState::Dropped => 3,
        }
    }

    pub(crate) fn from_code(code: u8) -> Option<CycleState> {
        match code {
            0 => Some(CycleState::Cataloging),
            1 => Some(CycleState::Live),
            2 => Some(CycleState::Dropping),
            3 => Some(CycleState::Dropped),
            _ => None,
        }
    }
}

impl Display for CycleState {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        f.write_str(match self {
            CycleState::Cataloging => "cataloging",
            CycleState::Live => "live",
            CycleState::Dropping => "dropping",
            CycleState::Dropped => "dropped",
        })
    }
}

/// The cycle after `cycle`, wrapping from 999 to 1.
#[must_use]
pub fn next_cycle(cycle: u32) -> u32 {
    if cycle >= MAX_ABSOLUTE_CYCLE {
        1
    } else {
        cycle + 1
    }
}

/// How far `cycle` lies below `highest`: 0 for `highest` itself.
#[must_use]
pub fn cycle_age(highest: u32, cycle: u32) -> u32 {
    (highest + MAX_ABSOLUTE_CYCLE - cycle) % MAX_ABSOLUTE_CYCLE
}

/// How far `cycle` lies above `highest`.
#[must_use]
pub fn cycle_advance(highest: u32, cycle: u32) -> u32 {
    (cycle + MAX_ABSOLUTE_CYCLE - highest) % MAX_ABSOLUTE_CYCLE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_cycle_wraps() {
        assert_eq!(next_cycle(1), 2);
        assert_eq!(next_cycle(998), 999);
        assert_eq!(next_cycle(999), 1);
    }

    #[test]
    fn test_age_and_advance() {
        assert_eq!(cycle_age(10, 10), 0);
        assert_eq!(cycle_age(10, 7), 3);
        assert_eq!(cycle_age(2, 998), 3);
        assert_eq!(cycle_advance(998, 2), 3);
        assert_eq!(cycle_advance(5, 6), 1);
    }

    #[test]
    fn test_validate() {
        assert!(CycleSpecifier::Absolute(0).validate().is_err());
        assert!(CycleSpecifier::Absolute(1000).validate().is_err());
        assert!(CycleSpecifier::Absolute(999).validate().is_ok());
        assert!(CycleSpecifier::Relative(2).validate().is_err());
        assert!(CycleSpecifier::Relative(1).validate().is_ok());
        assert!(CycleSpecifier::Relative(-31).validate().is_ok());
        assert!(CycleSpecifier::Unspecified.validate().is_ok());
    }

    #[test]
    fn test_state_codes() {
        for state in [
            CycleState::Cataloging,
            CycleState::Live,
            CycleState::Dropping,
            CycleState::Dropped,
        ] {
            assert_eq!(CycleState::from_code(state.code()), Some(state));
        }
        assert_eq!(CycleState::from_code(7), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(CycleSpecifier::Absolute(12).to_string(), "(12)");
        assert_eq!(CycleSpecifier::Relative(-1).to_string(), "(-1)");
        assert_eq!(CycleSpecifier::Relative(1).to_string(), "(+1)");
        assert_eq!(CycleSpecifier::Unspecified.to_string(), "");
    }
}
