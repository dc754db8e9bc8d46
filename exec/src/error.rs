//! Failures reported by the Master File Directory.
use std::error;
use std::fmt::{self, Display, Formatter};

use base::prelude::PackingError;

/// The category of an MFD failure.  Callers branch on this; the
/// accompanying detail text is for people.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MfdErrorKind {
    NotFound,
    AlreadyExists,
    WrongKey,
    QuotaExceeded,
    RangeExceeded,
    NotAssigned,
    WrongFileType,
    /// The operation's deadline expired before it made any change.
    Aborted,
    MediumIo,
    Guarded,
    /// Malformed names, keys, cycle specifiers or counts.
    InvalidRequest,
}

impl Display for MfdErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        f.write_str(match self {
            MfdErrorKind::NotFound => "not found",
            MfdErrorKind::AlreadyExists => "already exists",
            MfdErrorKind::WrongKey => "wrong key",
            MfdErrorKind::QuotaExceeded => "quota exceeded",
            MfdErrorKind::RangeExceeded => "range exceeded",
            MfdErrorKind::NotAssigned => "not assigned",
            MfdErrorKind::WrongFileType => "wrong file type",
            MfdErrorKind::Aborted => "aborted",
            MfdErrorKind::MediumIo => "directory medium I/O error",
            MfdErrorKind::Guarded => "file is guarded",
            MfdErrorKind::InvalidRequest => "invalid request",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MfdError {
    pub kind: MfdErrorKind,
    pub detail: String,
}

impl MfdError {
    pub fn new<S: Into<String>>(kind: MfdErrorKind, detail: S) -> MfdError {
        MfdError {
            kind,
            detail: detail.into(),
        }
    }
}

impl Display for MfdError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "{}: {}", self.kind, self.detail)
    }
}

impl error::Error for MfdError {}

pub type MfdResult<T> = Result<T, MfdError>;

/// A failure of the directory medium itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediumError {
    NoSuchSector { sector: u64, sector_count: u64 },
    ReadFailed { sector: u64 },
    WriteFailed { sector: u64 },
    Packing(PackingError),
}

impl Display for MediumError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            MediumError::NoSuchSector {
                sector,
                sector_count,
            } => {
                write!(
                    f,
                    "sector {sector} does not exist (the medium has {sector_count} sectors)"
                )
            }
            MediumError::ReadFailed { sector } => write!(f, "failed to read sector {sector}"),
            MediumError::WriteFailed { sector } => write!(f, "failed to write sector {sector}"),
            MediumError::Packing(e) => write!(f, "sector packing failed: {e}"),
        }
    }
}

impl error::Error for MediumError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            MediumError::Packing(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PackingError> for MediumError {
    fn from(e: PackingError) -> MediumError {
        MediumError::Packing(e)
    }
}

impl From<MediumError> for MfdError {
    fn from(e: MediumError) -> MfdError {
        MfdError::new(MfdErrorKind::MediumIo, e.to_string())
    }
}

#[test]
fn test_medium_error_becomes_medium_io() {
    let e: MfdError = MediumError::WriteFailed { sector: 7 }.into();
    assert_eq!(e.kind, MfdErrorKind::MediumIo);
    assert_eq!(e.to_string(), "directory medium I/O error: failed to write sector 7");
}
