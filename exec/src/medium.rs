//! The device which holds the directory's control records.
//!
//! The MFD reads and writes whole sectors.  Sectors are stored in the
//! packed byte format, two words to nine bytes, so each 28-word
//! sector occupies 126 bytes.
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{event, Level};

use base::buffer::packed_len;
use base::prelude::*;

use super::error::MediumError;
use super::records::{Sector, SECTOR_WORDS};

/// The size of one sector in the packed byte format.
pub const SECTOR_BYTES: usize = packed_len(SECTOR_WORDS);

pub trait DirectoryMedium: Send {
    fn sector_count(&self) -> u64;

    /// Read one sector.
    fn read_sector(&mut self, sector: u64) -> Result<Sector, MediumError>;

    /// Write one sector.
    fn write_sector(&mut self, sector: u64, content: &Sector) -> Result<(), MediumError>;
}

#[derive(Debug)]
struct MemoryMediumState {
    bytes: Vec<u8>,
    fail_writes: bool,
    writes: u64,
}

/// A directory medium held in memory as a packed byte image.
///
/// Clones share the same image, so a caller can keep a handle on a
/// medium it has given to a directory.  Writes can be made to fail,
/// which is how medium errors are exercised.
#[derive(Debug, Clone)]
pub struct MemoryMedium {
    state: Arc<Mutex<MemoryMediumState>>,
}

impl MemoryMedium {
    /// A medium of `sector_count` free sectors.
    #[must_use]
    pub fn new(sector_count: u64) -> MemoryMedium {
        let len = usize::try_from(sector_count)
            .ok()
            .and_then(|n| n.checked_mul(SECTOR_BYTES))
            .unwrap_or(0);
        MemoryMedium::with_bytes(vec![0; len])
    }

    fn with_bytes(bytes: Vec<u8>) -> MemoryMedium {
        MemoryMedium {
            state: Arc::new(Mutex::new(MemoryMediumState {
                bytes,
                fail_writes: false,
                writes: 0,
            })),
        }
    }

    /// Use a previously saved image.
    ///
    /// # Errors
    ///
    /// Fails unless the image is a whole number of sectors.
    pub fn from_image(bytes: Vec<u8>) -> Result<MemoryMedium, MediumError> {
        if bytes.len() % SECTOR_BYTES != 0 {
            return Err(MediumError::Packing(PackingError::NotWholeBlocks(
                bytes.len(),
            )));
        }
        Ok(MemoryMedium::with_bytes(bytes))
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MemoryMediumState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn to_image(&self) -> Vec<u8> {
        self.state().bytes.clone()
    }

    /// Make subsequent writes fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        self.state().fail_writes = fail;
    }

    /// The number of sectors successfully written so far.
    #[must_use]
    pub fn write_count(&self) -> u64 {
        self.state().writes
    }

    fn offset(state: &MemoryMediumState, sector: u64) -> Result<usize, MediumError> {
        let sector_count = (state.bytes.len() / SECTOR_BYTES) as u64;
        if sector >= sector_count {
            return Err(MediumError::NoSuchSector {
                sector,
                sector_count,
            });
        }
        usize::try_from(sector)
            .map(|n| n * SECTOR_BYTES)
            .map_err(|_| MediumError::NoSuchSector {
                sector,
                sector_count,
            })
    }
}

impl DirectoryMedium for MemoryMedium {
    fn sector_count(&self) -> u64 {
        (self.state().bytes.len() / SECTOR_BYTES) as u64
    }

    fn read_sector(&mut self, sector: u64) -> Result<Sector, MediumError> {
        let state = self.state();
        let offset = MemoryMedium::offset(&state, sector)?;
        let mut buffer = Word36Buffer::new(SECTOR_WORDS);
        buffer.unpack_from(&state.bytes, offset, SECTOR_WORDS, 0)?;
        Sector::try_from(buffer.into_inner()).map_err(|_| MediumError::ReadFailed { sector })
    }

    fn write_sector(&mut self, sector: u64, content: &Sector) -> Result<(), MediumError> {
        let mut state = self.state();
        let offset = MemoryMedium::offset(&state, sector)?;
        if state.fail_writes {
            event!(Level::WARN, "injected failure writing sector {sector}");
            return Err(MediumError::WriteFailed { sector });
        }
        let buffer = Word36Buffer::from(&content[..]);
        buffer.pack_into(0, SECTOR_WORDS, &mut state.bytes, offset)?;
        state.writes += 1;
        Ok(())
    }
}
