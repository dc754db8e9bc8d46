//! Staging and flushing of directory record writes.
//!
//! An operation stages the sectors it wants written while it holds
//! the lock on its lead item, and flushes them after releasing that
//! lock.  Every staged write carries a sequence number taken under
//! the lead item lock, and a flush never replaces a sector with an
//! older image than the one already written, so two operations on
//! the same file set may flush in either order.
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tracing::{event, Level};

use base::prelude::*;

use super::super::catalog::FileIdentifier;
use super::super::error::{MediumError, MfdError};
use super::super::medium::DirectoryMedium;
use super::super::records::{Sector, SECTOR_WORDS};
use super::{lock, LeadItemHandle};

const FREE_SECTOR: Sector = [Word36::ZERO; SECTOR_WORDS];

#[derive(Debug)]
pub(super) struct PendingWrite {
    sequence: u64,
    sector: u64,
    content: Sector,
    /// The cycle whose record this is, or `None` for a lead item.
    file: Option<FileIdentifier>,
}

/// The side effects of one operation which are carried out after
/// the lead item lock has been released.
#[derive(Debug, Default)]
pub(super) struct Batch {
    pub(super) writes: Vec<PendingWrite>,
    /// Sectors to return to the free pool once they have been
    /// cleared on the medium.
    pub(super) freed: Vec<u64>,
    pub(super) errors: Vec<MfdError>,
    pub(super) dropped_files: Vec<FileIdentifier>,
    pub(super) removed_lead: Option<(LeadItemHandle, (String, String))>,
}

#[derive(Debug)]
struct SectorAllocator {
    in_use: Vec<bool>,
}

impl SectorAllocator {
    fn allocate(&mut self) -> Option<u64> {
        let index = self.in_use.iter().position(|used| !used)?;
        self.in_use[index] = true;
        Some(index as u64)
    }

    fn free(&mut self, sector: u64) {
        if let Some(slot) = usize::try_from(sector)
            .ok()
            .and_then(|i| self.in_use.get_mut(i))
        {
            *slot = false;
        }
    }
}

struct Journal {
    medium: Box<dyn DirectoryMedium>,
    last_written: HashMap<u64, u64>,
}

pub(super) struct Persistence {
    sectors: Mutex<SectorAllocator>,
    journal: Mutex<Journal>,
    sequence: AtomicU64,
}

/// A write that failed, and the cycle it was for.
pub(super) type WriteFailure = (Option<FileIdentifier>, MediumError);

impl Persistence {
    /// `in_use` marks the sectors which already hold records.
    pub(super) fn new(medium: Box<dyn DirectoryMedium>, in_use: Vec<bool>) -> Persistence {
        Persistence {
            sectors: Mutex::new(SectorAllocator { in_use }),
            journal: Mutex::new(Journal {
                medium,
                last_written: HashMap::new(),
            }),
            sequence: AtomicU64::new(1),
        }
    }

    pub(super) fn allocate_sector(&self) -> Option<u64> {
        let sector = lock(&self.sectors).allocate();
        if sector.is_none() {
            event!(Level::ERROR, "the directory medium is full");
        }
        sector
    }

    pub(super) fn stage(
        &self,
        batch: &mut Batch,
        sector: u64,
        content: Sector,
        file: Option<FileIdentifier>,
    ) {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        batch.writes.push(PendingWrite {
            sequence,
            sector,
            content,
            file,
        });
    }

    pub(super) fn stage_free(&self, batch: &mut Batch, sectors: &[u64]) {
        for sector in sectors {
            self.stage(batch, *sector, FREE_SECTOR, None);
            batch.freed.push(*sector);
        }
    }

    /// Write the staged sectors and release freed ones.  A freed
    /// sector which could not be cleared stays allocated, so that it
    /// is not reused while it still holds a stale record.
    pub(super) fn flush(&self, batch: &mut Batch) -> Vec<WriteFailure> {
        let mut failures = Vec::new();
        let mut uncleared = Vec::new();
        {
            let mut journal = lock(&self.journal);
            for write in batch.writes.drain(..) {
                if journal
                    .last_written
                    .get(&write.sector)
                    .is_some_and(|seq| *seq >= write.sequence)
                {
                    event!(
                        Level::TRACE,
                        "sector {} already has a newer image",
                        write.sector
                    );
                    continue;
                }
                match journal.medium.write_sector(write.sector, &write.content) {
                    Ok(()) => {
                        journal.last_written.insert(write.sector, write.sequence);
                    }
                    Err(e) => {
                        event!(Level::ERROR, "directory write failed: {e}");
                        uncleared.push(write.sector);
                        failures.push((write.file, e));
                    }
                }
            }
        }
        let mut sectors = lock(&self.sectors);
        for sector in batch.freed.drain(..) {
            if !uncleared.contains(&sector) {
                sectors.free(sector);
            }
        }
        failures
    }

    /// Write a sector immediately.  Used while a directory is being
    /// built, before any client can see it.
    pub(super) fn write_now(&self, sector: u64, content: &Sector) -> Result<(), MediumError> {
        lock(&self.journal).medium.write_sector(sector, content)
    }
}
