//! Rebuilding a directory from the records on its medium.
//!
//! Recovery happens after the executive stops, cleanly or not.  No
//! run survives a stop, so every assignment recorded on the medium is
//! stale: assignment counts are cleared, and a cycle which was
//! assigned and had been written is marked as such so that its
//! contents are not trusted blindly.  Cycles which were still being
//! cataloged, or were waiting to be dropped, are dropped.
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use tracing::{event, span, Level};

use super::super::catalog::{BackupInfo, FileIdentifier, LeadItem, MainItem};
use super::super::config::MfdConfiguration;
use super::super::cycle::CycleState;
use super::super::error::{MfdError, MfdErrorKind, MfdResult};
use super::super::medium::DirectoryMedium;
use super::super::pack::{Extent, TrackRegion};
use super::super::records::{extract, CycleKey, Record};
use super::journal::{Batch, Persistence};
use super::{LeadItemHandle, LeadNode, MainItemHandle, MasterFileDirectory};

fn corrupt<S: Into<String>>(detail: S) -> MfdError {
    MfdError::new(MfdErrorKind::MediumIo, detail)
}

#[derive(Default)]
struct Scan {
    leads: BTreeMap<(String, String), (LeadItem, u64)>,
    mains: BTreeMap<CycleKey, (MainItem, u64)>,
    backups: HashMap<CycleKey, (BackupInfo, u64)>,
    allocations: HashMap<CycleKey, BTreeMap<u8, (Vec<Extent>, u64)>>,
    in_use: Vec<bool>,
}

impl Scan {
    fn read(medium: &mut dyn DirectoryMedium) -> MfdResult<Scan> {
        let sector_count = medium.sector_count();
        let mut scan = Scan {
            in_use: vec![false; usize::try_from(sector_count).unwrap_or(0)],
            ..Scan::default()
        };
        for sector in 0..sector_count {
            let content = medium.read_sector(sector)?;
            let Some(record) = extract(&content)? else {
                continue;
            };
            if let Some(used) = usize::try_from(sector)
                .ok()
                .and_then(|i| scan.in_use.get_mut(i))
            {
                *used = true;
            }
            let duplicate = match record {
                Record::Lead(lead) => {
                    let name = (lead.qualifier.clone(), lead.filename.clone());
                    scan.leads.insert(name, (lead, sector)).is_some()
                }
                Record::Main(main) => {
                    let key = CycleKey {
                        qualifier: main.qualifier.clone(),
                        filename: main.filename.clone(),
                        absolute_cycle: main.absolute_cycle,
                    };
                    scan.mains.insert(key, (*main, sector)).is_some()
                }
                Record::Backup { key, backup } => {
                    scan.backups.insert(key, (backup, sector)).is_some()
                }
                Record::Allocation {
                    key,
                    sequence,
                    extents,
                } => scan
                    .allocations
                    .entry(key)
                    .or_default()
                    .insert(sequence, (extents, sector))
                    .is_some(),
            };
            if duplicate {
                return Err(corrupt(format!("sector {sector} duplicates another record")));
            }
        }
        Ok(scan)
    }
}

impl MasterFileDirectory {
    /// Rebuild a directory from the records on `medium`.
    ///
    /// # Errors
    ///
    /// Fails with `MediumIo` if the medium cannot be read or
    /// rewritten, or if its records are inconsistent: a main item
    /// without its lead item or backup sector, allocation sectors
    /// without a main item, or two cycles claiming the same tracks.
    pub fn recover(
        config: MfdConfiguration,
        mut medium: Box<dyn DirectoryMedium>,
    ) -> MfdResult<MasterFileDirectory> {
        let span = span!(Level::INFO, "recover");
        let _enter = span.enter();
        let mut scan = Scan::read(medium.as_mut())?;
        event!(
            Level::DEBUG,
            "found {} file sets and {} file cycles",
            scan.leads.len(),
            scan.mains.len()
        );

        let mut mfd = MasterFileDirectory::new(config);
        let in_use = std::mem::take(&mut scan.in_use);
        let persistence = Persistence::new(medium, in_use);
        let mut batch = Batch::default();

        // Attach each main item's backup sector and allocation table.
        let mut grouped: BTreeMap<(String, String), Vec<MainItem>> = BTreeMap::new();
        for (key, (mut main, sector)) in std::mem::take(&mut scan.mains) {
            let (backup, backup_sector) = scan.backups.remove(&key).ok_or_else(|| {
                corrupt(format!(
                    "{}*{}({}) has no backup sector",
                    key.qualifier, key.filename, key.absolute_cycle
                ))
            })?;
            main.backup = backup;
            main.record_sectors = vec![sector, backup_sector];
            for (extents, allocation_sector) in
                scan.allocations.remove(&key).unwrap_or_default().into_values()
            {
                main.record_sectors.push(allocation_sector);
                for extent in extents {
                    main.allocations.insert(
                        extent.file_track,
                        TrackRegion::new(extent.pack_track, extent.count),
                    );
                }
            }
            if !scan
                .leads
                .contains_key(&(key.qualifier.clone(), key.filename.clone()))
            {
                return Err(corrupt(format!(
                    "{}*{}({}) has no lead item",
                    key.qualifier, key.filename, key.absolute_cycle
                )));
            }
            grouped
                .entry((key.qualifier, key.filename))
                .or_default()
                .push(main);
        }
        if let Some(key) = scan.allocations.keys().next() {
            return Err(corrupt(format!(
                "allocation sectors for {}*{}({}) belong to no cycle",
                key.qualifier, key.filename, key.absolute_cycle
            )));
        }
        for (backup, sector) in scan.backups.into_values() {
            event!(
                Level::WARN,
                "sector {sector} holds backup information for no cycle ({} reels), discarding it",
                backup.reels.iter().filter(|reel| !reel.is_empty()).count()
            );
            persistence.stage_free(&mut batch, &[sector]);
        }

        let mut nodes = Vec::new();
        let mut index = super::Index::default();
        for (name, (lead, lead_sector)) in scan.leads {
            let handle = LeadItemHandle(index.leads.len());
            let mut node = LeadNode::new(handle, lead);
            node.lead_sector = Some(lead_sector);
            for mut main in grouped.remove(&name).unwrap_or_default() {
                if main.state != CycleState::Live {
                    event!(
                        Level::WARN,
                        "{}({}) was {} when the directory stopped, dropping it",
                        node.name(),
                        main.absolute_cycle,
                        main.state
                    );
                    persistence.stage_free(&mut batch, &main.record_sectors);
                    continue;
                }
                {
                    let mut pack = super::lock(&mfd.pack);
                    for region in main.allocations.extents().map(|extent| {
                        TrackRegion::new(extent.pack_track, extent.count)
                    }) {
                        if !pack.allocate_specific(region) {
                            return Err(corrupt(format!(
                                "{}({}) claims pack tracks {region} which are not free",
                                node.name(),
                                main.absolute_cycle
                            )));
                        }
                    }
                }
                if main.assigned_indicator != 0 {
                    if main.file_flags.written {
                        main.disable_flags.assigned_written_at_stop = true;
                    }
                    event!(
                        Level::WARN,
                        "{}({}) was assigned {} times when the directory stopped",
                        node.name(),
                        main.absolute_cycle,
                        main.assigned_indicator
                    );
                    main.assigned_indicator = 0;
                }
                let file = index.allocate_file_id();
                main.file_id = file;
                index.files.insert(
                    file,
                    MainItemHandle {
                        lead: handle,
                        slot: node.mains.len(),
                    },
                );
                node.mains.push(Some(main));
            }
            if node.present().next().is_none() {
                event!(Level::WARN, "{} has no cycles, removing it", node.name());
                persistence.stage_free(&mut batch, &[lead_sector]);
                continue;
            }
            node.refresh_plus_one();
            index.by_name.insert(name, handle);
            let node = Arc::new(Mutex::new(node));
            index.leads.push(Some(Arc::clone(&node)));
            nodes.push(node);
        }

        mfd.persistence = Some(persistence);
        for node in &nodes {
            mfd.stage_lead(&mut super::lock(node), &mut batch);
        }
        *super::write(&mfd.index) = index;
        if let Some(persistence) = &mfd.persistence {
            if let Some((_, e)) = persistence.flush(&mut batch).into_iter().next() {
                return Err(e.into());
            }
        }
        if let Some(e) = batch.errors.into_iter().next() {
            return Err(e);
        }
        event!(
            Level::INFO,
            "recovered {} file sets, {} tracks free",
            nodes.len(),
            mfd.free_tracks()
        );
        Ok(mfd)
    }

    /// The file identifiers of every cycle, lowest first.  Recovery
    /// numbers cycles afresh in (qualifier, filename, cycle) order.
    #[must_use]
    pub fn file_identifiers(&self) -> Vec<FileIdentifier> {
        let index = super::read(&self.index);
        let mut files: Vec<FileIdentifier> = index.files.keys().copied().collect();
        files.sort_unstable();
        files
    }
}
