//! The layout of MFD control records on the directory medium.
//!
//! Every record occupies one 28-word sector.  S1 of word 0 says what
//! kind of record the sector holds; an all-zero sector is free.
//!
//! | Record       | Sectors | Contents |
//! |--------------|---------|----------|
//! | lead item    | 1       | identity, keys, file type, lead flags, cycle window |
//! | main item 0  | 1       | identity, flags, counters, timestamps, granules |
//! | main item 1  | 1       | backup information and reel numbers |
//! | allocation   | 0 or more | up to seven extents of the cycle's allocation table |
//!
//! Names are stored as Fieldata, twelve characters in two words;
//! keys and reel numbers take one word.  Times are seconds since the
//! Unix epoch.  Main item and allocation sectors repeat the
//! qualifier, filename and absolute cycle so that every sector can be
//! attributed to its cycle without following links.
use base::charset::{fieldata_string, fieldata_words};
use base::prelude::*;
use base::subword::{join_sixths, sixths};

use super::catalog::{AccessType, BackupInfo, DirectoryIndex, FileType, LeadItem, MainItem};
use super::cycle::CycleState;
use super::error::{MfdError, MfdErrorKind, MfdResult};
use super::flags::{DescriptorFlags, DisableFlags, FileFlags, InhibitFlags, PcharFlags};
use super::pack::Extent;

pub const SECTOR_WORDS: usize = 28;

pub type Sector = [Word36; SECTOR_WORDS];

pub(crate) const EXTENTS_PER_SECTOR: usize = 7;

const FREE: u8 = 0;
const LEAD: u8 = 0o01;
const MAIN_IDENTITY: u8 = 0o02;
const MAIN_BACKUP: u8 = 0o03;
const ALLOCATION: u8 = 0o04;

const LEAD_GUARDED: u8 = 0o40;
const LEAD_PLUS_ONE: u8 = 0o20;
const LEAD_RENAME: u8 = 0o10;
const LEAD_SHARED: u8 = 0o04;
const LEAD_PRIVATE: u8 = 0o02;

/// Identifies the cycle an item or allocation sector belongs to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct CycleKey {
    pub(crate) qualifier: String,
    pub(crate) filename: String,
    pub(crate) absolute_cycle: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Record {
    Lead(LeadItem),
    /// A main item as far as its first sector describes it.
    Main(Box<MainItem>),
    Backup {
        key: CycleKey,
        backup: BackupInfo,
    },
    Allocation {
        key: CycleKey,
        sequence: u8,
        extents: Vec<Extent>,
    },
}

fn malformed(detail: String) -> MfdError {
    MfdError::new(MfdErrorKind::MediumIo, format!("malformed record: {detail}"))
}

fn put_text(sector: &mut Sector, at: usize, words: usize, text: &str) {
    for (i, w) in fieldata_words(text, words).into_iter().enumerate() {
        sector[at + i] = w;
    }
}

fn get_text(sector: &Sector, at: usize, words: usize) -> String {
    fieldata_string(&sector[at..at + words])
}

fn header(kind: u8, absolute_cycle: u32) -> Word36 {
    Word36::ZERO.with_s1(kind).with_h2(absolute_cycle)
}

fn put_identity(sector: &mut Sector, qualifier: &str, filename: &str) {
    put_text(sector, 1, 2, qualifier);
    put_text(sector, 3, 2, filename);
}

fn get_key(sector: &Sector) -> CycleKey {
    CycleKey {
        qualifier: get_text(sector, 1, 2),
        filename: get_text(sector, 3, 2),
        absolute_cycle: sector[0].h2(),
    }
}

fn word(value: u64) -> Word36 {
    Word36::new(value)
}

pub(crate) fn compose_lead(lead: &LeadItem, current_range: u32, cycle_count: u32) -> Sector {
    let mut sector: Sector = [Word36::ZERO; SECTOR_WORDS];
    sector[0] = header(LEAD, 0);
    put_identity(&mut sector, &lead.qualifier, &lead.filename);
    put_text(&mut sector, 5, 2, &lead.project_id);
    put_text(&mut sector, 7, 1, &lead.read_key);
    put_text(&mut sector, 8, 1, &lead.write_key);

    let mut flags: u8 = 0;
    for (set, bit) in [
        (lead.guarded, LEAD_GUARDED),
        (lead.plus_one_exists, LEAD_PLUS_ONE),
        (lead.rename_in_progress, LEAD_RENAME),
        (lead.directory == DirectoryIndex::Shared, LEAD_SHARED),
        (lead.access == AccessType::Private, LEAD_PRIVATE),
    ] {
        if set {
            flags |= bit;
        }
    }
    sector[9] = Word36::ZERO
        .with_s1(lead.file_type.code())
        .with_s2(flags)
        .with_h2(lead.max_range);
    sector[10] = join_halves(lead.highest_absolute, current_range);
    sector[11] = Word36::ZERO.with_h1(cycle_count);
    sector
}

fn extract_lead(sector: &Sector) -> MfdResult<LeadItem> {
    let file_type = FileType::from_code(sector[9].s1())
        .ok_or_else(|| malformed(format!("lead item file type {:o}", sector[9].s1())))?;
    let flags = sector[9].s2();
    let mut lead = LeadItem::new(
        get_text(sector, 1, 2),
        get_text(sector, 3, 2),
        get_text(sector, 5, 2),
        file_type,
        sector[9].h2(),
    );
    lead.read_key = get_text(sector, 7, 1);
    lead.write_key = get_text(sector, 8, 1);
    lead.guarded = flags & LEAD_GUARDED != 0;
    lead.plus_one_exists = flags & LEAD_PLUS_ONE != 0;
    lead.rename_in_progress = flags & LEAD_RENAME != 0;
    lead.directory = if flags & LEAD_SHARED != 0 {
        DirectoryIndex::Shared
    } else {
        DirectoryIndex::Local
    };
    lead.access = if flags & LEAD_PRIVATE != 0 {
        AccessType::Private
    } else {
        AccessType::Public
    };
    lead.highest_absolute = sector[10].h1();
    Ok(lead)
}

pub(crate) fn compose_main(main: &MainItem) -> [Sector; 2] {
    let mut identity: Sector = [Word36::ZERO; SECTOR_WORDS];
    identity[0] = header(MAIN_IDENTITY, main.absolute_cycle);
    put_identity(&mut identity, &main.qualifier, &main.filename);
    put_text(&mut identity, 5, 2, &main.project_id);
    put_text(&mut identity, 7, 2, &main.account_id);
    identity[9] = join_sixths([
        main.file_type.code(),
        main.pchar_flags.compose() as u8,
        main.disable_flags.compose() as u8,
        main.inhibit_flags.compose() as u8,
        main.file_flags.compose() as u8,
        0,
    ]);
    identity[10] = Word36::ZERO
        .with_h1(main.descriptor_flags.compose() as u32)
        .with_h2((main.placement & 0o777_777) as u32);
    identity[11] = Word36::from_fieldata_str(&main.assign_mnemonic);
    identity[12] = Word36::ZERO.with_h1(main.assigned_indicator);
    identity[13] = word(main.cumulative_assign_count);
    identity[14] = word(main.time_of_first_write);
    identity[15] = word(main.last_reference);
    identity[16] = word(main.catalog_time);
    identity[17] = word(main.initial_granules);
    identity[18] = word(main.max_granules);
    identity[19] = word(main.highest_granule_assigned);
    identity[20] = word(main.highest_track_written);

    let mut backup: Sector = [Word36::ZERO; SECTOR_WORDS];
    backup[0] = header(MAIN_BACKUP, main.absolute_cycle);
    put_identity(&mut backup, &main.qualifier, &main.filename);
    backup[5] = word(main.backup.creation_time);
    backup[6] = Word36::ZERO
        .with_s1(main.backup.max_levels)
        .with_s2(main.backup.current_levels);
    backup[7] = word(main.backup.text_block_count);
    backup[8] = word(main.backup.starting_position);
    backup[9] = Word36::from_fieldata_str(&main.backup.reels[0]);
    backup[10] = Word36::from_fieldata_str(&main.backup.reels[1]);
    [identity, backup]
}

fn extract_main(sector: &Sector) -> MfdResult<MainItem> {
    let fields = sixths(sector[9]);
    let file_type = FileType::from_code(fields[0])
        .ok_or_else(|| malformed(format!("main item file type {:o}", fields[0])))?;
    let key = get_key(sector);
    let descriptor_flags = DescriptorFlags::extract(u64::from(sector[10].h1()));
    let state = if descriptor_flags.to_be_cataloged {
        CycleState::Cataloging
    } else if descriptor_flags.to_be_dropped {
        CycleState::Dropping
    } else {
        CycleState::Live
    };
    let mut lead = LeadItem::new(
        key.qualifier,
        key.filename,
        get_text(sector, 5, 2),
        file_type,
        0,
    );
    lead.access = AccessType::Public;
    let mut main = MainItem::new(&lead, key.absolute_cycle, state);
    main.account_id = get_text(sector, 7, 2);
    main.pchar_flags = PcharFlags::extract(u64::from(fields[1]));
    main.disable_flags = DisableFlags::extract(u64::from(fields[2]));
    main.inhibit_flags = InhibitFlags::extract(u64::from(fields[3]));
    main.file_flags = FileFlags::extract(u64::from(fields[4]));
    main.descriptor_flags = descriptor_flags;
    main.placement = u64::from(sector[10].h2());
    main.assign_mnemonic = get_text(sector, 11, 1);
    main.assigned_indicator = sector[12].h1();
    main.cumulative_assign_count = sector[13].w();
    main.time_of_first_write = sector[14].w();
    main.last_reference = sector[15].w();
    main.catalog_time = sector[16].w();
    main.initial_granules = sector[17].w();
    main.max_granules = sector[18].w();
    main.highest_granule_assigned = sector[19].w();
    main.highest_track_written = sector[20].w();
    Ok(main)
}

fn extract_backup(sector: &Sector) -> BackupInfo {
    BackupInfo {
        creation_time: sector[5].w(),
        max_levels: sector[6].s1(),
        current_levels: sector[6].s2(),
        text_block_count: sector[7].w(),
        starting_position: sector[8].w(),
        reels: [get_text(sector, 9, 1), get_text(sector, 10, 1)],
    }
}

/// Lay out the allocation table of a main item, seven extents to a
/// sector.  A cycle with no allocated tracks needs no sectors.
pub(crate) fn compose_allocations(main: &MainItem) -> Vec<Sector> {
    let extents: Vec<Extent> = main.allocations.extents().collect();
    extents
        .chunks(EXTENTS_PER_SECTOR)
        .enumerate()
        .map(|(sequence, chunk)| {
            let mut sector: Sector = [Word36::ZERO; SECTOR_WORDS];
            sector[0] = header(ALLOCATION, main.absolute_cycle).with_s2(sequence as u8);
            put_identity(&mut sector, &main.qualifier, &main.filename);
            sector[5] = Word36::ZERO.with_h1(chunk.len() as u32);
            for (i, extent) in chunk.iter().enumerate() {
                sector[6 + 3 * i] = word(extent.file_track);
                sector[7 + 3 * i] = word(extent.pack_track);
                sector[8 + 3 * i] = word(extent.count);
            }
            sector
        })
        .collect()
}

fn extract_allocations(sector: &Sector) -> MfdResult<Vec<Extent>> {
    let count = sector[5].h1() as usize;
    if count > EXTENTS_PER_SECTOR {
        return Err(malformed(format!("allocation sector holds {count} extents")));
    }
    Ok((0..count)
        .map(|i| Extent {
            file_track: sector[6 + 3 * i].w(),
            pack_track: sector[7 + 3 * i].w(),
            count: sector[8 + 3 * i].w(),
        })
        .collect())
}

/// The number of allocation sectors a main item needs.
pub(crate) fn allocation_sectors_needed(main: &MainItem) -> usize {
    main.allocations.extents().count().div_ceil(EXTENTS_PER_SECTOR)
}

/// Decode a sector.  Returns `None` for a free sector.
pub(crate) fn extract(sector: &Sector) -> MfdResult<Option<Record>> {
    match sector[0].s1() {
        FREE => Ok(None),
        LEAD => extract_lead(sector).map(|lead| Some(Record::Lead(lead))),
        MAIN_IDENTITY => extract_main(sector).map(|main| Some(Record::Main(Box::new(main)))),
        MAIN_BACKUP => Ok(Some(Record::Backup {
            key: get_key(sector),
            backup: extract_backup(sector),
        })),
        ALLOCATION => Ok(Some(Record::Allocation {
            key: get_key(sector),
            sequence: sector[0].s2(),
            extents: extract_allocations(sector)?,
        })),
        other => Err(malformed(format!("unknown record type {other:o}"))),
    }
}
