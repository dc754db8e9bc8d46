//! The items of the catalog: one lead item per file set and one main
//! item per file cycle.
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

use serde::Serialize;

use base::Word36;

use super::client::ClientIdentifier;
use super::cycle::CycleState;
use super::flags::{DescriptorFlags, DisableFlags, FileFlags, InhibitFlags, PcharFlags};
use super::pack::AllocationTable;

/// Names a file cycle for as long as it exists.  Identifiers are not
/// reused while the directory is running; they are reassigned when a
/// directory is recovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct FileIdentifier(pub u64);

impl Display for FileIdentifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "fid:{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FileType {
    MassStorage,
    Tape,
    Remote,
}

impl FileType {
    pub(crate) fn code(self) -> u8 {
        match self {
            FileType::MassStorage => 0,
            FileType::Tape => 1,
            FileType::Remote => 2,
        }
    }

    pub(crate) fn from_code(code: u8) -> Option<FileType> {
        match code {
            0 => Some(FileType::MassStorage),
            1 => Some(FileType::Tape),
            2 => Some(FileType::Remote),
            _ => None,
        }
    }
}

impl Display for FileType {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        f.write_str(match self {
            FileType::MassStorage => "mass storage",
            FileType::Tape => "tape",
            FileType::Remote => "remote",
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum DirectoryIndex {
    #[default]
    Local,
    Shared,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum AccessType {
    Public,
    #[default]
    Private,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LeadItem {
    pub(crate) qualifier: String,
    pub(crate) filename: String,
    pub(crate) project_id: String,
    pub(crate) read_key: String,
    pub(crate) write_key: String,
    pub(crate) file_type: FileType,
    pub(crate) max_range: u32,
    /// Zero until the first cycle is created.
    pub(crate) highest_absolute: u32,
    pub(crate) guarded: bool,
    pub(crate) plus_one_exists: bool,
    pub(crate) rename_in_progress: bool,
    pub(crate) directory: DirectoryIndex,
    pub(crate) access: AccessType,
}

impl LeadItem {
    pub(crate) fn new(
        qualifier: String,
        filename: String,
        project_id: String,
        file_type: FileType,
        max_range: u32,
    ) -> LeadItem {
        LeadItem {
            qualifier,
            filename,
            project_id,
            read_key: String::new(),
            write_key: String::new(),
            file_type,
            max_range,
            highest_absolute: 0,
            guarded: false,
            plus_one_exists: false,
            rename_in_progress: false,
            directory: DirectoryIndex::Local,
            access: AccessType::Private,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BackupInfo {
    pub creation_time: u64,
    pub max_levels: u8,
    pub current_levels: u8,
    pub text_block_count: u64,
    pub starting_position: u64,
    pub reels: [String; 2],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MainItem {
    pub(crate) file_id: FileIdentifier,
    pub(crate) absolute_cycle: u32,
    pub(crate) state: CycleState,
    pub(crate) file_type: FileType,
    pub(crate) qualifier: String,
    pub(crate) filename: String,
    pub(crate) project_id: String,
    pub(crate) account_id: String,
    /// The run which created a cycle that is still being cataloged.
    pub(crate) creator: Option<ClientIdentifier>,
    pub(crate) time_of_first_write: u64,
    pub(crate) disable_flags: DisableFlags,
    pub(crate) descriptor_flags: DescriptorFlags,
    pub(crate) file_flags: FileFlags,
    pub(crate) pchar_flags: PcharFlags,
    pub(crate) inhibit_flags: InhibitFlags,
    pub(crate) assign_mnemonic: String,
    pub(crate) cumulative_assign_count: u64,
    pub(crate) assignments: BTreeMap<ClientIdentifier, u32>,
    pub(crate) assigned_indicator: u32,
    pub(crate) last_reference: u64,
    pub(crate) catalog_time: u64,
    pub(crate) initial_granules: u64,
    pub(crate) max_granules: u64,
    pub(crate) highest_granule_assigned: u64,
    /// One past the highest file-relative track written.
    pub(crate) highest_track_written: u64,
    pub(crate) placement: u64,
    pub(crate) backup: BackupInfo,
    pub(crate) allocations: AllocationTable,
    /// Directory sectors holding this item: two main item sectors
    /// followed by any allocation sectors.
    pub(crate) record_sectors: Vec<u64>,
}

impl MainItem {
    pub(crate) fn new(lead: &LeadItem, absolute_cycle: u32, state: CycleState) -> MainItem {
        MainItem {
            file_id: FileIdentifier(0),
            absolute_cycle,
            state,
            file_type: lead.file_type,
            qualifier: lead.qualifier.clone(),
            filename: lead.filename.clone(),
            project_id: lead.project_id.clone(),
            account_id: String::new(),
            creator: None,
            time_of_first_write: 0,
            disable_flags: DisableFlags::default(),
            descriptor_flags: DescriptorFlags {
                tape: lead.file_type == FileType::Tape,
                to_be_cataloged: state == CycleState::Cataloging,
                to_be_dropped: state == CycleState::Dropping,
                ..DescriptorFlags::default()
            },
            file_flags: FileFlags::default(),
            pchar_flags: PcharFlags::default(),
            inhibit_flags: InhibitFlags {
                guarded: lead.guarded,
                private: lead.access == AccessType::Private,
                ..InhibitFlags::default()
            },
            assign_mnemonic: String::new(),
            cumulative_assign_count: 0,
            assignments: BTreeMap::new(),
            assigned_indicator: 0,
            last_reference: 0,
            catalog_time: 0,
            initial_granules: 0,
            max_granules: 0,
            highest_granule_assigned: 0,
            highest_track_written: 0,
            placement: 0,
            backup: BackupInfo::default(),
            allocations: AllocationTable::new(),
            record_sectors: Vec::new(),
        }
    }

    /// Move to a new state, keeping the descriptor flags in step.
    pub(crate) fn set_state(&mut self, state: CycleState) {
        self.state = state;
        self.descriptor_flags.to_be_cataloged = state == CycleState::Cataloging;
        self.descriptor_flags.to_be_dropped = state == CycleState::Dropping;
    }

    pub(crate) fn assignments_of(&self, client: &ClientIdentifier) -> u32 {
        self.assignments.get(client).copied().unwrap_or(0)
    }

    pub(crate) fn assign(&mut self, client: &ClientIdentifier, now: u64) {
        *self.assignments.entry(client.clone()).or_insert(0) += 1;
        self.assigned_indicator += 1;
        // The count is recorded in one word, so it sticks at the largest
        // value a word holds.
        self.cumulative_assign_count = (self.cumulative_assign_count + 1).min(Word36::MASK);
        self.last_reference = now;
    }

    /// Give up `count` of the client's assignments, returning how
    /// many the client still holds.
    pub(crate) fn unassign(&mut self, client: &ClientIdentifier, count: u32) -> u32 {
        let remaining = match self.assignments.get_mut(client) {
            Some(held) => {
                let given_up = count.min(*held);
                *held -= given_up;
                self.assigned_indicator -= given_up;
                *held
            }
            None => 0,
        };
        if remaining == 0 {
            self.assignments.remove(client);
        }
        remaining
    }
}
