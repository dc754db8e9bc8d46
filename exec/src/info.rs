//! Snapshots of catalog state handed out to callers.
use serde::Serialize;

use super::catalog::{
    AccessType, BackupInfo, DirectoryIndex, FileIdentifier, FileType, LeadItem, MainItem,
};
use super::cycle::CycleState;
use super::flags::{DescriptorFlags, DisableFlags, FileFlags, InhibitFlags, PcharFlags};
use super::pack::Extent;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleSummary {
    pub file_id: FileIdentifier,
    pub absolute_cycle: u32,
    pub state: CycleState,
    pub assigned: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileSetInfo {
    pub qualifier: String,
    pub filename: String,
    pub project_id: String,
    pub file_type: FileType,
    pub has_read_key: bool,
    pub has_write_key: bool,
    pub guarded: bool,
    pub plus_one_exists: bool,
    pub rename_in_progress: bool,
    pub directory: DirectoryIndex,
    pub access: AccessType,
    pub max_range: u32,
    pub current_range: u32,
    pub cycle_count: u32,
    pub highest_absolute: u32,
    /// Newest first.
    pub cycles: Vec<CycleSummary>,
}

impl FileSetInfo {
    pub(crate) fn new<'a, I>(
        lead: &LeadItem,
        current_range: u32,
        cycle_count: u32,
        mains: I,
    ) -> FileSetInfo
    where
        I: Iterator<Item = &'a MainItem>,
    {
        let mut cycles: Vec<CycleSummary> = mains
            .map(|main| CycleSummary {
                file_id: main.file_id,
                absolute_cycle: main.absolute_cycle,
                state: main.state,
                assigned: main.assigned_indicator,
            })
            .collect();
        cycles.sort_by_key(|c| crate::cycle::cycle_age(lead.highest_absolute, c.absolute_cycle));
        FileSetInfo {
            qualifier: lead.qualifier.clone(),
            filename: lead.filename.clone(),
            project_id: lead.project_id.clone(),
            file_type: lead.file_type,
            has_read_key: !lead.read_key.is_empty(),
            has_write_key: !lead.write_key.is_empty(),
            guarded: lead.guarded,
            plus_one_exists: lead.plus_one_exists,
            rename_in_progress: lead.rename_in_progress,
            directory: lead.directory,
            access: lead.access,
            max_range: lead.max_range,
            current_range,
            cycle_count,
            highest_absolute: lead.highest_absolute,
            cycles,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileCycleInfo {
    pub file_id: FileIdentifier,
    pub qualifier: String,
    pub filename: String,
    pub project_id: String,
    pub account_id: String,
    pub absolute_cycle: u32,
    pub state: CycleState,
    pub file_type: FileType,
    pub time_of_first_write: u64,
    pub disable_flags: DisableFlags,
    pub descriptor_flags: DescriptorFlags,
    pub file_flags: FileFlags,
    pub pchar_flags: PcharFlags,
    pub inhibit_flags: InhibitFlags,
    pub assign_mnemonic: String,
    pub cumulative_assign_count: u64,
    pub assigned_indicator: u32,
    pub last_reference: u64,
    pub catalog_time: u64,
    pub initial_granules: u64,
    pub max_granules: u64,
    pub highest_granule_assigned: u64,
    pub highest_track_written: u64,
    pub placement: u64,
    pub backup: BackupInfo,
    pub extents: Vec<Extent>,
}

impl From<&MainItem> for FileCycleInfo {
    fn from(main: &MainItem) -> FileCycleInfo {
        FileCycleInfo {
            file_id: main.file_id,
            qualifier: main.qualifier.clone(),
            filename: main.filename.clone(),
            project_id: main.project_id.clone(),
            account_id: main.account_id.clone(),
            absolute_cycle: main.absolute_cycle,
            state: main.state,
            file_type: main.file_type,
            time_of_first_write: main.time_of_first_write,
            disable_flags: main.disable_flags,
            descriptor_flags: main.descriptor_flags,
            file_flags: main.file_flags,
            pchar_flags: main.pchar_flags,
            inhibit_flags: main.inhibit_flags,
            assign_mnemonic: main.assign_mnemonic.clone(),
            cumulative_assign_count: main.cumulative_assign_count,
            assigned_indicator: main.assigned_indicator,
            last_reference: main.last_reference,
            catalog_time: main.catalog_time,
            initial_granules: main.initial_granules,
            max_granules: main.max_granules,
            highest_granule_assigned: main.highest_granule_assigned,
            highest_track_written: main.highest_track_written,
            placement: main.placement,
            backup: main.backup.clone(),
            extents: main.allocations.extents().collect(),
        }
    }
}
