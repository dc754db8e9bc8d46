//! The `exec` crate implements the Master File Directory (MFD) of the
//! executive: the catalog of file sets and file cycles, the
//! assignment of files to runs, the allocation of pack tracks to
//! mass-storage files, and the control records which let the
//! directory be recovered after a stop.
//!
//! All operations are methods of [`MasterFileDirectory`], which can
//! be shared between threads.  Each operation takes a
//! [`ClientContext`] naming the calling run and, optionally, a
//! deadline after which the operation gives up without changing
//! anything.
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]

mod catalog;
mod client;
mod config;
mod cycle;
mod error;
mod flags;
mod info;
mod medium;
mod mfd;
mod pack;
mod records;

pub use catalog::{AccessType, BackupInfo, DirectoryIndex, FileIdentifier, FileType};
pub use client::{ClientContext, ClientIdentifier};
pub use config::{MfdConfiguration, TRACKS_PER_POSITION, WORDS_PER_TRACK};
pub use cycle::{
    cycle_advance, cycle_age, next_cycle, CycleSpecifier, CycleState, MAX_ABSOLUTE_CYCLE,
};
pub use error::{MediumError, MfdError, MfdErrorKind, MfdResult};
pub use flags::{
    DescriptorFlags, DisableFlags, FileFlags, Granularity, InhibitFlags, PcharFlags,
};
pub use info::{CycleSummary, FileCycleInfo, FileSetInfo};
pub use medium::{DirectoryMedium, MemoryMedium, SECTOR_BYTES};
pub use mfd::{MasterFileDirectory, TapeCycleRequest, TemporaryFileRequest};
pub use pack::{AllocationTable, Extent, PackFreeSpace, TrackRegion};
pub use records::{Sector, SECTOR_WORDS};
