//! The Master File Directory: the catalog of every file set and file
//! cycle known to the executive.
//!
//! The catalog is a forest.  Each file set (a qualifier and filename)
//! has a lead item, and each existing cycle of the file set has a
//! main item belonging to that lead item.  Lead items live in an
//! arena and are named by [`LeadItemHandle`]; a main item is named by
//! its lead item's handle and its slot within the lead item.
//!
//! # Locking
//!
//! Each lead item, with its main items, is behind its own mutex.
//! Operations on one file cycle or file set lock only that lead item.
//! The index (the arena, the name table and the file identifier
//! table) is behind a reader-writer lock which is held for writing
//! only while file sets are created or removed.  The pack free-space
//! table and the table of per-client assignments each have their own
//! mutex.  Locks are always taken in this order:
//!
//! 1. the index,
//! 2. a lead item,
//! 3. the pack free-space table, the client table or the sector
//!    allocator (never more than one of these at a time).
//!
//! No operation holds more than one lead item lock at a time;
//! [`MasterFileDirectory::release_all_files`] visits the caller's
//! files one by one in (qualifier, filename) order.
//!
//! Directory records are written to the medium after the lead item
//! lock has been released (see the `journal` module).  The in-memory
//! change is the point at which an operation takes effect; if the
//! write fails, the affected cycles are marked with the directory
//! error disable flag and the caller is told.
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{event, span, Level};

use base::charset::{fieldata_string, fieldata_words};

use super::catalog::{FileIdentifier, FileType, LeadItem, MainItem};
use super::client::{ClientContext, ClientIdentifier};
use super::config::MfdConfiguration;
use super::cycle::{cycle_advance, cycle_age, next_cycle, CycleSpecifier, CycleState};
use super::error::{MfdError, MfdErrorKind, MfdResult};
use super::flags::Granularity;
use super::info::{FileCycleInfo, FileSetInfo};
use super::medium::DirectoryMedium;
use super::pack::{PackFreeSpace, TrackRegion};
use super::records::{
    allocation_sectors_needed, compose_allocations, compose_lead, compose_main, SECTOR_WORDS,
};

mod journal;
mod recovery;

use journal::{Batch, Persistence};

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read<T>(rwlock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    rwlock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(rwlock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    rwlock.write().unwrap_or_else(PoisonError::into_inner)
}

fn now_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs())
}

fn not_found<S: Into<String>>(detail: S) -> MfdError {
    MfdError::new(MfdErrorKind::NotFound, detail)
}

fn invalid<S: Into<String>>(detail: S) -> MfdError {
    MfdError::new(MfdErrorKind::InvalidRequest, detail)
}

/// Counts and track numbers occupy a single word of a control record.
fn word_sized(what: &str, value: u64) -> MfdResult<u64> {
    if value > base::Word36::MASK {
        Err(invalid(format!(
            "{what} {value} does not fit in a directory word"
        )))
    } else {
        Ok(value)
    }
}

/// Qualifiers and filenames have up to twelve characters, keys up
/// to six.  All are folded to upper case.
const MAX_NAME_LENGTH: usize = 12;
const MAX_KEY_LENGTH: usize = 6;

fn normalize(what: &str, text: &str, max_len: usize, allow_empty: bool) -> MfdResult<String> {
    let upper = text.to_ascii_uppercase();
    let valid_chars = upper
        .bytes()
        .all(|ch| ch.is_ascii_uppercase() || ch.is_ascii_digit() || ch == b'-' || ch == b'$');
    if !valid_chars || upper.len() > max_len || (upper.is_empty() && !allow_empty) {
        Err(invalid(format!("{what} {text:?} is not valid")))
    } else {
        Ok(upper)
    }
}

fn normalize_name(what: &str, text: &str) -> MfdResult<String> {
    normalize(what, text, MAX_NAME_LENGTH, false)
}

fn normalize_key(text: &str) -> MfdResult<String> {
    normalize("key", text, MAX_KEY_LENGTH, true)
}

/// A string as it will read back from a record `words` long.
fn fieldata_text(text: &str, words: usize) -> String {
    fieldata_string(&fieldata_words(text, words))
}

fn keys_match(stored: &str, given: &str) -> bool {
    stored.is_empty() || stored == given
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct LeadItemHandle(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MainItemHandle {
    lead: LeadItemHandle,
    slot: usize,
}

/// A lead item together with its main items.
#[derive(Debug)]
pub(crate) struct LeadNode {
    handle: LeadItemHandle,
    lead: LeadItem,
    // Slots are not reused, so a MainItemHandle never names the
    // wrong cycle.
    mains: Vec<Option<MainItem>>,
    /// Set when the last cycle goes; the node is then unreachable
    /// even if the index still refers to it.
    removed: bool,
    lead_sector: Option<u64>,
}

impl LeadNode {
    fn new(handle: LeadItemHandle, lead: LeadItem) -> LeadNode {
        LeadNode {
            handle,
            lead,
            mains: Vec::new(),
            removed: false,
            lead_sector: None,
        }
    }

    fn name(&self) -> String {
        format!("{}*{}", self.lead.qualifier, self.lead.filename)
    }

    fn present(&self) -> impl Iterator<Item = &MainItem> + '_ {
        self.mains.iter().flatten()
    }

    fn present_slots(&self) -> impl Iterator<Item = (usize, &MainItem)> + '_ {
        self.mains
            .iter()
            .enumerate()
            .filter_map(|(slot, main)| main.as_ref().map(|m| (slot, m)))
    }

    fn main(&self, slot: usize, file: FileIdentifier) -> MfdResult<&MainItem> {
        self.mains
            .get(slot)
            .and_then(Option::as_ref)
            .filter(|main| main.file_id == file && !self.removed)
            .ok_or_else(|| not_found(format!("file {file} does not exist")))
    }

    fn main_mut(&mut self, slot: usize, file: FileIdentifier) -> MfdResult<&mut MainItem> {
        let removed = self.removed;
        self.mains
            .get_mut(slot)
            .and_then(Option::as_mut)
            .filter(|main| main.file_id == file && !removed)
            .ok_or_else(|| not_found(format!("file {file} does not exist")))
    }

    fn cycle_count(&self) -> u32 {
        self.present().filter(|main| main.state.is_counted()).count() as u32
    }

    fn current_range(&self) -> u32 {
        self.present()
            .map(|main| cycle_age(self.lead.highest_absolute, main.absolute_cycle) + 1)
            .max()
            .unwrap_or(0)
    }

    fn refresh_plus_one(&mut self) {
        let highest = self.lead.highest_absolute;
        let exists = self
            .present()
            .any(|main| main.state == CycleState::Cataloging && main.absolute_cycle == highest);
        self.lead.plus_one_exists = exists;
    }

    /// Slots of the live cycles, newest first.
    fn live_by_age(&self) -> Vec<usize> {
        let highest = self.lead.highest_absolute;
        let mut live: Vec<(u32, usize)> = self
            .present_slots()
            .filter(|(_, main)| main.state == CycleState::Live)
            .map(|(slot, main)| (cycle_age(highest, main.absolute_cycle), slot))
            .collect();
        live.sort_unstable();
        live.into_iter().map(|(_, slot)| slot).collect()
    }

    /// Find an existing cycle.  A cycle which is being cataloged is
    /// visible only to the run creating it; one which is being
    /// dropped is visible to nobody.
    fn resolve_existing(&self, spec: CycleSpecifier, client: &ClientIdentifier) -> MfdResult<usize> {
        let visible = |main: &MainItem| match main.state {
            CycleState::Live => true,
            CycleState::Cataloging => main.creator.as_ref() == Some(client),
            CycleState::Dropping | CycleState::Dropped => false,
        };
        let found = match spec {
            CycleSpecifier::Absolute(n) => self
                .present_slots()
                .find(|(_, main)| main.absolute_cycle == n && visible(main))
                .map(|(slot, _)| slot),
            CycleSpecifier::Unspecified | CycleSpecifier::Relative(0) => {
                self.live_by_age().first().copied()
            }
            CycleSpecifier::Relative(n) if n < 0 => usize::try_from(n.unsigned_abs())
                .ok()
                .and_then(|back| self.live_by_age().get(back).copied()),
            CycleSpecifier::Relative(_) => self
                .present_slots()
                .find(|(_, main)| {
                    main.state == CycleState::Cataloging
                        && main.absolute_cycle == self.lead.highest_absolute
                        && visible(main)
                })
                .map(|(slot, _)| slot),
        };
        found.ok_or_else(|| not_found(format!("{}{spec} does not exist", self.name())))
    }

    /// Choose the absolute cycle for a new cycle.  Also reports
    /// whether it becomes the highest cycle of the file set.
    fn resolve_new(&self, spec: CycleSpecifier) -> MfdResult<(u32, bool)> {
        if self.present().next().is_none() {
            return match spec {
                CycleSpecifier::Absolute(n) => Ok((n, true)),
                CycleSpecifier::Unspecified | CycleSpecifier::Relative(1) => Ok((1, true)),
                CycleSpecifier::Relative(_) => Err(invalid(format!(
                    "{}{spec} names an existing cycle, but the file set is new",
                    self.name()
                ))),
            };
        }
        let highest = self.lead.highest_absolute;
        let target = match spec {
            CycleSpecifier::Unspecified | CycleSpecifier::Relative(1) => {
                if self.lead.plus_one_exists {
                    return Err(MfdError::new(
                        MfdErrorKind::AlreadyExists,
                        format!("{}(+1) already exists", self.name()),
                    ));
                }
                next_cycle(highest)
            }
            CycleSpecifier::Relative(n) => {
                let exists = usize::try_from(n.unsigned_abs())
                    .ok()
                    .is_some_and(|back| back < self.live_by_age().len());
                return Err(if exists {
                    MfdError::new(
                        MfdErrorKind::AlreadyExists,
                        format!("{}{spec} already exists", self.name()),
                    )
                } else {
                    invalid(format!("{}{spec} cannot be created", self.name()))
                });
            }
            CycleSpecifier::Absolute(n) => n,
        };
        if self.present().any(|main| main.absolute_cycle == target) {
            return Err(MfdError::new(
                MfdErrorKind::AlreadyExists,
                format!("{}({target}) already exists", self.name()),
            ));
        }
        let age = cycle_age(highest, target);
        if age < self.lead.max_range {
            return Ok((target, false));
        }
        let range = self.current_range() + cycle_advance(highest, target);
        if range > self.lead.max_range {
            return Err(MfdError::new(
                MfdErrorKind::RangeExceeded,
                format!(
                    "creating {}({target}) would make the cycle range {range}, but the maximum is {}",
                    self.name(),
                    self.lead.max_range
                ),
            ));
        }
        Ok((target, true))
    }

    fn info(&self) -> FileSetInfo {
        FileSetInfo::new(
            &self.lead,
            self.current_range(),
            self.cycle_count(),
            self.present(),
        )
    }
}

#[derive(Debug, Default)]
struct Index {
    leads: Vec<Option<Arc<Mutex<LeadNode>>>>,
    by_name: BTreeMap<(String, String), LeadItemHandle>,
    files: HashMap<FileIdentifier, MainItemHandle>,
    next_file_id: u64,
}

impl Index {
    fn node(&self, handle: LeadItemHandle) -> Option<Arc<Mutex<LeadNode>>> {
        self.leads.get(handle.0).and_then(Option::clone)
    }

    fn allocate_file_id(&mut self) -> FileIdentifier {
        self.next_file_id += 1;
        FileIdentifier(self.next_file_id)
    }
}

/// Parameters of [`MasterFileDirectory::create_tape_file_cycle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TapeCycleRequest {
    pub qualifier: String,
    pub filename: String,
    pub cycle: CycleSpecifier,
    pub read_key: String,
    pub write_key: String,
    /// The maximum cycle range of a new file set; 0 selects the
    /// configured default.  Ignored for an existing file set.
    pub max_cycles: u32,
}

/// Parameters of [`MasterFileDirectory::create_temporary_disk_file`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemporaryFileRequest {
    pub qualifier: String,
    pub filename: String,
    pub cycle: CycleSpecifier,
    pub granularity: Granularity,
    /// Granules allocated when the file is created.
    pub initial_reserve: u64,
    pub max_granules: u64,
}

/// What the two cycle-creating operations have in common.
struct Creation {
    operation: &'static str,
    qualifier: String,
    filename: String,
    cycle: CycleSpecifier,
    file_type: FileType,
    read_key: String,
    write_key: String,
    max_range: u32,
    state: CycleState,
    granularity: Granularity,
    initial_reserve: u64,
    max_granules: u64,
}

pub struct MasterFileDirectory {
    config: MfdConfiguration,
    index: RwLock<Index>,
    clients: Mutex<HashMap<ClientIdentifier, BTreeSet<FileIdentifier>>>,
    pack: Mutex<PackFreeSpace>,
    persistence: Option<Persistence>,
}

impl MasterFileDirectory {
    /// An empty directory which keeps its records only in memory.
    #[must_use]
    pub fn new(config: MfdConfiguration) -> MasterFileDirectory {
        // Pack track numbers are recorded in single words.
        let pack = PackFreeSpace::new(config.pack_tracks.min(base::Word36::MASK));
        MasterFileDirectory {
            config,
            index: RwLock::new(Index::default()),
            clients: Mutex::new(HashMap::new()),
            pack: Mutex::new(pack),
            persistence: None,
        }
    }

    /// An empty directory which records itself on `medium`.  Every
    /// sector of the medium is cleared.
    ///
    /// # Errors
    ///
    /// Fails with `MediumIo` if the medium cannot be cleared.
    pub fn initialize(
        config: MfdConfiguration,
        medium: Box<dyn DirectoryMedium>,
    ) -> MfdResult<MasterFileDirectory> {
        let sector_count = medium.sector_count();
        let in_use = vec![false; usize::try_from(sector_count).unwrap_or(0)];
        let persistence = Persistence::new(medium, in_use);
        let free = [base::Word36::ZERO; SECTOR_WORDS];
        for sector in 0..sector_count {
            persistence.write_now(sector, &free)?;
        }
        event!(
            Level::INFO,
            "initialized a directory of {sector_count} sectors"
        );
        let mut mfd = MasterFileDirectory::new(config);
        mfd.persistence = Some(persistence);
        Ok(mfd)
    }

    #[must_use]
    pub fn configuration(&self) -> &MfdConfiguration {
        &self.config
    }

    /// The number of unallocated tracks on the pack.
    #[must_use]
    pub fn free_tracks(&self) -> u64 {
        lock(&self.pack).free_tracks()
    }

    fn tracks_per_granule(&self, granularity: Granularity) -> u64 {
        match granularity {
            Granularity::Track => 1,
            Granularity::Position => self.config.tracks_per_position,
        }
    }

    fn node_by_name(&self, qualifier: &str, filename: &str) -> MfdResult<Arc<Mutex<LeadNode>>> {
        let index = read(&self.index);
        index
            .by_name
            .get(&(qualifier.to_string(), filename.to_string()))
            .and_then(|handle| index.node(*handle))
            .ok_or_else(|| not_found(format!("{qualifier}*{filename} does not exist")))
    }

    fn node_by_file(&self, file: FileIdentifier) -> MfdResult<(Arc<Mutex<LeadNode>>, usize)> {
        let index = read(&self.index);
        index
            .files
            .get(&file)
            .and_then(|handle| index.node(handle.lead).map(|node| (node, handle.slot)))
            .ok_or_else(|| not_found(format!("file {file} does not exist")))
    }

    fn note_assignment(&self, client: &ClientIdentifier, file: FileIdentifier) {
        lock(&self.clients)
            .entry(client.clone())
            .or_default()
            .insert(file);
    }

    fn note_release(&self, client: &ClientIdentifier, file: FileIdentifier) {
        let mut clients = lock(&self.clients);
        if let Some(files) = clients.get_mut(client) {
            files.remove(&file);
            if files.is_empty() {
                clients.remove(client);
            }
        }
    }

    /// Remove a cycle from its lead item, returning its tracks to the
    /// pack.  The lead item goes too if this was its last cycle.
    fn drop_cycle(&self, node: &mut LeadNode, slot: usize, batch: &mut Batch) {
        let Some(mut main) = node.mains.get_mut(slot).and_then(Option::take) else {
            return;
        };
        main.set_state(CycleState::Dropped);
        event!(
            Level::INFO,
            "{}({}) {} dropped",
            node.name(),
            main.absolute_cycle,
            main.file_id
        );
        {
            let mut pack = lock(&self.pack);
            for region in main.allocations.take_all() {
                if !pack.release(region) {
                    event!(
                        Level::ERROR,
                        "{} held tracks {region} which were already free",
                        main.file_id
                    );
                }
            }
        }
        for client in main.assignments.keys() {
            self.note_release(client, main.file_id);
        }
        if let Some(persistence) = &self.persistence {
            persistence.stage_free(batch, &main.record_sectors);
        }
        batch.dropped_files.push(main.file_id);
        node.refresh_plus_one();
        if node.present().next().is_none() {
            event!(Level::DEBUG, "{} has no cycles left", node.name());
            node.removed = true;
            if let (Some(persistence), Some(sector)) = (&self.persistence, node.lead_sector.take())
            {
                persistence.stage_free(batch, &[sector]);
            }
            batch.removed_lead = Some((
                node.handle,
                (node.lead.qualifier.clone(), node.lead.filename.clone()),
            ));
        }
    }

    /// Stage the records of a lead item and all its cycles.
    fn stage_lead(&self, node: &mut LeadNode, batch: &mut Batch) {
        let Some(persistence) = &self.persistence else {
            return;
        };
        if node.removed {
            return;
        }
        let lead_record = compose_lead(&node.lead, node.current_range(), node.cycle_count());
        match node.lead_sector.or_else(|| persistence.allocate_sector()) {
            Some(sector) => {
                node.lead_sector = Some(sector);
                persistence.stage(batch, sector, lead_record, None);
            }
            None => batch.errors.push(MfdError::new(
                MfdErrorKind::MediumIo,
                format!("no directory space for {}", node.name()),
            )),
        }
        for main in node.mains.iter_mut().flatten() {
            let wanted = 2 + allocation_sectors_needed(main);
            while main.record_sectors.len() < wanted {
                match persistence.allocate_sector() {
                    Some(sector) => main.record_sectors.push(sector),
                    None => break,
                }
            }
            if main.record_sectors.len() < wanted {
                main.disable_flags.directory_error = true;
                batch.errors.push(MfdError::new(
                    MfdErrorKind::MediumIo,
                    format!("no directory space for {}", main.file_id),
                ));
                continue;
            }
            if main.record_sectors.len() > wanted {
                let surplus = main.record_sectors.split_off(wanted);
                persistence.stage_free(batch, &surplus);
            }
            let [identity, backup] = compose_main(main);
            let file = Some(main.file_id);
            persistence.stage(batch, main.record_sectors[0], identity, file);
            persistence.stage(batch, main.record_sectors[1], backup, file);
            for (sector, content) in main.record_sectors[2..]
                .iter()
                .zip(compose_allocations(main))
            {
                persistence.stage(batch, *sector, content, file);
            }
        }
    }

    /// Carry out the deferred part of an operation: write its records
    /// and tidy up the index.
    fn finish(&self, node: &Arc<Mutex<LeadNode>>, mut batch: Batch) -> MfdResult<()> {
        let failures = match &self.persistence {
            Some(persistence) => persistence.flush(&mut batch),
            None => Vec::new(),
        };
        if !failures.is_empty() {
            let mut node = lock(node);
            for (file, _) in &failures {
                for main in node.mains.iter_mut().flatten() {
                    if file.is_none() || *file == Some(main.file_id) {
                        main.disable_flags.directory_error = true;
                    }
                }
            }
        }
        if !batch.dropped_files.is_empty() || batch.removed_lead.is_some() {
            let mut index = write(&self.index);
            for file in &batch.dropped_files {
                index.files.remove(file);
            }
            if let Some((handle, name)) = &batch.removed_lead {
                if index.by_name.get(name) == Some(handle) {
                    index.by_name.remove(name);
                }
                if let Some(slot) = index.leads.get_mut(handle.0) {
                    *slot = None;
                }
            }
        }
        if let Some((_, e)) = failures.into_iter().next() {
            return Err(e.into());
        }
        match batch.errors.into_iter().next() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn create(&self, ctx: &ClientContext, request: Creation) -> MfdResult<FileIdentifier> {
        let client = &ctx.identifier;
        ctx.check_deadline(request.operation)?;
        let tracks = request
            .initial_reserve
            .checked_mul(self.tracks_per_granule(request.granularity))
            .filter(|tracks| *tracks <= base::Word36::MASK)
            .ok_or_else(|| invalid("initial reserve is too large"))?;

        let mut index = write(&self.index);
        let name = (request.qualifier.clone(), request.filename.clone());
        let existing = index
            .by_name
            .get(&name)
            .and_then(|handle| index.node(*handle))
            .filter(|node| !lock(node).removed);
        let is_new = existing.is_none();
        let node_arc = existing.unwrap_or_else(|| {
            let mut lead = LeadItem::new(
                request.qualifier.clone(),
                request.filename.clone(),
                fieldata_text(&client.run_id, 2),
                request.file_type,
                request.max_range,
            );
            lead.read_key = request.read_key.clone();
            lead.write_key = request.write_key.clone();
            Arc::new(Mutex::new(LeadNode::new(
                LeadItemHandle(index.leads.len()),
                lead,
            )))
        });
        let mut node = lock(&node_arc);
        if !is_new {
            if node.lead.file_type != request.file_type {
                return Err(MfdError::new(
                    MfdErrorKind::WrongFileType,
                    format!("{} is a {} file", node.name(), node.lead.file_type),
                ));
            }
            if !keys_match(&node.lead.read_key, &request.read_key)
                || !keys_match(&node.lead.write_key, &request.write_key)
            {
                return Err(MfdError::new(
                    MfdErrorKind::WrongKey,
                    format!("keys do not match those of {}", node.name()),
                ));
            }
        }
        let (absolute, newer) = node.resolve_new(request.cycle)?;
        if request.initial_reserve > request.max_granules {
            return Err(MfdError::new(
                MfdErrorKind::QuotaExceeded,
                format!(
                    "initial reserve of {} granules exceeds the maximum of {}",
                    request.initial_reserve, request.max_granules
                ),
            ));
        }
        ctx.check_deadline(request.operation)?;
        let regions = if tracks > 0 {
            lock(&self.pack).allocate(tracks).ok_or_else(|| {
                MfdError::new(
                    MfdErrorKind::QuotaExceeded,
                    format!("pack full: cannot reserve {tracks} tracks"),
                )
            })?
        } else {
            Vec::new()
        };

        // Nothing below can fail.
        let now = now_seconds();
        let file = index.allocate_file_id();
        let mut main = MainItem::new(&node.lead, absolute, request.state);
        main.file_id = file;
        main.account_id = fieldata_text(&client.user_id, 2);
        if request.state == CycleState::Cataloging {
            main.creator = Some(client.clone());
        } else {
            main.catalog_time = now;
        }
        if request.file_type == FileType::MassStorage {
            main.pchar_flags.granularity = request.granularity;
            main.initial_granules = request.initial_reserve;
            main.max_granules = request.max_granules;
            main.highest_granule_assigned = request.initial_reserve;
            let mut file_track = 0;
            for region in regions {
                main.allocations.insert(file_track, region);
                file_track += region.count;
            }
        }
        main.assign(client, now);
        if newer {
            node.lead.highest_absolute = absolute;
        }
        let slot = node.mains.len();
        node.mains.push(Some(main));
        node.refresh_plus_one();
        if is_new {
            index.leads.push(Some(Arc::clone(&node_arc)));
            index.by_name.insert(name, node.handle);
        }
        index.files.insert(
            file,
            MainItemHandle {
                lead: node.handle,
                slot,
            },
        );
        self.note_assignment(client, file);
        event!(
            Level::INFO,
            "{} created {}({absolute}) as {file}, {}",
            client,
            node.name(),
            request.state
        );

        let mut batch = Batch::default();
        self.stage_lead(&mut node, &mut batch);
        drop(node);
        drop(index);
        self.finish(&node_arc, batch)?;
        Ok(file)
    }

    /// Create a tape file cycle.  The cycle is assigned to the caller
    /// and is cataloged when the caller catalogs it or releases it.
    ///
    /// # Errors
    ///
    /// `InvalidRequest` for malformed names, keys or cycles;
    /// `WrongFileType` if the file set is not a tape file set;
    /// `WrongKey` if the keys do not match the file set's;
    /// `AlreadyExists` or `RangeExceeded` if the cycle cannot be
    /// created; `Aborted` when the deadline passes.
    pub fn create_tape_file_cycle(
        &self,
        ctx: &ClientContext,
        request: &TapeCycleRequest,
    ) -> MfdResult<FileIdentifier> {
        let span = span!(Level::DEBUG, "create_tape_file_cycle", client = %ctx.identifier);
        let _enter = span.enter();
        let max_range = match request.max_cycles {
            0 => self.config.default_max_range,
            n if n <= crate::cycle::MAX_ABSOLUTE_CYCLE => n,
            n => return Err(invalid(format!("maximum cycle range {n} is too large"))),
        };
        self.create(
            ctx,
            Creation {
                operation: "create tape file cycle",
                qualifier: normalize_name("qualifier", &request.qualifier)?,
                filename: normalize_name("filename", &request.filename)?,
                cycle: request.cycle.validate()?,
                file_type: FileType::Tape,
                read_key: normalize_key(&request.read_key)?,
                write_key: normalize_key(&request.write_key)?,
                max_range,
                state: CycleState::Cataloging,
                granularity: Granularity::Track,
                initial_reserve: 0,
                max_granules: 0,
            },
        )
    }

    /// Create a temporary mass-storage file.  The file is live at once,
    /// is assigned to the caller, and has its initial reserve of
    /// granules allocated.
    ///
    /// # Errors
    ///
    /// `InvalidRequest` for malformed names or cycles;
    /// `WrongFileType` if the file set is not a mass-storage file set;
    /// `WrongKey` if the file set has keys; `QuotaExceeded` if the
    /// initial reserve exceeds the maximum or the pack is full;
    /// `AlreadyExists` or `RangeExceeded` if the cycle cannot be
    /// created; `Aborted` when the deadline passes.
    pub fn create_temporary_disk_file(
        &self,
        ctx: &ClientContext,
        request: &TemporaryFileRequest,
    ) -> MfdResult<FileIdentifier> {
        let span = span!(Level::DEBUG, "create_temporary_disk_file", client = %ctx.identifier);
        let _enter = span.enter();
        self.create(
            ctx,
            Creation {
                operation: "create temporary disk file",
                qualifier: normalize_name("qualifier", &request.qualifier)?,
                filename: normalize_name("filename", &request.filename)?,
                cycle: request.cycle.validate()?,
                file_type: FileType::MassStorage,
                read_key: String::new(),
                write_key: String::new(),
                max_range: self.config.default_max_range,
                state: CycleState::Live,
                granularity: request.granularity,
                initial_reserve: word_sized("initial reserve", request.initial_reserve)?,
                max_granules: word_sized("maximum granules", request.max_granules)?,
            },
        )
    }

    /// Assign an existing cycle to the caller.
    ///
    /// # Errors
    ///
    /// `NotFound` if the cycle does not exist or is being dropped;
    /// `WrongKey` if the read key does not match; `InvalidRequest`
    /// for malformed arguments; `Aborted` when the deadline passes.
    pub fn assign_file_cycle(
        &self,
        ctx: &ClientContext,
        qualifier: &str,
        filename: &str,
        cycle: CycleSpecifier,
        read_key: &str,
    ) -> MfdResult<FileIdentifier> {
        let operation = "assign file cycle";
        ctx.check_deadline(operation)?;
        let qualifier = normalize_name("qualifier", qualifier)?;
        let filename = normalize_name("filename", filename)?;
        let cycle = cycle.validate()?;
        let read_key = normalize_key(read_key)?;
        let client = &ctx.identifier;

        let node_arc = self.node_by_name(&qualifier, &filename)?;
        let mut batch = Batch::default();
        let file = {
            let mut node = lock(&node_arc);
            if node.removed {
                return Err(not_found(format!("{qualifier}*{filename} does not exist")));
            }
            if !keys_match(&node.lead.read_key, &read_key) {
                return Err(MfdError::new(
                    MfdErrorKind::WrongKey,
                    format!("read key does not match that of {}", node.name()),
                ));
            }
            let slot = node.resolve_existing(cycle, client)?;
            ctx.check_deadline(operation)?;
            let name = node.name();
            let Some(main) = node.mains.get_mut(slot).and_then(Option::as_mut) else {
                return Err(not_found(format!("{name}{cycle} does not exist")));
            };
            main.assign(client, now_seconds());
            let file = main.file_id;
            event!(
                Level::INFO,
                "{client} assigned {name}({}) {file}, now assigned {} times",
                main.absolute_cycle,
                main.assigned_indicator
            );
            self.note_assignment(client, file);
            self.stage_lead(&mut node, &mut batch);
            file
        };
        self.finish(&node_arc, batch)?;
        Ok(file)
    }

    /// Commit a cycle the caller is cataloging.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown file; `InvalidRequest` if the cycle
    /// is not being cataloged; `NotAssigned` if the caller did not
    /// create it; `Aborted` when the deadline passes.
    pub fn catalog_file_cycle(&self, ctx: &ClientContext, file: FileIdentifier) -> MfdResult<()> {
        let operation = "catalog file cycle";
        ctx.check_deadline(operation)?;
        let (node_arc, slot) = self.node_by_file(file)?;
        let mut batch = Batch::default();
        {
            let mut node = lock(&node_arc);
            let main = node.main(slot, file)?;
            self.check_creator(ctx, main)?;
            ctx.check_deadline(operation)?;
            let main = node.main_mut(slot, file)?;
            main.set_state(CycleState::Live);
            main.catalog_time = now_seconds();
            main.creator = None;
            event!(Level::INFO, "{file} cataloged");
            node.refresh_plus_one();
            self.stage_lead(&mut node, &mut batch);
        }
        self.finish(&node_arc, batch)
    }

    /// Drop a cycle the caller is cataloging.
    ///
    /// # Errors
    ///
    /// As for [`MasterFileDirectory::catalog_file_cycle`].
    pub fn abort_file_cycle(&self, ctx: &ClientContext, file: FileIdentifier) -> MfdResult<()> {
        let operation = "abort file cycle";
        ctx.check_deadline(operation)?;
        let (node_arc, slot) = self.node_by_file(file)?;
        let mut batch = Batch::default();
        {
            let mut node = lock(&node_arc);
            let main = node.main(slot, file)?;
            self.check_creator(ctx, main)?;
            ctx.check_deadline(operation)?;
            self.drop_cycle(&mut node, slot, &mut batch);
            self.stage_lead(&mut node, &mut batch);
        }
        self.finish(&node_arc, batch)
    }

    fn check_creator(&self, ctx: &ClientContext, main: &MainItem) -> MfdResult<()> {
        if main.state != CycleState::Cataloging {
            return Err(invalid(format!(
                "{} is {}, not being cataloged",
                main.file_id, main.state
            )));
        }
        if main.creator.as_ref() != Some(&ctx.identifier) {
            return Err(MfdError::new(
                MfdErrorKind::NotAssigned,
                format!("{} is being cataloged by another run", main.file_id),
            ));
        }
        Ok(())
    }

    /// Delete a live cycle.  If nobody has the cycle assigned it is
    /// dropped at once; otherwise it is dropped when the last
    /// assignment is released, and meanwhile nobody new can assign
    /// it.
    ///
    /// # Errors
    ///
    /// `NotFound` if there is no such live cycle; `WrongKey` if the
    /// write key does not match; `Guarded` if the file set is
    /// guarded; `InvalidRequest` for malformed arguments; `Aborted`
    /// when the deadline passes.
    pub fn delete_file_cycle(
        &self,
        ctx: &ClientContext,
        qualifier: &str,
        filename: &str,
        cycle: CycleSpecifier,
        write_key: &str,
    ) -> MfdResult<()> {
        let operation = "delete file cycle";
        ctx.check_deadline(operation)?;
        let qualifier = normalize_name("qualifier", qualifier)?;
        let filename = normalize_name("filename", filename)?;
        let cycle = cycle.validate()?;
        let write_key = normalize_key(write_key)?;

        let node_arc = self.node_by_name(&qualifier, &filename)?;
        let mut batch = Batch::default();
        {
            let mut node = lock(&node_arc);
            if node.removed {
                return Err(not_found(format!("{qualifier}*{filename} does not exist")));
            }
            if !keys_match(&node.lead.write_key, &write_key) {
                return Err(MfdError::new(
                    MfdErrorKind::WrongKey,
                    format!("write key does not match that of {}", node.name()),
                ));
            }
            if node.lead.guarded {
                return Err(MfdError::new(
                    MfdErrorKind::Guarded,
                    format!("{} is guarded", node.name()),
                ));
            }
            let slot = node.resolve_existing(cycle, &ctx.identifier)?;
            let name = node.name();
            let Some(main) = node.mains.get_mut(slot).and_then(Option::as_mut) else {
                return Err(not_found(format!("{name}{cycle} does not exist")));
            };
            if main.state != CycleState::Live {
                return Err(not_found(format!(
                    "{name}({}) is not a live cycle",
                    main.absolute_cycle
                )));
            }
            ctx.check_deadline(operation)?;
            if main.assigned_indicator == 0 {
                self.drop_cycle(&mut node, slot, &mut batch);
            } else {
                main.set_state(CycleState::Dropping);
                event!(
                    Level::INFO,
                    "{name}({}) will be dropped when its {} assignments are released",
                    main.absolute_cycle,
                    main.assigned_indicator
                );
            }
            self.stage_lead(&mut node, &mut batch);
        }
        self.finish(&node_arc, batch)
    }

    fn release(&self, ctx: &ClientContext, file: FileIdentifier, all: bool) -> MfdResult<()> {
        let operation = "release file";
        let client = &ctx.identifier;
        ctx.check_deadline(operation)?;
        let (node_arc, slot) = self.node_by_file(file)?;
        let mut batch = Batch::default();
        {
            let mut node = lock(&node_arc);
            let main = node.main_mut(slot, file)?;
            let held = main.assignments_of(client);
            if held == 0 {
                return Err(MfdError::new(
                    MfdErrorKind::NotAssigned,
                    format!("{file} is not assigned to {client}"),
                ));
            }
            ctx.check_deadline(operation)?;
            let remaining = main.unassign(client, if all { held } else { 1 });
            main.last_reference = now_seconds();
            if remaining == 0 {
                self.note_release(client, file);
            }
            event!(
                Level::DEBUG,
                "{client} released {file}, still assigned {} times",
                main.assigned_indicator
            );
            let state = main.state;
            match state {
                CycleState::Cataloging if remaining == 0 => {
                    main.set_state(CycleState::Live);
                    main.catalog_time = now_seconds();
                    main.creator = None;
                    event!(Level::INFO, "{file} cataloged on release");
                    node.refresh_plus_one();
                }
                CycleState::Dropping if main.assigned_indicator == 0 => {
                    self.drop_cycle(&mut node, slot, &mut batch);
                }
                _ => (),
            }
            self.stage_lead(&mut node, &mut batch);
        }
        self.finish(&node_arc, batch)
    }

    /// Give up one of the caller's assignments of a file.  Releasing
    /// the last assignment of a cycle which is being dropped drops
    /// it; the creator releasing a cycle which is being cataloged
    /// catalogs it.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown file; `NotAssigned` if the caller
    /// does not have it assigned; `Aborted` when the deadline passes;
    /// `MediumIo` if the directory could not be updated.
    pub fn release_file(&self, ctx: &ClientContext, file: FileIdentifier) -> MfdResult<()> {
        self.release(ctx, file, false)
    }

    /// Release every file the caller had assigned when the call
    /// began, in (qualifier, filename) order.  Returns the number of
    /// files released.
    ///
    /// # Errors
    ///
    /// `Aborted` if the deadline passes (files already released stay
    /// released).  Otherwise every file is attempted and the first
    /// failure is reported.
    pub fn release_all_files(&self, ctx: &ClientContext) -> MfdResult<usize> {
        let span = span!(Level::DEBUG, "release_all_files", client = %ctx.identifier);
        let _enter = span.enter();
        ctx.check_deadline("release all files")?;
        let snapshot: Vec<FileIdentifier> = lock(&self.clients)
            .get(&ctx.identifier)
            .map(|files| files.iter().copied().collect())
            .unwrap_or_default();

        let mut ordered = Vec::with_capacity(snapshot.len());
        for file in snapshot {
            if let Ok((node_arc, slot)) = self.node_by_file(file) {
                let node = lock(&node_arc);
                if let Ok(main) = node.main(slot, file) {
                    ordered.push((
                        (
                            main.qualifier.clone(),
                            main.filename.clone(),
                            main.absolute_cycle,
                        ),
                        file,
                    ));
                }
            }
        }
        ordered.sort();

        let mut released = 0;
        let mut first_error = None;
        for (_, file) in ordered {
            match self.release(ctx, file, true) {
                Ok(()) => released += 1,
                Err(e) if matches!(e.kind, MfdErrorKind::NotFound | MfdErrorKind::NotAssigned) => {
                    event!(Level::DEBUG, "{file} went away during release: {e}");
                }
                Err(e) if e.kind == MfdErrorKind::Aborted => return Err(e),
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        event!(Level::INFO, "released {released} files");
        match first_error {
            Some(e) => Err(e),
            None => Ok(released),
        }
    }

    /// Check the common preconditions of track operations and return
    /// the requested region.
    fn check_track_request(
        ctx: &ClientContext,
        main: &MainItem,
        first: u64,
        count: u64,
    ) -> MfdResult<TrackRegion> {
        if main.file_type != FileType::MassStorage {
            return Err(MfdError::new(
                MfdErrorKind::WrongFileType,
                format!("{} is a {} file", main.file_id, main.file_type),
            ));
        }
        if main.assignments_of(&ctx.identifier) == 0 {
            return Err(MfdError::new(
                MfdErrorKind::NotAssigned,
                format!("{} is not assigned to {}", main.file_id, ctx.identifier),
            ));
        }
        match first.checked_add(count) {
            Some(limit) if count > 0 && limit <= base::Word36::MASK => (),
            _ => return Err(invalid(format!("track region {first}+{count} is not valid"))),
        }
        Ok(TrackRegion::new(first, count))
    }

    /// Allocate file tracks `first..first+count` of a mass-storage
    /// file assigned to the caller.  Tracks which are already
    /// allocated are left as they are.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown file; `WrongFileType` if it is not a
    /// mass-storage file; `NotAssigned` if the caller does not have
    /// it assigned; `QuotaExceeded` if the file would grow past its
    /// maximum granules or the pack is full; `InvalidRequest` for an
    /// empty region; `Aborted` when the deadline passes.
    pub fn allocate_tracks(
        &self,
        ctx: &ClientContext,
        file: FileIdentifier,
        first: u64,
        count: u64,
    ) -> MfdResult<()> {
        let operation = "allocate tracks";
        ctx.check_deadline(operation)?;
        let (node_arc, slot) = self.node_by_file(file)?;
        let mut batch = Batch::default();
        {
            let mut node = lock(&node_arc);
            let main = node.main_mut(slot, file)?;
            let region = Self::check_track_request(ctx, main, first, count)?;
            let per_granule = self.tracks_per_granule(main.pchar_flags.granularity);
            let granules = region.limit().div_ceil(per_granule);
            if granules > main.max_granules {
                return Err(MfdError::new(
                    MfdErrorKind::QuotaExceeded,
                    format!(
                        "{file} would need {granules} granules, but its maximum is {}",
                        main.max_granules
                    ),
                ));
            }
            ctx.check_deadline(operation)?;
            let gaps = main.allocations.unallocated_runs(region);
            let needed: u64 = gaps.iter().map(|gap| gap.count).sum();
            {
                let mut pack = lock(&self.pack);
                if pack.free_tracks() < needed {
                    return Err(MfdError::new(
                        MfdErrorKind::QuotaExceeded,
                        format!(
                            "pack full: {needed} tracks needed, {} free",
                            pack.free_tracks()
                        ),
                    ));
                }
                for gap in gaps {
                    let Some(regions) = pack.allocate(gap.count) else {
                        return Err(MfdError::new(
                            MfdErrorKind::QuotaExceeded,
                            format!("pack full: cannot allocate tracks {gap} of {file}"),
                        ));
                    };
                    let mut file_track = gap.first;
                    for pack_region in regions {
                        main.allocations.insert(file_track, pack_region);
                        file_track += pack_region.count;
                    }
                }
            }
            main.highest_granule_assigned = main.highest_granule_assigned.max(granules);
            main.last_reference = now_seconds();
            event!(
                Level::DEBUG,
                "{file} tracks {region} allocated ({needed} new)"
            );
            self.stage_lead(&mut node, &mut batch);
        }
        self.finish(&node_arc, batch)
    }

    /// Record that the caller wrote file tracks `first..first+count`.
    ///
    /// # Errors
    ///
    /// As for [`MasterFileDirectory::allocate_tracks`], except that
    /// `QuotaExceeded` means some of the tracks are not allocated.
    pub fn mark_tracks_written(
        &self,
        ctx: &ClientContext,
        file: FileIdentifier,
        first: u64,
        count: u64,
    ) -> MfdResult<()> {
        let operation = "mark tracks written";
        ctx.check_deadline(operation)?;
        let (node_arc, slot) = self.node_by_file(file)?;
        let mut batch = Batch::default();
        {
            let mut node = lock(&node_arc);
            let main = node.main_mut(slot, file)?;
            let region = Self::check_track_request(ctx, main, first, count)?;
            if !main.allocations.is_allocated(region) {
                return Err(MfdError::new(
                    MfdErrorKind::QuotaExceeded,
                    format!("{file} tracks {region} are not all allocated"),
                ));
            }
            ctx.check_deadline(operation)?;
            let now = now_seconds();
            if !main.file_flags.written {
                main.file_flags.written = true;
                main.time_of_first_write = now;
            }
            main.highest_track_written = main.highest_track_written.max(region.limit());
            main.last_reference = now;
            self.stage_lead(&mut node, &mut batch);
        }
        self.finish(&node_arc, batch)
    }

    /// Set or clear the guard on a file set.  Clearing it requires the
    /// write key.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown file set; `WrongKey` when clearing
    /// the guard with the wrong write key; `InvalidRequest` for
    /// malformed arguments; `Aborted` when the deadline passes.
    pub fn set_file_guard(
        &self,
        ctx: &ClientContext,
        qualifier: &str,
        filename: &str,
        guarded: bool,
        write_key: &str,
    ) -> MfdResult<()> {
        let operation = "set file guard";
        ctx.check_deadline(operation)?;
        let qualifier = normalize_name("qualifier", qualifier)?;
        let filename = normalize_name("filename", filename)?;
        let write_key = normalize_key(write_key)?;
        let node_arc = self.node_by_name(&qualifier, &filename)?;
        let mut batch = Batch::default();
        {
            let mut node = lock(&node_arc);
            if node.removed {
                return Err(not_found(format!("{qualifier}*{filename} does not exist")));
            }
            if !guarded && !keys_match(&node.lead.write_key, &write_key) {
                return Err(MfdError::new(
                    MfdErrorKind::WrongKey,
                    format!("write key does not match that of {}", node.name()),
                ));
            }
            ctx.check_deadline(operation)?;
            node.lead.guarded = guarded;
            for main in node.mains.iter_mut().flatten() {
                main.inhibit_flags.guarded = guarded;
            }
            event!(
                Level::INFO,
                "{} {}",
                node.name(),
                if guarded { "guarded" } else { "unguarded" }
            );
            self.stage_lead(&mut node, &mut batch);
        }
        self.finish(&node_arc, batch)
    }

    /// Describe a file set.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown file set; `InvalidRequest` for
    /// malformed names; `Aborted` when the deadline passes.
    pub fn get_file_set_info(
        &self,
        ctx: &ClientContext,
        qualifier: &str,
        filename: &str,
    ) -> MfdResult<FileSetInfo> {
        ctx.check_deadline("get file set info")?;
        let qualifier = normalize_name("qualifier", qualifier)?;
        let filename = normalize_name("filename", filename)?;
        let node_arc = self.node_by_name(&qualifier, &filename)?;
        let node = lock(&node_arc);
        if node.removed {
            return Err(not_found(format!("{qualifier}*{filename} does not exist")));
        }
        Ok(node.info())
    }

    /// Describe a file cycle.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown file; `Aborted` when the deadline
    /// passes.
    pub fn get_file_cycle_info(
        &self,
        ctx: &ClientContext,
        file: FileIdentifier,
    ) -> MfdResult<FileCycleInfo> {
        ctx.check_deadline("get file cycle info")?;
        let (node_arc, slot) = self.node_by_file(file)?;
        let node = lock(&node_arc);
        node.main(slot, file).map(FileCycleInfo::from)
    }

    /// Describe every file set, in (qualifier, filename) order.
    ///
    /// # Errors
    ///
    /// `Aborted` when the deadline passes.
    pub fn list_file_sets(&self, ctx: &ClientContext) -> MfdResult<Vec<FileSetInfo>> {
        ctx.check_deadline("list file sets")?;
        let nodes: Vec<Arc<Mutex<LeadNode>>> = {
            let index = read(&self.index);
            index
                .by_name
                .values()
                .filter_map(|handle| index.node(*handle))
                .collect()
        };
        Ok(nodes
            .iter()
            .filter_map(|node_arc| {
                let node = lock(node_arc);
                (!node.removed).then(|| node.info())
            })
            .collect())
    }
}
