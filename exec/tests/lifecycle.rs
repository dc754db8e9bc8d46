use exec::*;

fn context(run: &str) -> ClientContext {
    ClientContext::new(ClientIdentifier::new(1, run, "OPERATOR"))
}

fn small_pack() -> MfdConfiguration {
    MfdConfiguration {
        pack_tracks: 1000,
        ..MfdConfiguration::default()
    }
}

fn temporary(qualifier: &str, filename: &str, reserve: u64, max: u64) -> TemporaryFileRequest {
    TemporaryFileRequest {
        qualifier: qualifier.to_string(),
        filename: filename.to_string(),
        cycle: CycleSpecifier::Relative(1),
        granularity: Granularity::Track,
        initial_reserve: reserve,
        max_granules: max,
    }
}

fn tape(filename: &str, cycle: CycleSpecifier, max_cycles: u32) -> TapeCycleRequest {
    TapeCycleRequest {
        qualifier: "TAPES".to_string(),
        filename: filename.to_string(),
        cycle,
        read_key: String::new(),
        write_key: "WK".to_string(),
        max_cycles,
    }
}

fn kind<T>(result: MfdResult<T>) -> Result<T, MfdErrorKind> {
    result.map_err(|e| e.kind)
}

#[test]
fn temporary_file_lifecycle() {
    let mfd = MasterFileDirectory::new(small_pack());
    let a = context("RUNA");
    let fid = mfd
        .create_temporary_disk_file(&a, &temporary("Q", "F", 10, 100))
        .expect("file should be created");
    assert_eq!(mfd.free_tracks(), 990);

    assert_eq!(kind(mfd.allocate_tracks(&a, fid, 0, 10)), Ok(()));
    // The initial reserve already covered these tracks.
    assert_eq!(mfd.free_tracks(), 990);
    assert_eq!(
        kind(mfd.allocate_tracks(&a, fid, 10, 95)),
        Err(MfdErrorKind::QuotaExceeded)
    );
    assert_eq!(mfd.free_tracks(), 990);

    assert_eq!(kind(mfd.release_file(&a, fid)), Ok(()));
    assert_eq!(
        kind(mfd.allocate_tracks(&a, fid, 0, 10)),
        Err(MfdErrorKind::NotAssigned)
    );
    // A temporary file stays cataloged after it is released.
    let info = mfd.get_file_cycle_info(&a, fid).expect("cycle still exists");
    assert_eq!(info.state, CycleState::Live);
    assert_eq!(info.assigned_indicator, 0);
}

#[test]
fn allocation_updates_granules() {
    let mfd = MasterFileDirectory::new(small_pack());
    let a = context("RUNA");
    let fid = mfd
        .create_temporary_disk_file(&a, &temporary("Q", "GROW", 2, 50))
        .expect("file should be created");
    mfd.allocate_tracks(&a, fid, 20, 5)
        .expect("tracks 20..25 are within quota");
    let info = mfd.get_file_cycle_info(&a, fid).expect("cycle exists");
    assert_eq!(info.highest_granule_assigned, 25);
    assert_eq!(
        info.extents.iter().map(|extent| extent.count).sum::<u64>(),
        7
    );
    assert_eq!(mfd.free_tracks(), 993);

    // Asking again for tracks already held takes nothing more.
    mfd.allocate_tracks(&a, fid, 21, 2)
        .expect("reallocation is harmless");
    assert_eq!(mfd.free_tracks(), 993);

    assert_eq!(
        kind(mfd.allocate_tracks(&a, fid, 0, 0)),
        Err(MfdErrorKind::InvalidRequest)
    );
}

#[test]
fn position_granularity_counts_positions() {
    let mfd = MasterFileDirectory::new(MfdConfiguration {
        pack_tracks: 1000,
        tracks_per_position: 64,
        ..MfdConfiguration::default()
    });
    let a = context("RUNA");
    let request = TemporaryFileRequest {
        granularity: Granularity::Position,
        ..temporary("Q", "POS", 1, 2)
    };
    let fid = mfd
        .create_temporary_disk_file(&a, &request)
        .expect("file should be created");
    assert_eq!(mfd.free_tracks(), 1000 - 64);
    mfd.allocate_tracks(&a, fid, 100, 28)
        .expect("tracks 100..128 lie in the second position");
    assert_eq!(
        kind(mfd.allocate_tracks(&a, fid, 128, 1)),
        Err(MfdErrorKind::QuotaExceeded)
    );
}

#[test]
fn full_pack_is_reported() {
    let mfd = MasterFileDirectory::new(MfdConfiguration {
        pack_tracks: 10,
        ..MfdConfiguration::default()
    });
    let a = context("RUNA");
    assert_eq!(
        kind(mfd.create_temporary_disk_file(&a, &temporary("Q", "BIG", 11, 20))),
        Err(MfdErrorKind::QuotaExceeded)
    );
    let fid = mfd
        .create_temporary_disk_file(&a, &temporary("Q", "SMALL", 4, 20))
        .expect("file should be created");
    assert_eq!(
        kind(mfd.allocate_tracks(&a, fid, 4, 7)),
        Err(MfdErrorKind::QuotaExceeded)
    );
    assert_eq!(mfd.free_tracks(), 6);
    let info = mfd.get_file_cycle_info(&a, fid).expect("cycle exists");
    assert_eq!(info.highest_granule_assigned, 4);
    assert_eq!(info.extents.iter().map(|e| e.count).sum::<u64>(), 4);
    // Two gaps which together take the rest of the pack.
    mfd.allocate_tracks(&a, fid, 8, 2)
        .expect("allocation should succeed");
    mfd.allocate_tracks(&a, fid, 4, 6)
        .expect("allocation should succeed");
    assert_eq!(mfd.free_tracks(), 0);
    let info = mfd.get_file_cycle_info(&a, fid).expect("cycle exists");
    assert_eq!(info.highest_granule_assigned, 10);
    assert_eq!(info.extents.iter().map(|e| e.count).sum::<u64>(), 10);
    assert_eq!(
        kind(mfd.create_temporary_disk_file(&a, &temporary("Q", "NONE", 3, 2))),
        Err(MfdErrorKind::QuotaExceeded)
    );
}

#[test]
fn written_tracks_are_recorded() {
    let mfd = MasterFileDirectory::new(small_pack());
    let a = context("RUNA");
    let fid = mfd
        .create_temporary_disk_file(&a, &temporary("Q", "W", 4, 10))
        .expect("file should be created");
    assert_eq!(
        kind(mfd.mark_tracks_written(&a, fid, 3, 2)),
        Err(MfdErrorKind::QuotaExceeded)
    );
    mfd.mark_tracks_written(&a, fid, 1, 3)
        .expect("tracks 1..4 are allocated");
    let info = mfd.get_file_cycle_info(&a, fid).expect("cycle exists");
    assert!(info.file_flags.written);
    assert_eq!(info.highest_track_written, 4);
}

#[test]
fn deletion_waits_for_last_release() {
    let mfd = MasterFileDirectory::new(small_pack());
    let a = context("RUNA");
    let b = context("RUNB");
    let c = context("RUNC");
    let fid = mfd
        .create_temporary_disk_file(&a, &temporary("Q", "SHARED", 5, 10))
        .expect("file should be created");
    let assigned = mfd
        .assign_file_cycle(&b, "Q", "SHARED", CycleSpecifier::Unspecified, "")
        .expect("B can assign the file");
    assert_eq!(assigned, fid);

    assert_eq!(kind(mfd.delete_file_cycle(&a, "Q", "SHARED", CycleSpecifier::Unspecified, "")), Ok(()));
    let info = mfd.get_file_cycle_info(&a, fid).expect("cycle still exists");
    assert_eq!(info.state, CycleState::Dropping);
    assert!(info.descriptor_flags.to_be_dropped);

    assert_eq!(
        kind(mfd.assign_file_cycle(&c, "Q", "SHARED", CycleSpecifier::Unspecified, "")),
        Err(MfdErrorKind::NotFound)
    );
    // B's use of the file carries on.
    mfd.allocate_tracks(&b, fid, 0, 8)
        .expect("B still has the file assigned");

    mfd.release_file(&a, fid).expect("A releases");
    assert!(mfd.get_file_cycle_info(&a, fid).is_ok());
    mfd.release_file(&b, fid).expect("B releases");
    assert_eq!(
        kind(mfd.get_file_cycle_info(&a, fid)),
        Err(MfdErrorKind::NotFound)
    );
    assert_eq!(
        kind(mfd.get_file_set_info(&a, "Q", "SHARED")),
        Err(MfdErrorKind::NotFound)
    );
    assert_eq!(mfd.free_tracks(), 1000);
}

#[test]
fn unassigned_cycle_is_dropped_at_once() {
    let mfd = MasterFileDirectory::new(small_pack());
    let a = context("RUNA");
    let fid = mfd
        .create_temporary_disk_file(&a, &temporary("Q", "GONE", 5, 10))
        .expect("file should be created");
    mfd.release_file(&a, fid).expect("A releases");
    mfd.delete_file_cycle(&a, "Q", "GONE", CycleSpecifier::Relative(0), "")
        .expect("delete succeeds");
    assert_eq!(
        kind(mfd.release_file(&a, fid)),
        Err(MfdErrorKind::NotFound)
    );
    assert_eq!(mfd.free_tracks(), 1000);
}

#[test]
fn tape_cycle_is_cataloged_on_release() {
    let mfd = MasterFileDirectory::new(small_pack());
    let a = context("RUNA");
    let b = context("RUNB");
    let fid = mfd
        .create_tape_file_cycle(&a, &tape("REEL", CycleSpecifier::Unspecified, 0))
        .expect("cycle should be created");
    let set = mfd
        .get_file_set_info(&a, "TAPES", "REEL")
        .expect("file set exists");
    assert!(set.plus_one_exists);
    assert_eq!(set.cycle_count, 0);
    assert_eq!(set.max_range, 32);

    // Nobody else can see a cycle that is still being cataloged.
    assert_eq!(
        kind(mfd.assign_file_cycle(&b, "TAPES", "REEL", CycleSpecifier::Absolute(1), "")),
        Err(MfdErrorKind::NotFound)
    );
    assert_eq!(
        kind(mfd.catalog_file_cycle(&b, fid)),
        Err(MfdErrorKind::NotAssigned)
    );

    mfd.release_file(&a, fid).expect("A releases");
    let set = mfd
        .get_file_set_info(&a, "TAPES", "REEL")
        .expect("file set exists");
    assert!(!set.plus_one_exists);
    assert_eq!(set.cycle_count, 1);
    let info = mfd.get_file_cycle_info(&a, fid).expect("cycle exists");
    assert_eq!(info.state, CycleState::Live);
    assert!(info.descriptor_flags.tape);
    assert!(!info.descriptor_flags.to_be_cataloged);
    assert_eq!(
        mfd.assign_file_cycle(&b, "TAPES", "REEL", CycleSpecifier::Absolute(1), ""),
        Ok(fid)
    );
}

#[test]
fn aborted_cycle_disappears() {
    let mfd = MasterFileDirectory::new(small_pack());
    let a = context("RUNA");
    let first = mfd
        .create_tape_file_cycle(&a, &tape("T", CycleSpecifier::Unspecified, 0))
        .expect("cycle should be created");
    mfd.catalog_file_cycle(&a, first).expect("catalog succeeds");
    assert_eq!(
        kind(mfd.catalog_file_cycle(&a, first)),
        Err(MfdErrorKind::InvalidRequest)
    );
    let second = mfd
        .create_tape_file_cycle(&a, &tape("T", CycleSpecifier::Relative(1), 0))
        .expect("+1 cycle should be created");
    assert_eq!(
        kind(mfd.create_tape_file_cycle(&a, &tape("T", CycleSpecifier::Relative(1), 0))),
        Err(MfdErrorKind::AlreadyExists)
    );
    mfd.abort_file_cycle(&a, second).expect("abort succeeds");
    let set = mfd.get_file_set_info(&a, "TAPES", "T").expect("file set exists");
    assert_eq!(set.cycles.len(), 1);
    assert!(!set.plus_one_exists);
}

#[test]
fn cycle_window_is_enforced() {
    let mfd = MasterFileDirectory::new(small_pack());
    let a = context("RUNA");
    for _ in 0..3 {
        let fid = mfd
            .create_tape_file_cycle(&a, &tape("LOG", CycleSpecifier::Unspecified, 3))
            .expect("cycle should be created");
        mfd.release_file(&a, fid).expect("release catalogs the cycle");
    }
    assert_eq!(
        kind(mfd.create_tape_file_cycle(&a, &tape("LOG", CycleSpecifier::Unspecified, 3))),
        Err(MfdErrorKind::RangeExceeded)
    );
    mfd.delete_file_cycle(&a, "LOG", "TAPES", CycleSpecifier::Absolute(1), "WK")
        .expect_err("qualifier and filename are the other way around");
    mfd.delete_file_cycle(&a, "TAPES", "LOG", CycleSpecifier::Absolute(1), "WK")
        .expect("oldest cycle deleted");
    let fid = mfd
        .create_tape_file_cycle(&a, &tape("LOG", CycleSpecifier::Unspecified, 3))
        .expect("window has room again");
    let info = mfd.get_file_cycle_info(&a, fid).expect("cycle exists");
    assert_eq!(info.absolute_cycle, 4);
    let set = mfd.get_file_set_info(&a, "TAPES", "LOG").expect("file set exists");
    assert!(set.current_range <= set.max_range);
    assert_eq!(set.cycle_count, 2);
}

#[test]
fn keys_and_guard_are_checked() {
    let mfd = MasterFileDirectory::new(small_pack());
    let a = context("RUNA");
    let fid = mfd
        .create_tape_file_cycle(&a, &tape("SECRET", CycleSpecifier::Unspecified, 0))
        .expect("cycle should be created");
    mfd.release_file(&a, fid).expect("release catalogs the cycle");

    assert_eq!(
        kind(mfd.delete_file_cycle(&a, "TAPES", "SECRET", CycleSpecifier::Unspecified, "XX")),
        Err(MfdErrorKind::WrongKey)
    );
    mfd.set_file_guard(&a, "TAPES", "SECRET", true, "")
        .expect("anyone may set the guard");
    assert_eq!(
        kind(mfd.delete_file_cycle(&a, "TAPES", "SECRET", CycleSpecifier::Unspecified, "WK")),
        Err(MfdErrorKind::Guarded)
    );
    assert_eq!(
        kind(mfd.set_file_guard(&a, "TAPES", "SECRET", false, "")),
        Err(MfdErrorKind::WrongKey)
    );
    let info = mfd.get_file_cycle_info(&a, fid).expect("cycle exists");
    assert!(info.inhibit_flags.guarded);
    mfd.set_file_guard(&a, "TAPES", "SECRET", false, "wk")
        .expect("keys are not case sensitive");
    mfd.delete_file_cycle(&a, "TAPES", "SECRET", CycleSpecifier::Unspecified, "WK")
        .expect("delete succeeds");
}

#[test]
fn file_types_do_not_mix() {
    let mfd = MasterFileDirectory::new(small_pack());
    let a = context("RUNA");
    let tape_fid = mfd
        .create_tape_file_cycle(&a, &tape("MIXED", CycleSpecifier::Unspecified, 0))
        .expect("cycle should be created");
    assert_eq!(
        kind(mfd.allocate_tracks(&a, tape_fid, 0, 1)),
        Err(MfdErrorKind::WrongFileType)
    );
    assert_eq!(
        kind(mfd.create_temporary_disk_file(&a, &temporary("TAPES", "MIXED", 0, 1))),
        Err(MfdErrorKind::WrongFileType)
    );
}

#[test]
fn release_all_files_releases_everything_held() {
    let mfd = MasterFileDirectory::new(small_pack());
    let a = context("RUNA");
    let b = context("RUNB");
    let mut files = Vec::new();
    for name in ["ZED", "ALPHA", "MID"] {
        files.push(
            mfd.create_temporary_disk_file(&a, &temporary("Q", name, 1, 5))
                .expect("file should be created"),
        );
    }
    mfd.assign_file_cycle(&a, "Q", "MID", CycleSpecifier::Unspecified, "")
        .expect("second assignment");
    let other = mfd
        .create_temporary_disk_file(&b, &temporary("Q", "B", 1, 5))
        .expect("file should be created");

    assert_eq!(mfd.release_all_files(&a), Ok(3));
    for fid in files {
        let info = mfd.get_file_cycle_info(&a, fid).expect("cycle exists");
        assert_eq!(info.assigned_indicator, 0);
    }
    let info = mfd.get_file_cycle_info(&b, other).expect("cycle exists");
    assert_eq!(info.assigned_indicator, 1);
    assert_eq!(mfd.release_all_files(&a), Ok(0));
}

#[test]
fn names_are_validated() {
    let mfd = MasterFileDirectory::new(small_pack());
    let a = context("RUNA");
    assert_eq!(
        kind(mfd.create_temporary_disk_file(&a, &temporary("Q", "NAME-TOO-LONG", 0, 1))),
        Err(MfdErrorKind::InvalidRequest)
    );
    assert_eq!(
        kind(mfd.create_tape_file_cycle(&a, &tape("T", CycleSpecifier::Absolute(1000), 0))),
        Err(MfdErrorKind::InvalidRequest)
    );
    let fid = mfd
        .create_temporary_disk_file(&a, &temporary("sys$", "lower", 0, 1))
        .expect("names are folded to upper case");
    let listing = mfd.list_file_sets(&a).expect("no deadline");
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0].qualifier, "SYS$");
    assert_eq!(listing[0].filename, "LOWER");
    assert_eq!(listing[0].cycles[0].file_id, fid);
}
