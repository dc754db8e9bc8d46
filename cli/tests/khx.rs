use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use exec::{
    ClientContext, ClientIdentifier, CycleSpecifier, Granularity, MasterFileDirectory,
    MemoryMedium, MfdConfiguration, TemporaryFileRequest,
};

fn khx(args: &[&Path]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_khx"))
        .arg("--log-level=silent")
        .args(args)
        .output()
        .expect("should be able to run khx")
}

fn temp_file(suffix: &str) -> tempfile::TempPath {
    tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .expect("should be able to create a temporary file")
        .into_temp_path()
}

fn stdout_of(output: &Output) -> String {
    assert!(
        output.status.success(),
        "khx failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn pack_then_unpack() {
    let text = temp_file(".txt");
    let packed = temp_file(".bin");
    let unpacked = temp_file(".txt");
    fs::write(&text, "0123456712345 076543210000\n").expect("write input");

    stdout_of(&khx(&[Path::new("pack"), &text, &packed]));
    let bytes = fs::read(&packed).expect("read packed output");
    assert_eq!(
        bytes,
        vec![0x29, 0xCB, 0xB9, 0x4E, 0x51, 0xF5, 0x8D, 0x10, 0x00]
    );

    stdout_of(&khx(&[Path::new("unpack"), &packed, &unpacked]));
    assert_eq!(
        fs::read_to_string(&unpacked).expect("read unpacked output"),
        "0123456712345\n0076543210000\n"
    );
}

#[test]
fn pack_rejects_bad_text() {
    let text = temp_file(".txt");
    let packed = temp_file(".bin");
    fs::write(&text, "017 HELLO\n").expect("write input");
    let output = khx(&[Path::new("pack"), &text, &packed]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("position 4"));
}

#[test]
fn unpack_rejects_partial_blocks() {
    let packed = temp_file(".bin");
    let unpacked = temp_file(".txt");
    fs::write(&packed, [0_u8; 10]).expect("write input");
    let output = khx(&[Path::new("unpack"), &packed, &unpacked]);
    assert!(!output.status.success());
}

#[test]
fn scan_lists_lexemes() {
    let source = temp_file(".tx");
    fs::write(&source, "START, 017 . comment\n").expect("write input");
    let listing = stdout_of(&khx(&[Path::new("scan"), &source]));
    let lines: Vec<&str> = listing.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("0..5\tsymbol START"));
    assert!(lines[1].starts_with("5..6\tpunctuation"));
    assert!(lines[2].starts_with("7..10\tinteger 15"));
}

#[test]
fn list_directory_image() {
    let medium = MemoryMedium::new(32);
    let config = MfdConfiguration {
        pack_tracks: 200,
        ..MfdConfiguration::default()
    };
    let mfd = MasterFileDirectory::initialize(config, Box::new(medium.clone()))
        .expect("medium should initialize");
    let ctx = ClientContext::new(ClientIdentifier::new(1, "RUN", "USER"));
    mfd.create_temporary_disk_file(
        &ctx,
        &TemporaryFileRequest {
            qualifier: "SYS$".to_string(),
            filename: "SCRATCH".to_string(),
            cycle: CycleSpecifier::Unspecified,
            granularity: Granularity::Track,
            initial_reserve: 12,
            max_granules: 40,
        },
    )
    .expect("file should be created");

    let image = temp_file(".img");
    fs::write(&image, medium.to_image()).expect("write image");
    let listing = stdout_of(&khx(&[
        Path::new("list-directory"),
        Path::new("--pack-tracks=200"),
        &image,
    ]));
    assert!(listing.contains("SYS$*SCRATCH mass storage range 1/32 cycles 1"));
    assert!(listing.contains("(1) live"));
    assert!(listing.contains("188 tracks free"));
}
