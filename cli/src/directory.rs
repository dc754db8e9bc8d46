//! Describing the contents of a directory image.
use std::io::Write;
use std::path::PathBuf;

use tracing::{event, Level};

use exec::{
    ClientContext, ClientIdentifier, FileSetInfo, MasterFileDirectory, MemoryMedium,
    MfdConfiguration,
};

use super::{read_file, Fail};

fn describe(set: &FileSetInfo) -> String {
    let mut text = format!(
        "{}*{} {} range {}/{} cycles {}",
        set.qualifier,
        set.filename,
        set.file_type,
        set.current_range,
        set.max_range,
        set.cycle_count
    );
    if set.guarded {
        text.push_str(" guarded");
    }
    for cycle in &set.cycles {
        text.push_str(&format!(
            "\n  ({}) {} {}",
            cycle.absolute_cycle, cycle.state, cycle.file_id
        ));
    }
    text
}

pub(crate) fn list<W: Write>(image: &PathBuf, pack_tracks: u64, out: &mut W) -> Result<(), Fail> {
    let bytes = read_file(image)?;
    let medium = MemoryMedium::from_image(bytes)?;
    let config = MfdConfiguration {
        pack_tracks,
        ..MfdConfiguration::default()
    };
    // Recovery rewrites the records, but only in this in-memory copy.
    let mfd = MasterFileDirectory::recover(config, Box::new(medium))?;
    let ctx = ClientContext::new(ClientIdentifier::new(0, "KHX", "OPERATOR"));
    let sets = mfd.list_file_sets(&ctx)?;
    event!(Level::INFO, "{} holds {} file sets", image.display(), sets.len());
    let write_failed = |error| Fail::Io {
        path: PathBuf::from("-"),
        error,
    };
    for set in &sets {
        writeln!(out, "{}", describe(set)).map_err(write_failed)?;
    }
    writeln!(out, "{} tracks free", mfd.free_tracks()).map_err(write_failed)?;
    Ok(())
}
