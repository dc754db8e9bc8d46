/// Sizing parameters for a Master File Directory and the pack whose
/// space it manages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MfdConfiguration {
    /// The number of tracks on the pack.
    pub pack_tracks: u64,
    pub words_per_track: u64,
    /// The number of tracks in a position-granularity granule.
    pub tracks_per_position: u64,
    /// The maximum F-cycle range given to a new file set when the
    /// caller does not specify one.
    pub default_max_range: u32,
}

/// The size of a disk track.
pub const WORDS_PER_TRACK: u64 = 1792;

/// The number of tracks in a position.
pub const TRACKS_PER_POSITION: u64 = 64;

impl Default for MfdConfiguration {
    fn default() -> MfdConfiguration {
        MfdConfiguration {
            pack_tracks: 10_000,
            words_per_track: WORDS_PER_TRACK,
            tracks_per_position: TRACKS_PER_POSITION,
            default_max_range: 32,
        }
    }
}
