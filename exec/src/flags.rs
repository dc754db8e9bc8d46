//! Flag fields stored in MFD control records.
//!
//! Each flag set occupies a small field (six or twelve bits) of a
//! main item word.  `compose` builds the field value and `extract`
//! decodes one; bits not assigned to any flag are ignored on
//! extraction.
use serde::Serialize;

/// Define a flag set whose flags each own a single bit of the field.
macro_rules! flag_set {
    (
        $(#[$meta:meta])*
        $name:ident { $( $(#[$fmeta:meta])* $field:ident = $bit:expr ),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
        pub struct $name {
            $( $(#[$fmeta])* pub $field: bool, )+
        }

        impl $name {
            #[must_use]
            pub const fn compose(&self) -> u64 {
                let mut value: u64 = 0;
                $(
                    if self.$field {
                        value |= $bit;
                    }
                )+
                value
            }

            #[must_use]
            pub const fn extract(field: u64) -> $name {
                $name {
                    $( $field: field & $bit != 0, )+
                }
            }
        }
    };
}

flag_set! {
    /// Descriptor flags (twelve bits) of main item sector 0.
    DescriptorFlags {
        unloaded = 0o4000,
        backed_up = 0o2000,
        save_on_checkpoint = 0o1000,
        to_be_cataloged = 0o0100,
        tape = 0o0040,
        removable = 0o0010,
        write_only = 0o0004,
        read_only = 0o0002,
        to_be_dropped = 0o0001,
    }
}

flag_set! {
    /// Inhibit flags (six bits).
    InhibitFlags {
        guarded = 0o40,
        unload_inhibited = 0o20,
        private = 0o10,
        exclusive = 0o04,
        write_only = 0o02,
        read_only = 0o01,
    }
}

flag_set! {
    /// File flags (six bits).
    FileFlags {
        large = 0o40,
        written = 0o02,
    }
}

/// Disable flags (six bits).  Any cycle with a disable flag set has
/// the top bit of the field set as well.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct DisableFlags {
    pub directory_error: bool,
    pub assigned_written_at_stop: bool,
    pub inaccessible_backup: bool,
    pub cache_drain_failure: bool,
}

const DISABLED: u64 = 0o40;

impl DisableFlags {
    #[must_use]
    pub const fn compose(&self) -> u64 {
        let mut value: u64 = 0;
        if self.directory_error {
            value |= DISABLED | 0o20;
        }
        if self.assigned_written_at_stop {
            value |= DISABLED | 0o10;
        }
        if self.inaccessible_backup {
            value |= DISABLED | 0o04;
        }
        if self.cache_drain_failure {
            value |= DISABLED | 0o02;
        }
        value
    }

    #[must_use]
    pub const fn extract(field: u64) -> DisableFlags {
        DisableFlags {
            directory_error: field & 0o20 != 0,
            assigned_written_at_stop: field & 0o10 != 0,
            inaccessible_backup: field & 0o04 != 0,
            cache_drain_failure: field & 0o02 != 0,
        }
    }

    #[must_use]
    pub const fn any(&self) -> bool {
        self.compose() != 0
    }
}

/// The unit of mass-storage allocation for a file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum Granularity {
    #[default]
    Track,
    Position,
}

/// Physical characteristics (six bits).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct PcharFlags {
    pub granularity: Granularity,
    pub word_addressable: bool,
}

impl PcharFlags {
    #[must_use]
    pub const fn compose(&self) -> u64 {
        let mut value: u64 = 0;
        if matches!(self.granularity, Granularity::Position) {
            value |= 0o40;
        }
        if self.word_addressable {
            value |= 0o10;
        }
        value
    }

    #[must_use]
    pub const fn extract(field: u64) -> PcharFlags {
        PcharFlags {
            granularity: if field & 0o40 != 0 {
                Granularity::Position
            } else {
                Granularity::Track
            },
            word_addressable: field & 0o10 != 0,
        }
    }
}
