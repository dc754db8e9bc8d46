//! The `base` crate defines the 36-bit machine word and the things
//! which every other part of the executive needs in order to move
//! words around: sub-word access, ones-complement arithmetic,
//! character packing and the packed byte format used on disk and
//! tape.  It has no dependency on the assembler or the executive.

mod error;
mod onescomplement;
mod word36;

pub mod buffer;
pub mod charset;
pub mod prelude;
pub mod subword;

pub use crate::error::{ConversionFailed, PackingError};
pub use crate::onescomplement::{sign_extend_12, sign_extend_18, sign_extend_24, Sign};
pub use crate::word36::Word36;

#[macro_export]
macro_rules! w36 {
    ($n:expr) => {
        $crate::prelude::Word36::from_const::<{ $n }>()
    };
}
