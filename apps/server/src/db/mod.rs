//! Database layer - record store trait and its backends

pub mod memory;
pub mod postgres;
pub mod traits;

pub use memory::MemoryRecordStore;
pub use postgres::PostgresRecordStore;
pub use traits::{BedAssignmentOutcome, RecordStore};

use crate::Error;

/// Automatic bed numbering ran past the largest representable number.
pub(crate) fn no_bed_number_left() -> Error {
    Error::Conflict("No bed number left to assign; give bedNo explicitly".to_string())
}
