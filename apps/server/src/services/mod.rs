//! Business logic layer
//!
//! Services sit between the HTTP handlers and the [`RecordStore`]. They
//! own validation, existence checks and the translation of store outcomes
//! into the error taxonomy.

pub mod accounts;
pub mod beds;
pub mod entries;
pub mod patients;

pub use accounts::{AccountService, Session};
pub use beds::BedService;
pub use entries::EntryService;
pub use patients::PatientService;

use uuid::Uuid;

use crate::{db::RecordStore, models::PatientRecord, Error, Result};

/// Existence guard: every operation addressing a record goes through here
/// before touching anything it owns.
pub(crate) async fn require_patient(store: &dyn RecordStore, id: Uuid) -> Result<PatientRecord> {
    store
        .find_patient(id)
        .await?
        .ok_or_else(|| Error::not_found("Patient"))
}
