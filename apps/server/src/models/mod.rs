//! Storage-side models for the patient record server

pub mod entry;
pub mod patient;

pub use entry::StoredEntry;
pub use patient::{PatientRecord, PatientSummary};
