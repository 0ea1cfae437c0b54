//! Patient record domain model
//!
//! This crate holds the typed shape of a patient record and the pure rules
//! that operate on it. It performs no I/O: storage, hashing and transport
//! live in the server crate.
//!
//! # Module Organization
//!
//! - `mrn`: medical record number type and generator
//! - `collection`: the sub-collections of a record and their metadata
//! - `entries`: typed entry structs, one per collection
//! - `merge`: decode/validate and shallow patch-merge of entries
//! - `patient`: demographics, registration and update payloads
//! - `account`: sign-in and password reset payloads
//! - `bed`: bed inventory model
//!
//! # Example
//!
//! ```rust
//! use carebase_records::{decode_entry, entries::VitalSigns, Collection, Entry};
//! use serde_json::json;
//!
//! let vitals: VitalSigns = decode_entry(json!({
//!     "bloodPressure": "120/80",
//!     "heartRate": 72
//! }))
//! .unwrap();
//!
//! assert_eq!(vitals.heart_rate, Some(72));
//! assert_eq!(VitalSigns::COLLECTION, Collection::VitalSigns);
//! ```

pub mod account;
pub mod bed;
pub mod collection;
pub mod entries;
pub mod error;
pub mod merge;
pub mod mrn;
pub mod patient;

pub use bed::{Bed, BedStatus, NewBed};
pub use collection::Collection;
pub use entries::Entry;
pub use error::{RecordError, Result};
pub use merge::{decode_entry, encode_entry, merge_entry, MergeOutcome};
pub use mrn::MedicalRecordNumber;
