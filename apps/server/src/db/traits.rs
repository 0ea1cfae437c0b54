//! Core trait for patient record storage backends

use crate::{
    models::{PatientRecord, StoredEntry},
    Result,
};
use async_trait::async_trait;
use carebase_records::{patient::PatientProfile, Bed, BedStatus, Collection, NewBed};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value as JsonValue};
use uuid::Uuid;

/// Result of an attempt to put a patient in a bed.
#[derive(Debug, Clone, PartialEq)]
pub enum BedAssignmentOutcome {
    /// The bed is now occupied by the patient; `released` is the bed the
    /// patient held before, now available again.
    Assigned { bed: Bed, released: Option<i32> },
    PatientNotFound,
    BedNotFound,
    /// The bed exists but is not available.
    BedUnavailable(BedStatus),
}

/// Storage trait for patient records, their sub-collections and beds
///
/// Implementations must enforce uniqueness of the medical record number and
/// of the contact email, and report violations as
/// [`Error::Duplicate`](crate::Error::Duplicate) so callers can tell the two
/// apart. Deleting a patient removes every entry it owns.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Persist a new patient record
    ///
    /// # Errors
    /// * `Duplicate(MedicalRecordNumber)` - The generated MRN is taken
    /// * `Duplicate(Email)` - A record with the same contact email exists
    async fn insert_patient(&self, record: &PatientRecord) -> Result<()>;

    /// Read a patient by system identifier
    ///
    /// # Returns
    /// * `Ok(Some(record))` - Record found
    /// * `Ok(None)` - No such record
    async fn find_patient(&self, id: Uuid) -> Result<Option<PatientRecord>>;

    /// Read a patient by medical record number
    async fn find_patient_by_mrn(&self, mrn: &str) -> Result<Option<PatientRecord>>;

    /// Read a patient by contact email (compared case-insensitively)
    async fn find_patient_by_email(&self, email: &str) -> Result<Option<PatientRecord>>;

    /// All patients, oldest first
    async fn list_patients(&self) -> Result<Vec<PatientRecord>>;

    /// Replace the demographic profile
    ///
    /// Credential and reset-token state are not written, so a profile edit
    /// racing a password reset cannot undo it.
    ///
    /// # Returns
    /// `false` when the record does not exist
    async fn update_profile(&self, id: Uuid, profile: &PatientProfile) -> Result<bool>;

    /// Store the digest of a freshly issued reset token, replacing any
    /// earlier one
    ///
    /// # Returns
    /// `false` when the record does not exist
    async fn set_reset_token(
        &self,
        id: Uuid,
        token_digest: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool>;

    /// Swap in a new credential and spend the reset token, in one step
    ///
    /// Only succeeds while `token_digest` is the outstanding token and it
    /// has not expired at `now`.
    ///
    /// # Returns
    /// `false` when the record does not exist or the token is not redeemable
    async fn redeem_reset_token(
        &self,
        id: Uuid,
        token_digest: &str,
        now: DateTime<Utc>,
        credential_hash: &str,
    ) -> Result<bool>;

    /// Remove a patient and everything it owns, freeing the bed they held
    ///
    /// # Returns
    /// `false` when the record does not exist
    async fn delete_patient(&self, id: Uuid) -> Result<bool>;

    /// Append an entry to a sub-collection, initialising the collection on
    /// first use
    ///
    /// # Arguments
    /// * `patient_id` - Owning patient (must exist)
    /// * `collection` - Target sub-collection
    /// * `entry` - Entry with its freshly assigned id
    async fn append_entry(
        &self,
        patient_id: Uuid,
        collection: Collection,
        entry: &StoredEntry,
    ) -> Result<()>;

    /// Entries of a sub-collection in insertion order
    ///
    /// # Returns
    /// * `Ok(Some(entries))` - The collection has been initialised (may be empty)
    /// * `Ok(None)` - Nothing was ever appended to it
    async fn list_entries(
        &self,
        patient_id: Uuid,
        collection: Collection,
    ) -> Result<Option<Vec<StoredEntry>>>;

    /// Read one entry by its identifier
    async fn get_entry(
        &self,
        patient_id: Uuid,
        collection: Collection,
        entry_id: Uuid,
    ) -> Result<Option<StoredEntry>>;

    /// Apply a field-level change to one entry
    ///
    /// Only the named keys are written: `set` overwrites, `removed` drops.
    /// Other fields of the stored entry are untouched, so concurrent updates
    /// of different fields do not clobber each other.
    ///
    /// # Returns
    /// The entry as stored after the change, or `None` if it does not exist
    async fn merge_entry(
        &self,
        patient_id: Uuid,
        collection: Collection,
        entry_id: Uuid,
        set: &Map<String, JsonValue>,
        removed: &[String],
    ) -> Result<Option<StoredEntry>>;

    /// Delete one entry
    ///
    /// # Returns
    /// `false` when the entry does not exist
    async fn remove_entry(
        &self,
        patient_id: Uuid,
        collection: Collection,
        entry_id: Uuid,
    ) -> Result<bool>;

    /// Push a payment onto `paymentHistory` of a billing entry
    ///
    /// # Returns
    /// The updated billing entry, or `None` if it does not exist
    async fn append_payment(
        &self,
        patient_id: Uuid,
        entry_id: Uuid,
        payment: JsonValue,
    ) -> Result<Option<StoredEntry>>;

    /// Add a bed; the number is assigned when the payload leaves it out
    ///
    /// # Errors
    /// * `Duplicate(BedNumber)` - The given number is already in use
    /// * `Conflict` - No number is left above the highest one in use
    async fn insert_bed(&self, bed: &NewBed) -> Result<Bed>;

    /// Beds ordered by number, optionally filtered by status
    async fn list_beds(&self, status: Option<BedStatus>) -> Result<Vec<Bed>>;

    /// Change a bed's status
    ///
    /// Taking a bed out of `occupied` also unassigns the patient in it.
    ///
    /// # Returns
    /// The updated bed, or `None` if it does not exist
    async fn set_bed_status(&self, bed_no: i32, status: BedStatus) -> Result<Option<Bed>>;

    /// Occupy an available bed for a patient and release the bed they held
    ///
    /// Must be atomic with respect to other assignments of the same bed.
    async fn assign_bed(&self, patient_id: Uuid, bed_no: i32) -> Result<BedAssignmentOutcome>;
}
