//! In-memory record store for development and tests.
//!
//! Mirrors the PostgreSQL store's observable behaviour, uniqueness
//! constraints included. Nothing survives a restart.

use async_trait::async_trait;
use carebase_records::{
    bed::next_bed_number,
    patient::{normalize_email, PatientProfile},
    Bed, BedStatus, Collection, NewBed,
};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value as JsonValue};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    no_bed_number_left,
    traits::{BedAssignmentOutcome, RecordStore},
};
use crate::{
    credentials::digests_match,
    error::UniqueKey,
    models::{PatientRecord, StoredEntry},
    Error, Result,
};

#[derive(Default)]
struct State {
    patients: HashMap<Uuid, PatientRecord>,
    /// Insertion order for listing.
    patient_order: Vec<Uuid>,
    /// Present once a collection has received its first entry.
    entries: HashMap<(Uuid, Collection), Vec<StoredEntry>>,
    beds: BTreeMap<i32, Bed>,
}

impl State {
    fn entries_mut(
        &mut self,
        patient_id: Uuid,
        collection: Collection,
    ) -> Option<&mut Vec<StoredEntry>> {
        self.entries.get_mut(&(patient_id, collection))
    }

    fn release_bed(&mut self, bed_no: i32) {
        if let Some(bed) = self.beds.get_mut(&bed_no) {
            if bed.status == BedStatus::Occupied {
                bed.status = BedStatus::Available;
            }
        }
    }
}

#[derive(Default)]
pub struct MemoryRecordStore {
    state: RwLock<State>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn insert_patient(&self, record: &PatientRecord) -> Result<()> {
        let mut state = self.state.write().await;

        let email = record.email_key();
        for existing in state.patients.values() {
            if existing.medical_record_number == record.medical_record_number {
                return Err(Error::Duplicate(UniqueKey::MedicalRecordNumber));
            }
            if existing.email_key() == email {
                return Err(Error::Duplicate(UniqueKey::Email));
            }
        }

        state.patients.insert(record.id, record.clone());
        state.patient_order.push(record.id);
        Ok(())
    }

    async fn find_patient(&self, id: Uuid) -> Result<Option<PatientRecord>> {
        Ok(self.state.read().await.patients.get(&id).cloned())
    }

    async fn find_patient_by_mrn(&self, mrn: &str) -> Result<Option<PatientRecord>> {
        let state = self.state.read().await;
        Ok(state
            .patients
            .values()
            .find(|p| p.medical_record_number.as_str() == mrn)
            .cloned())
    }

    async fn find_patient_by_email(&self, email: &str) -> Result<Option<PatientRecord>> {
        let key = normalize_email(email);
        let state = self.state.read().await;
        Ok(state
            .patients
            .values()
            .find(|p| p.email_key() == key)
            .cloned())
    }

    async fn list_patients(&self) -> Result<Vec<PatientRecord>> {
        let state = self.state.read().await;
        Ok(state
            .patient_order
            .iter()
            .filter_map(|id| state.patients.get(id).cloned())
            .collect())
    }

    async fn update_profile(&self, id: Uuid, profile: &PatientProfile) -> Result<bool> {
        let mut state = self.state.write().await;
        let Some(stored) = state.patients.get_mut(&id) else {
            return Ok(false);
        };

        stored.profile = profile.clone();
        stored.updated_at = Utc::now();
        Ok(true)
    }

    async fn set_reset_token(
        &self,
        id: Uuid,
        token_digest: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool> {
        let mut state = self.state.write().await;
        let Some(stored) = state.patients.get_mut(&id) else {
            return Ok(false);
        };

        stored.reset_token_hash = Some(token_digest.to_string());
        stored.reset_token_expires_at = Some(expires_at);
        stored.updated_at = Utc::now();
        Ok(true)
    }

    async fn redeem_reset_token(
        &self,
        id: Uuid,
        token_digest: &str,
        now: DateTime<Utc>,
        credential_hash: &str,
    ) -> Result<bool> {
        let mut state = self.state.write().await;
        let Some(stored) = state.patients.get_mut(&id) else {
            return Ok(false);
        };

        let redeemable = match (&stored.reset_token_hash, stored.reset_token_expires_at) {
            (Some(outstanding), Some(expires_at)) => {
                expires_at > now && digests_match(outstanding, token_digest)
            }
            _ => false,
        };
        if !redeemable {
            return Ok(false);
        }

        stored.credential_hash = credential_hash.to_string();
        stored.reset_token_hash = None;
        stored.reset_token_expires_at = None;
        stored.updated_at = now;
        Ok(true)
    }

    async fn delete_patient(&self, id: Uuid) -> Result<bool> {
        let mut state = self.state.write().await;
        let Some(removed) = state.patients.remove(&id) else {
            return Ok(false);
        };

        state.patient_order.retain(|p| *p != id);
        state.entries.retain(|(owner, _), _| *owner != id);
        if let Some(bed_no) = removed.bed_no {
            state.release_bed(bed_no);
        }
        Ok(true)
    }

    async fn append_entry(
        &self,
        patient_id: Uuid,
        collection: Collection,
        entry: &StoredEntry,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.patients.contains_key(&patient_id) {
            return Err(Error::not_found("Patient"));
        }

        state
            .entries
            .entry((patient_id, collection))
            .or_default()
            .push(entry.clone());
        Ok(())
    }

    async fn list_entries(
        &self,
        patient_id: Uuid,
        collection: Collection,
    ) -> Result<Option<Vec<StoredEntry>>> {
        let state = self.state.read().await;
        Ok(state.entries.get(&(patient_id, collection)).cloned())
    }

    async fn get_entry(
        &self,
        patient_id: Uuid,
        collection: Collection,
        entry_id: Uuid,
    ) -> Result<Option<StoredEntry>> {
        let state = self.state.read().await;
        Ok(state
            .entries
            .get(&(patient_id, collection))
            .and_then(|entries| entries.iter().find(|e| e.id == entry_id))
            .cloned())
    }

    async fn merge_entry(
        &self,
        patient_id: Uuid,
        collection: Collection,
        entry_id: Uuid,
        set: &Map<String, JsonValue>,
        removed: &[String],
    ) -> Result<Option<StoredEntry>> {
        let mut state = self.state.write().await;
        let Some(entry) = state
            .entries_mut(patient_id, collection)
            .and_then(|entries| entries.iter_mut().find(|e| e.id == entry_id))
        else {
            return Ok(None);
        };

        for key in removed {
            entry.fields.remove(key);
        }
        carebase_records::merge::overlay(&mut entry.fields, set);
        Ok(Some(entry.clone()))
    }

    async fn remove_entry(
        &self,
        patient_id: Uuid,
        collection: Collection,
        entry_id: Uuid,
    ) -> Result<bool> {
        let mut state = self.state.write().await;
        let Some(entries) = state.entries_mut(patient_id, collection) else {
            return Ok(false);
        };

        let before = entries.len();
        entries.retain(|e| e.id != entry_id);
        Ok(entries.len() < before)
    }

    async fn append_payment(
        &self,
        patient_id: Uuid,
        entry_id: Uuid,
        payment: JsonValue,
    ) -> Result<Option<StoredEntry>> {
        let mut state = self.state.write().await;
        let Some(entry) = state
            .entries_mut(patient_id, Collection::BillingInformation)
            .and_then(|entries| entries.iter_mut().find(|e| e.id == entry_id))
        else {
            return Ok(None);
        };

        let history = entry
            .fields
            .entry("paymentHistory")
            .or_insert_with(|| JsonValue::Array(Vec::new()));
        match history {
            JsonValue::Array(items) => items.push(payment),
            other => *other = JsonValue::Array(vec![payment]),
        }
        Ok(Some(entry.clone()))
    }

    async fn insert_bed(&self, bed: &NewBed) -> Result<Bed> {
        let mut state = self.state.write().await;

        let bed_no = match bed.bed_no {
            Some(bed_no) => bed_no,
            None => next_bed_number(state.beds.keys().next_back().copied())
                .ok_or_else(no_bed_number_left)?,
        };
        if state.beds.contains_key(&bed_no) {
            return Err(Error::Duplicate(UniqueKey::BedNumber));
        }

        let created = Bed {
            bed_no,
            room_no: bed.room_no,
            status: bed.status,
        };
        state.beds.insert(bed_no, created.clone());
        Ok(created)
    }

    async fn list_beds(&self, status: Option<BedStatus>) -> Result<Vec<Bed>> {
        let state = self.state.read().await;
        Ok(state
            .beds
            .values()
            .filter(|bed| status.map_or(true, |s| bed.status == s))
            .cloned()
            .collect())
    }

    async fn set_bed_status(&self, bed_no: i32, status: BedStatus) -> Result<Option<Bed>> {
        let mut state = self.state.write().await;
        let Some(bed) = state.beds.get_mut(&bed_no) else {
            return Ok(None);
        };
        bed.status = status;
        let bed = bed.clone();

        if status != BedStatus::Occupied {
            let now = Utc::now();
            for patient in state.patients.values_mut() {
                if patient.bed_no == Some(bed_no) {
                    patient.bed_no = None;
                    patient.updated_at = now;
                }
            }
        }
        Ok(Some(bed))
    }

    async fn assign_bed(&self, patient_id: Uuid, bed_no: i32) -> Result<BedAssignmentOutcome> {
        let mut state = self.state.write().await;

        let Some(current) = state.patients.get(&patient_id).map(|p| p.bed_no) else {
            return Ok(BedAssignmentOutcome::PatientNotFound);
        };
        let Some(bed) = state.beds.get(&bed_no).cloned() else {
            return Ok(BedAssignmentOutcome::BedNotFound);
        };

        if current == Some(bed_no) {
            return Ok(BedAssignmentOutcome::Assigned {
                bed,
                released: None,
            });
        }
        if bed.status != BedStatus::Available {
            return Ok(BedAssignmentOutcome::BedUnavailable(bed.status));
        }

        let occupied = Bed {
            status: BedStatus::Occupied,
            ..bed
        };
        state.beds.insert(bed_no, occupied.clone());
        if let Some(previous) = current {
            state.release_bed(previous);
        }
        if let Some(patient) = state.patients.get_mut(&patient_id) {
            patient.bed_no = Some(bed_no);
            patient.updated_at = Utc::now();
        }

        Ok(BedAssignmentOutcome::Assigned {
            bed: occupied,
            released: current,
        })
    }
}
