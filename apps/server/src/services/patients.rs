//! Top-level patient record operations.

use carebase_records::patient::{EmergencyContact, EmergencyContactUpdate, PatientUpdate};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use super::require_patient;
use crate::{db::RecordStore, models::PatientSummary, Error, Result};

pub struct PatientService {
    store: Arc<dyn RecordStore>,
}

impl PatientService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> Result<Vec<PatientSummary>> {
        let records = self.store.list_patients().await?;
        Ok(records.iter().map(|r| r.summary()).collect())
    }

    pub async fn get(&self, id: Uuid) -> Result<PatientSummary> {
        Ok(require_patient(self.store.as_ref(), id).await?.summary())
    }

    pub async fn get_by_mrn(&self, mrn: &str) -> Result<PatientSummary> {
        self.store
            .find_patient_by_mrn(mrn)
            .await?
            .map(|r| r.summary())
            .ok_or_else(|| Error::not_found("Patient"))
    }

    /// Partial update of demographics. Fields absent from the update keep
    /// their stored values.
    pub async fn update(&self, id: Uuid, update: PatientUpdate) -> Result<PatientSummary> {
        let mut record = require_patient(self.store.as_ref(), id).await?;
        record.profile.apply(update)?;
        record.updated_at = Utc::now();

        if !self.store.update_profile(id, &record.profile).await? {
            return Err(Error::not_found("Patient"));
        }
        tracing::debug!(patient_id = %id, "Patient updated");
        Ok(record.summary())
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        if !self.store.delete_patient(id).await? {
            return Err(Error::not_found("Patient"));
        }
        tracing::info!(patient_id = %id, "Patient deleted");
        Ok(())
    }

    pub async fn emergency_contact(&self, id: Uuid) -> Result<EmergencyContact> {
        Ok(require_patient(self.store.as_ref(), id)
            .await?
            .profile
            .emergency_contact)
    }

    pub async fn update_emergency_contact(
        &self,
        id: Uuid,
        update: EmergencyContactUpdate,
    ) -> Result<EmergencyContact> {
        let update = update.validated()?;
        let mut record = require_patient(self.store.as_ref(), id).await?;
        record.profile.emergency_contact.apply(update);

        if !self.store.update_profile(id, &record.profile).await? {
            return Err(Error::not_found("Patient"));
        }
        Ok(record.profile.emergency_contact)
    }
}
