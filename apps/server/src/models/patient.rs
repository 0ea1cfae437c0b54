use carebase_records::{patient::PatientProfile, MedicalRecordNumber};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// A patient record as the store holds it, credential included.
///
/// Never serialized directly; responses go through [`PatientSummary`].
#[derive(Debug, Clone)]
pub struct PatientRecord {
    pub id: Uuid,
    pub medical_record_number: MedicalRecordNumber,
    pub profile: PatientProfile,
    pub credential_hash: String,
    /// SHA-256 of the outstanding password-reset token, hex encoded.
    pub reset_token_hash: Option<String>,
    pub reset_token_expires_at: Option<DateTime<Utc>>,
    pub bed_no: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PatientRecord {
    pub fn new(
        profile: PatientProfile,
        credential_hash: String,
        medical_record_number: MedicalRecordNumber,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            medical_record_number,
            profile,
            credential_hash,
            reset_token_hash: None,
            reset_token_expires_at: None,
            bed_no: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Uniqueness key for the contact email.
    pub fn email_key(&self) -> String {
        self.profile.normalized_email()
    }

    pub fn summary(&self) -> PatientSummary {
        PatientSummary {
            id: self.id,
            medical_record_number: self.medical_record_number.clone(),
            profile: self.profile.clone(),
            bed_no: self.bed_no,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Client-facing projection of a record: everything except credential state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientSummary {
    pub id: Uuid,
    pub medical_record_number: MedicalRecordNumber,
    #[serde(flatten)]
    pub profile: PatientProfile,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bed_no: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
