//! PostgreSQL record store
//!
//! Patients live in `patients` with their demographics as a JSONB profile.
//! Each sub-collection has its own table keyed by entry id with a foreign
//! key to the patient, so entries are read and written individually.

use async_trait::async_trait;
use carebase_records::{
    bed::next_bed_number, patient::PatientProfile, Bed, BedStatus, Collection,
    MedicalRecordNumber, NewBed,
};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value as JsonValue};
use sqlx::{
    postgres::{PgPoolOptions, PgRow},
    Executor, PgPool, Row,
};
use std::time::Duration;
use uuid::Uuid;

use super::{
    no_bed_number_left,
    traits::{BedAssignmentOutcome, RecordStore},
};
use crate::{
    config::DatabaseConfig,
    error::UniqueKey,
    models::{PatientRecord, StoredEntry},
    Error, Result,
};

/// Draws of the next free bed number before giving up on a busy inventory.
const BED_NUMBER_ATTEMPTS: u32 = 3;

const PATIENT_COLUMNS: &str = "id, medical_record_number, profile, credential_hash, \
     reset_token_hash, reset_token_expires_at, bed_no, created_at, updated_at";

/// Open a pool with the configured bounds and statement timeout.
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool> {
    let statement_timeout = format!(
        "SET statement_timeout = '{}s'",
        config.statement_timeout_seconds
    );

    PgPoolOptions::new()
        .min_connections(config.pool_min_size)
        .max_connections(config.pool_max_size)
        .acquire_timeout(Duration::from_secs(config.pool_timeout_seconds))
        .after_connect(move |conn, _meta| {
            let statement_timeout = statement_timeout.clone();
            Box::pin(async move {
                (&mut *conn).execute(statement_timeout.as_str()).await?;
                Ok(())
            })
        })
        .connect(&config.url)
        .await
        .map_err(Error::Database)
}

/// Repository for patient records backed by PostgreSQL
#[derive(Clone)]
pub struct PostgresRecordStore {
    pool: PgPool,
}

impl PostgresRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply pending migrations from `migrations/`.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    async fn find_patient_where(&self, clause: &str, value: &str) -> Result<Option<PatientRecord>> {
        let query = format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE {clause}");
        let row = sqlx::query(&query)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        row.as_ref().map(patient_from_row).transpose()
    }

    async fn insert_bed_numbered(&self, bed_no: i32, bed: &NewBed) -> Result<Bed> {
        let row = sqlx::query(
            r#"
            INSERT INTO beds (bed_no, room_no, status)
            VALUES ($1, $2, $3)
            RETURNING bed_no, room_no, status
            "#,
        )
        .bind(bed_no)
        .bind(bed.room_no)
        .bind(bed.status.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)?;

        bed_from_row(&row)
    }
}

#[async_trait]
impl RecordStore for PostgresRecordStore {
    async fn insert_patient(&self, record: &PatientRecord) -> Result<()> {
        let profile = to_json(&record.profile)?;

        sqlx::query(
            r#"
            INSERT INTO patients (
                id, medical_record_number, email, profile, credential_hash,
                reset_token_hash, reset_token_expires_at, bed_no, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(record.id)
        .bind(record.medical_record_number.as_str())
        .bind(record.email_key())
        .bind(profile)
        .bind(&record.credential_hash)
        .bind(&record.reset_token_hash)
        .bind(record.reset_token_expires_at)
        .bind(record.bed_no)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;

        Ok(())
    }

    async fn find_patient(&self, id: Uuid) -> Result<Option<PatientRecord>> {
        let query = format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE id = $1");
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        row.as_ref().map(patient_from_row).transpose()
    }

    async fn find_patient_by_mrn(&self, mrn: &str) -> Result<Option<PatientRecord>> {
        self.find_patient_where("medical_record_number = $1", mrn).await
    }

    async fn find_patient_by_email(&self, email: &str) -> Result<Option<PatientRecord>> {
        let key = carebase_records::patient::normalize_email(email);
        self.find_patient_where("email = $1", &key).await
    }

    async fn list_patients(&self) -> Result<Vec<PatientRecord>> {
        let query = format!("SELECT {PATIENT_COLUMNS} FROM patients ORDER BY created_at, id");
        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        rows.iter().map(patient_from_row).collect()
    }

    async fn update_profile(&self, id: Uuid, profile: &PatientProfile) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE patients SET profile = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(to_json(profile)?)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_reset_token(
        &self,
        id: Uuid,
        token_digest: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE patients
            SET reset_token_hash = $2,
                reset_token_expires_at = $3,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(token_digest)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(result.rows_affected() > 0)
    }

    async fn redeem_reset_token(
        &self,
        id: Uuid,
        token_digest: &str,
        now: DateTime<Utc>,
        credential_hash: &str,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE patients
            SET credential_hash = $4,
                reset_token_hash = NULL,
                reset_token_expires_at = NULL,
                updated_at = $3
            WHERE id = $1
              AND reset_token_hash = $2
              AND reset_token_expires_at > $3
            "#,
        )
        .bind(id)
        .bind(token_digest)
        .bind(now)
        .bind(credential_hash)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_patient(&self, id: Uuid) -> Result<bool> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        // Free the bed before the record that held it disappears.
        sqlx::query(
            r#"
            UPDATE beds SET status = 'available', updated_at = NOW()
            WHERE status = 'occupied'
              AND bed_no = (SELECT bed_no FROM patients WHERE id = $1)
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        let deleted = sqlx::query("DELETE FROM patients WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?
            .rows_affected();

        tx.commit().await.map_err(Error::Database)?;
        Ok(deleted > 0)
    }

    async fn append_entry(
        &self,
        patient_id: Uuid,
        collection: Collection,
        entry: &StoredEntry,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let insert = format!(
            "INSERT INTO {} (id, patient_id, data) VALUES ($1, $2, $3)",
            collection.table()
        );
        sqlx::query(&insert)
            .bind(entry.id)
            .bind(patient_id)
            .bind(JsonValue::Object(entry.fields.clone()))
            .execute(&mut *tx)
            .await
            .map_err(map_write_error)?;

        sqlx::query(
            r#"
            UPDATE patients
            SET initialized_collections = array_append(initialized_collections, $2),
                updated_at = NOW()
            WHERE id = $1 AND NOT ($2 = ANY(initialized_collections))
            "#,
        )
        .bind(patient_id)
        .bind(collection.table())
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)
    }

    async fn list_entries(
        &self,
        patient_id: Uuid,
        collection: Collection,
    ) -> Result<Option<Vec<StoredEntry>>> {
        let initialized: Option<bool> = sqlx::query_scalar(
            "SELECT $2 = ANY(initialized_collections) FROM patients WHERE id = $1",
        )
        .bind(patient_id)
        .bind(collection.table())
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        if initialized != Some(true) {
            return Ok(None);
        }

        let query = format!(
            "SELECT id, data FROM {} WHERE patient_id = $1 ORDER BY seq",
            collection.table()
        );
        let rows = sqlx::query(&query)
            .bind(patient_id)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        rows.iter().map(entry_from_row).collect::<Result<Vec<_>>>().map(Some)
    }

    async fn get_entry(
        &self,
        patient_id: Uuid,
        collection: Collection,
        entry_id: Uuid,
    ) -> Result<Option<StoredEntry>> {
        let query = format!(
            "SELECT id, data FROM {} WHERE id = $1 AND patient_id = $2",
            collection.table()
        );
        let row = sqlx::query(&query)
            .bind(entry_id)
            .bind(patient_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        row.as_ref().map(entry_from_row).transpose()
    }

    async fn merge_entry(
        &self,
        patient_id: Uuid,
        collection: Collection,
        entry_id: Uuid,
        set: &Map<String, JsonValue>,
        removed: &[String],
    ) -> Result<Option<StoredEntry>> {
        let query = format!(
            r#"
            UPDATE {}
            SET data = (data - $3::text[]) || $4::jsonb,
                updated_at = NOW()
            WHERE id = $1 AND patient_id = $2
            RETURNING id, data
            "#,
            collection.table()
        );
        let row = sqlx::query(&query)
            .bind(entry_id)
            .bind(patient_id)
            .bind(removed)
            .bind(JsonValue::Object(set.clone()))
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        row.as_ref().map(entry_from_row).transpose()
    }

    async fn remove_entry(
        &self,
        patient_id: Uuid,
        collection: Collection,
        entry_id: Uuid,
    ) -> Result<bool> {
        let query = format!(
            "DELETE FROM {} WHERE id = $1 AND patient_id = $2",
            collection.table()
        );
        let result = sqlx::query(&query)
            .bind(entry_id)
            .bind(patient_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(result.rows_affected() > 0)
    }

    async fn append_payment(
        &self,
        patient_id: Uuid,
        entry_id: Uuid,
        payment: JsonValue,
    ) -> Result<Option<StoredEntry>> {
        let query = format!(
            r#"
            UPDATE {}
            SET data = jsonb_set(
                    data,
                    '{{paymentHistory}}',
                    COALESCE(data -> 'paymentHistory', '[]'::jsonb) || jsonb_build_array($3::jsonb)
                ),
                updated_at = NOW()
            WHERE id = $1 AND patient_id = $2
            RETURNING id, data
            "#,
            Collection::BillingInformation.table()
        );
        let row = sqlx::query(&query)
            .bind(entry_id)
            .bind(patient_id)
            .bind(payment)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        row.as_ref().map(entry_from_row).transpose()
    }

    async fn insert_bed(&self, bed: &NewBed) -> Result<Bed> {
        if let Some(bed_no) = bed.bed_no {
            return self.insert_bed_numbered(bed_no, bed).await;
        }

        // A concurrent insert may take the number between reading the
        // highest one and writing; draw again in that case.
        for attempt in 1..=BED_NUMBER_ATTEMPTS {
            let highest: Option<i32> = sqlx::query_scalar("SELECT MAX(bed_no) FROM beds")
                .fetch_one(&self.pool)
                .await
                .map_err(Error::Database)?;
            let bed_no = next_bed_number(highest).ok_or_else(no_bed_number_left)?;

            match self.insert_bed_numbered(bed_no, bed).await {
                Err(Error::Duplicate(UniqueKey::BedNumber)) => {
                    tracing::warn!(attempt, bed_no, "Bed number taken concurrently, drawing again");
                }
                other => return other,
            }
        }

        Err(Error::Conflict(
            "Could not allocate a bed number, try again".to_string(),
        ))
    }

    async fn list_beds(&self, status: Option<BedStatus>) -> Result<Vec<Bed>> {
        let rows = sqlx::query(
            r#"
            SELECT bed_no, room_no, status
            FROM beds
            WHERE ($1::text IS NULL OR status = $1)
            ORDER BY bed_no
            "#,
        )
        .bind(status.map(BedStatus::as_str))
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.iter().map(bed_from_row).collect()
    }

    async fn set_bed_status(&self, bed_no: i32, status: BedStatus) -> Result<Option<Bed>> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        // Patient rows before the bed row, the same order `assign_bed` takes.
        sqlx::query("SELECT id FROM patients WHERE bed_no = $1 FOR UPDATE")
            .bind(bed_no)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        let row = sqlx::query(
            r#"
            UPDATE beds SET status = $2, updated_at = NOW()
            WHERE bed_no = $1
            RETURNING bed_no, room_no, status
            "#,
        )
        .bind(bed_no)
        .bind(status.as_str())
        .fetch_optional(&mut *tx)
        .await
        .map_err(Error::Database)?;
        let Some(row) = row else {
            return Ok(None);
        };

        if status != BedStatus::Occupied {
            sqlx::query(
                "UPDATE patients SET bed_no = NULL, updated_at = NOW() WHERE bed_no = $1",
            )
            .bind(bed_no)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        }

        tx.commit().await.map_err(Error::Database)?;
        bed_from_row(&row).map(Some)
    }

    async fn assign_bed(&self, patient_id: Uuid, bed_no: i32) -> Result<BedAssignmentOutcome> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let current: Option<Option<i32>> =
            sqlx::query_scalar("SELECT bed_no FROM patients WHERE id = $1 FOR UPDATE")
                .bind(patient_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(Error::Database)?;
        let Some(current) = current else {
            return Ok(BedAssignmentOutcome::PatientNotFound);
        };

        let row = sqlx::query(
            "SELECT bed_no, room_no, status FROM beds WHERE bed_no = $1 FOR UPDATE",
        )
        .bind(bed_no)
        .fetch_optional(&mut *tx)
        .await
        .map_err(Error::Database)?;
        let Some(row) = row else {
            return Ok(BedAssignmentOutcome::BedNotFound);
        };
        let bed = bed_from_row(&row)?;

        if current == Some(bed_no) {
            return Ok(BedAssignmentOutcome::Assigned {
                bed,
                released: None,
            });
        }
        if bed.status != BedStatus::Available {
            return Ok(BedAssignmentOutcome::BedUnavailable(bed.status));
        }

        let row = sqlx::query(
            r#"
            UPDATE beds SET status = 'occupied', updated_at = NOW()
            WHERE bed_no = $1
            RETURNING bed_no, room_no, status
            "#,
        )
        .bind(bed_no)
        .fetch_one(&mut *tx)
        .await
        .map_err(Error::Database)?;
        let bed = bed_from_row(&row)?;

        if let Some(previous) = current {
            sqlx::query(
                r#"
                UPDATE beds SET status = 'available', updated_at = NOW()
                WHERE bed_no = $1 AND status = 'occupied'
                "#,
            )
            .bind(previous)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        }

        sqlx::query("UPDATE patients SET bed_no = $2, updated_at = NOW() WHERE id = $1")
            .bind(patient_id)
            .bind(bed_no)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;

        Ok(BedAssignmentOutcome::Assigned {
            bed,
            released: current,
        })
    }
}

/// Translate constraint violations into domain errors.
fn map_write_error(err: sqlx::Error) -> Error {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            let key = match db.constraint() {
                Some("patients_email_key") => Some(UniqueKey::Email),
                Some("patients_medical_record_number_key") => Some(UniqueKey::MedicalRecordNumber),
                Some("beds_pkey") => Some(UniqueKey::BedNumber),
                _ => None,
            };
            if let Some(key) = key {
                return Error::Duplicate(key);
            }
        }
        if db.is_foreign_key_violation() {
            return Error::not_found("Patient");
        }
    }
    Error::Database(err)
}

fn patient_from_row(row: &PgRow) -> Result<PatientRecord> {
    let mrn: String = row.get("medical_record_number");
    let medical_record_number: MedicalRecordNumber = mrn
        .parse()
        .map_err(|e| Error::Internal(format!("stored medical record number is invalid: {e}")))?;
    let profile = serde_json::from_value(row.get("profile"))
        .map_err(|e| Error::Internal(format!("stored patient profile is invalid: {e}")))?;

    Ok(PatientRecord {
        id: row.get("id"),
        medical_record_number,
        profile,
        credential_hash: row.get("credential_hash"),
        reset_token_hash: row.get("reset_token_hash"),
        reset_token_expires_at: row.get("reset_token_expires_at"),
        bed_no: row.get("bed_no"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn entry_from_row(row: &PgRow) -> Result<StoredEntry> {
    let id: Uuid = row.get("id");
    match row.get::<JsonValue, _>("data") {
        JsonValue::Object(fields) => Ok(StoredEntry { id, fields }),
        other => Err(Error::Internal(format!(
            "entry {id} is stored as {} instead of an object",
            json_kind(&other)
        ))),
    }
}

fn bed_from_row(row: &PgRow) -> Result<Bed> {
    let status: String = row.get("status");
    Ok(Bed {
        bed_no: row.get("bed_no"),
        room_no: row.get("room_no"),
        status: status
            .parse()
            .map_err(|e| Error::Internal(format!("stored bed status is invalid: {e}")))?,
    })
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<JsonValue> {
    serde_json::to_value(value).map_err(|e| Error::Internal(format!("serialization failed: {e}")))
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}
