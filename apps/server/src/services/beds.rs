//! Bed inventory and assignment.

use carebase_records::{
    bed::{BedAssignment, BedStatusChange},
    Bed, BedStatus, NewBed,
};
use std::sync::Arc;
use validator::Validate;

use crate::{
    db::{BedAssignmentOutcome, RecordStore},
    models::PatientSummary,
    Error, Result,
};

pub struct BedService {
    store: Arc<dyn RecordStore>,
}

impl BedService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub async fn create(&self, bed: NewBed) -> Result<Bed> {
        bed.validate()
            .map_err(|e| Error::Validation(carebase_records::error::describe_validation_errors(&e)))?;
        let bed = self.store.insert_bed(&bed).await?;
        tracing::info!(bed_no = bed.bed_no, status = %bed.status, "Bed added");
        Ok(bed)
    }

    pub async fn list(&self, status: Option<BedStatus>) -> Result<Vec<Bed>> {
        self.store.list_beds(status).await
    }

    pub async fn set_status(&self, bed_no: i32, change: BedStatusChange) -> Result<Bed> {
        self.store
            .set_bed_status(bed_no, change.status)
            .await?
            .ok_or_else(|| Error::not_found("Bed"))
    }

    /// Put the patient with the given record number in a bed.
    ///
    /// The bed must be available; it becomes occupied and the bed the
    /// patient held before is released.
    pub async fn assign(
        &self,
        mrn: &str,
        assignment: BedAssignment,
    ) -> Result<(PatientSummary, Bed)> {
        assignment
            .validate()
            .map_err(|e| Error::Validation(carebase_records::error::describe_validation_errors(&e)))?;

        let patient = self
            .store
            .find_patient_by_mrn(mrn)
            .await?
            .ok_or_else(|| Error::not_found("Patient"))?;

        let bed = match self.store.assign_bed(patient.id, assignment.bed_no).await? {
            BedAssignmentOutcome::Assigned { bed, released } => {
                tracing::info!(
                    patient_id = %patient.id,
                    bed_no = bed.bed_no,
                    released = ?released,
                    "Bed assigned"
                );
                bed
            }
            BedAssignmentOutcome::PatientNotFound => return Err(Error::not_found("Patient")),
            BedAssignmentOutcome::BedNotFound => return Err(Error::not_found("Bed")),
            BedAssignmentOutcome::BedUnavailable(status) => {
                return Err(Error::Conflict(format!(
                    "Bed {} is not available (status: {status})",
                    assignment.bed_no
                )))
            }
        };

        let patient = self
            .store
            .find_patient(patient.id)
            .await?
            .ok_or_else(|| Error::not_found("Patient"))?;
        Ok((patient.summary(), bed))
    }
}
