//! Patient record endpoints.

use axum::extract::{Path, State};
use carebase_records::{
    bed::BedAssignment,
    patient::{EmergencyContactUpdate, PatientUpdate},
};

use crate::{
    api::{
        extractors::{parse_id, JsonBody},
        response::Envelope,
    },
    state::AppState,
    Result,
};

/// GET /api/patients
pub async fn list_patients(State(state): State<AppState>) -> Result<Envelope> {
    let patients = state.patients.list().await?;
    Envelope::ok().data("patients", patients)
}

/// GET /api/patients/:id
pub async fn get_patient(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Envelope> {
    let patient = state.patients.get(parse_id(&id, "Patient")?).await?;
    Envelope::ok().data("patient", patient)
}

/// GET /api/patients/mrn/:mrn
pub async fn get_patient_by_mrn(
    State(state): State<AppState>,
    Path(mrn): Path<String>,
) -> Result<Envelope> {
    let patient = state.patients.get_by_mrn(&mrn).await?;
    Envelope::ok().data("patient", patient)
}

/// PUT /api/patients/:id
pub async fn update_patient(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(update): JsonBody<PatientUpdate>,
) -> Result<Envelope> {
    let patient = state
        .patients
        .update(parse_id(&id, "Patient")?, update)
        .await?;
    Envelope::ok()
        .message("Patient updated successfully")
        .data("patient", patient)
}

/// DELETE /api/patients/:id
pub async fn delete_patient(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Envelope> {
    state.patients.delete(parse_id(&id, "Patient")?).await?;
    Ok(Envelope::ok().message("Patient deleted successfully"))
}

/// GET /api/patients/:id/emergency-contact
pub async fn get_emergency_contact(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Envelope> {
    let contact = state
        .patients
        .emergency_contact(parse_id(&id, "Patient")?)
        .await?;
    Envelope::ok().data("emergencyContact", contact)
}

/// PUT /api/patients/:id/emergency-contact
pub async fn update_emergency_contact(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(update): JsonBody<EmergencyContactUpdate>,
) -> Result<Envelope> {
    let contact = state
        .patients
        .update_emergency_contact(parse_id(&id, "Patient")?, update)
        .await?;
    Envelope::ok()
        .message("Emergency contact updated successfully")
        .data("emergencyContact", contact)
}

/// PATCH /api/patients/mrn/:mrn/assign-bed
pub async fn assign_bed(
    State(state): State<AppState>,
    Path(mrn): Path<String>,
    JsonBody(assignment): JsonBody<BedAssignment>,
) -> Result<Envelope> {
    let (patient, bed) = state.beds.assign(&mrn, assignment).await?;
    Envelope::ok()
        .message("Bed assigned successfully")
        .data("patient", patient)?
        .data("bed", bed)
}
