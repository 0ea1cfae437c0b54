//! Sub-collection endpoints, generic over the entry type.
//!
//! Each collection mounts these handlers with its own entry type, see
//! `routes::patients::collection_routes`.

use axum::extract::{Path, State};
use carebase_records::{
    entries::{BillingInformation, TreatmentPlan},
    Entry,
};
use serde_json::Value as JsonValue;

use crate::{
    api::{
        extractors::{parse_id, JsonBody},
        response::Envelope,
    },
    state::AppState,
    Result,
};

/// Response key for a single entry.
const ENTRY_KEY: &str = "entry";

/// POST /api/patients/:id/{collection}
pub async fn append_entry<T: Entry>(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(payload): JsonBody<JsonValue>,
) -> Result<Envelope> {
    let patient_id = parse_id(&id, "Patient")?;
    let entries = state.entries.append::<T>(patient_id, payload).await?;

    Envelope::created()
        .message(format!("{} added successfully", T::COLLECTION.label()))
        .data(T::COLLECTION.response_key(), entries)
}

/// GET /api/patients/:id/{collection}
pub async fn list_entries<T: Entry>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Envelope> {
    let entries = state
        .entries
        .list::<T>(parse_id(&id, "Patient")?)
        .await?;
    Envelope::ok().data(T::COLLECTION.response_key(), entries)
}

/// GET /api/patients/:id/{collection}/:entry_id
pub async fn get_entry<T: Entry>(
    State(state): State<AppState>,
    Path((id, entry_id)): Path<(String, String)>,
) -> Result<Envelope> {
    let entry = state
        .entries
        .get::<T>(
            parse_id(&id, "Patient")?,
            parse_id(&entry_id, T::COLLECTION.label())?,
        )
        .await?;
    Envelope::ok().data(ENTRY_KEY, entry)
}

/// PUT /api/patients/:id/{collection}/:entry_id
pub async fn update_entry<T: Entry>(
    State(state): State<AppState>,
    Path((id, entry_id)): Path<(String, String)>,
    JsonBody(patch): JsonBody<JsonValue>,
) -> Result<Envelope> {
    let entry = state
        .entries
        .update::<T>(
            parse_id(&id, "Patient")?,
            parse_id(&entry_id, T::COLLECTION.label())?,
            patch,
        )
        .await?;
    Envelope::ok()
        .message(format!("{} updated successfully", T::COLLECTION.label()))
        .data(ENTRY_KEY, entry)
}

/// DELETE /api/patients/:id/{collection}/:entry_id
pub async fn remove_entry<T: Entry>(
    State(state): State<AppState>,
    Path((id, entry_id)): Path<(String, String)>,
) -> Result<Envelope> {
    state
        .entries
        .remove::<T>(
            parse_id(&id, "Patient")?,
            parse_id(&entry_id, T::COLLECTION.label())?,
        )
        .await?;
    Ok(Envelope::ok().message(format!("{} removed successfully", T::COLLECTION.label())))
}

/// POST /api/patients/:id/billing/:entry_id/payments
pub async fn append_payment(
    State(state): State<AppState>,
    Path((id, entry_id)): Path<(String, String)>,
    JsonBody(payload): JsonBody<JsonValue>,
) -> Result<Envelope> {
    let entry = state
        .entries
        .append_payment(
            parse_id(&id, "Patient")?,
            parse_id(&entry_id, BillingInformation::COLLECTION.label())?,
            payload,
        )
        .await?;
    Envelope::created()
        .message("Payment recorded successfully")
        .data(ENTRY_KEY, entry)
}

/// PATCH /api/patients/:id/treatment-plans/approve
pub async fn approve_treatment_plans(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Envelope> {
    let plans = state
        .entries
        .approve_treatment_plans(parse_id(&id, "Patient")?)
        .await?;
    Envelope::ok()
        .message("Treatment plans approved")
        .data(TreatmentPlan::COLLECTION.response_key(), plans)
}
