//! Bed inventory endpoints.

use axum::extract::{Path, Query, State};
use carebase_records::{bed::BedStatusChange, BedStatus, NewBed};
use serde::Deserialize;

use crate::{
    api::{extractors::JsonBody, response::Envelope},
    state::AppState,
    Error, Result,
};

#[derive(Debug, Default, Deserialize)]
pub struct BedQuery {
    pub status: Option<String>,
}

/// POST /api/beds
pub async fn create_bed(
    State(state): State<AppState>,
    JsonBody(bed): JsonBody<NewBed>,
) -> Result<Envelope> {
    let bed = state.beds.create(bed).await?;
    Envelope::created()
        .message("Bed added successfully")
        .data("bed", bed)
}

/// GET /api/beds?status=
pub async fn list_beds(
    State(state): State<AppState>,
    Query(query): Query<BedQuery>,
) -> Result<Envelope> {
    let status = query.status.as_deref().map(parse_status).transpose()?;
    let beds = state.beds.list(status).await?;
    Envelope::ok().data("beds", beds)
}

/// GET /api/beds/status/:status
pub async fn list_beds_by_status(
    State(state): State<AppState>,
    Path(status): Path<String>,
) -> Result<Envelope> {
    let beds = state.beds.list(Some(parse_status(&status)?)).await?;
    Envelope::ok().data("beds", beds)
}

/// PATCH /api/beds/:bed_no/status
pub async fn update_bed_status(
    State(state): State<AppState>,
    Path(bed_no): Path<String>,
    JsonBody(change): JsonBody<BedStatusChange>,
) -> Result<Envelope> {
    let bed_no: i32 = bed_no.parse().map_err(|_| Error::not_found("Bed"))?;
    let bed = state.beds.set_status(bed_no, change).await?;
    Envelope::ok()
        .message("Bed status updated successfully")
        .data("bed", bed)
}

fn parse_status(raw: &str) -> Result<BedStatus> {
    raw.parse::<BedStatus>().map_err(Error::from)
}
