//! Bed inventory routes.

use crate::api::handlers::beds;
use crate::state::AppState;
use axum::{
    routing::{get, patch},
    Router,
};

pub fn bed_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(beds::list_beds).post(beds::create_bed))
        .route("/status/:status", get(beds::list_beds_by_status))
        .route("/:bed_no/status", patch(beds::update_bed_status))
}
