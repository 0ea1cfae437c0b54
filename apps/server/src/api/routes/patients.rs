//! Patient record routes
//!
//! Every sub-collection is mounted from [`collection_routes`] with its entry
//! type, so adding a collection is one line here plus its model.

use crate::api::handlers::{entries, patients};
use crate::state::AppState;
use axum::{
    routing::{get, patch, post, MethodRouter},
    Router,
};
use carebase_records::{entries::*, Entry};

pub fn patient_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(patients::list_patients))
        .route("/mrn/:mrn", get(patients::get_patient_by_mrn))
        .route("/mrn/:mrn/assign-bed", patch(patients::assign_bed))
        .route(
            "/:id",
            get(patients::get_patient)
                .put(patients::update_patient)
                .delete(patients::delete_patient),
        )
        .route(
            "/:id/emergency-contact",
            get(patients::get_emergency_contact).put(patients::update_emergency_contact),
        )
        .route(
            "/:id/billing/:entry_id/payments",
            post(entries::append_payment),
        )
        .route(
            "/:id/treatment-plans/approve",
            patch(entries::approve_treatment_plans),
        )
        .merge(collection_routes::<AdmissionDetails>())
        .merge(collection_routes::<VitalSigns>())
        .merge(collection_routes::<MedicalHistory>())
        .merge(collection_routes::<Medication>())
        .merge(collection_routes::<TreatmentPlan>())
        .merge(collection_routes::<LabResult>())
        .merge(collection_routes::<ImagingResult>())
        .merge(collection_routes::<CareNote>())
        .merge(collection_routes::<ScheduledCareActivity>())
        .merge(collection_routes::<Alert>())
        .merge(collection_routes::<InsuranceDetails>())
        .merge(collection_routes::<BillingInformation>())
        .merge(collection_routes::<ConsentForm>())
        .merge(collection_routes::<DischargePlan>())
        .merge(collection_routes::<Statistics>())
        .merge(collection_routes::<PerformanceMetrics>())
        .merge(collection_routes::<Appointment>())
        .merge(collection_routes::<BillingStage>())
        .merge(collection_routes::<Checkup>())
        .merge(collection_routes::<Immunization>())
}

/// Append/list on the collection, read/update (and remove where the
/// collection allows it) on its entries.
pub fn collection_routes<T: Entry>() -> Router<AppState> {
    let segment = T::COLLECTION.segment();

    let mut entry: MethodRouter<AppState> =
        get(entries::get_entry::<T>).put(entries::update_entry::<T>);
    if T::COLLECTION.supports_removal() {
        entry = entry.delete(entries::remove_entry::<T>);
    }

    Router::new()
        .route(
            &format!("/:id/{segment}"),
            post(entries::append_entry::<T>).get(entries::list_entries::<T>),
        )
        .route(&format!("/:id/{segment}/:entry_id"), entry)
}
