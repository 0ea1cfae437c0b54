//! Prometheus metrics for the patient record server.

use carebase_records::Collection;
use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec,
    register_int_gauge_vec, HistogramVec, IntCounter, IntCounterVec, IntGaugeVec,
};

lazy_static! {
    // HTTP Request Metrics

    /// Total HTTP requests by method, path, and status
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "carebase_http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .expect("Failed to register HTTP_REQUESTS_TOTAL");

    /// HTTP request duration in seconds
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "carebase_http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
    )
    .expect("Failed to register HTTP_REQUEST_DURATION_SECONDS");

    /// In-flight HTTP requests
    pub static ref HTTP_REQUESTS_IN_FLIGHT: IntGaugeVec = register_int_gauge_vec!(
        "carebase_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
        &["method", "path"]
    )
    .expect("Failed to register HTTP_REQUESTS_IN_FLIGHT");

    // Record Metrics

    /// Sub-collection operations by collection, operation and outcome
    pub static ref RECORD_OPERATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "carebase_record_operations_total",
        "Total number of patient sub-collection operations",
        &["collection", "operation", "status"]
    )
    .expect("Failed to register RECORD_OPERATIONS_TOTAL");

    pub static ref RECORD_OPERATION_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "carebase_record_operation_duration_seconds",
        "Patient sub-collection operation duration in seconds",
        &["collection", "operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]
    )
    .expect("Failed to register RECORD_OPERATION_DURATION_SECONDS");

    // Account Metrics

    pub static ref REGISTRATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "carebase_registrations_total",
        "Registration attempts by outcome",
        &["outcome"]
    )
    .expect("Failed to register REGISTRATIONS_TOTAL");

    pub static ref LOGINS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "carebase_logins_total",
        "Login attempts by outcome",
        &["outcome"]
    )
    .expect("Failed to register LOGINS_TOTAL");

    /// Generated medical record numbers rejected by the unique constraint
    pub static ref MRN_COLLISIONS_TOTAL: IntCounter = register_int_counter!(
        "carebase_mrn_collisions_total",
        "Medical record number candidates that collided with an existing record"
    )
    .expect("Failed to register MRN_COLLISIONS_TOTAL");

    pub static ref MAIL_DELIVERIES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "carebase_mail_deliveries_total",
        "Outgoing mail by transport and outcome",
        &["transport", "outcome"]
    )
    .expect("Failed to register MAIL_DELIVERIES_TOTAL");
}

/// Replace ids, record numbers and tokens in a path with placeholders so
/// label cardinality stays bounded.
pub fn sanitize_path(path: &str) -> String {
    let mut labels: Vec<&str> = Vec::new();
    let mut previous: Option<&str> = None;

    for segment in path.split('/').filter(|s| !s.is_empty()) {
        let label = match previous {
            Some("mrn") => "{mrn}",
            Some("reset-password") => "{token}",
            Some("beds") if segment.parse::<i64>().is_ok() => "{bed_no}",
            Some("patients") if segment != "mrn" => "{id}",
            Some(p)
                if p.parse::<Collection>().is_ok()
                    && !matches!(segment, "payments" | "approve") =>
            {
                "{entry_id}"
            }
            _ if looks_like_identifier(segment) => "{id}",
            _ => segment,
        };
        labels.push(label);
        previous = Some(segment);
    }

    if labels.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", labels.join("/"))
    }
}

fn looks_like_identifier(segment: &str) -> bool {
    segment.len() > 32
        || uuid::Uuid::parse_str(segment).is_ok()
        || segment.bytes().all(|b| b.is_ascii_digit())
}

/// Sub-collection addressed by `/api/patients/{id}/{collection}/...`
pub fn extract_collection(path: &str) -> Option<Collection> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    match segments.as_slice() {
        ["api", "patients", id, collection, ..] if *id != "mrn" => collection.parse().ok(),
        _ => None,
    }
}

/// Sub-collection operation implied by method and path
pub fn extract_operation(method: &str, path: &str) -> Option<&'static str> {
    extract_collection(path)?;
    let depth = path.split('/').filter(|s| !s.is_empty()).count();

    match (method, depth) {
        ("POST", 4) => Some("append"),
        ("GET", 4) => Some("list"),
        ("GET", 5) => Some("read"),
        ("PUT", 5) => Some("update"),
        ("DELETE", 5) => Some("remove"),
        ("POST", 6) if path.ends_with("/payments") => Some("append_payment"),
        ("PATCH", 5) if path.ends_with("/treatment-plans/approve") => Some("approve"),
        _ => None,
    }
}
