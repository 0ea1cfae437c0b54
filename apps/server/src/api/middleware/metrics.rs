//! Metrics middleware - tracks HTTP and record operation metrics

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

use crate::metrics::{
    extract_collection, extract_operation, sanitize_path, HTTP_REQUESTS_IN_FLIGHT,
    HTTP_REQUESTS_TOTAL, HTTP_REQUEST_DURATION_SECONDS, RECORD_OPERATIONS_TOTAL,
    RECORD_OPERATION_DURATION_SECONDS,
};

pub async fn metrics_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let sanitized_path = sanitize_path(&path);

    HTTP_REQUESTS_IN_FLIGHT
        .with_label_values(&[&method, &sanitized_path])
        .inc();

    let response = next.run(req).await;

    let duration = start.elapsed().as_secs_f64();
    let status = response.status();

    HTTP_REQUESTS_TOTAL
        .with_label_values(&[&method, &sanitized_path, status.as_str()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[&method, &sanitized_path])
        .observe(duration);

    if let (Some(collection), Some(operation)) =
        (extract_collection(&path), extract_operation(&method, &path))
    {
        let outcome = if status.is_success() {
            "success"
        } else if status.is_client_error() {
            "client_error"
        } else {
            "server_error"
        };

        RECORD_OPERATIONS_TOTAL
            .with_label_values(&[collection.segment(), operation, outcome])
            .inc();
        RECORD_OPERATION_DURATION_SECONDS
            .with_label_values(&[collection.segment(), operation])
            .observe(duration);
    }

    HTTP_REQUESTS_IN_FLIGHT
        .with_label_values(&[&method, &sanitized_path])
        .dec();

    response
}
