//! Patient record endpoints (/api/patients)
//!
//! Tests cover:
//! - List, read by id and by medical record number
//! - Partial updates keep untouched fields
//! - Delete, then read, is 404
//! - Emergency contact read and update
//! - Malformed ids and unknown routes

use crate::support::{
    assert_failure, assert_status, assert_success, collection, vital_signs, with_test_app,
};
use axum::http::{Method, StatusCode};
use serde_json::json;

#[tokio::test]
async fn list_returns_patients_in_registration_order() -> anyhow::Result<()> {
    with_test_app(|app| {
        Box::pin(async move {
            let (status, body) = app.json(Method::GET, "/api/patients", None).await?;
            assert_status(status, StatusCode::OK, "empty list");
            assert!(collection(&body, "patients").is_empty());

            let first = app.register("first@example.org").await?;
            let second = app.register("second@example.org").await?;

            let (_, body) = app.json(Method::GET, "/api/patients", None).await?;
            let ids: Vec<_> = collection(&body, "patients")
                .iter()
                .map(|p| p["id"].as_str().unwrap().to_string())
                .collect();
            assert_eq!(ids, vec![first.id, second.id]);

            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn read_by_id_and_record_number() -> anyhow::Result<()> {
    with_test_app(|app| {
        Box::pin(async move {
            let patient = app.register("read@example.org").await?;

            let (status, body) = app
                .json(Method::GET, &format!("/api/patients/{}", patient.id), None)
                .await?;
            assert_status(status, StatusCode::OK, "read by id");
            assert_eq!(
                assert_success(&body)["patient"]["medicalRecordNumber"],
                patient.medical_record_number.as_str()
            );

            let (status, body) = app
                .json(
                    Method::GET,
                    &format!("/api/patients/mrn/{}", patient.medical_record_number),
                    None,
                )
                .await?;
            assert_status(status, StatusCode::OK, "read by record number");
            assert_eq!(body["patient"]["id"], patient.id.as_str());

            let (status, _) = app
                .json(Method::GET, "/api/patients/mrn/AAAAAAAAAA", None)
                .await?;
            assert_status(status, StatusCode::NOT_FOUND, "unknown record number");

            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn update_changes_only_supplied_fields() -> anyhow::Result<()> {
    with_test_app(|app| {
        Box::pin(async move {
            let patient = app.register("update@example.org").await?;
            let path = format!("/api/patients/{}", patient.id);

            let (status, body) = app
                .json(
                    Method::PUT,
                    &path,
                    Some(&json!({
                        "fullName": "Renamed Patient",
                        "contactInformation": { "phoneNumber": "555-0100" }
                    })),
                )
                .await?;
            assert_status(status, StatusCode::OK, "update");
            let updated = &assert_success(&body)["patient"];
            assert_eq!(updated["fullName"], "Renamed Patient");
            assert_eq!(updated["contactInformation"]["phoneNumber"], "555-0100");
            assert_eq!(updated["contactInformation"]["email"], "update@example.org");
            assert_eq!(
                updated["medicalRecordNumber"],
                patient.medical_record_number.as_str()
            );

            let (_, body) = app.json(Method::GET, &path, None).await?;
            assert_eq!(body["patient"]["fullName"], "Renamed Patient");

            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn update_rejects_identity_fields() -> anyhow::Result<()> {
    with_test_app(|app| {
        Box::pin(async move {
            let patient = app.register("identity@example.org").await?;

            let (status, body) = app
                .json(
                    Method::PUT,
                    &format!("/api/patients/{}", patient.id),
                    Some(&json!({ "medicalRecordNumber": "ABCDEFGHIJ" })),
                )
                .await?;
            assert_status(status, StatusCode::BAD_REQUEST, "identity field");
            assert_failure(&body);

            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn delete_removes_record_and_its_collections() -> anyhow::Result<()> {
    with_test_app(|app| {
        Box::pin(async move {
            let patient = app.register("delete@example.org").await?;
            let path = format!("/api/patients/{}", patient.id);

            let (status, _) = app
                .json(
                    Method::POST,
                    &format!("{path}/vital-signs"),
                    Some(&vital_signs()),
                )
                .await?;
            assert_status(status, StatusCode::CREATED, "append vitals");

            let (status, body) = app.json(Method::DELETE, &path, None).await?;
            assert_status(status, StatusCode::OK, "delete");
            assert_success(&body);

            let (status, _) = app.json(Method::GET, &path, None).await?;
            assert_status(status, StatusCode::NOT_FOUND, "read after delete");

            let (status, _) = app
                .json(Method::GET, &format!("{path}/vital-signs"), None)
                .await?;
            assert_status(status, StatusCode::NOT_FOUND, "collection after delete");

            let (status, _) = app.json(Method::DELETE, &path, None).await?;
            assert_status(status, StatusCode::NOT_FOUND, "second delete");

            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn emergency_contact_is_merged_field_by_field() -> anyhow::Result<()> {
    with_test_app(|app| {
        Box::pin(async move {
            let patient = app.register("contact@example.org").await?;
            let path = format!("/api/patients/{}/emergency-contact", patient.id);

            let (status, body) = app
                .json(
                    Method::PUT,
                    &path,
                    Some(&json!({ "name": "Sam Lee", "relationship": "partner" })),
                )
                .await?;
            assert_status(status, StatusCode::OK, "set contact");
            assert_eq!(body["emergencyContact"]["name"], "Sam Lee");

            let (_, body) = app
                .json(Method::PUT, &path, Some(&json!({ "phoneNumber": "555-0199" })))
                .await?;
            assert_eq!(body["emergencyContact"]["name"], "Sam Lee");
            assert_eq!(body["emergencyContact"]["phoneNumber"], "555-0199");

            let (status, body) = app.json(Method::GET, &path, None).await?;
            assert_status(status, StatusCode::OK, "read contact");
            assert_eq!(body["emergencyContact"]["relationship"], "partner");

            let (status, _) = app
                .json(Method::PUT, &path, Some(&json!({ "email": "not-an-email" })))
                .await?;
            assert_status(status, StatusCode::BAD_REQUEST, "invalid contact email");

            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn malformed_and_unknown_ids_are_not_found() -> anyhow::Result<()> {
    with_test_app(|app| {
        Box::pin(async move {
            let (status, body) = app
                .json(Method::GET, "/api/patients/not-a-uuid", None)
                .await?;
            assert_status(status, StatusCode::NOT_FOUND, "malformed id");
            assert_failure(&body);

            let (status, _) = app
                .json(
                    Method::GET,
                    "/api/patients/6f1c2d8e-3b0a-4c55-9d11-7e2f4a9b0c31",
                    None,
                )
                .await?;
            assert_status(status, StatusCode::NOT_FOUND, "unknown id");

            let (status, _) = app
                .json(
                    Method::DELETE,
                    "/api/patients/6f1c2d8e-3b0a-4c55-9d11-7e2f4a9b0c31",
                    None,
                )
                .await?;
            assert_status(status, StatusCode::NOT_FOUND, "delete unknown id");

            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn unknown_routes_use_the_error_envelope() -> anyhow::Result<()> {
    with_test_app(|app| {
        Box::pin(async move {
            let (status, body) = app.json(Method::GET, "/api/nothing-here", None).await?;
            assert_status(status, StatusCode::NOT_FOUND, "unknown route");
            assert_failure(&body);
            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn metrics_are_exposed_after_traffic() -> anyhow::Result<()> {
    with_test_app(|app| {
        Box::pin(async move {
            app.register("metrics@example.org").await?;

            let (status, _, body) = app.request(Method::GET, "/metrics", None).await?;
            assert_status(status, StatusCode::OK, "metrics");
            let text = String::from_utf8(body.to_vec())?;
            assert!(text.contains("carebase_http_requests_total"));
            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn health_reports_storage_backend() -> anyhow::Result<()> {
    with_test_app(|app| {
        Box::pin(async move {
            let (status, headers, body) = app.request(Method::GET, "/health", None).await?;
            assert_status(status, StatusCode::OK, "health");
            assert!(headers.contains_key("x-request-id"));
            assert_eq!(headers["cache-control"], "no-store");
            assert_eq!(headers["x-content-type-options"], "nosniff");

            let body: serde_json::Value = serde_json::from_slice(&body)?;
            assert_eq!(body["status"], "ok");
            assert_eq!(body["storage"], "memory");
            Ok(())
        })
    })
    .await
}
