//! Bed inventory and assignment (/api/beds, /api/patients/mrn/:mrn/assign-bed)
//!
//! Tests cover:
//! - Adding beds with explicit and allocated numbers
//! - Listing and filtering by status
//! - Status changes
//! - Assignment, reassignment and release on delete
//! - Status changes that free a bed unassign its patient

use crate::support::{assert_failure, assert_status, assert_success, collection, TestApp};
use crate::support::with_test_app;
use axum::http::{Method, StatusCode};
use serde_json::{json, Value};

async fn add_bed(app: &TestApp, payload: Value) -> anyhow::Result<Value> {
    let (status, body) = app.json(Method::POST, "/api/beds", Some(&payload)).await?;
    assert_status(status, StatusCode::CREATED, "add bed");
    Ok(assert_success(&body)["bed"].clone())
}

async fn bed_statuses(app: &TestApp) -> anyhow::Result<Vec<(i64, String)>> {
    let (_, body) = app.json(Method::GET, "/api/beds", None).await?;
    Ok(collection(&body, "beds")
        .iter()
        .map(|b| {
            (
                b["bedNo"].as_i64().unwrap_or_default(),
                b["status"].as_str().unwrap_or_default().to_string(),
            )
        })
        .collect())
}

#[tokio::test]
async fn beds_get_explicit_or_next_numbers() -> anyhow::Result<()> {
    with_test_app(|app| {
        Box::pin(async move {
            let bed = add_bed(app, json!({ "bedNo": 10, "roomNo": 2 })).await?;
            assert_eq!(bed, json!({ "bedNo": 10, "roomNo": 2, "status": "available" }));

            let next = add_bed(app, json!({})).await?;
            assert_eq!(next["bedNo"], 11);

            let (status, body) = app
                .json(Method::POST, "/api/beds", Some(&json!({ "bedNo": 10 })))
                .await?;
            assert_status(status, StatusCode::CONFLICT, "duplicate bed number");
            assert_failure(&body);

            let (status, _) = app
                .json(Method::POST, "/api/beds", Some(&json!({ "bedNo": 0 })))
                .await?;
            assert_status(status, StatusCode::BAD_REQUEST, "non-positive bed number");

            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn numbering_past_the_largest_bed_is_a_conflict() -> anyhow::Result<()> {
    with_test_app(|app| {
        Box::pin(async move {
            add_bed(app, json!({ "bedNo": i32::MAX })).await?;

            let (status, body) = app
                .json(Method::POST, "/api/beds", Some(&json!({})))
                .await?;
            assert_status(status, StatusCode::CONFLICT, "no number left");
            assert!(assert_failure(&body).contains("bedNo"));

            add_bed(app, json!({ "bedNo": 3 })).await?;
            assert_eq!(bed_statuses(app).await?.len(), 2);

            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn list_filters_by_status() -> anyhow::Result<()> {
    with_test_app(|app| {
        Box::pin(async move {
            add_bed(app, json!({ "bedNo": 1 })).await?;
            add_bed(app, json!({ "bedNo": 2, "status": "maintenance" })).await?;
            add_bed(app, json!({ "bedNo": 3 })).await?;

            let (status, body) = app
                .json(Method::GET, "/api/beds/status/available", None)
                .await?;
            assert_status(status, StatusCode::OK, "available beds");
            let numbers: Vec<_> = collection(&body, "beds")
                .iter()
                .map(|b| b["bedNo"].clone())
                .collect();
            assert_eq!(numbers, vec![json!(1), json!(3)]);

            let (_, body) = app
                .json(Method::GET, "/api/beds?status=maintenance", None)
                .await?;
            assert_eq!(collection(&body, "beds").len(), 1);

            let (status, _) = app
                .json(Method::GET, "/api/beds/status/broken", None)
                .await?;
            assert_status(status, StatusCode::BAD_REQUEST, "unknown status");

            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn status_can_be_changed() -> anyhow::Result<()> {
    with_test_app(|app| {
        Box::pin(async move {
            add_bed(app, json!({ "bedNo": 4 })).await?;

            let (status, body) = app
                .json(
                    Method::PATCH,
                    "/api/beds/4/status",
                    Some(&json!({ "status": "maintenance" })),
                )
                .await?;
            assert_status(status, StatusCode::OK, "set status");
            assert_eq!(body["bed"]["status"], "maintenance");

            let (status, _) = app
                .json(
                    Method::PATCH,
                    "/api/beds/99/status",
                    Some(&json!({ "status": "available" })),
                )
                .await?;
            assert_status(status, StatusCode::NOT_FOUND, "unknown bed");

            let (status, _) = app
                .json(
                    Method::PATCH,
                    "/api/beds/four/status",
                    Some(&json!({ "status": "available" })),
                )
                .await?;
            assert_status(status, StatusCode::NOT_FOUND, "non-numeric bed");

            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn assignment_occupies_and_releases_beds() -> anyhow::Result<()> {
    with_test_app(|app| {
        Box::pin(async move {
            add_bed(app, json!({ "bedNo": 1 })).await?;
            add_bed(app, json!({ "bedNo": 2 })).await?;
            let patient = app.register("bed@example.org").await?;
            let assign = format!(
                "/api/patients/mrn/{}/assign-bed",
                patient.medical_record_number
            );

            let (status, body) = app
                .json(Method::PATCH, &assign, Some(&json!({ "bedNo": 1 })))
                .await?;
            assert_status(status, StatusCode::OK, "assign");
            assert_eq!(body["patient"]["bedNo"], 1);
            assert_eq!(body["bed"]["status"], "occupied");

            // Same bed again is a no-op.
            let (status, _) = app
                .json(Method::PATCH, &assign, Some(&json!({ "bedNo": 1 })))
                .await?;
            assert_status(status, StatusCode::OK, "reassign same bed");

            let (status, body) = app
                .json(Method::PATCH, &assign, Some(&json!({ "bedNo": 2 })))
                .await?;
            assert_status(status, StatusCode::OK, "move bed");
            assert_eq!(body["patient"]["bedNo"], 2);
            assert_eq!(
                bed_statuses(app).await?,
                vec![(1, "available".to_string()), (2, "occupied".to_string())]
            );

            let (status, _) = app
                .json(Method::DELETE, &format!("/api/patients/{}", patient.id), None)
                .await?;
            assert_status(status, StatusCode::OK, "delete patient");
            assert_eq!(
                bed_statuses(app).await?,
                vec![(1, "available".to_string()), (2, "available".to_string())]
            );

            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn assignment_conflicts_and_unknowns() -> anyhow::Result<()> {
    with_test_app(|app| {
        Box::pin(async move {
            add_bed(app, json!({ "bedNo": 7, "status": "maintenance" })).await?;
            add_bed(app, json!({ "bedNo": 8 })).await?;
            let first = app.register("one@example.org").await?;
            let second = app.register("two@example.org").await?;
            let assign = |mrn: &str| format!("/api/patients/mrn/{mrn}/assign-bed");

            let (status, body) = app
                .json(
                    Method::PATCH,
                    &assign(&first.medical_record_number),
                    Some(&json!({ "bedNo": 7 })),
                )
                .await?;
            assert_status(status, StatusCode::CONFLICT, "bed under maintenance");
            assert!(assert_failure(&body).contains("maintenance"));

            let (status, _) = app
                .json(
                    Method::PATCH,
                    &assign(&first.medical_record_number),
                    Some(&json!({ "bedNo": 8 })),
                )
                .await?;
            assert_status(status, StatusCode::OK, "first patient");

            let (status, _) = app
                .json(
                    Method::PATCH,
                    &assign(&second.medical_record_number),
                    Some(&json!({ "bedNo": 8 })),
                )
                .await?;
            assert_status(status, StatusCode::CONFLICT, "occupied bed");

            let (status, _) = app
                .json(
                    Method::PATCH,
                    &assign(&second.medical_record_number),
                    Some(&json!({ "bedNo": 42 })),
                )
                .await?;
            assert_status(status, StatusCode::NOT_FOUND, "unknown bed");

            let (status, _) = app
                .json(
                    Method::PATCH,
                    &assign("QQQQQQQQQQ"),
                    Some(&json!({ "bedNo": 8 })),
                )
                .await?;
            assert_status(status, StatusCode::NOT_FOUND, "unknown patient");

            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn freed_bed_goes_to_the_next_patient_only() -> anyhow::Result<()> {
    with_test_app(|app| {
        Box::pin(async move {
            add_bed(app, json!({ "bedNo": 1 })).await?;
            add_bed(app, json!({ "bedNo": 2 })).await?;
            let first = app.register("first@example.org").await?;
            let second = app.register("second@example.org").await?;
            let assign = |mrn: &str| format!("/api/patients/mrn/{mrn}/assign-bed");

            let (status, _) = app
                .json(
                    Method::PATCH,
                    &assign(&first.medical_record_number),
                    Some(&json!({ "bedNo": 1 })),
                )
                .await?;
            assert_status(status, StatusCode::OK, "first patient");

            let (status, _) = app
                .json(
                    Method::PATCH,
                    "/api/beds/1/status",
                    Some(&json!({ "status": "available" })),
                )
                .await?;
            assert_status(status, StatusCode::OK, "free bed");

            let (_, body) = app
                .json(Method::GET, &format!("/api/patients/{}", first.id), None)
                .await?;
            assert!(body["patient"].get("bedNo").map_or(true, Value::is_null));

            let (status, _) = app
                .json(
                    Method::PATCH,
                    &assign(&second.medical_record_number),
                    Some(&json!({ "bedNo": 1 })),
                )
                .await?;
            assert_status(status, StatusCode::OK, "second patient");

            // Moving or deleting the first patient must not free bed 1.
            let (status, _) = app
                .json(
                    Method::PATCH,
                    &assign(&first.medical_record_number),
                    Some(&json!({ "bedNo": 2 })),
                )
                .await?;
            assert_status(status, StatusCode::OK, "move first patient");
            let (status, _) = app
                .json(Method::DELETE, &format!("/api/patients/{}", first.id), None)
                .await?;
            assert_status(status, StatusCode::OK, "delete first patient");

            assert_eq!(
                bed_statuses(app).await?,
                vec![(1, "occupied".to_string()), (2, "available".to_string())]
            );
            let (_, body) = app
                .json(Method::GET, &format!("/api/patients/{}", second.id), None)
                .await?;
            assert_eq!(body["patient"]["bedNo"], 1);

            Ok(())
        })
    })
    .await
}
