//! Sub-collection endpoints (/api/patients/:id/<collection>)
//!
//! Tests cover:
//! - Append then read returns exactly what was sent
//! - Collections that start unset versus empty
//! - Partial entry updates and unknown entry ids
//! - Removal where the collection allows it, 405 elsewhere
//! - Billing payments
//! - Approving every treatment plan at once
//! - Every collection is mounted

use crate::support::{
    assert_contains_fields, assert_failure, assert_status, assert_success, billing, collection,
    medication, vital_signs, with_test_app,
};
use axum::http::{Method, StatusCode};
use serde_json::{json, Value};

#[tokio::test]
async fn appended_entry_reads_back_unchanged() -> anyhow::Result<()> {
    with_test_app(|app| {
        Box::pin(async move {
            let patient = app.register("vitals@example.org").await?;
            let base = format!("/api/patients/{}/vital-signs", patient.id);
            let sent = vital_signs();

            let (status, body) = app.json(Method::POST, &base, Some(&sent)).await?;
            assert_status(status, StatusCode::CREATED, "append vitals");
            let entries = collection(assert_success(&body), "vitalSigns");
            assert_eq!(entries.len(), 1, "first append initialises the collection");
            let entry_id = entries[0]["id"].as_str().unwrap().to_string();

            let (status, body) = app
                .json(Method::GET, &format!("{base}/{entry_id}"), None)
                .await?;
            assert_status(status, StatusCode::OK, "read entry");

            let mut expected = sent.clone();
            expected["id"] = json!(entry_id);
            assert_eq!(body["entry"], expected);

            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn server_fills_in_the_recording_time() -> anyhow::Result<()> {
    with_test_app(|app| {
        Box::pin(async move {
            let patient = app.register("defaults@example.org").await?;
            let base = format!("/api/patients/{}/vital-signs", patient.id);

            let (status, _) = app
                .json(
                    Method::POST,
                    &base,
                    Some(&json!({ "bloodPressure": "120/80", "heartRate": 72 })),
                )
                .await?;
            assert_status(status, StatusCode::CREATED, "append vitals");

            let (_, body) = app.json(Method::GET, &base, None).await?;
            let entries = collection(&body, "vitalSigns");
            assert_eq!(entries.len(), 1);

            let entry = entries[0].as_object().unwrap();
            let mut keys: Vec<&str> = entry.keys().map(String::as_str).collect();
            keys.sort_unstable();
            assert_eq!(keys, ["bloodPressure", "dateRecorded", "heartRate", "id"]);
            assert_eq!(entry["bloodPressure"], "120/80");
            assert_eq!(entry["heartRate"], 72);
            assert!(chrono::DateTime::parse_from_rfc3339(
                entry["dateRecorded"].as_str().unwrap()
            )
            .is_ok());

            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn unset_collections_are_not_found_until_first_append() -> anyhow::Result<()> {
    with_test_app(|app| {
        Box::pin(async move {
            let patient = app.register("unset@example.org").await?;
            let base = format!("/api/patients/{}", patient.id);

            for segment in ["admission", "vital-signs", "medical-history", "billing-stages"] {
                let (status, body) = app
                    .json(Method::GET, &format!("{base}/{segment}"), None)
                    .await?;
                assert_status(status, StatusCode::NOT_FOUND, segment);
                assert_failure(&body);
            }

            let (status, body) = app
                .json(Method::GET, &format!("{base}/medications"), None)
                .await?;
            assert_status(status, StatusCode::OK, "medications");
            assert!(collection(&body, "medications").is_empty());

            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn appends_keep_insertion_order() -> anyhow::Result<()> {
    with_test_app(|app| {
        Box::pin(async move {
            let patient = app.register("order@example.org").await?;
            let base = format!("/api/patients/{}/medications", patient.id);

            for name in ["Amoxicillin", "Paracetamol", "Ibuprofen"] {
                let (status, _) = app
                    .json(Method::POST, &base, Some(&medication(name, "500mg")))
                    .await?;
                assert_status(status, StatusCode::CREATED, name);
            }

            let (_, body) = app.json(Method::GET, &base, None).await?;
            let names: Vec<&str> = collection(&body, "medications")
                .iter()
                .filter_map(|m| m["name"].as_str())
                .collect();
            assert_eq!(names, ["Amoxicillin", "Paracetamol", "Ibuprofen"]);

            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn update_merges_supplied_fields_only() -> anyhow::Result<()> {
    with_test_app(|app| {
        Box::pin(async move {
            let patient = app.register("merge@example.org").await?;
            let base = format!("/api/patients/{}/medications", patient.id);

            let (_, body) = app
                .json(Method::POST, &base, Some(&medication("Ibuprofen", "200mg")))
                .await?;
            let entry_id = collection(&body, "medications")[0]["id"]
                .as_str()
                .unwrap()
                .to_string();
            let entry_path = format!("{base}/{entry_id}");

            let (status, body) = app
                .json(Method::PUT, &entry_path, Some(&json!({ "dosage": "400mg" })))
                .await?;
            assert_status(status, StatusCode::OK, "update");
            assert_contains_fields(
                &assert_success(&body)["entry"],
                &json!({
                    "id": entry_id,
                    "name": "Ibuprofen",
                    "dosage": "400mg",
                    "administrationTimes": ["08:00", "20:00"]
                }),
            );

            let (_, body) = app.json(Method::GET, &entry_path, None).await?;
            assert_eq!(body["entry"]["dosage"], "400mg");
            assert_eq!(body["entry"]["name"], "Ibuprofen");

            let (status, _) = app
                .json(
                    Method::PUT,
                    &format!("{base}/6f1c2d8e-3b0a-4c55-9d11-7e2f4a9b0c31"),
                    Some(&json!({ "dosage": "1g" })),
                )
                .await?;
            assert_status(status, StatusCode::NOT_FOUND, "unknown entry id");

            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn invalid_entries_are_rejected() -> anyhow::Result<()> {
    with_test_app(|app| {
        Box::pin(async move {
            let patient = app.register("invalid@example.org").await?;
            let base = format!("/api/patients/{}", patient.id);

            let (status, body) = app
                .json(
                    Method::POST,
                    &format!("{base}/vital-signs"),
                    Some(&json!({ "oxygenSaturation": 140.0 })),
                )
                .await?;
            assert_status(status, StatusCode::BAD_REQUEST, "saturation out of range");
            assert_failure(&body);

            let (status, _) = app
                .json(
                    Method::POST,
                    &format!("{base}/admission"),
                    Some(&json!({ "admissionDate": "2024-03-01" })),
                )
                .await?;
            assert_status(status, StatusCode::BAD_REQUEST, "admission without reason");

            let (status, _) = app
                .json(Method::POST, &format!("{base}/alerts"), Some(&json!([1, 2])))
                .await?;
            assert_status(status, StatusCode::BAD_REQUEST, "non-object entry");

            // Nothing was stored by the failed appends.
            let (status, _) = app
                .json(Method::GET, &format!("{base}/vital-signs"), None)
                .await?;
            assert_status(status, StatusCode::NOT_FOUND, "vitals still unset");

            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn removal_only_where_the_collection_allows_it() -> anyhow::Result<()> {
    with_test_app(|app| {
        Box::pin(async move {
            let patient = app.register("remove@example.org").await?;
            let base = format!("/api/patients/{}", patient.id);

            let (_, body) = app
                .json(
                    Method::POST,
                    &format!("{base}/medications"),
                    Some(&medication("Aspirin", "75mg")),
                )
                .await?;
            let med_id = collection(&body, "medications")[0]["id"]
                .as_str()
                .unwrap()
                .to_string();

            let (status, body) = app
                .json(
                    Method::DELETE,
                    &format!("{base}/medications/{med_id}"),
                    None,
                )
                .await?;
            assert_status(status, StatusCode::OK, "remove medication");
            assert_success(&body);

            let (status, _) = app
                .json(Method::GET, &format!("{base}/medications/{med_id}"), None)
                .await?;
            assert_status(status, StatusCode::NOT_FOUND, "removed medication");

            let (status, _) = app
                .json(
                    Method::DELETE,
                    &format!("{base}/medications/{med_id}"),
                    None,
                )
                .await?;
            assert_status(status, StatusCode::NOT_FOUND, "second removal");

            let (_, body) = app
                .json(
                    Method::POST,
                    &format!("{base}/vital-signs"),
                    Some(&vital_signs()),
                )
                .await?;
            let vitals_id = collection(&body, "vitalSigns")[0]["id"]
                .as_str()
                .unwrap()
                .to_string();
            let (status, _, _) = app
                .request(
                    Method::DELETE,
                    &format!("{base}/vital-signs/{vitals_id}"),
                    None,
                )
                .await?;
            assert_status(
                status,
                StatusCode::METHOD_NOT_ALLOWED,
                "vital signs are not removable",
            );

            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn payments_accumulate_on_a_billing_entry() -> anyhow::Result<()> {
    with_test_app(|app| {
        Box::pin(async move {
            let patient = app.register("billing@example.org").await?;
            let base = format!("/api/patients/{}/billing", patient.id);

            let (status, body) = app.json(Method::POST, &base, Some(&billing())).await?;
            assert_status(status, StatusCode::CREATED, "append billing");
            let bill = &collection(&body, "billingInformation")[0];
            assert_eq!(bill["finalBill"], json!(0.0));
            assert_eq!(bill["paymentHistory"], json!([]));
            let bill_id = bill["id"].as_str().unwrap().to_string();
            let payments = format!("{base}/{bill_id}/payments");

            for amount in [200.0, 350.5] {
                let (status, _) = app
                    .json(
                        Method::POST,
                        &payments,
                        Some(&json!({ "amountPaid": amount, "paymentDate": "2024-04-01" })),
                    )
                    .await?;
                assert_status(status, StatusCode::CREATED, "record payment");
            }

            let (_, body) = app
                .json(Method::GET, &format!("{base}/{bill_id}"), None)
                .await?;
            let history = body["entry"]["paymentHistory"].as_array().unwrap();
            let amounts: Vec<f64> = history
                .iter()
                .filter_map(|p| p["amountPaid"].as_f64())
                .collect();
            assert_eq!(amounts, vec![200.0, 350.5]);
            assert_eq!(body["entry"]["initialCharges"], json!(1200.0));

            let (status, _) = app
                .json(Method::POST, &payments, Some(&json!({ "amountPaid": -5.0 })))
                .await?;
            assert_status(status, StatusCode::BAD_REQUEST, "negative payment");

            let (status, _) = app
                .json(
                    Method::POST,
                    &format!("{base}/6f1c2d8e-3b0a-4c55-9d11-7e2f4a9b0c31/payments"),
                    Some(&json!({ "amountPaid": 10.0 })),
                )
                .await?;
            assert_status(status, StatusCode::NOT_FOUND, "unknown billing entry");

            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn treatment_plans_are_approved_together() -> anyhow::Result<()> {
    with_test_app(|app| {
        Box::pin(async move {
            let patient = app.register("plans@example.org").await?;
            let base = format!("/api/patients/{}/treatment-plans", patient.id);
            let approve = format!("{base}/approve");

            let (status, body) = app.json(Method::PATCH, &approve, None).await?;
            assert_status(status, StatusCode::OK, "approve with no plans");
            assert!(collection(&body, "treatmentPlans").is_empty());

            for protocol in ["Rest", "Physiotherapy"] {
                let (status, body) = app
                    .json(Method::POST, &base, Some(&json!({ "protocol": protocol })))
                    .await?;
                assert_status(status, StatusCode::CREATED, "append plan");
                assert!(collection(&body, "treatmentPlans")
                    .iter()
                    .all(|plan| plan["approved"] == json!(false)));
            }

            let (status, body) = app.json(Method::PATCH, &approve, None).await?;
            assert_status(status, StatusCode::OK, "approve plans");
            let plans = collection(assert_success(&body), "treatmentPlans");
            assert_eq!(plans.len(), 2);
            assert!(plans.iter().all(|plan| plan["approved"] == json!(true)));
            assert_eq!(plans[1]["protocol"], "Physiotherapy");

            let (_, body) = app.json(Method::GET, &base, None).await?;
            assert!(collection(&body, "treatmentPlans")
                .iter()
                .all(|plan| plan["approved"] == json!(true)));

            let (status, _) = app
                .json(
                    Method::PATCH,
                    "/api/patients/6f1c2d8e-3b0a-4c55-9d11-7e2f4a9b0c31/treatment-plans/approve",
                    None,
                )
                .await?;
            assert_status(status, StatusCode::NOT_FOUND, "unknown patient");

            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn immunizations_need_a_name() -> anyhow::Result<()> {
    with_test_app(|app| {
        Box::pin(async move {
            let patient = app.register("shots@example.org").await?;
            let base = format!("/api/patients/{}/immunizations", patient.id);

            let (status, body) = app
                .json(Method::POST, &base, Some(&json!({ "date": "2024-01-15" })))
                .await?;
            assert_status(status, StatusCode::BAD_REQUEST, "missing name");
            assert_failure(&body);

            let (status, body) = app
                .json(
                    Method::POST,
                    &base,
                    Some(&json!({ "immunization_name": "Hepatitis B", "administered_by": "Nurse Ade" })),
                )
                .await?;
            assert_status(status, StatusCode::CREATED, "snake case payload");
            let entries = collection(&body, "immunizations");
            assert_eq!(entries[0]["immunizationName"], "Hepatitis B");
            assert_eq!(entries[0]["administeredBy"], "Nurse Ade");

            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn every_collection_is_mounted() -> anyhow::Result<()> {
    let cases: [(&str, &str, Value); 20] = [
        ("admission", "admissionDetails", json!({ "admissionDate": "2024-03-01", "reason": "Observation" })),
        ("vital-signs", "vitalSigns", json!({ "heartRate": 60 })),
        ("medical-history", "medicalHistory", json!({ "allergies": ["penicillin"] })),
        ("medications", "medications", json!({ "name": "Metformin" })),
        ("treatment-plans", "treatmentPlans", json!({ "protocol": "Standard" })),
        ("lab-results", "labResults", json!({ "testType": "CBC", "result": "normal" })),
        ("imaging-results", "imagingResults", json!({ "imagingType": "X-ray" })),
        ("care-notes", "careNotes", json!({ "note": "Resting comfortably" })),
        ("scheduled-care", "scheduledCareActivities", json!({ "activity": "Physiotherapy" })),
        ("alerts", "alerts", json!({ "alertType": "fall-risk", "message": "Assist walking" })),
        ("insurance", "insuranceDetails", json!({ "provider": "Acme Health" })),
        ("billing", "billingInformation", json!({})),
        ("consent-forms", "consentForms", json!({ "formName": "Surgery consent" })),
        ("discharge-planning", "dischargePlanning", json!({ "dischargeSummary": "Stable" })),
        ("statistics", "statistics", json!({ "height": "180cm", "BMI": "23.1" })),
        ("performance-metrics", "performanceMetrics", json!({ "responseTimes": "4m" })),
        ("appointments", "appointments", json!({ "doctor": "Dr. Osei", "date": "2024-05-02" })),
        ("billing-stages", "billingStages", json!({ "stage": "deposit", "dueDate": "2024-06-01" })),
        ("checkups", "checkups", json!({ "reason": "Annual", "payment": { "amount": 40.0 } })),
        ("immunizations", "immunizations", json!({ "immunizationName": "Tetanus", "date": "2024-01-15" })),
    ];

    with_test_app(|app| {
        Box::pin(async move {
            let patient = app.register("mounted@example.org").await?;

            for (segment, key, payload) in cases {
                let path = format!("/api/patients/{}/{segment}", patient.id);
                let (status, body) = app.json(Method::POST, &path, Some(&payload)).await?;
                assert_status(status, StatusCode::CREATED, segment);
                assert_eq!(collection(&body, key).len(), 1, "{segment}");

                let (status, body) = app.json(Method::GET, &path, None).await?;
                assert_status(status, StatusCode::OK, segment);
                assert_eq!(collection(&body, key).len(), 1, "{segment}");
            }

            Ok(())
        })
    })
    .await
}
