use super::models::{
    FormCreate, FormStatus, ReadingEntry, ReadingSubmission, SendToTechnician, SensoryEntry,
    SensorySubmission,
};
use super::services;
use crate::alerts::models::Urgency;
use crate::bacteria::models::SelectionStatus;
use crate::bacteria::services::submit_reading;
use crate::common::auth::{Actor, Role};
use crate::common::errors::BusinessError;
use crate::config::test_helpers::{send_as, setup_test_app, setup_test_db};
use crate::history::services::list_for_form;
use crate::samples::models::{Conformity, SampleCreate, SampleResultsUpdate, SampleStatus};
use crate::samples::services::{samples_of_form, update_results};
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::{Value, json};
use tower::ServiceExt;

fn coordinator() -> Actor {
    Actor::new("camille", Role::Coordinator)
}

fn technician() -> Actor {
    Actor::new("sam", Role::Technician)
}

fn monday_morning() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, 8, 0, 0).unwrap()
}

async fn create_draft(app: &Router, sample_count: usize) -> Value {
    let samples: Vec<Value> = (1..=sample_count)
        .map(|n| json!({"number": n.to_string(), "product": "Fromage blanc 20%", "ready_time": "7:30", "dlc": "28-03-2025"}))
        .collect();
    let (status, body) = send_as(
        app,
        "coordinator",
        "POST",
        "/api/forms",
        Some(json!({
            "report_title": "Contrôle hebdomadaire",
            "brand": "Grand Frais",
            "site": "R1",
            "samples": samples,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "Failed to create form: {body:?}");
    body
}

async fn send_draft(app: &Router, form_id: &str) -> Value {
    let (status, body) = send_as(
        app,
        "coordinator",
        "POST",
        &format!("/api/forms/{form_id}/send"),
        Some(json!({"bacteria": ["Entérobactéries", "Levures/Moisissures (5j)"]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "Failed to send form: {body:?}");
    body
}

fn full_sensory(sample: &Value) -> Value {
    json!({
        "sample_id": sample["id"],
        "version": sample["version"],
        "smell": "C",
        "texture": "C",
        "taste": "NC",
        "aspect": "C",
        "ph": "6,5",
    })
}

#[tokio::test]
async fn test_coordinator_creates_draft_with_samples() {
    let (app, _db) = setup_test_app().await;
    let form = create_draft(&app, 2).await;

    assert_eq!(form["status"], "draft");
    assert_eq!(form["brand"], "Grand Frais");
    assert_eq!(form["created_by"], "coordinator-tester");
    let samples = form["samples"].as_array().unwrap();
    assert_eq!(samples.len(), 2);
    for sample in samples {
        assert_eq!(sample["status"], "pending");
        assert_eq!(sample["smell"], "N");
        assert_eq!(sample["site"], "R1");
        assert_eq!(sample["ready_time"], "07:30");
        assert_eq!(sample["dlc"], "2025-03-28");
        assert_eq!(sample["version"], 1);
    }
    assert!(form["bacteria"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_form_creation_is_role_gated() {
    let (app, _db) = setup_test_app().await;
    let payload = json!({"report_title": "T", "brand": "B", "site": "S"});

    for role in ["technician", "guest", "visitor"] {
        let (status, body) =
            send_as(&app, role, "POST", "/api/forms", Some(payload.clone())).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{role}: {body:?}");
        assert_eq!(body["error"]["code"], "FORBIDDEN");
    }

    let (status, body) = send_as(&app, "guest", "GET", "/api/forms", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());

    let (status, _) = send_as(&app, "visitor", "GET", "/api/forms", None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_form_creation_validates_fields() {
    let (app, _db) = setup_test_app().await;
    let (status, body) = send_as(
        &app,
        "coordinator",
        "POST",
        "/api/forms",
        Some(json!({"report_title": "T", "brand": "  ", "site": "R1"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["message"].as_str().unwrap().contains("brand"));

    let (status, _) = send_as(
        &app,
        "coordinator",
        "POST",
        "/api/forms",
        Some(json!({
            "report_title": "T",
            "brand": "B",
            "site": "R1",
            "samples": [{"number": "1", "product": "Yaourt", "fabrication": "2025-13-40"}],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Nothing was written by the failed attempts
    let (_, forms) = send_as(&app, "coordinator", "GET", "/api/forms", None).await;
    assert!(forms.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_list_forms_filters_by_status() {
    let (app, _db) = setup_test_app().await;
    let first = create_draft(&app, 1).await;
    create_draft(&app, 3).await;
    send_draft(&app, first["id"].as_str().unwrap()).await;

    let (status, drafts) =
        send_as(&app, "technician", "GET", "/api/forms?status=draft", None).await;
    assert_eq!(status, StatusCode::OK);
    let drafts = drafts.as_array().unwrap();
    assert_eq!(drafts.len(), 1);
    assert_eq!(drafts[0]["sample_count"], 3);

    let (_, sent) = send_as(
        &app,
        "technician",
        "GET",
        "/api/forms?status=analyses_en_cours",
        None,
    )
    .await;
    assert_eq!(sent.as_array().unwrap().len(), 1);
    assert_eq!(sent[0]["id"], first["id"]);

    let (_, all) = send_as(&app, "guest", "GET", "/api/forms", None).await;
    assert_eq!(all.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_send_requires_bacteria_and_samples() {
    let (app, _db) = setup_test_app().await;
    let form = create_draft(&app, 1).await;
    let id = form["id"].as_str().unwrap();

    let (status, body) = send_as(
        &app,
        "coordinator",
        "POST",
        &format!("/api/forms/{id}/send"),
        Some(json!({"bacteria": []})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "PRECONDITION_FAILED");
    assert_eq!(body["error"]["missing"], json!(["bacteria"]));

    let (status, body) = send_as(
        &app,
        "coordinator",
        "POST",
        &format!("/api/forms/{id}/send"),
        Some(json!({"bacteria": ["Salmonella"]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["message"].as_str().unwrap().contains("Salmonella"));

    let empty = create_draft(&app, 0).await;
    let (status, body) = send_as(
        &app,
        "coordinator",
        "POST",
        &format!("/api/forms/{}/send", empty["id"].as_str().unwrap()),
        Some(json!({"bacteria": ["Listeria"]})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["missing"], json!(["samples"]));

    // Failed sends leave the draft untouched
    let (_, form) = send_as(&app, "coordinator", "GET", &format!("/api/forms/{id}"), None).await;
    assert_eq!(form["status"], "draft");
    assert!(form["bacteria"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_send_creates_pending_selections() {
    let (app, _db) = setup_test_app().await;
    let form = create_draft(&app, 2).await;
    let id = form["id"].as_str().unwrap();

    let (status, _) = send_as(
        &app,
        "technician",
        "POST",
        &format!("/api/forms/{id}/send"),
        Some(json!({"bacteria": ["Listeria"]})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let form = send_draft(&app, id).await;
    assert_eq!(form["status"], "analyses_en_cours");
    assert_eq!(form["version"], 2);
    let bacteria = form["bacteria"].as_array().unwrap();
    assert_eq!(bacteria.len(), 2);
    assert_eq!(bacteria[0]["bacteria_name"], "Entérobactéries");
    assert_eq!(bacteria[0]["bacteria_delay"], "24h");
    assert_eq!(bacteria[1]["bacteria_delay"], "5j");
    for selection in bacteria {
        assert_eq!(selection["status"], "pending");
        assert_eq!(selection["is_ready"], false);
        assert!(selection["due_at"].is_null());
    }
    for sample in form["samples"].as_array().unwrap() {
        assert_eq!(sample["status"], "analyses_en_cours");
    }

    // The draft stage is over
    let (status, body) = send_as(
        &app,
        "coordinator",
        "POST",
        &format!("/api/forms/{id}/send"),
        Some(json!({"bacteria": ["Listeria"]})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "BUSINESS_RULE_VIOLATION");
}

#[tokio::test]
async fn test_incomplete_sensory_batch_changes_nothing() {
    let (app, _db) = setup_test_app().await;
    let form = create_draft(&app, 3).await;
    let id = form["id"].as_str().unwrap();
    let form = send_draft(&app, id).await;
    let samples = form["samples"].as_array().unwrap();

    let mut missing_ph = full_sensory(&samples[1]);
    missing_ph["ph"] = json!("");
    let results = json!([full_sensory(&samples[0]), missing_ph]);

    let (status, body) = send_as(
        &app,
        "technician",
        "POST",
        &format!("/api/forms/{id}/sensory"),
        Some(json!({"results": results})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{body:?}");
    assert_eq!(body["error"]["code"], "PRECONDITION_FAILED");
    assert_eq!(
        body["error"]["missing"],
        json!(["#2: ph", "#3: smell, texture, taste, aspect, ph"])
    );

    let (_, form) = send_as(&app, "guest", "GET", &format!("/api/forms/{id}"), None).await;
    assert_eq!(form["status"], "analyses_en_cours");
    for sample in form["samples"].as_array().unwrap() {
        assert_eq!(sample["smell"], "N", "batch must be rolled back");
        assert_eq!(sample["status"], "analyses_en_cours");
    }
}

#[tokio::test]
async fn test_sensory_batch_moves_form_to_waiting_reading() {
    let (app, _db) = setup_test_app().await;
    let form = create_draft(&app, 2).await;
    let id = form["id"].as_str().unwrap();
    let form = send_draft(&app, id).await;
    let results: Vec<Value> = form["samples"]
        .as_array()
        .unwrap()
        .iter()
        .map(full_sensory)
        .collect();

    let (status, _) = send_as(
        &app,
        "coordinator",
        "POST",
        &format!("/api/forms/{id}/sensory"),
        Some(json!({"results": results.clone()})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, form) = send_as(
        &app,
        "technician",
        "POST",
        &format!("/api/forms/{id}/sensory"),
        Some(json!({"results": results})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{form:?}");
    assert_eq!(form["status"], "waiting_reading");
    for sample in form["samples"].as_array().unwrap() {
        assert_eq!(sample["status"], "waiting_reading");
        assert_eq!(sample["taste"], "NC");
        assert_eq!(sample["ph"], "6.5");
    }
    for selection in form["bacteria"].as_array().unwrap() {
        assert_eq!(selection["status"], "pending");
        assert!(selection["seeded_at"].is_string());
        assert!(selection["due_at"].is_string());
        assert!(selection["reading_day"].is_string());
        assert_eq!(selection["is_ready"], false);
    }
}

#[tokio::test]
async fn test_stale_sample_version_is_a_conflict() {
    let (app, _db) = setup_test_app().await;
    let form = create_draft(&app, 1).await;
    let id = form["id"].as_str().unwrap();
    send_draft(&app, id).await;

    // Versions were bumped by the send, the draft copy is stale
    let stale = full_sensory(&form["samples"][0]);
    let (status, body) = send_as(
        &app,
        "technician",
        "POST",
        &format!("/api/forms/{id}/sensory"),
        Some(json!({"results": [stale]})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "VERSION_CONFLICT");
}

#[tokio::test]
async fn test_cancel_draft_discards_everything() {
    let (app, db) = setup_test_app().await;
    let form = create_draft(&app, 2).await;
    let id = form["id"].as_str().unwrap();

    let (status, _) =
        send_as(&app, "technician", "DELETE", &format!("/api/forms/{id}"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) =
        send_as(&app, "coordinator", "DELETE", &format!("/api/forms/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send_as(&app, "coordinator", "GET", &format!("/api/forms/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let form_id = uuid::Uuid::parse_str(id).unwrap();
    let samples = samples_of_form(&db, form_id).await.unwrap();
    assert!(samples.is_empty());

    let sent = create_draft(&app, 1).await;
    let sent_id = sent["id"].as_str().unwrap();
    send_draft(&app, sent_id).await;
    let (status, _) =
        send_as(&app, "coordinator", "DELETE", &format!("/api/forms/{sent_id}"), None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_readings_are_refused_before_the_delay() {
    let (app, _db) = setup_test_app().await;
    let form = create_draft(&app, 1).await;
    let id = form["id"].as_str().unwrap();
    let form = send_draft(&app, id).await;
    let results = json!([full_sensory(&form["samples"][0])]);
    let (_, form) = send_as(
        &app,
        "technician",
        "POST",
        &format!("/api/forms/{id}/sensory"),
        Some(json!({"results": results})),
    )
    .await;

    let selection_id = form["bacteria"][0]["id"].as_str().unwrap();
    let sample = &form["samples"][0];
    let (status, body) = send_as(
        &app,
        "technician",
        "POST",
        &format!("/api/forms/{id}/readings/{selection_id}"),
        Some(json!({
            "results": [{"sample_id": sample["id"], "version": sample["version"], "value": "12"}],
            "complete": true,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"]["message"].as_str().unwrap().contains("reading_not_due"));
}

#[tokio::test]
async fn test_export_lists_one_row_per_sample() {
    let (app, _db) = setup_test_app().await;
    let form = create_draft(&app, 3).await;
    let id = form["id"].as_str().unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("/api/forms/{id}/export"))
                .header("x-actor-name", "guest-tester")
                .header("x-actor-role", "guest")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers()["content-type"]
            .to_str()
            .unwrap()
            .starts_with("text/csv")
    );

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with("report_title,brand,site,form_status,number"));
    assert!(lines[1].contains("Grand Frais"));
    assert!(lines[1].contains("2025-03-28"));
}

#[tokio::test]
async fn test_full_lifecycle_archives_after_last_reading() {
    let db = setup_test_db().await;
    let t0 = monday_morning();

    let form = services::create_form(
        &db,
        &coordinator(),
        FormCreate {
            report_title: "Contrôle R1".to_string(),
            brand: "Grand Frais".to_string(),
            site: "R1".to_string(),
            samples: (1..=3)
                .map(|n| SampleCreate {
                    number: n.to_string(),
                    product: "Fromage blanc".to_string(),
                    ..Default::default()
                })
                .collect(),
        },
        t0,
    )
    .await
    .unwrap();
    assert_eq!(form.status, FormStatus::Draft);
    assert_eq!(form.samples.len(), 3);

    let form = services::send_to_technician(
        &db,
        &coordinator(),
        form.id,
        SendToTechnician {
            bacteria: vec![
                "Entérobactéries".to_string(),
                "Levures/Moisissures(5j)".to_string(),
            ],
        },
        t0 + Duration::minutes(30),
    )
    .await
    .unwrap();
    assert_eq!(form.status, FormStatus::AnalysesEnCours);

    // Plates are seeded when the sensory session is saved
    let seeded = t0 + Duration::hours(1);
    let submission = SensorySubmission {
        results: form
            .samples
            .iter()
            .map(|sample| SensoryEntry {
                sample_id: sample.id,
                values: SampleResultsUpdate {
                    version: sample.version,
                    smell: Some(Conformity::Conforming),
                    texture: Some(Conformity::Conforming),
                    taste: Some(Conformity::NonConforming),
                    aspect: Some(Conformity::Conforming),
                    ph: Some("6.5".to_string()),
                    lab_comment: None,
                },
            })
            .collect(),
    };
    let form = services::submit_sensory(&db, &technician(), form.id, submission, seeded)
        .await
        .unwrap();
    assert_eq!(form.status, FormStatus::WaitingReading);
    let names: Vec<&str> = form
        .bacteria
        .iter()
        .map(|selection| selection.bacteria_name.as_str())
        .collect();
    assert_eq!(names, vec!["Entérobactéries", "Levures/Moisissures (5j)"]);
    assert!(
        form.bacteria
            .iter()
            .all(|selection| selection.status == SelectionStatus::Pending)
    );
    let entero = form.bacteria[0].clone();
    let yeast = form.bacteria[1].clone();
    assert_eq!(entero.due_at, Some(seeded + Duration::hours(24)));
    assert_eq!(entero.reading_day.as_deref(), Some("Tuesday"));
    assert_eq!(yeast.due_at, Some(seeded + Duration::hours(120)));
    assert_eq!(yeast.reading_day.as_deref(), Some("Saturday"));

    let readings = |form: &super::models::Form, value: &str| ReadingSubmission {
        results: form
            .samples
            .iter()
            .map(|sample| ReadingEntry {
                sample_id: sample.id,
                version: sample.version,
                value: value.to_string(),
            })
            .collect(),
        complete: true,
    };

    let too_early = submit_reading(
        &db,
        &technician(),
        form.id,
        entero.id,
        readings(&form, "12"),
        seeded + Duration::hours(23),
    )
    .await
    .unwrap_err();
    assert!(matches!(
        too_early,
        BusinessError::BusinessRuleViolation { ref rule, .. } if rule == "reading_not_due"
    ));

    let form = submit_reading(
        &db,
        &technician(),
        form.id,
        entero.id,
        readings(&form, "12"),
        seeded + Duration::hours(25),
    )
    .await
    .unwrap();
    assert_eq!(form.status, FormStatus::WaitingReading);
    assert_eq!(form.bacteria[0].status, SelectionStatus::Completed);
    assert_eq!(form.bacteria[1].status, SelectionStatus::Pending);
    assert!(
        form.samples
            .iter()
            .all(|sample| sample.enterobacteria.as_deref() == Some("12"))
    );

    // A completed reading cannot be reopened
    let again = submit_reading(
        &db,
        &technician(),
        form.id,
        entero.id,
        readings(&form, "15"),
        seeded + Duration::hours(26),
    )
    .await
    .unwrap_err();
    assert!(matches!(
        again,
        BusinessError::BusinessRuleViolation { ref rule, .. } if rule == "selection_completed"
    ));

    let form = submit_reading(
        &db,
        &technician(),
        form.id,
        yeast.id,
        readings(&form, "<10"),
        seeded + Duration::hours(121),
    )
    .await
    .unwrap();
    assert_eq!(form.status, FormStatus::Completed);
    assert!(
        form.bacteria
            .iter()
            .all(|selection| selection.status == SelectionStatus::Completed)
    );
    assert!(
        form.samples
            .iter()
            .all(|sample| sample.status == SampleStatus::Completed)
    );
    assert!(form.alerts.is_empty());

    let history = list_for_form(&db, form.id).await.unwrap();
    let actions: Vec<&str> = history.iter().map(|entry| entry.action.as_str()).collect();
    assert!(actions.contains(&"create_form"));
    assert!(actions.contains(&"send_to_technician"));
    assert!(actions.contains(&"submit_sensory"));
    let archive = history
        .iter()
        .find(|entry| entry.action == "archive_form")
        .unwrap();
    assert_eq!(archive.user_name, "sam");
    assert_eq!(archive.role, "technician");
    assert_eq!(archive.new_value.as_deref(), Some("completed"));
}

#[tokio::test]
async fn test_status_mirror_refuses_samples_edited_since_read() {
    let db = setup_test_db().await;
    let t0 = monday_morning();
    let form = services::create_form(
        &db,
        &coordinator(),
        FormCreate {
            report_title: "Contrôle".to_string(),
            brand: "Leclerc".to_string(),
            site: "R2".to_string(),
            samples: vec![SampleCreate {
                number: "1".to_string(),
                product: "Faisselle".to_string(),
                ..Default::default()
            }],
        },
        t0,
    )
    .await
    .unwrap();
    let form = services::send_to_technician(
        &db,
        &coordinator(),
        form.id,
        SendToTechnician {
            bacteria: vec!["Listeria".to_string()],
        },
        t0,
    )
    .await
    .unwrap();
    let snapshot = samples_of_form(&db, form.id).await.unwrap();

    // A second technician saves a result after the snapshot was taken
    let edited = update_results(
        &db,
        &Actor::new("lou", Role::Technician),
        snapshot[0].id,
        SampleResultsUpdate {
            version: snapshot[0].version,
            ph: Some("6.8".to_string()),
            ..Default::default()
        },
        t0 + Duration::minutes(1),
    )
    .await
    .unwrap();

    let err = services::mirror_sample_statuses(
        &db,
        &snapshot,
        FormStatus::WaitingReading,
        &technician(),
        t0 + Duration::minutes(2),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, BusinessError::Conflict { .. }));

    let rows = samples_of_form(&db, form.id).await.unwrap();
    assert_eq!(rows[0].status, SampleStatus::InProgress);
    assert_eq!(rows[0].version, edited.version);
    assert_eq!(rows[0].modified_by, "lou");
}

#[tokio::test]
async fn test_partial_reading_keeps_selection_open() {
    let db = setup_test_db().await;
    let t0 = monday_morning();
    let form = services::create_form(
        &db,
        &coordinator(),
        FormCreate {
            report_title: "Contrôle".to_string(),
            brand: "Grand Frais".to_string(),
            site: "R2".to_string(),
            samples: vec![
                SampleCreate {
                    number: "1".to_string(),
                    product: "Crème".to_string(),
                    ..Default::default()
                },
                SampleCreate {
                    number: "2".to_string(),
                    product: "Crème".to_string(),
                    ..Default::default()
                },
            ],
        },
        t0,
    )
    .await
    .unwrap();
    let form = services::send_to_technician(
        &db,
        &coordinator(),
        form.id,
        SendToTechnician {
            bacteria: vec!["Listeria".to_string()],
        },
        t0,
    )
    .await
    .unwrap();
    let submission = SensorySubmission {
        results: form
            .samples
            .iter()
            .map(|sample| SensoryEntry {
                sample_id: sample.id,
                values: SampleResultsUpdate {
                    version: sample.version,
                    smell: Some(Conformity::Conforming),
                    texture: Some(Conformity::Conforming),
                    taste: Some(Conformity::Conforming),
                    aspect: Some(Conformity::Conforming),
                    ph: Some("4.6".to_string()),
                    lab_comment: Some("RAS".to_string()),
                },
            })
            .collect(),
    };
    let form = services::submit_sensory(&db, &technician(), form.id, submission, t0)
        .await
        .unwrap();
    let listeria = form.bacteria[0].clone();
    let ready = t0 + Duration::hours(48);

    // Completing with nothing recorded is refused
    let err = submit_reading(
        &db,
        &technician(),
        form.id,
        listeria.id,
        ReadingSubmission {
            results: Vec::new(),
            complete: true,
        },
        ready,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, BusinessError::PreconditionFailed { .. }));

    let first = &form.samples[0];
    let form = submit_reading(
        &db,
        &technician(),
        form.id,
        listeria.id,
        ReadingSubmission {
            results: vec![ReadingEntry {
                sample_id: first.id,
                version: first.version,
                value: "0".to_string(),
            }],
            complete: false,
        },
        ready,
    )
    .await
    .unwrap();
    assert_eq!(form.bacteria[0].status, SelectionStatus::InProgress);
    assert_eq!(form.status, FormStatus::WaitingReading);
    assert_eq!(form.samples[0].listeria_count, Some(0));

    let err = submit_reading(
        &db,
        &technician(),
        form.id,
        listeria.id,
        ReadingSubmission {
            results: vec![ReadingEntry {
                sample_id: form.samples[1].id,
                version: form.samples[1].version,
                value: "-3".to_string(),
            }],
            complete: false,
        },
        ready,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, BusinessError::ValidationError { .. }));

    // One recorded value is enough to complete
    let form = submit_reading(
        &db,
        &technician(),
        form.id,
        listeria.id,
        ReadingSubmission {
            results: Vec::new(),
            complete: true,
        },
        ready,
    )
    .await
    .unwrap();
    assert_eq!(form.status, FormStatus::Completed);

    // Entero and yeast/mold were never selected; an archived form still raises nothing
    let later = services::get_form(&db, &coordinator(), form.id, t0 + Duration::days(6))
        .await
        .unwrap();
    assert!(later.alerts.is_empty());
    assert!(
        later
            .samples
            .iter()
            .all(|sample| sample.urgency == Urgency::None)
    );
}
