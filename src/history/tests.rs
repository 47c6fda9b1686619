use super::models::{ChangeEntry, FieldChange};
use super::services::{list_for_form, record};
use crate::common::auth::{Actor, Role};
use crate::config::test_helpers::{send_as, setup_test_app, setup_test_db};
use crate::samples::models::SampleStatus;
use axum::http::StatusCode;
use chrono::{Duration, TimeZone, Utc};
use serde_json::json;
use uuid::Uuid;

#[test]
fn test_diff_ignores_unchanged_values() {
    assert_eq!(
        FieldChange::diff("ph", Some("6.5".to_string()), Some("6.5".to_string())),
        None
    );
    let change = FieldChange::diff("ph", None, Some("6.5".to_string())).unwrap();
    assert_eq!(change.field, "ph");
    assert_eq!(change.old_value, None);
}

#[test]
fn test_entry_carries_actor_and_status_change() {
    let actor = Actor::new("sam", Role::Technician);
    let form_id = Uuid::new_v4();
    let sample_id = Uuid::new_v4();
    let at = Utc.with_ymd_and_hms(2025, 3, 10, 8, 0, 0).unwrap();

    let row = ChangeEntry::sample(form_id, sample_id, "reject_sample")
        .with_status(SampleStatus::InProgress, SampleStatus::Rejected)
        .into_active_model(&actor, at);
    assert_eq!(row.user_name.as_ref(), "sam");
    assert_eq!(row.role.as_ref(), "technician");
    assert_eq!(row.sample_id.as_ref(), &Some(sample_id));
    assert_eq!(row.field.as_ref().as_deref(), Some("status"));
    assert_eq!(row.old_value.as_ref().as_deref(), Some("in_progress"));
    assert_eq!(row.new_value.as_ref().as_deref(), Some("rejected"));
}

#[tokio::test]
async fn test_record_appends_in_time_order() {
    let db = setup_test_db().await;
    let actor = Actor::new("camille", Role::Coordinator);
    let form_id = Uuid::new_v4();
    let t0 = Utc.with_ymd_and_hms(2025, 3, 10, 8, 0, 0).unwrap();

    record(&db, &actor, vec![ChangeEntry::form(form_id, "create_form")], t0).await;
    record(&db, &actor, Vec::new(), t0).await;
    record(
        &db,
        &actor,
        vec![
            ChangeEntry::form(form_id, "select_bacterium").with_change(FieldChange::new(
                "bacteria",
                None,
                Some("Listeria".to_string()),
            )),
        ],
        t0 + Duration::minutes(5),
    )
    .await;
    record(
        &db,
        &actor,
        vec![ChangeEntry::form(Uuid::new_v4(), "create_form")],
        t0,
    )
    .await;

    let rows = list_for_form(&db, form_id).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].action, "create_form");
    assert_eq!(rows[1].action, "select_bacterium");
    assert_eq!(rows[1].new_value.as_deref(), Some("Listeria"));
    assert_eq!(rows[1].timestamp, t0 + Duration::minutes(5));
}

#[tokio::test]
async fn test_history_endpoint_reports_sample_edits() {
    let (app, _db) = setup_test_app().await;
    let (_, form) = send_as(
        &app,
        "coordinator",
        "POST",
        "/api/forms",
        Some(json!({
            "report_title": "Contrôle",
            "brand": "Grand Frais",
            "site": "R1",
            "samples": [{"number": "1", "product": "Yaourt"}],
        })),
    )
    .await;
    let form_id = form["id"].as_str().unwrap();
    let sample_id = form["samples"][0]["id"].as_str().unwrap();

    send_as(
        &app,
        "coordinator",
        "PATCH",
        &format!("/api/samples/{sample_id}"),
        Some(json!({"version": 1, "product": "Yaourt brassé"})),
    )
    .await;

    let (status, history) = send_as(
        &app,
        "guest",
        "GET",
        &format!("/api/forms/{form_id}/history"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let history = history.as_array().unwrap();
    let edit = history
        .iter()
        .find(|entry| entry["action"] == "edit_sample")
        .unwrap();
    assert_eq!(edit["field"], "product");
    assert_eq!(edit["old_value"], "Yaourt");
    assert_eq!(edit["new_value"], "Yaourt brassé");
    assert_eq!(edit["user_name"], "coordinator-tester");
    assert_eq!(edit["role"], "coordinator");
    assert_eq!(edit["sample_id"], sample_id);

    let (status, _) = send_as(
        &app,
        "guest",
        "GET",
        &format!("/api/forms/{}/history", Uuid::new_v4()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_history_survives_draft_cancellation() {
    let (app, _db) = setup_test_app().await;
    let (_, form) = send_as(
        &app,
        "coordinator",
        "POST",
        "/api/forms",
        Some(json!({
            "report_title": "Contrôle",
            "brand": "Auchan",
            "site": "R2",
            "samples": [{"number": "1", "product": "Petit suisse"}],
        })),
    )
    .await;
    let form_id = form["id"].as_str().unwrap();

    let (status, _) =
        send_as(&app, "coordinator", "DELETE", &format!("/api/forms/{form_id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, history) = send_as(
        &app,
        "guest",
        "GET",
        &format!("/api/forms/{form_id}/history"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let actions: Vec<&str> = history
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|entry| entry["action"].as_str())
        .collect();
    assert_eq!(actions, vec!["create_form", "cancel_draft"]);
}
