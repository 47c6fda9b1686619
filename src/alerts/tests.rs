use super::classifier::{classify, missing_fields};
use super::models::Urgency;
use super::services::{alerts_for_samples, list_alerts};
use crate::common::auth::{Actor, Role};
use crate::config::test_helpers::{send_as, setup_test_app, setup_test_db};
use crate::forms::models::FormCreate;
use crate::forms::services::create_form;
use crate::samples::models::{SampleCreate, SampleStatus};
use crate::samples::test_support::sample_fixture;
use axum::http::StatusCode;
use chrono::{Duration, TimeZone, Utc};
use rstest::rstest;

#[rstest]
#[case(0, None, None, Urgency::None)]
#[case(23, None, None, Urgency::None)]
#[case(24, None, None, Urgency::Warning)]
#[case(30, Some("12"), None, Urgency::None)]
#[case(119, None, None, Urgency::Warning)]
#[case(120, None, None, Urgency::Urgent)]
#[case(120, Some("12"), None, Urgency::Urgent)]
#[case(120, None, Some("<10"), Urgency::Warning)]
#[case(200, Some("12"), Some("<10"), Urgency::None)]
fn test_classify_thresholds(
    #[case] hours: i64,
    #[case] enterobacteria: Option<&str>,
    #[case] yeast_mold: Option<&str>,
    #[case] expected: Urgency,
) {
    let mut sample = sample_fixture();
    sample.enterobacteria = enterobacteria.map(str::to_string);
    sample.yeast_mold = yeast_mold.map(str::to_string);
    let now = sample.created_at + Duration::hours(hours);
    assert_eq!(classify(&sample, now), expected);
}

#[test]
fn test_blank_results_count_as_missing() {
    let mut sample = sample_fixture();
    sample.enterobacteria = Some("   ".to_string());
    let now = sample.created_at + Duration::hours(48);
    assert_eq!(classify(&sample, now), Urgency::Warning);
    assert_eq!(missing_fields(&sample, now), vec!["enterobacteria"]);
}

#[rstest]
#[case(SampleStatus::Completed)]
#[case(SampleStatus::Rejected)]
fn test_closed_samples_are_never_flagged(#[case] status: SampleStatus) {
    let mut sample = sample_fixture();
    sample.status = status;
    let now = sample.created_at + Duration::days(6);
    assert_eq!(classify(&sample, now), Urgency::None);
    assert!(alerts_for_samples(&[sample], now).is_empty());
}

#[test]
fn test_missing_fields_lists_both_assays() {
    let sample = sample_fixture();
    let now = sample.created_at + Duration::days(6);
    assert_eq!(
        missing_fields(&sample, now),
        vec!["enterobacteria", "yeast_mold"]
    );
    assert!(missing_fields(&sample, sample.created_at).is_empty());
}

#[test]
fn test_alerts_skip_rejected_and_sort_by_urgency() {
    let base = sample_fixture();
    let now = base.created_at + Duration::days(6);

    let mut recent = base.clone();
    recent.number = "recent".to_string();
    recent.created_at = now - Duration::hours(30);

    let mut oldest_warning = base.clone();
    oldest_warning.number = "old-warning".to_string();
    oldest_warning.yeast_mold = Some("<10".to_string());

    let mut urgent = base.clone();
    urgent.number = "urgent".to_string();
    urgent.created_at = base.created_at + Duration::hours(1);

    let mut rejected = base.clone();
    rejected.number = "rejected".to_string();
    rejected.status = SampleStatus::Rejected;

    let mut fine = base;
    fine.number = "fine".to_string();
    fine.created_at = now - Duration::hours(2);

    let alerts = alerts_for_samples(&[recent, oldest_warning, urgent, rejected, fine], now);
    let numbers: Vec<&str> = alerts.iter().map(|alert| alert.number.as_str()).collect();
    assert_eq!(numbers, vec!["urgent", "old-warning", "recent"]);
    assert_eq!(alerts[0].urgency, Urgency::Urgent);
    assert_eq!(alerts[2].hours_elapsed, 30);
}

#[tokio::test]
async fn test_list_alerts_covers_open_forms() {
    let db = setup_test_db().await;
    let coordinator = Actor::new("camille", Role::Coordinator);
    let t0 = Utc.with_ymd_and_hms(2025, 3, 10, 8, 0, 0).unwrap();

    let form = create_form(
        &db,
        &coordinator,
        FormCreate {
            report_title: "Contrôle".to_string(),
            brand: "Grand Frais".to_string(),
            site: "R1".to_string(),
            samples: vec![SampleCreate {
                number: "1".to_string(),
                product: "Beurre".to_string(),
                ..Default::default()
            }],
        },
        t0,
    )
    .await
    .unwrap();

    let alerts = list_alerts(&db, &coordinator, t0 + Duration::hours(2))
        .await
        .unwrap();
    assert!(alerts.is_empty());

    let alerts = list_alerts(&db, &coordinator, t0 + Duration::hours(26))
        .await
        .unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].form_id, form.id);
    assert_eq!(alerts[0].urgency, Urgency::Warning);
    assert_eq!(alerts[0].brand, "Grand Frais");

    let visitor = Actor::new("someone", Role::Unknown("visitor".to_string()));
    assert!(list_alerts(&db, &visitor, t0).await.is_err());
}

#[tokio::test]
async fn test_alerts_endpoint_is_readable_by_guests() {
    let (app, _db) = setup_test_app().await;
    let (status, body) = send_as(&app, "guest", "GET", "/api/alerts", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());

    let (status, _) = send_as(&app, "visitor", "GET", "/api/alerts", None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
