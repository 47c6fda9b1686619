use super::models::{Conformity, Model, SampleStatus};
use chrono::{TimeZone, Utc};
use uuid::Uuid;

/// An untouched sample as a coordinator would leave it in a draft
pub fn sample_fixture() -> Model {
    let created_at = Utc.with_ymd_and_hms(2025, 3, 12, 8, 0, 0).unwrap();
    Model {
        id: Uuid::new_v4(),
        form_id: Uuid::new_v4(),
        number: "1".to_string(),
        product: "Yaourt nature".to_string(),
        ready_time: Some("08:00".to_string()),
        fabrication: None,
        dlc: None,
        smell: Conformity::NotTested,
        texture: Conformity::NotTested,
        taste: Conformity::NotTested,
        aspect: Conformity::NotTested,
        ph: None,
        enterobacteria: None,
        yeast_mold: None,
        coliforms_count: None,
        staphylococcus_count: None,
        listeria_count: None,
        escherichia_coli_count: None,
        total_flora_count: None,
        leuconostoc_count: None,
        status: SampleStatus::Pending,
        lab_comment: None,
        site: "R1".to_string(),
        brand: "Grand Frais".to_string(),
        report_title: "Contrôle hebdomadaire".to_string(),
        modified_by: "coordinator-tester".to_string(),
        version: 1,
        created_at,
        modified_at: created_at,
    }
}
