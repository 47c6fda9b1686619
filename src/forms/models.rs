use crate::alerts::models::SampleAlert;
use crate::bacteria::models::BacteriaSelection;
use crate::samples::models::{Sample, SampleCreate, SampleResultsUpdate};
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::{IntoParams, ToSchema};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    ToSchema,
    Serialize,
    Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum FormStatus {
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "analyses_en_cours")]
    AnalysesEnCours,
    #[sea_orm(string_value = "waiting_reading")]
    WaitingReading,
    #[sea_orm(string_value = "completed")]
    Completed,
}

impl FormStatus {
    pub fn stage(self) -> u8 {
        match self {
            FormStatus::Draft => 0,
            FormStatus::AnalysesEnCours => 1,
            FormStatus::WaitingReading => 2,
            FormStatus::Completed => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FormStatus::Draft => "draft",
            FormStatus::AnalysesEnCours => "analyses_en_cours",
            FormStatus::WaitingReading => "waiting_reading",
            FormStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for FormStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "forms")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub report_title: String,
    pub brand: String,
    pub site: String,
    pub status: FormStatus,
    pub created_by: String,
    pub modified_by: String,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "crate::samples::models::Entity")]
    Samples,
    #[sea_orm(has_many = "crate::bacteria::models::Entity")]
    BacteriaSelections,
}

impl Related<crate::samples::models::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Samples.def()
    }
}

impl Related<crate::bacteria::models::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BacteriaSelections.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct FormSummary {
    pub id: Uuid,
    pub report_title: String,
    pub brand: String,
    pub site: String,
    pub status: FormStatus,
    pub created_by: String,
    pub modified_by: String,
    pub version: i32,
    pub sample_count: u64,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl FormSummary {
    pub fn from_model(model: Model, sample_count: u64) -> Self {
        Self {
            id: model.id,
            report_title: model.report_title,
            brand: model.brand,
            site: model.site,
            status: model.status,
            created_by: model.created_by,
            modified_by: model.modified_by,
            version: model.version,
            sample_count,
            created_at: model.created_at,
            modified_at: model.modified_at,
        }
    }
}

/// A form with everything a screen needs to render it
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct Form {
    pub id: Uuid,
    pub report_title: String,
    pub brand: String,
    pub site: String,
    pub status: FormStatus,
    pub created_by: String,
    pub modified_by: String,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub samples: Vec<Sample>,
    pub bacteria: Vec<BacteriaSelection>,
    pub alerts: Vec<SampleAlert>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct FormCreate {
    pub report_title: String,
    pub brand: String,
    pub site: String,
    #[serde(default)]
    pub samples: Vec<SampleCreate>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FormFilter {
    /// Only forms in this status
    pub status: Option<FormStatus>,
}

/// Bacteria chosen by the coordinator, by catalog name
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct SendToTechnician {
    pub bacteria: Vec<String>,
}

/// Sensory values for one sample within a batch save
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct SensoryEntry {
    pub sample_id: Uuid,
    #[serde(flatten)]
    pub values: SampleResultsUpdate,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct SensorySubmission {
    pub results: Vec<SensoryEntry>,
}

/// Raw reading for one sample; blank leaves the field untouched
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ReadingEntry {
    pub sample_id: Uuid,
    pub version: i32,
    pub value: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ReadingSubmission {
    pub results: Vec<ReadingEntry>,
    /// Mark the bacterium complete once these values are saved
    #[serde(default)]
    pub complete: bool,
}
