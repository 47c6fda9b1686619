use crate::alerts::{classifier, models::Urgency};
use crate::common::dates::format_date;
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Tri-state sensory judgment. `N` is only ever an initial value.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    EnumIter,
    DeriveActiveEnum,
    ToSchema,
    Serialize,
    Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum Conformity {
    #[default]
    #[sea_orm(string_value = "N")]
    #[serde(rename = "N")]
    NotTested,
    #[sea_orm(string_value = "C")]
    #[serde(rename = "C")]
    Conforming,
    #[sea_orm(string_value = "NC")]
    #[serde(rename = "NC")]
    NonConforming,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, ToSchema, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum SampleStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "in_progress")]
    InProgress,
    #[sea_orm(string_value = "analyses_en_cours")]
    AnalysesEnCours,
    #[sea_orm(string_value = "waiting_reading")]
    WaitingReading,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

impl SampleStatus {
    /// Position in the form pipeline; `None` for the rejected side branch
    pub fn stage(self) -> Option<u8> {
        match self {
            SampleStatus::Pending => Some(0),
            SampleStatus::InProgress | SampleStatus::AnalysesEnCours => Some(1),
            SampleStatus::WaitingReading => Some(2),
            SampleStatus::Completed => Some(3),
            SampleStatus::Rejected => None,
        }
    }

    pub fn is_rejected(self) -> bool {
        self == SampleStatus::Rejected
    }

    /// No further analysis happens on the sample
    pub fn is_closed(self) -> bool {
        matches!(self, SampleStatus::Completed | SampleStatus::Rejected)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SampleStatus::Pending => "pending",
            SampleStatus::InProgress => "in_progress",
            SampleStatus::AnalysesEnCours => "analyses_en_cours",
            SampleStatus::WaitingReading => "waiting_reading",
            SampleStatus::Completed => "completed",
            SampleStatus::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for SampleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "samples")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub form_id: Uuid,
    pub number: String,
    pub product: String,
    pub ready_time: Option<String>,
    pub fabrication: Option<NaiveDate>,
    pub dlc: Option<NaiveDate>,
    pub smell: Conformity,
    pub texture: Conformity,
    pub taste: Conformity,
    pub aspect: Conformity,
    pub ph: Option<String>,
    pub enterobacteria: Option<String>,
    pub yeast_mold: Option<String>,
    pub coliforms_count: Option<i32>,
    pub staphylococcus_count: Option<i32>,
    pub listeria_count: Option<i32>,
    pub escherichia_coli_count: Option<i32>,
    pub total_flora_count: Option<i32>,
    pub leuconostoc_count: Option<i32>,
    pub status: SampleStatus,
    #[sea_orm(column_type = "Text", nullable)]
    pub lab_comment: Option<String>,
    pub site: String,
    pub brand: String,
    pub report_title: String,
    pub modified_by: String,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "crate::forms::models::Entity",
        from = "Column::FormId",
        to = "crate::forms::models::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Forms,
}

impl Related<crate::forms::models::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Forms.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// A sample as returned by the API, with its advisory urgency computed at read time
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Sample {
    pub id: Uuid,
    pub form_id: Uuid,
    pub number: String,
    pub product: String,
    pub ready_time: Option<String>,
    pub fabrication: Option<String>,
    pub dlc: Option<String>,
    pub smell: Conformity,
    pub texture: Conformity,
    pub taste: Conformity,
    pub aspect: Conformity,
    pub ph: Option<String>,
    pub enterobacteria: Option<String>,
    pub yeast_mold: Option<String>,
    pub coliforms_count: Option<i32>,
    pub staphylococcus_count: Option<i32>,
    pub listeria_count: Option<i32>,
    pub escherichia_coli_count: Option<i32>,
    pub total_flora_count: Option<i32>,
    pub leuconostoc_count: Option<i32>,
    pub status: SampleStatus,
    pub lab_comment: Option<String>,
    pub site: String,
    pub brand: String,
    pub report_title: String,
    pub modified_by: String,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub urgency: Urgency,
}

impl Sample {
    pub fn from_model(model: Model, now: DateTime<Utc>) -> Self {
        let urgency = classifier::classify(&model, now);
        Self {
            id: model.id,
            form_id: model.form_id,
            number: model.number,
            product: model.product,
            ready_time: model.ready_time,
            fabrication: model.fabrication.map(format_date),
            dlc: model.dlc.map(format_date),
            smell: model.smell,
            texture: model.texture,
            taste: model.taste,
            aspect: model.aspect,
            ph: model.ph,
            enterobacteria: model.enterobacteria,
            yeast_mold: model.yeast_mold,
            coliforms_count: model.coliforms_count,
            staphylococcus_count: model.staphylococcus_count,
            listeria_count: model.listeria_count,
            escherichia_coli_count: model.escherichia_coli_count,
            total_flora_count: model.total_flora_count,
            leuconostoc_count: model.leuconostoc_count,
            status: model.status,
            lab_comment: model.lab_comment,
            site: model.site,
            brand: model.brand,
            report_title: model.report_title,
            modified_by: model.modified_by,
            version: model.version,
            created_at: model.created_at,
            modified_at: model.modified_at,
            urgency,
        }
    }
}

/// Coordinator-entered fields for a new sample. Dates accept ISO or day-first input.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct SampleCreate {
    pub number: String,
    pub product: String,
    #[serde(default)]
    pub ready_time: Option<String>,
    #[serde(default)]
    pub fabrication: Option<String>,
    #[serde(default)]
    pub dlc: Option<String>,
}

/// Coordinator edit of a draft sample; absent fields are left unchanged.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct SampleUpdate {
    pub version: i32,
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub product: Option<String>,
    #[serde(default)]
    pub ready_time: Option<String>,
    #[serde(default)]
    pub fabrication: Option<String>,
    #[serde(default)]
    pub dlc: Option<String>,
}

/// Technician-entered sensory values, pH and comment; absent fields are left unchanged.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct SampleResultsUpdate {
    pub version: i32,
    #[serde(default)]
    pub smell: Option<Conformity>,
    #[serde(default)]
    pub texture: Option<Conformity>,
    #[serde(default)]
    pub taste: Option<Conformity>,
    #[serde(default)]
    pub aspect: Option<Conformity>,
    #[serde(default)]
    pub ph: Option<String>,
    #[serde(default)]
    pub lab_comment: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct VersionedRequest {
    pub version: i32,
}
