use super::incubation::{self, Bacterium};
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, ToSchema, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum SelectionStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "in_progress")]
    InProgress,
    #[sea_orm(string_value = "completed")]
    Completed,
}

impl SelectionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SelectionStatus::Pending => "pending",
            SelectionStatus::InProgress => "in_progress",
            SelectionStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for SelectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "bacteria_selections")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub form_id: Uuid,
    pub bacteria_name: String,
    pub bacteria_delay: String,
    pub reading_day: Option<String>,
    pub seeded_at: Option<DateTime<Utc>>,
    pub due_at: Option<DateTime<Utc>>,
    pub status: SelectionStatus,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl Model {
    pub fn bacterium(&self) -> Option<Bacterium> {
        Bacterium::from_name(&self.bacteria_name)
    }

    /// Plates are seeded when sensory results are saved; unseeded selections are never ready
    pub fn is_ready(&self, now: DateTime<Utc>) -> bool {
        self.seeded_at
            .is_some_and(|seeded_at| incubation::is_ready(now, seeded_at, &self.bacteria_name))
    }
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

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct BacteriaSelection {
    pub id: Uuid,
    pub form_id: Uuid,
    pub bacteria_name: String,
    pub bacteria_delay: String,
    pub reading_day: Option<String>,
    pub seeded_at: Option<DateTime<Utc>>,
    pub due_at: Option<DateTime<Utc>>,
    pub status: SelectionStatus,
    pub completed_at: Option<DateTime<Utc>>,
    pub is_ready: bool,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl BacteriaSelection {
    pub fn from_model(model: Model, now: DateTime<Utc>) -> Self {
        let is_ready = model.is_ready(now);
        Self {
            id: model.id,
            form_id: model.form_id,
            bacteria_name: model.bacteria_name,
            bacteria_delay: model.bacteria_delay,
            reading_day: model.reading_day,
            seeded_at: model.seeded_at,
            due_at: model.due_at,
            status: model.status,
            completed_at: model.completed_at,
            is_ready,
            created_at: model.created_at,
            modified_at: model.modified_at,
        }
    }
}

/// Open selection placed on the weekly reading calendar
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct CalendarEntry {
    pub selection_id: Uuid,
    pub form_id: Uuid,
    pub report_title: String,
    pub brand: String,
    pub site: String,
    pub bacteria_name: String,
    pub due_at: Option<DateTime<Utc>>,
    pub status: SelectionStatus,
    pub is_ready: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct CalendarDay {
    pub day: String,
    pub entries: Vec<CalendarEntry>,
}
