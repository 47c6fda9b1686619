use crate::common::auth::Actor;
use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Append-only audit row. Rows outlive their form and sample, hence no foreign keys.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "change_history")]
#[schema(as = ChangeHistoryEntry)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub form_id: Option<Uuid>,
    pub sample_id: Option<Uuid>,
    pub user_name: String,
    pub role: String,
    pub action: String,
    pub field: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub old_value: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub new_value: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// One field-level change, before it is attributed to an actor
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldChange {
    pub field: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

impl FieldChange {
    pub fn new(
        field: impl Into<String>,
        old_value: Option<String>,
        new_value: Option<String>,
    ) -> Self {
        Self {
            field: field.into(),
            old_value,
            new_value,
        }
    }

    /// `None` when the value did not actually change
    pub fn diff(field: &str, old_value: Option<String>, new_value: Option<String>) -> Option<Self> {
        (old_value != new_value).then(|| Self::new(field, old_value, new_value))
    }
}

/// Builder for history rows written after a successful mutation
#[derive(Clone, Debug)]
pub struct ChangeEntry {
    form_id: Option<Uuid>,
    sample_id: Option<Uuid>,
    action: String,
    change: Option<FieldChange>,
}

impl ChangeEntry {
    pub fn form(form_id: Uuid, action: impl Into<String>) -> Self {
        Self {
            form_id: Some(form_id),
            sample_id: None,
            action: action.into(),
            change: None,
        }
    }

    pub fn sample(form_id: Uuid, sample_id: Uuid, action: impl Into<String>) -> Self {
        Self {
            sample_id: Some(sample_id),
            ..Self::form(form_id, action)
        }
    }

    #[must_use]
    pub fn with_change(mut self, change: FieldChange) -> Self {
        self.change = Some(change);
        self
    }

    /// Record a status move as a change of the `status` field
    #[must_use]
    pub fn with_status(self, from: impl ToString, to: impl ToString) -> Self {
        self.with_change(FieldChange::new(
            "status",
            Some(from.to_string()),
            Some(to.to_string()),
        ))
    }

    pub fn into_active_model(self, actor: &Actor, timestamp: DateTime<Utc>) -> ActiveModel {
        let (field, old_value, new_value) = match self.change {
            Some(change) => (Some(change.field), change.old_value, change.new_value),
            None => (None, None, None),
        };
        ActiveModel {
            id: Set(Uuid::new_v4()),
            form_id: Set(self.form_id),
            sample_id: Set(self.sample_id),
            user_name: Set(actor.name.clone()),
            role: Set(actor.role.as_str().to_string()),
            action: Set(self.action),
            field: Set(field),
            old_value: Set(old_value),
            new_value: Set(new_value),
            timestamp: Set(timestamp),
        }
    }
}
