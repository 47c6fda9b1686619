use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Display-only attention level of a sample. Never stored.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    #[default]
    None,
    Warning,
    Urgent,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SampleAlert {
    pub sample_id: Uuid,
    pub form_id: Uuid,
    pub number: String,
    pub product: String,
    pub brand: String,
    pub site: String,
    pub urgency: Urgency,
    pub hours_elapsed: i64,
    /// Result fields whose absence raised the alert
    pub missing: Vec<String>,
    pub created_at: DateTime<Utc>,
}
