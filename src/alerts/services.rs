use super::classifier::{classify, missing_fields};
use super::models::{SampleAlert, Urgency};
use crate::common::auth::Actor;
use crate::common::errors::{BusinessResult, DbErrorExt};
use crate::forms::lifecycle::{self, Action};
use crate::forms::models::{self as forms, FormStatus};
use crate::samples::models::{self as samples, Model as Sample};
use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};

/// Flagged live samples, most urgent first
pub fn alerts_for_samples(rows: &[Sample], now: DateTime<Utc>) -> Vec<SampleAlert> {
    let mut alerts: Vec<SampleAlert> = rows
        .iter()
        .filter_map(|sample| {
            let urgency = classify(sample, now);
            (urgency != Urgency::None).then(|| SampleAlert {
                sample_id: sample.id,
                form_id: sample.form_id,
                number: sample.number.clone(),
                product: sample.product.clone(),
                brand: sample.brand.clone(),
                site: sample.site.clone(),
                urgency,
                hours_elapsed: (now - sample.created_at).num_hours(),
                missing: missing_fields(sample, now),
                created_at: sample.created_at,
            })
        })
        .collect();
    alerts.sort_by(|a, b| {
        b.urgency
            .cmp(&a.urgency)
            .then_with(|| a.created_at.cmp(&b.created_at))
    });
    alerts
}

/// Samples needing attention across every form that is still open
pub async fn list_alerts(
    db: &DatabaseConnection,
    actor: &Actor,
    now: DateTime<Utc>,
) -> BusinessResult<Vec<SampleAlert>> {
    lifecycle::authorize(&actor.role, Action::Read)?;
    let rows: Vec<Sample> = samples::Entity::find()
        .inner_join(forms::Entity)
        .filter(forms::Column::Status.ne(FormStatus::Completed))
        .order_by_asc(samples::Column::CreatedAt)
        .all(db)
        .await
        .map_err(|err| err.to_business_error("sample"))?;
    Ok(alerts_for_samples(&rows, now))
}
