use super::models::{self as change_history, ChangeEntry};
use crate::common::auth::Actor;
use crate::common::errors::{BusinessResult, DbErrorExt};
use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder};
use uuid::Uuid;

/// Append entries to the change history once the primary write has committed.
/// Failures are logged and swallowed; they never undo or fail the mutation.
pub async fn record<C>(db: &C, actor: &Actor, entries: Vec<ChangeEntry>, now: DateTime<Utc>)
where
    C: ConnectionTrait,
{
    if entries.is_empty() {
        return;
    }
    let count = entries.len();
    let rows = entries
        .into_iter()
        .map(|entry| entry.into_active_model(actor, now));

    if let Err(err) = change_history::Entity::insert_many(rows).exec(db).await {
        tracing::warn!(
            user = %actor.name,
            entries = count,
            "Could not write change history: {err}"
        );
    }
}

pub async fn list_for_form<C>(db: &C, form_id: Uuid) -> BusinessResult<Vec<change_history::Model>>
where
    C: ConnectionTrait,
{
    change_history::Entity::find()
        .filter(change_history::Column::FormId.eq(form_id))
        .order_by_asc(change_history::Column::Timestamp)
        .all(db)
        .await
        .map_err(|err| err.to_business_error("change_history"))
}
