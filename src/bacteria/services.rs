use super::incubation::{Bacterium, BacteriumInfo, weekday_name};
use super::models::{self as selections, CalendarDay, CalendarEntry, Model as Selection, SelectionStatus};
use super::readings::{MicroField, MicroResult};
use crate::common::auth::Actor;
use crate::common::errors::{BusinessResult, DbErrorExt};
use crate::forms::lifecycle::{self, Action};
use crate::forms::models::{self as forms, Form, FormStatus, ReadingSubmission};
use crate::forms::services::{
    advance_form, find_form, get_form, mirror_sample_statuses, selections_of_form,
};
use crate::history::models::{ChangeEntry, FieldChange};
use crate::history::services as history;
use crate::samples::services::{samples_of_form, save_versioned};
use crate::{business_rule_violation, not_found, version_conflict};
use chrono::{DateTime, Utc, Weekday};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    TransactionTrait,
};
use uuid::Uuid;

pub fn catalog() -> Vec<BacteriumInfo> {
    Bacterium::ALL.into_iter().map(BacteriumInfo::from).collect()
}

async fn find_selection<C>(db: &C, form_id: Uuid, id: Uuid) -> BusinessResult<Selection>
where
    C: ConnectionTrait,
{
    selections::Entity::find_by_id(id)
        .one(db)
        .await
        .map_err(|err| err.to_business_error("bacteria_selection"))?
        .filter(|selection| selection.form_id == form_id)
        .ok_or_else(|| not_found!("Bacteria selection", id))
}

/// Status write guarded by the status the selection was read with
async fn set_selection_status<C>(
    db: &C,
    selection: &Selection,
    status: SelectionStatus,
    now: DateTime<Utc>,
) -> BusinessResult<()>
where
    C: ConnectionTrait,
{
    let completed_at = (status == SelectionStatus::Completed).then_some(now);
    let result = selections::Entity::update_many()
        .col_expr(selections::Column::Status, Expr::value(status))
        .col_expr(selections::Column::CompletedAt, Expr::value(completed_at))
        .col_expr(selections::Column::ModifiedAt, Expr::value(now))
        .filter(selections::Column::Id.eq(selection.id))
        .filter(selections::Column::Status.eq(selection.status))
        .exec(db)
        .await
        .map_err(|err| err.to_business_error("bacteria_selection"))?;
    if result.rows_affected == 0 {
        return Err(version_conflict!("Bacteria selection", selection.id));
    }
    Ok(())
}

/// Save one bacterium's readings and optionally complete it. Completing the last open
/// selection archives the form in the same transaction.
pub async fn submit_reading(
    db: &DatabaseConnection,
    actor: &Actor,
    form_id: Uuid,
    selection_id: Uuid,
    submission: ReadingSubmission,
    now: DateTime<Utc>,
) -> BusinessResult<Form> {
    lifecycle::authorize(&actor.role, Action::SubmitReading)?;
    let txn = db.begin().await?;
    let form = find_form(&txn, form_id).await?;
    lifecycle::check_action(&actor.role, Action::SubmitReading, form.status)?;

    let selection = find_selection(&txn, form_id, selection_id).await?;
    lifecycle::check_reading_allowed(&selection, now)?;
    let field = selection
        .bacterium()
        .map(MicroField::for_bacterium)
        .ok_or_else(|| {
            business_rule_violation!(
                "known_bacterium",
                format!("'{}' has no result field", selection.bacteria_name)
            )
        })?;

    let mut sample_rows = samples_of_form(&txn, form_id).await?;
    let mut entries = Vec::new();
    for entry in &submission.results {
        let sample = sample_rows
            .iter_mut()
            .find(|sample| sample.id == entry.sample_id)
            .ok_or_else(|| not_found!("Sample", entry.sample_id))?;
        let Some(result) = MicroResult::parse(field, &entry.value)? else {
            continue;
        };
        lifecycle::ensure_not_rejected(sample)?;
        if sample.version != entry.version {
            return Err(version_conflict!("Sample", sample.id));
        }

        let mut updated = sample.clone();
        result.apply_to(&mut updated);
        let Some(change) =
            FieldChange::diff(field.column_name(), field.read(sample), field.read(&updated))
        else {
            continue;
        };
        *sample = save_versioned(&txn, updated, entry.version, actor, now).await?;
        entries.push(
            ChangeEntry::sample(form_id, entry.sample_id, "record_reading").with_change(change),
        );
    }

    let next_status = if submission.complete {
        lifecycle::check_reading_complete(&selection, field, &sample_rows)?;
        Some(SelectionStatus::Completed)
    } else if !entries.is_empty() && selection.status == SelectionStatus::Pending {
        Some(SelectionStatus::InProgress)
    } else {
        None
    };

    if let Some(status) = next_status {
        set_selection_status(&txn, &selection, status, now).await?;
        entries.push(
            ChangeEntry::form(form_id, "reading_status")
                .with_change(FieldChange::new(
                    selection.bacteria_name.clone(),
                    Some(selection.status.to_string()),
                    Some(status.to_string()),
                )),
        );
    }

    if next_status == Some(SelectionStatus::Completed) {
        tracing::info!(form = %form_id, bacterium = %selection.bacteria_name, "Reading completed");
        let all = selections_of_form(&txn, form_id).await?;
        if lifecycle::all_readings_complete(&all) {
            let form = advance_form(&txn, form, FormStatus::Completed, actor, now).await?;
            mirror_sample_statuses(&txn, &sample_rows, form.status, actor, now).await?;
            entries.push(
                ChangeEntry::form(form_id, "archive_form")
                    .with_status(FormStatus::WaitingReading, FormStatus::Completed),
            );
        }
    }
    txn.commit().await?;

    history::record(db, actor, entries, now).await;
    get_form(db, actor, form_id, now).await
}

const CALENDAR_DAYS: [Weekday; 6] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
];

/// Open, seeded selections grouped by their planned reading weekday
pub async fn calendar(
    db: &DatabaseConnection,
    actor: &Actor,
    now: DateTime<Utc>,
) -> BusinessResult<Vec<CalendarDay>> {
    lifecycle::authorize(&actor.role, Action::Read)?;
    let rows = selections::Entity::find()
        .filter(selections::Column::Status.ne(SelectionStatus::Completed))
        .filter(selections::Column::ReadingDay.is_not_null())
        .order_by_asc(selections::Column::DueAt)
        .find_also_related(forms::Entity)
        .all(db)
        .await
        .map_err(|err| err.to_business_error("bacteria_selection"))?;

    let mut days: Vec<CalendarDay> = CALENDAR_DAYS
        .iter()
        .map(|day| CalendarDay {
            day: weekday_name(*day).to_string(),
            entries: Vec::new(),
        })
        .collect();

    for (selection, form) in rows {
        let Some(form) = form else { continue };
        let Some(day) = days
            .iter_mut()
            .find(|day| selection.reading_day.as_deref() == Some(day.day.as_str()))
        else {
            continue;
        };
        day.entries.push(CalendarEntry {
            selection_id: selection.id,
            form_id: form.id,
            report_title: form.report_title,
            brand: form.brand,
            site: form.site,
            is_ready: selection.is_ready(now),
            bacteria_name: selection.bacteria_name,
            due_at: selection.due_at,
            status: selection.status,
        });
    }
    Ok(days)
}
