use super::lifecycle::{self, Action};
use super::models::{
    ActiveModel, Column, Entity, Form, FormCreate, FormStatus, FormSummary, Model,
    SendToTechnician, SensorySubmission,
};
use crate::alerts::services::alerts_for_samples;
use crate::bacteria::incubation::{self, Bacterium};
use crate::bacteria::models::{
    self as selections, BacteriaSelection, Model as Selection, SelectionStatus,
};
use crate::common::auth::Actor;
use crate::common::errors::{BusinessResult, DbErrorExt};
use crate::history::models::{ChangeEntry, FieldChange};
use crate::history::services as history;
use crate::samples::models::{self as samples, Sample, SampleStatus};
use crate::samples::services::{merge_results, new_active_sample, samples_of_form, save_versioned};
use crate::{not_found, validation_error, version_conflict};
use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, TransactionTrait,
};
use std::collections::HashMap;
use uuid::Uuid;

pub async fn find_form<C>(db: &C, id: Uuid) -> BusinessResult<Model>
where
    C: ConnectionTrait,
{
    Entity::find_by_id(id)
        .one(db)
        .await
        .map_err(|err| err.to_business_error("form"))?
        .ok_or_else(|| not_found!("Form", id))
}

pub async fn selections_of_form<C>(db: &C, form_id: Uuid) -> BusinessResult<Vec<Selection>>
where
    C: ConnectionTrait,
{
    selections::Entity::find()
        .filter(selections::Column::FormId.eq(form_id))
        .order_by_asc(selections::Column::CreatedAt)
        .order_by_asc(selections::Column::BacteriaName)
        .all(db)
        .await
        .map_err(|err| err.to_business_error("bacteria_selection"))
}

/// Move a form one stage forward, guarded by its current status so that two
/// concurrent transitions cannot both succeed.
pub(crate) async fn advance_form<C>(
    db: &C,
    form: Model,
    to: FormStatus,
    actor: &Actor,
    now: DateTime<Utc>,
) -> BusinessResult<Model>
where
    C: ConnectionTrait,
{
    lifecycle::check_transition(form.status, to)?;

    let result = Entity::update_many()
        .col_expr(Column::Status, Expr::value(to))
        .col_expr(Column::Version, Expr::value(form.version + 1))
        .col_expr(Column::ModifiedBy, Expr::value(actor.name.clone()))
        .col_expr(Column::ModifiedAt, Expr::value(now))
        .filter(Column::Id.eq(form.id))
        .filter(Column::Status.eq(form.status))
        .exec(db)
        .await
        .map_err(|err| err.to_business_error("form"))?;
    if result.rows_affected == 0 {
        return Err(version_conflict!("Form", form.id));
    }

    tracing::info!(form = %form.id, user = %actor.name, "Form moved from {} to {to}", form.status);
    Ok(Model {
        status: to,
        version: form.version + 1,
        modified_by: actor.name.clone(),
        modified_at: now,
        ..form
    })
}

/// Bring every live sample of the form to the status mirroring `form_status`.
/// Each row must still carry the version it was checked with.
pub(crate) async fn mirror_sample_statuses<C>(
    db: &C,
    sample_rows: &[samples::Model],
    form_status: FormStatus,
    actor: &Actor,
    now: DateTime<Utc>,
) -> BusinessResult<()>
where
    C: ConnectionTrait,
{
    let status = lifecycle::sample_status_for(form_status);
    lifecycle::ensure_sample_within_form(status, form_status)?;

    for sample in lifecycle::active_samples(sample_rows) {
        let result = samples::Entity::update_many()
            .col_expr(samples::Column::Status, Expr::value(status))
            .col_expr(samples::Column::Version, Expr::value(sample.version + 1))
            .col_expr(samples::Column::ModifiedBy, Expr::value(actor.name.clone()))
            .col_expr(samples::Column::ModifiedAt, Expr::value(now))
            .filter(samples::Column::Id.eq(sample.id))
            .filter(samples::Column::Version.eq(sample.version))
            .filter(samples::Column::Status.ne(SampleStatus::Rejected))
            .exec(db)
            .await
            .map_err(|err| err.to_business_error("sample"))?;
        if result.rows_affected == 0 {
            return Err(version_conflict!("Sample", sample.id));
        }
    }
    Ok(())
}

pub async fn create_form(
    db: &DatabaseConnection,
    actor: &Actor,
    create: FormCreate,
    now: DateTime<Utc>,
) -> BusinessResult<Form> {
    lifecycle::authorize(&actor.role, Action::CreateForm)?;
    let required = |field: &str, value: &str| {
        let value = value.trim();
        if value.is_empty() {
            Err(validation_error!(field, "cannot be empty"))
        } else {
            Ok(value.to_string())
        }
    };

    let form = Model {
        id: Uuid::new_v4(),
        report_title: required("report_title", &create.report_title)?,
        brand: required("brand", &create.brand)?,
        site: required("site", &create.site)?,
        status: FormStatus::Draft,
        created_by: actor.name.clone(),
        modified_by: actor.name.clone(),
        version: 1,
        created_at: now,
        modified_at: now,
    };
    // Validate every sample before opening the transaction
    let new_samples = create
        .samples
        .iter()
        .map(|sample| new_active_sample(&form, sample, actor, now))
        .collect::<BusinessResult<Vec<_>>>()?;

    let txn = db.begin().await?;
    let form = ActiveModel::from(form)
        .reset_all()
        .insert(&txn)
        .await
        .map_err(|err| err.to_business_error("form"))?;
    for sample in new_samples {
        sample
            .insert(&txn)
            .await
            .map_err(|err| err.to_business_error("sample"))?;
    }
    txn.commit().await?;

    tracing::info!(form = %form.id, user = %actor.name, "Draft form '{}' created", form.report_title);
    history::record(
        db,
        actor,
        vec![ChangeEntry::form(form.id, "create_form")],
        now,
    )
    .await;
    get_form(db, actor, form.id, now).await
}

pub async fn list_forms(
    db: &DatabaseConnection,
    actor: &Actor,
    status: Option<FormStatus>,
) -> BusinessResult<Vec<FormSummary>> {
    lifecycle::authorize(&actor.role, Action::Read)?;
    let mut query = Entity::find().order_by_desc(Column::CreatedAt);
    if let Some(status) = status {
        query = query.filter(Column::Status.eq(status));
    }
    let forms = query
        .all(db)
        .await
        .map_err(|err| err.to_business_error("form"))?;

    let mut counts: HashMap<Uuid, u64> = HashMap::new();
    if !forms.is_empty() {
        let form_ids: Vec<Uuid> = forms.iter().map(|form| form.id).collect();
        let rows = samples::Entity::find()
            .filter(samples::Column::FormId.is_in(form_ids))
            .all(db)
            .await
            .map_err(|err| err.to_business_error("sample"))?;
        for row in rows {
            *counts.entry(row.form_id).or_default() += 1;
        }
    }

    Ok(forms
        .into_iter()
        .map(|form| {
            let count = counts.get(&form.id).copied().unwrap_or_default();
            FormSummary::from_model(form, count)
        })
        .collect())
}

pub async fn get_form(
    db: &DatabaseConnection,
    actor: &Actor,
    id: Uuid,
    now: DateTime<Utc>,
) -> BusinessResult<Form> {
    lifecycle::authorize(&actor.role, Action::Read)?;
    let form = find_form(db, id).await?;
    let sample_rows = samples_of_form(db, id).await?;
    let selection_rows = selections_of_form(db, id).await?;
    let alerts = if form.status == FormStatus::Completed {
        Vec::new()
    } else {
        alerts_for_samples(&sample_rows, now)
    };

    Ok(Form {
        id: form.id,
        report_title: form.report_title,
        brand: form.brand,
        site: form.site,
        status: form.status,
        created_by: form.created_by,
        modified_by: form.modified_by,
        version: form.version,
        created_at: form.created_at,
        modified_at: form.modified_at,
        samples: sample_rows
            .into_iter()
            .map(|sample| Sample::from_model(sample, now))
            .collect(),
        bacteria: selection_rows
            .into_iter()
            .map(|selection| BacteriaSelection::from_model(selection, now))
            .collect(),
        alerts,
    })
}

/// Discard a draft with its samples and selections
pub async fn cancel_draft(
    db: &DatabaseConnection,
    actor: &Actor,
    id: Uuid,
    now: DateTime<Utc>,
) -> BusinessResult<()> {
    lifecycle::authorize(&actor.role, Action::CancelDraft)?;
    let txn = db.begin().await?;
    let form = find_form(&txn, id).await?;
    lifecycle::check_action(&actor.role, Action::CancelDraft, form.status)?;

    selections::Entity::delete_many()
        .filter(selections::Column::FormId.eq(id))
        .exec(&txn)
        .await
        .map_err(|err| err.to_business_error("bacteria_selection"))?;
    samples::Entity::delete_many()
        .filter(samples::Column::FormId.eq(id))
        .exec(&txn)
        .await
        .map_err(|err| err.to_business_error("sample"))?;
    let result = Entity::delete_many()
        .filter(Column::Id.eq(id))
        .filter(Column::Status.eq(FormStatus::Draft))
        .exec(&txn)
        .await
        .map_err(|err| err.to_business_error("form"))?;
    if result.rows_affected == 0 {
        return Err(version_conflict!("Form", id));
    }
    txn.commit().await?;

    tracing::info!(form = %id, user = %actor.name, "Draft form cancelled");
    history::record(db, actor, vec![ChangeEntry::form(id, "cancel_draft")], now).await;
    Ok(())
}

fn new_selection(form_id: Uuid, bacterium: Bacterium, now: DateTime<Utc>) -> selections::ActiveModel {
    selections::ActiveModel {
        id: Set(Uuid::new_v4()),
        form_id: Set(form_id),
        bacteria_name: Set(bacterium.display_name().to_string()),
        bacteria_delay: Set(bacterium.delay_label().to_string()),
        reading_day: Set(None),
        seeded_at: Set(None),
        due_at: Set(None),
        status: Set(SelectionStatus::Pending),
        completed_at: Set(None),
        created_at: Set(now),
        modified_at: Set(now),
    }
}

/// `draft -> analyses_en_cours`: record the chosen bacteria and hand the form over
pub async fn send_to_technician(
    db: &DatabaseConnection,
    actor: &Actor,
    id: Uuid,
    request: SendToTechnician,
    now: DateTime<Utc>,
) -> BusinessResult<Form> {
    lifecycle::authorize(&actor.role, Action::SendToTechnician)?;
    let txn = db.begin().await?;
    let form = find_form(&txn, id).await?;
    lifecycle::check_action(&actor.role, Action::SendToTechnician, form.status)?;
    let sample_rows = samples_of_form(&txn, id).await?;
    let bacteria = lifecycle::check_send(&sample_rows, &request.bacteria)?;

    selections::Entity::insert_many(
        bacteria
            .iter()
            .map(|bacterium| new_selection(id, *bacterium, now)),
    )
    .exec(&txn)
    .await
    .map_err(|err| err.to_business_error("bacteria_selection"))?;

    let form = advance_form(&txn, form, FormStatus::AnalysesEnCours, actor, now).await?;
    mirror_sample_statuses(&txn, &sample_rows, form.status, actor, now).await?;
    txn.commit().await?;

    let mut entries = vec![
        ChangeEntry::form(id, "send_to_technician")
            .with_status(FormStatus::Draft, FormStatus::AnalysesEnCours),
    ];
    entries.extend(bacteria.iter().map(|bacterium| {
        ChangeEntry::form(id, "select_bacterium").with_change(FieldChange::new(
            "bacteria",
            None,
            Some(bacterium.display_name().to_string()),
        ))
    }));
    history::record(db, actor, entries, now).await;
    get_form(db, actor, id, now).await
}

/// Stamp seeding time, due date and reading day on every selection of the form
async fn seed_selections<C>(db: &C, form_id: Uuid, now: DateTime<Utc>) -> BusinessResult<()>
where
    C: ConnectionTrait,
{
    for selection in selections_of_form(db, form_id).await? {
        let due_at = incubation::compute_due_date(now, &selection.bacteria_name);
        let reading_day = incubation::weekday_name(incubation::reading_day(due_at));
        tracing::debug!(
            form = %form_id,
            bacterium = %selection.bacteria_name,
            %due_at,
            "Reading planned for {reading_day}"
        );

        let mut active: selections::ActiveModel = selection.into();
        active.seeded_at = Set(Some(now));
        active.due_at = Set(Some(due_at));
        active.reading_day = Set(Some(reading_day.to_string()));
        active.modified_at = Set(now);
        active
            .update(db)
            .await
            .map_err(|err| err.to_business_error("bacteria_selection"))?;
    }
    Ok(())
}

/// `analyses_en_cours -> waiting_reading`: save a batch of sensory results and move on
/// only if every live sample is complete afterwards. Nothing is kept otherwise.
pub async fn submit_sensory(
    db: &DatabaseConnection,
    actor: &Actor,
    id: Uuid,
    submission: SensorySubmission,
    now: DateTime<Utc>,
) -> BusinessResult<Form> {
    lifecycle::authorize(&actor.role, Action::SubmitSensory)?;
    let txn = db.begin().await?;
    let form = find_form(&txn, id).await?;
    lifecycle::check_action(&actor.role, Action::SubmitSensory, form.status)?;

    let mut sample_rows = samples_of_form(&txn, id).await?;
    let mut entries = Vec::new();
    for entry in &submission.results {
        let sample = sample_rows
            .iter_mut()
            .find(|sample| sample.id == entry.sample_id)
            .ok_or_else(|| not_found!("Sample", entry.sample_id))?;
        lifecycle::ensure_not_rejected(sample)?;
        if sample.version != entry.values.version {
            return Err(version_conflict!("Sample", sample.id));
        }

        let mut updated = sample.clone();
        let changes = merge_results(&mut updated, &entry.values)?;
        if changes.is_empty() {
            continue;
        }
        updated.status = SampleStatus::InProgress;
        *sample = save_versioned(&txn, updated, entry.values.version, actor, now).await?;
        entries.extend(changes.into_iter().map(|change| {
            ChangeEntry::sample(id, entry.sample_id, "edit_results").with_change(change)
        }));
    }

    lifecycle::check_sensory_complete(&sample_rows)?;
    seed_selections(&txn, id, now).await?;
    let form = advance_form(&txn, form, FormStatus::WaitingReading, actor, now).await?;
    mirror_sample_statuses(&txn, &sample_rows, form.status, actor, now).await?;
    txn.commit().await?;

    entries.push(
        ChangeEntry::form(id, "submit_sensory")
            .with_status(FormStatus::AnalysesEnCours, FormStatus::WaitingReading),
    );
    history::record(db, actor, entries, now).await;
    get_form(db, actor, id, now).await
}
