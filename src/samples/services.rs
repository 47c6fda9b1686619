use super::conformity::{SensoryAttribute, normalize_ph};
use super::models::{
    ActiveModel, Column, Conformity, Entity, Model, SampleCreate, SampleResultsUpdate,
    SampleStatus, SampleUpdate,
};
use crate::common::auth::Actor;
use crate::common::dates::{format_date, parse_optional_date, parse_ready_time};
use crate::common::errors::{BusinessResult, DbErrorExt};
use crate::forms::lifecycle::{self, Action};
use crate::forms::models::{FormStatus, Model as Form};
use crate::forms::services::find_form;
use crate::history::models::{ChangeEntry, FieldChange};
use crate::history::services as history;
use crate::{not_found, validation_error, version_conflict};
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, TransactionTrait,
};
use uuid::Uuid;

pub async fn find_sample<C>(db: &C, id: Uuid) -> BusinessResult<Model>
where
    C: ConnectionTrait,
{
    Entity::find_by_id(id)
        .one(db)
        .await
        .map_err(|err| err.to_business_error("sample"))?
        .ok_or_else(|| not_found!("Sample", id))
}

pub async fn samples_of_form<C>(db: &C, form_id: Uuid) -> BusinessResult<Vec<Model>>
where
    C: ConnectionTrait,
{
    Entity::find()
        .filter(Column::FormId.eq(form_id))
        .order_by_asc(Column::CreatedAt)
        .order_by_asc(Column::Number)
        .all(db)
        .await
        .map_err(|err| err.to_business_error("sample"))
}

fn required_text(field: &str, value: &str) -> BusinessResult<String> {
    let value = value.trim();
    if value.is_empty() {
        Err(validation_error!(field, "cannot be empty"))
    } else {
        Ok(value.to_string())
    }
}

fn optional_ready_time(raw: Option<&str>) -> BusinessResult<Option<String>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => parse_ready_time(value).map(Some),
    }
}

/// A new sample inherits brand, site and report title from its form
pub(crate) fn new_active_sample(
    form: &Form,
    create: &SampleCreate,
    actor: &Actor,
    now: DateTime<Utc>,
) -> BusinessResult<ActiveModel> {
    Ok(ActiveModel {
        id: Set(Uuid::new_v4()),
        form_id: Set(form.id),
        number: Set(required_text("number", &create.number)?),
        product: Set(required_text("product", &create.product)?),
        ready_time: Set(optional_ready_time(create.ready_time.as_deref())?),
        fabrication: Set(parse_optional_date(
            "fabrication",
            create.fabrication.as_deref(),
        )?),
        dlc: Set(parse_optional_date("dlc", create.dlc.as_deref())?),
        smell: Set(Conformity::NotTested),
        texture: Set(Conformity::NotTested),
        taste: Set(Conformity::NotTested),
        aspect: Set(Conformity::NotTested),
        ph: Set(None),
        enterobacteria: Set(None),
        yeast_mold: Set(None),
        coliforms_count: Set(None),
        staphylococcus_count: Set(None),
        listeria_count: Set(None),
        escherichia_coli_count: Set(None),
        total_flora_count: Set(None),
        leuconostoc_count: Set(None),
        status: Set(SampleStatus::Pending),
        lab_comment: Set(None),
        site: Set(form.site.clone()),
        brand: Set(form.brand.clone()),
        report_title: Set(form.report_title.clone()),
        modified_by: Set(actor.name.clone()),
        version: Set(1),
        created_at: Set(now),
        modified_at: Set(now),
    })
}

/// Compare-and-swap write of a whole sample row. Bumps the version and audit fields;
/// zero rows matched means someone else wrote first.
pub(crate) async fn save_versioned<C>(
    db: &C,
    mut sample: Model,
    expected_version: i32,
    actor: &Actor,
    now: DateTime<Utc>,
) -> BusinessResult<Model>
where
    C: ConnectionTrait,
{
    sample.version = expected_version + 1;
    sample.modified_by.clone_from(&actor.name);
    sample.modified_at = now;

    let result = Entity::update_many()
        .set(ActiveModel::from(sample.clone()).reset_all())
        .filter(Column::Id.eq(sample.id))
        .filter(Column::Version.eq(expected_version))
        .exec(db)
        .await
        .map_err(|err| err.to_business_error("sample"))?;

    if result.rows_affected == 0 {
        return Err(version_conflict!("Sample", sample.id));
    }
    Ok(sample)
}

fn check_version(sample: &Model, requested: i32) -> BusinessResult<()> {
    if sample.version == requested {
        Ok(())
    } else {
        Err(version_conflict!("Sample", sample.id))
    }
}

fn date_text(date: Option<NaiveDate>) -> Option<String> {
    date.map(format_date)
}

/// Apply coordinator edits, returning the fields that actually changed
pub(crate) fn merge_coordinator_fields(
    sample: &mut Model,
    update: &SampleUpdate,
) -> BusinessResult<Vec<FieldChange>> {
    let mut changes = Vec::new();

    if let Some(number) = &update.number {
        let number = required_text("number", number)?;
        changes.extend(FieldChange::diff(
            "number",
            Some(sample.number.clone()),
            Some(number.clone()),
        ));
        sample.number = number;
    }
    if let Some(product) = &update.product {
        let product = required_text("product", product)?;
        changes.extend(FieldChange::diff(
            "product",
            Some(sample.product.clone()),
            Some(product.clone()),
        ));
        sample.product = product;
    }
    if let Some(ready_time) = &update.ready_time {
        let ready_time = optional_ready_time(Some(ready_time))?;
        changes.extend(FieldChange::diff(
            "ready_time",
            sample.ready_time.clone(),
            ready_time.clone(),
        ));
        sample.ready_time = ready_time;
    }
    if let Some(fabrication) = &update.fabrication {
        let fabrication = parse_optional_date("fabrication", Some(fabrication))?;
        changes.extend(FieldChange::diff(
            "fabrication",
            date_text(sample.fabrication),
            date_text(fabrication),
        ));
        sample.fabrication = fabrication;
    }
    if let Some(dlc) = &update.dlc {
        let dlc = parse_optional_date("dlc", Some(dlc))?;
        changes.extend(FieldChange::diff("dlc", date_text(sample.dlc), date_text(dlc)));
        sample.dlc = dlc;
    }
    Ok(changes)
}

fn set_conformity(
    sample: &mut Model,
    attribute: SensoryAttribute,
    value: Conformity,
) -> Option<FieldChange> {
    let old = attribute.value_of(sample);
    match attribute {
        SensoryAttribute::Smell => sample.smell = value,
        SensoryAttribute::Texture => sample.texture = value,
        SensoryAttribute::Taste => sample.taste = value,
        SensoryAttribute::Aspect => sample.aspect = value,
    }
    FieldChange::diff(
        attribute.as_str(),
        Some(old.code().to_string()),
        Some(value.code().to_string()),
    )
}

/// Apply technician edits (sensory values, pH, comment), returning what changed
pub(crate) fn merge_results(
    sample: &mut Model,
    update: &SampleResultsUpdate,
) -> BusinessResult<Vec<FieldChange>> {
    let mut changes = Vec::new();
    let requested = [
        (SensoryAttribute::Smell, update.smell),
        (SensoryAttribute::Texture, update.texture),
        (SensoryAttribute::Taste, update.taste),
        (SensoryAttribute::Aspect, update.aspect),
    ];
    for (attribute, value) in requested {
        if let Some(value) = value {
            let value = value.require_tested(attribute)?;
            changes.extend(set_conformity(sample, attribute, value));
        }
    }

    if let Some(ph) = &update.ph {
        let ph = if ph.trim().is_empty() {
            None
        } else {
            Some(normalize_ph(ph)?)
        };
        changes.extend(FieldChange::diff("ph", sample.ph.clone(), ph.clone()));
        sample.ph = ph;
    }
    if let Some(comment) = &update.lab_comment {
        let comment = Some(comment.trim().to_string()).filter(|c| !c.is_empty());
        changes.extend(FieldChange::diff(
            "lab_comment",
            sample.lab_comment.clone(),
            comment.clone(),
        ));
        sample.lab_comment = comment;
    }
    Ok(changes)
}

/// First technician edit moves the sample from `analyses_en_cours` to `in_progress`
fn mark_in_progress(sample: &mut Model, form_status: FormStatus) -> BusinessResult<()> {
    if sample.status == SampleStatus::AnalysesEnCours {
        lifecycle::ensure_sample_within_form(SampleStatus::InProgress, form_status)?;
        sample.status = SampleStatus::InProgress;
    }
    Ok(())
}

fn sample_entries(sample: &Model, action: &str, changes: Vec<FieldChange>) -> Vec<ChangeEntry> {
    changes
        .into_iter()
        .map(|change| ChangeEntry::sample(sample.form_id, sample.id, action).with_change(change))
        .collect()
}

/// Load a sample together with its form, checking role and form status for `action`
async fn load_for_action<C>(
    db: &C,
    actor: &Actor,
    id: Uuid,
    action: Action,
) -> BusinessResult<(Model, Form)>
where
    C: ConnectionTrait,
{
    lifecycle::authorize(&actor.role, action)?;
    let sample = find_sample(db, id).await?;
    let form = find_form(db, sample.form_id).await?;
    lifecycle::check_action(&actor.role, action, form.status)?;
    Ok((sample, form))
}

pub async fn add_sample(
    db: &DatabaseConnection,
    actor: &Actor,
    form_id: Uuid,
    create: SampleCreate,
    now: DateTime<Utc>,
) -> BusinessResult<Model> {
    lifecycle::authorize(&actor.role, Action::EditDraft)?;
    let form = find_form(db, form_id).await?;
    lifecycle::check_action(&actor.role, Action::EditDraft, form.status)?;

    let sample = new_active_sample(&form, &create, actor, now)?
        .insert(db)
        .await
        .map_err(|err| err.to_business_error("sample"))?;

    tracing::info!(form = %form.id, sample = %sample.id, "Sample #{} added", sample.number);
    history::record(
        db,
        actor,
        vec![ChangeEntry::sample(form.id, sample.id, "add_sample")],
        now,
    )
    .await;
    Ok(sample)
}

pub async fn update_sample(
    db: &DatabaseConnection,
    actor: &Actor,
    id: Uuid,
    update: SampleUpdate,
    now: DateTime<Utc>,
) -> BusinessResult<Model> {
    let txn = db.begin().await?;
    let (mut sample, _form) = load_for_action(&txn, actor, id, Action::EditDraft).await?;
    check_version(&sample, update.version)?;

    let changes = merge_coordinator_fields(&mut sample, &update)?;
    if changes.is_empty() {
        return Ok(sample);
    }
    let sample = save_versioned(&txn, sample, update.version, actor, now).await?;
    txn.commit().await?;

    history::record(db, actor, sample_entries(&sample, "edit_sample", changes), now).await;
    Ok(sample)
}

pub async fn update_results(
    db: &DatabaseConnection,
    actor: &Actor,
    id: Uuid,
    update: SampleResultsUpdate,
    now: DateTime<Utc>,
) -> BusinessResult<Model> {
    let txn = db.begin().await?;
    let (mut sample, form) = load_for_action(&txn, actor, id, Action::EditResults).await?;
    lifecycle::ensure_not_rejected(&sample)?;
    check_version(&sample, update.version)?;

    let changes = merge_results(&mut sample, &update)?;
    if changes.is_empty() {
        return Ok(sample);
    }
    mark_in_progress(&mut sample, form.status)?;
    let sample = save_versioned(&txn, sample, update.version, actor, now).await?;
    txn.commit().await?;

    history::record(db, actor, sample_entries(&sample, "edit_results", changes), now).await;
    Ok(sample)
}

pub async fn toggle_conformity(
    db: &DatabaseConnection,
    actor: &Actor,
    id: Uuid,
    attribute: SensoryAttribute,
    now: DateTime<Utc>,
) -> BusinessResult<Model> {
    let txn = db.begin().await?;
    let (mut sample, form) = load_for_action(&txn, actor, id, Action::EditResults).await?;
    lifecycle::ensure_not_rejected(&sample)?;

    let next = attribute.value_of(&sample).toggle();
    let change = set_conformity(&mut sample, attribute, next);
    mark_in_progress(&mut sample, form.status)?;
    let version = sample.version;
    let sample = save_versioned(&txn, sample, version, actor, now).await?;
    txn.commit().await?;

    let entries = sample_entries(&sample, "toggle_conformity", change.into_iter().collect());
    history::record(db, actor, entries, now).await;
    Ok(sample)
}

/// Rejection is terminal; a rejected sample is left out of every later check.
pub async fn reject_sample(
    db: &DatabaseConnection,
    actor: &Actor,
    id: Uuid,
    version: i32,
    now: DateTime<Utc>,
) -> BusinessResult<Model> {
    let txn = db.begin().await?;
    let (mut sample, form) = load_for_action(&txn, actor, id, Action::RejectSample).await?;
    let siblings = samples_of_form(&txn, form.id).await?;
    lifecycle::check_reject(&siblings, &sample, form.status)?;
    check_version(&sample, version)?;

    let previous = sample.status;
    sample.status = SampleStatus::Rejected;
    let sample = save_versioned(&txn, sample, version, actor, now).await?;
    txn.commit().await?;

    tracing::info!(form = %sample.form_id, sample = %sample.id, "Sample #{} rejected", sample.number);
    let entry = ChangeEntry::sample(sample.form_id, sample.id, "reject_sample")
        .with_status(previous, SampleStatus::Rejected);
    history::record(db, actor, vec![entry], now).await;
    Ok(sample)
}

pub async fn delete_sample(
    db: &DatabaseConnection,
    actor: &Actor,
    id: Uuid,
    now: DateTime<Utc>,
) -> BusinessResult<()> {
    let txn = db.begin().await?;
    let (sample, _form) = load_for_action(&txn, actor, id, Action::EditDraft).await?;
    Entity::delete_by_id(sample.id)
        .exec(&txn)
        .await
        .map_err(|err| err.to_business_error("sample"))?;
    txn.commit().await?;

    tracing::info!(form = %sample.form_id, sample = %sample.id, "Sample #{} deleted", sample.number);
    let entry = ChangeEntry::sample(sample.form_id, sample.id, "delete_sample").with_change(
        FieldChange::new("number", Some(sample.number.clone()), None),
    );
    history::record(db, actor, vec![entry], now).await;
    Ok(())
}
