use super::export::samples_to_csv;
use super::models::{
    Form, FormCreate, FormFilter, FormSummary, ReadingSubmission, SendToTechnician,
    SensorySubmission,
};
use super::services;
use crate::bacteria::services::submit_reading;
use crate::common::auth::{Actor, protect};
use crate::common::errors::BusinessResult;
use crate::common::state::AppState;
use crate::forms::lifecycle::{self, Action};
use crate::samples::models::{Sample, SampleCreate};
use crate::samples::services::{add_sample, samples_of_form};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use chrono::Utc;
use utoipa_axum::{router::OpenApiRouter, routes};
use uuid::Uuid;

pub fn router(state: &AppState) -> OpenApiRouter {
    let router = OpenApiRouter::new()
        .routes(routes!(list_forms, create_form))
        .routes(routes!(get_form, cancel_draft))
        .routes(routes!(create_sample))
        .routes(routes!(send_to_technician))
        .routes(routes!(submit_sensory))
        .routes(routes!(record_reading))
        .routes(routes!(crate::history::views::get_form_history))
        .routes(routes!(export_form))
        .with_state(state.clone());
    protect(router, state, "forms")
}

#[utoipa::path(
    get,
    path = "/",
    tag = "forms",
    params(FormFilter),
    responses(
        (status = 200, description = "Forms, newest first", body = Vec<FormSummary>),
        (status = 403, description = "Role may not read forms")
    )
)]
pub async fn list_forms(
    State(state): State<AppState>,
    actor: Actor,
    Query(filter): Query<FormFilter>,
) -> BusinessResult<Json<Vec<FormSummary>>> {
    Ok(Json(
        services::list_forms(&state.db, &actor, filter.status).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "forms",
    request_body = FormCreate,
    responses(
        (status = 201, description = "Draft form created", body = Form),
        (status = 400, description = "Missing title, brand, site or invalid sample"),
        (status = 403, description = "Only coordinators create forms")
    )
)]
pub async fn create_form(
    State(state): State<AppState>,
    actor: Actor,
    Json(create): Json<FormCreate>,
) -> BusinessResult<(StatusCode, Json<Form>)> {
    let form = services::create_form(&state.db, &actor, create, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(form)))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "forms",
    params(("id" = Uuid, Path, description = "Form ID")),
    responses(
        (status = 200, description = "Form with samples, bacteria and alerts", body = Form),
        (status = 404, description = "Form not found")
    )
)]
pub async fn get_form(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> BusinessResult<Json<Form>> {
    Ok(Json(
        services::get_form(&state.db, &actor, id, Utc::now()).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "forms",
    params(("id" = Uuid, Path, description = "Form ID")),
    responses(
        (status = 204, description = "Draft discarded"),
        (status = 403, description = "Only coordinators cancel drafts"),
        (status = 422, description = "Form already sent")
    )
)]
pub async fn cancel_draft(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> BusinessResult<StatusCode> {
    services::cancel_draft(&state.db, &actor, id, Utc::now()).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/{id}/samples",
    tag = "forms",
    params(("id" = Uuid, Path, description = "Form ID")),
    request_body = SampleCreate,
    responses(
        (status = 201, description = "Sample added to the draft", body = Sample),
        (status = 400, description = "Invalid sample"),
        (status = 403, description = "Only coordinators add samples"),
        (status = 422, description = "Form is no longer a draft")
    )
)]
pub async fn create_sample(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(create): Json<SampleCreate>,
) -> BusinessResult<(StatusCode, Json<Sample>)> {
    let now = Utc::now();
    let sample = add_sample(&state.db, &actor, id, create, now).await?;
    Ok((StatusCode::CREATED, Json(Sample::from_model(sample, now))))
}

#[utoipa::path(
    post,
    path = "/{id}/send",
    tag = "forms",
    params(("id" = Uuid, Path, description = "Form ID")),
    request_body = SendToTechnician,
    responses(
        (status = 200, description = "Form sent for analysis", body = Form),
        (status = 400, description = "Unknown or overlapping bacteria"),
        (status = 403, description = "Only coordinators send forms"),
        (status = 409, description = "Form changed concurrently"),
        (status = 422, description = "No samples, no bacteria, or form not a draft")
    )
)]
pub async fn send_to_technician(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(request): Json<SendToTechnician>,
) -> BusinessResult<Json<Form>> {
    Ok(Json(
        services::send_to_technician(&state.db, &actor, id, request, Utc::now()).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/{id}/sensory",
    tag = "forms",
    params(("id" = Uuid, Path, description = "Form ID")),
    request_body = SensorySubmission,
    responses(
        (status = 200, description = "Sensory results saved, form waiting for readings", body = Form),
        (status = 403, description = "Only technicians submit results"),
        (status = 409, description = "A sample changed since it was read"),
        (status = 422, description = "Samples still incomplete, listed in `missing`")
    )
)]
pub async fn submit_sensory(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(submission): Json<SensorySubmission>,
) -> BusinessResult<Json<Form>> {
    Ok(Json(
        services::submit_sensory(&state.db, &actor, id, submission, Utc::now()).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/{id}/readings/{selection_id}",
    tag = "forms",
    params(
        ("id" = Uuid, Path, description = "Form ID"),
        ("selection_id" = Uuid, Path, description = "Bacteria selection ID")
    ),
    request_body = ReadingSubmission,
    responses(
        (status = 200, description = "Reading saved", body = Form),
        (status = 400, description = "Invalid reading value"),
        (status = 403, description = "Only technicians submit readings"),
        (status = 409, description = "A sample changed since it was read"),
        (status = 422, description = "Not due yet, already completed, or nothing recorded")
    )
)]
pub async fn record_reading(
    State(state): State<AppState>,
    actor: Actor,
    Path((id, selection_id)): Path<(Uuid, Uuid)>,
    Json(submission): Json<ReadingSubmission>,
) -> BusinessResult<Json<Form>> {
    Ok(Json(
        submit_reading(&state.db, &actor, id, selection_id, submission, Utc::now()).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/{id}/export",
    tag = "forms",
    params(("id" = Uuid, Path, description = "Form ID")),
    responses(
        (status = 200, description = "CSV with one row per sample", content_type = "text/csv"),
        (status = 404, description = "Form not found")
    )
)]
pub async fn export_form(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> BusinessResult<impl IntoResponse> {
    lifecycle::authorize(&actor.role, Action::Read)?;
    let form = services::find_form(&state.db, id).await?;
    let samples = samples_of_form(&state.db, id).await?;
    let body = samples_to_csv(&form, &samples)?;
    let disposition = format!("attachment; filename=\"form-{id}.csv\"");

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    ))
}
