use super::conformity::SensoryAttribute;
use super::models::{Sample, SampleResultsUpdate, SampleUpdate, VersionedRequest};
use super::services;
use crate::common::auth::{Actor, protect};
use crate::common::errors::BusinessResult;
use crate::common::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use utoipa_axum::{router::OpenApiRouter, routes};
use uuid::Uuid;

pub fn router(state: &AppState) -> OpenApiRouter {
    let router = OpenApiRouter::new()
        .routes(routes!(update_sample, delete_sample))
        .routes(routes!(update_results))
        .routes(routes!(toggle_conformity))
        .routes(routes!(reject_sample))
        .with_state(state.clone());
    protect(router, state, "samples")
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "samples",
    params(("id" = Uuid, Path, description = "Sample ID")),
    request_body = SampleUpdate,
    responses(
        (status = 200, description = "Sample updated", body = Sample),
        (status = 400, description = "Invalid field value"),
        (status = 403, description = "Only coordinators edit samples"),
        (status = 409, description = "Sample changed since it was read"),
        (status = 422, description = "Form is no longer a draft")
    )
)]
pub async fn update_sample(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(update): Json<SampleUpdate>,
) -> BusinessResult<Json<Sample>> {
    let now = Utc::now();
    let sample = services::update_sample(&state.db, &actor, id, update, now).await?;
    Ok(Json(Sample::from_model(sample, now)))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "samples",
    params(("id" = Uuid, Path, description = "Sample ID")),
    responses(
        (status = 204, description = "Sample deleted"),
        (status = 403, description = "Only coordinators delete samples"),
        (status = 404, description = "Sample not found"),
        (status = 422, description = "Form is no longer a draft")
    )
)]
pub async fn delete_sample(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> BusinessResult<StatusCode> {
    services::delete_sample(&state.db, &actor, id, Utc::now()).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    patch,
    path = "/{id}/results",
    tag = "samples",
    params(("id" = Uuid, Path, description = "Sample ID")),
    request_body = SampleResultsUpdate,
    responses(
        (status = 200, description = "Results saved", body = Sample),
        (status = 400, description = "Invalid conformity or pH"),
        (status = 403, description = "Only technicians record results"),
        (status = 409, description = "Sample changed since it was read"),
        (status = 422, description = "Form is not under analysis or sample is rejected")
    )
)]
pub async fn update_results(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(update): Json<SampleResultsUpdate>,
) -> BusinessResult<Json<Sample>> {
    let now = Utc::now();
    let sample = services::update_results(&state.db, &actor, id, update, now).await?;
    Ok(Json(Sample::from_model(sample, now)))
}

#[utoipa::path(
    post,
    path = "/{id}/toggle/{attribute}",
    tag = "samples",
    params(
        ("id" = Uuid, Path, description = "Sample ID"),
        ("attribute" = SensoryAttribute, Path, description = "smell, texture, taste or aspect")
    ),
    responses(
        (status = 200, description = "Conformity flipped", body = Sample),
        (status = 403, description = "Only technicians record results"),
        (status = 422, description = "Form is not under analysis or sample is rejected")
    )
)]
pub async fn toggle_conformity(
    State(state): State<AppState>,
    actor: Actor,
    Path((id, attribute)): Path<(Uuid, SensoryAttribute)>,
) -> BusinessResult<Json<Sample>> {
    let now = Utc::now();
    let sample = services::toggle_conformity(&state.db, &actor, id, attribute, now).await?;
    Ok(Json(Sample::from_model(sample, now)))
}

#[utoipa::path(
    post,
    path = "/{id}/reject",
    tag = "samples",
    params(("id" = Uuid, Path, description = "Sample ID")),
    request_body = VersionedRequest,
    responses(
        (status = 200, description = "Sample rejected", body = Sample),
        (status = 403, description = "Only coordinators reject samples"),
        (status = 409, description = "Sample changed since it was read"),
        (status = 422, description = "Sample already rejected or form completed")
    )
)]
pub async fn reject_sample(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(request): Json<VersionedRequest>,
) -> BusinessResult<Json<Sample>> {
    let now = Utc::now();
    let sample = services::reject_sample(&state.db, &actor, id, request.version, now).await?;
    Ok(Json(Sample::from_model(sample, now)))
}
