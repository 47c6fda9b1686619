use super::models::SampleAlert;
use super::services;
use crate::common::auth::{Actor, protect};
use crate::common::errors::BusinessResult;
use crate::common::state::AppState;
use axum::{Json, extract::State};
use chrono::Utc;
use utoipa_axum::{router::OpenApiRouter, routes};

pub fn router(state: &AppState) -> OpenApiRouter {
    let router = OpenApiRouter::new()
        .routes(routes!(list_alerts))
        .with_state(state.clone());
    protect(router, state, "alerts")
}

#[utoipa::path(
    get,
    path = "/",
    tag = "alerts",
    responses(
        (status = 200, description = "Samples flagged warning or urgent, most urgent first", body = Vec<SampleAlert>),
        (status = 403, description = "Role may not read forms")
    )
)]
pub async fn list_alerts(
    State(state): State<AppState>,
    actor: Actor,
) -> BusinessResult<Json<Vec<SampleAlert>>> {
    Ok(Json(
        services::list_alerts(&state.db, &actor, Utc::now()).await?,
    ))
}
