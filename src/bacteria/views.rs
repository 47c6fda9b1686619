use super::incubation::BacteriumInfo;
use super::models::CalendarDay;
use super::services;
use crate::common::auth::{Actor, protect};
use crate::common::errors::BusinessResult;
use crate::common::state::AppState;
use axum::{Json, extract::State};
use chrono::Utc;
use utoipa_axum::{router::OpenApiRouter, routes};

pub fn router(state: &AppState) -> OpenApiRouter {
    // The catalog stays public, the calendar exposes form details
    let calendar = OpenApiRouter::new()
        .routes(routes!(reading_calendar))
        .with_state(state.clone());

    OpenApiRouter::new()
        .routes(routes!(list_bacteria))
        .merge(protect(calendar, state, "bacteria calendar"))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "bacteria",
    responses(
        (status = 200, description = "Bacteria that can be selected, with their incubation delays", body = Vec<BacteriumInfo>)
    )
)]
pub async fn list_bacteria() -> Json<Vec<BacteriumInfo>> {
    Json(services::catalog())
}

#[utoipa::path(
    get,
    path = "/calendar",
    tag = "bacteria",
    responses(
        (status = 200, description = "Open readings grouped Monday to Saturday", body = Vec<CalendarDay>),
        (status = 403, description = "Role may not read forms")
    )
)]
pub async fn reading_calendar(
    State(state): State<AppState>,
    actor: Actor,
) -> BusinessResult<Json<Vec<CalendarDay>>> {
    Ok(Json(services::calendar(&state.db, &actor, Utc::now()).await?))
}
