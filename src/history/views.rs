use super::models::Model as ChangeHistoryEntry;
use super::services;
use crate::common::auth::Actor;
use crate::common::errors::BusinessResult;
use crate::common::state::AppState;
use crate::forms::lifecycle::{self, Action};
use crate::forms::services::find_form;
use axum::{
    Json,
    extract::{Path, State},
};
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/{id}/history",
    tag = "forms",
    params(("id" = Uuid, Path, description = "Form ID")),
    responses(
        (status = 200, description = "Change history of the form, oldest first, also after a draft is cancelled", body = Vec<ChangeHistoryEntry>),
        (status = 403, description = "Role may not read forms"),
        (status = 404, description = "No form or history with this id")
    )
)]
pub async fn get_form_history(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> BusinessResult<Json<Vec<ChangeHistoryEntry>>> {
    lifecycle::authorize(&actor.role, Action::Read)?;
    // Rows outlive a cancelled draft; only an id with no trace at all is unknown
    let rows = services::list_for_form(&state.db, id).await?;
    if rows.is_empty() {
        find_form(&state.db, id).await?;
    }
    Ok(Json(rows))
}
