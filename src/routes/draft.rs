use std::sync::Arc;

use axum::{
    extract::{Extension, Json, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::info;

use super::{acting_team, is_commissioner, Drafts, SharedClock};
use crate::config::AuthConfig;
use crate::dto::draft_dto::{PickRequest, StartDraftRequest};
use crate::dto::session_dto::SessionView;
use crate::services::auth_user::AuthUser;
use crate::store::SqliteStore;

/**
 * POST to start the league's draft. Commissioner only. Without an order
 * in the body the teams are shuffled.
 */
pub async fn start_draft(
    Extension(drafts): Extension<Drafts>,
    Extension(auth): Extension<Arc<AuthConfig>>,
    Extension(clock): Extension<SharedClock>,
    Path(league_id): Path<String>,
    AuthUser(claims): AuthUser,
    Json(payload): Json<StartDraftRequest>,
) -> Response {
    info!("Starting the draft for {}.", league_id);
    if !is_commissioner(&claims, &auth) {
        return (
            StatusCode::FORBIDDEN,
            "You must be the commissioner to start the draft.".to_string(),
        )
            .into_response();
    }

    match drafts
        .start_draft(&league_id, payload.order, payload.number_of_rounds, payload.snake)
        .await
    {
        Ok(state) => {
            let view = SessionView::at(&state, clock.now());
            (StatusCode::OK, Json(view)).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/**
 * GET the current turn, deadline and pick count.
 */
pub async fn get_state(
    Extension(drafts): Extension<Drafts>,
    Path(league_id): Path<String>,
) -> Response {
    match drafts.view(&league_id).await {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(e) => e.into_response(),
    }
}

/**
 * POST a pick for the caller's team. Fails unless it is that team's turn.
 */
pub async fn draft_pick(
    Extension(drafts): Extension<Drafts>,
    Extension(store): Extension<SqliteStore>,
    Path(league_id): Path<String>,
    AuthUser(claims): AuthUser,
    Json(payload): Json<PickRequest>,
) -> Response {
    info!("{} is drafting player {} in {}", claims.sub, payload.player_id, league_id);

    let team = match acting_team(&store, &league_id, &claims).await {
        Ok(team) => team,
        Err(e) => return e.into_response(),
    };

    match drafts
        .submit_pick(&league_id, &team.team_id, &payload.player_id)
        .await
    {
        Ok(pick) => (StatusCode::OK, Json(pick)).into_response(),
        Err(e) => e.into_response(),
    }
}
