use std::sync::Arc;

use axum::{
    extract::{Extension, Json, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::info;

use super::{acting_team, is_commissioner, SharedClock, Transfers};
use crate::config::AuthConfig;
use crate::dto::session_dto::SessionView;
use crate::dto::transfer_dto::{StartTransferRequest, TransferRequest};
use crate::services::auth_user::AuthUser;
use crate::store::SqliteStore;

/**
 * POST to open a transfer window. Commissioner only.
 */
pub async fn start_window(
    Extension(transfers): Extension<Transfers>,
    Extension(auth): Extension<Arc<AuthConfig>>,
    Extension(clock): Extension<SharedClock>,
    Path(league_id): Path<String>,
    AuthUser(claims): AuthUser,
    Json(payload): Json<StartTransferRequest>,
) -> Response {
    info!("Opening a transfer window for {}.", league_id);
    if !is_commissioner(&claims, &auth) {
        return (
            StatusCode::FORBIDDEN,
            "You must be the commissioner to open a transfer window.".to_string(),
        )
            .into_response();
    }

    match transfers
        .start_window(
            &league_id,
            payload.order,
            payload.transfer_max_rounds,
            payload.snake,
            payload.window_end,
        )
        .await
    {
        Ok(state) => (StatusCode::OK, Json(SessionView::at(&state, clock.now()))).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn get_state(
    Extension(transfers): Extension<Transfers>,
    Path(league_id): Path<String>,
) -> Response {
    match transfers.view(&league_id).await {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn drop_player(
    Extension(transfers): Extension<Transfers>,
    Extension(store): Extension<SqliteStore>,
    Path(league_id): Path<String>,
    AuthUser(claims): AuthUser,
    Json(payload): Json<TransferRequest>,
) -> Response {
    info!("{} is dropping {} in {}", claims.sub, payload.player_id, league_id);
    let team = match acting_team(&store, &league_id, &claims).await {
        Ok(team) => team,
        Err(e) => return e.into_response(),
    };

    match transfers
        .submit_drop(&league_id, &team.team_id, &payload.player_id)
        .await
    {
        Ok(action) => (StatusCode::OK, Json(action)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn pickup_player(
    Extension(transfers): Extension<Transfers>,
    Extension(store): Extension<SqliteStore>,
    Path(league_id): Path<String>,
    AuthUser(claims): AuthUser,
    Json(payload): Json<TransferRequest>,
) -> Response {
    info!("{} is picking up {} in {}", claims.sub, payload.player_id, league_id);
    let team = match acting_team(&store, &league_id, &claims).await {
        Ok(team) => team,
        Err(e) => return e.into_response(),
    };

    match transfers
        .submit_pickup(&league_id, &team.team_id, &payload.player_id)
        .await
    {
        Ok(action) => (StatusCode::OK, Json(action)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn finish(
    Extension(transfers): Extension<Transfers>,
    Extension(store): Extension<SqliteStore>,
    Path(league_id): Path<String>,
    AuthUser(claims): AuthUser,
) -> Response {
    info!("{} is done transferring in {}", claims.sub, league_id);
    let team = match acting_team(&store, &league_id, &claims).await {
        Ok(team) => team,
        Err(e) => return e.into_response(),
    };

    match transfers.mark_finished(&league_id, &team.team_id).await {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn get_actions(
    Extension(transfers): Extension<Transfers>,
    Path(league_id): Path<String>,
) -> Response {
    match transfers.actions(&league_id).await {
        Ok(actions) => (StatusCode::OK, Json(actions)).into_response(),
        Err(e) => e.into_response(),
    }
}
