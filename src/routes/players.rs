use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{error, info};

use super::{is_commissioner, Drafts};
use crate::config::AuthConfig;
use crate::dto::player_dto::ImportSummary;
use crate::error::EngineError;
use crate::services::auth_user::AuthUser;
use crate::services::record_normalizer::{self, ItemBatch};
use crate::store::{RecordStore, SqliteStore};

/**
 * GET the players nobody in the league owns, best first.
 */
pub async fn get_available(
    Extension(drafts): Extension<Drafts>,
    Path(league_id): Path<String>,
) -> Response {
    match drafts.available(&league_id).await {
        Ok(players) => (StatusCode::OK, Json(players)).into_response(),
        Err(e) => e.into_response(),
    }
}

/**
 * GET the picks made so far in the league's draft.
 */
pub async fn get_drafted(
    Extension(drafts): Extension<Drafts>,
    Path(league_id): Path<String>,
) -> Response {
    match drafts.drafted(&league_id).await {
        Ok(picks) => (StatusCode::OK, Json(picks)).into_response(),
        Err(e) => e.into_response(),
    }
}

/**
 * POST a DynamoDB scan export (`{"Items": [...]}`) into the player pool.
 */
pub async fn import_players(
    Extension(store): Extension<SqliteStore>,
    Extension(auth): Extension<Arc<AuthConfig>>,
    AuthUser(claims): AuthUser,
    Json(payload): Json<ItemBatch>,
) -> Response {
    info!("Importing {} player records.", payload.items.len());
    if !is_commissioner(&claims, &auth) {
        return (
            StatusCode::FORBIDDEN,
            "You must be the commissioner to import players.".to_string(),
        )
            .into_response();
    }

    let players = match record_normalizer::players_from_items(&payload.items) {
        Ok(players) => players,
        Err(e) => {
            error!("Rejected player import: {}", e);
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
    };

    match store.upsert_players(&players).await {
        Ok(imported) => (StatusCode::OK, Json(ImportSummary { imported })).into_response(),
        Err(e) => EngineError::from(e).into_response(),
    }
}
