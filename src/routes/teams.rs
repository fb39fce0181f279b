use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rand::distr::Alphanumeric;
use rand::{rng, Rng};
use tracing::{info, warn};

use super::{acting_team, Presence, SharedClock};
use crate::dto::session_dto::SessionState;
use crate::dto::team_dto::{CreateTeam, FantasyTeam, StandingRow};
use crate::engine::standings::compute_standings;
use crate::error::EngineError;
use crate::services::auth_user::AuthUser;
use crate::store::{RecordStore, SqliteStore};

/**
 * GET request to get all the teams in a league.
 */
pub async fn get_teams(
    Extension(store): Extension<SqliteStore>,
    Path(league_id): Path<String>,
) -> Response {
    info!("Fetching teams for {}.", league_id);
    match store.list_teams(&league_id).await {
        Ok(teams) => (StatusCode::OK, Json(teams)).into_response(),
        Err(e) => EngineError::from(e).into_response(),
    }
}

/**
 * POST request to create the caller's team. One team per owner per league.
 */
pub async fn create_team(
    Extension(store): Extension<SqliteStore>,
    Path(league_id): Path<String>,
    AuthUser(claims): AuthUser,
    Json(payload): Json<CreateTeam>,
) -> Response {
    info!("Creating a team {} in {}", payload.name, league_id);

    let name = payload.name.trim();
    if name.is_empty() {
        return (StatusCode::BAD_REQUEST, "A team needs a name.".to_string()).into_response();
    }

    let team_id: String = rng()
        .sample_iter(&Alphanumeric)
        .take(10)
        .map(char::from)
        .collect();
    let team = FantasyTeam {
        league_id: league_id.clone(),
        team_id,
        name: name.to_string(),
        owner: claims.sub,
    };

    match store.create_team(&team).await {
        Ok(true) => (StatusCode::OK, Json(team)).into_response(),
        Ok(false) => {
            warn!("{} already has a team in {}", team.owner, league_id);
            (
                StatusCode::CONFLICT,
                format!("{} already has a team in this league.", team.owner),
            )
                .into_response()
        }
        Err(e) => EngineError::from(e).into_response(),
    }
}

/**
 * GET the league table.
 */
pub async fn get_standings(
    Extension(store): Extension<SqliteStore>,
    Path(league_id): Path<String>,
) -> Response {
    match league_table(&store, &league_id).await {
        Ok(rows) => (StatusCode::OK, Json(rows)).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn league_table(
    store: &SqliteStore,
    league_id: &str,
) -> Result<Vec<StandingRow>, EngineError> {
    let teams = store.list_teams(league_id).await?;
    let picks = store
        .list_picks(&SessionState::draft_session_id(league_id))
        .await?;
    let actions = store.list_transfer_actions(league_id).await?;
    let players = store.list_players().await?;
    Ok(compute_standings(&teams, &picks, &actions, &players))
}

/**
 * POST a heartbeat for the caller's team so its turns get the attended length.
 */
pub async fn heartbeat(
    Extension(store): Extension<SqliteStore>,
    Extension(presence): Extension<Presence>,
    Extension(clock): Extension<SharedClock>,
    Path(league_id): Path<String>,
    AuthUser(claims): AuthUser,
) -> Response {
    let team = match acting_team(&store, &league_id, &claims).await {
        Ok(team) => team,
        Err(e) => return e.into_response(),
    };

    match presence.heartbeat(&league_id, &team.team_id, clock.now()).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    }
}
