pub mod draft;
pub mod players;
pub mod teams;
pub mod transfers;

use std::sync::Arc;

use axum::{
    extract::Extension,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

use crate::clock::Clock;
use crate::config::AuthConfig;
use crate::dto::claims_dto::Claims;
use crate::dto::team_dto::FantasyTeam;
use crate::error::EngineError;
use crate::services::draft::DraftService;
use crate::services::presence::PresenceTracker;
use crate::services::transfer::TransferService;
use crate::store::{RecordStore, SqliteStore};

pub type Drafts = DraftService<SqliteStore>;
pub type Transfers = TransferService<SqliteStore>;
pub type Presence = PresenceTracker<SqliteStore>;
pub type SharedClock = Arc<dyn Clock>;

/// Everything the handlers pull out of request extensions.
#[derive(Clone)]
pub struct AppServices {
    pub store: SqliteStore,
    pub drafts: Drafts,
    pub transfers: Transfers,
    pub presence: Presence,
    pub clock: SharedClock,
    pub auth: Arc<AuthConfig>,
}

pub fn router(services: AppServices) -> Router {
    Router::new()
        .route(
            "/leagues/{league}/teams",
            get(teams::get_teams).post(teams::create_team),
        )
        .route("/leagues/{league}/standings", get(teams::get_standings))
        .route("/leagues/{league}/presence", post(teams::heartbeat))
        .route(
            "/leagues/{league}/players/available",
            get(players::get_available),
        )
        .route("/leagues/{league}/players/drafted", get(players::get_drafted))
        .route("/players/import", post(players::import_players))
        .route("/leagues/{league}/draft", get(draft::get_state))
        .route("/leagues/{league}/draft/start", post(draft::start_draft))
        .route("/leagues/{league}/draft/picks", post(draft::draft_pick))
        .route("/leagues/{league}/transfers", get(transfers::get_state))
        .route("/leagues/{league}/transfers/start", post(transfers::start_window))
        .route("/leagues/{league}/transfers/drop", post(transfers::drop_player))
        .route("/leagues/{league}/transfers/pickup", post(transfers::pickup_player))
        .route("/leagues/{league}/transfers/finish", post(transfers::finish))
        .route("/leagues/{league}/transfers/actions", get(transfers::get_actions))
        .layer(Extension(services.store))
        .layer(Extension(services.drafts))
        .layer(Extension(services.transfers))
        .layer(Extension(services.presence))
        .layer(Extension(services.clock))
        .layer(Extension(services.auth))
        .layer(CorsLayer::permissive())
}

/// The caller's team in `league_id`, looked up by token subject.
pub(crate) async fn acting_team(
    store: &SqliteStore,
    league_id: &str,
    claims: &Claims,
) -> Result<FantasyTeam, EngineError> {
    store
        .find_team_by_owner(league_id, &claims.sub)
        .await?
        .ok_or_else(|| EngineError::UnknownTeam {
            team: format!("(owned by {})", claims.sub),
        })
}

pub(crate) fn is_commissioner(claims: &Claims, auth: &AuthConfig) -> bool {
    claims.sub == auth.commissioner
}
