#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};

use golden_boot::clock::{Clock, ManualClock};
use golden_boot::config::TurnConfig;
use golden_boot::dto::player_dto::Player;
use golden_boot::dto::team_dto::FantasyTeam;
use golden_boot::services::draft::DraftService;
use golden_boot::services::presence::PresenceTracker;
use golden_boot::services::transfer::TransferService;
use golden_boot::store::{RecordStore, SqliteStore};

pub const LEAGUE: &str = "mls";

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 18, 0, 0).unwrap()
}

/// Unattended teams get this long per turn with the default config.
pub fn unattended() -> Duration {
    Duration::seconds(TurnConfig::default().unattended_turn_secs as i64)
}

pub struct League {
    pub store: SqliteStore,
    pub clock: Arc<ManualClock>,
    pub drafts: DraftService<SqliteStore>,
    pub transfers: TransferService<SqliteStore>,
    pub presence: PresenceTracker<SqliteStore>,
}

pub fn player(id: &str, ranking: i64, goals: i64) -> Player {
    Player {
        player_id: id.to_string(),
        name: id.to_uppercase(),
        club: "Inter Miami".into(),
        position: "F".into(),
        ranking,
        goals,
    }
}

/// A league with `teams` (owned by `{id}-owner`) and a player pool of
/// `(player_id, ranking)` pairs, all on a fresh in-memory store.
pub async fn league(teams: &[&str], players: &[(&str, i64)]) -> League {
    let store = SqliteStore::in_memory().await.unwrap();
    for id in teams {
        let created = store
            .create_team(&FantasyTeam {
                league_id: LEAGUE.into(),
                team_id: id.to_string(),
                name: id.to_uppercase(),
                owner: format!("{id}-owner"),
            })
            .await
            .unwrap();
        assert!(created);
    }
    let pool: Vec<Player> = players
        .iter()
        .map(|(id, ranking)| player(id, *ranking, 0))
        .collect();
    store.upsert_players(&pool).await.unwrap();

    let clock = Arc::new(ManualClock::new(t0()));
    let shared: Arc<dyn Clock> = clock.clone();
    let turns = TurnConfig::default();
    League {
        drafts: DraftService::new(store.clone(), shared.clone(), turns.clone()),
        transfers: TransferService::new(store.clone(), shared, turns.clone()),
        presence: PresenceTracker::new(store.clone(), turns),
        store,
        clock,
    }
}

pub fn order(ids: &[&str]) -> Option<Vec<String>> {
    Some(ids.iter().map(|s| s.to_string()).collect())
}
