// The record store: keyed reads and writes plus the conditional primitives
// that serialize competing clients.

pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::dto::draft_dto::DraftPick;
use crate::dto::player_dto::Player;
use crate::dto::session_dto::SessionState;
use crate::dto::team_dto::{FantasyTeam, Heartbeat, RosterEntry};
use crate::dto::transfer_dto::TransferAction;

pub use sqlite::SqliteStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("stored record {key} is not valid JSON: {source}")]
    Json {
        key: String,
        source: serde_json::Error,
    },

    #[error("stored record {key} is malformed: {reason}")]
    Corrupt { key: String, reason: String },
}

/// Result of a conditional session write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written { version: u64 },
    /// The stored version was not the expected one. Re-read and reconcile.
    Conflict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickOutcome {
    Recorded,
    /// Someone in the league already owns or drafted the player.
    PlayerTaken,
    /// The pick number was filled by a competing write.
    SlotTaken,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    Claimed,
    AlreadyOwned,
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn read_session_state(&self, session_id: &str) -> Result<Option<SessionState>, StoreError>;

    /// Writes `state` only if the stored version equals
    /// `expected_prior_version`. `None` means the session must not exist yet.
    async fn write_session_state(
        &self,
        expected_prior_version: Option<u64>,
        state: &SessionState,
    ) -> Result<WriteOutcome, StoreError>;

    async fn list_active_sessions(&self) -> Result<Vec<SessionState>, StoreError>;

    /// Records the pick and the roster entry together, only if neither the
    /// player nor the pick number is taken.
    async fn append_pick(
        &self,
        league_id: &str,
        session_id: &str,
        pick: &DraftPick,
    ) -> Result<PickOutcome, StoreError>;

    /// Picks in pick-number order.
    async fn list_picks(&self, session_id: &str) -> Result<Vec<DraftPick>, StoreError>;

    async fn append_transfer_action(
        &self,
        league_id: &str,
        action: &TransferAction,
    ) -> Result<(), StoreError>;

    /// Actions in the order they were logged.
    async fn list_transfer_actions(&self, league_id: &str) -> Result<Vec<TransferAction>, StoreError>;

    async fn claim_player(
        &self,
        league_id: &str,
        player_id: &str,
        team_id: &str,
        at: DateTime<Utc>,
    ) -> Result<ClaimOutcome, StoreError>;

    /// Returns false when `team_id` did not own the player.
    async fn release_player(
        &self,
        league_id: &str,
        player_id: &str,
        team_id: &str,
    ) -> Result<bool, StoreError>;

    async fn list_roster(&self, league_id: &str) -> Result<Vec<RosterEntry>, StoreError>;

    async fn upsert_players(&self, players: &[Player]) -> Result<usize, StoreError>;

    async fn list_players(&self) -> Result<Vec<Player>, StoreError>;

    async fn find_player(&self, player_id: &str) -> Result<Option<Player>, StoreError>;

    /// Returns false when the id or the owner already has a team in the league.
    async fn create_team(&self, team: &FantasyTeam) -> Result<bool, StoreError>;

    async fn list_teams(&self, league_id: &str) -> Result<Vec<FantasyTeam>, StoreError>;

    async fn find_team_by_owner(
        &self,
        league_id: &str,
        owner: &str,
    ) -> Result<Option<FantasyTeam>, StoreError>;

    async fn record_heartbeat(
        &self,
        league_id: &str,
        team_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    async fn list_heartbeats(&self, league_id: &str) -> Result<Vec<Heartbeat>, StoreError>;
}
