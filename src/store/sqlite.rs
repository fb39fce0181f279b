// SQLite-backed record store. Rows are turned into domain values here and
// nowhere else.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use tracing::{debug, info};

use super::{ClaimOutcome, PickOutcome, RecordStore, StoreError, WriteOutcome};
use crate::dto::draft_dto::DraftPick;
use crate::dto::player_dto::Player;
use crate::dto::session_dto::{SessionPhase, SessionState};
use crate::dto::team_dto::{FantasyTeam, Heartbeat, RosterEntry};
use crate::dto::transfer_dto::{TransferAction, TransferActionType};

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS sessions (
        session_id TEXT PRIMARY KEY,
        league_id  TEXT NOT NULL,
        phase      TEXT NOT NULL,
        body       TEXT NOT NULL,
        version    INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_sessions_phase ON sessions(phase)",
    "CREATE TABLE IF NOT EXISTS draft_picks (
        league_id       TEXT NOT NULL,
        session_id      TEXT NOT NULL,
        pick_number     INTEGER NOT NULL,
        player_id       TEXT NOT NULL,
        team_drafted_by TEXT NOT NULL,
        draft_time_ms   INTEGER NOT NULL,
        UNIQUE (league_id, player_id),
        UNIQUE (session_id, pick_number)
    )",
    "CREATE TABLE IF NOT EXISTS rosters (
        league_id   TEXT NOT NULL,
        player_id   TEXT NOT NULL,
        team_id     TEXT NOT NULL,
        acquired_ms INTEGER NOT NULL,
        PRIMARY KEY (league_id, player_id)
    )",
    "CREATE TABLE IF NOT EXISTS transfer_actions (
        id              INTEGER PRIMARY KEY AUTOINCREMENT,
        league_id       TEXT NOT NULL,
        fantasy_team_id TEXT NOT NULL,
        action_type     TEXT NOT NULL,
        player_id       TEXT NOT NULL,
        player_name     TEXT NOT NULL,
        action_ms       INTEGER NOT NULL,
        goals_at_action INTEGER NOT NULL,
        transfer_round  INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS players (
        player_id TEXT PRIMARY KEY,
        name      TEXT NOT NULL,
        club      TEXT NOT NULL DEFAULT '',
        position  TEXT NOT NULL DEFAULT '',
        ranking   INTEGER NOT NULL DEFAULT 0,
        goals     INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE TABLE IF NOT EXISTS teams (
        league_id TEXT NOT NULL,
        team_id   TEXT NOT NULL,
        name      TEXT NOT NULL,
        owner     TEXT NOT NULL,
        PRIMARY KEY (league_id, team_id),
        UNIQUE (league_id, owner)
    )",
    "CREATE TABLE IF NOT EXISTS heartbeats (
        league_id TEXT NOT NULL,
        team_id   TEXT NOT NULL,
        seen_ms   INTEGER NOT NULL,
        PRIMARY KEY (league_id, team_id)
    )",
];

#[derive(FromRow)]
struct SessionRow {
    session_id: String,
    body: String,
    version: i64,
}

#[derive(FromRow)]
struct PickRow {
    pick_number: i64,
    player_id: String,
    team_drafted_by: String,
    draft_time_ms: i64,
}

#[derive(FromRow)]
struct TransferRow {
    id: i64,
    fantasy_team_id: String,
    action_type: String,
    player_id: String,
    player_name: String,
    action_ms: i64,
    goals_at_action: i64,
    transfer_round: i64,
}

#[derive(FromRow)]
struct HeartbeatRow {
    team_id: String,
    seen_ms: i64,
}

fn timestamp(key: &str, ms: i64) -> Result<DateTime<Utc>, StoreError> {
    DateTime::from_timestamp_millis(ms).ok_or_else(|| StoreError::Corrupt {
        key: key.to_string(),
        reason: format!("timestamp {ms} is out of range"),
    })
}

impl SessionRow {
    fn into_state(self) -> Result<SessionState, StoreError> {
        let mut state: SessionState =
            serde_json::from_str(&self.body).map_err(|source| StoreError::Json {
                key: self.session_id.clone(),
                source,
            })?;
        state.version = self.version as u64;
        Ok(state)
    }
}

impl PickRow {
    fn into_pick(self) -> Result<DraftPick, StoreError> {
        let key = format!("pick {}", self.pick_number);
        Ok(DraftPick {
            pick_number: self.pick_number as u32,
            draft_time: timestamp(&key, self.draft_time_ms)?,
            player_id: self.player_id,
            team_drafted_by: self.team_drafted_by,
        })
    }
}

impl TransferRow {
    fn into_action(self) -> Result<TransferAction, StoreError> {
        let key = format!("transfer action {}", self.id);
        let action_type = TransferActionType::from_str(&self.action_type).map_err(|reason| {
            StoreError::Corrupt {
                key: key.clone(),
                reason,
            }
        })?;
        Ok(TransferAction {
            fantasy_team_id: self.fantasy_team_id,
            action_type,
            player_id: self.player_id,
            player_name: self.player_name,
            action_date: timestamp(&key, self.action_ms)?,
            goals_at_action: self.goals_at_action,
            transfer_round: self.transfer_round as u32,
        })
    }
}

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the database at `url` and make sure every table
    /// exists.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;
        let store = Self { pool };
        store.migrate().await?;
        info!("Record store ready at {}", url);
        Ok(store)
    }

    /// A private in-memory database. The single connection is never
    /// recycled, since closing it would discard the data.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        debug!("Schema is up to date.");
        Ok(())
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn read_session_state(&self, session_id: &str) -> Result<Option<SessionState>, StoreError> {
        let row = sqlx::query_as::<_, SessionRow>(
            "SELECT session_id, body, version FROM sessions WHERE session_id = ?",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(SessionRow::into_state).transpose()
    }

    async fn write_session_state(
        &self,
        expected_prior_version: Option<u64>,
        state: &SessionState,
    ) -> Result<WriteOutcome, StoreError> {
        let version = expected_prior_version.map_or(1, |v| v + 1);
        let mut stored = state.clone();
        stored.version = version;
        let body = serde_json::to_string(&stored).map_err(|source| StoreError::Json {
            key: state.session_id.clone(),
            source,
        })?;

        let result = match expected_prior_version {
            None => {
                sqlx::query(
                    r#"
                    INSERT INTO sessions (session_id, league_id, phase, body, version)
                    VALUES (?, ?, ?, ?, ?)
                    ON CONFLICT(session_id) DO NOTHING
                    "#,
                )
                .bind(&state.session_id)
                .bind(&state.league_id)
                .bind(state.phase.as_str())
                .bind(&body)
                .bind(version as i64)
                .execute(&self.pool)
                .await?
            }
            Some(expected) => {
                sqlx::query(
                    r#"
                    UPDATE sessions
                    SET phase = ?, body = ?, version = ?
                    WHERE session_id = ? AND version = ?
                    "#,
                )
                .bind(state.phase.as_str())
                .bind(&body)
                .bind(version as i64)
                .bind(&state.session_id)
                .bind(expected as i64)
                .execute(&self.pool)
                .await?
            }
        };

        if result.rows_affected() == 0 {
            debug!(
                "Conditional write to {} rejected (expected version {:?})",
                state.session_id, expected_prior_version
            );
            return Ok(WriteOutcome::Conflict);
        }
        Ok(WriteOutcome::Written { version })
    }

    async fn list_active_sessions(&self) -> Result<Vec<SessionState>, StoreError> {
        let rows = sqlx::query_as::<_, SessionRow>(
            "SELECT session_id, body, version FROM sessions WHERE phase = ? ORDER BY session_id",
        )
        .bind(SessionPhase::Active.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(SessionRow::into_state).collect()
    }

    async fn append_pick(
        &self,
        league_id: &str,
        session_id: &str,
        pick: &DraftPick,
    ) -> Result<PickOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        let owned = sqlx::query(
            r#"
            INSERT OR IGNORE INTO rosters (league_id, player_id, team_id, acquired_ms)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(league_id)
        .bind(&pick.player_id)
        .bind(&pick.team_drafted_by)
        .bind(pick.draft_time.timestamp_millis())
        .execute(&mut *tx)
        .await?;

        if owned.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(PickOutcome::PlayerTaken);
        }

        let inserted = sqlx::query(
            r#"
            INSERT OR IGNORE INTO draft_picks
                (league_id, session_id, pick_number, player_id, team_drafted_by, draft_time_ms)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(league_id)
        .bind(session_id)
        .bind(pick.pick_number as i64)
        .bind(&pick.player_id)
        .bind(&pick.team_drafted_by)
        .bind(pick.draft_time.timestamp_millis())
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            let drafted_before = sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM draft_picks WHERE league_id = ? AND player_id = ?",
            )
            .bind(league_id)
            .bind(&pick.player_id)
            .fetch_one(&mut *tx)
            .await?;
            tx.rollback().await?;
            return Ok(if drafted_before > 0 {
                PickOutcome::PlayerTaken
            } else {
                PickOutcome::SlotTaken
            });
        }

        tx.commit().await?;
        Ok(PickOutcome::Recorded)
    }

    async fn list_picks(&self, session_id: &str) -> Result<Vec<DraftPick>, StoreError> {
        let rows = sqlx::query_as::<_, PickRow>(
            r#"
            SELECT pick_number, player_id, team_drafted_by, draft_time_ms
            FROM draft_picks
            WHERE session_id = ?
            ORDER BY pick_number
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(PickRow::into_pick).collect()
    }

    async fn append_transfer_action(
        &self,
        league_id: &str,
        action: &TransferAction,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO transfer_actions (
                league_id, fantasy_team_id, action_type, player_id,
                player_name, action_ms, goals_at_action, transfer_round
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(league_id)
        .bind(&action.fantasy_team_id)
        .bind(action.action_type.as_str())
        .bind(&action.player_id)
        .bind(&action.player_name)
        .bind(action.action_date.timestamp_millis())
        .bind(action.goals_at_action)
        .bind(action.transfer_round as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_transfer_actions(&self, league_id: &str) -> Result<Vec<TransferAction>, StoreError> {
        let rows = sqlx::query_as::<_, TransferRow>(
            r#"
            SELECT id, fantasy_team_id, action_type, player_id, player_name,
                   action_ms, goals_at_action, transfer_round
            FROM transfer_actions
            WHERE league_id = ?
            ORDER BY id
            "#,
        )
        .bind(league_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TransferRow::into_action).collect()
    }

    async fn claim_player(
        &self,
        league_id: &str,
        player_id: &str,
        team_id: &str,
        at: DateTime<Utc>,
    ) -> Result<ClaimOutcome, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO rosters (league_id, player_id, team_id, acquired_ms)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(league_id)
        .bind(player_id)
        .bind(team_id)
        .bind(at.timestamp_millis())
        .execute(&self.pool)
        .await?;

        Ok(if result.rows_affected() == 1 {
            ClaimOutcome::Claimed
        } else {
            ClaimOutcome::AlreadyOwned
        })
    }

    async fn release_player(
        &self,
        league_id: &str,
        player_id: &str,
        team_id: &str,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "DELETE FROM rosters WHERE league_id = ? AND player_id = ? AND team_id = ?",
        )
        .bind(league_id)
        .bind(player_id)
        .bind(team_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn list_roster(&self, league_id: &str) -> Result<Vec<RosterEntry>, StoreError> {
        let roster = sqlx::query_as::<_, RosterEntry>(
            "SELECT league_id, player_id, team_id FROM rosters WHERE league_id = ? ORDER BY player_id",
        )
        .bind(league_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(roster)
    }

    async fn upsert_players(&self, players: &[Player]) -> Result<usize, StoreError> {
        let mut tx = self.pool.begin().await?;
        for player in players {
            sqlx::query(
                r#"
                INSERT INTO players (player_id, name, club, position, ranking, goals)
                VALUES (?, ?, ?, ?, ?, ?)
                ON CONFLICT(player_id) DO UPDATE SET
                    name = excluded.name,
                    club = excluded.club,
                    position = excluded.position,
                    ranking = excluded.ranking,
                    goals = excluded.goals
                "#,
            )
            .bind(&player.player_id)
            .bind(&player.name)
            .bind(&player.club)
            .bind(&player.position)
            .bind(player.ranking)
            .bind(player.goals)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(players.len())
    }

    async fn list_players(&self) -> Result<Vec<Player>, StoreError> {
        let players = sqlx::query_as::<_, Player>(
            "SELECT player_id, name, club, position, ranking, goals FROM players ORDER BY player_id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(players)
    }

    async fn find_player(&self, player_id: &str) -> Result<Option<Player>, StoreError> {
        let player = sqlx::query_as::<_, Player>(
            "SELECT player_id, name, club, position, ranking, goals FROM players WHERE player_id = ?",
        )
        .bind(player_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(player)
    }

    async fn create_team(&self, team: &FantasyTeam) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO teams (league_id, team_id, name, owner) VALUES (?, ?, ?, ?)",
        )
        .bind(&team.league_id)
        .bind(&team.team_id)
        .bind(&team.name)
        .bind(&team.owner)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn list_teams(&self, league_id: &str) -> Result<Vec<FantasyTeam>, StoreError> {
        let teams = sqlx::query_as::<_, FantasyTeam>(
            "SELECT league_id, team_id, name, owner FROM teams WHERE league_id = ? ORDER BY name",
        )
        .bind(league_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(teams)
    }

    async fn find_team_by_owner(
        &self,
        league_id: &str,
        owner: &str,
    ) -> Result<Option<FantasyTeam>, StoreError> {
        let team = sqlx::query_as::<_, FantasyTeam>(
            "SELECT league_id, team_id, name, owner FROM teams WHERE league_id = ? AND owner = ?",
        )
        .bind(league_id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?;
        Ok(team)
    }

    async fn record_heartbeat(
        &self,
        league_id: &str,
        team_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO heartbeats (league_id, team_id, seen_ms)
            VALUES (?, ?, ?)
            ON CONFLICT(league_id, team_id) DO UPDATE SET seen_ms = excluded.seen_ms
            "#,
        )
        .bind(league_id)
        .bind(team_id)
        .bind(at.timestamp_millis())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_heartbeats(&self, league_id: &str) -> Result<Vec<Heartbeat>, StoreError> {
        let rows = sqlx::query_as::<_, HeartbeatRow>(
            "SELECT team_id, seen_ms FROM heartbeats WHERE league_id = ?",
        )
        .bind(league_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(Heartbeat {
                    seen_at: timestamp(&format!("heartbeat {}", row.team_id), row.seen_ms)?,
                    team_id: row.team_id,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn pick(n: u32, player: &str, team: &str) -> DraftPick {
        DraftPick {
            pick_number: n,
            player_id: player.into(),
            team_drafted_by: team.into(),
            draft_time: Utc.with_ymd_and_hms(2026, 2, 20, 19, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn session_writes_are_conditional_on_version() {
        let store = SqliteStore::in_memory().await.unwrap();
        let state = SessionState::new_draft("mls", vec!["a".into(), "b".into()], 3, true);

        assert_eq!(
            store.write_session_state(None, &state).await.unwrap(),
            WriteOutcome::Written { version: 1 }
        );
        assert_eq!(
            store.write_session_state(None, &state).await.unwrap(),
            WriteOutcome::Conflict
        );
        assert_eq!(
            store.write_session_state(Some(1), &state).await.unwrap(),
            WriteOutcome::Written { version: 2 }
        );
        assert_eq!(
            store.write_session_state(Some(1), &state).await.unwrap(),
            WriteOutcome::Conflict
        );

        let read = store.read_session_state(&state.session_id).await.unwrap().unwrap();
        assert_eq!(read.version, 2);
        assert_eq!(read.order, state.order);
    }

    #[tokio::test]
    async fn a_player_can_only_be_picked_once_per_league() {
        let store = SqliteStore::in_memory().await.unwrap();
        assert_eq!(
            store.append_pick("mls", "mls#draft", &pick(1, "p1", "a")).await.unwrap(),
            PickOutcome::Recorded
        );
        assert_eq!(
            store.append_pick("mls", "mls#draft", &pick(2, "p1", "b")).await.unwrap(),
            PickOutcome::PlayerTaken
        );
        assert_eq!(
            store.append_pick("mls", "mls#draft", &pick(1, "p2", "b")).await.unwrap(),
            PickOutcome::SlotTaken
        );
        // a slot conflict must not leave the player owned
        assert_eq!(
            store
                .claim_player("mls", "p2", "b", Utc::now())
                .await
                .unwrap(),
            ClaimOutcome::Claimed
        );
        assert_eq!(
            store.append_pick("other", "other#draft", &pick(1, "p1", "z")).await.unwrap(),
            PickOutcome::Recorded
        );
        assert_eq!(store.list_picks("mls#draft").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn release_only_succeeds_for_the_owner() {
        let store = SqliteStore::in_memory().await.unwrap();
        let at = Utc.with_ymd_and_hms(2026, 7, 2, 9, 0, 0).unwrap();
        assert_eq!(store.claim_player("mls", "p9", "a", at).await.unwrap(), ClaimOutcome::Claimed);
        assert_eq!(
            store.claim_player("mls", "p9", "b", at).await.unwrap(),
            ClaimOutcome::AlreadyOwned
        );
        assert!(!store.release_player("mls", "p9", "b").await.unwrap());
        assert!(store.release_player("mls", "p9", "a").await.unwrap());
        assert!(store.list_roster("mls").await.unwrap().is_empty());
    }
}
