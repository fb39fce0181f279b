use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Serialize, Deserialize, FromRow, Clone, PartialEq, Eq)]
pub struct FantasyTeam {
    pub league_id: String,
    pub team_id: String,
    pub name: String,
    /// Token subject allowed to act for this team.
    pub owner: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateTeam {
    pub name: String,
}

/// Ownership of a player within one league.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    pub league_id: String,
    pub player_id: String,
    pub team_id: String,
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct Heartbeat {
    pub team_id: String,
    pub seen_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct StandingRow {
    pub rank: usize,
    pub team_id: String,
    pub team_name: String,
    pub points: i64,
}
