use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// An MLS player in the shared pool.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone, PartialEq, Eq)]
pub struct Player {
    pub player_id: String,
    pub name: String,
    pub club: String,
    pub position: String,
    /// Prior-season goals; drives auto-pick.
    pub ranking: i64,
    /// Current-season goals; drives standings.
    pub goals: i64,
}

#[derive(Debug, Serialize)]
pub struct ImportSummary {
    pub imported: usize,
}
