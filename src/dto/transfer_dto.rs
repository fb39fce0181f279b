use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferActionType {
    Drop,
    Pickup,
}

impl TransferActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferActionType::Drop => "drop",
            TransferActionType::Pickup => "pickup",
        }
    }
}

impl fmt::Display for TransferActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransferActionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "drop" => Ok(TransferActionType::Drop),
            "pickup" => Ok(TransferActionType::Pickup),
            other => Err(format!("unknown transfer action `{other}`")),
        }
    }
}

/// Audit log entry for a drop or a pickup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferAction {
    pub fantasy_team_id: String,
    pub action_type: TransferActionType,
    pub player_id: String,
    pub player_name: String,
    pub action_date: DateTime<Utc>,
    pub goals_at_action: i64,
    pub transfer_round: u32,
}

#[derive(Debug, Deserialize)]
pub struct StartTransferRequest {
    pub transfer_max_rounds: u32,
    pub window_end: DateTime<Utc>,
    #[serde(default)]
    pub snake: bool,
    #[serde(default)]
    pub order: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    pub player_id: String,
}
