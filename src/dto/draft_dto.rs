use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One recorded pick. Never mutated once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftPick {
    /// 1-based position in the draft; unique per session.
    pub pick_number: u32,
    pub player_id: String,
    pub team_drafted_by: String,
    pub draft_time: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct PickRequest {
    pub player_id: String,
}

#[derive(Debug, Deserialize)]
pub struct StartDraftRequest {
    pub number_of_rounds: u32,
    #[serde(default = "default_snake")]
    pub snake: bool,
    /// Explicit turn order. The league's teams are shuffled when omitted.
    #[serde(default)]
    pub order: Option<Vec<String>>,
}

fn default_snake() -> bool {
    true
}
