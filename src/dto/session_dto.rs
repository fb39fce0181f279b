use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::rotation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    Draft,
    Transfer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    NotStarted,
    Active,
    Completed,
}

impl SessionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionPhase::NotStarted => "not_started",
            SessionPhase::Active => "active",
            SessionPhase::Completed => "completed",
        }
    }
}

/// Where a team stands within its own transfer turn.
///
/// `NotStarted` means the team still has to drop, `DroppedAwaitingPickup`
/// that it dropped and owes a pickup, `DoneForRound` that it will not act
/// again until the next round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamTransferProgress {
    #[default]
    NotStarted,
    DroppedAwaitingPickup,
    DoneForRound,
}

impl fmt::Display for TeamTransferProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TeamTransferProgress::NotStarted => "awaiting a drop",
            TeamTransferProgress::DroppedAwaitingPickup => "awaiting a pickup",
            TeamTransferProgress::DoneForRound => "done for this round",
        };
        f.write_str(text)
    }
}

/// Persisted state of one draft or transfer window.
///
/// `version` is the optimistic-concurrency token. The store assigns it on
/// every accepted write; callers only pass it back as the expected prior
/// version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub session_id: String,
    pub league_id: String,
    pub kind: SessionKind,
    pub phase: SessionPhase,
    pub snake: bool,
    /// Base turn order. Reversed on even rounds when `snake` is set.
    pub order: Vec<String>,
    /// 1-based, never above `max_rounds`.
    pub round: u32,
    pub max_rounds: u32,
    /// Position within the effective order of `round`.
    pub turn_index: usize,
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub window_end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub progress: BTreeMap<String, TeamTransferProgress>,
    #[serde(default)]
    pub finished: BTreeSet<String>,
    #[serde(default)]
    pub version: u64,
}

impl SessionState {
    pub fn draft_session_id(league_id: &str) -> String {
        format!("{league_id}#draft")
    }

    pub fn transfer_session_id(league_id: &str) -> String {
        format!("{league_id}#transfer")
    }

    pub fn new_draft(league_id: &str, order: Vec<String>, rounds: u32, snake: bool) -> Self {
        Self::new(
            Self::draft_session_id(league_id),
            league_id,
            SessionKind::Draft,
            order,
            rounds,
            snake,
            None,
        )
    }

    pub fn new_transfer(
        league_id: &str,
        order: Vec<String>,
        max_rounds: u32,
        snake: bool,
        window_end: DateTime<Utc>,
    ) -> Self {
        Self::new(
            Self::transfer_session_id(league_id),
            league_id,
            SessionKind::Transfer,
            order,
            max_rounds,
            snake,
            Some(window_end),
        )
    }

    fn new(
        session_id: String,
        league_id: &str,
        kind: SessionKind,
        order: Vec<String>,
        max_rounds: u32,
        snake: bool,
        window_end: Option<DateTime<Utc>>,
    ) -> Self {
        SessionState {
            session_id,
            league_id: league_id.to_string(),
            kind,
            phase: SessionPhase::NotStarted,
            snake,
            order,
            round: 1,
            max_rounds,
            turn_index: 0,
            deadline: None,
            window_end,
            progress: BTreeMap::new(),
            finished: BTreeSet::new(),
            version: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.phase == SessionPhase::Active
    }

    pub fn is_completed(&self) -> bool {
        self.phase == SessionPhase::Completed
    }

    /// The team whose turn it is, or `None` outside the active phase.
    pub fn current_participant(&self) -> Option<&str> {
        if !self.is_active() {
            return None;
        }
        rotation::participant_at(&self.order, self.round, self.snake, self.turn_index)
    }

    pub fn progress_of(&self, team_id: &str) -> TeamTransferProgress {
        self.progress.get(team_id).copied().unwrap_or_default()
    }
}

/// Read-only projection returned to clients polling a session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: String,
    pub kind: SessionKind,
    pub phase: SessionPhase,
    pub round: u32,
    pub max_rounds: u32,
    pub current_participant: Option<String>,
    pub deadline: Option<DateTime<Utc>>,
    pub seconds_remaining: Option<i64>,
    pub round_order: Vec<String>,
    pub progress: BTreeMap<String, TeamTransferProgress>,
    pub finished: BTreeSet<String>,
    pub window_end: Option<DateTime<Utc>>,
    pub picks_made: Option<usize>,
    pub version: u64,
}

impl SessionView {
    pub fn at(state: &SessionState, now: DateTime<Utc>) -> Self {
        SessionView {
            session_id: state.session_id.clone(),
            kind: state.kind,
            phase: state.phase,
            round: state.round,
            max_rounds: state.max_rounds,
            current_participant: state.current_participant().map(str::to_owned),
            deadline: state.deadline,
            seconds_remaining: rotation::remaining(state, now).map(|left| left.num_seconds()),
            round_order: rotation::effective_order(&state.order, state.round, state.snake)
                .into_iter()
                .map(str::to_owned)
                .collect(),
            progress: state.progress.clone(),
            finished: state.finished.clone(),
            window_end: state.window_end,
            picks_made: None,
            version: state.version,
        }
    }

    pub fn with_picks_made(mut self, picks: usize) -> Self {
        self.picks_made = Some(picks);
        self
    }
}
