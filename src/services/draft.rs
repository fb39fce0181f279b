// Draft orchestration: commissioner start, picks, and auto-picks when a
// turn runs out. The pick count in the store is the source of truth for
// whose turn it is.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::presence::{PresenceTracker, TurnLengths};
use super::{resolve_order, TimeoutOutcome};
use crate::clock::Clock;
use crate::config::TurnConfig;
use crate::dto::draft_dto::DraftPick;
use crate::dto::player_dto::Player;
use crate::dto::session_dto::{SessionPhase, SessionState, SessionView};
use crate::engine::{auto_pick, rotation};
use crate::error::EngineError;
use crate::store::{PickOutcome, RecordStore, WriteOutcome};

#[derive(Clone)]
pub struct DraftService<S> {
    store: S,
    clock: Arc<dyn Clock>,
    presence: PresenceTracker<S>,
}

impl<S: RecordStore + Clone> DraftService<S> {
    pub fn new(store: S, clock: Arc<dyn Clock>, turns: TurnConfig) -> Self {
        let presence = PresenceTracker::new(store.clone(), turns);
        Self {
            store,
            clock,
            presence,
        }
    }

    pub async fn start_draft(
        &self,
        league_id: &str,
        order: Option<Vec<String>>,
        rounds: u32,
        snake: bool,
    ) -> Result<SessionState, EngineError> {
        let session_id = SessionState::draft_session_id(league_id);
        if self.store.read_session_state(&session_id).await?.is_some() {
            return Err(EngineError::SessionExists { session_id });
        }

        let order = resolve_order(&self.store, league_id, order).await?;
        let now = self.clock.now();
        let lengths = self.presence.turn_lengths(league_id, now).await?;
        let state = SessionState::new_draft(league_id, order, rounds, snake);
        let mut active = rotation::start(&state, now, |team| lengths.for_team(team))?;

        match self.store.write_session_state(None, &active).await? {
            WriteOutcome::Written { version } => active.version = version,
            WriteOutcome::Conflict => return Err(EngineError::SessionExists { session_id }),
        }

        info!(
            "Draft {} started: {} teams, {} rounds, snake={}",
            active.session_id,
            active.order.len(),
            active.max_rounds,
            active.snake
        );
        Ok(active)
    }

    /// Records `player_id` for `team_id` if it is that team's turn.
    pub async fn submit_pick(
        &self,
        league_id: &str,
        team_id: &str,
        player_id: &str,
    ) -> Result<DraftPick, EngineError> {
        let now = self.clock.now();
        let lengths = self.presence.turn_lengths(league_id, now).await?;
        let (state, pick_count) = self.load_synced(league_id, now, &lengths).await?;

        rotation::ensure_turn(&state, team_id)?;
        if rotation::check_timeout(&state, now) {
            let outcome = self.expire_turn_if_due(league_id).await?;
            info!(
                "Late pick of {} by {} in {} refused ({:?})",
                player_id, team_id, state.session_id, outcome
            );
            return Err(EngineError::TurnExpired {
                team: team_id.to_string(),
            });
        }
        if self.store.find_player(player_id).await?.is_none() {
            return Err(EngineError::UnknownPlayer {
                player_id: player_id.to_string(),
            });
        }

        self.commit_pick(&state, pick_count, team_id, player_id, now, &lengths)
            .await
    }

    /// Auto-picks for the current team once its deadline has passed.
    pub async fn expire_turn_if_due(&self, league_id: &str) -> Result<TimeoutOutcome, EngineError> {
        let now = self.clock.now();
        let lengths = self.presence.turn_lengths(league_id, now).await?;
        let (state, pick_count) = self.load_synced(league_id, now, &lengths).await?;

        if !rotation::check_timeout(&state, now) {
            return Ok(TimeoutOutcome::NotDue);
        }
        let Some(team_id) = state.current_participant().map(str::to_owned) else {
            return Ok(TimeoutOutcome::NotDue);
        };

        let players = self.store.list_players().await?;
        let roster = self.store.list_roster(league_id).await?;
        let taken: HashSet<&str> = roster.iter().map(|entry| entry.player_id.as_str()).collect();

        let Some(best) = auto_pick::best_available(&players, &taken) else {
            warn!(
                "Player pool exhausted during {}; closing the draft",
                state.session_id
            );
            let mut closed = state.clone();
            closed.phase = SessionPhase::Completed;
            closed.deadline = None;
            return match self
                .store
                .write_session_state(Some(state.version), &closed)
                .await?
            {
                WriteOutcome::Written { .. } => Ok(TimeoutOutcome::Closed),
                WriteOutcome::Conflict => Ok(TimeoutOutcome::LostRace),
            };
        };

        info!(
            "Turn for {} in {} expired; auto-picking {} ({})",
            team_id, state.session_id, best.name, best.player_id
        );
        match self
            .commit_pick(&state, pick_count, &team_id, &best.player_id, now, &lengths)
            .await
        {
            Ok(pick) => Ok(TimeoutOutcome::AutoPicked {
                team_id,
                player_id: pick.player_id,
            }),
            Err(e @ (EngineError::AlreadyTaken { .. } | EngineError::PersistenceConflict { .. })) => {
                debug!("Auto-pick for {} lost a race: {}", team_id, e);
                Ok(TimeoutOutcome::LostRace)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn view(&self, league_id: &str) -> Result<SessionView, EngineError> {
        let session_id = SessionState::draft_session_id(league_id);
        let state = self.load(&session_id).await?;
        let picks = self.store.list_picks(&session_id).await?.len();
        Ok(SessionView::at(&state, self.clock.now()).with_picks_made(picks))
    }

    pub async fn drafted(&self, league_id: &str) -> Result<Vec<DraftPick>, EngineError> {
        let session_id = SessionState::draft_session_id(league_id);
        Ok(self.store.list_picks(&session_id).await?)
    }

    /// Unowned players in auto-pick order.
    pub async fn available(&self, league_id: &str) -> Result<Vec<Player>, EngineError> {
        let players = self.store.list_players().await?;
        let roster = self.store.list_roster(league_id).await?;
        let taken: HashSet<&str> = roster.iter().map(|entry| entry.player_id.as_str()).collect();
        Ok(auto_pick::ranked_available(&players, &taken))
    }

    async fn load(&self, session_id: &str) -> Result<SessionState, EngineError> {
        self.store
            .read_session_state(session_id)
            .await?
            .ok_or_else(|| EngineError::SessionNotFound {
                session_id: session_id.to_string(),
            })
    }

    /// Reads the draft and repairs its turn pointer from the pick count if
    /// an earlier writer left them out of step.
    async fn load_synced(
        &self,
        league_id: &str,
        now: DateTime<Utc>,
        lengths: &TurnLengths,
    ) -> Result<(SessionState, usize), EngineError> {
        let session_id = SessionState::draft_session_id(league_id);
        let state = self.load(&session_id).await?;
        let pick_count = self.store.list_picks(&session_id).await?.len();

        let Some(mut fixed) =
            rotation::reconcile_with_pick_count(&state, pick_count, now, |team| lengths.for_team(team))
        else {
            return Ok((state, pick_count));
        };

        warn!(
            "Draft {} was at round {} turn {} but {} picks are recorded; reconciling",
            session_id, state.round, state.turn_index, pick_count
        );
        match self
            .store
            .write_session_state(Some(state.version), &fixed)
            .await?
        {
            WriteOutcome::Written { version } => {
                fixed.version = version;
                Ok((fixed, pick_count))
            }
            WriteOutcome::Conflict => Err(EngineError::PersistenceConflict { session_id }),
        }
    }

    async fn commit_pick(
        &self,
        state: &SessionState,
        pick_count: usize,
        team_id: &str,
        player_id: &str,
        now: DateTime<Utc>,
        lengths: &TurnLengths,
    ) -> Result<DraftPick, EngineError> {
        let next = rotation::advance_turn(state, team_id, now, |team| lengths.for_team(team))?;
        let position = rotation::position_for_pick_count(pick_count, state.order.len());
        let pick = DraftPick {
            pick_number: position.pick_number,
            player_id: player_id.to_string(),
            team_drafted_by: team_id.to_string(),
            draft_time: now,
        };

        match self
            .store
            .append_pick(&state.league_id, &state.session_id, &pick)
            .await?
        {
            PickOutcome::Recorded => {}
            PickOutcome::PlayerTaken => {
                return Err(EngineError::AlreadyTaken {
                    player_id: player_id.to_string(),
                })
            }
            PickOutcome::SlotTaken => {
                return Err(EngineError::PersistenceConflict {
                    session_id: state.session_id.clone(),
                })
            }
        }

        info!(
            "Pick {} in {}: {} took {}",
            pick.pick_number, state.session_id, team_id, player_id
        );

        match self
            .store
            .write_session_state(Some(state.version), &next)
            .await?
        {
            WriteOutcome::Written { .. } => {
                if next.is_completed() {
                    info!("Draft {} is complete", state.session_id);
                }
            }
            WriteOutcome::Conflict => {
                // The pick itself is durable; only the turn pointer is stale.
                warn!(
                    "Draft {} changed while recording pick {}; reconciling from the pick count",
                    state.session_id, pick.pick_number
                );
                if let Err(e) = self.load_synced(&state.league_id, now, lengths).await {
                    warn!("Reconciliation of {} deferred to the next poll: {}", state.session_id, e);
                }
            }
        }

        Ok(pick)
    }
}
