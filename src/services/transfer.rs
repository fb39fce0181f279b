// Transfer windows: each turn is one drop followed by one pickup.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use super::presence::{PresenceTracker, TurnLengths};
use super::{resolve_order, TimeoutOutcome};
use crate::clock::Clock;
use crate::config::TurnConfig;
use crate::dto::player_dto::Player;
use crate::dto::session_dto::{SessionState, SessionView, TeamTransferProgress};
use crate::dto::transfer_dto::{TransferAction, TransferActionType};
use crate::engine::{auto_pick, rotation, transfer};
use crate::error::EngineError;
use crate::store::{ClaimOutcome, RecordStore, WriteOutcome};

#[derive(Clone)]
pub struct TransferService<S> {
    store: S,
    clock: Arc<dyn Clock>,
    presence: PresenceTracker<S>,
}

impl<S: RecordStore + Clone> TransferService<S> {
    pub fn new(store: S, clock: Arc<dyn Clock>, turns: TurnConfig) -> Self {
        let presence = PresenceTracker::new(store.clone(), turns);
        Self {
            store,
            clock,
            presence,
        }
    }

    /// Opens a transfer window. A completed window for the league is
    /// replaced; an active one is left alone.
    pub async fn start_window(
        &self,
        league_id: &str,
        order: Option<Vec<String>>,
        max_rounds: u32,
        snake: bool,
        window_end: DateTime<Utc>,
    ) -> Result<SessionState, EngineError> {
        let now = self.clock.now();
        if window_end <= now {
            return Err(EngineError::InvalidSettings(
                "window_end must be in the future".into(),
            ));
        }

        let session_id = SessionState::transfer_session_id(league_id);
        let expected = match self.store.read_session_state(&session_id).await? {
            None => None,
            Some(previous) if previous.is_completed() => Some(previous.version),
            Some(_) => return Err(EngineError::SessionExists { session_id }),
        };

        let order = resolve_order(&self.store, league_id, order).await?;
        let lengths = self.presence.turn_lengths(league_id, now).await?;
        let state = SessionState::new_transfer(league_id, order, max_rounds, snake, window_end);
        let mut active = rotation::start(&state, now, |team| lengths.for_team(team))?;

        match self.store.write_session_state(expected, &active).await? {
            WriteOutcome::Written { version } => active.version = version,
            WriteOutcome::Conflict => return Err(EngineError::SessionExists { session_id }),
        }

        info!(
            "Transfer window {} opened until {}: {} teams, up to {} rounds",
            active.session_id,
            window_end,
            active.order.len(),
            active.max_rounds
        );
        Ok(active)
    }

    pub async fn submit_drop(
        &self,
        league_id: &str,
        team_id: &str,
        player_id: &str,
    ) -> Result<TransferAction, EngineError> {
        let now = self.clock.now();
        let state = self.load_open(league_id, now).await?;
        transfer::record_drop(&state, team_id)?;
        self.refuse_if_expired(&state, team_id, now).await?;

        let owned = self
            .store
            .list_roster(league_id)
            .await?
            .iter()
            .any(|entry| entry.player_id == player_id && entry.team_id == team_id);
        if !owned {
            return Err(EngineError::NotOnRoster {
                player_id: player_id.to_string(),
                team: team_id.to_string(),
            });
        }
        let player = self.find_player(player_id).await?;

        let committed = self
            .commit(&state, |current| transfer::record_drop(current, team_id))
            .await?;

        // The drop must be logged before the player leaves the roster.
        let action = new_action(team_id, TransferActionType::Drop, &player, now, committed.round);
        self.store.append_transfer_action(league_id, &action).await?;

        if !self
            .store
            .release_player(league_id, player_id, team_id)
            .await?
        {
            warn!(
                "{} was no longer on {}'s roster when the drop was applied",
                player_id, team_id
            );
        }
        info!(
            "{} dropped {} in round {} of {}",
            team_id, player.name, committed.round, committed.session_id
        );
        Ok(action)
    }

    pub async fn submit_pickup(
        &self,
        league_id: &str,
        team_id: &str,
        player_id: &str,
    ) -> Result<TransferAction, EngineError> {
        let now = self.clock.now();
        let lengths = self.presence.turn_lengths(league_id, now).await?;
        let state = self.load_open(league_id, now).await?;
        transfer::record_pickup(&state, team_id)?;
        self.refuse_if_expired(&state, team_id, now).await?;
        let player = self.find_player(player_id).await?;

        self.claim(league_id, &player, team_id, now).await?;

        let committed = match self
            .commit(&state, |current| finish_pickup(current, team_id, now, &lengths))
            .await
        {
            Ok(committed) => committed,
            Err(e) => {
                if let Err(release) = self
                    .store
                    .release_player(league_id, player_id, team_id)
                    .await
                {
                    error!(
                        "Could not release {} from {} after a failed pickup: {}",
                        player_id, team_id, release
                    );
                }
                return Err(e);
            }
        };

        let action = new_action(team_id, TransferActionType::Pickup, &player, now, state.round);
        self.store.append_transfer_action(league_id, &action).await?;
        info!(
            "{} picked up {} in round {} of {}",
            team_id, player.name, state.round, committed.session_id
        );
        if committed.is_completed() {
            info!("Transfer window {} is complete", committed.session_id);
        }
        Ok(action)
    }

    /// The team sits out the remaining rounds of this window.
    pub async fn mark_finished(
        &self,
        league_id: &str,
        team_id: &str,
    ) -> Result<SessionView, EngineError> {
        let now = self.clock.now();
        let lengths = self.presence.turn_lengths(league_id, now).await?;
        let state = self.load_open(league_id, now).await?;
        transfer::mark_finished(&state, team_id, now, |team| lengths.for_team(team))?;

        let committed = self
            .commit(&state, |current| {
                transfer::mark_finished(current, team_id, now, |team| lengths.for_team(team))
            })
            .await?;
        info!("{} finished transferring in {}", team_id, committed.session_id);
        Ok(SessionView::at(&committed, now))
    }

    /// Closes an expired window, or resolves the current team's turn once
    /// its deadline has passed: a team that has not dropped forfeits the
    /// turn, a team that dropped gets the best available player.
    pub async fn expire_turn_if_due(&self, league_id: &str) -> Result<TimeoutOutcome, EngineError> {
        let now = self.clock.now();
        let session_id = SessionState::transfer_session_id(league_id);
        let state = self.load(&session_id).await?;

        if let Some(closed) = transfer::close_if_window_ended(&state, now) {
            info!("Transfer window {} reached its end", session_id);
            return self.write_once(&state, &closed).await.map(|written| {
                if written {
                    TimeoutOutcome::Closed
                } else {
                    TimeoutOutcome::LostRace
                }
            });
        }

        if !rotation::check_timeout(&state, now) {
            return Ok(TimeoutOutcome::NotDue);
        }
        let Some(team_id) = state.current_participant().map(str::to_owned) else {
            return Ok(TimeoutOutcome::NotDue);
        };
        let lengths = self.presence.turn_lengths(league_id, now).await?;

        if state.progress_of(&team_id) == TeamTransferProgress::DroppedAwaitingPickup {
            if let Some(outcome) = self
                .auto_pickup(&state, &team_id, now, &lengths)
                .await?
            {
                return Ok(outcome);
            }
            warn!(
                "No players left for {} in {}; passing the turn without a pickup",
                team_id, session_id
            );
        }

        let next = transfer::complete_turn(&state, &team_id, now, |team| lengths.for_team(team))?;
        if !self.write_once(&state, &next).await? {
            return Ok(TimeoutOutcome::LostRace);
        }
        info!("{} ran out of time in {} and forfeits the turn", team_id, session_id);
        Ok(TimeoutOutcome::Forfeited { team_id })
    }

    pub async fn view(&self, league_id: &str) -> Result<SessionView, EngineError> {
        let state = self
            .load(&SessionState::transfer_session_id(league_id))
            .await?;
        Ok(SessionView::at(&state, self.clock.now()))
    }

    pub async fn actions(&self, league_id: &str) -> Result<Vec<TransferAction>, EngineError> {
        Ok(self.store.list_transfer_actions(league_id).await?)
    }

    /// `None` when the pool is empty.
    async fn auto_pickup(
        &self,
        state: &SessionState,
        team_id: &str,
        now: DateTime<Utc>,
        lengths: &TurnLengths,
    ) -> Result<Option<TimeoutOutcome>, EngineError> {
        let players = self.store.list_players().await?;
        let roster = self.store.list_roster(&state.league_id).await?;
        let taken: HashSet<&str> = roster.iter().map(|entry| entry.player_id.as_str()).collect();
        let Some(best) = auto_pick::best_available(&players, &taken) else {
            return Ok(None);
        };

        match self.claim(&state.league_id, best, team_id, now).await {
            Ok(()) => {}
            Err(EngineError::AlreadyTaken { .. }) => return Ok(Some(TimeoutOutcome::LostRace)),
            Err(e) => return Err(e),
        }

        let next = finish_pickup(state, team_id, now, lengths)?;
        if !self.write_once(state, &next).await? {
            self.store
                .release_player(&state.league_id, &best.player_id, team_id)
                .await?;
            return Ok(Some(TimeoutOutcome::LostRace));
        }

        let action = new_action(team_id, TransferActionType::Pickup, best, now, state.round);
        self.store
            .append_transfer_action(&state.league_id, &action)
            .await?;
        info!(
            "{} ran out of time in {}; auto-picked up {} ({})",
            team_id, state.session_id, best.name, best.player_id
        );
        Ok(Some(TimeoutOutcome::AutoPicked {
            team_id: team_id.to_string(),
            player_id: best.player_id.clone(),
        }))
    }

    async fn claim(
        &self,
        league_id: &str,
        player: &Player,
        team_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        match self
            .store
            .claim_player(league_id, &player.player_id, team_id, now)
            .await?
        {
            ClaimOutcome::Claimed => Ok(()),
            ClaimOutcome::AlreadyOwned => Err(EngineError::AlreadyTaken {
                player_id: player.player_id.clone(),
            }),
        }
    }

    async fn find_player(&self, player_id: &str) -> Result<Player, EngineError> {
        self.store
            .find_player(player_id)
            .await?
            .ok_or_else(|| EngineError::UnknownPlayer {
                player_id: player_id.to_string(),
            })
    }

    async fn load(&self, session_id: &str) -> Result<SessionState, EngineError> {
        self.store
            .read_session_state(session_id)
            .await?
            .ok_or_else(|| EngineError::SessionNotFound {
                session_id: session_id.to_string(),
            })
    }

    /// A request that arrives after the current turn's deadline resolves the
    /// timeout instead of being applied.
    async fn refuse_if_expired(
        &self,
        state: &SessionState,
        team_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        if !rotation::check_timeout(state, now) {
            return Ok(());
        }
        let outcome = self.expire_turn_if_due(&state.league_id).await?;
        info!(
            "Late request from {} in {} refused ({:?})",
            team_id, state.session_id, outcome
        );
        Err(EngineError::TurnExpired {
            team: team_id.to_string(),
        })
    }

    /// Loads the window, closing it first if its end time has passed.
    async fn load_open(&self, league_id: &str, now: DateTime<Utc>) -> Result<SessionState, EngineError> {
        let session_id = SessionState::transfer_session_id(league_id);
        let state = self.load(&session_id).await?;
        if let Some(closed) = transfer::close_if_window_ended(&state, now) {
            if self.write_once(&state, &closed).await? {
                info!("Transfer window {} reached its end", session_id);
            }
            return Err(EngineError::SessionClosed { session_id });
        }
        Ok(state)
    }

    /// Conditional write of `next` over `state`. Returns false on conflict.
    async fn write_once(&self, state: &SessionState, next: &SessionState) -> Result<bool, EngineError> {
        match self
            .store
            .write_session_state(Some(state.version), next)
            .await?
        {
            WriteOutcome::Written { .. } => Ok(true),
            WriteOutcome::Conflict => {
                warn!("Write to {} lost to a concurrent update", state.session_id);
                Ok(false)
            }
        }
    }

    /// Applies `transition` to `state` and writes it. After a conflict the
    /// transition is re-applied once to a fresh read, which re-checks the
    /// turn and step rules against whatever the other writer did.
    async fn commit<F>(&self, state: &SessionState, transition: F) -> Result<SessionState, EngineError>
    where
        F: Fn(&SessionState) -> Result<SessionState, EngineError>,
    {
        let mut next = transition(state)?;
        match self
            .store
            .write_session_state(Some(state.version), &next)
            .await?
        {
            WriteOutcome::Written { version } => {
                next.version = version;
                return Ok(next);
            }
            WriteOutcome::Conflict => {
                warn!("{} changed underneath us; retrying on a fresh read", state.session_id);
            }
        }

        let fresh = self.load(&state.session_id).await?;
        let mut next = transition(&fresh)?;
        match self
            .store
            .write_session_state(Some(fresh.version), &next)
            .await?
        {
            WriteOutcome::Written { version } => {
                next.version = version;
                Ok(next)
            }
            WriteOutcome::Conflict => Err(EngineError::PersistenceConflict {
                session_id: state.session_id.clone(),
            }),
        }
    }
}

fn finish_pickup(
    state: &SessionState,
    team_id: &str,
    now: DateTime<Utc>,
    lengths: &TurnLengths,
) -> Result<SessionState, EngineError> {
    let picked_up = transfer::record_pickup(state, team_id)?;
    transfer::complete_turn(&picked_up, team_id, now, |team| lengths.for_team(team))
}

fn new_action(
    team_id: &str,
    action_type: TransferActionType,
    player: &Player,
    now: DateTime<Utc>,
    round: u32,
) -> TransferAction {
    TransferAction {
        fantasy_team_id: team_id.to_string(),
        action_type,
        player_id: player.player_id.clone(),
        player_name: player.name.clone(),
        action_date: now,
        goals_at_action: player.goals,
        transfer_round: round,
    }
}
