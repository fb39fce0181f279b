// Drop-then-pickup sequencing inside a transfer turn, finished teams, and
// the window end.

use chrono::{DateTime, Duration, Utc};

use super::rotation;
use crate::dto::session_dto::{SessionKind, SessionPhase, SessionState, TeamTransferProgress};
use crate::dto::transfer_dto::TransferActionType;
use crate::error::EngineError;

fn step_out_of_order(
    team: &str,
    attempted: TransferActionType,
    progress: TeamTransferProgress,
) -> EngineError {
    EngineError::StepOutOfOrder {
        team: team.to_string(),
        attempted,
        progress,
    }
}

pub fn record_drop(state: &SessionState, team: &str) -> Result<SessionState, EngineError> {
    rotation::ensure_turn(state, team)?;
    let progress = state.progress_of(team);
    if progress != TeamTransferProgress::NotStarted {
        return Err(step_out_of_order(team, TransferActionType::Drop, progress));
    }
    let mut next = state.clone();
    next.progress
        .insert(team.to_string(), TeamTransferProgress::DroppedAwaitingPickup);
    Ok(next)
}

/// Accepts the pickup half of a turn. The caller still has to hand the turn
/// on with [`complete_turn`].
pub fn record_pickup(state: &SessionState, team: &str) -> Result<SessionState, EngineError> {
    rotation::ensure_turn(state, team)?;
    let progress = state.progress_of(team);
    if progress != TeamTransferProgress::DroppedAwaitingPickup {
        return Err(step_out_of_order(team, TransferActionType::Pickup, progress));
    }
    let mut next = state.clone();
    next.progress
        .insert(team.to_string(), TeamTransferProgress::DoneForRound);
    Ok(next)
}

/// Ends `team`'s turn and moves on to the next team that is still
/// transferring.
pub fn complete_turn<F>(
    state: &SessionState,
    team: &str,
    now: DateTime<Utc>,
    turn_length: F,
) -> Result<SessionState, EngineError>
where
    F: Fn(&str) -> Duration,
{
    let next = rotation::advance_turn(state, team, now, &turn_length)?;
    skip_finished(next, now, &turn_length)
}

/// Advances past any teams that already declared themselves finished.
pub fn skip_finished<F>(
    mut state: SessionState,
    now: DateTime<Utc>,
    turn_length: F,
) -> Result<SessionState, EngineError>
where
    F: Fn(&str) -> Duration,
{
    if state.order.iter().all(|team| state.finished.contains(team)) {
        return Ok(close(state));
    }
    while let Some(current) = state.current_participant().map(str::to_owned) {
        if !state.finished.contains(&current) {
            break;
        }
        state = rotation::advance_turn(&state, &current, now, &turn_length)?;
    }
    Ok(state)
}

/// Takes `team` out of the rotation for the rest of the window.
pub fn mark_finished<F>(
    state: &SessionState,
    team: &str,
    now: DateTime<Utc>,
    turn_length: F,
) -> Result<SessionState, EngineError>
where
    F: Fn(&str) -> Duration,
{
    if state.is_completed() {
        return Err(EngineError::SessionClosed {
            session_id: state.session_id.clone(),
        });
    }
    if !state.order.iter().any(|t| t == team) {
        return Err(EngineError::UnknownTeam {
            team: team.to_string(),
        });
    }
    if state.progress_of(team) == TeamTransferProgress::DroppedAwaitingPickup {
        return Err(EngineError::PickupOwed {
            team: team.to_string(),
        });
    }

    let mut next = state.clone();
    next.finished.insert(team.to_string());
    next.progress.remove(team);
    if !next.is_active() {
        return Ok(next);
    }
    if next.current_participant() == Some(team) {
        next = rotation::advance_turn(&next, team, now, &turn_length)?;
    }
    skip_finished(next, now, turn_length)
}

/// Completes the window once its end time has passed.
pub fn close_if_window_ended(state: &SessionState, now: DateTime<Utc>) -> Option<SessionState> {
    if state.kind != SessionKind::Transfer || state.is_completed() {
        return None;
    }
    match state.window_end {
        Some(end) if now >= end => Some(close(state.clone())),
        _ => None,
    }
}

fn close(mut state: SessionState) -> SessionState {
    state.phase = SessionPhase::Completed;
    state.deadline = None;
    state.progress.clear();
    state
}
