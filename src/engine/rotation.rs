// Turn rotation shared by drafts and transfer windows: effective order per
// round, turn advancement, deadlines, and pick-count reconciliation.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};

use crate::dto::session_dto::{SessionKind, SessionPhase, SessionState, TeamTransferProgress};
use crate::error::EngineError;

fn reversed(round: u32, snake: bool) -> bool {
    snake && round % 2 == 0
}

/// The order teams pick in for `round`. Snake sessions reverse the base
/// order on even rounds.
pub fn effective_order(order: &[String], round: u32, snake: bool) -> Vec<&str> {
    let mut effective: Vec<&str> = order.iter().map(String::as_str).collect();
    if reversed(round, snake) {
        effective.reverse();
    }
    effective
}

/// Same as `effective_order(..)[index]` without building the vector.
pub fn participant_at(order: &[String], round: u32, snake: bool, index: usize) -> Option<&str> {
    if index >= order.len() {
        return None;
    }
    let slot = if reversed(round, snake) {
        order.len() - 1 - index
    } else {
        index
    };
    order.get(slot).map(String::as_str)
}

pub fn validate_order(order: &[String]) -> Result<(), EngineError> {
    if order.is_empty() {
        return Err(EngineError::InvalidOrder("turn order is empty".into()));
    }
    let mut seen = HashSet::new();
    for team in order {
        if !seen.insert(team.as_str()) {
            return Err(EngineError::InvalidOrder(format!(
                "{team} appears more than once"
            )));
        }
    }
    Ok(())
}

fn ensure_active(state: &SessionState) -> Result<(), EngineError> {
    match state.phase {
        SessionPhase::Active => Ok(()),
        SessionPhase::Completed => Err(EngineError::SessionClosed {
            session_id: state.session_id.clone(),
        }),
        SessionPhase::NotStarted => Err(EngineError::NotStarted {
            session_id: state.session_id.clone(),
        }),
    }
}

/// Fails unless the session is active and `team` holds the current turn.
pub fn ensure_turn(state: &SessionState, team: &str) -> Result<(), EngineError> {
    ensure_active(state)?;
    match state.current_participant() {
        Some(current) if current == team => Ok(()),
        current => Err(EngineError::InvalidTurn {
            team: team.to_string(),
            current: current.map(str::to_owned),
        }),
    }
}

/// Moves a session from `NotStarted` to round 1, first turn.
pub fn start<F>(state: &SessionState, now: DateTime<Utc>, turn_length: F) -> Result<SessionState, EngineError>
where
    F: Fn(&str) -> Duration,
{
    match state.phase {
        SessionPhase::NotStarted => {}
        SessionPhase::Active => {
            return Err(EngineError::SessionExists {
                session_id: state.session_id.clone(),
            })
        }
        SessionPhase::Completed => {
            return Err(EngineError::SessionClosed {
                session_id: state.session_id.clone(),
            })
        }
    }
    validate_order(&state.order)?;
    if state.max_rounds == 0 {
        return Err(EngineError::InvalidSettings(
            "a session needs at least one round".into(),
        ));
    }

    let mut next = state.clone();
    next.phase = SessionPhase::Active;
    next.round = 1;
    next.turn_index = 0;
    next.progress.clear();
    next.deadline = next
        .current_participant()
        .map(|team| now + turn_length(team));
    Ok(next)
}

/// Hands the turn on after `acting` has finished (or forfeited) it.
///
/// Passing the last slot of the final round completes the session: the
/// round stays at `max_rounds` and there is no current participant or
/// deadline afterwards.
pub fn advance_turn<F>(
    state: &SessionState,
    acting: &str,
    now: DateTime<Utc>,
    turn_length: F,
) -> Result<SessionState, EngineError>
where
    F: Fn(&str) -> Duration,
{
    ensure_turn(state, acting)?;

    let mut next = state.clone();
    if state.turn_index + 1 >= state.order.len() {
        next.progress.clear();
        if state.round >= state.max_rounds {
            next.phase = SessionPhase::Completed;
            next.deadline = None;
            return Ok(next);
        }
        next.round += 1;
        next.turn_index = 0;
    } else {
        next.turn_index += 1;
        if state.kind == SessionKind::Transfer {
            next.progress
                .insert(acting.to_string(), TeamTransferProgress::DoneForRound);
        }
    }

    next.deadline = next
        .current_participant()
        .map(|team| now + turn_length(team));
    Ok(next)
}

/// True once the current turn's deadline has passed.
pub fn check_timeout(state: &SessionState, now: DateTime<Utc>) -> bool {
    state.deadline.is_some_and(|deadline| now >= deadline)
}

/// Time left on the current turn, clamped at zero.
pub fn remaining(state: &SessionState, now: DateTime<Utc>) -> Option<Duration> {
    state
        .deadline
        .map(|deadline| (deadline - now).max(Duration::zero()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PickPosition {
    pub pick_number: u32,
    pub round: u32,
    pub turn_index: usize,
}

/// Where the next pick falls given how many picks are already recorded.
pub fn position_for_pick_count(picks: usize, team_count: usize) -> PickPosition {
    let team_count = team_count.max(1);
    PickPosition {
        pick_number: (picks + 1) as u32,
        round: (picks / team_count) as u32 + 1,
        turn_index: picks % team_count,
    }
}

/// Brings a draft back in line with its recorded picks.
///
/// Returns `None` when the stored round and turn already agree with the pick
/// count (or the session is not an active draft).
pub fn reconcile_with_pick_count<F>(
    state: &SessionState,
    picks: usize,
    now: DateTime<Utc>,
    turn_length: F,
) -> Option<SessionState>
where
    F: Fn(&str) -> Duration,
{
    if state.kind != SessionKind::Draft || !state.is_active() {
        return None;
    }

    let total = state.order.len() * state.max_rounds as usize;
    if picks >= total {
        let mut done = state.clone();
        done.phase = SessionPhase::Completed;
        done.round = state.max_rounds;
        done.deadline = None;
        return Some(done);
    }

    let position = position_for_pick_count(picks, state.order.len());
    if position.round == state.round && position.turn_index == state.turn_index {
        return None;
    }

    let mut fixed = state.clone();
    fixed.round = position.round;
    fixed.turn_index = position.turn_index;
    fixed.deadline = fixed
        .current_participant()
        .map(|team| now + turn_length(team));
    Some(fixed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn order(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 18, 0, 0).unwrap()
    }

    fn thirty(_: &str) -> Duration {
        Duration::seconds(30)
    }

    fn active_draft(ids: &[&str], rounds: u32, snake: bool) -> SessionState {
        let state = SessionState::new_draft("mls", order(ids), rounds, snake);
        start(&state, t0(), thirty).unwrap()
    }

    #[test]
    fn snake_reverses_even_rounds_only() {
        let base = order(&["A", "B", "C"]);
        assert_eq!(effective_order(&base, 1, true), vec!["A", "B", "C"]);
        assert_eq!(effective_order(&base, 2, true), vec!["C", "B", "A"]);
        assert_eq!(effective_order(&base, 3, true), vec!["A", "B", "C"]);
        assert_eq!(effective_order(&base, 2, false), vec!["A", "B", "C"]);
    }

    #[test]
    fn effective_order_is_a_permutation_of_the_base() {
        for size in 1..=8 {
            let base: Vec<String> = (0..size).map(|i| format!("team-{i}")).collect();
            for round in 1..=6 {
                for snake in [false, true] {
                    let mut effective = effective_order(&base, round, snake);
                    assert_eq!(effective.len(), base.len());
                    effective.sort();
                    effective.dedup();
                    assert_eq!(effective.len(), base.len());
                    for (i, expected) in effective_order(&base, round, snake).iter().enumerate() {
                        assert_eq!(participant_at(&base, round, snake, i), Some(*expected));
                    }
                }
            }
        }
    }

    #[test]
    fn three_teams_two_snake_rounds_complete_after_six_turns() {
        let mut state = active_draft(&["A", "B", "C"], 2, true);
        let mut seen = Vec::new();
        for _ in 0..6 {
            let current = state.current_participant().unwrap().to_string();
            seen.push(current.clone());
            state = advance_turn(&state, &current, t0(), thirty).unwrap();
        }
        assert_eq!(seen, vec!["A", "B", "C", "C", "B", "A"]);
        assert!(state.is_completed());
        assert_eq!(state.round, 2);
        assert_eq!(state.current_participant(), None);
        assert_eq!(state.deadline, None);
    }

    #[test]
    fn rounds_times_teams_advances_reach_completed_and_stop() {
        for teams in 1..=5 {
            for rounds in 1..=4 {
                let ids: Vec<String> = (0..teams).map(|i| format!("t{i}")).collect();
                let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
                let mut state = active_draft(&refs, rounds, true);
                for step in 0..(teams * rounds as usize) {
                    assert!(state.is_active(), "completed early at step {step}");
                    assert!(state.round <= rounds);
                    let current = state.current_participant().unwrap().to_string();
                    state = advance_turn(&state, &current, t0(), thirty).unwrap();
                }
                assert!(state.is_completed());
                let err = advance_turn(&state, "t0", t0(), thirty).unwrap_err();
                assert!(matches!(err, EngineError::SessionClosed { .. }));
            }
        }
    }

    #[test]
    fn only_the_current_participant_may_advance() {
        let state = active_draft(&["A", "B"], 1, false);
        let err = advance_turn(&state, "B", t0(), thirty).unwrap_err();
        match err {
            EngineError::InvalidTurn { team, current } => {
                assert_eq!(team, "B");
                assert_eq!(current.as_deref(), Some("A"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn not_started_sessions_reject_turns() {
        let state = SessionState::new_draft("mls", order(&["A"]), 1, false);
        let err = advance_turn(&state, "A", t0(), thirty).unwrap_err();
        assert!(matches!(err, EngineError::NotStarted { .. }));
    }

    #[test]
    fn start_rejects_bad_orders() {
        let empty = SessionState::new_draft("mls", Vec::new(), 3, false);
        assert!(matches!(
            start(&empty, t0(), thirty),
            Err(EngineError::InvalidOrder(_))
        ));
        let dupes = SessionState::new_draft("mls", order(&["A", "B", "A"]), 3, false);
        assert!(matches!(
            start(&dupes, t0(), thirty),
            Err(EngineError::InvalidOrder(_))
        ));
    }

    #[test]
    fn deadline_uses_the_next_participants_turn_length() {
        let state = active_draft(&["A", "B"], 1, false);
        let short_for_b = |team: &str| {
            if team == "B" {
                Duration::seconds(3)
            } else {
                Duration::seconds(30)
            }
        };
        let next = advance_turn(&state, "A", t0(), short_for_b).unwrap();
        assert_eq!(next.deadline, Some(t0() + Duration::seconds(3)));
    }

    #[test]
    fn timeout_is_false_before_and_stable_after_the_deadline() {
        let state = active_draft(&["A", "B"], 1, false);
        let deadline = state.deadline.unwrap();
        for secs in [0, 10, 29] {
            assert!(!check_timeout(&state, t0() + Duration::seconds(secs)));
            assert!(!check_timeout(&state, t0() + Duration::seconds(secs)));
        }
        assert!(check_timeout(&state, deadline));
        let mut last = true;
        for secs in 30..120 {
            let timed_out = check_timeout(&state, t0() + Duration::seconds(secs));
            assert!(timed_out && last);
            last = timed_out;
        }
        assert_eq!(remaining(&state, deadline + Duration::seconds(5)), Some(Duration::zero()));
    }

    #[test]
    fn completed_sessions_never_time_out() {
        let mut state = active_draft(&["A"], 1, false);
        state = advance_turn(&state, "A", t0(), thirty).unwrap();
        assert!(!check_timeout(&state, t0() + Duration::days(1)));
    }

    #[test]
    fn pick_position_follows_the_pick_count() {
        assert_eq!(
            position_for_pick_count(0, 4),
            PickPosition { pick_number: 1, round: 1, turn_index: 0 }
        );
        assert_eq!(
            position_for_pick_count(3, 4),
            PickPosition { pick_number: 4, round: 1, turn_index: 3 }
        );
        assert_eq!(
            position_for_pick_count(4, 4),
            PickPosition { pick_number: 5, round: 2, turn_index: 0 }
        );
    }

    #[test]
    fn reconciliation_repairs_a_stale_turn_pointer() {
        let state = active_draft(&["A", "B", "C"], 2, true);
        assert_eq!(reconcile_with_pick_count(&state, 0, t0(), thirty), None);

        let fixed = reconcile_with_pick_count(&state, 4, t0(), thirty).unwrap();
        assert_eq!(fixed.round, 2);
        assert_eq!(fixed.turn_index, 1);
        assert_eq!(fixed.current_participant(), Some("B"));

        let done = reconcile_with_pick_count(&state, 6, t0(), thirty).unwrap();
        assert!(done.is_completed());
    }
}
