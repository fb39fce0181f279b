// Server-side presence: a team counts as attended while its client keeps
// sending heartbeats.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::config::TurnConfig;
use crate::error::EngineError;
use crate::store::RecordStore;

/// Turn lengths for one league, resolved at a single instant.
#[derive(Debug, Clone)]
pub struct TurnLengths {
    attended: HashSet<String>,
    attended_turn: Duration,
    unattended_turn: Duration,
}

impl TurnLengths {
    pub fn new(attended: HashSet<String>, turns: &TurnConfig) -> Self {
        Self {
            attended,
            attended_turn: turns.attended_turn(),
            unattended_turn: turns.unattended_turn(),
        }
    }

    pub fn for_team(&self, team_id: &str) -> Duration {
        if self.attended.contains(team_id) {
            self.attended_turn
        } else {
            self.unattended_turn
        }
    }

    pub fn is_attended(&self, team_id: &str) -> bool {
        self.attended.contains(team_id)
    }
}

#[derive(Clone)]
pub struct PresenceTracker<S> {
    store: S,
    turns: TurnConfig,
}

impl<S: RecordStore> PresenceTracker<S> {
    pub fn new(store: S, turns: TurnConfig) -> Self {
        Self { store, turns }
    }

    pub async fn heartbeat(
        &self,
        league_id: &str,
        team_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        debug!("Heartbeat from {} in {}", team_id, league_id);
        self.store.record_heartbeat(league_id, team_id, now).await?;
        Ok(())
    }

    pub async fn turn_lengths(
        &self,
        league_id: &str,
        now: DateTime<Utc>,
    ) -> Result<TurnLengths, EngineError> {
        let ttl = self.turns.presence_ttl();
        let attended = self
            .store
            .list_heartbeats(league_id)
            .await?
            .into_iter()
            .filter(|beat| now - beat.seen_at <= ttl)
            .map(|beat| beat.team_id)
            .collect();
        Ok(TurnLengths::new(attended, &self.turns))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unattended_teams_get_the_short_turn() {
        let turns = TurnConfig::default();
        let lengths = TurnLengths::new(["a".to_string()].into_iter().collect(), &turns);
        assert_eq!(lengths.for_team("a"), Duration::seconds(30));
        assert_eq!(lengths.for_team("b"), Duration::seconds(3));
        assert!(lengths.is_attended("a"));
        assert!(!lengths.is_attended("b"));
    }
}
