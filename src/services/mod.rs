pub mod auth_user;
pub mod draft;
pub mod poller;
pub mod presence;
pub mod record_normalizer;
pub mod sweeper;
pub mod transfer;

use rand::rng;
use rand::seq::SliceRandom;

use crate::engine::rotation;
use crate::error::EngineError;
use crate::store::RecordStore;

/// What a timeout check did to a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeoutOutcome {
    /// The deadline has not passed, or there is no active turn.
    NotDue,
    /// A player was picked (draft) or picked up (transfer) for the team.
    AutoPicked { team_id: String, player_id: String },
    /// The team lost its turn without acting.
    Forfeited { team_id: String },
    /// The session moved to its terminal phase.
    Closed,
    /// Another writer acted first; the next poll sees the new state.
    LostRace,
}

/// Turn order for a new session. Without an explicit order the league's
/// teams are shuffled.
pub(crate) async fn resolve_order<S: RecordStore>(
    store: &S,
    league_id: &str,
    order: Option<Vec<String>>,
) -> Result<Vec<String>, EngineError> {
    let teams = store.list_teams(league_id).await?;
    let order = match order {
        Some(order) => {
            rotation::validate_order(&order)?;
            if let Some(stranger) = order
                .iter()
                .find(|id| !teams.iter().any(|team| &team.team_id == *id))
            {
                return Err(EngineError::UnknownTeam {
                    team: stranger.clone(),
                });
            }
            order
        }
        None => {
            let mut ids: Vec<String> = teams.into_iter().map(|team| team.team_id).collect();
            ids.shuffle(&mut rng());
            ids
        }
    };
    rotation::validate_order(&order)?;
    Ok(order)
}
