use tracing::{debug, info, warn};

use super::draft::DraftService;
use super::transfer::TransferService;
use super::TimeoutOutcome;
use crate::dto::session_dto::SessionKind;
use crate::error::EngineError;
use crate::store::RecordStore;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub examined: usize,
    pub acted: usize,
}

/// One pass over every active session, resolving turns whose deadline has
/// passed. Safe to run from several processes at once.
#[derive(Clone)]
pub struct Sweeper<S> {
    store: S,
    drafts: DraftService<S>,
    transfers: TransferService<S>,
}

impl<S: RecordStore + Clone> Sweeper<S> {
    pub fn new(store: S, drafts: DraftService<S>, transfers: TransferService<S>) -> Self {
        Self {
            store,
            drafts,
            transfers,
        }
    }

    pub async fn sweep(&self) -> Result<SweepReport, EngineError> {
        let sessions = self.store.list_active_sessions().await?;
        let mut report = SweepReport {
            examined: sessions.len(),
            acted: 0,
        };

        for session in sessions {
            let outcome = match session.kind {
                SessionKind::Draft => self.drafts.expire_turn_if_due(&session.league_id).await,
                SessionKind::Transfer => self.transfers.expire_turn_if_due(&session.league_id).await,
            };
            match outcome {
                Ok(TimeoutOutcome::NotDue) => {}
                Ok(TimeoutOutcome::LostRace) => {
                    debug!("{} was resolved by another writer", session.session_id);
                }
                Ok(outcome) => {
                    info!("{}: {:?}", session.session_id, outcome);
                    report.acted += 1;
                }
                Err(e) => warn!("Timeout check for {} failed: {}", session.session_id, e),
            }
        }
        Ok(report)
    }
}
