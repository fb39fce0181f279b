// Error kinds surfaced by the turn engine and the services around it.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use crate::dto::session_dto::TeamTransferProgress;
use crate::dto::transfer_dto::TransferActionType;
use crate::store::StoreError;

/// Everything except `Store` is an expected, recoverable outcome that the
/// client turns into a message and resolves by re-reading state.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("it is not {team}'s turn")]
    InvalidTurn {
        team: String,
        current: Option<String>,
    },

    #[error("{team} cannot {attempted} while {progress}")]
    StepOutOfOrder {
        team: String,
        attempted: TransferActionType,
        progress: TeamTransferProgress,
    },

    #[error("{team} must pick up a player before finishing")]
    PickupOwed { team: String },

    #[error("{team}'s turn ran out before the request arrived")]
    TurnExpired { team: String },

    #[error("player {player_id} has already been taken")]
    AlreadyTaken { player_id: String },

    #[error("session {session_id} is closed")]
    SessionClosed { session_id: String },

    #[error("session {session_id} was changed by someone else; refresh and try again")]
    PersistenceConflict { session_id: String },

    #[error("session {session_id} has not started")]
    NotStarted { session_id: String },

    #[error("session {session_id} was not found")]
    SessionNotFound { session_id: String },

    #[error("session {session_id} already exists")]
    SessionExists { session_id: String },

    #[error("player {player_id} is not in the player pool")]
    UnknownPlayer { player_id: String },

    #[error("player {player_id} is not on {team}'s roster")]
    NotOnRoster { player_id: String, team: String },

    #[error("team {team} is not part of this league")]
    UnknownTeam { team: String },

    #[error("invalid turn order: {0}")]
    InvalidOrder(String),

    #[error("invalid session settings: {0}")]
    InvalidSettings(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl EngineError {
    pub fn status(&self) -> StatusCode {
        match self {
            EngineError::InvalidTurn { .. } => StatusCode::FORBIDDEN,
            EngineError::StepOutOfOrder { .. }
            | EngineError::PickupOwed { .. }
            | EngineError::TurnExpired { .. }
            | EngineError::AlreadyTaken { .. }
            | EngineError::SessionClosed { .. }
            | EngineError::PersistenceConflict { .. }
            | EngineError::NotStarted { .. }
            | EngineError::SessionExists { .. } => StatusCode::CONFLICT,
            EngineError::SessionNotFound { .. }
            | EngineError::UnknownPlayer { .. }
            | EngineError::UnknownTeam { .. } => StatusCode::NOT_FOUND,
            EngineError::NotOnRoster { .. }
            | EngineError::InvalidOrder(_)
            | EngineError::InvalidSettings(_) => StatusCode::BAD_REQUEST,
            EngineError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            EngineError::Store(e) => {
                error!("Record store failure: {}", e);
                "The league data could not be reached. Refresh and try again.".to_string()
            }
            other => other.to_string(),
        };
        (status, message).into_response()
    }
}
