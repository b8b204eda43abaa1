use crate::cache::{MutationKey, TempId};
use crate::transport::TransportError;
use gram_core::ErrorCode;
use gram_core::model::{InitiativeId, UserId};

/// Failures of replica reducers and of reconciled mutations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ReplicaError {
    /// The initiative has not been hydrated into this replica.
    #[error("initiative {0} is not in the replica")]
    UnknownInitiative(InitiativeId),

    /// A vote by this user on this initiative is already awaiting its response.
    #[error("a vote by {user_id} on {initiative_id} is already in flight")]
    VoteInFlight {
        initiative_id: InitiativeId,
        user_id: UserId,
    },

    #[error("temporary comment id {0} is already in use")]
    DuplicateTempId(TempId),

    /// Confirm/rollback for a mutation that is not pending.
    #[error("no pending mutation for {0}")]
    NotPending(MutationKey),

    /// The request failed; the speculative mutation was rolled back.
    #[error("{0}")]
    Transport(#[from] TransportError),

    /// Mutations spawn their request, so they need a tokio runtime.
    #[error("no tokio runtime is running; mutations must be issued from async context")]
    NoRuntime,

    /// The background reconciliation task did not complete.
    #[error("reconciliation task failed: {0}")]
    Task(String),
}

impl ReplicaError {
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::UnknownInitiative(_) => ErrorCode::InitiativeNotFound,
            Self::VoteInFlight { .. } => ErrorCode::MutationInFlight,
            Self::DuplicateTempId(_) => ErrorCode::ValidationFailed,
            Self::NotPending(_) | Self::NoRuntime | Self::Task(_) => ErrorCode::InternalUnexpected,
            Self::Transport(err) => err.code(),
        }
    }
}
