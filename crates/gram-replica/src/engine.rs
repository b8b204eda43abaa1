//! Reconciliation Engine.
//!
//! Each mutation moves through `Idle -> Pending -> {Confirmed | RolledBack}`.
//! `Pending` is entered synchronously inside [`ReconciliationEngine::vote`] /
//! [`ReconciliationEngine::comment`]: the replica reflects the mutation before
//! either call returns. The request then runs on a spawned task which, when
//! the response for *that* mutation arrives, confirms or rolls back only that
//! mutation. Responses are matched by correlation key, never by arrival order.
//!
//! The engine state lock is never held across an `.await`.

use crate::cache::{MutationKey, ReplicaCache, TempId};
use crate::error::ReplicaError;
use crate::transport::{EngagementTransport, TransportError};
use gram_core::ErrorCode;
use gram_core::model::{Comment, CommentReceipt, InitiativeId, UserId, VoteTally};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct MutationId(u64);

impl fmt::Display for MutationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m{}", self.0)
    }
}

/// Lifecycle of one speculative mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum MutationState {
    Idle,
    Pending,
    Confirmed,
    RolledBack { code: String, message: String },
}

impl MutationState {
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Confirmed | Self::RolledBack { .. })
    }

    const fn can_advance_to(&self, next: &Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Pending) | (Self::Pending, Self::Confirmed | Self::RolledBack { .. })
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub id: MutationId,
    pub key: MutationKey,
    pub state: MutationState,
}

/// A rolled-back mutation's failure, kept for display to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfacedError {
    pub mutation: MutationId,
    pub key: MutationKey,
    pub code: ErrorCode,
    pub message: String,
}

#[derive(Debug, Default)]
struct EngineState {
    cache: ReplicaCache,
    mutations: BTreeMap<MutationId, MutationRecord>,
    errors: Vec<SurfacedError>,
    next_seq: u64,
}

impl EngineState {
    fn begin(&mut self, key: MutationKey) -> MutationId {
        self.next_seq += 1;
        let id = MutationId(self.next_seq);
        self.mutations.insert(
            id,
            MutationRecord {
                id,
                key,
                state: MutationState::Idle,
            },
        );
        self.advance(id, MutationState::Pending);
        id
    }

    fn advance(&mut self, id: MutationId, next: MutationState) {
        let Some(record) = self.mutations.get_mut(&id) else {
            return;
        };
        if record.state.can_advance_to(&next) {
            record.state = next;
        } else {
            warn!(mutation = %id, from = ?record.state, to = ?next, "ignored illegal mutation transition");
        }
    }

    fn reject(&mut self, id: MutationId, key: MutationKey, err: &TransportError) {
        let code = err.code();
        self.advance(
            id,
            MutationState::RolledBack {
                code: code.code().to_string(),
                message: err.to_string(),
            },
        );
        self.errors.push(SurfacedError {
            mutation: id,
            key,
            code,
            message: err.to_string(),
        });
    }
}

struct Shared<T> {
    transport: T,
    state: Mutex<EngineState>,
}

/// Handle to an in-flight mutation. Dropping it does not cancel the request;
/// the mutation is reconciled either way.
#[derive(Debug)]
pub struct Ticket<R> {
    mutation: MutationId,
    key: MutationKey,
    handle: JoinHandle<Result<R, ReplicaError>>,
}

impl<R> Ticket<R> {
    #[must_use]
    pub const fn mutation(&self) -> MutationId {
        self.mutation
    }

    #[must_use]
    pub const fn key(&self) -> &MutationKey {
        &self.key
    }

    /// Wait for the response and its reconciliation.
    ///
    /// # Errors
    ///
    /// Returns [`ReplicaError::Transport`] when the request failed and the
    /// mutation was rolled back.
    pub async fn settle(self) -> Result<R, ReplicaError> {
        self.handle
            .await
            .map_err(|err| ReplicaError::Task(err.to_string()))?
    }
}

/// Optimistic-update coordinator over a [`ReplicaCache`] and a transport.
pub struct ReconciliationEngine<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for ReconciliationEngine<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: EngagementTransport + 'static> ReconciliationEngine<T> {
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self::with_cache(transport, ReplicaCache::new())
    }

    #[must_use]
    pub fn with_cache(transport: T, cache: ReplicaCache) -> Self {
        Self {
            shared: Arc::new(Shared {
                transport,
                state: Mutex::new(EngineState {
                    cache,
                    ..EngineState::default()
                }),
            }),
        }
    }

    #[must_use]
    pub fn transport(&self) -> &T {
        &self.shared.transport
    }

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Current replica snapshot.
    #[must_use]
    pub fn snapshot(&self) -> ReplicaCache {
        self.lock().cache.clone()
    }

    #[must_use]
    pub fn mutation(&self, id: MutationId) -> Option<MutationRecord> {
        self.lock().mutations.get(&id).cloned()
    }

    #[must_use]
    pub fn mutations(&self) -> Vec<MutationRecord> {
        self.lock().mutations.values().cloned().collect()
    }

    /// Errors from rolled-back mutations, oldest first.
    #[must_use]
    pub fn errors(&self) -> Vec<SurfacedError> {
        self.lock().errors.clone()
    }

    /// Drain surfaced errors once they have been shown.
    pub fn take_errors(&self) -> Vec<SurfacedError> {
        std::mem::take(&mut self.lock().errors)
    }

    /// Drain records of confirmed and rolled-back mutations, oldest first.
    /// Pending records stay. Long-lived callers drain periodically so the
    /// record map only holds what is still in flight.
    pub fn take_settled(&self) -> Vec<MutationRecord> {
        let mut state = self.lock();
        let (settled, pending): (BTreeMap<_, _>, BTreeMap<_, _>) =
            std::mem::take(&mut state.mutations)
                .into_iter()
                .partition(|(_, record)| record.state.is_terminal());
        state.mutations = pending;
        settled.into_values().collect()
    }

    /// Hydrate the replica from the server's initiative listing.
    ///
    /// # Errors
    ///
    /// Returns [`ReplicaError::Transport`] if the listing request fails.
    pub async fn refresh(&self) -> Result<usize, ReplicaError> {
        let views = self.shared.transport.list_initiatives().await?;
        let mut state = self.lock();
        let mut cache = state.cache.clone();
        for view in &views {
            cache = cache.hydrate(&view.initiative);
        }
        state.cache = cache;
        debug!(count = views.len(), "replica refreshed");
        Ok(views.len())
    }

    /// Toggle `user_id`'s vote: applied to the replica now, reconciled when
    /// the response arrives.
    ///
    /// # Errors
    ///
    /// Fails synchronously, without touching the replica or issuing a
    /// request, when called outside a tokio runtime or when the reducer
    /// rejects the mutation (initiative not cached, or this user's vote on it
    /// still in flight).
    pub fn vote(
        &self,
        initiative_id: &InitiativeId,
        user_id: &UserId,
    ) -> Result<Ticket<VoteTally>, ReplicaError> {
        let runtime = current_runtime()?;
        let key = MutationKey::vote(initiative_id, user_id);
        let mutation = {
            let mut state = self.lock();
            state.cache = state.cache.apply_optimistic_vote(initiative_id, user_id)?;
            state.begin(key.clone())
        };
        debug!(%mutation, initiative_id = %initiative_id, user_id = %user_id, "vote pending");

        let engine = self.clone();
        let (id, user, task_key) = (initiative_id.clone(), user_id.clone(), key.clone());
        let handle = runtime.spawn(async move {
            let outcome = engine.shared.transport.toggle_vote(&id, &user).await;
            engine.settle_vote(mutation, task_key, &id, &user, outcome)
        });

        Ok(Ticket {
            mutation,
            key,
            handle,
        })
    }

    /// Append a comment: shown immediately as an optimistic entry, replaced
    /// in place by the canonical comment when its response arrives.
    ///
    /// # Errors
    ///
    /// Fails synchronously, without touching the replica, when called
    /// outside a tokio runtime or when the initiative is not cached.
    pub fn comment(
        &self,
        initiative_id: &InitiativeId,
        author: &UserId,
        text: &str,
    ) -> Result<Ticket<Comment>, ReplicaError> {
        let runtime = current_runtime()?;
        let (mutation, temp_id) = {
            let mut state = self.lock();
            let temp_id = TempId::generate(state.next_seq + 1);
            state.cache = state
                .cache
                .apply_optimistic_comment(initiative_id, &temp_id, author, text)?;
            let mutation = state.begin(MutationKey::comment(initiative_id, &temp_id));
            (mutation, temp_id)
        };
        debug!(%mutation, initiative_id = %initiative_id, temp_id = %temp_id, "comment pending");

        let key = MutationKey::comment(initiative_id, &temp_id);
        let engine = self.clone();
        let (id, author, text, task_key) = (
            initiative_id.clone(),
            author.clone(),
            text.to_string(),
            key.clone(),
        );
        let handle = runtime.spawn(async move {
            let outcome = engine
                .shared
                .transport
                .append_comment(&id, &author, &text)
                .await;
            engine.settle_comment(mutation, task_key, &id, &temp_id, outcome)
        });

        Ok(Ticket {
            mutation,
            key,
            handle,
        })
    }

    fn settle_vote(
        &self,
        mutation: MutationId,
        key: MutationKey,
        initiative_id: &InitiativeId,
        user_id: &UserId,
        outcome: Result<VoteTally, TransportError>,
    ) -> Result<VoteTally, ReplicaError> {
        let mut state = self.lock();
        match outcome {
            Ok(tally) => {
                state.cache = state.cache.confirm_vote(
                    initiative_id,
                    user_id,
                    tally.vote_count,
                    tally.liked_by.clone(),
                )?;
                state.advance(mutation, MutationState::Confirmed);
                debug!(%mutation, vote_count = tally.vote_count, "vote confirmed");
                Ok(tally)
            }
            Err(err) => {
                state.cache = state.cache.rollback_vote(initiative_id, user_id)?;
                state.reject(mutation, key, &err);
                warn!(%mutation, initiative_id = %initiative_id, error = %err, "vote rolled back");
                Err(err.into())
            }
        }
    }

    fn settle_comment(
        &self,
        mutation: MutationId,
        key: MutationKey,
        initiative_id: &InitiativeId,
        temp_id: &TempId,
        outcome: Result<CommentReceipt, TransportError>,
    ) -> Result<Comment, ReplicaError> {
        let mut state = self.lock();
        match outcome {
            Ok(receipt) => {
                state.cache =
                    state
                        .cache
                        .confirm_comment(initiative_id, temp_id, receipt.comment.clone())?;
                state.advance(mutation, MutationState::Confirmed);
                debug!(%mutation, comment_id = %receipt.comment.id, "comment confirmed");
                Ok(receipt.comment)
            }
            Err(err) => {
                state.cache = state.cache.rollback_comment(initiative_id, temp_id)?;
                state.reject(mutation, key, &err);
                warn!(%mutation, initiative_id = %initiative_id, error = %err, "comment rolled back");
                Err(err.into())
            }
        }
    }
}

fn current_runtime() -> Result<Handle, ReplicaError> {
    Handle::try_current().map_err(|_| ReplicaError::NoRuntime)
}

#[cfg(test)]
mod tests {
    use super::MutationState;

    #[test]
    fn only_forward_transitions_are_legal() {
        let rolled_back = MutationState::RolledBack {
            code: "E3001".into(),
            message: "storage failure".into(),
        };
        assert!(MutationState::Idle.can_advance_to(&MutationState::Pending));
        assert!(MutationState::Pending.can_advance_to(&MutationState::Confirmed));
        assert!(MutationState::Pending.can_advance_to(&rolled_back));
        assert!(!MutationState::Idle.can_advance_to(&MutationState::Confirmed));
        assert!(!MutationState::Confirmed.can_advance_to(&rolled_back));
        assert!(!rolled_back.can_advance_to(&MutationState::Pending));
        assert!(rolled_back.is_terminal());
    }
}
