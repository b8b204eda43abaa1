//! Client Replica Cache.
//!
//! Every operation is a reducer: it borrows the current snapshot and returns
//! a new one. Per-initiative state sits behind `Arc`, so a reducer copies only
//! the initiative it touches and earlier snapshots are never observed to
//! change.
//!
//! Speculative mutations are keyed by correlation id:
//! `(initiative, user)` for votes and the temporary id for comments.

use crate::error::ReplicaError;
use gram_core::model::{Comment, Initiative, InitiativeId, UserId};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Client-generated correlation id for a comment awaiting confirmation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct TempId(String);

impl TempId {
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// `tmp-<seq>-<random>`; unique within a process and unlikely to collide
    /// across processes.
    #[must_use]
    pub fn generate(seq: u64) -> Self {
        Self(format!("tmp-{seq}-{:08x}", rand::random::<u32>()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TempId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteDirection {
    Cast,
    Withdraw,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingVote {
    pub initiative_id: InitiativeId,
    pub user_id: UserId,
    pub direction: VoteDirection,
    /// Voters listed ahead of a withdrawn voter when it was removed. A
    /// rollback re-inserts after the last of them still present, so the
    /// order comes back exactly whatever order withdrawals are undone in.
    #[serde(skip)]
    pub preceded_by: Option<Vec<UserId>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingComment {
    pub initiative_id: InitiativeId,
    pub temp_id: TempId,
    pub author: UserId,
    pub text: String,
    pub optimistic: bool,
}

/// A transient, client-owned mutation awaiting its server response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SpeculativeMutation {
    Vote(PendingVote),
    Comment(PendingComment),
}

impl SpeculativeMutation {
    #[must_use]
    pub fn key(&self) -> MutationKey {
        match self {
            Self::Vote(vote) => MutationKey::vote(&vote.initiative_id, &vote.user_id),
            Self::Comment(comment) => MutationKey::comment(&comment.initiative_id, &comment.temp_id),
        }
    }
}

/// Correlation key matching a response to the mutation that caused it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MutationKey {
    Vote {
        initiative_id: InitiativeId,
        user_id: UserId,
    },
    Comment {
        initiative_id: InitiativeId,
        temp_id: TempId,
    },
}

impl MutationKey {
    #[must_use]
    pub fn vote(initiative_id: &InitiativeId, user_id: &UserId) -> Self {
        Self::Vote {
            initiative_id: initiative_id.clone(),
            user_id: user_id.clone(),
        }
    }

    #[must_use]
    pub fn comment(initiative_id: &InitiativeId, temp_id: &TempId) -> Self {
        Self::Comment {
            initiative_id: initiative_id.clone(),
            temp_id: temp_id.clone(),
        }
    }

    #[must_use]
    pub const fn initiative_id(&self) -> &InitiativeId {
        match self {
            Self::Vote { initiative_id, .. } | Self::Comment { initiative_id, .. } => initiative_id,
        }
    }
}

impl fmt::Display for MutationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vote {
                initiative_id,
                user_id,
            } => write!(f, "vote {initiative_id}/{user_id}"),
            Self::Comment {
                initiative_id,
                temp_id,
            } => write!(f, "comment {initiative_id}/{temp_id}"),
        }
    }
}

/// One displayed comment: canonical, or still speculative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum CommentEntry {
    Confirmed(Comment),
    Pending(PendingComment),
}

impl CommentEntry {
    #[must_use]
    pub const fn is_optimistic(&self) -> bool {
        matches!(self, Self::Pending(_))
    }

    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Confirmed(comment) => &comment.text,
            Self::Pending(pending) => &pending.text,
        }
    }

    #[must_use]
    pub const fn confirmed(&self) -> Option<&Comment> {
        match self {
            Self::Confirmed(comment) => Some(comment),
            Self::Pending(_) => None,
        }
    }

    fn is_temp(&self, temp_id: &TempId) -> bool {
        matches!(self, Self::Pending(pending) if pending.temp_id == *temp_id)
    }
}

/// Last-known server state of one initiative with speculative effects applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiativeReplica {
    pub id: InitiativeId,
    pub vote_count: u64,
    pub liked_by: Vec<UserId>,
    pub comments: Vec<CommentEntry>,
}

impl InitiativeReplica {
    #[must_use]
    pub fn from_server(initiative: &Initiative) -> Self {
        Self {
            id: initiative.id.clone(),
            vote_count: initiative.vote_count,
            liked_by: initiative.liked_by.clone(),
            comments: initiative
                .comments
                .iter()
                .cloned()
                .map(CommentEntry::Confirmed)
                .collect(),
        }
    }

    /// Displayed comment count, speculative entries included.
    #[must_use]
    pub fn comment_count(&self) -> usize {
        self.comments.len()
    }

    #[must_use]
    pub fn has_voted(&self, user: &UserId) -> bool {
        self.liked_by.contains(user)
    }

    /// Make `user`'s membership match `direction`. Returns the voters that
    /// preceded the user, if a withdrawal removed them.
    fn ensure_vote(&mut self, user: &UserId, direction: VoteDirection) -> Option<Vec<UserId>> {
        match direction {
            VoteDirection::Cast => {
                if !self.has_voted(user) {
                    self.liked_by.push(user.clone());
                    self.vote_count += 1;
                }
                None
            }
            VoteDirection::Withdraw => {
                let position = self.liked_by.iter().position(|v| v == user)?;
                let preceded_by = self.liked_by[..position].to_vec();
                self.liked_by.remove(position);
                self.vote_count = self.vote_count.saturating_sub(1);
                Some(preceded_by)
            }
        }
    }

    fn undo_vote(&mut self, vote: &PendingVote) {
        match vote.direction {
            VoteDirection::Cast => {
                if let Some(position) = self.liked_by.iter().position(|v| *v == vote.user_id) {
                    self.liked_by.remove(position);
                    self.vote_count = self.vote_count.saturating_sub(1);
                }
            }
            VoteDirection::Withdraw => {
                if !self.has_voted(&vote.user_id) {
                    let at = vote.preceded_by.as_ref().map_or(self.liked_by.len(), |ahead| {
                        self.liked_by
                            .iter()
                            .rposition(|v| ahead.contains(v))
                            .map_or(0, |last| last + 1)
                    });
                    self.liked_by.insert(at, vote.user_id.clone());
                    self.vote_count += 1;
                }
            }
        }
    }

    /// Order confirmed entries by server id, leaving speculative entries in
    /// their slots.
    fn settle_comment_order(&mut self) {
        let slots: Vec<usize> = self
            .comments
            .iter()
            .enumerate()
            .filter(|(_, entry)| !entry.is_optimistic())
            .map(|(slot, _)| slot)
            .collect();
        let mut confirmed: Vec<Comment> = self
            .comments
            .iter()
            .filter_map(CommentEntry::confirmed)
            .cloned()
            .collect();
        confirmed.sort_by_key(|comment| comment.id);

        for (slot, comment) in slots.into_iter().zip(confirmed) {
            self.comments[slot] = CommentEntry::Confirmed(comment);
        }
    }
}

/// Immutable snapshot of every cached initiative and every in-flight mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplicaCache {
    initiatives: BTreeMap<InitiativeId, Arc<InitiativeReplica>>,
    pending: BTreeMap<MutationKey, SpeculativeMutation>,
}

impl ReplicaCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn initiative(&self, id: &InitiativeId) -> Option<&InitiativeReplica> {
        self.initiatives.get(id).map(AsRef::as_ref)
    }

    pub fn initiatives(&self) -> impl Iterator<Item = &InitiativeReplica> {
        self.initiatives.values().map(AsRef::as_ref)
    }

    /// In-flight mutations, ordered by key.
    pub fn pending(&self) -> impl Iterator<Item = &SpeculativeMutation> {
        self.pending.values()
    }

    #[must_use]
    pub fn is_pending(&self, key: &MutationKey) -> bool {
        self.pending.contains_key(key)
    }

    /// Seed or refresh an initiative from a server read.
    ///
    /// In-flight mutations survive: speculative comments are re-appended and
    /// pending votes are re-applied on top of the fresh server state.
    #[must_use]
    pub fn hydrate(&self, initiative: &Initiative) -> Self {
        let mut next = self.clone();
        let mut replica = InitiativeReplica::from_server(initiative);
        if let Some(previous) = self.initiatives.get(&initiative.id) {
            replica.comments.extend(
                previous
                    .comments
                    .iter()
                    .filter(|entry| entry.is_optimistic())
                    .cloned(),
            );
        }
        reapply_pending_votes(&mut replica, &mut next.pending);
        next.initiatives
            .insert(initiative.id.clone(), Arc::new(replica));
        next
    }

    /// Flip `user`'s vote locally and record the flip as pending.
    ///
    /// # Errors
    ///
    /// - [`ReplicaError::VoteInFlight`] if this user's vote on this initiative
    ///   is still pending
    /// - [`ReplicaError::UnknownInitiative`] if the initiative is not cached
    pub fn apply_optimistic_vote(
        &self,
        initiative_id: &InitiativeId,
        user_id: &UserId,
    ) -> Result<Self, ReplicaError> {
        let key = MutationKey::vote(initiative_id, user_id);
        if self.pending.contains_key(&key) {
            return Err(ReplicaError::VoteInFlight {
                initiative_id: initiative_id.clone(),
                user_id: user_id.clone(),
            });
        }

        let mut next = self.clone();
        let replica = replica_mut(&mut next.initiatives, initiative_id)?;
        let direction = if replica.has_voted(user_id) {
            VoteDirection::Withdraw
        } else {
            VoteDirection::Cast
        };
        let preceded_by = replica.ensure_vote(user_id, direction);

        next.pending.insert(
            key,
            SpeculativeMutation::Vote(PendingVote {
                initiative_id: initiative_id.clone(),
                user_id: user_id.clone(),
                direction,
                preceded_by,
            }),
        );
        Ok(next)
    }

    /// Append a speculative comment (marked `optimistic`) to the end of the
    /// initiative's comment list.
    ///
    /// # Errors
    ///
    /// - [`ReplicaError::DuplicateTempId`] if `temp_id` is already pending
    /// - [`ReplicaError::UnknownInitiative`] if the initiative is not cached
    pub fn apply_optimistic_comment(
        &self,
        initiative_id: &InitiativeId,
        temp_id: &TempId,
        author: &UserId,
        text: &str,
    ) -> Result<Self, ReplicaError> {
        let key = MutationKey::comment(initiative_id, temp_id);
        if self.pending.contains_key(&key) {
            return Err(ReplicaError::DuplicateTempId(temp_id.clone()));
        }

        let pending = PendingComment {
            initiative_id: initiative_id.clone(),
            temp_id: temp_id.clone(),
            author: author.clone(),
            text: text.to_string(),
            optimistic: true,
        };

        let mut next = self.clone();
        replica_mut(&mut next.initiatives, initiative_id)?
            .comments
            .push(CommentEntry::Pending(pending.clone()));
        next.pending
            .insert(key, SpeculativeMutation::Comment(pending));
        Ok(next)
    }

    /// Overwrite vote state with the server's canonical answer for this
    /// user's request. Other pending votes on the initiative are re-applied
    /// on top.
    ///
    /// # Errors
    ///
    /// Returns [`ReplicaError::NotPending`] if no such vote is in flight.
    pub fn confirm_vote(
        &self,
        initiative_id: &InitiativeId,
        user_id: &UserId,
        vote_count: u64,
        liked_by: Vec<UserId>,
    ) -> Result<Self, ReplicaError> {
        let key = MutationKey::vote(initiative_id, user_id);
        let mut next = self.clone();
        if next.pending.remove(&key).is_none() {
            return Err(ReplicaError::NotPending(key));
        }

        let replica = replica_mut(&mut next.initiatives, initiative_id)?;
        replica.vote_count = vote_count;
        replica.liked_by = liked_by;
        reapply_pending_votes(replica, &mut next.pending);
        Ok(next)
    }

    /// Replace the speculative comment in place with the canonical one.
    ///
    /// If the canonical comment is already present (a refresh raced the
    /// response), the speculative entry is dropped instead. Confirmed
    /// entries are then ordered by server id, so responses arriving out of
    /// order still converge to append order.
    ///
    /// # Errors
    ///
    /// Returns [`ReplicaError::NotPending`] if no such comment is in flight.
    pub fn confirm_comment(
        &self,
        initiative_id: &InitiativeId,
        temp_id: &TempId,
        canonical: Comment,
    ) -> Result<Self, ReplicaError> {
        let key = MutationKey::comment(initiative_id, temp_id);
        let mut next = self.clone();
        if next.pending.remove(&key).is_none() {
            return Err(ReplicaError::NotPending(key));
        }

        let replica = replica_mut(&mut next.initiatives, initiative_id)?;
        let slot = replica.comments.iter().position(|e| e.is_temp(temp_id));
        let already_present = replica
            .comments
            .iter()
            .filter_map(CommentEntry::confirmed)
            .any(|c| c.id == canonical.id);

        match (slot, already_present) {
            (Some(slot), true) => {
                replica.comments.remove(slot);
            }
            (Some(slot), false) => replica.comments[slot] = CommentEntry::Confirmed(canonical),
            (None, false) => replica.comments.push(CommentEntry::Confirmed(canonical)),
            (None, true) => {}
        }
        replica.settle_comment_order();
        Ok(next)
    }

    /// Undo exactly this user's speculative flip.
    ///
    /// # Errors
    ///
    /// Returns [`ReplicaError::NotPending`] if no such vote is in flight.
    pub fn rollback_vote(
        &self,
        initiative_id: &InitiativeId,
        user_id: &UserId,
    ) -> Result<Self, ReplicaError> {
        let key = MutationKey::vote(initiative_id, user_id);
        let mut next = self.clone();
        let Some(SpeculativeMutation::Vote(vote)) = next.pending.remove(&key) else {
            return Err(ReplicaError::NotPending(key));
        };

        replica_mut(&mut next.initiatives, initiative_id)?.undo_vote(&vote);
        Ok(next)
    }

    /// Remove exactly this speculative comment.
    ///
    /// # Errors
    ///
    /// Returns [`ReplicaError::NotPending`] if no such comment is in flight.
    pub fn rollback_comment(
        &self,
        initiative_id: &InitiativeId,
        temp_id: &TempId,
    ) -> Result<Self, ReplicaError> {
        let key = MutationKey::comment(initiative_id, temp_id);
        let mut next = self.clone();
        if next.pending.remove(&key).is_none() {
            return Err(ReplicaError::NotPending(key));
        }

        replica_mut(&mut next.initiatives, initiative_id)?
            .comments
            .retain(|entry| !entry.is_temp(temp_id));
        Ok(next)
    }
}

fn replica_mut<'a>(
    initiatives: &'a mut BTreeMap<InitiativeId, Arc<InitiativeReplica>>,
    id: &InitiativeId,
) -> Result<&'a mut InitiativeReplica, ReplicaError> {
    initiatives
        .get_mut(id)
        .map(Arc::make_mut)
        .ok_or_else(|| ReplicaError::UnknownInitiative(id.clone()))
}

/// Re-apply still-pending votes on `replica` after its vote state was
/// replaced by server data. Idempotent: a vote the server already reflects
/// is left alone.
fn reapply_pending_votes(
    replica: &mut InitiativeReplica,
    pending: &mut BTreeMap<MutationKey, SpeculativeMutation>,
) {
    for mutation in pending.values_mut() {
        let SpeculativeMutation::Vote(vote) = mutation else {
            continue;
        };
        if vote.initiative_id != replica.id {
            continue;
        }
        if let Some(preceded_by) = replica.ensure_vote(&vote.user_id, vote.direction) {
            vote.preceded_by = Some(preceded_by);
        }
    }
}
