use super::comment::Comment;
use super::user::{User, UserId};
use crate::error::EngagementError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const MAX_INITIATIVE_ID_LEN: usize = 128;
pub const MAX_TITLE_LEN: usize = 200;

/// Opaque, stable initiative identifier (`in-<hex micros>` when minted here).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InitiativeId(String);

impl InitiativeId {
    /// Accept a caller-supplied identifier.
    ///
    /// Identifiers are opaque, so the only shape check is non-empty and
    /// bounded; anything that fails it cannot name a stored initiative.
    ///
    /// # Errors
    ///
    /// Returns [`EngagementError::NotFound`] for empty or oversized input.
    pub fn parse(raw: &str) -> Result<Self, EngagementError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.len() > MAX_INITIATIVE_ID_LEN {
            return Err(EngagementError::initiative_not_found(raw));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Mint the identifier for an initiative created at `created_at_us`.
    #[must_use]
    pub fn from_created_at(created_at_us: i64) -> Self {
        Self(format!("in-{created_at_us:x}"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InitiativeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Authoritative initiative aggregate.
///
/// Invariants after every committed mutation:
/// - `vote_count == liked_by.len()`
/// - `comment_count == comments.len()`
/// - `liked_by` holds no duplicates
/// - `comments` is in append order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Initiative {
    pub id: InitiativeId,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub creator: UserId,
    pub liked_by: Vec<UserId>,
    pub vote_count: u64,
    pub comments: Vec<Comment>,
    pub comment_count: u64,
    pub created_at: DateTime<Utc>,
}

/// Listing row: the initiative plus its creator's profile when known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiativeView {
    #[serde(flatten)]
    pub initiative: Initiative,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator_profile: Option<User>,
}

/// Input for creating an initiative. Counters are always seeded at zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInitiative {
    pub title: String,
    pub description: String,
    pub creator: UserId,
    pub image_url: Option<String>,
}

/// Vote state after a toggle, as returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteTally {
    pub initiative_id: InitiativeId,
    pub vote_count: u64,
    pub liked_by: Vec<UserId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minted_ids_are_distinct_per_timestamp() {
        let a = InitiativeId::from_created_at(1_700_000_000_000_000);
        let b = InitiativeId::from_created_at(1_700_000_000_000_001);
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("in-"));
    }

    #[test]
    fn parse_treats_blank_as_not_found() {
        let err = InitiativeId::parse("  ").expect_err("blank id");
        assert_eq!(err.to_string(), "Initiative not found");
    }

    #[test]
    fn vote_tally_uses_camel_case_wire_names() {
        let tally = VoteTally {
            initiative_id: InitiativeId::parse("in-1").expect("id"),
            vote_count: 1,
            liked_by: vec![UserId::parse("alice").expect("user")],
        };
        let json = serde_json::to_value(&tally).expect("serialize");
        assert_eq!(json["initiativeId"], "in-1");
        assert_eq!(json["voteCount"], 1);
        assert_eq!(json["likedBy"][0], "alice");
    }
}
