//! Request-facing services over the [`EngagementStore`](crate::store::EngagementStore).
//!
//! Services own input validation and then delegate to exactly one atomic
//! store primitive. Inputs arrive as raw optional strings because that is
//! what the HTTP and CLI surfaces hand over.

pub mod comment;
pub mod initiative;
pub mod vote;

pub use comment::CommentService;
pub use initiative::{CreateInitiative, ImageUpload, InitiativeService};
pub use vote::VoteService;

use crate::error::EngagementError;
use crate::model::{InitiativeId, UserId};

/// Require a well-formed acting user id.
///
/// # Errors
///
/// Returns [`EngagementError::Validation`] when absent or malformed.
pub fn require_user(raw: Option<&str>) -> Result<UserId, EngagementError> {
    match raw {
        Some(raw) => UserId::parse(raw),
        None => Err(EngagementError::validation("userId", "is required")),
    }
}

/// Resolve a path-supplied initiative id.
///
/// # Errors
///
/// Returns [`EngagementError::NotFound`] for ids that cannot name an initiative.
pub fn require_initiative(raw: &str) -> Result<InitiativeId, EngagementError> {
    InitiativeId::parse(raw)
}

/// Validate comment text: present, non-blank, at most `max_chars`
/// characters, and free of control characters other than newline and tab.
///
/// # Errors
///
/// Returns [`EngagementError::Validation`] on `text`.
pub fn validate_comment_text(
    text: Option<&str>,
    max_chars: usize,
) -> Result<&str, EngagementError> {
    let Some(text) = text else {
        return Err(EngagementError::validation("text", "is required"));
    };

    if text.trim().is_empty() {
        return Err(EngagementError::validation("text", "must not be empty"));
    }

    let chars = text.chars().count();
    if chars > max_chars {
        return Err(EngagementError::validation(
            "text",
            format!("must be <= {max_chars} characters (got {chars})"),
        ));
    }

    if text
        .chars()
        .any(|ch| ch.is_control() && ch != '\n' && ch != '\t')
    {
        return Err(EngagementError::validation(
            "text",
            "must not contain control characters",
        ));
    }

    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn missing_user_is_validation_error() {
        let err = require_user(None).expect_err("missing");
        assert_eq!(err.code(), ErrorCode::ValidationFailed);
        assert_eq!(err.to_string(), "invalid userId: is required");
    }

    #[test]
    fn comment_text_rules() {
        assert_eq!(validate_comment_text(Some("line\n\tnext"), 100).expect("ok"), "line\n\tnext");
        assert!(validate_comment_text(None, 100).is_err());
        assert!(validate_comment_text(Some("   "), 100).is_err());
        assert!(validate_comment_text(Some("bell\u{7}"), 100).is_err());
        assert!(validate_comment_text(Some("abcdef"), 5).is_err());
        assert!(validate_comment_text(Some("ééééé"), 5).is_ok());
    }
}
