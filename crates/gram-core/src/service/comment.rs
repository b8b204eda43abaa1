//! Comment Append Service.

use super::{require_initiative, require_user, validate_comment_text};
use crate::config::DEFAULT_MAX_COMMENT_CHARS;
use crate::error::EngagementError;
use crate::model::{Comment, CommentReceipt};
use crate::store::EngagementStore;

#[derive(Debug, Clone)]
pub struct CommentService {
    store: EngagementStore,
    max_chars: usize,
}

impl CommentService {
    #[must_use]
    pub const fn new(store: EngagementStore) -> Self {
        Self {
            store,
            max_chars: DEFAULT_MAX_COMMENT_CHARS,
        }
    }

    #[must_use]
    pub const fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    /// Append a comment. There is no edit or delete.
    ///
    /// # Errors
    ///
    /// - [`EngagementError::Validation`] on a missing/malformed author or
    ///   missing/blank/oversized text
    /// - [`EngagementError::NotFound`] when the initiative does not exist
    /// - [`EngagementError::Storage`] when the atomic append fails
    pub fn append(
        &self,
        initiative_id: &str,
        author: Option<&str>,
        text: Option<&str>,
    ) -> Result<CommentReceipt, EngagementError> {
        let author = require_user(author)?;
        let text = validate_comment_text(text, self.max_chars)?;
        let id = require_initiative(initiative_id)?;
        self.store.append_comment(&id, &author, text)
    }

    /// All comments on the initiative in append order.
    ///
    /// # Errors
    ///
    /// Returns [`EngagementError::NotFound`] when the initiative does not exist.
    pub fn list(&self, initiative_id: &str) -> Result<Vec<Comment>, EngagementError> {
        let id = require_initiative(initiative_id)?;
        self.store.comments(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::CommentService;
    use crate::error::ErrorCode;
    use crate::store::test_support::{seed, temp_store, user};

    #[test]
    fn append_returns_canonical_comment_and_count() {
        let (_dir, store) = temp_store();
        let initiative = seed(&store, "Library hours");
        let service = CommentService::new(store);

        let receipt = service
            .append(initiative.id.as_str(), Some("u1"), Some("Open on Sundays"))
            .expect("append");
        assert_eq!(receipt.comment_count, 1);
        assert_eq!(receipt.comment.author, user("u1"));
        assert_eq!(receipt.comment.text, "Open on Sundays");

        let listed = service.list(initiative.id.as_str()).expect("list");
        assert_eq!(listed, vec![receipt.comment]);
    }

    #[test]
    fn configured_limit_applies() {
        let (_dir, store) = temp_store();
        let initiative = seed(&store, "Short takes");
        let service = CommentService::new(store).with_max_chars(4);

        let err = service
            .append(initiative.id.as_str(), Some("u1"), Some("too long"))
            .expect_err("oversized");
        assert_eq!(err.code(), ErrorCode::ValidationFailed);
    }

    #[test]
    fn blank_text_and_missing_author_are_rejected() {
        let (_dir, store) = temp_store();
        let initiative = seed(&store, "Quiet please");
        let service = CommentService::new(store.clone());

        for (author, text) in [(Some("u1"), Some("  ")), (None, Some("hi")), (Some("u1"), None)] {
            let err = service
                .append(initiative.id.as_str(), author, text)
                .expect_err("invalid");
            assert_eq!(err.code(), ErrorCode::ValidationFailed);
        }
        assert_eq!(store.get(&initiative.id).expect("get").comment_count, 0);
    }
}
