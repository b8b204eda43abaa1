//! Vote Toggle Service.

use super::{require_initiative, require_user};
use crate::error::EngagementError;
use crate::model::VoteTally;
use crate::store::EngagementStore;

#[derive(Debug, Clone)]
pub struct VoteService {
    store: EngagementStore,
}

impl VoteService {
    #[must_use]
    pub const fn new(store: EngagementStore) -> Self {
        Self { store }
    }

    /// Toggle `user_id`'s vote on the initiative.
    ///
    /// A toggle, not a set: calling twice with the same user restores the
    /// original `{voteCount, likedBy}`.
    ///
    /// # Errors
    ///
    /// - [`EngagementError::Validation`] when `user_id` is absent or malformed
    /// - [`EngagementError::NotFound`] when the initiative does not exist
    /// - [`EngagementError::Storage`] when the atomic update fails
    pub fn toggle(
        &self,
        initiative_id: &str,
        user_id: Option<&str>,
    ) -> Result<VoteTally, EngagementError> {
        let user = require_user(user_id)?;
        let id = require_initiative(initiative_id)?;
        self.store.toggle_vote(&id, &user)
    }
}

#[cfg(test)]
mod tests {
    use super::VoteService;
    use crate::error::ErrorCode;
    use crate::store::test_support::{seed, temp_store, user};

    #[test]
    fn toggle_twice_restores_original_state() {
        let (_dir, store) = temp_store();
        let initiative = seed(&store, "Solar lamps");
        let service = VoteService::new(store.clone());

        let cast = service
            .toggle(initiative.id.as_str(), Some("user-a"))
            .expect("cast");
        assert_eq!((cast.vote_count, cast.liked_by.clone()), (1, vec![user("user-a")]));

        let withdrawn = service
            .toggle(initiative.id.as_str(), Some("user-a"))
            .expect("withdraw");
        assert_eq!(withdrawn.vote_count, 0);
        assert!(withdrawn.liked_by.is_empty());
    }

    #[test]
    fn missing_user_is_rejected_before_touching_the_store() {
        let (_dir, store) = temp_store();
        let initiative = seed(&store, "Solar lamps");
        let service = VoteService::new(store.clone());

        let err = service
            .toggle(initiative.id.as_str(), None)
            .expect_err("no user");
        assert_eq!(err.code(), ErrorCode::ValidationFailed);
        assert_eq!(store.get(&initiative.id).expect("get").vote_count, 0);
    }

    #[test]
    fn unknown_initiative_is_not_found() {
        let (_dir, store) = temp_store();
        let service = VoteService::new(store);
        let err = service
            .toggle("in-unknown", Some("user-a"))
            .expect_err("absent");
        assert_eq!(err.code(), ErrorCode::InitiativeNotFound);
        assert_eq!(err.to_string(), "Initiative not found");
    }
}
