//! Atomic vote toggle and comment append.

use super::{EngagementStore, load_liked_by};
use crate::error::EngagementError;
use crate::model::{
    Comment, CommentId, CommentReceipt, InitiativeId, UserId, VoteTally, micros_to_datetime,
    now_us,
};
use rusqlite::{Connection, TransactionBehavior, params};
use tracing::debug;

impl EngagementStore {
    /// Flip `user`'s membership in the initiative's `likedBy` set.
    ///
    /// Runs as one `IMMEDIATE` transaction: delete the vote row if present
    /// and decrement, otherwise increment and insert. The counter is only ever
    /// adjusted relative to its stored value, so concurrent toggles by
    /// different users never lose an update.
    ///
    /// # Errors
    ///
    /// Returns [`EngagementError::NotFound`] if the initiative is absent, or
    /// [`EngagementError::Storage`] if the transaction fails. Nothing is
    /// committed on error.
    pub fn toggle_vote(
        &self,
        id: &InitiativeId,
        user: &UserId,
    ) -> Result<VoteTally, EngagementError> {
        let mut conn = self.connect()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let removed = tx.execute(
            "DELETE FROM initiative_votes WHERE initiative_id = ?1 AND user_id = ?2",
            params![id.as_str(), user.as_str()],
        )?;

        if removed == 1 {
            tx.execute(
                "UPDATE initiatives SET vote_count = vote_count - 1 WHERE initiative_id = ?1",
                params![id.as_str()],
            )?;
        } else {
            let bumped = tx.execute(
                "UPDATE initiatives SET vote_count = vote_count + 1 WHERE initiative_id = ?1",
                params![id.as_str()],
            )?;
            if bumped == 0 {
                return Err(EngagementError::initiative_not_found(id.as_str()));
            }
            tx.execute(
                "INSERT INTO initiative_votes (initiative_id, user_id, voted_at_us)
                 VALUES (?1, ?2, ?3)",
                params![id.as_str(), user.as_str(), now_us()],
            )?;
        }

        let vote_count = stored_counter(&tx, "vote_count", id)?;
        let liked_by = load_liked_by(&tx, id)?;
        tx.commit()?;

        debug!(
            initiative_id = %id,
            user_id = %user,
            cast = removed == 0,
            vote_count,
            "vote toggled"
        );

        Ok(VoteTally {
            initiative_id: id.clone(),
            vote_count,
            liked_by,
        })
    }

    /// Append a comment and increment `commentCount` in one transaction.
    ///
    /// The comment id is the table's `AUTOINCREMENT` key, so ids are unique
    /// and strictly increasing in commit order.
    ///
    /// # Errors
    ///
    /// Returns [`EngagementError::NotFound`] if the initiative is absent, or
    /// [`EngagementError::Storage`] if the transaction fails.
    pub fn append_comment(
        &self,
        id: &InitiativeId,
        author: &UserId,
        text: &str,
    ) -> Result<CommentReceipt, EngagementError> {
        let mut conn = self.connect()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let bumped = tx.execute(
            "UPDATE initiatives SET comment_count = comment_count + 1 WHERE initiative_id = ?1",
            params![id.as_str()],
        )?;
        if bumped == 0 {
            return Err(EngagementError::initiative_not_found(id.as_str()));
        }

        let created_at_us = now_us();
        tx.execute(
            "INSERT INTO initiative_comments (initiative_id, author_id, body, created_at_us)
             VALUES (?1, ?2, ?3, ?4)",
            params![id.as_str(), author.as_str(), text, created_at_us],
        )?;
        let comment_id = CommentId(tx.last_insert_rowid());
        let comment_count = stored_counter(&tx, "comment_count", id)?;
        tx.commit()?;

        debug!(
            initiative_id = %id,
            author = %author,
            comment_id = %comment_id,
            comment_count,
            "comment appended"
        );

        Ok(CommentReceipt {
            comment: Comment {
                id: comment_id,
                author: author.clone(),
                text: text.to_string(),
                created_at: micros_to_datetime(created_at_us),
            },
            comment_count,
        })
    }
}

fn stored_counter(
    conn: &Connection,
    column: &'static str,
    id: &InitiativeId,
) -> rusqlite::Result<u64> {
    let sql = format!("SELECT {column} FROM initiatives WHERE initiative_id = ?1");
    conn.query_row(&sql, params![id.as_str()], |row| {
        super::counter_column(row, 0)
    })
}

#[cfg(test)]
mod tests {
    use crate::error::ErrorCode;
    use crate::model::InitiativeId;
    use crate::store::test_support::{seed, temp_store, user};

    #[test]
    fn first_vote_casts() {
        let (_dir, store) = temp_store();
        let initiative = seed(&store, "Repaint the library");

        let tally = store
            .toggle_vote(&initiative.id, &user("user-a"))
            .expect("toggle");
        assert_eq!(tally.vote_count, 1);
        assert_eq!(tally.liked_by, vec![user("user-a")]);
    }

    #[test]
    fn second_toggle_by_same_user_restores_state() {
        let (_dir, store) = temp_store();
        let initiative = seed(&store, "Repaint the library");
        store
            .toggle_vote(&initiative.id, &user("user-a"))
            .expect("cast");

        let tally = store
            .toggle_vote(&initiative.id, &user("user-a"))
            .expect("withdraw");
        assert_eq!(tally.vote_count, 0);
        assert!(tally.liked_by.is_empty());
        assert_eq!(store.get(&initiative.id).expect("get").vote_count, 0);
    }

    #[test]
    fn liked_by_keeps_vote_order() {
        let (_dir, store) = temp_store();
        let initiative = seed(&store, "Bike racks");
        for who in ["c", "a", "b"] {
            store.toggle_vote(&initiative.id, &user(who)).expect("cast");
        }
        let tally = store.toggle_vote(&initiative.id, &user("a")).expect("withdraw");
        assert_eq!(tally.liked_by, vec![user("c"), user("b")]);
        assert_eq!(tally.vote_count, 2);
    }

    #[test]
    fn toggle_on_unknown_initiative_commits_nothing() {
        let (_dir, store) = temp_store();
        let missing = InitiativeId::parse("in-missing").expect("id");

        let err = store
            .toggle_vote(&missing, &user("user-a"))
            .expect_err("absent");
        assert_eq!(err.code(), ErrorCode::InitiativeNotFound);
        assert!(store.verify_invariants().expect("audit").is_empty());
    }

    #[test]
    fn append_assigns_increasing_ids_and_counts() {
        let (_dir, store) = temp_store();
        let initiative = seed(&store, "Community garden");

        let first = store
            .append_comment(&initiative.id, &user("u1"), "hello")
            .expect("append");
        let second = store
            .append_comment(&initiative.id, &user("u2"), "world")
            .expect("append");

        assert!(second.comment.id > first.comment.id);
        assert_eq!(first.comment_count, 1);
        assert_eq!(second.comment_count, 2);

        let texts: Vec<_> = store
            .comments(&initiative.id)
            .expect("comments")
            .into_iter()
            .map(|c| c.text)
            .collect();
        assert_eq!(texts, vec!["hello", "world"]);
    }

    #[test]
    fn append_on_unknown_initiative_is_not_found() {
        let (_dir, store) = temp_store();
        let err = store
            .append_comment(
                &InitiativeId::parse("in-gone").expect("id"),
                &user("u1"),
                "hi",
            )
            .expect_err("absent");
        assert_eq!(err.code(), ErrorCode::InitiativeNotFound);
    }
}
