//! Invariant audit over every stored initiative.

use super::EngagementStore;
use crate::error::EngagementError;
use crate::model::InitiativeId;
use rusqlite::params;
use std::fmt;

/// Which stored counter disagrees with the rows it summarizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    /// `voteCount` vs. the `likedBy` membership rows.
    Votes,
    /// `commentCount` vs. the comment log.
    Comments,
}

impl fmt::Display for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Votes => f.write_str("voteCount"),
            Self::Comments => f.write_str("commentCount"),
        }
    }
}

/// One initiative whose stored counter drifted from its rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantViolation {
    pub initiative_id: InitiativeId,
    pub counter: Counter,
    pub stored: i64,
    pub actual: i64,
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} is {} but {} rows exist",
            self.initiative_id, self.counter, self.stored, self.actual
        )
    }
}

impl EngagementStore {
    /// Check `voteCount == |likedBy|` and `commentCount == |comments|` for
    /// every initiative. Returns the violations found (empty when healthy).
    ///
    /// Membership duplicates and comment reordering are ruled out by the
    /// schema (composite primary key, `AUTOINCREMENT`) and are not rechecked.
    ///
    /// # Errors
    ///
    /// Returns [`EngagementError::Storage`] if the audit query fails.
    pub fn verify_invariants(&self) -> Result<Vec<InvariantViolation>, EngagementError> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT i.initiative_id,
                    i.vote_count,
                    (SELECT COUNT(*) FROM initiative_votes v
                      WHERE v.initiative_id = i.initiative_id),
                    i.comment_count,
                    (SELECT COUNT(*) FROM initiative_comments c
                      WHERE c.initiative_id = i.initiative_id)
             FROM initiatives i
             ORDER BY i.created_at_us",
        )?;

        let rows = stmt.query_map(params![], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, i64>(4)?,
            ))
        })?;

        let mut violations = Vec::new();
        for row in rows {
            let (raw_id, votes, voters, comment_count, comments) = row?;
            let Ok(initiative_id) = InitiativeId::parse(&raw_id) else {
                continue;
            };
            if votes != voters {
                violations.push(InvariantViolation {
                    initiative_id: initiative_id.clone(),
                    counter: Counter::Votes,
                    stored: votes,
                    actual: voters,
                });
            }
            if comment_count != comments {
                violations.push(InvariantViolation {
                    initiative_id,
                    counter: Counter::Comments,
                    stored: comment_count,
                    actual: comments,
                });
            }
        }

        if !violations.is_empty() {
            tracing::warn!(count = violations.len(), "engagement invariants violated");
        }
        Ok(violations)
    }
}

#[cfg(test)]
mod tests {
    use super::Counter;
    use crate::db;
    use crate::store::test_support::{seed, temp_store, user};
    use rusqlite::params;

    #[test]
    fn healthy_store_has_no_violations() {
        let (_dir, store) = temp_store();
        let initiative = seed(&store, "Audit me");
        store
            .toggle_vote(&initiative.id, &user("a"))
            .expect("vote");
        store
            .append_comment(&initiative.id, &user("a"), "hi")
            .expect("comment");

        assert!(store.verify_invariants().expect("audit").is_empty());
    }

    #[test]
    fn drifted_counters_are_reported() {
        let (_dir, store) = temp_store();
        let initiative = seed(&store, "Drift");
        store
            .toggle_vote(&initiative.id, &user("a"))
            .expect("vote");

        let conn = db::connect(store.path()).expect("connect");
        conn.execute(
            "UPDATE initiatives SET vote_count = 5, comment_count = 2 WHERE initiative_id = ?1",
            params![initiative.id.as_str()],
        )
        .expect("corrupt counters");

        let violations = store.verify_invariants().expect("audit");
        assert_eq!(violations.len(), 2);
        assert_eq!(violations[0].counter, Counter::Votes);
        assert_eq!((violations[0].stored, violations[0].actual), (5, 1));
        assert_eq!(violations[1].counter, Counter::Comments);
        assert!(violations[0].to_string().contains("voteCount is 5 but 1 rows exist"));
    }
}
