//! Initiative creation/listing and member profiles.

use super::{
    EngagementStore, INITIATIVE_COLUMNS, initiative_from_row, load_comments, load_liked_by,
    user_from_row,
};
use crate::error::EngagementError;
use crate::model::{
    Initiative, InitiativeId, InitiativeView, NewInitiative, User, UserId, micros_to_datetime,
    now_us,
};
use rusqlite::{OptionalExtension, TransactionBehavior, params};
use tracing::info;

impl EngagementStore {
    /// Insert a new initiative with `voteCount = 0` and `commentCount = 0`.
    ///
    /// `created_at` is strictly greater than every existing initiative's, so
    /// the minted id is unique and the listing order is total.
    ///
    /// # Errors
    ///
    /// Returns [`EngagementError::Storage`] if the insert fails.
    pub fn create_initiative(&self, new: &NewInitiative) -> Result<Initiative, EngagementError> {
        let mut conn = self.connect()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let last: i64 = tx.query_row(
            "SELECT COALESCE(MAX(created_at_us), 0) FROM initiatives",
            [],
            |row| row.get(0),
        )?;
        let created_at_us = now_us().max(last.saturating_add(1));
        let id = InitiativeId::from_created_at(created_at_us);

        tx.execute(
            "INSERT INTO initiatives
                (initiative_id, title, description, image_url, creator_id, created_at_us)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                id.as_str(),
                new.title,
                new.description,
                new.image_url,
                new.creator.as_str(),
                created_at_us
            ],
        )?;
        tx.commit()?;

        info!(initiative_id = %id, creator = %new.creator, "initiative created");

        Ok(Initiative {
            id,
            title: new.title.clone(),
            description: new.description.clone(),
            image_url: new.image_url.clone(),
            creator: new.creator.clone(),
            liked_by: Vec::new(),
            vote_count: 0,
            comments: Vec::new(),
            comment_count: 0,
            created_at: micros_to_datetime(created_at_us),
        })
    }

    /// Every initiative, newest first, with its creator's profile when the
    /// creator is a registered user.
    ///
    /// All rows are read inside one transaction and so reflect a single
    /// committed state.
    ///
    /// # Errors
    ///
    /// Returns [`EngagementError::Storage`] if the read fails.
    pub fn list_initiatives(&self) -> Result<Vec<InitiativeView>, EngagementError> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;

        let sql = format!(
            "SELECT {INITIATIVE_COLUMNS},
                    u.user_id, u.fullname, u.email, u.phone_no, u.gender, u.profile_pic_url
             FROM initiatives i
             LEFT JOIN users u ON u.user_id = i.creator_id
             ORDER BY i.created_at_us DESC"
        );
        let mut views = {
            let mut stmt = tx.prepare(&sql)?;
            let rows = stmt.query_map([], |row| {
                let initiative = initiative_from_row(row)?;
                let has_profile: Option<String> = row.get(8)?;
                let creator_profile = match has_profile {
                    Some(_) => Some(user_from_row(row, 8)?),
                    None => None,
                };
                Ok(InitiativeView {
                    initiative,
                    creator_profile,
                })
            })?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };

        for view in &mut views {
            let id = view.initiative.id.clone();
            view.initiative.liked_by = load_liked_by(&tx, &id)?;
            view.initiative.comments = load_comments(&tx, &id)?;
        }
        tx.commit()?;

        Ok(views)
    }

    /// The initiative's image reference, if it has one.
    ///
    /// # Errors
    ///
    /// Returns [`EngagementError::NotFound`] if the initiative is absent.
    pub fn image_url(&self, id: &InitiativeId) -> Result<Option<String>, EngagementError> {
        let conn = self.connect()?;
        let image_url: Option<Option<String>> = conn
            .query_row(
                "SELECT image_url FROM initiatives WHERE initiative_id = ?1",
                params![id.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        image_url.ok_or_else(|| EngagementError::initiative_not_found(id.as_str()))
    }

    /// Register a member profile.
    ///
    /// # Errors
    ///
    /// Returns [`EngagementError::Validation`] when the id, email, or phone
    /// number is already registered, or [`EngagementError::Storage`] on other
    /// failures.
    pub fn register_user(&self, user: &User) -> Result<User, EngagementError> {
        if user.fullname.trim().is_empty() {
            return Err(EngagementError::validation("fullname", "is required"));
        }
        let conn = self.connect()?;
        let result = conn.execute(
            "INSERT INTO users
                (user_id, fullname, email, phone_no, gender, profile_pic_url, created_at_us)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                user.id.as_str(),
                user.fullname,
                user.email,
                user.phone_no,
                user.gender.as_str(),
                user.profile_pic_url,
                now_us()
            ],
        );

        match result {
            Ok(_) => {
                info!(user_id = %user.id, "user registered");
                Ok(user.clone())
            }
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(EngagementError::validation(
                    "userId",
                    "a user with this id, email, or phone number already exists",
                ))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Look up a member profile.
    ///
    /// # Errors
    ///
    /// Returns [`EngagementError::NotFound`] for unknown users.
    pub fn get_user(&self, id: &UserId) -> Result<User, EngagementError> {
        let conn = self.connect()?;
        conn.query_row(
            "SELECT user_id, fullname, email, phone_no, gender, profile_pic_url
             FROM users WHERE user_id = ?1",
            params![id.as_str()],
            |row| user_from_row(row, 0),
        )
        .optional()?
        .ok_or_else(|| EngagementError::user_not_found(id.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use crate::error::ErrorCode;
    use crate::model::{Gender, InitiativeId, NewInitiative, User};
    use crate::store::test_support::{seed, temp_store, user};

    fn profile(id: &str, email: Option<&str>) -> User {
        User {
            id: user(id),
            fullname: format!("{id} fullname"),
            email: email.map(str::to_string),
            phone_no: None,
            gender: Gender::Female,
            profile_pic_url: None,
        }
    }

    #[test]
    fn create_seeds_zero_counters_and_unique_ids() {
        let (_dir, store) = temp_store();
        let a = seed(&store, "First");
        let b = seed(&store, "Second");

        assert_ne!(a.id, b.id);
        assert!(b.created_at > a.created_at);
        assert_eq!(a.vote_count, 0);
        assert_eq!(a.comment_count, 0);
    }

    #[test]
    fn list_is_newest_first_with_creator_resolved() {
        let (_dir, store) = temp_store();
        store
            .register_user(&profile("creator", None))
            .expect("register");
        let older = seed(&store, "Older");
        let newer = store
            .create_initiative(&NewInitiative {
                title: "Newer".into(),
                description: String::new(),
                creator: user("stranger"),
                image_url: Some("http://media/initiatives/a.png".into()),
            })
            .expect("create");

        let listed = store.list_initiatives().expect("list");
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].initiative.id, newer.id);
        assert_eq!(listed[1].initiative.id, older.id);
        assert!(listed[0].creator_profile.is_none());
        assert_eq!(
            listed[1]
                .creator_profile
                .as_ref()
                .map(|u| u.fullname.as_str()),
            Some("creator fullname")
        );
    }

    #[test]
    fn list_carries_votes_and_comments() {
        let (_dir, store) = temp_store();
        let initiative = seed(&store, "Benches");
        store
            .toggle_vote(&initiative.id, &user("v1"))
            .expect("vote");
        store
            .append_comment(&initiative.id, &user("v1"), "yes please")
            .expect("comment");

        let listed = store.list_initiatives().expect("list");
        let row = &listed[0].initiative;
        assert_eq!(row.vote_count, 1);
        assert_eq!(row.liked_by, vec![user("v1")]);
        assert_eq!(row.comment_count, 1);
        assert_eq!(row.comments[0].text, "yes please");
    }

    #[test]
    fn image_url_distinguishes_missing_image_from_missing_initiative() {
        let (_dir, store) = temp_store();
        let initiative = seed(&store, "No picture");
        assert_eq!(store.image_url(&initiative.id).expect("lookup"), None);

        let err = store
            .image_url(&InitiativeId::parse("in-none").expect("id"))
            .expect_err("absent");
        assert_eq!(err.code(), ErrorCode::InitiativeNotFound);
    }

    #[test]
    fn duplicate_user_is_a_validation_error() {
        let (_dir, store) = temp_store();
        store
            .register_user(&profile("asha", Some("asha@example.org")))
            .expect("first");

        let err = store
            .register_user(&profile("asha", None))
            .expect_err("duplicate id");
        assert_eq!(err.code(), ErrorCode::ValidationFailed);

        let err = store
            .register_user(&profile("asha2", Some("asha@example.org")))
            .expect_err("duplicate email");
        assert_eq!(err.code(), ErrorCode::ValidationFailed);
    }

    #[test]
    fn get_user_round_trips_profile() {
        let (_dir, store) = temp_store();
        let registered = store
            .register_user(&profile("ravi", Some("ravi@example.org")))
            .expect("register");
        assert_eq!(store.get_user(&user("ravi")).expect("get"), registered);

        let err = store.get_user(&user("nobody")).expect_err("absent");
        assert_eq!(err.code(), ErrorCode::UserNotFound);
    }
}
