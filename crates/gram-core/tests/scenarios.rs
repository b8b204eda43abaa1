//! Server-side walkthroughs of the engagement scenarios.

use gram_core::error::ErrorCode;
use gram_core::model::{NewInitiative, UserId};
use gram_core::service::{CommentService, VoteService};
use gram_core::store::EngagementStore;

fn setup() -> (tempfile::TempDir, EngagementStore, String) {
    let dir = tempfile::tempdir().expect("temp dir");
    let store = EngagementStore::open(dir.path().join("gram.sqlite3")).expect("open");
    let id = store
        .create_initiative(&NewInitiative {
            title: "Riverside clean-up".into(),
            description: "Saturday morning".into(),
            creator: UserId::parse("organizer").expect("id"),
            image_url: None,
        })
        .expect("create")
        .id
        .to_string();
    (dir, store, id)
}

#[test]
fn single_vote_then_withdraw() {
    let (_dir, store, id) = setup();
    let votes = VoteService::new(store);

    let cast = votes.toggle(&id, Some("user-a")).expect("cast");
    assert_eq!(cast.vote_count, 1);
    assert_eq!(cast.liked_by, vec![UserId::parse("user-a").expect("id")]);

    let withdrawn = votes.toggle(&id, Some("user-a")).expect("withdraw");
    assert_eq!(withdrawn.vote_count, 0);
    assert!(withdrawn.liked_by.is_empty());
}

#[test]
fn two_users_vote_concurrently() {
    let (_dir, store, id) = setup();

    let a = {
        let votes = VoteService::new(store.clone());
        let id = id.clone();
        std::thread::spawn(move || votes.toggle(&id, Some("user-a")).expect("a"))
    };
    let b = {
        let votes = VoteService::new(store.clone());
        let id = id.clone();
        std::thread::spawn(move || votes.toggle(&id, Some("user-b")).expect("b"))
    };
    let mut seen = [a.join().expect("join a").vote_count, b.join().expect("join b").vote_count];
    seen.sort_unstable();
    assert_eq!(seen, [1, 2]);

    let final_state = store
        .get(&gram_core::model::InitiativeId::parse(&id).expect("id"))
        .expect("get");
    assert_eq!(final_state.vote_count, 2);
    let mut voters: Vec<_> = final_state.liked_by.iter().map(ToString::to_string).collect();
    voters.sort();
    assert_eq!(voters, vec!["user-a", "user-b"]);
}

#[test]
fn missing_initiative_fails_with_not_found() {
    let (_dir, store, _id) = setup();
    let votes = VoteService::new(store.clone());
    let comments = CommentService::new(store);

    let err = votes.toggle("in-deadbeef", Some("user-a")).expect_err("vote");
    assert_eq!(err.code(), ErrorCode::InitiativeNotFound);
    assert_eq!(err.code().http_status(), 404);
    assert_eq!(err.to_string(), "Initiative not found");

    let err = comments
        .append("in-deadbeef", Some("user-a"), Some("hello"))
        .expect_err("comment");
    assert_eq!(err.code(), ErrorCode::InitiativeNotFound);
}
