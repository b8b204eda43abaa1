//! Concurrent mutation tests against a file-backed store.
//!
//! Every thread opens its own connection, exactly as server handlers do.

use gram_core::model::{InitiativeId, NewInitiative, UserId};
use gram_core::service::{CommentService, VoteService};
use gram_core::store::EngagementStore;
use std::sync::{Arc, Barrier};
use std::thread;
use tempfile::TempDir;

fn store_with_initiative() -> (TempDir, EngagementStore, InitiativeId) {
    let dir = tempfile::tempdir().expect("temp dir");
    let store = EngagementStore::open(dir.path().join("gram.sqlite3")).expect("open store");
    let initiative = store
        .create_initiative(&NewInitiative {
            title: "Concurrent".into(),
            description: String::new(),
            creator: UserId::parse("creator").expect("creator"),
            image_url: None,
        })
        .expect("create");
    (dir, store, initiative.id)
}

#[test]
fn concurrent_toggles_by_distinct_users_lose_no_updates() {
    const VOTERS: usize = 16;
    let (_dir, store, id) = store_with_initiative();
    let barrier = Arc::new(Barrier::new(VOTERS));

    let handles: Vec<_> = (0..VOTERS)
        .map(|n| {
            let service = VoteService::new(store.clone());
            let barrier = Arc::clone(&barrier);
            let id = id.to_string();
            thread::spawn(move || {
                barrier.wait();
                service
                    .toggle(&id, Some(&format!("voter-{n}")))
                    .expect("toggle")
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("join");
    }

    let initiative = store.get(&id).expect("get");
    assert_eq!(initiative.vote_count, VOTERS as u64);
    assert_eq!(initiative.liked_by.len(), VOTERS);
    assert!(store.verify_invariants().expect("audit").is_empty());
}

#[test]
fn even_number_of_concurrent_toggles_by_one_user_cancels_out() {
    const TOGGLES: usize = 8;
    let (_dir, store, id) = store_with_initiative();
    let barrier = Arc::new(Barrier::new(TOGGLES));

    let handles: Vec<_> = (0..TOGGLES)
        .map(|_| {
            let service = VoteService::new(store.clone());
            let barrier = Arc::clone(&barrier);
            let id = id.to_string();
            thread::spawn(move || {
                barrier.wait();
                service.toggle(&id, Some("same-user")).expect("toggle")
            })
        })
        .collect();

    let mut counts: Vec<u64> = handles
        .into_iter()
        .map(|h| h.join().expect("join").vote_count)
        .collect();
    counts.sort_unstable();

    let initiative = store.get(&id).expect("get");
    assert_eq!(initiative.vote_count, 0);
    assert!(initiative.liked_by.is_empty());
    // Serialized toggles alternate 1, 0, 1, 0, ...
    assert_eq!(counts.iter().filter(|&&c| c == 1).count(), TOGGLES / 2);
    assert_eq!(counts.iter().filter(|&&c| c == 0).count(), TOGGLES / 2);
}

#[test]
fn concurrent_appends_all_land_with_unique_ids() {
    const WRITERS: usize = 12;
    let (_dir, store, id) = store_with_initiative();
    let barrier = Arc::new(Barrier::new(WRITERS));

    let handles: Vec<_> = (0..WRITERS)
        .map(|n| {
            let service = CommentService::new(store.clone());
            let barrier = Arc::clone(&barrier);
            let id = id.to_string();
            thread::spawn(move || {
                barrier.wait();
                service
                    .append(&id, Some(&format!("writer-{n}")), Some(&format!("comment {n}")))
                    .expect("append")
            })
        })
        .collect();

    let mut receipts: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().expect("join"))
        .collect();
    receipts.sort_by_key(|r| r.comment.id);

    // Each append observed the count it produced.
    let observed: Vec<u64> = receipts.iter().map(|r| r.comment_count).collect();
    let expected: Vec<u64> = (1..=WRITERS as u64).collect();
    assert_eq!(observed, expected);

    let stored = store.comments(&id).expect("comments");
    assert_eq!(stored.len(), WRITERS);
    assert!(stored.windows(2).all(|w| w[0].id < w[1].id));
    assert_eq!(store.get(&id).expect("get").comment_count, WRITERS as u64);
}
