//! Postgres store tests.
//!
//! **Requirements:**
//! - PostgreSQL reachable at `DATABASE_URL` (the tests wipe `service_requests`)
//! - Run with `cargo test --test postgres -- --ignored --test-threads=1`

use std::sync::Arc;

use service_desk::models::{NewServiceRequest, RequestStatus};
use service_desk::store::{PgStore, RequestStore, StoreError};

async fn store() -> PgStore {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for postgres tests");
    let store = PgStore::connect(&url).await.unwrap();
    store.migrate().await.unwrap();
    store.clear_all().await.unwrap();
    store
}

fn candidate(name: &str, token: &str) -> NewServiceRequest {
    NewServiceRequest {
        submitted_at: "16/10/2026, 09:30:00".into(),
        requester_name: name.into(),
        requester_phone: "0800000000".into(),
        department: "IT_dep".into(),
        position: "Clerk".into(),
        service_type: "Network".into(),
        details: "VPN drops".into(),
        asset_id: String::new(),
        software_name: String::new(),
        other_topic: String::new(),
        approval_token: token.into(),
    }
}

#[tokio::test]
#[ignore]
async fn test_ranks_renumber_and_ids_do_not_repeat() {
    let db = store().await;
    let a = db.insert(candidate("a", "tok-a")).await.unwrap();
    let b = db.insert(candidate("b", "tok-b")).await.unwrap();
    let c = db.insert(candidate("c", "tok-c")).await.unwrap();
    assert_eq!((a.sort_order, b.sort_order, c.sort_order), (1, 2, 3));

    assert!(db.delete(b.id).await.unwrap());
    assert!(!db.delete(b.id).await.unwrap());
    let ranks: Vec<(i64, i64)> = db
        .list_ordered_by_rank()
        .await
        .unwrap()
        .iter()
        .map(|r| (r.id, r.sort_order))
        .collect();
    assert_eq!(ranks, vec![(a.id, 1), (c.id, 2)]);

    db.clear_all().await.unwrap();
    let d = db.insert(candidate("d", "tok-d")).await.unwrap();
    assert_eq!(d.sort_order, 1);
    assert!(d.id > c.id);
}

#[tokio::test]
#[ignore]
async fn test_duplicate_token_and_conditional_update() {
    let db = store().await;
    let a = db.insert(candidate("a", "tok-dup")).await.unwrap();
    assert!(matches!(
        db.insert(candidate("b", "tok-dup")).await,
        Err(StoreError::TokenConflict)
    ));

    assert!(db
        .update_status(a.id, RequestStatus::PendingApproval, RequestStatus::Disapproved)
        .await
        .unwrap());
    assert!(!db
        .update_status(a.id, RequestStatus::PendingApproval, RequestStatus::ApprovedPendingIT)
        .await
        .unwrap());
    let stored = db.find_by_token("tok-dup").await.unwrap().unwrap();
    assert_eq!(stored.status, RequestStatus::Disapproved);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn test_concurrent_inserts_get_distinct_ranks() {
    let db = Arc::new(store().await);
    let mut handles = Vec::new();
    for i in 0..10 {
        let db = db.clone();
        handles.push(tokio::spawn(async move {
            db.insert(candidate("p", &format!("tok-par-{i}"))).await
        }));
    }
    for h in handles {
        h.await.unwrap().unwrap();
    }
    let mut ranks: Vec<i64> = db
        .list_ordered_by_rank()
        .await
        .unwrap()
        .iter()
        .map(|r| r.sort_order)
        .collect();
    ranks.sort();
    assert_eq!(ranks, (1..=10).collect::<Vec<_>>());
}
