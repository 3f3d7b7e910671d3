//! Link queue durability across restarts, corruption and concurrency.

mod common;

use std::sync::Arc;

use common::{key, Harness};
use wwa_core::application::Reply;
use wwa_core::domain::{NormalizedUrl, RequesterKey};
use wwa_core::port::{AddOutcome, QueueStore};
use wwa_core::port::time_provider::SystemTimeProvider;
use wwa_infra_sqlite::{create_pool, run_migrations, SqliteQueueStore};

fn listing(reply: Reply) -> Vec<String> {
    match reply {
        Reply::Listing(links) => links.to_strings(),
        other => panic!("expected listing, got {:?}", other),
    }
}

#[tokio::test]
async fn test_queue_survives_restart() {
    let harness = Harness::new();
    {
        let service = harness.service().await;
        service
            .profile_reply(&key(), "add https://github.com/alice https://alice.dev/")
            .await
            .unwrap();
    }

    let service = harness.service().await;
    let links = listing(service.profile_reply(&key(), "list").await.unwrap());
    assert_eq!(links, vec!["https://github.com/alice", "https://alice.dev"]);

    service.profile_reply(&key(), "clear").await.unwrap();
    let service = harness.service().await;
    assert!(listing(service.profile_reply(&key(), "list").await.unwrap()).is_empty());
}

#[tokio::test]
async fn test_corrupt_entry_affects_only_its_requester() {
    let harness = Harness::new();
    let service = harness.service().await;
    let other = RequesterKey::new("discord", "bot", "7");
    service
        .profile_reply(&other, "add https://bob.dev")
        .await
        .unwrap();

    let pool = create_pool(&harness.db_path()).await.unwrap();
    sqlx::query("INSERT INTO link_queue (requester_key, urls, updated_at) VALUES (?, ?, 0)")
        .bind(key().as_str())
        .bind("[\"https://a.com\", 42")
        .execute(&pool)
        .await
        .unwrap();

    assert!(listing(service.profile_reply(&key(), "list").await.unwrap()).is_empty());
    let reply = service
        .profile_reply(&key(), "add https://a.com")
        .await
        .unwrap();
    assert_eq!(reply, Reply::Queued(AddOutcome { added: 1, total: 1 }));
    assert_eq!(
        listing(service.profile_reply(&other, "list").await.unwrap()),
        vec!["https://bob.dev"]
    );
}

#[tokio::test]
async fn test_startup_sweep_purges_corrupt_rows() {
    let harness = Harness::new();
    let pool = create_pool(&harness.db_path()).await.unwrap();
    run_migrations(&pool).await.unwrap();
    for (requester, urls) in [("a:b:1", "nope"), ("a:b:2", "{}"), ("a:b:3", "[\"https://ok.dev\"]")] {
        sqlx::query("INSERT INTO link_queue (requester_key, urls, updated_at) VALUES (?, ?, 0)")
            .bind(requester)
            .bind(urls)
            .execute(&pool)
            .await
            .unwrap();
    }

    let store = SqliteQueueStore::new(pool.clone(), Arc::new(SystemTimeProvider));
    assert_eq!(store.purge_malformed().await.unwrap(), 2);

    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM link_queue")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(remaining, 1);
}

#[tokio::test]
async fn test_concurrent_adds_lose_nothing() {
    let harness = Harness::new();
    let service = Arc::new(harness.service().await);

    let mut handles = Vec::new();
    for i in 0..12 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            let requester = if i % 2 == 0 {
                key()
            } else {
                RequesterKey::new("discord", "bot", "7")
            };
            service
                .profile_reply(&requester, &format!("add https://site{}.dev", i))
                .await
                .unwrap()
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let ours = listing(service.profile_reply(&key(), "list").await.unwrap());
    let theirs = listing(
        service
            .profile_reply(&RequesterKey::new("discord", "bot", "7"), "list")
            .await
            .unwrap(),
    );
    assert_eq!(ours.len(), 6);
    assert_eq!(theirs.len(), 6);
    assert!(ours.iter().all(|u| !theirs.contains(u)));
}

#[tokio::test]
async fn test_take_is_atomic_with_a_second_store() {
    let harness = Harness::new();
    let pool = create_pool(&harness.db_path()).await.unwrap();
    run_migrations(&pool).await.unwrap();
    let first = SqliteQueueStore::new(pool, Arc::new(SystemTimeProvider));
    let urls: Vec<NormalizedUrl> = ["https://a.dev", "https://b.dev"]
        .iter()
        .map(|u| NormalizedUrl::parse(u).unwrap())
        .collect();
    first.add(&key(), &urls).await.unwrap();

    let other_pool = create_pool(&harness.db_path()).await.unwrap();
    let second = SqliteQueueStore::new(other_pool, Arc::new(SystemTimeProvider));

    let (k1, k2) = (key(), key());
    let (a, b) = tokio::join!(first.take(&k1, false), second.take(&k2, false));
    let taken = a.unwrap().len() + b.unwrap().len();
    assert_eq!(taken, 2);
    assert!(first.list(&key()).await.unwrap().is_empty());
}
