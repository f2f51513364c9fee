//! Integration tests for Redis-backed verification codes
//!
//! These tests require a running Redis instance.
//! Run with: cargo test -p verify-code --test redis_verify_code_test -- --ignored

use agora_common::AppSettings;
use redis_utils::RedisPool;
use verify_code::{RedisVerifyCodeStore, VerifyCodeIssuer, VerifyCodeSettings, VerifyCodeStore};

async fn store() -> RedisVerifyCodeStore {
    let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379/15".to_string());
    let pool = RedisPool::connect_url(&url)
        .await
        .expect("Failed to connect to Redis");
    let settings = VerifyCodeSettings {
        prefix: "it:verifycode:".to_string(),
        ..VerifyCodeSettings::for_app(&AppSettings::default())
    };
    RedisVerifyCodeStore::from_pool(&pool, settings)
}

#[tokio::test]
#[ignore] // Requires Redis server
async fn test_issue_read_and_clear() {
    let store = store().await;

    assert!(store.set("phone:13800138000", "1234").await);
    assert_eq!(store.get("phone:13800138000", true).await, "1234");
    assert_eq!(store.get("phone:13800138000", false).await, "");
}

#[tokio::test]
#[ignore] // Requires Redis server
async fn test_code_carries_ttl() {
    let store = store().await;
    store.set("email:ttl@agora.dev", "5678").await;

    let mut conn = {
        let pool = RedisPool::connect_url(
            &std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379/15".to_string()),
        )
        .await
        .unwrap();
        let manager = pool.manager();
        let guard = manager.lock().await;
        guard.clone()
    };
    let ttl: i64 = redis::cmd("PTTL")
        .arg("it:verifycode:email:ttl@agora.dev")
        .query_async(&mut conn)
        .await
        .unwrap();
    assert!(ttl > 0 && ttl <= 15 * 60 * 1000);

    store.get("email:ttl@agora.dev", true).await;
}

#[tokio::test]
#[ignore] // Requires Redis server
async fn test_issuer_round_trip() {
    let store = store().await;
    let issuer = VerifyCodeIssuer::new(store, VerifyCodeSettings::for_app(&AppSettings::default()));

    let code = issuer.issue("phone:13900139000").await.expect("code stored");
    assert!(issuer.check_answer("phone:13900139000", &code).await);
    assert!(!issuer.check_answer("phone:13900139000", &code).await);
}

#[tokio::test]
#[ignore] // Requires Redis server
async fn test_concurrent_clearing_verifies_accept_once() {
    let store = store().await;
    assert!(store.set("phone:race", "424242").await);

    let (first, second) = tokio::join!(
        store.verify("phone:race", "424242", true),
        store.verify("phone:race", "424242", true),
    );
    assert!(first ^ second, "first={} second={}", first, second);
}
