//! Concurrent redemption behaviour.

use std::sync::Arc;

use keygate::core::AuditKind;
use keygate::store::EntitlementStore;
use keygate::KeygateError;
use keygate_testkit::{subject, TestFixture};

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_same_token_many_subjects_one_winner() {
    let fx = Arc::new(TestFixture::new());
    let token = fx.issue(30).await;
    let mut handles = Vec::new();

    for i in 0..16 {
        let fx = Arc::clone(&fx);
        let token = token.clone();
        handles.push(tokio::spawn(async move {
            let who = subject(&format!("user-{i}"));
            fx.gate.redeem(&who, &token).await.map(|r| r.subject)
        }));
    }

    let mut winners = Vec::new();
    for handle in handles {
        match handle.await.unwrap() {
            Ok(who) => winners.push(who),
            Err(KeygateError::KeyNotFound) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(winners.len(), 1);
    assert_eq!(fx.audit.count(AuditKind::KeyRedeemed), 1);
    assert_eq!(fx.audit.count(AuditKind::InvalidKeyAttempt), 15);

    let snapshot = fx.store.load_snapshot().await.unwrap();
    assert_eq!(snapshot.grants.len(), 1);
    assert!(snapshot.grants.contains_key(&winners[0]));
    assert!(snapshot.outstanding_keys.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_same_subject_same_token_once() {
    let fx = Arc::new(TestFixture::new());
    let token = fx.issue(30).await;
    let alice = subject("alice");
    let mut handles = Vec::new();

    for _ in 0..2 {
        let fx = Arc::clone(&fx);
        let token = token.clone();
        let alice = alice.clone();
        handles.push(tokio::spawn(async move {
            fx.gate.redeem(&alice, &token).await
        }));
    }

    let mut ok = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            ok += 1;
        }
    }

    assert_eq!(ok, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_distinct_keys_all_redeem() {
    let fx = Arc::new(TestFixture::new());
    let mut tokens = Vec::new();
    for _ in 0..12 {
        tokens.push(fx.issue(30).await);
    }

    let mut handles = Vec::new();
    for (i, token) in tokens.into_iter().enumerate() {
        let fx = Arc::clone(&fx);
        handles.push(tokio::spawn(async move {
            fx.gate.redeem(&subject(&format!("user-{i}")), &token).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let snapshot = fx.store.load_snapshot().await.unwrap();
    assert_eq!(snapshot.grants.len(), 12);
    assert!(snapshot.outstanding_keys.is_empty());
    // 12 issuances + 12 redemptions, no lost updates.
    assert_eq!(snapshot.version, 24);
}
