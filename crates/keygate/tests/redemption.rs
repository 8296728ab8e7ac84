//! End-to-end issuance and redemption behaviour.

use std::time::Duration;

use keygate::core::{AuditKind, KeyCodec, ServerSecret};
use keygate::store::{EntitlementStore, StoreExt};
use keygate::{KeygateError, Template};
use keygate_testkit::{start_date, subject, TestFixture};

fn tamper_signature(token: &str) -> String {
    let mut chars: Vec<char> = token.chars().collect();
    let last = chars.len() - 1;
    chars[last] = if chars[last] == 'A' { 'B' } else { 'A' };
    chars.into_iter().collect()
}

#[tokio::test]
async fn test_issue_redeem_redeem() {
    let fx = TestFixture::new();
    let alice = subject("alice");
    let token = fx.issue(30).await;

    let redemption = fx.gate.redeem(&alice, &token).await.unwrap();
    assert_eq!(redemption.expires_on, start_date() + chrono::Days::new(30));
    assert!(fx.gate.is_entitled(&alice).await);

    let again = fx.gate.redeem(&alice, &token).await;
    assert!(matches!(again, Err(KeygateError::KeyNotFound)));
    assert_eq!(fx.audit.count(AuditKind::KeyRedeemed), 1);
    assert_eq!(fx.audit.count(AuditKind::InvalidKeyAttempt), 1);
}

#[tokio::test]
async fn test_redeemed_key_leaves_outstanding_set() {
    let fx = TestFixture::new();
    let alice = subject("alice");
    let token = fx.issue(30).await;

    fx.gate.redeem(&alice, &token).await.unwrap();

    let snapshot = fx.store.load_snapshot().await.unwrap();
    assert!(!snapshot.outstanding_keys.contains_key(&token));
    assert_eq!(
        snapshot.grant_expiry(&alice),
        Some(start_date() + chrono::Days::new(30))
    );
}

#[tokio::test]
async fn test_expired_key_rejected() {
    let fx = TestFixture::new();
    let alice = subject("alice");
    let token = fx.issue(1).await;

    fx.clock.advance_days(1);
    let result = fx.gate.redeem(&alice, &token).await;

    assert!(matches!(result, Err(KeygateError::KeyExpired)));
    assert_eq!(fx.audit.count(AuditKind::ExpiredKey), 1);
    assert!(!fx.gate.is_entitled(&alice).await);
    // Still outstanding; expired keys are never purged.
    let snapshot = fx.store.load_snapshot().await.unwrap();
    assert!(snapshot.outstanding_keys.contains_key(&token));
}

#[tokio::test]
async fn test_bad_format_never_touches_store() {
    let fx = TestFixture::new();
    let alice = subject("alice");
    let loads_before = fx.store.load_count();

    let result = fx.gate.redeem(&alice, "definitely-not-a-key").await;

    assert!(matches!(result, Err(KeygateError::InvalidFormat)));
    assert_eq!(fx.store.load_count(), loads_before);
    assert_eq!(fx.audit.count(AuditKind::InvalidKeyFormat), 1);
    let record = fx.gate.rate_limiter().record(&alice).unwrap().unwrap();
    assert_eq!(record.attempt_count, 1);
}

#[tokio::test]
async fn test_bad_signature_never_touches_store() {
    let fx = TestFixture::new();
    let alice = subject("alice");
    let token = fx.issue(30).await;
    let loads_before = fx.store.load_count();

    let result = fx.gate.redeem(&alice, &tamper_signature(&token)).await;

    assert!(matches!(result, Err(KeygateError::InvalidSignature)));
    assert_eq!(fx.store.load_count(), loads_before);
    assert_eq!(fx.audit.count(AuditKind::InvalidKeySignature), 1);
}

#[tokio::test]
async fn test_key_from_other_secret_rejected() {
    let fx = TestFixture::new();
    let alice = subject("alice");
    let foreign = KeyCodec::new(ServerSecret::from_bytes([7u8; 32])).issue(30, start_date());

    let result = fx.gate.redeem(&alice, &foreign.token).await;

    assert!(matches!(result, Err(KeygateError::InvalidSignature)));
}

#[tokio::test]
async fn test_well_signed_but_never_issued_is_not_found() {
    let fx = TestFixture::new();
    let alice = subject("alice");
    let stray = keygate_testkit::codec().issue(30, start_date());

    let result = fx.gate.redeem(&alice, &stray.token).await;

    assert!(matches!(result, Err(KeygateError::KeyNotFound)));
    assert_eq!(fx.audit.count(AuditKind::InvalidKeyAttempt), 1);
}

#[tokio::test]
async fn test_blocked_after_max_attempts_then_reset() {
    let fx = TestFixture::new();
    let alice = subject("alice");
    let token = fx.issue(30).await;

    for _ in 0..3 {
        let _ = fx.gate.redeem(&alice, "garbage").await;
    }

    let blocked = fx.gate.redeem(&alice, &token).await;
    match blocked {
        Err(KeygateError::RateLimited { retry_after }) => {
            assert_eq!(retry_after, Duration::from_secs(60));
        }
        other => panic!("expected RateLimited, got {other:?}"),
    }
    // The blocked attempt is neither counted nor audited.
    let record = fx.gate.rate_limiter().record(&alice).unwrap().unwrap();
    assert_eq!(record.attempt_count, 3);
    assert_eq!(fx.audit.count(AuditKind::InvalidKeyFormat), 3);
    assert_eq!(fx.audit.count(AuditKind::KeyRedeemed), 0);

    fx.clock.advance(Duration::from_secs(60));
    fx.gate.redeem(&alice, &token).await.unwrap();
    assert_eq!(fx.gate.rate_limiter().record(&alice).unwrap(), None);
}

#[tokio::test]
async fn test_rate_limit_is_per_subject() {
    let fx = TestFixture::new();
    let alice = subject("alice");
    let bob = subject("bob");
    let token = fx.issue(30).await;

    for _ in 0..3 {
        let _ = fx.gate.redeem(&alice, "garbage").await;
    }

    fx.gate.redeem(&bob, &token).await.unwrap();
}

#[tokio::test]
async fn test_redeem_args_count_checked_after_rate() {
    let fx = TestFixture::new();
    let alice = subject("alice");

    let result = fx.gate.redeem_args(&alice, &["one", "two"]).await;
    assert!(matches!(result, Err(KeygateError::InvalidFormat)));
    let _ = fx.gate.redeem_args(&alice, &[]).await;
    let _ = fx.gate.redeem_args(&alice, &[]).await;

    let blocked = fx.gate.redeem_args(&alice, &[]).await;
    assert!(matches!(blocked, Err(KeygateError::RateLimited { .. })));
    assert_eq!(fx.audit.count(AuditKind::InvalidKeyFormat), 3);
}

#[tokio::test]
async fn test_redeem_args_normalizes_token() {
    let fx = TestFixture::new();
    let alice = subject("alice");
    let token = fx.issue(30).await;
    let typed = format!(" {} ", token.to_lowercase());

    fx.gate.redeem_args(&alice, &[typed.as_str()]).await.unwrap();

    assert!(fx.gate.is_entitled(&alice).await);
}

#[tokio::test]
async fn test_entitlement_flips_at_expiry() {
    let fx = TestFixture::new();
    let alice = subject("alice");
    let token = fx.issue(10).await;
    fx.gate.redeem(&alice, &token).await.unwrap();

    fx.clock.advance_days(9);
    assert!(fx.gate.is_entitled(&alice).await);

    fx.clock.advance_days(1);
    assert!(!fx.gate.is_entitled(&alice).await);
    assert_eq!(
        fx.gate.grant_expiry(&alice).await.unwrap(),
        Some(start_date() + chrono::Days::new(10))
    );
}

#[tokio::test]
async fn test_later_redemption_replaces_grant() {
    let fx = TestFixture::new();
    let alice = subject("alice");
    let long = fx.issue(90).await;
    let short = fx.issue(5).await;

    fx.gate.redeem(&alice, &long).await.unwrap();
    fx.gate.redeem(&alice, &short).await.unwrap();

    assert_eq!(
        fx.gate.grant_expiry(&alice).await.unwrap(),
        Some(start_date() + chrono::Days::new(5))
    );
}

#[tokio::test]
async fn test_non_admin_cannot_issue() {
    let fx = TestFixture::new();
    let mallory = subject("mallory");

    let result = fx.gate.issue(&mallory, 30).await;

    assert!(matches!(
        result,
        Err(KeygateError::NotAuthorized { ref requester }) if *requester == mallory
    ));
    assert_eq!(fx.audit.count(AuditKind::UnauthorizedKeyGeneration), 1);
    let snapshot = fx.store.load_snapshot().await.unwrap();
    assert_eq!(snapshot.version, 0);
    assert!(snapshot.outstanding_keys.is_empty());
}

#[tokio::test]
async fn test_issue_args_defaults_and_clamps() {
    let fx = TestFixture::new();
    let admin = fx.admin.clone();

    assert_eq!(fx.gate.issue_args(&admin, &[]).await.unwrap().valid_days, 30);
    assert_eq!(fx.gate.issue_args(&admin, &["x"]).await.unwrap().valid_days, 30);
    assert_eq!(fx.gate.issue_args(&admin, &["9000"]).await.unwrap().valid_days, 365);
    assert_eq!(fx.audit.count(AuditKind::KeyGenerated), 3);
}

#[tokio::test]
async fn test_premium_templates_need_entitlement() {
    let fx = TestFixture::new();
    let alice = subject("alice");

    assert_eq!(
        fx.gate.resolve_template(&alice, Template::Modern).await,
        Template::Basic
    );
    assert_eq!(
        fx.gate.resolve_template(&alice, Template::Basic).await,
        Template::Basic
    );

    let token = fx.issue(30).await;
    fx.gate.redeem(&alice, &token).await.unwrap();

    assert_eq!(
        fx.gate.resolve_template(&alice, Template::Creative).await,
        Template::Creative
    );
}

#[tokio::test]
async fn test_corrupt_grant_is_not_entitled() {
    let fx = TestFixture::new();
    let alice = subject("alice");
    fx.store
        .commit(|s| {
            s.grants.insert(
                alice.clone(),
                keygate::core::StoredExpiry::from_raw("2099-02-30"),
            );
            keygate::store::Mutation::Write(())
        })
        .await
        .unwrap();

    assert!(!fx.gate.is_entitled(&alice).await);
}
