//! Property tests over arbitrary and tampered tokens.

use keygate::core::AuditKind;
use keygate::KeygateError;
use keygate_testkit::generators::{arbitrary_input, subject_id, tamper, token_shaped, valid_days};
use keygate_testkit::{start_date, TestFixture};
use proptest::prelude::*;
use tokio::runtime::Runtime;

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_tampered_token_never_grants(index in 0usize..64, pick in 0usize..64, who in subject_id()) {
        runtime().block_on(async {
            let fx = TestFixture::new();
            let token = fx.issue(30).await;
            let forged = tamper(&token, index, pick);

            let result = fx.gate.redeem(&who, &forged).await;

            prop_assert!(matches!(
                result,
                Err(KeygateError::InvalidFormat) | Err(KeygateError::InvalidSignature)
            ));
            prop_assert!(!fx.gate.is_entitled(&who).await);
            prop_assert_eq!(fx.audit.count(AuditKind::KeyRedeemed), 0);
            Ok(())
        })?;
    }

    #[test]
    fn prop_arbitrary_input_never_grants(input in arbitrary_input(), who in subject_id()) {
        runtime().block_on(async {
            let fx = TestFixture::new();
            fx.issue(30).await;

            prop_assert!(fx.gate.redeem(&who, &input).await.is_err());
            prop_assert!(!fx.gate.is_entitled(&who).await);
            Ok(())
        })?;
    }

    #[test]
    fn prop_forged_signature_rejected(token in token_shaped(), who in subject_id()) {
        runtime().block_on(async {
            let fx = TestFixture::new();

            let result = fx.gate.redeem(&who, &token).await;

            prop_assert!(matches!(result, Err(KeygateError::InvalidSignature)));
            Ok(())
        })?;
    }

    #[test]
    fn prop_issued_validity_clamped(days in valid_days()) {
        runtime().block_on(async {
            let fx = TestFixture::new();
            let admin = fx.admin.clone();

            let issued = fx.gate.issue(&admin, days).await.unwrap();
            let span = (issued.key.expires_on - start_date()).num_days();

            prop_assert!((1..=365).contains(&span));
            prop_assert_eq!(span, i64::from(issued.valid_days));
            Ok(())
        })?;
    }
}
