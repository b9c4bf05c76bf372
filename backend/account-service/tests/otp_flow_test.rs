mod common;

use account_service::models::OtpTuple;
use account_service::services::Clock;
use account_service::{AccountError, OtpRejection};
use common::*;
use std::sync::Arc;
use uuid::Uuid;

const NEW_PIN: &str = "7319";

#[tokio::test]
async fn test_issued_otp_expires_after_two_minutes() {
    let app = TestApp::new();

    let issued = app.service.new_otp(PHONE).await.unwrap();
    let record = app.store.otp(issued.key_uid).unwrap();

    assert_eq!(record.code.len(), 5);
    assert_eq!(record.expiry_at, issued.expires_at);
    assert!(!record.is_used);
    assert_eq!(record.expiry_at, app.clock.now() + chrono::Duration::minutes(2));
}

#[tokio::test]
async fn test_reset_pin_with_fresh_otp() {
    let app = TestApp::new();
    app.seed();
    app.store.set_lock_columns(PHONE, 2, false);
    let otp = app.issue_otp(PHONE).await;

    app.service.reset_pin(&otp, NEW_PIN).await.unwrap();

    assert!(app.store.otp(otp.key_uid).unwrap().is_used);
    let user = app.store.user(PHONE).unwrap();
    assert_eq!(user.pin, CountingHasher::encode(NEW_PIN));
    assert_eq!(user.quota, 0);
}

#[tokio::test]
async fn test_reused_otp_is_already_used() {
    let app = TestApp::new();
    app.seed();
    let otp = app.issue_otp(PHONE).await;
    app.service.reset_pin(&otp, NEW_PIN).await.unwrap();

    let err = app.service.reset_pin(&otp, "1111").await.unwrap_err();

    assert!(matches!(
        err,
        AccountError::OtpInvalid(OtpRejection::AlreadyUsed)
    ));
    assert_eq!(app.store.user(PHONE).unwrap().pin, CountingHasher::encode(NEW_PIN));
}

#[tokio::test]
async fn test_expired_otp_is_rejected_and_left_unused() {
    let app = TestApp::new();
    app.seed();
    let otp = app.issue_otp(PHONE).await;

    app.clock.advance(chrono::Duration::seconds(121));
    let err = app.service.check_otp(&otp).await.unwrap_err();

    assert!(matches!(err, AccountError::OtpInvalid(OtpRejection::Expired)));
    assert!(!app.store.otp(otp.key_uid).unwrap().is_used);
}

#[tokio::test]
async fn test_every_partial_tuple_is_rejected() {
    let app = TestApp::new();
    let otp = app.issue_otp(PHONE).await;

    let wrong_code = if otp.code == "99999" { "11111" } else { "99999" };
    let variants = [
        OtpTuple::new("+221770000001", &otp.code, otp.key_uid),
        OtpTuple::new(PHONE, wrong_code, otp.key_uid),
        OtpTuple::new(PHONE, &otp.code, Uuid::new_v4()),
    ];

    for presented in &variants {
        let err = app.service.check_otp(presented).await.unwrap_err();
        assert!(matches!(err, AccountError::OtpInvalid(_)));
        assert_eq!(err.public_message(), "Invalid or expired OTP");
    }

    // Nothing above consumed it
    app.service.check_otp(&otp).await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_consumers_get_exactly_one_success() {
    let app = Arc::new(TestApp::new());
    let otp = app.issue_otp(PHONE).await;

    let consumers: Vec<_> = (0..6)
        .map(|_| {
            let app = app.clone();
            let otp = otp.clone();
            tokio::spawn(async move { app.service.check_otp(&otp).await })
        })
        .collect();

    let mut successes = 0;
    for consumer in consumers {
        match consumer.await.unwrap() {
            Ok(()) => successes += 1,
            Err(err) => assert!(matches!(
                err,
                AccountError::OtpInvalid(OtpRejection::AlreadyUsed)
            )),
        }
    }

    assert_eq!(successes, 1);
}

#[tokio::test]
async fn test_reset_unlocks_a_locked_account() {
    let app = TestApp::new();
    let (user, _) = app.seed();
    for _ in 0..MAX_ATTEMPTS {
        let _ = app.service.login(PHONE, WRONG_PIN, DEVICE).await;
    }
    assert_eq!(app.lock_columns(), (MAX_ATTEMPTS, true));

    let otp = app.issue_otp(PHONE).await;
    app.service.reset_pin(&otp, NEW_PIN).await.unwrap();
    app.settle().await;

    assert_eq!(app.lock_columns(), (0, false));
    assert!(!app.store.wallet_of(user.id).unwrap().locked);
    assert!(app.service.login(PHONE, NEW_PIN, DEVICE).await.is_ok());
}

#[tokio::test]
async fn test_reset_for_unknown_phone_keeps_otp() {
    let app = TestApp::new();
    let otp = app.issue_otp(PHONE).await;

    let err = app.service.reset_pin(&otp, NEW_PIN).await.unwrap_err();

    assert!(matches!(err, AccountError::OtpInvalid(OtpRejection::NotFound)));
    assert!(!app.store.otp(otp.key_uid).unwrap().is_used);
}

#[tokio::test]
async fn test_update_pin_with_old_pin_and_otp() {
    let app = TestApp::new();
    app.seed();
    let _ = app.service.login(PHONE, WRONG_PIN, DEVICE).await;
    let otp = app.issue_otp(PHONE).await;

    app.service.update_pin(&otp, PIN, NEW_PIN).await.unwrap();

    let user = app.store.user(PHONE).unwrap();
    assert_eq!(user.pin, CountingHasher::encode(NEW_PIN));
    assert_eq!(user.quota, 0);
    assert!(app.store.otp(otp.key_uid).unwrap().is_used);
}

#[tokio::test]
async fn test_update_pin_with_wrong_old_pin_counts_failure() {
    let app = TestApp::new();
    app.seed();
    let otp = app.issue_otp(PHONE).await;

    let err = app
        .service
        .update_pin(&otp, WRONG_PIN, NEW_PIN)
        .await
        .unwrap_err();

    assert!(matches!(err, AccountError::InvalidCredentials));
    assert_eq!(app.lock_columns(), (1, false));
    assert!(!app.store.otp(otp.key_uid).unwrap().is_used);
    assert_eq!(app.store.user(PHONE).unwrap().pin, CountingHasher::encode(PIN));
}

#[tokio::test]
async fn test_update_pin_refused_while_locked() {
    let app = TestApp::new();
    app.seed();
    app.store.set_lock_columns(PHONE, MAX_ATTEMPTS, true);
    let otp = app.issue_otp(PHONE).await;

    let err = app.service.update_pin(&otp, PIN, NEW_PIN).await.unwrap_err();

    assert!(matches!(err, AccountError::AccountLocked));
    assert!(!app.store.otp(otp.key_uid).unwrap().is_used);
}

#[tokio::test]
async fn test_remove_account_deactivates_user_and_wallet() {
    let app = TestApp::new();
    let (user, _) = app.seed();
    app.service.login(PHONE, PIN, DEVICE).await.unwrap();
    app.settle().await;
    let otp = app.issue_otp(PHONE).await;

    app.service.remove_account(&otp, PIN).await.unwrap();
    app.settle().await;

    let stored = app.store.user(PHONE).unwrap();
    assert!(!stored.is_active);
    assert!(stored.locked);
    assert_eq!(stored.quota, MAX_ATTEMPTS);
    let wallet = app.store.wallet_of(user.id).unwrap();
    assert!(!wallet.is_active && wallet.locked);
    assert!(app.cache.is_empty().await);

    let err = app.service.login(PHONE, PIN, DEVICE).await.unwrap_err();
    assert!(matches!(err, AccountError::InvalidCredentials));
}

#[tokio::test]
async fn test_otp_sms_is_sent_in_background() {
    let app = TestApp::new();

    app.service.new_otp(PHONE).await.unwrap();
    app.settle().await;

    let sent = app.sms.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, PHONE);
    assert!(sent[0].1.contains("2 minutes"));
}
