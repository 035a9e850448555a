use tunelink_api::domain::types::{OtpStatus, UserStatus, VerifyOutcome};
use tunelink_api::error::ApiServiceError;
use tunelink_api::usecase::otp::{
    RequestOtpInput, RequestOtpUseCase, VerifyOtpInput, VerifyOtpUseCase,
};

use crate::helpers::{MockOtpRepo, MockUserRepo, TEST_PHONE, test_pending_otp, test_user};

fn request_usecase(
    users: &MockUserRepo,
    otps: &MockOtpRepo,
) -> RequestOtpUseCase<MockUserRepo, MockOtpRepo> {
    RequestOtpUseCase {
        users: users.clone(),
        otps: otps.clone(),
    }
}

fn verify_usecase(
    users: &MockUserRepo,
    otps: &MockOtpRepo,
) -> VerifyOtpUseCase<MockUserRepo, MockOtpRepo> {
    VerifyOtpUseCase {
        users: users.clone(),
        otps: otps.clone(),
    }
}

fn pending_count(otps: &MockOtpRepo, user_id: uuid::Uuid) -> usize {
    otps.otps
        .lock()
        .unwrap()
        .iter()
        .filter(|o| o.user_id == user_id && o.status == OtpStatus::Pending)
        .count()
}

// ── request_otp ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_create_user_and_pending_otp_on_first_request() {
    let users = MockUserRepo::empty();
    let otps = MockOtpRepo::empty();

    let issued = request_usecase(&users, &otps)
        .execute(RequestOtpInput {
            phone_number: "+1 (555) 123-4567".to_owned(),
        })
        .await
        .unwrap();

    let created_users = users.users_handle();
    let created_users = created_users.lock().unwrap();
    assert_eq!(created_users.len(), 1);
    assert_eq!(created_users[0].phone_number, TEST_PHONE);
    assert_eq!(created_users[0].status, UserStatus::Pending);

    let created_otps = otps.otps_handle();
    let created_otps = created_otps.lock().unwrap();
    assert_eq!(created_otps.len(), 1);
    let otp = &created_otps[0];
    assert_eq!(otp.id, issued.id, "returned request is the stored row");
    assert_eq!(otp.user_id, created_users[0].id);
    assert_eq!(otp.status, OtpStatus::Pending);
    assert_eq!(otp.code.len(), 6, "otp code should be 6 digits");
    assert!(otp.code.bytes().all(|b| b.is_ascii_digit()));
    assert!(otp.expires_at > chrono::Utc::now());
}

#[tokio::test]
async fn should_leave_exactly_one_pending_after_repeated_requests() {
    let users = MockUserRepo::empty();
    let otps = MockOtpRepo::empty();
    let uc = request_usecase(&users, &otps);

    for _ in 0..3 {
        uc.execute(RequestOtpInput {
            phone_number: TEST_PHONE.to_owned(),
        })
        .await
        .unwrap();
    }

    let user_id = users.users.lock().unwrap()[0].id;
    assert_eq!(users.users.lock().unwrap().len(), 1);
    assert_eq!(otps.otps.lock().unwrap().len(), 3, "audit trail keeps all rows");
    assert_eq!(pending_count(&otps, user_id), 1);
}

#[tokio::test]
async fn should_never_hold_two_pending_rows_under_concurrent_requests() {
    let users = MockUserRepo::new(vec![test_user(UserStatus::Pending)]);
    let otps = MockOtpRepo::empty();
    let user_id = users.users.lock().unwrap()[0].id;

    let uc_a = request_usecase(&users, &otps);
    let uc_b = request_usecase(&users, &otps);

    let (a, b) = tokio::join!(
        uc_a.execute(RequestOtpInput {
            phone_number: TEST_PHONE.to_owned(),
        }),
        uc_b.execute(RequestOtpInput {
            phone_number: TEST_PHONE.to_owned(),
        }),
    );
    a.unwrap();
    b.unwrap();

    // Direct store inspection: both rows exist, but only one is pending.
    assert_eq!(otps.otps.lock().unwrap().len(), 2);
    assert_eq!(pending_count(&otps, user_id), 1);
}

#[tokio::test]
async fn should_reject_malformed_phone_number_before_any_side_effect() {
    let users = MockUserRepo::empty();
    let otps = MockOtpRepo::empty();

    let result = request_usecase(&users, &otps)
        .execute(RequestOtpInput {
            phone_number: "hello".to_owned(),
        })
        .await;

    assert!(
        matches!(result, Err(ApiServiceError::InvalidPhoneNumber)),
        "expected InvalidPhoneNumber, got {result:?}"
    );
    assert!(users.users.lock().unwrap().is_empty());
    assert!(otps.otps.lock().unwrap().is_empty());
}

#[tokio::test]
async fn should_resolve_formatting_variants_to_one_user() {
    let users = MockUserRepo::empty();
    let otps = MockOtpRepo::empty();
    let uc = request_usecase(&users, &otps);

    uc.execute(RequestOtpInput {
        phone_number: "+1 (555) 123-4567".to_owned(),
    })
    .await
    .unwrap();
    uc.execute(RequestOtpInput {
        phone_number: "+1-555-123-4567".to_owned(),
    })
    .await
    .unwrap();

    let created_users = users.users.lock().unwrap();
    assert_eq!(created_users.len(), 1, "both formats resolve to one user");
    assert_eq!(created_users[0].phone_number, TEST_PHONE);
    assert_eq!(pending_count(&otps, created_users[0].id), 1);
}

// ── verify_otp ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_accept_correct_code_exactly_once() {
    let user = test_user(UserStatus::Pending);
    let users = MockUserRepo::new(vec![user.clone()]);
    let otps = MockOtpRepo::new(vec![test_pending_otp(user.id, "042137")]);
    let uc = verify_usecase(&users, &otps);

    let first = uc
        .execute(VerifyOtpInput {
            phone_number: TEST_PHONE.to_owned(),
            code: "042137".to_owned(),
        })
        .await
        .unwrap();
    assert_eq!(first, VerifyOutcome::Accepted);

    // Accepting consumed the row; the same code cannot be replayed.
    let second = uc
        .execute(VerifyOtpInput {
            phone_number: TEST_PHONE.to_owned(),
            code: "042137".to_owned(),
        })
        .await
        .unwrap();
    assert_eq!(second, VerifyOutcome::NoActiveRequest);
}

#[tokio::test]
async fn should_advance_user_to_complete_on_accept() {
    let user = test_user(UserStatus::Pending);
    let users = MockUserRepo::new(vec![user.clone()]);
    let otps = MockOtpRepo::new(vec![test_pending_otp(user.id, "000123")]);

    let outcome = verify_usecase(&users, &otps)
        .execute(VerifyOtpInput {
            phone_number: TEST_PHONE.to_owned(),
            // Leading zeros are significant and must match exactly.
            code: "000123".to_owned(),
        })
        .await
        .unwrap();

    assert_eq!(outcome, VerifyOutcome::Accepted);
    assert_eq!(users.users.lock().unwrap()[0].status, UserStatus::Complete);
}

#[tokio::test]
async fn should_return_expired_after_ttl_even_with_correct_code() {
    let user = test_user(UserStatus::Pending);
    let users = MockUserRepo::new(vec![user.clone()]);
    let mut otp = test_pending_otp(user.id, "042137");
    otp.expires_at = chrono::Utc::now() - chrono::Duration::seconds(1);
    let otps = MockOtpRepo::new(vec![otp]);

    let outcome = verify_usecase(&users, &otps)
        .execute(VerifyOtpInput {
            phone_number: TEST_PHONE.to_owned(),
            code: "042137".to_owned(),
        })
        .await
        .unwrap();

    assert_eq!(outcome, VerifyOutcome::Expired);
    // Lazily moved out of pending.
    assert_eq!(otps.otps.lock().unwrap()[0].status, OtpStatus::Expired);
}

#[tokio::test]
async fn should_return_mismatch_and_preserve_pending_row() {
    let user = test_user(UserStatus::Pending);
    let users = MockUserRepo::new(vec![user.clone()]);
    let otps = MockOtpRepo::new(vec![test_pending_otp(user.id, "042137")]);
    let uc = verify_usecase(&users, &otps);

    let wrong = uc
        .execute(VerifyOtpInput {
            phone_number: TEST_PHONE.to_owned(),
            code: "999999".to_owned(),
        })
        .await
        .unwrap();
    assert_eq!(wrong, VerifyOutcome::Mismatch);
    assert_eq!(otps.otps.lock().unwrap()[0].status, OtpStatus::Pending);

    // A later correct attempt within the window still succeeds.
    let correct = uc
        .execute(VerifyOtpInput {
            phone_number: TEST_PHONE.to_owned(),
            code: "042137".to_owned(),
        })
        .await
        .unwrap();
    assert_eq!(correct, VerifyOutcome::Accepted);
}

#[tokio::test]
async fn should_return_no_active_request_for_unknown_user() {
    let users = MockUserRepo::empty();
    let otps = MockOtpRepo::empty();

    let outcome = verify_usecase(&users, &otps)
        .execute(VerifyOtpInput {
            phone_number: TEST_PHONE.to_owned(),
            code: "042137".to_owned(),
        })
        .await
        .unwrap();

    assert_eq!(outcome, VerifyOutcome::NoActiveRequest);
}

#[tokio::test]
async fn should_return_no_active_request_when_user_has_no_pending_row() {
    let user = test_user(UserStatus::Pending);
    let users = MockUserRepo::new(vec![user]);
    let otps = MockOtpRepo::empty();

    let outcome = verify_usecase(&users, &otps)
        .execute(VerifyOtpInput {
            phone_number: TEST_PHONE.to_owned(),
            code: "042137".to_owned(),
        })
        .await
        .unwrap();

    assert_eq!(outcome, VerifyOutcome::NoActiveRequest);
}
