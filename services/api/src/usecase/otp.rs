use chrono::{Duration, Utc};
use rand::Rng;
use uuid::Uuid;

use tunelink_core::phone;

use crate::domain::repository::{OtpRepository, UserRepository};
use crate::domain::types::{
    OTP_CODE_LEN, OTP_TTL_SECS, OtpRequest, OtpStatus, User, UserStatus, VerifyOutcome,
};
use crate::error::ApiServiceError;

/// Charset for OTP codes (decimal digits; leading zeros are significant).
const CHARSET: &[u8] = b"0123456789";

fn generate_code() -> String {
    let mut rng = rand::rng();
    (0..OTP_CODE_LEN)
        .map(|_| CHARSET[rng.random_range(0..CHARSET.len())] as char)
        .collect()
}

// ── RequestOtp ───────────────────────────────────────────────────────────────

pub struct RequestOtpInput {
    pub phone_number: String,
}

pub struct RequestOtpUseCase<U, O>
where
    U: UserRepository,
    O: OtpRepository,
{
    pub users: U,
    pub otps: O,
}

impl<U, O> RequestOtpUseCase<U, O>
where
    U: UserRepository,
    O: OtpRepository,
{
    pub async fn execute(&self, input: RequestOtpInput) -> Result<OtpRequest, ApiServiceError> {
        // 1. Canonicalize before any lookup — raw input never reaches the store.
        let phone = phone::normalize(&input.phone_number)
            .map_err(|_| ApiServiceError::InvalidPhoneNumber)?;

        let now = Utc::now();

        // 2. First request for an unseen number creates the user.
        let user = match self.users.find_by_phone(&phone).await? {
            Some(user) => user,
            None => {
                let user = User {
                    id: Uuid::now_v7(),
                    phone_number: phone,
                    status: UserStatus::Pending,
                    created_at: now,
                    updated_at: now,
                };
                self.users.create(&user).await?;
                user
            }
        };

        // 3. Issue the code. Codes are scoped to the user and their 10-minute
        // window; cross-user collisions are fine.
        let otp = OtpRequest {
            id: Uuid::now_v7(),
            user_id: user.id,
            code: generate_code(),
            status: OtpStatus::Pending,
            expires_at: now + Duration::seconds(OTP_TTL_SECS),
            created_at: now,
            updated_at: now,
        };

        // 4. Expire-then-insert runs in one transaction: at most one pending
        // row per user survives any failure or same-user race.
        self.otps.supersede_and_insert(&otp).await?;
        Ok(otp)
    }
}

// ── VerifyOtp ────────────────────────────────────────────────────────────────

pub struct VerifyOtpInput {
    pub phone_number: String,
    pub code: String,
}

pub struct VerifyOtpUseCase<U, O>
where
    U: UserRepository,
    O: OtpRepository,
{
    pub users: U,
    pub otps: O,
}

impl<U, O> VerifyOtpUseCase<U, O>
where
    U: UserRepository,
    O: OtpRepository,
{
    pub async fn execute(&self, input: VerifyOtpInput) -> Result<VerifyOutcome, ApiServiceError> {
        let phone = phone::normalize(&input.phone_number)
            .map_err(|_| ApiServiceError::InvalidPhoneNumber)?;

        let Some(user) = self.users.find_by_phone(&phone).await? else {
            return Ok(VerifyOutcome::NoActiveRequest);
        };

        let Some(pending) = self.otps.find_pending(user.id).await? else {
            return Ok(VerifyOutcome::NoActiveRequest);
        };

        let now = Utc::now();
        if now > pending.expires_at {
            // Lazy time-based expiry — there is no timer daemon; the row
            // falls out of pending on the next verification touch.
            self.otps.mark_expired(pending.id).await?;
            return Ok(VerifyOutcome::Expired);
        }

        // Exact string match, leading zeros included.
        if pending.code != input.code {
            // A mismatch does not consume the code; a later correct attempt
            // within the window still succeeds.
            return Ok(VerifyOutcome::Mismatch);
        }

        // Consume the code so it can never be replayed, then advance the
        // user — `Complete` is what gates account linking.
        self.otps.mark_expired(pending.id).await?;
        self.users.set_status(user.id, UserStatus::Complete).await?;
        Ok(VerifyOutcome::Accepted)
    }
}
