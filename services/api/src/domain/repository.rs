#![allow(async_fn_in_trait)]

use uuid::Uuid;

use crate::domain::types::{
    AccountStatus, LinkedAccount, OAuthToken, OtpRequest, RotateOutcome, User, UserStatus,
};
use crate::error::ApiServiceError;

/// Repository for users keyed by normalized phone number.
pub trait UserRepository: Send + Sync {
    /// `phone_number` must already be E.164-normalized.
    async fn find_by_phone(&self, phone_number: &str) -> Result<Option<User>, ApiServiceError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, ApiServiceError>;

    async fn create(&self, user: &User) -> Result<(), ApiServiceError>;

    async fn set_status(&self, id: Uuid, status: UserStatus) -> Result<(), ApiServiceError>;
}

/// Repository for one-time passcodes.
pub trait OtpRepository: Send + Sync {
    /// Expire every pending request for `otp.user_id` and insert `otp` as
    /// the new pending row, in one transaction. A failure partway leaves no
    /// new pending row next to a stale one.
    async fn supersede_and_insert(&self, otp: &OtpRequest) -> Result<(), ApiServiceError>;

    /// The user's single pending request, if any.
    async fn find_pending(&self, user_id: Uuid) -> Result<Option<OtpRequest>, ApiServiceError>;

    /// Move a request out of pending (superseded, consumed, or lapsed).
    async fn mark_expired(&self, id: Uuid) -> Result<(), ApiServiceError>;
}

/// Repository for Spotify account links.
pub trait AccountRepository: Send + Sync {
    async fn find_by_user(&self, user_id: Uuid) -> Result<Option<LinkedAccount>, ApiServiceError>;

    async fn create(&self, account: &LinkedAccount) -> Result<(), ApiServiceError>;

    async fn set_status(&self, id: Uuid, status: AccountStatus) -> Result<(), ApiServiceError>;
}

/// Repository for delegated OAuth tokens.
pub trait TokenRepository: Send + Sync {
    /// The account's single active token row.
    async fn find_active(&self, account_id: Uuid) -> Result<Option<OAuthToken>, ApiServiceError>;

    /// Deactivate `superseded` and insert `token` as the active row, in one
    /// transaction. Returns `Lost` (and writes nothing) when the superseded
    /// row was already deactivated by a concurrent rotation.
    async fn rotate(
        &self,
        superseded: Option<Uuid>,
        token: &OAuthToken,
    ) -> Result<RotateOutcome, ApiServiceError>;
}
