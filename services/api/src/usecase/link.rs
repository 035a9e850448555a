use chrono::{Duration, Utc};
use uuid::Uuid;

use tunelink_core::phone;

use crate::domain::repository::{AccountRepository, TokenRepository, UserRepository};
use crate::domain::types::{AccountStatus, LinkedAccount, OAuthToken, UserStatus};
use crate::error::ApiServiceError;
use crate::spotify::oauth::OAuthClient;

// ── BeginLink ────────────────────────────────────────────────────────────────

pub struct BeginLinkInput {
    pub phone_number: String,
}

#[derive(Debug)]
pub struct BeginLinkOutput {
    pub authorize_url: String,
    pub state: String,
}

pub struct BeginLinkUseCase<U, A>
where
    U: UserRepository,
    A: AccountRepository,
{
    pub users: U,
    pub accounts: A,
    pub oauth: OAuthClient,
}

impl<U, A> BeginLinkUseCase<U, A>
where
    U: UserRepository,
    A: AccountRepository,
{
    pub async fn execute(&self, input: BeginLinkInput) -> Result<BeginLinkOutput, ApiServiceError> {
        let phone = phone::normalize(&input.phone_number)
            .map_err(|_| ApiServiceError::InvalidPhoneNumber)?;

        let user = self
            .users
            .find_by_phone(&phone)
            .await?
            .ok_or(ApiServiceError::UserNotFound)?;

        // Only phone-verified users may delegate a third-party account.
        if user.status != UserStatus::Complete {
            return Err(ApiServiceError::UserNotVerified);
        }

        if self.accounts.find_by_user(user.id).await?.is_none() {
            let now = Utc::now();
            let account = LinkedAccount {
                id: Uuid::now_v7(),
                user_id: user.id,
                status: AccountStatus::New,
                created_at: now,
                updated_at: now,
            };
            self.accounts.create(&account).await?;
        }

        let state = Uuid::new_v4().simple().to_string();
        let authorize_url = self.oauth.authorize_url(&state)?;
        Ok(BeginLinkOutput {
            authorize_url,
            state,
        })
    }
}

// ── CompleteLink ─────────────────────────────────────────────────────────────

pub struct CompleteLinkInput {
    pub phone_number: String,
    /// Authorization code from the consent redirect.
    pub code: String,
}

pub struct CompleteLinkUseCase<U, A, T>
where
    U: UserRepository,
    A: AccountRepository,
    T: TokenRepository,
{
    pub users: U,
    pub accounts: A,
    pub tokens: T,
    pub oauth: OAuthClient,
}

impl<U, A, T> CompleteLinkUseCase<U, A, T>
where
    U: UserRepository,
    A: AccountRepository,
    T: TokenRepository,
{
    pub async fn execute(&self, input: CompleteLinkInput) -> Result<(), ApiServiceError> {
        let phone = phone::normalize(&input.phone_number)
            .map_err(|_| ApiServiceError::InvalidPhoneNumber)?;

        let user = self
            .users
            .find_by_phone(&phone)
            .await?
            .ok_or(ApiServiceError::UserNotFound)?;

        let account = self
            .accounts
            .find_by_user(user.id)
            .await?
            .ok_or(ApiServiceError::NoLinkedAccount)?;

        let grant = self.oauth.exchange_code(&input.code).await?;
        let refresh_token = grant.refresh_token.clone().ok_or_else(|| {
            ApiServiceError::Internal(anyhow::anyhow!("authorization grant missing refresh token"))
        })?;

        let now = Utc::now();
        let scope = grant.scopes();
        let token = OAuthToken {
            id: Uuid::now_v7(),
            account_id: account.id,
            access_token: grant.access_token,
            refresh_token,
            expires_at: now + Duration::seconds(grant.expires_in),
            scope,
            active: true,
            created_at: now,
            updated_at: now,
        };

        // Re-linking supersedes any previous active token for the account.
        let superseded = self.tokens.find_active(account.id).await?.map(|t| t.id);
        self.tokens.rotate(superseded, &token).await?;

        self.accounts
            .set_status(account.id, AccountStatus::Complete)
            .await?;
        Ok(())
    }
}
