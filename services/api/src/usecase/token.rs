use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::domain::repository::TokenRepository;
use crate::domain::types::{OAuthToken, RotateOutcome, TOKEN_EXPIRY_SKEW_SECS};
use crate::error::ApiServiceError;
use crate::spotify::oauth::OAuthClient;
use crate::spotify::session::TokenProvider;

/// Token store and refresher for one linked account.
///
/// Holds the account's delegated credential and rotates it before or upon
/// expiry. Rotation never mutates a token row: the old row is deactivated
/// and a new one inserted in a single transaction, so the rotation history
/// stays auditable and there is no window with zero active tokens.
pub struct TokenService<T: TokenRepository> {
    pub tokens: T,
    pub oauth: OAuthClient,
    pub account_id: Uuid,
}

impl<T: TokenRepository> TokenService<T> {
    /// The account's single active token. `NoLinkedAccount` when the account
    /// never completed authorization.
    pub async fn current_token(&self) -> Result<OAuthToken, ApiServiceError> {
        self.tokens
            .find_active(self.account_id)
            .await?
            .ok_or(ApiServiceError::NoLinkedAccount)
    }

    /// Exchange the stored refresh token for a rotated grant and persist it.
    ///
    /// The provider invalidates a refresh token after first use, so exactly
    /// one exchange may be committed per stored token: when a concurrent
    /// refresh wins the rotation (`Lost`), the loser reads the winner's
    /// freshly stored row instead of failing the caller.
    ///
    /// On `RefreshFailed` nothing is written — the account keeps its
    /// last-known-good token and the caller must eventually re-authorize.
    pub async fn refresh(&self) -> Result<OAuthToken, ApiServiceError> {
        let current = self.current_token().await?;
        let grant = self.oauth.refresh_grant(&current.refresh_token).await?;

        let now = Utc::now();
        let scope = grant.scopes();
        let rotated = OAuthToken {
            id: Uuid::now_v7(),
            account_id: self.account_id,
            access_token: grant.access_token,
            // Refresh responses may omit the refresh token; carry the old
            // one forward so refresh capability is never lost.
            refresh_token: grant
                .refresh_token
                .unwrap_or_else(|| current.refresh_token.clone()),
            expires_at: now + Duration::seconds(grant.expires_in),
            scope: if scope.is_empty() {
                current.scope.clone()
            } else {
                scope
            },
            active: true,
            created_at: now,
            updated_at: now,
        };

        match self.tokens.rotate(Some(current.id), &rotated).await? {
            RotateOutcome::Stored => Ok(rotated),
            RotateOutcome::Lost => self.current_token().await,
        }
    }
}

impl<T: TokenRepository> TokenProvider for TokenService<T> {
    async fn access_token(&self) -> Result<String, ApiServiceError> {
        let token = self.current_token().await?;
        if token.is_expired(Utc::now(), Duration::seconds(TOKEN_EXPIRY_SKEW_SECS)) {
            return Ok(self.refresh().await?.access_token);
        }
        Ok(token.access_token)
    }

    async fn refreshed_token(&self) -> Result<String, ApiServiceError> {
        Ok(self.refresh().await?.access_token)
    }
}
