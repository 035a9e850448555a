use reqwest::Client;

use tunelink_core::phone;

use crate::domain::repository::{AccountRepository, TokenRepository, UserRepository};
use crate::error::ApiServiceError;
use crate::spotify::oauth::OAuthClient;
use crate::spotify::session::{Playlist, RemoteUser, Session};
use crate::usecase::token::TokenService;

/// Resolve a phone number to its linked account and bind a delegated API
/// session to it. The session's token provider reads and rotates the
/// account's stored credential transparently.
async fn bind_session<U, A, T>(
    users: &U,
    accounts: &A,
    tokens: &T,
    oauth: &OAuthClient,
    http: &Client,
    api_base_url: &str,
    phone_number: &str,
) -> Result<Session<TokenService<T>>, ApiServiceError>
where
    U: UserRepository,
    A: AccountRepository,
    T: TokenRepository + Clone,
{
    let phone =
        phone::normalize(phone_number).map_err(|_| ApiServiceError::InvalidPhoneNumber)?;

    let user = users
        .find_by_phone(&phone)
        .await?
        .ok_or(ApiServiceError::UserNotFound)?;

    let account = accounts
        .find_by_user(user.id)
        .await?
        .ok_or(ApiServiceError::NoLinkedAccount)?;

    let provider = TokenService {
        tokens: tokens.clone(),
        oauth: oauth.clone(),
        account_id: account.id,
    };
    Ok(Session::with_base_url(http.clone(), provider, api_base_url))
}

// ── GetProfile ───────────────────────────────────────────────────────────────

pub struct GetProfileUseCase<U, A, T>
where
    U: UserRepository,
    A: AccountRepository,
    T: TokenRepository + Clone,
{
    pub users: U,
    pub accounts: A,
    pub tokens: T,
    pub oauth: OAuthClient,
    pub http: Client,
    pub api_base_url: String,
}

impl<U, A, T> GetProfileUseCase<U, A, T>
where
    U: UserRepository,
    A: AccountRepository,
    T: TokenRepository + Clone,
{
    pub async fn execute(&self, phone_number: &str) -> Result<RemoteUser, ApiServiceError> {
        let session = bind_session(
            &self.users,
            &self.accounts,
            &self.tokens,
            &self.oauth,
            &self.http,
            &self.api_base_url,
            phone_number,
        )
        .await?;
        session.get_current_identity().await
    }
}

// ── ListPlaylists ────────────────────────────────────────────────────────────

pub struct ListPlaylistsUseCase<U, A, T>
where
    U: UserRepository,
    A: AccountRepository,
    T: TokenRepository + Clone,
{
    pub users: U,
    pub accounts: A,
    pub tokens: T,
    pub oauth: OAuthClient,
    pub http: Client,
    pub api_base_url: String,
}

impl<U, A, T> ListPlaylistsUseCase<U, A, T>
where
    U: UserRepository,
    A: AccountRepository,
    T: TokenRepository + Clone,
{
    pub async fn execute(
        &self,
        phone_number: &str,
        max_count: Option<usize>,
    ) -> Result<Vec<Playlist>, ApiServiceError> {
        let session = bind_session(
            &self.users,
            &self.accounts,
            &self.tokens,
            &self.oauth,
            &self.http,
            &self.api_base_url,
            phone_number,
        )
        .await?;
        session.list_playlists(max_count).await
    }
}
