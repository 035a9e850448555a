//! Client for the Spotify authorization server (accounts.spotify.com).
//!
//! Both token-endpoint grants authenticate with the application's client
//! id + secret over HTTP Basic. Token material in responses is a secret and
//! must never be logged.

use anyhow::Context as _;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::config::SpotifyConfig;
use crate::error::ApiServiceError;

pub const ACCOUNTS_BASE_URL: &str = "https://accounts.spotify.com";

/// https://developer.spotify.com/documentation/web-api/concepts/scopes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    UserLibraryRead,
    UserReadRecentlyPlayed,
    UserTopRead,
    UserReadPrivate,
    UserReadEmail,
    PlaylistReadPrivate,
    PlaylistReadCollaborative,
    PlaylistModifyPrivate,
    PlaylistModifyPublic,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserLibraryRead => "user-library-read",
            Self::UserReadRecentlyPlayed => "user-read-recently-played",
            Self::UserTopRead => "user-top-read",
            Self::UserReadPrivate => "user-read-private",
            Self::UserReadEmail => "user-read-email",
            Self::PlaylistReadPrivate => "playlist-read-private",
            Self::PlaylistReadCollaborative => "playlist-read-collaborative",
            Self::PlaylistModifyPrivate => "playlist-modify-private",
            Self::PlaylistModifyPublic => "playlist-modify-public",
        }
    }

    /// Every scope the linking flow requests.
    pub fn all() -> &'static [Scope] {
        &[
            Self::UserLibraryRead,
            Self::UserReadRecentlyPlayed,
            Self::UserTopRead,
            Self::UserReadPrivate,
            Self::UserReadEmail,
            Self::PlaylistReadPrivate,
            Self::PlaylistReadCollaborative,
            Self::PlaylistModifyPrivate,
            Self::PlaylistModifyPublic,
        ]
    }
}

fn scope_param() -> String {
    Scope::all()
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Token endpoint response for both the authorization-code and the
/// refresh-token grant. `refresh_token` is absent on some refresh grants —
/// the caller carries the previous one forward.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Lifetime of `access_token` in seconds.
    pub expires_in: i64,
    /// Granted scopes, space-separated.
    pub scope: Option<String>,
}

impl TokenGrant {
    pub fn scopes(&self) -> Vec<String> {
        self.scope
            .as_deref()
            .unwrap_or_default()
            .split_whitespace()
            .map(str::to_owned)
            .collect()
    }
}

#[derive(Clone)]
pub struct OAuthClient {
    http: Client,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    base_url: String,
}

impl OAuthClient {
    pub fn new(http: Client, config: &SpotifyConfig) -> Self {
        Self::with_base_url(http, config, ACCOUNTS_BASE_URL)
    }

    /// Point the client at a different authorization server (tests).
    pub fn with_base_url(http: Client, config: &SpotifyConfig, base_url: &str) -> Self {
        Self {
            http,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_uri: config.redirect_uri.clone(),
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }

    /// Consent URL the user is redirected to for delegated authorization.
    pub fn authorize_url(&self, state: &str) -> Result<String, ApiServiceError> {
        let mut url = Url::parse(&format!("{}/authorize", self.base_url))
            .context("build authorize url")?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("response_type", "code")
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("scope", &scope_param())
            .append_pair("state", state);
        Ok(url.into())
    }

    async fn token_request(
        &self,
        params: &[(&str, &str)],
    ) -> Result<reqwest::Response, reqwest::Error> {
        self.http
            .post(format!("{}/api/token", self.base_url))
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(params)
            .send()
            .await
    }

    /// Exchange an authorization code for the initial token grant.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenGrant, ApiServiceError> {
        let response = self
            .token_request(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", &self.redirect_uri),
            ])
            .await
            .map_err(|e| ApiServiceError::transient(e, "spotify code exchange"))?;
        if !response.status().is_success() {
            return Err(ApiServiceError::Upstream {
                status: response.status().as_u16(),
            });
        }
        Ok(response.json().await.context("decode token grant")?)
    }

    /// Exchange the stored refresh token for a rotated grant. Rejection
    /// (e.g. `invalid_grant`) and unreachability both surface as
    /// `RefreshFailed`; the caller's stored state is untouched.
    pub async fn refresh_grant(&self, refresh_token: &str) -> Result<TokenGrant, ApiServiceError> {
        let response = self
            .token_request(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "token refresh unreachable");
                ApiServiceError::RefreshFailed
            })?;
        if !response.status().is_success() {
            tracing::warn!(status = %response.status(), "token refresh rejected");
            return Err(ApiServiceError::RefreshFailed);
        }
        response
            .json()
            .await
            .map_err(|_| ApiServiceError::RefreshFailed)
    }
}
