#![allow(async_fn_in_trait)]

//! Delegated API session for api.spotify.com.
//!
//! Wraps outbound calls with automatic credential attachment, cursor
//! pagination, and a single refresh-and-retry on 401. The session never
//! decides how tokens are stored — it holds an explicit [`TokenProvider`]
//! capability and asks it before every request.

use anyhow::Context as _;
use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::domain::types::TRACK_BATCH_LIMIT;
use crate::error::ApiServiceError;

pub const API_BASE_URL: &str = "https://api.spotify.com/v1";

/// Credential capability the session depends on.
///
/// `access_token` returns a currently-valid token, refreshing behind the
/// scenes when the stored one is within skew of expiry. `refreshed_token`
/// forces a rotation after the provider rejected the current token.
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String, ApiServiceError>;
    async fn refreshed_token(&self) -> Result<String, ApiServiceError>;
}

/// The authenticated user as reported by the API.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteUser {
    pub id: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    pub public: Option<bool>,
}

/// One page of a cursor-linked listing. `next` is the full URL of the
/// following page, or null on the last page.
#[derive(Debug, Deserialize)]
struct Page<T> {
    items: Vec<T>,
    next: Option<String>,
}

pub struct Session<P: TokenProvider> {
    http: Client,
    tokens: P,
    base_url: String,
}

impl<P: TokenProvider> Session<P> {
    pub fn new(http: Client, tokens: P) -> Self {
        Self::with_base_url(http, tokens, API_BASE_URL)
    }

    /// Point the session at a different API host (tests).
    pub fn with_base_url(http: Client, tokens: P, base_url: &str) -> Self {
        Self {
            http,
            tokens,
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }

    async fn dispatch(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
        token: &str,
    ) -> Result<reqwest::Response, ApiServiceError> {
        let mut request = self.http.request(method, url).bearer_auth(token);
        if let Some(body) = body {
            request = request.json(body);
        }
        request
            .send()
            .await
            .map_err(|e| ApiServiceError::transient(e, "spotify api call"))
    }

    /// Send with the current token. On 401, refresh once, retry once, and
    /// propagate whatever the retry returns — no retry loop.
    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
    ) -> Result<reqwest::Response, ApiServiceError> {
        let token = self.tokens.access_token().await?;
        let response = self.dispatch(method.clone(), url, body, &token).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return check_status(response);
        }
        let token = self.tokens.refreshed_token().await?;
        let response = self.dispatch(method, url, body, &token).await?;
        check_status(response)
    }

    pub async fn get_current_identity(&self) -> Result<RemoteUser, ApiServiceError> {
        let url = format!("{}/me", self.base_url);
        let response = self.send(Method::GET, &url, None).await?;
        Ok(response.json().await.context("decode current identity")?)
    }

    /// Walk a `next`-linked listing starting at `start_url`.
    ///
    /// `max_count` bounds the total item count — the final page's surplus is
    /// truncated, never returned. `None` fetches every page (the caller owns
    /// that cost). Pages are fetched one at a time: the cursor for page N+1
    /// only exists in page N's body.
    pub async fn list_paginated<T: DeserializeOwned>(
        &self,
        start_url: &str,
        max_count: Option<usize>,
    ) -> Result<Vec<T>, ApiServiceError> {
        let mut items = Vec::new();
        let mut cursor = Some(start_url.to_owned());
        while let Some(url) = cursor {
            let response = self.send(Method::GET, &url, None).await?;
            let page: Page<T> = response.json().await.context("decode listing page")?;
            cursor = page.next;
            items.extend(page.items);
            if let Some(max) = max_count {
                if items.len() >= max {
                    items.truncate(max);
                    break;
                }
            }
        }
        Ok(items)
    }

    pub async fn list_playlists(
        &self,
        max_count: Option<usize>,
    ) -> Result<Vec<Playlist>, ApiServiceError> {
        let url = format!("{}/me/playlists", self.base_url);
        self.list_paginated(&url, max_count).await
    }

    pub async fn create_playlist(
        &self,
        user_id: &str,
        name: &str,
        public: bool,
    ) -> Result<Playlist, ApiServiceError> {
        let url = format!("{}/users/{user_id}/playlists", self.base_url);
        let body = json!({ "name": name, "public": public });
        let response = self.send(Method::POST, &url, Some(&body)).await?;
        Ok(response.json().await.context("decode created playlist")?)
    }

    pub async fn add_tracks(
        &self,
        playlist_id: &str,
        track_uris: &[String],
    ) -> Result<(), ApiServiceError> {
        check_batch(track_uris)?;
        let url = format!("{}/playlists/{playlist_id}/tracks", self.base_url);
        let body = json!({ "uris": track_uris });
        self.send(Method::POST, &url, Some(&body)).await?;
        Ok(())
    }

    pub async fn remove_tracks(
        &self,
        playlist_id: &str,
        track_uris: &[String],
    ) -> Result<(), ApiServiceError> {
        check_batch(track_uris)?;
        let url = format!("{}/playlists/{playlist_id}/tracks", self.base_url);
        let body = json!({
            "tracks": track_uris
                .iter()
                .map(|uri| json!({ "uri": uri }))
                .collect::<Vec<_>>(),
        });
        self.send(Method::DELETE, &url, Some(&body)).await?;
        Ok(())
    }
}

fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ApiServiceError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(ApiServiceError::Upstream {
            status: response.status().as_u16(),
        })
    }
}

/// The provider caps playlist mutations at 100 track URIs per call. Reject
/// oversized batches before any network I/O instead of truncating.
fn check_batch(track_uris: &[String]) -> Result<(), ApiServiceError> {
    if track_uris.len() >= TRACK_BATCH_LIMIT {
        return Err(ApiServiceError::BatchTooLarge);
    }
    Ok(())
}
