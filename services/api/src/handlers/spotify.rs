use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use crate::error::ApiServiceError;
use crate::state::AppState;
use crate::usecase::link::{
    BeginLinkInput, BeginLinkUseCase, CompleteLinkInput, CompleteLinkUseCase,
};
use crate::usecase::spotify::{GetProfileUseCase, ListPlaylistsUseCase};

// ── POST /spotify/link ───────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct BeginLinkRequest {
    pub phone_number: String,
}

#[derive(Serialize)]
pub struct BeginLinkResponse {
    pub authorize_url: String,
    pub state: String,
}

pub async fn begin_link(
    State(app): State<AppState>,
    Json(body): Json<BeginLinkRequest>,
) -> Result<(StatusCode, Json<BeginLinkResponse>), ApiServiceError> {
    let usecase = BeginLinkUseCase {
        users: app.user_repo(),
        accounts: app.account_repo(),
        oauth: app.oauth_client(),
    };
    let out = usecase
        .execute(BeginLinkInput {
            phone_number: body.phone_number,
        })
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(BeginLinkResponse {
            authorize_url: out.authorize_url,
            state: out.state,
        }),
    ))
}

// ── POST /spotify/callback ───────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CompleteLinkRequest {
    pub phone_number: String,
    pub code: String,
}

pub async fn complete_link(
    State(app): State<AppState>,
    Json(body): Json<CompleteLinkRequest>,
) -> Result<StatusCode, ApiServiceError> {
    let usecase = CompleteLinkUseCase {
        users: app.user_repo(),
        accounts: app.account_repo(),
        tokens: app.token_repo(),
        oauth: app.oauth_client(),
    };
    usecase
        .execute(CompleteLinkInput {
            phone_number: body.phone_number,
            code: body.code,
        })
        .await?;
    // Token material is stored, never returned.
    Ok(StatusCode::NO_CONTENT)
}

// ── GET /spotify/me ──────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ProfileQuery {
    pub phone_number: String,
}

#[derive(Serialize)]
pub struct ProfileResponse {
    pub id: String,
    pub display_name: Option<String>,
}

pub async fn get_profile(
    State(app): State<AppState>,
    Query(query): Query<ProfileQuery>,
) -> Result<Json<ProfileResponse>, ApiServiceError> {
    let usecase = GetProfileUseCase {
        users: app.user_repo(),
        accounts: app.account_repo(),
        tokens: app.token_repo(),
        oauth: app.oauth_client(),
        http: app.http.clone(),
        api_base_url: app.api_base_url(),
    };
    let identity = usecase.execute(&query.phone_number).await?;
    Ok(Json(ProfileResponse {
        id: identity.id,
        display_name: identity.display_name,
    }))
}

// ── GET /spotify/playlists ───────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct PlaylistsQuery {
    pub phone_number: String,
    /// Cap on the number of playlists fetched across pages; absent means all.
    pub max: Option<usize>,
}

#[derive(Serialize)]
pub struct PlaylistResponse {
    pub id: String,
    pub name: String,
    pub public: Option<bool>,
}

pub async fn list_playlists(
    State(app): State<AppState>,
    Query(query): Query<PlaylistsQuery>,
) -> Result<Json<Vec<PlaylistResponse>>, ApiServiceError> {
    let usecase = ListPlaylistsUseCase {
        users: app.user_repo(),
        accounts: app.account_repo(),
        tokens: app.token_repo(),
        oauth: app.oauth_client(),
        http: app.http.clone(),
        api_base_url: app.api_base_url(),
    };
    let playlists = usecase.execute(&query.phone_number, query.max).await?;
    Ok(Json(
        playlists
            .into_iter()
            .map(|p| PlaylistResponse {
                id: p.id,
                name: p.name,
                public: p.public,
            })
            .collect(),
    ))
}
