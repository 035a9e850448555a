use reqwest::Client;
use sea_orm::DatabaseConnection;

use crate::config::SpotifyConfig;
use crate::infra::db::{
    DbAccountRepository, DbOtpRepository, DbTokenRepository, DbUserRepository,
};
use crate::spotify::oauth::OAuthClient;
use crate::spotify::session::API_BASE_URL;

/// Shared application state passed to every handler via axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    /// Outbound client with an enforced request timeout, shared by the
    /// authorization server client and the delegated API session.
    pub http: Client,
    pub spotify: SpotifyConfig,
}

impl AppState {
    pub fn user_repo(&self) -> DbUserRepository {
        DbUserRepository {
            db: self.db.clone(),
        }
    }

    pub fn otp_repo(&self) -> DbOtpRepository {
        DbOtpRepository {
            db: self.db.clone(),
        }
    }

    pub fn account_repo(&self) -> DbAccountRepository {
        DbAccountRepository {
            db: self.db.clone(),
        }
    }

    pub fn token_repo(&self) -> DbTokenRepository {
        DbTokenRepository {
            db: self.db.clone(),
        }
    }

    pub fn oauth_client(&self) -> OAuthClient {
        OAuthClient::new(self.http.clone(), &self.spotify)
    }

    pub fn api_base_url(&self) -> String {
        API_BASE_URL.to_owned()
    }
}
