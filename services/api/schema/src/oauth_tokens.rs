use sea_orm::entity::prelude::*;

/// Delegated Spotify credential. Tokens are never mutated in place: every
/// refresh inserts a new row and deactivates the old one in the same
/// transaction, so exactly one row per account has `active = true` and the
/// full rotation history stays queryable.
///
/// `access_token` and `refresh_token` are opaque secrets — they must never
/// appear in logs or API responses.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "oauth_tokens")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub account_id: Uuid,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: chrono::DateTime<chrono::Utc>,
    /// Granted scopes, space-joined (OAuth wire form).
    pub scope: String,
    pub active: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::spotify_accounts::Entity",
        from = "Column::AccountId",
        to = "super::spotify_accounts::Column::Id"
    )]
    SpotifyAccount,
}

impl Related<super::spotify_accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SpotifyAccount.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
