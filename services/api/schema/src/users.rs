use sea_orm::entity::prelude::*;

/// A user identified by their E.164 phone number.
/// Status: `new` | `pending` | `complete` — verifying an OTP advances the
/// user to `complete`, which gates Spotify linking.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub phone_number: String,
    pub status: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::otp_requests::Entity")]
    OtpRequests,
    #[sea_orm(has_one = "super::spotify_accounts::Entity")]
    SpotifyAccount,
}

impl Related<super::otp_requests::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OtpRequests.def()
    }
}

impl Related<super::spotify_accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SpotifyAccount.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
