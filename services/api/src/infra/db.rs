use anyhow::Context as _;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, QueryFilter, TransactionTrait,
};
use uuid::Uuid;

use tunelink_schema::{oauth_tokens, otp_requests, spotify_accounts, users};

use crate::domain::repository::{
    AccountRepository, OtpRepository, TokenRepository, UserRepository,
};
use crate::domain::types::{
    AccountStatus, LinkedAccount, OAuthToken, OtpRequest, OtpStatus, RotateOutcome, User,
    UserStatus,
};
use crate::error::ApiServiceError;

// ── User repository ──────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbUserRepository {
    pub db: DatabaseConnection,
}

impl UserRepository for DbUserRepository {
    async fn find_by_phone(&self, phone_number: &str) -> Result<Option<User>, ApiServiceError> {
        let model = users::Entity::find()
            .filter(users::Column::PhoneNumber.eq(phone_number))
            .one(&self.db)
            .await
            .map_err(|e| ApiServiceError::transient(e, "find user by phone"))?;
        model.map(user_from_model).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, ApiServiceError> {
        let model = users::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| ApiServiceError::transient(e, "find user by id"))?;
        model.map(user_from_model).transpose()
    }

    async fn create(&self, user: &User) -> Result<(), ApiServiceError> {
        users::ActiveModel {
            id: Set(user.id),
            phone_number: Set(user.phone_number.clone()),
            status: Set(user.status.as_str().to_owned()),
            created_at: Set(user.created_at),
            updated_at: Set(user.updated_at),
        }
        .insert(&self.db)
        .await
        .map_err(|e| ApiServiceError::transient(e, "create user"))?;
        Ok(())
    }

    async fn set_status(&self, id: Uuid, status: UserStatus) -> Result<(), ApiServiceError> {
        users::ActiveModel {
            id: Set(id),
            status: Set(status.as_str().to_owned()),
            updated_at: Set(Utc::now()),
            ..Default::default()
        }
        .update(&self.db)
        .await
        .map_err(|e| ApiServiceError::transient(e, "set user status"))?;
        Ok(())
    }
}

fn user_from_model(model: users::Model) -> Result<User, ApiServiceError> {
    let status = UserStatus::parse(&model.status)
        .with_context(|| format!("unknown user status {:?}", model.status))?;
    Ok(User {
        id: model.id,
        phone_number: model.phone_number,
        status,
        created_at: model.created_at,
        updated_at: model.updated_at,
    })
}

// ── OTP repository ───────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbOtpRepository {
    pub db: DatabaseConnection,
}

impl OtpRepository for DbOtpRepository {
    async fn supersede_and_insert(&self, otp: &OtpRequest) -> Result<(), ApiServiceError> {
        self.db
            .transaction::<_, (), sea_orm::DbErr>(|txn| {
                let otp = otp.clone();
                Box::pin(async move {
                    expire_pending_for_user(txn, otp.user_id).await?;
                    insert_otp(txn, &otp).await?;
                    Ok(())
                })
            })
            .await
            .map_err(|e| ApiServiceError::transient(e, "supersede and insert otp"))?;
        Ok(())
    }

    async fn find_pending(&self, user_id: Uuid) -> Result<Option<OtpRequest>, ApiServiceError> {
        let model = otp_requests::Entity::find()
            .filter(otp_requests::Column::UserId.eq(user_id))
            .filter(otp_requests::Column::Status.eq(OtpStatus::Pending.as_str()))
            .one(&self.db)
            .await
            .map_err(|e| ApiServiceError::transient(e, "find pending otp"))?;
        model.map(otp_from_model).transpose()
    }

    async fn mark_expired(&self, id: Uuid) -> Result<(), ApiServiceError> {
        otp_requests::ActiveModel {
            id: Set(id),
            status: Set(OtpStatus::Expired.as_str().to_owned()),
            updated_at: Set(Utc::now()),
            ..Default::default()
        }
        .update(&self.db)
        .await
        .map_err(|e| ApiServiceError::transient(e, "mark otp expired"))?;
        Ok(())
    }
}

async fn expire_pending_for_user(
    txn: &DatabaseTransaction,
    user_id: Uuid,
) -> Result<(), sea_orm::DbErr> {
    otp_requests::Entity::update_many()
        .col_expr(
            otp_requests::Column::Status,
            Expr::value(OtpStatus::Expired.as_str()),
        )
        .col_expr(otp_requests::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(otp_requests::Column::UserId.eq(user_id))
        .filter(otp_requests::Column::Status.eq(OtpStatus::Pending.as_str()))
        .exec(txn)
        .await?;
    Ok(())
}

async fn insert_otp(txn: &DatabaseTransaction, otp: &OtpRequest) -> Result<(), sea_orm::DbErr> {
    otp_requests::ActiveModel {
        id: Set(otp.id),
        user_id: Set(otp.user_id),
        code: Set(otp.code.clone()),
        status: Set(otp.status.as_str().to_owned()),
        expires_at: Set(otp.expires_at),
        created_at: Set(otp.created_at),
        updated_at: Set(otp.updated_at),
    }
    .insert(txn)
    .await?;
    Ok(())
}

fn otp_from_model(model: otp_requests::Model) -> Result<OtpRequest, ApiServiceError> {
    let status = OtpStatus::parse(&model.status)
        .with_context(|| format!("unknown otp status {:?}", model.status))?;
    Ok(OtpRequest {
        id: model.id,
        user_id: model.user_id,
        code: model.code,
        status,
        expires_at: model.expires_at,
        created_at: model.created_at,
        updated_at: model.updated_at,
    })
}

// ── Account repository ───────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbAccountRepository {
    pub db: DatabaseConnection,
}

impl AccountRepository for DbAccountRepository {
    async fn find_by_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<LinkedAccount>, ApiServiceError> {
        let model = spotify_accounts::Entity::find()
            .filter(spotify_accounts::Column::UserId.eq(user_id))
            .one(&self.db)
            .await
            .map_err(|e| ApiServiceError::transient(e, "find account by user"))?;
        model.map(account_from_model).transpose()
    }

    async fn create(&self, account: &LinkedAccount) -> Result<(), ApiServiceError> {
        spotify_accounts::ActiveModel {
            id: Set(account.id),
            user_id: Set(account.user_id),
            status: Set(account.status.as_str().to_owned()),
            created_at: Set(account.created_at),
            updated_at: Set(account.updated_at),
        }
        .insert(&self.db)
        .await
        .map_err(|e| ApiServiceError::transient(e, "create account"))?;
        Ok(())
    }

    async fn set_status(&self, id: Uuid, status: AccountStatus) -> Result<(), ApiServiceError> {
        spotify_accounts::ActiveModel {
            id: Set(id),
            status: Set(status.as_str().to_owned()),
            updated_at: Set(Utc::now()),
            ..Default::default()
        }
        .update(&self.db)
        .await
        .map_err(|e| ApiServiceError::transient(e, "set account status"))?;
        Ok(())
    }
}

fn account_from_model(model: spotify_accounts::Model) -> Result<LinkedAccount, ApiServiceError> {
    let status = AccountStatus::parse(&model.status)
        .with_context(|| format!("unknown account status {:?}", model.status))?;
    Ok(LinkedAccount {
        id: model.id,
        user_id: model.user_id,
        status,
        created_at: model.created_at,
        updated_at: model.updated_at,
    })
}

// ── Token repository ─────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbTokenRepository {
    pub db: DatabaseConnection,
}

impl TokenRepository for DbTokenRepository {
    async fn find_active(&self, account_id: Uuid) -> Result<Option<OAuthToken>, ApiServiceError> {
        let model = oauth_tokens::Entity::find()
            .filter(oauth_tokens::Column::AccountId.eq(account_id))
            .filter(oauth_tokens::Column::Active.eq(true))
            .one(&self.db)
            .await
            .map_err(|e| ApiServiceError::transient(e, "find active token"))?;
        Ok(model.map(token_from_model))
    }

    async fn rotate(
        &self,
        superseded: Option<Uuid>,
        token: &OAuthToken,
    ) -> Result<RotateOutcome, ApiServiceError> {
        let outcome = self
            .db
            .transaction::<_, RotateOutcome, sea_orm::DbErr>(|txn| {
                let token = token.clone();
                Box::pin(async move {
                    if let Some(superseded_id) = superseded {
                        let result = oauth_tokens::Entity::update_many()
                            .col_expr(oauth_tokens::Column::Active, Expr::value(false))
                            .col_expr(oauth_tokens::Column::UpdatedAt, Expr::value(Utc::now()))
                            .filter(oauth_tokens::Column::Id.eq(superseded_id))
                            .filter(oauth_tokens::Column::Active.eq(true))
                            .exec(txn)
                            .await?;
                        // Zero rows hit: a concurrent rotation already
                        // superseded this token. Write nothing — the caller
                        // re-reads the winner's row.
                        if result.rows_affected == 0 {
                            return Ok(RotateOutcome::Lost);
                        }
                    }
                    insert_token(txn, &token).await?;
                    Ok(RotateOutcome::Stored)
                })
            })
            .await
            .map_err(|e| ApiServiceError::transient(e, "rotate oauth token"))?;
        Ok(outcome)
    }
}

async fn insert_token(
    txn: &DatabaseTransaction,
    token: &OAuthToken,
) -> Result<(), sea_orm::DbErr> {
    oauth_tokens::ActiveModel {
        id: Set(token.id),
        account_id: Set(token.account_id),
        access_token: Set(token.access_token.clone()),
        refresh_token: Set(token.refresh_token.clone()),
        expires_at: Set(token.expires_at),
        scope: Set(token.scope.join(" ")),
        active: Set(token.active),
        created_at: Set(token.created_at),
        updated_at: Set(token.updated_at),
    }
    .insert(txn)
    .await?;
    Ok(())
}

fn token_from_model(model: oauth_tokens::Model) -> OAuthToken {
    OAuthToken {
        id: model.id,
        account_id: model.account_id,
        access_token: model.access_token,
        refresh_token: model.refresh_token,
        expires_at: model.expires_at,
        scope: model.scope.split_whitespace().map(str::to_owned).collect(),
        active: model.active,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}
