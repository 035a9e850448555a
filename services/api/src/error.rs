use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// API service domain error variants.
///
/// Verification outcomes (accepted/expired/mismatch/no-active-request) are
/// NOT errors — they live in `domain::types::VerifyOutcome` so callers must
/// handle every case.
#[derive(Debug, thiserror::Error)]
pub enum ApiServiceError {
    #[error("invalid phone number")]
    InvalidPhoneNumber,
    #[error("user not found")]
    UserNotFound,
    #[error("phone verification incomplete")]
    UserNotVerified,
    #[error("no linked account")]
    NoLinkedAccount,
    #[error("track batch exceeds provider limit")]
    BatchTooLarge,
    #[error("token refresh failed")]
    RefreshFailed,
    #[error("upstream api error: status {status}")]
    Upstream { status: u16 },
    #[error("transient i/o error")]
    Transient(#[source] anyhow::Error),
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl ApiServiceError {
    /// Wrap a persistence or network failure. Nothing was committed, so the
    /// whole operation is safe to retry.
    pub fn transient<E>(err: E, context: &'static str) -> Self
    where
        E: Into<anyhow::Error>,
    {
        Self::Transient(err.into().context(context))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidPhoneNumber => "INVALID_PHONE_NUMBER",
            Self::UserNotFound => "USER_NOT_FOUND",
            Self::UserNotVerified => "USER_NOT_VERIFIED",
            Self::NoLinkedAccount => "NO_LINKED_ACCOUNT",
            Self::BatchTooLarge => "BATCH_TOO_LARGE",
            Self::RefreshFailed => "REFRESH_FAILED",
            Self::Upstream { .. } => "UPSTREAM",
            Self::Transient(_) => "TRANSIENT_IO",
            Self::Internal(_) => "INTERNAL",
        }
    }
}

impl IntoResponse for ApiServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::InvalidPhoneNumber | Self::BatchTooLarge => StatusCode::BAD_REQUEST,
            Self::UserNotVerified => StatusCode::FORBIDDEN,
            Self::UserNotFound | Self::NoLinkedAccount => StatusCode::NOT_FOUND,
            Self::RefreshFailed | Self::Upstream { .. } => StatusCode::BAD_GATEWAY,
            Self::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        // Log 500s only — tower-http TraceLayer already records method/uri/status for all
        // requests. 4xx are expected client errors; logging them here would be noise.
        // Internal errors need the anyhow chain logged so the root cause is traceable.
        match &self {
            Self::Internal(e) => tracing::error!(error = %e, kind = "INTERNAL", "internal error"),
            Self::Transient(e) => tracing::warn!(error = %e, kind = "TRANSIENT_IO", "transient i/o error"),
            _ => {}
        }
        let body = serde_json::json!({
            "kind": self.kind(),
            "message": self.to_string(),
        });
        (status, axum::Json(body)).into_response()
    }
}
