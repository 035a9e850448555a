use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

use crate::error::ApiServiceError;
use crate::state::AppState;
use crate::usecase::otp::{RequestOtpInput, RequestOtpUseCase, VerifyOtpInput, VerifyOtpUseCase};

// ── POST /request_otp ────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct RequestOtpRequest {
    pub phone_number: String,
}

pub async fn request_otp(
    State(state): State<AppState>,
    Json(body): Json<RequestOtpRequest>,
) -> Result<StatusCode, ApiServiceError> {
    let usecase = RequestOtpUseCase {
        users: state.user_repo(),
        otps: state.otp_repo(),
    };
    usecase
        .execute(RequestOtpInput {
            phone_number: body.phone_number,
        })
        .await?;
    // The code travels out of band; it is never echoed back.
    Ok(StatusCode::CREATED)
}

// ── POST /verify_otp ─────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct VerifyOtpRequest {
    pub phone_number: String,
    pub code: String,
}

#[derive(Serialize)]
pub struct VerifyOtpResponse {
    pub result: &'static str,
}

pub async fn verify_otp(
    State(state): State<AppState>,
    Json(body): Json<VerifyOtpRequest>,
) -> Result<Json<VerifyOtpResponse>, ApiServiceError> {
    let usecase = VerifyOtpUseCase {
        users: state.user_repo(),
        otps: state.otp_repo(),
    };
    let outcome = usecase
        .execute(VerifyOtpInput {
            phone_number: body.phone_number,
            code: body.code,
        })
        .await?;
    Ok(Json(VerifyOtpResponse {
        result: outcome.as_str(),
    }))
}
