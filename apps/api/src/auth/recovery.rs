use axum::Json;
use axum::extract::State;
use senselearn_domain::OtpPurpose;

use crate::client_context::ClientContext;
use crate::dto::{ForgotPasswordRequest, MessageResponse, ResendOtpRequest, ResetPasswordRequest};
use crate::error::ApiResult;
use crate::state::AppState;

const CODE_SENT_MESSAGE: &str = "If an account exists for this email, a new code has been sent.";
const RESET_REQUESTED_MESSAGE: &str =
    "If an account exists for this email, a password reset code has been sent.";

pub async fn resend_otp_handler(
    State(state): State<AppState>,
    Json(payload): Json<ResendOtpRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let purpose = payload
        .purpose
        .as_deref()
        .map(str::parse::<OtpPurpose>)
        .transpose()?
        .unwrap_or(OtpPurpose::EmailVerification);

    state
        .user_service
        .resend_code(&payload.email, purpose)
        .await?;

    Ok(Json(MessageResponse::new(CODE_SENT_MESSAGE)))
}

pub async fn forgot_password_handler(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    state
        .user_service
        .request_password_reset(&payload.email)
        .await?;

    Ok(Json(MessageResponse::new(RESET_REQUESTED_MESSAGE)))
}

pub async fn reset_password_handler(
    State(state): State<AppState>,
    ClientContext(context): ClientContext,
    Json(payload): Json<ResetPasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    state
        .user_service
        .reset_password(&payload.email, &payload.code, &payload.new_password, &context)
        .await?;

    Ok(Json(MessageResponse::new(
        "Password has been reset. You can now log in.",
    )))
}
