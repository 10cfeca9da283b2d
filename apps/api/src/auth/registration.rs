use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use senselearn_application::RegisterParams;
use senselearn_core::AppError;
use tower_sessions::Session;

use crate::client_context::ClientContext;
use crate::dto::{
    AuthenticatedUserResponse, RegisterRequest, RegisterResponse, UserResponse, VerifyEmailRequest,
};
use crate::error::ApiResult;
use crate::state::AppState;

use super::session_helpers::{establish_session, session_identity};

pub async fn register_handler(
    State(state): State<AppState>,
    ClientContext(context): ClientContext,
    session: Session,
    Json(payload): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    let experience_years = payload
        .experience_years
        .as_ref()
        .map(|value| {
            json_i64(value).ok_or_else(|| {
                AppError::Validation("Experience years must be a whole number".to_owned())
            })
        })
        .transpose()?;
    let hourly_rate = payload
        .hourly_rate
        .as_ref()
        .map(|value| {
            json_f64(value)
                .ok_or_else(|| AppError::Validation("Hourly rate must be a number".to_owned()))
        })
        .transpose()?;

    let user = state
        .user_service
        .register(RegisterParams {
            email: payload.email,
            password: payload.password,
            full_name: payload.full_name,
            user_type: payload.user_type,
            username: payload.username,
            phone_number: payload.phone_number,
            disability_type: payload.disability_type,
            qualifications: payload.qualifications,
            subjects: payload.subjects,
            bio: payload.bio,
            experience_years,
            hourly_rate,
            context,
        })
        .await?;

    establish_session(&session, user.identity()).await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "Registration successful. Please check your email for the verification code."
                .to_owned(),
            user_type: user.user_type.as_str(),
            user: UserResponse::from(&user),
        }),
    ))
}

pub async fn verify_email_handler(
    State(state): State<AppState>,
    ClientContext(context): ClientContext,
    session: Session,
    Json(payload): Json<VerifyEmailRequest>,
) -> ApiResult<Json<AuthenticatedUserResponse>> {
    let user = state
        .user_service
        .verify_email(&payload.email, &payload.otp, &context)
        .await?;

    // Refresh the session only when it already belongs to this account.
    let signed_in_as_user = session_identity(&session)
        .await?
        .is_some_and(|identity| identity.subject() == user.id.to_string());
    if signed_in_as_user {
        establish_session(&session, user.identity()).await?;
    }

    Ok(Json(AuthenticatedUserResponse {
        message: "Email verified successfully".to_owned(),
        user: UserResponse::from(&user),
    }))
}

fn json_i64(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(number) => number.as_i64(),
        serde_json::Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn json_f64(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(number) => number.as_f64(),
        serde_json::Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}
