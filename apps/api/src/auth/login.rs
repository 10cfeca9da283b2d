use axum::Json;
use axum::extract::State;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use senselearn_application::{LockoutStatus, LoginOutcome};
use tower_sessions::Session;

use crate::client_context::ClientContext;
use crate::dto::{
    AuthenticatedUserResponse, LockedAccountResponse, LoginFailureResponse, LoginRequest,
    UserResponse,
};
use crate::error::ApiResult;
use crate::state::AppState;

use super::session_helpers::establish_session;

pub async fn login_handler(
    State(state): State<AppState>,
    ClientContext(context): ClientContext,
    session: Session,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<Response> {
    let outcome = state
        .user_service
        .login(&payload.email, &payload.password, &context)
        .await?;

    match outcome {
        LoginOutcome::Authenticated(user) => {
            establish_session(&session, user.identity()).await?;
            Ok(Json(AuthenticatedUserResponse {
                message: "Login successful".to_owned(),
                user: UserResponse::from(&user),
            })
            .into_response())
        }
        LoginOutcome::InvalidCredentials(status) => Ok((
            StatusCode::UNAUTHORIZED,
            Json(LoginFailureResponse::from_status(
                "Invalid email or password",
                &status,
            )),
        )
            .into_response()),
        LoginOutcome::Locked(status) => Ok(locked_response(&status)),
    }
}

fn locked_response(status: &LockoutStatus) -> Response {
    let body = LockedAccountResponse::from_status(status, Utc::now());
    let retry_after = body.retry_after_seconds;

    let mut response = (StatusCode::LOCKED, Json(body)).into_response();
    if let Ok(value) = HeaderValue::from_str(&retry_after.to_string()) {
        response.headers_mut().insert(header::RETRY_AFTER, value);
    }
    response
}
