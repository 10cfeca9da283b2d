use axum::Json;
use axum::extract::{Extension, State};
use senselearn_application::{SecurityEvent, SecurityEventKind};
use senselearn_core::{AppError, UserIdentity};
use tower_sessions::Session;

use crate::client_context::ClientContext;
use crate::dto::{MessageResponse, UserIdentityResponse};
use crate::error::ApiResult;
use crate::state::AppState;

use super::session_helpers::session_identity;

pub async fn logout_handler(
    State(state): State<AppState>,
    ClientContext(context): ClientContext,
    session: Session,
) -> ApiResult<Json<MessageResponse>> {
    let identity = session_identity(&session).await?;

    session
        .delete()
        .await
        .map_err(|error| AppError::Internal(format!("failed to delete session: {error}")))?;

    if let Some(identity) = identity {
        state
            .security_event_service
            .record_event(
                SecurityEvent::new(SecurityEventKind::Logout)
                    .with_subject(identity.email())
                    .with_context(&context),
            )
            .await?;
    }

    Ok(Json(MessageResponse::new("Logged out successfully")))
}

pub async fn me_handler(Extension(identity): Extension<UserIdentity>) -> Json<UserIdentityResponse> {
    Json(UserIdentityResponse::from(identity))
}
