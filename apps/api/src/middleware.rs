mod csrf;
mod rate_limit;
mod security_headers;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use senselearn_core::{AppError, UserIdentity};
use tower_sessions::Session;

use crate::auth::SESSION_USER_KEY;
use crate::error::ApiResult;

pub use csrf::csrf_guard;
pub use rate_limit::rate_limit;
pub use security_headers::security_headers;

pub async fn require_auth(
    session: Session,
    mut request: Request,
    next: Next,
) -> ApiResult<Response> {
    let identity = session
        .get::<UserIdentity>(SESSION_USER_KEY)
        .await
        .map_err(|error| AppError::Internal(format!("failed to read session identity: {error}")))?
        .ok_or_else(|| AppError::Unauthorized("Authentication required".to_owned()))?;

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}
