use senselearn_core::{AppError, UserIdentity};
use tower_sessions::Session;

use super::SESSION_USER_KEY;

/// Rotates the session id and stores the identity, so a session fixed
/// before login is never authenticated.
pub(super) async fn establish_session(
    session: &Session,
    identity: UserIdentity,
) -> Result<(), AppError> {
    session
        .cycle_id()
        .await
        .map_err(|error| AppError::Internal(format!("failed to rotate session id: {error}")))?;

    session
        .insert(SESSION_USER_KEY, identity)
        .await
        .map_err(|error| AppError::Internal(format!("failed to persist session: {error}")))
}

pub(super) async fn session_identity(session: &Session) -> Result<Option<UserIdentity>, AppError> {
    session
        .get::<UserIdentity>(SESSION_USER_KEY)
        .await
        .map_err(|error| AppError::Internal(format!("failed to read session identity: {error}")))
}
