use axum::Json;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use senselearn_core::AppError;
use tower_sessions::Session;

use crate::dto::CsrfTokenResponse;
use crate::error::ApiResult;

use super::CSRF_SESSION_KEY;

const CSRF_TOKEN_BYTES: usize = 32;

/// Returns the session's CSRF token, creating one on first use.
pub async fn csrf_token_handler(session: Session) -> ApiResult<Json<CsrfTokenResponse>> {
    let existing = session
        .get::<String>(CSRF_SESSION_KEY)
        .await
        .map_err(|error| AppError::Internal(format!("failed to read csrf token: {error}")))?;

    let csrf_token = match existing {
        Some(token) => token,
        None => {
            let token = generate_csrf_token()?;
            session
                .insert(CSRF_SESSION_KEY, token.clone())
                .await
                .map_err(|error| {
                    AppError::Internal(format!("failed to store csrf token: {error}"))
                })?;
            token
        }
    };

    Ok(Json(CsrfTokenResponse { csrf_token }))
}

fn generate_csrf_token() -> Result<String, AppError> {
    let mut bytes = [0_u8; CSRF_TOKEN_BYTES];
    getrandom::fill(&mut bytes)
        .map_err(|error| AppError::Internal(format!("failed to generate csrf token: {error}")))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::generate_csrf_token;

    #[test]
    fn tokens_are_url_safe_and_unique() {
        let first = generate_csrf_token().unwrap_or_default();
        let second = generate_csrf_token().unwrap_or_default();

        assert_eq!(first.len(), 43);
        assert_ne!(first, second);
        assert!(
            first
                .chars()
                .all(|character| character.is_ascii_alphanumeric() || "-_".contains(character))
        );
    }
}
