use axum::body::{Body, to_bytes};
use axum::extract::{Request, State};
use axum::http::{Method, StatusCode, header};
use axum::middleware::Next;
use axum::response::Response;
use senselearn_application::{SecurityEvent, SecurityEventKind};
use senselearn_core::AppError;
use subtle::ConstantTimeEq;
use tower_sessions::Session;

use crate::auth::{CSRF_FIELD_NAME, CSRF_HEADER_NAME, CSRF_SESSION_KEY};
use crate::client_context::request_context;
use crate::error::{ApiResult, GuardRejection};
use crate::state::AppState;

/// Largest body buffered while looking for a form or JSON token.
const CSRF_BODY_LIMIT: usize = 1024 * 1024;

const MISSING_TOKEN_MESSAGE: &str = "CSRF token missing. Please refresh the page.";
const INVALID_TOKEN_MESSAGE: &str = "Invalid CSRF token. Please refresh the page.";

/// Rejects state-changing requests whose token does not match the one
/// stored in the session.
///
/// The token is read from the `X-CSRF-Token` header, then from a
/// `csrf_token` field in a JSON or form body.
pub async fn csrf_guard(
    State(state): State<AppState>,
    session: Session,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    if !state.security.csrf_enabled || is_safe_method(request.method()) {
        return Ok(next.run(request).await);
    }

    let expected = session
        .get::<String>(CSRF_SESSION_KEY)
        .await
        .map_err(|error| AppError::Internal(format!("failed to read csrf token: {error}")))?;

    let (request, submitted) = extract_submitted_token(request).await?;

    let violation = match (expected, submitted) {
        (Some(expected), Some(submitted)) => {
            if tokens_match(&expected, &submitted) {
                None
            } else {
                Some(INVALID_TOKEN_MESSAGE)
            }
        }
        _ => Some(MISSING_TOKEN_MESSAGE),
    };

    let Some(message) = violation else {
        return Ok(next.run(request).await);
    };

    let context = request_context(
        request.headers(),
        request.extensions(),
        state.security.trust_forwarded_for,
    );
    state
        .security_event_service
        .record_event(
            SecurityEvent::new(SecurityEventKind::CsrfViolation)
                .with_context(&context)
                .with_detail(format!("{} {}", request.method(), request.uri().path())),
        )
        .await?;

    Ok(GuardRejection::new(message).into_response_with(StatusCode::FORBIDDEN))
}

fn is_safe_method(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

fn tokens_match(expected: &str, submitted: &str) -> bool {
    expected.as_bytes().ct_eq(submitted.as_bytes()).into()
}

/// Returns the request (with its body restored) and the submitted token.
async fn extract_submitted_token(request: Request) -> ApiResult<(Request, Option<String>)> {
    let from_header = request
        .headers()
        .get(CSRF_HEADER_NAME)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned);
    if from_header.is_some() {
        return Ok((request, from_header));
    }

    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let is_json = content_type.starts_with("application/json");
    let is_form = content_type.starts_with("application/x-www-form-urlencoded");
    if !is_json && !is_form {
        return Ok((request, None));
    }

    let (parts, body) = request.into_parts();
    let bytes = to_bytes(body, CSRF_BODY_LIMIT)
        .await
        .map_err(|_| AppError::Validation("Request body is too large".to_owned()))?;

    let token = if is_json {
        token_from_json(&bytes)
    } else {
        token_from_form(&bytes)
    };

    Ok((Request::from_parts(parts, Body::from(bytes)), token))
}

fn token_from_json(bytes: &[u8]) -> Option<String> {
    serde_json::from_slice::<serde_json::Value>(bytes)
        .ok()?
        .get(CSRF_FIELD_NAME)?
        .as_str()
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
}

// Tokens are URL-safe base64, so form values never need percent-decoding.
fn token_from_form(bytes: &[u8]) -> Option<String> {
    std::str::from_utf8(bytes)
        .ok()?
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == CSRF_FIELD_NAME)
        .map(|(_, value)| value.to_owned())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comparison_requires_exact_match() {
        assert!(tokens_match("abc123", "abc123"));
        assert!(!tokens_match("abc123", "abc124"));
        assert!(!tokens_match("abc123", "abc12"));
    }

    #[test]
    fn json_and_form_tokens_are_found() {
        assert_eq!(
            token_from_json(br#"{"email":"a@b.io","csrf_token":"tok-_1"}"#),
            Some("tok-_1".to_owned())
        );
        assert_eq!(token_from_json(br#"{"csrf_token":""}"#), None);
        assert_eq!(token_from_json(b"not json"), None);
        assert_eq!(
            token_from_form(b"email=a%40b.io&csrf_token=tok-_1"),
            Some("tok-_1".to_owned())
        );
        assert_eq!(token_from_form(b"email=a%40b.io"), None);
    }

    #[test]
    fn only_read_methods_bypass_the_guard() {
        assert!(is_safe_method(&Method::GET));
        assert!(is_safe_method(&Method::OPTIONS));
        assert!(!is_safe_method(&Method::POST));
        assert!(!is_safe_method(&Method::DELETE));
    }
}
