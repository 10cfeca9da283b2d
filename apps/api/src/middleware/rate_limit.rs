use axum::extract::{Extension, Request, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::middleware::Next;
use axum::response::Response;
use senselearn_application::{RateLimitDecision, RateLimitRule, SecurityEvent, SecurityEventKind};
use tracing::warn;

use crate::client_context::{client_ip, request_context};
use crate::error::{ApiResult, GuardRejection};
use crate::state::AppState;

/// Counts the request against the route group's rule and rejects it with
/// `429` once the window is full.
pub async fn rate_limit(
    State(state): State<AppState>,
    Extension(rule): Extension<RateLimitRule>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    let trust_forwarded_for = state.security.trust_forwarded_for;
    let identifier = client_ip(request.headers(), request.extensions(), trust_forwarded_for);
    let decision = state.rate_limit_service.check(&rule, &identifier).await?;

    if !decision.allowed {
        warn!(
            category = %rule.category,
            client = %identifier,
            retry_after = decision.retry_after_seconds,
            "rate limit exceeded"
        );

        let context = request_context(request.headers(), request.extensions(), trust_forwarded_for);
        state
            .security_event_service
            .record_event(
                SecurityEvent::new(SecurityEventKind::RateLimitExceeded)
                    .with_context(&context)
                    .with_detail(format!("{} {}", rule.category, request.uri().path())),
            )
            .await?;

        return Ok(rate_limited_response(&decision));
    }

    let mut response = next.run(request).await;
    apply_rate_limit_headers(response.headers_mut(), &decision);
    Ok(response)
}

fn rate_limited_response(decision: &RateLimitDecision) -> Response {
    let retry_after = decision.retry_after_seconds;
    let mut response = GuardRejection::new(format!(
        "Too many requests. Please try again in {retry_after} seconds."
    ))
    .with_retry_after(retry_after)
    .into_response_with(StatusCode::TOO_MANY_REQUESTS);
    let headers = response.headers_mut();
    apply_rate_limit_headers(headers, decision);
    headers.insert(header::RETRY_AFTER, header_number(retry_after));
    response
}

fn apply_rate_limit_headers(headers: &mut HeaderMap, decision: &RateLimitDecision) {
    headers.insert("x-ratelimit-limit", header_number(decision.limit));
    headers.insert("x-ratelimit-remaining", header_number(decision.remaining));
    headers.insert(
        "x-ratelimit-reset",
        header_number(decision.reset_at.timestamp()),
    );
}

fn header_number(value: impl ToString) -> HeaderValue {
    value
        .to_string()
        .parse()
        .unwrap_or_else(|_| HeaderValue::from_static("0"))
}
