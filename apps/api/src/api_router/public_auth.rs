use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::post;
use senselearn_application::RateLimitRule;

use crate::state::AppState;
use crate::{auth, middleware};

pub(super) fn build_login_routes(app_state: AppState) -> Router<AppState> {
    let rule = app_state.rate_limits.login.clone();
    let routes = Router::new().route("/api/auth/login", post(auth::login_handler));
    rate_limited(routes, app_state, rule)
}

pub(super) fn build_register_routes(app_state: AppState) -> Router<AppState> {
    let rule = app_state.rate_limits.register.clone();
    let routes = Router::new().route("/api/auth/register", post(auth::register_handler));
    rate_limited(routes, app_state, rule)
}

pub(super) fn build_password_reset_routes(app_state: AppState) -> Router<AppState> {
    let rule = app_state.rate_limits.password_reset.clone();
    let routes = Router::new()
        .route("/api/auth/forgot", post(auth::forgot_password_handler))
        .route("/api/auth/reset", post(auth::reset_password_handler));
    rate_limited(routes, app_state, rule)
}

pub(super) fn build_otp_routes(app_state: AppState) -> Router<AppState> {
    let rule = app_state.rate_limits.otp.clone();
    let routes = Router::new()
        .route("/api/auth/verify-email", post(auth::verify_email_handler))
        .route("/api/auth/resend-otp", post(auth::resend_otp_handler));
    rate_limited(routes, app_state, rule)
}

/// Counts requests against `rule` before the CSRF guard runs.
fn rate_limited(
    routes: Router<AppState>,
    app_state: AppState,
    rule: RateLimitRule,
) -> Router<AppState> {
    routes
        .route_layer(from_fn_with_state(app_state.clone(), middleware::csrf_guard))
        .route_layer(from_fn_with_state(app_state, middleware::rate_limit))
        .layer(axum::Extension(rule))
}
