mod cors;
mod public_auth;


use axum::Router;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post};
use senselearn_core::AppError;
use tower_http::trace::TraceLayer;
use tower_sessions::{MemoryStore, SessionManagerLayer};

use crate::state::AppState;
use crate::{auth, handlers, middleware};

use self::cors::build_cors_layer;
use self::public_auth::{
    build_login_routes, build_otp_routes, build_password_reset_routes, build_register_routes,
};

pub fn build_router(
    app_state: AppState,
    frontend_url: &str,
    session_layer: SessionManagerLayer<MemoryStore>,
) -> Result<Router, AppError> {
    let protected_routes = Router::new()
        .route("/api/auth/me", get(auth::me_handler))
        .route_layer(from_fn(middleware::require_auth));

    let session_routes = Router::new()
        .route("/api/auth/logout", post(auth::logout_handler))
        .route_layer(from_fn_with_state(app_state.clone(), middleware::csrf_guard));

    Ok(Router::new()
        .route("/health", get(handlers::health::health_handler))
        .route("/api/auth", get(auth::auth_info_handler))
        .route("/api/auth/csrf-token", get(auth::csrf_token_handler))
        .merge(build_login_routes(app_state.clone()))
        .merge(build_register_routes(app_state.clone()))
        .merge(build_password_reset_routes(app_state.clone()))
        .merge(build_otp_routes(app_state.clone()))
        .merge(session_routes)
        .merge(protected_routes)
        .layer(session_layer)
        .layer(build_cors_layer(frontend_url)?)
        .layer(TraceLayer::new_for_http())
        .layer(from_fn_with_state(
            app_state.clone(),
            middleware::security_headers,
        ))
        .with_state(app_state))
}
