//! SenseLearn authentication API composition root.

#![forbid(unsafe_code)]

mod api_config;
mod api_router;
mod api_services;
mod auth;
mod client_context;
mod dto;
mod error;
mod handlers;
mod middleware;
mod state;

use std::net::SocketAddr;

use senselearn_core::AppError;
use tracing::info;

use crate::api_config::{ApiConfig, init_tracing};
use crate::api_router::build_router;
use crate::api_services::{
    build_app_state, build_email_service, build_session_layer, spawn_cleanup_task,
};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ApiConfig::load()?;
    let email_service = build_email_service(&config.email_provider);
    let app_state = build_app_state(&config, email_service);
    let _cleanup_task = spawn_cleanup_task(app_state.clone());

    let session_layer =
        build_session_layer(config.cookie_secure, config.session_inactivity_minutes);
    let app = build_router(app_state, &config.frontend_url, session_layer)?;

    let address = config.socket_address()?;
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind listener: {error}")))?;

    info!(
        %address,
        csrf_enabled = config.csrf_enabled,
        trust_forwarded_for = config.trust_forwarded_for,
        "senselearn-api listening"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .map_err(|error| AppError::Internal(format!("api server error: {error}")))
}
