mod cleanup;
mod email;
mod sessions;
mod state_builder;

pub use cleanup::spawn_cleanup_task;
pub use email::build_email_service;
pub use sessions::build_session_layer;
pub use state_builder::build_app_state;
