mod csrf;
mod info;
mod login;
mod recovery;
mod registration;
mod session;
mod session_helpers;

pub use csrf::csrf_token_handler;
pub use info::auth_info_handler;
pub use login::login_handler;
pub use recovery::{forgot_password_handler, resend_otp_handler, reset_password_handler};
pub use registration::{register_handler, verify_email_handler};
pub use session::{logout_handler, me_handler};

pub const SESSION_USER_KEY: &str = "user_identity";
pub const CSRF_SESSION_KEY: &str = "csrf_token";
pub const CSRF_HEADER_NAME: &str = "x-csrf-token";
pub const CSRF_FIELD_NAME: &str = "csrf_token";
