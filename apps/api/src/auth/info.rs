use axum::Json;

use crate::dto::{AuthEndpointResponse, AuthEndpointsResponse};

const AUTH_ENDPOINTS: [(&str, &str, &str); 9] = [
    ("POST", "/api/auth/register", "Create a student or tutor account"),
    ("POST", "/api/auth/login", "Sign in with email and password"),
    ("POST", "/api/auth/verify-email", "Confirm the account email with a code"),
    ("POST", "/api/auth/resend-otp", "Send a new one-time code"),
    ("POST", "/api/auth/forgot", "Request a password reset code"),
    ("POST", "/api/auth/reset", "Set a new password with a reset code"),
    ("POST", "/api/auth/logout", "End the current session"),
    ("GET", "/api/auth/me", "Return the signed-in user"),
    ("GET", "/api/auth/csrf-token", "Return the session CSRF token"),
];

pub async fn auth_info_handler() -> Json<AuthEndpointsResponse> {
    Json(AuthEndpointsResponse {
        service: "SenseLearn authentication API",
        endpoints: AUTH_ENDPOINTS
            .into_iter()
            .map(|(method, path, description)| AuthEndpointResponse {
                method,
                path,
                description,
            })
            .collect(),
    })
}
