mod auth;
mod common;

pub use auth::{
    AuthEndpointResponse, AuthEndpointsResponse, AuthenticatedUserResponse, CsrfTokenResponse,
    ForgotPasswordRequest, LockedAccountResponse, LoginFailureResponse, LoginRequest,
    RegisterRequest, RegisterResponse, ResendOtpRequest, ResetPasswordRequest,
    UserIdentityResponse, UserResponse, VerifyEmailRequest,
};
pub use common::{HealthResponse, MessageResponse};
