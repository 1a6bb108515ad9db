use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bcrypt::BcryptError;
use diesel::result::Error as DieselError;
use serde::Deserialize;
use thiserror::Error;
use tower_sessions::session::Error as SessionError;
use validator::Validate;

// Infrastructure failures during login/logout. User-facing outcomes such as
// bad credentials are flash messages, not error responses.
#[derive(Error, Debug)]
pub enum LoginError {
    #[error("Database connection error")]
    Pool(#[from] r2d2::Error),
    #[error("Database error")]
    Database(#[from] DieselError),
    #[error("Hashing error")]
    Hashing(#[from] BcryptError),
    #[error("Session error: {0}")]
    Session(String),
}

// Infrastructure failures during signup.
#[derive(Error, Debug)]
pub enum SignupError {
    #[error("Database connection error")]
    Pool(#[from] r2d2::Error),
    #[error("Database error")]
    Database(#[from] DieselError),
    #[error("Hashing error")]
    Hashing(#[from] BcryptError),
    #[error("Session error: {0}")]
    Session(String),
}

impl IntoResponse for LoginError {
    fn into_response(self) -> Response {
        log::error!("Login request failed: {}", self);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
    }
}

impl IntoResponse for SignupError {
    fn into_response(self) -> Response {
        log::error!("Signup request failed: {}", self);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
    }
}

impl From<SessionError> for LoginError {
    fn from(err: SessionError) -> Self {
        LoginError::Session(err.to_string())
    }
}

impl From<SessionError> for SignupError {
    fn from(err: SessionError) -> Self {
        SignupError::Session(err.to_string())
    }
}

// Form structs
#[derive(Debug, Deserialize, Validate)]
pub struct SignupForm {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}
