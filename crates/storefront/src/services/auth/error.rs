//! Authentication error types.

use thiserror::Error;

use crate::api::ApiError;

use super::jwt::JwtError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] rimline_core::EmailError),

    /// Invalid credentials (wrong password or unknown account).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Account already exists.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Required field left blank.
    #[error("{0} is required")]
    MissingField(&'static str),

    /// The API answered without a usable token.
    #[error("token rejected: {0}")]
    Token(#[from] JwtError),

    /// The API call itself failed.
    #[error("api error: {0}")]
    Api(#[from] ApiError),
}

impl AuthError {
    /// Message for the login/register form.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidEmail(_) => "Please enter a valid email address.".to_string(),
            Self::InvalidCredentials => "Invalid email or password.".to_string(),
            Self::UserAlreadyExists => "An account with this email already exists.".to_string(),
            Self::WeakPassword(msg) => msg.clone(),
            Self::MissingField(field) => format!("Please enter your {field}."),
            Self::Token(_) => "Sign-in failed, please try again.".to_string(),
            Self::Api(err) => err.user_message(),
        }
    }
}
