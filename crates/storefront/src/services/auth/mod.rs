//! Authentication service.
//!
//! Accounts live in the REST API. The storefront forwards credentials to
//! `POST /auth/login` / `POST /auth/register`, then decodes the returned JWT
//! into a [`CurrentUser`] for the cookie.

mod error;
pub mod jwt;

pub use error::AuthError;

use chrono::Utc;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use rimline_core::{Email, UserId};

use crate::api::{ApiClient, ApiError};
use crate::models::CurrentUser;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum password length (the API hashes with bcrypt).
const MAX_PASSWORD_LENGTH: usize = 72;

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RegisterRequest<'a> {
    name: &'a str,
    email: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    phone: Option<&'a str>,
}

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(alias = "access_token", alias = "jwt")]
    token: String,
    #[serde(default)]
    user: Option<TokenUser>,
}

#[derive(Deserialize)]
struct TokenUser {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

/// Registration form input.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub phone: String,
}

/// Authentication service.
pub struct AuthService<'a> {
    api: &'a ApiClient,
    jwt_secret: Option<&'a [u8]>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(api: &'a ApiClient, jwt_secret: Option<&'a [u8]>) -> Self {
        Self { api, jwt_secret }
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the API rejects the credentials.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<CurrentUser, AuthError> {
        let email = Email::parse(email)?;
        if password.is_empty() {
            return Err(AuthError::MissingField("password"));
        }

        let response: TokenResponse = self
            .api
            .post(
                "/auth/login",
                &LoginRequest {
                    email: email.as_str(),
                    password,
                },
                None,
            )
            .await
            .map_err(|e| match e {
                ApiError::Unauthorized
                | ApiError::NotFound(_)
                | ApiError::Rejected {
                    status: 400 | 401, ..
                } => AuthError::InvalidCredentials,
                other => AuthError::Api(other),
            })?;

        self.current_user(response)
    }

    /// Register a new account and sign it in.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    #[instrument(skip(self, form), fields(email = %form.email))]
    pub async fn register(&self, form: &Registration) -> Result<CurrentUser, AuthError> {
        let name = form.name.trim();
        if name.is_empty() {
            return Err(AuthError::MissingField("name"));
        }
        let email = Email::parse(&form.email)?;
        validate_password(&form.password)?;
        let phone = Some(form.phone.trim()).filter(|p| !p.is_empty());

        let response: TokenResponse = self
            .api
            .post(
                "/auth/register",
                &RegisterRequest {
                    name,
                    email: email.as_str(),
                    password: &form.password,
                    phone,
                },
                None,
            )
            .await
            .map_err(|e| match e {
                ApiError::Rejected { status: 409, .. } => AuthError::UserAlreadyExists,
                other => AuthError::Api(other),
            })?;

        self.current_user(response)
    }

    /// Decode a token from the cookie.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is malformed, forged or expired.
    pub fn authenticate(&self, token: &str) -> Result<CurrentUser, AuthError> {
        let claims = jwt::decode(token, self.jwt_secret, Utc::now())?;
        Ok(CurrentUser {
            id: UserId::new(claims.user_id),
            role: claims.role,
            name: claims.name,
            email: claims.email,
            expires_at: claims.expires_at,
            token: SecretString::from(token.to_string()),
        })
    }

    fn current_user(&self, response: TokenResponse) -> Result<CurrentUser, AuthError> {
        let mut user = self.authenticate(&response.token)?;
        if let Some(profile) = response.user {
            user.name = user.name.or(profile.name);
            user.email = user.email.or(profile.email);
        }
        Ok(user)
    }
}

/// Validate password requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Password must be at most {MAX_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}
