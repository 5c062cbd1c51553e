//! Token cookie handling, the route gate, and auth extractors.
//!
//! [`auth_gate`] runs on every request: it decodes the `token` cookie,
//! applies the access policy from `rimline_core::access`, and stores the
//! [`CurrentUser`] in request extensions for the extractors below. A token
//! that fails to decode (forged, malformed, expired) is treated as absent
//! and cleared from the browser.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::cookie::{Cookie, SameSite, time::Duration};

use rimline_core::access::{self, Access};

use crate::config::jwt_secret_bytes;
use crate::error::{clear_sentry_user, set_sentry_user};
use crate::models::CurrentUser;
use crate::services::auth::AuthService;
use crate::state::AppState;

/// Name of the cookie holding the API's JWT.
pub const TOKEN_COOKIE: &str = "token";

/// Lifetime of the token cookie when the token has no `exp` (7 days).
const TOKEN_COOKIE_DAYS: i64 = 7;

/// `Set-Cookie` value storing the token.
#[must_use]
pub fn token_cookie(user: &CurrentUser, token: &str, secure: bool) -> String {
    let max_age = user
        .expires_at
        .map(|exp| (exp - chrono::Utc::now()).num_seconds().max(0))
        .unwrap_or(TOKEN_COOKIE_DAYS * 24 * 60 * 60);

    Cookie::build((TOKEN_COOKIE, token.to_string()))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(Duration::seconds(max_age))
        .build()
        .to_string()
}

/// `Set-Cookie` value deleting the token.
#[must_use]
pub fn clear_token_cookie() -> String {
    Cookie::build((TOKEN_COOKIE, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(Duration::ZERO)
        .build()
        .to_string()
}

/// Read the token cookie from request headers.
#[must_use]
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == TOKEN_COOKIE && !cookie.value().is_empty())
        .map(|cookie| cookie.value().to_string())
}

/// Login URL that returns to `next` afterwards.
#[must_use]
pub fn login_url(next: &str) -> String {
    format!("/login?next={}", urlencoding::encode(next))
}

/// Middleware that decodes the token cookie and enforces the access policy.
///
/// | path | anonymous | user | admin |
/// |------|-----------|------|-------|
/// | `/admin/*` | login | home | allow |
/// | `/profile/*` | login | allow | allow |
/// | `/login`, `/register` | allow | `/profile` | `/admin` |
pub async fn auth_gate(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let token = token_from_headers(request.headers());
    let auth = AuthService::new(state.api(), jwt_secret_bytes(&state.config().auth));

    let user = token.as_deref().and_then(|token| match auth.authenticate(token) {
        Ok(user) => Some(user),
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring unusable token cookie");
            None
        }
    });
    let stale_cookie = token.is_some() && user.is_none();

    let path = request.uri().path().to_string();
    let path_and_query = request
        .uri()
        .path_and_query()
        .map_or_else(|| path.clone(), |pq| pq.as_str().to_string());

    let mut response = match access::check(&path, &path_and_query, user.as_ref().map(|u| u.role)) {
        Access::Allow => {
            match &user {
                Some(user) => set_sentry_user(&user.id, user.email.as_deref()),
                None => clear_sentry_user(),
            }
            if let Some(user) = user {
                request.extensions_mut().insert(user);
            }
            next.run(request).await
        }
        Access::Login { next } => Redirect::to(&login_url(&next)).into_response(),
        Access::Redirect(to) => Redirect::to(to).into_response(),
    };

    if stale_cookie && let Ok(value) = clear_token_cookie().parse() {
        response.headers_mut().append(header::SET_COOKIE, value);
    }
    response
}

// =============================================================================
// Extractors
// =============================================================================

/// Extractor that requires a signed-in user.
///
/// If nobody is signed in, returns a redirect to the login page.
///
/// # Example
///
/// ```rust,ignore
/// async fn profile(RequireUser(user): RequireUser) -> impl IntoResponse {
///     format!("Hello, {}!", user.display_name())
/// }
/// ```
pub struct RequireUser(pub CurrentUser);

/// Extractor that requires an admin.
pub struct RequireAdmin(pub CurrentUser);

/// Extractor that optionally gets the current user.
pub struct OptionalUser(pub Option<CurrentUser>);

/// Rejection for the auth extractors.
pub enum AuthRejection {
    /// Send to login, returning to this path.
    RedirectToLogin(String),
    /// Signed in without the needed role.
    Forbidden,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin(next) => Redirect::to(&login_url(&next)).into_response(),
            Self::Forbidden => Redirect::to("/").into_response(),
        }
    }
}

fn current_path(parts: &Parts) -> String {
    parts
        .uri
        .path_and_query()
        .map_or_else(|| parts.uri.path().to_string(), |pq| pq.as_str().to_string())
}

impl<S> FromRequestParts<S> for RequireUser
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .map(Self)
            .ok_or_else(|| AuthRejection::RedirectToLogin(current_path(parts)))
    }
}

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<CurrentUser>() {
            Some(user) if user.is_admin() => Ok(Self(user.clone())),
            Some(_) => Err(AuthRejection::Forbidden),
            None => Err(AuthRejection::RedirectToLogin(current_path(parts))),
        }
    }
}

impl<S> FromRequestParts<S> for OptionalUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<CurrentUser>().cloned()))
    }
}
