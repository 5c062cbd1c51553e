//! Authentication route handlers.
//!
//! The API issues the JWT; the storefront only stores it in the `token`
//! cookie and decodes it per request (see `middleware::auth`).

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::header::SET_COOKIE,
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use secrecy::ExposeSecret;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use rimline_core::access::is_local_path;

use crate::components::PageContext;
use crate::config::jwt_secret_bytes;
use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::middleware::auth::{clear_token_cookie, token_cookie};
use crate::models::{CurrentUser, FlashKind, flash};
use crate::services::auth::{AuthError, AuthService, Registration};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub next: String,
}

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub next: String,
}

/// Where to return after signing in.
#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    #[serde(default)]
    pub next: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub ctx: PageContext,
    pub email: String,
    pub next: String,
    pub error: Option<String>,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub ctx: PageContext,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub next: String,
    pub error: Option<String>,
}

// =============================================================================
// Helpers
// =============================================================================

/// Local `next` target, or the user's home area.
fn destination(next: &str, user: &CurrentUser) -> String {
    if !next.is_empty() && is_local_path(next) {
        next.to_string()
    } else if user.is_admin() {
        "/admin".to_string()
    } else {
        "/profile".to_string()
    }
}

/// `next` kept only when it is a local path.
fn local_next(next: &str) -> String {
    if is_local_path(next) {
        next.to_string()
    } else {
        String::new()
    }
}

/// Store the token cookie and send the user on.
async fn sign_in(
    state: &AppState,
    session: &Session,
    user: &CurrentUser,
    next: &str,
    welcome: String,
) -> Result<Response> {
    // New session id on privilege change
    session.cycle_id().await?;
    flash::push(session, FlashKind::Success, welcome).await?;
    set_sentry_user(&user.id, user.email.as_deref());
    tracing::info!(user_id = %user.id, role = %user.role, "User signed in");

    let cookie = token_cookie(
        user,
        user.token.expose_secret(),
        state.config().secure_cookies(),
    );
    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        Redirect::to(&destination(next, user)),
    )
        .into_response())
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the login page.
#[instrument(skip(ctx))]
pub async fn login_page(ctx: PageContext, Query(query): Query<NextQuery>) -> impl IntoResponse {
    LoginTemplate {
        ctx,
        email: String::new(),
        next: local_next(&query.next),
        error: None,
    }
}

/// Handle login form submission.
#[instrument(skip(state, session, ctx, form), fields(email = %form.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    ctx: PageContext,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let auth = AuthService::new(state.api(), jwt_secret_bytes(&state.config().auth));
    match auth.login(&form.email, &form.password).await {
        Ok(user) => {
            let welcome = format!("Welcome back, {}.", user.display_name());
            sign_in(&state, &session, &user, &form.next, welcome).await
        }
        Err(e) => {
            if matches!(e, AuthError::Api(_) | AuthError::Token(_)) {
                tracing::error!(error = %e, "Login failed");
            } else {
                tracing::info!(error = %e, "Login rejected");
            }
            Ok(LoginTemplate {
                ctx,
                email: form.email,
                next: local_next(&form.next),
                error: Some(e.user_message()),
            }
            .into_response())
        }
    }
}

/// Display the registration page.
#[instrument(skip(ctx))]
pub async fn register_page(ctx: PageContext, Query(query): Query<NextQuery>) -> impl IntoResponse {
    RegisterTemplate {
        ctx,
        name: String::new(),
        email: String::new(),
        phone: String::new(),
        next: local_next(&query.next),
        error: None,
    }
}

/// Handle registration form submission.
#[instrument(skip(state, session, ctx, form), fields(email = %form.email))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    ctx: PageContext,
    Form(form): Form<RegisterForm>,
) -> Result<Response> {
    let result = if form.password == form.password_confirm {
        let auth = AuthService::new(state.api(), jwt_secret_bytes(&state.config().auth));
        auth.register(&Registration {
            name: form.name.clone(),
            email: form.email.clone(),
            password: form.password.clone(),
            phone: form.phone.clone(),
        })
        .await
        .map_err(|e| e.user_message())
    } else {
        Err("Passwords do not match.".to_string())
    };

    match result {
        Ok(user) => {
            let welcome = format!("Welcome to {}, {}.", state.config().store_name, user.display_name());
            sign_in(&state, &session, &user, &form.next, welcome).await
        }
        Err(error) => Ok(RegisterTemplate {
            ctx,
            name: form.name,
            email: form.email,
            phone: form.phone,
            next: local_next(&form.next),
            error: Some(error),
        }
        .into_response()),
    }
}

/// Handle logout.
#[instrument(skip(session))]
pub async fn logout(session: Session) -> Result<Response> {
    clear_sentry_user();
    session.cycle_id().await?;
    flash::push(&session, FlashKind::Info, "You have been signed out.").await?;
    Ok((
        AppendHeaders([(SET_COOKIE, clear_token_cookie())]),
        Redirect::to("/"),
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use rimline_core::{Role, UserId};
    use secrecy::SecretString;

    use super::*;

    fn user(role: Role) -> CurrentUser {
        CurrentUser {
            id: UserId::new("u1"),
            role,
            name: None,
            email: None,
            expires_at: None,
            token: SecretString::from("t".to_string()),
        }
    }

    #[test]
    fn test_destination() {
        assert_eq!(destination("/cart", &user(Role::User)), "/cart");
        assert_eq!(destination("", &user(Role::User)), "/profile");
        assert_eq!(destination("", &user(Role::Admin)), "/admin");
        assert_eq!(destination("https://evil.example.com", &user(Role::User)), "/profile");
        assert_eq!(destination("//evil.example.com", &user(Role::Admin)), "/admin");
    }

    #[test]
    fn test_local_next() {
        assert_eq!(local_next("/profile/orders"), "/profile/orders");
        assert_eq!(local_next("https://evil.example.com"), "");
    }
}
