//! Per-page chrome shared by every full-page template.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use crate::models::session::load_cart;
use crate::models::{CurrentUser, Flash, flash};
use crate::state::AppState;

/// Data the base layout needs: store name, account links, cart badge, toasts.
///
/// Extracting it takes the pending toasts, so only handlers that render a
/// page should ask for it.
#[derive(Debug, Clone, Default)]
pub struct PageContext {
    pub store_name: String,
    /// Cache-busting query value for static assets.
    pub asset_version: &'static str,
    pub user_name: Option<String>,
    pub is_admin: bool,
    pub cart_count: u32,
    pub flashes: Vec<Flash>,
}

impl PageContext {
    /// Whether someone is signed in.
    #[must_use]
    pub const fn signed_in(&self) -> bool {
        self.user_name.is_some()
    }
}

impl FromRequestParts<AppState> for PageContext {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = parts.extensions.get::<CurrentUser>();
        let mut context = Self {
            store_name: state.config().store_name.clone(),
            asset_version: env!("ASSET_VERSION"),
            user_name: user.map(CurrentUser::display_name),
            is_admin: user.is_some_and(CurrentUser::is_admin),
            ..Self::default()
        };

        if let Some(session) = parts.extensions.get::<Session>() {
            context.flashes = flash::take(session).await;
            context.cart_count = match load_cart(session).await {
                Ok(cart) => cart.item_count(),
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to load cart for header");
                    0
                }
            };
        }

        Ok(context)
    }
}
