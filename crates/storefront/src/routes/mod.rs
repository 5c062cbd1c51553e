//! HTTP route handlers for the storefront and admin console.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Home page (deals, featured tires, fleet news)
//!
//! # Catalog
//! GET  /tires                  - Tire listing (page, brand, size, trim, driving_type, sort)
//! GET  /tires/{id}             - Tire detail
//! GET  /wheels                 - Wheel listing (page, brand, diameter, sort)
//! GET  /wheels/{id}            - Wheel detail
//! GET  /brands                 - Brand index
//! GET  /deals                  - Active deals
//! GET  /fleet                  - Fleet landing
//! GET  /fleet/news/{id}        - Fleet news article
//!
//! # Selectors (option fragments)
//! GET  /selectors/models       - Models of a make
//! GET  /selectors/trims        - Trims of a model
//! GET  /selectors/sizes        - Tire sizes of a trim
//! GET  /search/vehicle         - Redirect to tires fitting a trim
//! GET  /search/size            - Redirect to tires of a size
//!
//! # Cart
//! GET  /cart                   - Cart page
//! POST /cart/add               - Add a product line
//! POST /cart/update            - Set a line quantity
//! POST /cart/remove            - Remove a line
//! POST /cart/installation      - Select or clear installation
//! POST /cart/addon             - Toggle an add-on service
//! GET  /cart/count             - Cart count badge (fragment)
//!
//! # Checkout
//! GET  /checkout               - Shipping and payment form
//! POST /checkout               - Create the order and redirect to the provider
//! GET  /checkout/success       - Provider return page
//! GET  /checkout/cancel        - Provider cancel page
//!
//! # Auth
//! GET  /login, POST /login     - Sign in
//! GET  /register, POST /register - Create an account
//! POST /logout                 - Sign out
//!
//! # Profile (signed in)
//! GET  /profile                - Account overview
//! GET  /profile/orders         - Order history
//! GET  /profile/orders/{id}    - Order detail
//! GET  /profile/orders/{id}/invoice.pdf - Invoice download
//!
//! # Admin (role admin), see [`admin`]
//! ```

pub mod admin;
pub mod auth;
pub mod brands;
pub mod cart;
pub mod checkout;
pub mod deals;
pub mod fleet;
pub mod home;
pub mod orders;
pub mod products;
pub mod profile;
pub mod selectors;

use axum::{
    Router,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use tower_sessions::Session;

use crate::middleware::auth_rate_limiter;
use crate::models::{FlashKind, flash};
use crate::state::AppState;

/// Queue a toast and redirect (303).
///
/// # Errors
///
/// Returns an error if the session store fails.
pub(crate) async fn flash_redirect(
    session: &Session,
    kind: FlashKind,
    message: impl Into<String>,
    to: &str,
) -> crate::error::Result<Response> {
    flash::push(session, kind, message).await?;
    Ok(Redirect::to(to).into_response())
}

/// Create the catalog routes router.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/tires", get(products::tires))
        .route("/tires/{id}", get(products::tire))
        .route("/wheels", get(products::wheels))
        .route("/wheels/{id}", get(products::wheel))
        .route("/brands", get(brands::index))
        .route("/deals", get(deals::index))
        .route("/fleet", get(fleet::index))
        .route("/fleet/news/{id}", get(fleet::show))
}

/// Create the selector routes router.
pub fn selector_routes() -> Router<AppState> {
    Router::new()
        .route("/selectors/models", get(selectors::models))
        .route("/selectors/trims", get(selectors::trims))
        .route("/selectors/sizes", get(selectors::sizes))
        .route("/search/vehicle", get(selectors::search_vehicle))
        .route("/search/size", get(selectors::search_size))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/installation", post(cart::installation))
        .route("/addon", post(cart::addon))
        .route("/count", get(cart::count))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(checkout::form).post(checkout::submit))
        .route("/success", get(checkout::success))
        .route("/cancel", get(checkout::cancel))
}

/// Create the auth routes router.
///
/// Form posts are rate limited per client IP.
pub fn auth_routes() -> Router<AppState> {
    let limited = Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .layer(auth_rate_limiter());

    Router::new()
        .route("/login", get(auth::login_page))
        .route("/register", get(auth::register_page))
        .route("/logout", post(auth::logout))
        .merge(limited)
}

/// Create the profile routes router.
pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(profile::index))
        .route("/orders", get(profile::orders))
        .route("/orders/{id}", get(profile::order))
        .route("/orders/{id}/invoice.pdf", get(profile::invoice))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .merge(catalog_routes())
        .merge(selector_routes())
        .merge(auth_routes())
        .nest("/cart", cart_routes())
        .nest("/checkout", checkout_routes())
        .nest("/profile", profile_routes())
        .nest("/admin", admin::routes())
}
