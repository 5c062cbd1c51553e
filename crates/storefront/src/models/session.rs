//! Session-stored state: the cart and pending flashes.
//!
//! The session itself is anonymous; identity comes from the token cookie,
//! so the cart survives login and logout.

use tower_sessions::Session;

use rimline_core::cart::Cart;

/// Session keys.
pub mod keys {
    /// Key for the shopping cart.
    pub const CART: &str = "cart";

    /// Key for pending flash messages.
    pub const FLASHES: &str = "flashes";

    /// Key for the order number awaiting payment.
    pub const PENDING_ORDER: &str = "pending_order";
}

/// Load the cart, empty when none is stored yet.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn load_cart(session: &Session) -> Result<Cart, tower_sessions::session::Error> {
    Ok(session.get::<Cart>(keys::CART).await?.unwrap_or_default())
}

/// Store the cart.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn save_cart(session: &Session, cart: &Cart) -> Result<(), tower_sessions::session::Error> {
    session.insert(keys::CART, cart).await
}
