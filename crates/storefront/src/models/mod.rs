//! Request- and session-scoped models for the storefront.

pub mod flash;
pub mod session;
pub mod user;

pub use flash::{Flash, FlashKind};
pub use session::keys as session_keys;
pub use user::CurrentUser;
