//! The signed-in user, as decoded from the token cookie.

use chrono::{DateTime, Utc};
use secrecy::SecretString;

use rimline_core::{Role, UserId};

/// Identity carried by the `token` cookie.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct CurrentUser {
    pub id: UserId,
    pub role: Role,
    pub name: Option<String>,
    pub email: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    /// Raw JWT, forwarded to the API as a bearer token.
    pub token: SecretString,
}

impl CurrentUser {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Name for the header: name, then email, then "Account".
    #[must_use]
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .or_else(|| self.email.clone())
            .unwrap_or_else(|| "Account".to_string())
    }
}

impl std::fmt::Debug for CurrentUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurrentUser")
            .field("id", &self.id)
            .field("role", &self.role)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("expires_at", &self.expires_at)
            .field("token", &"[REDACTED]")
            .finish()
    }
}
