//! Route access policy for the JWT role claim.
//!
//! | path                  | anonymous         | user          | admin         |
//! |-----------------------|-------------------|---------------|---------------|
//! | `/admin`, `/admin/*`  | login (with next) | home          | allow         |
//! | `/profile`, `/profile/*` | login (with next) | allow      | allow         |
//! | `/login`, `/register` | allow             | `/profile`    | `/admin`      |
//! | anything else         | allow             | allow         | allow         |

use crate::types::Role;

/// Outcome of checking a path against the caller's role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    /// Serve the request.
    Allow,
    /// Not signed in: send to the login page, returning to `next` after.
    Login { next: String },
    /// Signed in, but the page is not for this role (or not needed).
    Redirect(&'static str),
}

/// Path areas the policy distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Area {
    Admin,
    Profile,
    Auth,
    Public,
}

/// True if `path` is `prefix` or lies under `prefix/`.
fn under(path: &str, prefix: &str) -> bool {
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

/// Classify a request path.
#[must_use]
pub fn area(path: &str) -> Area {
    if under(path, "/admin") {
        Area::Admin
    } else if under(path, "/profile") {
        Area::Profile
    } else if path == "/login" || path == "/register" {
        Area::Auth
    } else {
        Area::Public
    }
}

/// Decide whether a caller with `role` (None when anonymous or the token is
/// invalid/expired) may load `path`. `path_and_query` is what `next` returns to.
#[must_use]
pub fn check(path: &str, path_and_query: &str, role: Option<Role>) -> Access {
    match (area(path), role) {
        (Area::Admin | Area::Profile, None) => Access::Login {
            next: path_and_query.to_string(),
        },
        (Area::Admin, Some(Role::User)) => Access::Redirect("/"),
        (Area::Auth, Some(Role::User)) => Access::Redirect("/profile"),
        (Area::Auth, Some(Role::Admin)) => Access::Redirect("/admin"),
        (Area::Admin | Area::Profile, Some(_)) | (Area::Auth | Area::Public, _) => Access::Allow,
    }
}

/// Whether `next` is a safe local redirect target (no scheme, no `//host`).
#[must_use]
pub fn is_local_path(next: &str) -> bool {
    next.starts_with('/') && !next.starts_with("//") && !next.contains('\\')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_paths() {
        assert_eq!(
            check("/admin/makes", "/admin/makes?page=2", None),
            Access::Login {
                next: "/admin/makes?page=2".to_string()
            }
        );
        assert_eq!(
            check("/admin", "/admin", Some(Role::User)),
            Access::Redirect("/")
        );
        assert_eq!(check("/admin/orders/1", "/admin/orders/1", Some(Role::Admin)), Access::Allow);
    }

    #[test]
    fn test_profile_paths() {
        assert!(matches!(check("/profile", "/profile", None), Access::Login { .. }));
        assert_eq!(check("/profile/orders", "/profile/orders", Some(Role::User)), Access::Allow);
        assert_eq!(check("/profile/orders", "/profile/orders", Some(Role::Admin)), Access::Allow);
    }

    #[test]
    fn test_auth_pages_bounce_signed_in_users() {
        assert_eq!(check("/login", "/login", None), Access::Allow);
        assert_eq!(check("/login", "/login", Some(Role::User)), Access::Redirect("/profile"));
        assert_eq!(check("/register", "/register", Some(Role::Admin)), Access::Redirect("/admin"));
    }

    #[test]
    fn test_prefix_is_segment_aware() {
        assert_eq!(area("/administrator"), Area::Public);
        assert_eq!(area("/profiles"), Area::Public);
        assert_eq!(area("/admin/"), Area::Admin);
        assert_eq!(check("/tires", "/tires", None), Access::Allow);
        assert_eq!(check("/cart", "/cart", Some(Role::User)), Access::Allow);
    }

    #[test]
    fn test_local_path() {
        assert!(is_local_path("/profile/orders"));
        assert!(!is_local_path("//evil.example.com"));
        assert!(!is_local_path("https://evil.example.com"));
        assert!(!is_local_path("/\\evil.example.com"));
    }
}
