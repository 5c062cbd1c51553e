//! Integration tests for the access gate in front of `/admin` and `/profile`.

use rimline_integration_tests::{PASSWORD, TestApp, location, token};

// ============================================================================
// Anonymous Visitors
// ============================================================================

#[tokio::test]
async fn test_anonymous_admin_redirects_to_login_with_next() {
    let app = TestApp::spawn().await;

    let resp = app
        .client
        .get(app.url("/admin/tires?page=2"))
        .send()
        .await
        .expect("Request failed");

    assert_eq!(resp.status(), 303);
    assert_eq!(location(&resp), "/login?next=%2Fadmin%2Ftires%3Fpage%3D2");
}

#[tokio::test]
async fn test_anonymous_profile_redirects_to_login() {
    let app = TestApp::spawn().await;

    let resp = app
        .client
        .get(app.url("/profile/orders"))
        .send()
        .await
        .expect("Request failed");

    assert_eq!(resp.status(), 303);
    assert_eq!(location(&resp), "/login?next=%2Fprofile%2Forders");
}

#[tokio::test]
async fn test_forged_token_is_treated_as_anonymous() {
    let app = TestApp::spawn().await;
    let mut forged = token("a1", "admin");
    forged.push('x');

    let resp = app.get_as("/admin", &forged).await;

    assert_eq!(resp.status(), 303);
    assert!(location(&resp).starts_with("/login"));
    let cleared = resp
        .headers()
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.starts_with("token=;") || v.starts_with("token=\"\"") || v.contains("Max-Age=0"));
    assert!(cleared, "stale token cookie should be cleared");
}

// ============================================================================
// Signed-in Users
// ============================================================================

#[tokio::test]
async fn test_customer_cannot_open_admin() {
    let app = TestApp::spawn().await;

    let resp = app.get_as("/admin", &token("u1", "user")).await;

    assert_eq!(resp.status(), 303);
    assert_eq!(location(&resp), "/");
}

#[tokio::test]
async fn test_signed_in_users_skip_auth_pages() {
    let app = TestApp::spawn().await;

    let resp = app.get_as("/login", &token("u1", "user")).await;
    assert_eq!(resp.status(), 303);
    assert_eq!(location(&resp), "/profile");

    let resp = app.get_as("/register", &token("a1", "admin")).await;
    assert_eq!(resp.status(), 303);
    assert_eq!(location(&resp), "/admin");
}

#[tokio::test]
async fn test_admin_sees_dashboard() {
    let app = TestApp::spawn().await;

    let resp = app.get_as("/admin", &token("a1", "admin")).await;

    assert_eq!(resp.status(), 200);
    let body = resp.text().await.expect("Failed to read response");
    assert!(body.contains("Dashboard"));
}

// ============================================================================
// Login
// ============================================================================

#[tokio::test]
async fn test_login_sets_token_and_honours_local_next() {
    let app = TestApp::spawn().await;

    let resp = app
        .client
        .post(app.url("/login"))
        .form(&[
            ("email", "dana@rimline.test"),
            ("password", PASSWORD),
            ("next", "/profile/orders"),
        ])
        .send()
        .await
        .expect("Request failed");

    assert_eq!(resp.status(), 303);
    assert_eq!(location(&resp), "/profile/orders");
    let cookie = resp
        .headers()
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("token="))
        .expect("token cookie is set");
    assert!(cookie.contains("HttpOnly"));
}

#[tokio::test]
async fn test_login_ignores_offsite_next() {
    let app = TestApp::spawn().await;

    let resp = app
        .client
        .post(app.url("/login"))
        .form(&[
            ("email", "admin@rimline.test"),
            ("password", PASSWORD),
            ("next", "//evil.example/phish"),
        ])
        .send()
        .await
        .expect("Request failed");

    assert_eq!(resp.status(), 303);
    assert_eq!(location(&resp), "/admin");
}

#[tokio::test]
async fn test_wrong_password_rerenders_form() {
    let app = TestApp::spawn().await;

    let resp = app
        .client
        .post(app.url("/login"))
        .form(&[("email", "dana@rimline.test"), ("password", "nope")])
        .send()
        .await
        .expect("Request failed");

    assert_eq!(resp.status(), 200);
    let body = resp.text().await.expect("Failed to read response");
    assert!(body.contains("Invalid email or password."));
    assert!(body.contains("dana@rimline.test"));
}
