//! Integration tests for admin catalog editing and the response cache.

use std::sync::atomic::Ordering;

use rimline_integration_tests::{TestApp, location, token};

async fn browse_tires(app: &TestApp) {
    let resp = app
        .client
        .get(app.url("/tires"))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(resp.status(), 200);
    let body = resp.text().await.expect("Failed to read response");
    assert!(body.contains("Michelin Defender T+H"));
}

// ============================================================================
// Cache
// ============================================================================

#[tokio::test]
async fn test_anonymous_listing_is_cached() {
    let app = TestApp::spawn().await;

    browse_tires(&app).await;
    browse_tires(&app).await;

    assert_eq!(app.api.tire_lists.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_admin_create_invalidates_cached_listing() {
    let app = TestApp::spawn().await;
    browse_tires(&app).await;

    let resp = app
        .post_form_as(
            "/admin/tires",
            &token("a1", "admin"),
            &[
                ("name", "Pirelli P Zero"),
                ("brand", "Pirelli"),
                ("size", "245/40R18"),
                ("price", "210.00"),
                ("stock", "12"),
            ],
        )
        .await;

    assert_eq!(resp.status(), 303);
    assert_eq!(location(&resp), "/admin/tires");
    assert_eq!(app.api.tire_creates.load(Ordering::SeqCst), 1);

    browse_tires(&app).await;
    assert_eq!(app.api.tire_lists.load(Ordering::SeqCst), 2);
}

// ============================================================================
// Validation
// ============================================================================

#[tokio::test]
async fn test_invalid_form_is_not_sent() {
    let app = TestApp::spawn().await;

    let resp = app
        .post_form_as(
            "/admin/tires",
            &token("a1", "admin"),
            &[("brand", "Pirelli"), ("price", "cheap"), ("stock", "12")],
        )
        .await;

    assert_eq!(resp.status(), 422);
    let body = resp.text().await.expect("Failed to read response");
    assert!(body.contains("Pirelli"), "submitted values are kept");
    assert_eq!(app.api.tire_creates.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_customers_cannot_post_to_admin() {
    let app = TestApp::spawn().await;

    let resp = app
        .post_form_as(
            "/admin/tires",
            &token("u1", "user"),
            &[("name", "Pirelli P Zero"), ("brand", "Pirelli")],
        )
        .await;

    assert_eq!(resp.status(), 303);
    assert_eq!(location(&resp), "/");
    assert_eq!(app.api.tire_creates.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_admin_table_lists_documents() {
    let app = TestApp::spawn().await;

    let resp = app.get_as("/admin/tires?sort=-price", &token("a1", "admin")).await;

    assert_eq!(resp.status(), 200);
    let body = resp.text().await.expect("Failed to read response");
    assert!(body.contains("Michelin Defender T+H"));
}
