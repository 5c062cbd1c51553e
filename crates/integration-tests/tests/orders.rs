//! Integration tests for order history and invoice downloads.

use std::sync::atomic::Ordering;

use rimline_integration_tests::{TestApp, location, token};

#[tokio::test]
async fn test_order_history_lists_orders() {
    let app = TestApp::spawn().await;

    let resp = app.get_as("/profile/orders", &token("u1", "user")).await;

    assert_eq!(resp.status(), 200);
    let body = resp.text().await.expect("Failed to read response");
    assert!(body.contains("#10042"));
}

#[tokio::test]
async fn test_invoice_downloads_as_pdf() {
    let app = TestApp::spawn().await;

    let resp = app
        .get_as("/profile/orders/o1/invoice.pdf", &token("u1", "user"))
        .await;

    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok()),
        Some("application/pdf")
    );
    let disposition = resp
        .headers()
        .get(reqwest::header::CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(disposition.starts_with("attachment"));
    assert!(disposition.contains("10042"));

    let bytes = resp.bytes().await.expect("Failed to read response");
    assert!(bytes.starts_with(b"%PDF"));
}

#[tokio::test]
async fn test_admin_invoice_download() {
    let app = TestApp::spawn().await;

    let resp = app
        .get_as("/admin/orders/o1/invoice.pdf", &token("a1", "admin"))
        .await;

    assert_eq!(resp.status(), 200);
    let bytes = resp.bytes().await.expect("Failed to read response");
    assert!(bytes.starts_with(b"%PDF"));
}

#[tokio::test]
async fn test_missing_order_is_not_found() {
    let app = TestApp::spawn().await;

    let resp = app.get_as("/profile/orders/o9", &token("u1", "user")).await;

    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_rejected_token_signs_user_out() {
    let app = TestApp::spawn().await;
    app.api.reject_tokens.store(true, Ordering::SeqCst);

    let resp = app.get_as("/profile/orders", &token("u1", "user")).await;

    assert_eq!(resp.status(), 303);
    assert_eq!(location(&resp), "/login");
    let cleared = resp
        .headers()
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.starts_with("token=") && v.contains("Max-Age=0"));
    assert!(cleared, "token cookie should be cleared");
}
