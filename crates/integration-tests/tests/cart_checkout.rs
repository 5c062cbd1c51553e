//! Integration tests for the session cart and hosted checkout.

use std::sync::atomic::Ordering;

use rimline_integration_tests::{STRIPE_URL, TestApp, location};

const SHIPPING: [(&str, &str); 7] = [
    ("name", "Dana Reyes"),
    ("phone", "512-555-0100"),
    ("line1", "1 Main St"),
    ("city", "Austin"),
    ("state", "TX"),
    ("postal_code", "78701"),
    ("provider", "stripe"),
];

const LINE_ID: &str = "tires-t1";

async fn add_tire(app: &TestApp, quantity: &str) -> reqwest::Response {
    post(app, "/cart/add", &[("kind", "tire"), ("product_id", "t1"), ("quantity", quantity)]).await
}

async fn post(app: &TestApp, path: &str, form: &[(&str, &str)]) -> reqwest::Response {
    app.client
        .post(app.url(path))
        .form(form)
        .send()
        .await
        .expect("Request failed")
}

async fn page(app: &TestApp, path: &str) -> String {
    app.client
        .get(app.url(path))
        .send()
        .await
        .expect("Request failed")
        .text()
        .await
        .expect("Failed to read response")
}

// ============================================================================
// Cart
// ============================================================================

#[tokio::test]
async fn test_add_to_cart_shows_line_and_count() {
    let app = TestApp::spawn().await;

    let resp = add_tire(&app, "4").await;
    assert_eq!(resp.status(), 303);
    assert_eq!(location(&resp), "/cart");

    let body = app
        .client
        .get(app.url("/cart"))
        .send()
        .await
        .expect("Request failed")
        .text()
        .await
        .expect("Failed to read response");
    assert!(body.contains("Michelin Defender T+H"));
    assert!(body.contains("added to your cart"));
    // Four tires use the set price
    assert!(body.contains("$440.00"));

    let count = app
        .client
        .get(app.url("/cart/count"))
        .send()
        .await
        .expect("Request failed")
        .text()
        .await
        .expect("Failed to read response");
    assert!(count.contains(">4<"));
}

#[tokio::test]
async fn test_quantity_is_clamped_to_stock() {
    let app = TestApp::spawn().await;

    let resp = add_tire(&app, "12").await;
    assert_eq!(resp.status(), 303);
    assert_eq!(location(&resp), "/cart");

    let count = app
        .client
        .get(app.url("/cart/count"))
        .send()
        .await
        .expect("Request failed")
        .text()
        .await
        .expect("Failed to read response");
    assert!(count.contains(">8<"));
}

#[tokio::test]
async fn test_cart_offers_resolved_addons() {
    let app = TestApp::spawn().await;
    add_tire(&app, "1").await;

    let body = page(&app, "/cart").await;
    assert!(body.contains("TPMS service"));
    // Sent as a bare id and resolved through the service catalog
    assert!(body.contains("Road hazard protection"));
}

#[tokio::test]
async fn test_update_and_remove_lines() {
    let app = TestApp::spawn().await;
    add_tire(&app, "4").await;

    let resp = post(&app, "/cart/update", &[("line_id", LINE_ID), ("quantity", "2")]).await;
    assert_eq!(resp.status(), 303);
    assert_eq!(location(&resp), "/cart");
    assert!(page(&app, "/cart/count").await.contains(">2<"));

    let resp = post(&app, "/cart/remove", &[("line_id", LINE_ID)]).await;
    assert_eq!(resp.status(), 303);
    assert!(page(&app, "/cart/count").await.contains(">0<"));

    // Removing it again is reported, not an error page
    let resp = post(&app, "/cart/remove", &[("line_id", LINE_ID)]).await;
    assert_eq!(resp.status(), 303);
    assert_eq!(location(&resp), "/cart");
    assert!(page(&app, "/cart").await.contains("no longer in your cart"));
}

#[tokio::test]
async fn test_unoffered_addon_is_refused() {
    let app = TestApp::spawn().await;
    add_tire(&app, "1").await;

    let resp = post(&app, "/cart/addon", &[("line_id", LINE_ID), ("service_id", "s9")]).await;
    assert_eq!(resp.status(), 303);
    assert_eq!(location(&resp), "/cart");
    assert!(page(&app, "/cart").await.contains("not offered"));
}

#[tokio::test]
async fn test_unknown_product_kind_is_bad_request() {
    let app = TestApp::spawn().await;

    let resp = app
        .client
        .post(app.url("/cart/add"))
        .form(&[("kind", "hubcap"), ("product_id", "t1")])
        .send()
        .await
        .expect("Request failed");

    assert_eq!(resp.status(), 400);
}

// ============================================================================
// Checkout
// ============================================================================

#[tokio::test]
async fn test_empty_cart_checkout_goes_back_to_cart() {
    let app = TestApp::spawn().await;

    let resp = app
        .client
        .post(app.url("/checkout"))
        .form(&SHIPPING)
        .send()
        .await
        .expect("Request failed");

    assert_eq!(resp.status(), 303);
    assert_eq!(location(&resp), "/cart");
    assert_eq!(app.api.orders_created.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_missing_address_rerenders_with_errors() {
    let app = TestApp::spawn().await;
    add_tire(&app, "2").await;

    let resp = app
        .client
        .post(app.url("/checkout"))
        .form(&[("name", "Dana Reyes"), ("provider", "stripe")])
        .send()
        .await
        .expect("Request failed");

    assert_eq!(resp.status(), 422);
    let body = resp.text().await.expect("Failed to read response");
    assert!(body.contains("City is required"));
    assert_eq!(app.api.orders_created.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_guest_checkout_redirects_to_provider() {
    let app = TestApp::spawn().await;
    add_tire(&app, "4").await;

    let resp = app
        .client
        .post(app.url("/checkout"))
        .form(&SHIPPING)
        .send()
        .await
        .expect("Request failed");

    assert_eq!(resp.status(), 303);
    assert_eq!(location(&resp), STRIPE_URL);
    assert_eq!(app.api.orders_created.load(Ordering::SeqCst), 1);

    // Returning from the provider empties the cart
    let body = app
        .client
        .get(app.url("/checkout/success"))
        .send()
        .await
        .expect("Request failed")
        .text()
        .await
        .expect("Failed to read response");
    assert!(body.contains("10042"));

    let count = app
        .client
        .get(app.url("/cart/count"))
        .send()
        .await
        .expect("Request failed")
        .text()
        .await
        .expect("Failed to read response");
    assert!(count.contains(">0<"));
}

#[tokio::test]
async fn test_checkout_refuses_unlisted_payment_host() {
    let app = TestApp::spawn().await;
    app.api.set_checkout_url("https://checkout.evil.example/pay");
    add_tire(&app, "1").await;

    let resp = app
        .client
        .post(app.url("/checkout"))
        .form(&SHIPPING)
        .send()
        .await
        .expect("Request failed");

    assert_eq!(resp.status(), 303);
    assert_eq!(location(&resp), "/cart");

    // The cart is kept
    let count = app
        .client
        .get(app.url("/cart/count"))
        .send()
        .await
        .expect("Request failed")
        .text()
        .await
        .expect("Failed to read response");
    assert!(count.contains(">1<"));
}

#[tokio::test]
async fn test_cart_selections_are_frozen_into_order() {
    let app = TestApp::spawn().await;
    add_tire(&app, "4").await;

    post(&app, "/cart/update", &[("line_id", LINE_ID), ("quantity", "5")]).await;
    post(&app, "/cart/installation", &[("line_id", LINE_ID), ("selected", "on")]).await;
    // Select TPMS, then swap it for road hazard protection
    post(&app, "/cart/addon", &[("line_id", LINE_ID), ("service_id", "s1")]).await;
    post(&app, "/cart/addon", &[("line_id", LINE_ID), ("service_id", "s1")]).await;
    post(&app, "/cart/addon", &[("line_id", LINE_ID), ("service_id", "s2")]).await;

    // 1 set ($440) + 1 single ($120), 5 x $25 installation, 5 x $15 add-on
    let body = page(&app, "/cart").await;
    assert!(body.contains("$760.00"));

    let resp = post(&app, "/checkout", &SHIPPING).await;
    assert_eq!(resp.status(), 303);
    assert_eq!(location(&resp), STRIPE_URL);

    let order = app.api.last_order().expect("Order was posted");
    assert_eq!(order["subtotal"].as_f64(), Some(560.0));
    assert_eq!(order["services_total"].as_f64(), Some(200.0));
    assert_eq!(order["discount_total"].as_f64(), Some(0.0));
    assert_eq!(order["total"].as_f64(), Some(760.0));
    assert_eq!(order["payment_provider"], "stripe");

    let item = &order["items"][0];
    assert_eq!(item["quantity"], 5);
    assert_eq!(item["installation_selected"], true);
    assert_eq!(item["set_price"].as_f64(), Some(440.0));
    let addons = item["addons"].as_array().expect("Add-ons are a list");
    assert_eq!(addons.len(), 1);
    assert_eq!(addons[0]["service_id"], "s2");
    assert_eq!(addons[0]["price"].as_f64(), Some(15.0));
}

#[tokio::test]
async fn test_checkout_rereads_changed_products() {
    let app = TestApp::spawn().await;
    add_tire(&app, "4").await;
    post(&app, "/cart/installation", &[("line_id", LINE_ID), ("selected", "on")]).await;
    let reads_after_add = app.api.tire_reads.load(Ordering::SeqCst);

    app.api.update_tire(|tire| {
        tire["set_price"] = serde_json::json!(480);
        tire["installation_fee"] = serde_json::json!(30);
    });

    let resp = post(&app, "/checkout", &SHIPPING).await;
    assert_eq!(resp.status(), 303);
    assert_eq!(location(&resp), "/cart");
    assert!(app.api.tire_reads.load(Ordering::SeqCst) > reads_after_add);
    assert_eq!(app.api.orders_created.load(Ordering::SeqCst), 0);

    let body = page(&app, "/cart").await;
    assert!(body.contains("cart changed"));
    assert!(body.contains("$480.00"));

    // Reviewed: the order goes through at the new prices
    let resp = post(&app, "/checkout", &SHIPPING).await;
    assert_eq!(location(&resp), STRIPE_URL);
    let order = app.api.last_order().expect("Order was posted");
    assert_eq!(order["subtotal"].as_f64(), Some(480.0));
    assert_eq!(order["services_total"].as_f64(), Some(120.0));
    assert_eq!(order["total"].as_f64(), Some(600.0));
}

#[tokio::test]
async fn test_checkout_drops_withdrawn_addon() {
    let app = TestApp::spawn().await;
    add_tire(&app, "4").await;
    post(&app, "/cart/addon", &[("line_id", LINE_ID), ("service_id", "s1")]).await;

    app.api.update_tire(|tire| {
        tire["addons"] = serde_json::json!([]);
    });

    let resp = post(&app, "/checkout", &SHIPPING).await;
    assert_eq!(location(&resp), "/cart");

    let resp = post(&app, "/checkout", &SHIPPING).await;
    assert_eq!(location(&resp), STRIPE_URL);
    let order = app.api.last_order().expect("Order was posted");
    assert_eq!(order["services_total"].as_f64(), Some(0.0));
    assert_eq!(order["total"].as_f64(), Some(440.0));
}
