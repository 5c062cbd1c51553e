//! Integration test harness for Rimline.
//!
//! Each test spawns the full storefront router on an ephemeral port, wired
//! to an in-process fake of the REST API. The fake counts the calls tests
//! care about so caching and invalidation can be observed from outside.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p rimline-integration-tests
//! ```

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header::AUTHORIZATION};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use serde_json::{Value, json};
use sha2::Sha256;
use tokio::net::TcpListener;

use rimline_storefront::config::StorefrontConfig;
use rimline_storefront::state::AppState;

/// HS256 secret shared by the fake API and the storefront under test.
pub const JWT_SECRET: &str = "k7#Qp2!vZ9@wL4$mR8^tY1&cX6*bN3%h";

/// Password the fake API accepts for every account.
pub const PASSWORD: &str = "correct-horse-battery";

/// Checkout URL the fake API hands out unless a test overrides it.
pub const STRIPE_URL: &str = "https://checkout.stripe.com/c/pay/cs_test_rimline";

// =============================================================================
// Fake REST API
// =============================================================================

/// What the fake API has seen, plus knobs tests can turn.
#[derive(Debug)]
pub struct FakeApi {
    /// Anonymous and authenticated `GET /tires` list calls.
    pub tire_lists: AtomicUsize,
    /// Accepted `POST /tires` calls.
    pub tire_creates: AtomicUsize,
    /// Accepted `POST /orders` calls.
    pub orders_created: AtomicUsize,
    /// `GET /tires/t1` calls.
    pub tire_reads: AtomicUsize,
    /// Answer every token-bearing call with 401.
    pub reject_tokens: AtomicBool,
    checkout_url: Mutex<String>,
    tire: Mutex<Value>,
    last_order: Mutex<Option<Value>>,
}

impl Default for FakeApi {
    fn default() -> Self {
        Self {
            tire_lists: AtomicUsize::new(0),
            tire_creates: AtomicUsize::new(0),
            orders_created: AtomicUsize::new(0),
            tire_reads: AtomicUsize::new(0),
            reject_tokens: AtomicBool::new(false),
            checkout_url: Mutex::new(STRIPE_URL.to_string()),
            tire: Mutex::new(tire()),
            last_order: Mutex::new(None),
        }
    }
}

impl FakeApi {
    /// Make `POST /payments/checkout` return `url`.
    pub fn set_checkout_url(&self, url: &str) {
        if let Ok(mut current) = self.checkout_url.lock() {
            *current = url.to_string();
        }
    }

    fn checkout_url(&self) -> String {
        self.checkout_url
            .lock()
            .map_or_else(|_| STRIPE_URL.to_string(), |url| url.clone())
    }

    /// Change the `t1` document the API serves from now on.
    pub fn update_tire(&self, change: impl FnOnce(&mut Value)) {
        if let Ok(mut current) = self.tire.lock() {
            change(&mut current);
        }
    }

    fn current_tire(&self) -> Value {
        self.tire.lock().map_or_else(|_| tire(), |t| t.clone())
    }

    /// Body of the most recent `POST /orders`.
    #[must_use]
    pub fn last_order(&self) -> Option<Value> {
        self.last_order.lock().ok().and_then(|order| order.clone())
    }
}

type Shared = Arc<FakeApi>;

/// Mint a signed token the way the API does.
#[must_use]
pub fn token(user_id: &str, role: &str) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(
        json!({
            "id": user_id,
            "role": role,
            "name": format!("Test {role}"),
            "email": format!("{role}@rimline.test"),
        })
        .to_string(),
    );
    let input = format!("{header}.{payload}");
    let mut mac =
        Hmac::<Sha256>::new_from_slice(JWT_SECRET.as_bytes()).expect("HMAC accepts any key length");
    mac.update(input.as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
    format!("{input}.{signature}")
}

/// Tire document served for `t1`.
///
/// One add-on arrives populated and one as a bare id resolved through
/// `GET /services`.
#[must_use]
pub fn tire() -> Value {
    json!({
        "_id": "t1",
        "name": "Michelin Defender T+H",
        "brand": "Michelin",
        "size": "225/45R17",
        "price": 120,
        "set_price": 440,
        "stock": 8,
        "installation_fee": 25,
        "addons": [
            {"_id": "s1", "name": "TPMS service", "price": 10},
            "s2"
        ]
    })
}

/// Service catalog.
#[must_use]
pub fn services() -> Vec<Value> {
    vec![
        json!({"_id": "s1", "name": "TPMS service", "price": 10}),
        json!({"_id": "s2", "name": "Road hazard protection", "price": 15}),
    ]
}

/// Order document served for `o1`.
#[must_use]
pub fn order() -> Value {
    json!({
        "_id": "o1",
        "order_number": "10042",
        "user": {"_id": "u1", "name": "Dana Reyes", "email": "dana@rimline.test"},
        "items": [{
            "product_id": "t1",
            "kind": "tire",
            "name": "Michelin Defender T+H",
            "quantity": 4,
            "unit_price": 120,
            "set_price": 440,
            "installation_fee": 25,
            "installation_selected": true
        }],
        "shipping": {
            "name": "Dana Reyes",
            "line1": "1 Main St",
            "city": "Austin",
            "state": "TX",
            "postal_code": "78701"
        },
        "subtotal": 440,
        "services_total": 100,
        "total": 540,
        "status": "processing",
        "payment_status": "paid",
        "payment_provider": "stripe",
        "created_at": "2025-03-14T12:00:00Z"
    })
}

fn envelope(items: Vec<Value>) -> Value {
    let total = items.len();
    json!({"data": items, "total": total, "page": 1, "limit": 20})
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

/// 401 when the caller has no token or tokens are being rejected.
fn guard(api: &FakeApi, headers: &HeaderMap) -> Result<(), Response> {
    if bearer(headers).is_none() || api.reject_tokens.load(Ordering::SeqCst) {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({"message": "Unauthorized"})),
        )
            .into_response());
    }
    Ok(())
}

async fn list_tires(State(api): State<Shared>) -> Json<Value> {
    api.tire_lists.fetch_add(1, Ordering::SeqCst);
    Json(envelope(vec![tire()]))
}

async fn create_tire(
    State(api): State<Shared>,
    headers: HeaderMap,
    Json(mut body): Json<Value>,
) -> Response {
    if let Err(response) = guard(&api, &headers) {
        return response;
    }
    api.tire_creates.fetch_add(1, Ordering::SeqCst);
    body["_id"] = json!("t2");
    (StatusCode::CREATED, Json(body)).into_response()
}

async fn show_tire(State(api): State<Shared>, Path(id): Path<String>) -> Response {
    if id == "t1" {
        api.tire_reads.fetch_add(1, Ordering::SeqCst);
        Json(api.current_tire()).into_response()
    } else {
        (StatusCode::NOT_FOUND, Json(json!({"message": "Tire not found"}))).into_response()
    }
}

async fn login(Json(body): Json<Value>) -> Response {
    let email = body["email"].as_str().unwrap_or_default();
    if body["password"].as_str() != Some(PASSWORD) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"message": "Invalid credentials"})),
        )
            .into_response();
    }
    let (id, role) = if email.starts_with("admin@") {
        ("a1", "admin")
    } else {
        ("u1", "user")
    };
    Json(json!({"token": token(id, role), "user": {"email": email}})).into_response()
}

async fn me(State(api): State<Shared>, headers: HeaderMap) -> Response {
    if let Err(response) = guard(&api, &headers) {
        return response;
    }
    Json(json!({"_id": "u1", "name": "Dana Reyes", "email": "dana@rimline.test", "role": "user"}))
        .into_response()
}

async fn list_services() -> Json<Value> {
    Json(envelope(services()))
}

async fn create_order(State(api): State<Shared>, Json(body): Json<Value>) -> Response {
    api.orders_created.fetch_add(1, Ordering::SeqCst);
    if let Ok(mut last) = api.last_order.lock() {
        *last = Some(body);
    }
    (StatusCode::CREATED, Json(order())).into_response()
}

async fn my_orders(State(api): State<Shared>, headers: HeaderMap) -> Response {
    if let Err(response) = guard(&api, &headers) {
        return response;
    }
    Json(envelope(vec![order()])).into_response()
}

async fn show_order(
    State(api): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if let Err(response) = guard(&api, &headers) {
        return response;
    }
    if id == "o1" {
        Json(order()).into_response()
    } else {
        (StatusCode::NOT_FOUND, Json(json!({"message": "Order not found"}))).into_response()
    }
}

async fn checkout(State(api): State<Shared>) -> Json<Value> {
    Json(json!({"url": api.checkout_url()}))
}

/// Lists nobody seeded answer empty.
async fn empty_list() -> Json<Value> {
    Json(json!([]))
}

fn fake_api_router(api: Shared) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/tires", get(list_tires).post(create_tire))
        .route("/tires/{id}", get(show_tire))
        .route("/services", get(list_services))
        .route("/auth/login", axum::routing::post(login))
        .route("/auth/me", get(me))
        .route("/orders", axum::routing::post(create_order))
        .route("/orders/mine", get(my_orders))
        .route("/orders/{id}", get(show_order))
        .route("/payments/checkout", axum::routing::post(checkout))
        .fallback(empty_list)
        .with_state(api)
}

// =============================================================================
// Test Application
// =============================================================================

/// A running storefront plus the fake API behind it.
pub struct TestApp {
    pub base_url: String,
    pub api: Shared,
    /// Client with a cookie jar that does not follow redirects.
    pub client: reqwest::Client,
}

async fn serve(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Listener has an address");
    tokio::spawn(async move {
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .expect("Test server error");
    });
    addr
}

impl TestApp {
    /// Start the fake API and a storefront pointed at it.
    pub async fn spawn() -> Self {
        let api = Shared::default();
        let api_addr = serve(fake_api_router(Arc::clone(&api))).await;

        let api_url = format!("http://{api_addr}/");
        let config = StorefrontConfig::from_vars(|key| match key {
            "API_BASE_URL" => Some(api_url.clone()),
            "STOREFRONT_BASE_URL" => Some("http://localhost:3000".to_string()),
            "JWT_SECRET" => Some(JWT_SECRET.to_string()),
            _ => None,
        })
        .expect("Test configuration is valid");

        let state = AppState::new(config).expect("Failed to build application state");
        let addr = serve(rimline_storefront::app(state)).await;

        let client = reqwest::Client::builder()
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: format!("http://{addr}"),
            api,
            client,
        }
    }

    /// Absolute URL for a storefront path.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// GET with an explicit token cookie.
    pub async fn get_as(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .header(reqwest::header::COOKIE, format!("token={token}"))
            .send()
            .await
            .expect("Request failed")
    }

    /// Form POST with an explicit token cookie.
    pub async fn post_form_as(
        &self,
        path: &str,
        token: &str,
        form: &[(&str, &str)],
    ) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .header(reqwest::header::COOKIE, format!("token={token}"))
            .form(form)
            .send()
            .await
            .expect("Request failed")
    }
}

/// `Location` header of a redirect response.
#[must_use]
pub fn location(response: &reqwest::Response) -> String {
    response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}
