//! Dashboard route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use chrono::Utc;
use secrecy::SecretString;
use serde_json::Value;
use tracing::instrument;

use rimline_core::catalog::Deal;
use rimline_core::deals::active_deals;
use rimline_core::order::Order;

use crate::components::PageContext;
use crate::middleware::RequireAdmin;
use crate::routes::orders::OrderRow;
use crate::state::AppState;

const RECENT_ORDERS: usize = 5;

/// One count tile on the dashboard.
#[derive(Debug, Clone)]
pub struct MetricView {
    pub label: &'static str,
    pub value: String,
    pub href: &'static str,
}

/// Dashboard template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/dashboard.html")]
pub struct DashboardTemplate {
    pub ctx: PageContext,
    pub metrics: Vec<MetricView>,
    pub orders: Vec<OrderRow>,
}

/// Total number of documents in a resource, or `-` when the API fails.
async fn count(state: &AppState, resource: &str, token: &SecretString) -> String {
    match state
        .api()
        .list::<Value>(resource, &[("limit", "1".to_string())], Some(token))
        .await
    {
        Ok(page) => page.total.to_string(),
        Err(e) => {
            tracing::error!(error = %e, resource, "Failed to count documents");
            "-".to_string()
        }
    }
}

/// Dashboard page handler.
#[instrument(skip(state, ctx, admin))]
pub async fn index(
    State(state): State<AppState>,
    ctx: PageContext,
    RequireAdmin(admin): RequireAdmin,
) -> impl IntoResponse {
    let token = &admin.token;
    let recent_params = [
        ("limit", RECENT_ORDERS.to_string()),
        ("sort", "-created_at".to_string()),
    ];

    let deal_params = [("limit", "100".to_string())];

    let (orders, tires, wheels, users, deals) = tokio::join!(
        state.api().list::<Order>("/orders", &recent_params, Some(token)),
        count(&state, "/tires", token),
        count(&state, "/wheels", token),
        count(&state, "/users", token),
        state.api().list::<Deal>("/deals", &deal_params, Some(token)),
    );

    let (order_total, orders) = match orders {
        Ok(page) => (
            page.total.to_string(),
            page.items
                .iter()
                .take(RECENT_ORDERS)
                .map(|order| OrderRow::new(order, "/admin/orders"))
                .collect(),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to fetch orders");
            ("-".to_string(), Vec::new())
        }
    };

    let live_deals = match deals {
        Ok(page) => active_deals(&page.items, Utc::now()).len().to_string(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to fetch deals");
            "-".to_string()
        }
    };

    DashboardTemplate {
        ctx,
        metrics: vec![
            MetricView {
                label: "Orders",
                value: order_total,
                href: "/admin/orders",
            },
            MetricView {
                label: "Tires",
                value: tires,
                href: "/admin/tires",
            },
            MetricView {
                label: "Wheels",
                value: wheels,
                href: "/admin/wheels",
            },
            MetricView {
                label: "Customers",
                value: users,
                href: "/admin/users",
            },
            MetricView {
                label: "Live deals",
                value: live_deals,
                href: "/admin/deals",
            },
        ],
        orders,
    }
}
