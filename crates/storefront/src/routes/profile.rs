//! Profile route handlers (signed-in users).
//!
//! Every call forwards the user's token, so the API decides which orders a
//! user may see.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::instrument;

use rimline_core::catalog::User;
use rimline_core::order::Order;

use super::orders::{OrderDetailView, OrderRow, invoice_download};
use crate::api::doc_path;
use crate::components::{PageContext, Pagination};
use crate::error::Result;
use crate::middleware::RequireUser;
use crate::state::AppState;

const ORDERS_BASE: &str = "/profile/orders";
const ORDERS_PER_PAGE: u32 = 10;
const RECENT_ORDERS: &str = "3";

/// Account display data for templates.
#[derive(Debug, Clone)]
pub struct AccountView {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: String,
}

impl From<User> for AccountView {
    fn from(user: User) -> Self {
        Self {
            name: user.name,
            email: user.email,
            phone: user.phone,
            role: user.role.to_string(),
        }
    }
}

/// Profile page template.
#[derive(Template, WebTemplate)]
#[template(path = "profile/index.html")]
pub struct ProfileTemplate {
    pub ctx: PageContext,
    pub account: AccountView,
    pub orders: Vec<OrderRow>,
}

/// Order history template.
#[derive(Template, WebTemplate)]
#[template(path = "profile/orders.html")]
pub struct OrdersTemplate {
    pub ctx: PageContext,
    pub orders: Vec<OrderRow>,
    pub pagination: Pagination,
}

/// Order detail template.
#[derive(Template, WebTemplate)]
#[template(path = "profile/order.html")]
pub struct OrderTemplate {
    pub ctx: PageContext,
    pub order: OrderDetailView,
}

/// Order history query.
#[derive(Debug, Deserialize)]
pub struct OrdersQuery {
    pub page: Option<u32>,
}

/// Display the account overview.
#[instrument(skip(state, ctx, user), fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    ctx: PageContext,
    RequireUser(user): RequireUser,
) -> Result<impl IntoResponse> {
    let token = Some(&user.token);
    let recent_query = [("limit", RECENT_ORDERS.to_string())];
    let (me, recent) = tokio::join!(
        state.api().get::<User>("/auth/me", &[], token),
        state.api().list::<Order>("/orders/mine", &recent_query, token),
    );

    let orders = match recent {
        Ok(page) => page.items.iter().map(|o| OrderRow::new(o, ORDERS_BASE)).collect(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load recent orders");
            Vec::new()
        }
    };

    Ok(ProfileTemplate {
        ctx,
        account: me?.into(),
        orders,
    })
}

/// Display the order history.
#[instrument(skip(state, ctx, user), fields(user_id = %user.id))]
pub async fn orders(
    State(state): State<AppState>,
    ctx: PageContext,
    RequireUser(user): RequireUser,
    Query(query): Query<OrdersQuery>,
) -> Result<impl IntoResponse> {
    let page = state
        .api()
        .list::<Order>(
            "/orders/mine",
            &[
                ("page", query.page.unwrap_or(1).max(1).to_string()),
                ("limit", ORDERS_PER_PAGE.to_string()),
            ],
            Some(&user.token),
        )
        .await?;

    Ok(OrdersTemplate {
        ctx,
        orders: page.items.iter().map(|o| OrderRow::new(o, ORDERS_BASE)).collect(),
        pagination: Pagination::new(ORDERS_BASE, &page, &[]),
    })
}

/// Display one order.
#[instrument(skip(state, ctx, user), fields(user_id = %user.id))]
pub async fn order(
    State(state): State<AppState>,
    ctx: PageContext,
    RequireUser(user): RequireUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let order: Order = state
        .api()
        .get(&doc_path("orders", &id), &[], Some(&user.token))
        .await?;

    Ok(OrderTemplate {
        ctx,
        order: OrderDetailView::new(&order, ORDERS_BASE),
    })
}

/// Download an order's invoice.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn invoice(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<String>,
) -> Result<Response> {
    let order: Order = state
        .api()
        .get(&doc_path("orders", &id), &[], Some(&user.token))
        .await?;
    invoice_download(&order, &state.config().store_name)
}
