//! Admin order handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_sessions::Session;
use tracing::instrument;

use rimline_core::order::Order;
use rimline_core::types::OrderStatus;

use crate::api::{ApiError, Page, doc_path};
use crate::components::data_table::PER_PAGE;
use crate::components::{OptionView, PageContext, Pagination};
use crate::error::{Result, add_breadcrumb};
use crate::middleware::RequireAdmin;
use crate::models::FlashKind;
use crate::routes::flash_redirect;
use crate::routes::orders::{OrderDetailView, OrderRow, invoice_download};
use crate::state::AppState;

const ORDERS_BASE: &str = "/admin/orders";

/// Order table query.
#[derive(Debug, Default, Deserialize)]
pub struct OrdersQuery {
    pub page: Option<u32>,
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub status: String,
}

impl OrdersQuery {
    /// The status filter, ignored when it is not a known status.
    fn status(&self) -> Option<OrderStatus> {
        self.status.parse().ok()
    }
}

/// Admin order table template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/orders.html")]
pub struct OrdersTemplate {
    pub ctx: PageContext,
    pub orders: Vec<OrderRow>,
    pub pagination: Pagination,
    pub q: String,
    pub statuses: Vec<OptionView>,
    pub load_error: Option<String>,
}

/// Admin order detail template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/order.html")]
pub struct OrderTemplate {
    pub ctx: PageContext,
    pub order: OrderDetailView,
    pub statuses: Vec<OptionView>,
    pub status_action: String,
}

/// Order status options, marking `current`.
fn status_options(current: Option<OrderStatus>) -> Vec<OptionView> {
    OrderStatus::ALL
        .into_iter()
        .map(|status| OptionView {
            value: status.as_str().to_string(),
            label: status.to_string(),
            selected: current == Some(status),
        })
        .collect()
}

/// Display the order table.
#[instrument(skip(state, ctx, admin))]
pub async fn index(
    State(state): State<AppState>,
    ctx: PageContext,
    RequireAdmin(admin): RequireAdmin,
    Query(query): Query<OrdersQuery>,
) -> impl IntoResponse {
    let status = query.status();
    let status_param = status.as_ref().map_or("", OrderStatus::as_str);
    let q = query.q.trim();
    let params = [
        ("page", query.page.unwrap_or(1).max(1).to_string()),
        ("limit", PER_PAGE.to_string()),
        ("sort", "-created_at".to_string()),
        ("q", q.to_string()),
        ("status", status_param.to_string()),
    ];

    let (page, load_error) = match state
        .api()
        .list::<Order>("/orders", &params, Some(&admin.token))
        .await
    {
        Ok(page) => (page, None),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load orders");
            (Page::empty(), Some(e.user_message()))
        }
    };

    OrdersTemplate {
        ctx,
        orders: page.items.iter().map(|o| OrderRow::new(o, ORDERS_BASE)).collect(),
        pagination: Pagination::new(ORDERS_BASE, &page, &[("q", q), ("status", status_param)]),
        q: q.to_string(),
        statuses: status_options(status),
        load_error,
    }
}

async fn fetch_order(state: &AppState, token: &SecretString, id: &str) -> Result<Order> {
    Ok(state.api().get(&doc_path("orders", id), &[], Some(token)).await?)
}

/// Display one order.
#[instrument(skip(state, ctx, admin))]
pub async fn show(
    State(state): State<AppState>,
    ctx: PageContext,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let order = fetch_order(&state, &admin.token, &id).await?;
    let statuses = status_options(Some(order.status));
    let order = OrderDetailView::new(&order, ORDERS_BASE);

    Ok(OrderTemplate {
        ctx,
        statuses,
        status_action: format!("{}/status", order.row.href),
        order,
    })
}

/// Status change form data.
#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: String,
}

#[derive(Serialize)]
struct StatusUpdate {
    status: OrderStatus,
}

/// Change an order's status.
#[instrument(skip(state, session, admin))]
pub async fn update_status(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
    Form(form): Form<StatusForm>,
) -> Result<Response> {
    let detail = format!("{ORDERS_BASE}/{}", urlencoding::encode(&id));
    let Ok(status) = form.status.parse::<OrderStatus>() else {
        return flash_redirect(&session, FlashKind::Error, "Unknown order status.", &detail).await;
    };

    let path = format!("{}/status", doc_path("orders", &id));
    match state
        .api()
        .put::<_, Value>(&path, &StatusUpdate { status }, Some(&admin.token))
        .await
    {
        Ok(_) => {
            add_breadcrumb(
                "admin",
                "Changed order status",
                Some(&[("order_id", id.as_str()), ("status", status.as_str())]),
            );
            let message = format!("Order marked {status}.");
            flash_redirect(&session, FlashKind::Success, message, &detail).await
        }
        Err(ApiError::Unauthorized) => Err(ApiError::Unauthorized.into()),
        Err(e) => {
            tracing::warn!(error = %e, order_id = %id, "Status change failed");
            flash_redirect(&session, FlashKind::Error, e.user_message(), &detail).await
        }
    }
}

/// Download an order's invoice.
#[instrument(skip(state, admin))]
pub async fn invoice(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
) -> Result<Response> {
    let order = fetch_order(&state, &admin.token, &id).await?;
    invoice_download(&order, &state.config().store_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_filter_ignores_unknown_values() {
        let query = OrdersQuery {
            status: "shipped".to_string(),
            ..OrdersQuery::default()
        };
        assert_eq!(query.status(), Some(OrderStatus::Shipped));

        let query = OrdersQuery {
            status: "lost".to_string(),
            ..OrdersQuery::default()
        };
        assert_eq!(query.status(), None);
    }

    #[test]
    fn test_status_options_mark_current() {
        let options = status_options(Some(OrderStatus::Processing));
        assert_eq!(options.len(), OrderStatus::ALL.len());
        let selected: Vec<_> = options.iter().filter(|o| o.selected).collect();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected.first().map(|o| o.value.as_str()), Some("processing"));
    }
}
