//! Order views and invoice downloads shared by the profile and admin pages.

use axum::{
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    response::{IntoResponse, Response},
};

use rimline_core::invoice::Invoice;
use rimline_core::order::{Order, OrderItem};
use rimline_core::types::{OrderStatus, PaymentStatus};

use crate::api::doc_path;
use crate::error::Result;
use crate::services::invoice_pdf::{attachment_header, render};

/// CSS modifier for an order status badge.
#[must_use]
pub const fn status_class(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Pending => "badge--pending",
        OrderStatus::Processing => "badge--processing",
        OrderStatus::Shipped => "badge--shipped",
        OrderStatus::Completed => "badge--completed",
        OrderStatus::Cancelled => "badge--cancelled",
    }
}

/// CSS modifier for a payment status badge.
#[must_use]
pub const fn payment_class(status: PaymentStatus) -> &'static str {
    match status {
        PaymentStatus::Paid => "badge--completed",
        PaymentStatus::Unpaid => "badge--pending",
        PaymentStatus::Failed => "badge--cancelled",
        PaymentStatus::Refunded => "badge--processing",
    }
}

/// Order list row display data for templates.
#[derive(Debug, Clone)]
pub struct OrderRow {
    pub href: String,
    pub number: String,
    pub date: String,
    pub customer: String,
    pub item_count: u32,
    pub status: String,
    pub status_class: &'static str,
    pub payment_status: String,
    pub payment_class: &'static str,
    pub total: String,
}

impl OrderRow {
    /// Row linking under `base` (`/profile/orders` or `/admin/orders`).
    #[must_use]
    pub fn new(order: &Order, base: &str) -> Self {
        Self {
            href: format!("{base}/{}", urlencoding::encode(order.id.as_str())),
            number: format!("#{}", order.order_number),
            date: order.created_at.format("%Y-%m-%d").to_string(),
            customer: order.customer_label(),
            item_count: order.items.iter().map(|item| item.quantity).sum(),
            status: order.status.to_string(),
            status_class: status_class(order.status),
            payment_status: order.payment_status.to_string(),
            payment_class: payment_class(order.payment_status),
            total: order.total.to_string(),
        }
    }
}

/// Order line display data for templates.
#[derive(Debug, Clone)]
pub struct OrderLineView {
    pub name: String,
    pub href: String,
    pub quantity: u32,
    pub unit_price: String,
    pub notes: Vec<String>,
    pub services: String,
    pub discount: Option<String>,
    pub total: String,
}

impl From<&OrderItem> for OrderLineView {
    fn from(item: &OrderItem) -> Self {
        let charges = item.charges();
        let mut notes = Vec::new();
        let bundle = item.pricing().breakdown(item.quantity).describe();
        if !bundle.is_empty() {
            notes.push(bundle);
        }
        if let Some(fee) = item.installation_fee.filter(|_| item.installation_selected) {
            notes.push(format!("Installation ({fee} each)"));
        }
        notes.extend(
            item.addons
                .iter()
                .map(|addon| format!("{} ({} each)", addon.name, addon.price)),
        );

        Self {
            name: item.name.clone(),
            href: doc_path(item.kind.path_segment(), &item.product_id),
            quantity: item.quantity,
            unit_price: item.unit_price.to_string(),
            notes,
            services: charges.services().to_string(),
            discount: (!charges.discount.is_zero()).then(|| format!("-{}", charges.discount)),
            total: charges.total().to_string(),
        }
    }
}

/// Order detail display data for templates.
#[derive(Debug, Clone)]
pub struct OrderDetailView {
    pub row: OrderRow,
    pub provider: Option<&'static str>,
    pub ship_to: Vec<String>,
    pub lines: Vec<OrderLineView>,
    pub subtotal: String,
    pub services: String,
    pub discount: Option<String>,
    pub invoice_href: String,
}

impl OrderDetailView {
    /// Detail view linking under `base`.
    #[must_use]
    pub fn new(order: &Order, base: &str) -> Self {
        let row = OrderRow::new(order, base);
        Self {
            invoice_href: format!("{}/invoice.pdf", row.href),
            row,
            provider: order.payment_provider.map(|p| p.label()),
            ship_to: order.shipping.lines(),
            lines: order.items.iter().map(OrderLineView::from).collect(),
            subtotal: order.subtotal.to_string(),
            services: order.services_total.to_string(),
            discount: (!order.discount_total.is_zero()).then(|| format!("-{}", order.discount_total)),
        }
    }
}

/// PDF invoice download for an order.
///
/// # Errors
///
/// Returns an error if the order cannot be invoiced (no items, or totals that
/// disagree with its lines) or the PDF fails to render.
pub fn invoice_download(order: &Order, store_name: &str) -> Result<Response> {
    let invoice = Invoice::from_order(order)?;
    let bytes = render(&invoice, store_name)?;
    tracing::info!(order_number = %order.order_number, bytes = bytes.len(), "Rendered invoice");

    Ok((
        [
            (CONTENT_TYPE, "application/pdf".to_string()),
            (CONTENT_DISPOSITION, attachment_header(&order.order_number)),
        ],
        bytes,
    )
        .into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use axum::http::StatusCode;

    use super::*;

    fn order() -> Order {
        serde_json::from_value(serde_json::json!({
            "_id": "o1",
            "order_number": "10042",
            "user": {"_id": "u1", "name": "Dana Reyes", "email": "dana@example.com"},
            "items": [{
                "product_id": "t1",
                "kind": "tire",
                "name": "Michelin Pilot Sport 4S",
                "quantity": 4,
                "unit_price": 275,
                "set_price": 999,
                "installation_fee": 25,
                "installation_selected": true,
                "addons": [{"service_id": "s1", "name": "TPMS Rebuild", "price": 9.99}]
            }],
            "shipping": {"name": "Dana Reyes", "line1": "1 Main St", "city": "Austin", "state": "TX", "postal_code": "78701"},
            "subtotal": 999,
            "services_total": 139.96,
            "total": 1138.96,
            "status": "processing",
            "payment_status": "paid",
            "payment_provider": "stripe",
            "created_at": "2025-03-14T12:00:00Z"
        }))
        .unwrap()
    }

    #[test]
    fn test_order_detail_view() {
        let view = OrderDetailView::new(&order(), "/profile/orders");
        assert_eq!(view.row.href, "/profile/orders/o1");
        assert_eq!(view.invoice_href, "/profile/orders/o1/invoice.pdf");
        assert_eq!(view.row.customer, "Dana Reyes");
        assert_eq!(view.row.status_class, "badge--processing");
        assert_eq!(view.provider, Some("Credit / debit card"));
        let line = &view.lines[0];
        assert_eq!(line.notes[0], "1 set of 4");
        assert_eq!(line.services, "$139.96");
        assert_eq!(line.total, "$1,138.96");
        assert!(view.discount.is_none());
    }

    #[test]
    fn test_invoice_download_headers() {
        let response = invoice_download(&order(), "Rimline").unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/pdf");
        assert_eq!(
            response.headers()[CONTENT_DISPOSITION],
            "attachment; filename=\"invoice-10042.pdf\""
        );
    }

    #[test]
    fn test_invoice_refuses_mismatched_total() {
        let mut order = order();
        order.total = rimline_core::Money::from_cents(1);
        assert!(invoice_download(&order, "Rimline").is_err());
    }
}
