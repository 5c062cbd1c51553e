//! Invoice lines derived from an order.
//!
//! Lines are priced with the same [`line_charges`](crate::pricing::line_charges)
//! the cart uses, so an invoice line always equals the order line. If the
//! grand total disagrees with what the API stored, no invoice is produced.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::order::Order;
use crate::types::{Money, OrderStatus, PaymentStatus};

/// Errors producing an invoice.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvoiceError {
    #[error("order {order_number} has no items")]
    NoItems { order_number: String },
    #[error("order {order_number} total {stored} does not match its lines ({computed})")]
    TotalMismatch {
        order_number: String,
        stored: Money,
        computed: Money,
    },
}

/// One printed invoice line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceLine {
    pub description: String,
    /// Bundle split and selected services, one entry per note.
    pub notes: Vec<String>,
    pub quantity: u32,
    pub unit_price: Money,
    pub merchandise: Money,
    pub services: Money,
    pub discount: Money,
    pub total: Money,
}

/// A printable invoice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invoice {
    pub order_number: String,
    pub issued_at: DateTime<Utc>,
    pub customer: String,
    pub ship_to: Vec<String>,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub lines: Vec<InvoiceLine>,
    pub merchandise: Money,
    pub services: Money,
    pub discount: Money,
    pub total: Money,
}

impl Invoice {
    /// Build the invoice for an order.
    ///
    /// # Errors
    ///
    /// Returns an error when the order has no items or when its stored total
    /// differs from the sum of its recomputed lines.
    pub fn from_order(order: &Order) -> Result<Self, InvoiceError> {
        if order.items.is_empty() {
            return Err(InvoiceError::NoItems {
                order_number: order.order_number.clone(),
            });
        }

        let lines: Vec<InvoiceLine> = order
            .items
            .iter()
            .map(|item| {
                let charges = item.charges();
                let mut notes = Vec::new();
                let bundle = item.pricing().breakdown(item.quantity).describe();
                if !bundle.is_empty() {
                    notes.push(format!("Priced as {bundle}"));
                }
                if let Some(fee) = item.installation_fee.filter(|_| item.installation_selected) {
                    notes.push(format!("Installation {fee} each"));
                }
                for addon in &item.addons {
                    notes.push(format!("{} {} each", addon.name, addon.price));
                }
                if !charges.discount.is_zero() {
                    notes.push(format!("Deal discount -{}", charges.discount));
                }

                InvoiceLine {
                    description: item.name.clone(),
                    notes,
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                    merchandise: charges.merchandise,
                    services: charges.services(),
                    discount: charges.discount,
                    total: charges.total(),
                }
            })
            .collect();

        let computed: Money = lines.iter().map(|line| line.total).sum();
        if computed.round_cents() != order.total.round_cents() {
            return Err(InvoiceError::TotalMismatch {
                order_number: order.order_number.clone(),
                stored: order.total,
                computed,
            });
        }

        Ok(Self {
            order_number: order.order_number.clone(),
            issued_at: order.created_at,
            customer: order.customer_label(),
            ship_to: order.shipping.lines(),
            status: order.status,
            payment_status: order.payment_status,
            merchandise: lines.iter().map(|line| line.merchandise).sum(),
            services: lines.iter().map(|line| line.services).sum(),
            discount: lines.iter().map(|line| line.discount).sum(),
            total: computed,
            lines,
        })
    }
}
