//! Orders as stored by the API, and the payload that creates them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cart::{Cart, CartLine};
use crate::catalog::{Deal, User};
use crate::deals::best_discount;
use crate::pricing::{LineCharges, PackPricing, line_charges};
use crate::types::reference::Document;
use crate::types::{
    Money, OrderId, OrderStatus, PaymentProvider, PaymentStatus, ProductKind, Ref, ServiceId,
};

/// An add-on captured on an order line, with the price paid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedAddon {
    pub service_id: ServiceId,
    pub name: String,
    pub price: Money,
}

/// A line on an order. Prices are the ones in effect at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: String,
    pub kind: ProductKind,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pair_price: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_price: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installation_fee: Option<Money>,
    #[serde(default)]
    pub installation_selected: bool,
    #[serde(default)]
    pub addons: Vec<SelectedAddon>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_percent: Option<Decimal>,
}

impl OrderItem {
    /// Pricing snapshot of the line.
    #[must_use]
    pub const fn pricing(&self) -> PackPricing {
        PackPricing {
            unit: self.unit_price,
            pair: self.pair_price,
            set: self.set_price,
        }
    }

    /// Charges of the line, computed the same way as in the cart.
    #[must_use]
    pub fn charges(&self) -> LineCharges {
        line_charges(
            &self.pricing(),
            self.quantity,
            self.installation_fee.filter(|_| self.installation_selected),
            self.addons.iter().map(|addon| addon.price),
            self.discount_percent,
        )
    }

    fn from_cart_line(line: &CartLine, discount_percent: Option<Decimal>) -> Self {
        Self {
            product_id: line.product_id.clone(),
            kind: line.kind,
            name: line.name.clone(),
            quantity: line.quantity,
            unit_price: line.pricing.unit,
            pair_price: line.pricing.pair,
            set_price: line.pricing.set,
            installation_fee: line.installation_fee,
            installation_selected: line.installation_selected,
            addons: line
                .selected_addon_options()
                .map(|addon| SelectedAddon {
                    service_id: addon.service_id.clone(),
                    name: addon.name.clone(),
                    price: addon.price,
                })
                .collect(),
            discount_percent,
        }
    }
}

/// Shipping / billing address captured at checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub name: String,
    #[serde(default)]
    pub phone: String,
    pub line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
}

impl Address {
    /// Address lines for printing.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![self.name.clone(), self.line1.clone()];
        if let Some(line2) = self.line2.as_ref().filter(|l| !l.is_empty()) {
            lines.push(line2.clone());
        }
        lines.push(format!("{}, {} {}", self.city, self.state, self.postal_code));
        if !self.phone.is_empty() {
            lines.push(self.phone.clone());
        }
        lines
    }
}

/// An order document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    #[serde(rename = "_id")]
    pub id: OrderId,
    pub order_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<Ref<User>>,
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub shipping: Address,
    pub subtotal: Money,
    #[serde(default)]
    pub services_total: Money,
    #[serde(default)]
    pub discount_total: Money,
    pub total: Money,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_provider: Option<PaymentProvider>,
    pub created_at: DateTime<Utc>,
}

impl Document for Order {
    fn document_id(&self) -> &str {
        self.id.as_str()
    }

    fn label(&self) -> String {
        format!("#{}", self.order_number)
    }
}

impl Order {
    /// Customer label: populated name, or the bare user id, or "Guest".
    #[must_use]
    pub fn customer_label(&self) -> String {
        self.user
            .as_ref()
            .map_or_else(|| "Guest".to_string(), Ref::label)
    }
}

/// Payload for `POST /orders`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub items: Vec<OrderItem>,
    pub shipping: Address,
    pub subtotal: Money,
    pub services_total: Money,
    pub discount_total: Money,
    pub total: Money,
    pub payment_provider: PaymentProvider,
}

impl NewOrder {
    /// Build the order payload from the cart, freezing current prices and deals.
    ///
    /// Returns `None` for an empty cart.
    #[must_use]
    pub fn from_cart(
        cart: &Cart,
        deals: &[Deal],
        now: DateTime<Utc>,
        shipping: Address,
        payment_provider: PaymentProvider,
    ) -> Option<Self> {
        if cart.is_empty() {
            return None;
        }
        let totals = cart.totals(deals, now);
        let items = cart
            .lines
            .iter()
            .map(|line| OrderItem::from_cart_line(line, best_discount(deals, &line.brand, now)))
            .collect();

        Some(Self {
            items,
            shipping,
            subtotal: totals.merchandise,
            services_total: totals.installation + totals.addons,
            discount_total: totals.discount,
            total: totals.total,
            payment_provider,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::catalog::{ProductSummary, Service};
    use crate::deals::tests::deal;

    #[test]
    fn test_new_order_totals_match_item_charges() {
        let now = Utc.with_ymd_and_hms(2025, 1, 10, 0, 0, 0).single().unwrap();
        let product = ProductSummary {
            id: "w1".to_string(),
            kind: ProductKind::Wheel,
            name: "Enkei RPF1 17x8".to_string(),
            brand: "Enkei".to_string(),
            image: None,
            stock: 8,
            pricing: PackPricing {
                unit: Money::from_cents(24_900),
                pair: None,
                set: Some(Money::from_cents(89_900)),
            },
            installation_fee: Some(Money::from_cents(1_500)),
            addons: vec![Service {
                id: ServiceId::new("lugs"),
                name: "Lug nuts".to_string(),
                description: None,
                price: Money::from_cents(1_000),
            }],
        };
        let mut cart = Cart::default();
        cart.add(&product, 5).unwrap();
        let line_id = CartLine::id_for(ProductKind::Wheel, "w1");
        cart.set_installation(&line_id, true).unwrap();
        cart.toggle_addon(&line_id, &ServiceId::new("lugs")).unwrap();

        let deals = vec![deal("ENKEI", 10, now - Duration::days(1), now + Duration::days(1))];
        let order =
            NewOrder::from_cart(&cart, &deals, now, Address::default(), PaymentProvider::Stripe)
                .unwrap();

        let item_total: Money = order.items.iter().map(|item| item.charges().total()).sum();
        assert_eq!(item_total, order.total);
        // 899 + 249 = 1148 merchandise, 114.80 off, 5 × (15 + 10) services
        assert_eq!(order.subtotal, Money::from_cents(114_800));
        assert_eq!(order.discount_total, Money::from_cents(11_480));
        assert_eq!(order.services_total, Money::from_cents(12_500));
        assert_eq!(order.total, Money::from_cents(115_820));
    }

    #[test]
    fn test_empty_cart_has_no_order() {
        let now = Utc::now();
        assert!(
            NewOrder::from_cart(
                &Cart::default(),
                &[],
                now,
                Address::default(),
                PaymentProvider::Paypal
            )
            .is_none()
        );
    }
}
