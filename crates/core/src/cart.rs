//! Session cart document and its totals.
//!
//! The cart is a denormalized snapshot of each product (name, prices, offered
//! services) plus the shopper's selections. Totals are recomputed from the
//! snapshot on every read; nothing derived is stored.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::{Deal, ProductSummary};
use crate::deals::best_discount;
use crate::pricing::{LineCharges, MAX_LINE_QUANTITY, PackPricing, line_charges};
use crate::types::{Money, ProductKind, ServiceId};

/// Errors from cart mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    #[error("{0} is out of stock")]
    OutOfStock(String),
    #[error("cart line not found: {0}")]
    LineNotFound(String),
    #[error("installation is not offered for {0}")]
    InstallationUnavailable(String),
    #[error("add-on {addon} is not offered for {product}")]
    AddonUnavailable { product: String, addon: String },
}

/// An add-on service a line may select.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddonOption {
    pub service_id: ServiceId,
    pub name: String,
    pub price: Money,
}

/// One product in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub line_id: String,
    pub product_id: String,
    pub kind: ProductKind,
    pub name: String,
    pub brand: String,
    pub image: Option<String>,
    pub stock: u32,
    pub pricing: PackPricing,
    pub quantity: u32,
    pub installation_fee: Option<Money>,
    pub installation_selected: bool,
    pub available_addons: Vec<AddonOption>,
    pub selected_addons: BTreeSet<ServiceId>,
}

impl CartLine {
    /// Stable line id for a product.
    #[must_use]
    pub fn id_for(kind: ProductKind, product_id: &str) -> String {
        format!("{}-{product_id}", kind.path_segment())
    }

    /// Largest quantity this line may hold.
    #[must_use]
    pub fn max_quantity(&self) -> u32 {
        self.stock.min(MAX_LINE_QUANTITY)
    }

    fn clamp(&self, quantity: u32) -> u32 {
        quantity.clamp(1, self.max_quantity().max(1))
    }

    /// Selected add-ons with their prices, in offer order.
    pub fn selected_addon_options(&self) -> impl Iterator<Item = &AddonOption> {
        self.available_addons
            .iter()
            .filter(|addon| self.selected_addons.contains(&addon.service_id))
    }

    /// Charges for this line under the given deals.
    #[must_use]
    pub fn charges(&self, deals: &[Deal], now: DateTime<Utc>) -> LineCharges {
        line_charges(
            &self.pricing,
            self.quantity,
            self.installation_fee.filter(|_| self.installation_selected),
            self.selected_addon_options().map(|addon| addon.price),
            best_discount(deals, &self.brand, now),
        )
    }

    fn refresh_from(&mut self, product: &ProductSummary) {
        self.name.clone_from(&product.name);
        self.brand.clone_from(&product.brand);
        self.image.clone_from(&product.image);
        self.stock = product.stock;
        self.pricing = product.pricing;
        self.installation_fee = product.installation_fee;
        if self.installation_fee.is_none() {
            self.installation_selected = false;
        }
        self.available_addons = addon_options(product);
        let offered: BTreeSet<&ServiceId> = self
            .available_addons
            .iter()
            .map(|addon| &addon.service_id)
            .collect();
        self.selected_addons.retain(|id| offered.contains(id));
    }
}

fn addon_options(product: &ProductSummary) -> Vec<AddonOption> {
    product
        .addons
        .iter()
        .map(|service| AddonOption {
            service_id: service.id.clone(),
            name: service.name.clone(),
            price: service.price,
        })
        .collect()
}

/// Cart totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CartTotals {
    pub merchandise: Money,
    pub installation: Money,
    pub addons: Money,
    pub discount: Money,
    pub total: Money,
    pub item_count: u32,
}

/// The session cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub lines: Vec<CartLine>,
}

impl Cart {
    /// True when the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total units across lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|line| line.quantity).sum()
    }

    /// Look up a line.
    #[must_use]
    pub fn line(&self, line_id: &str) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.line_id == line_id)
    }

    fn line_mut(&mut self, line_id: &str) -> Result<&mut CartLine, CartError> {
        self.lines
            .iter_mut()
            .find(|line| line.line_id == line_id)
            .ok_or_else(|| CartError::LineNotFound(line_id.to_string()))
    }

    /// Add `quantity` units of a product, merging with an existing line.
    ///
    /// The product snapshot (prices, stock, offered services) is refreshed
    /// from `product`. Quantity is clamped to the available stock.
    ///
    /// # Errors
    ///
    /// Returns `CartError::OutOfStock` when the product has no stock.
    pub fn add(&mut self, product: &ProductSummary, quantity: u32) -> Result<&CartLine, CartError> {
        if product.stock == 0 {
            return Err(CartError::OutOfStock(product.name.clone()));
        }

        let line_id = CartLine::id_for(product.kind, &product.id);
        let index = match self.lines.iter().position(|line| line.line_id == line_id) {
            Some(index) => index,
            None => {
                self.lines.push(CartLine {
                    line_id,
                    product_id: product.id.clone(),
                    kind: product.kind,
                    name: product.name.clone(),
                    brand: product.brand.clone(),
                    image: product.image.clone(),
                    stock: product.stock,
                    pricing: product.pricing,
                    quantity: 0,
                    installation_fee: product.installation_fee,
                    installation_selected: false,
                    available_addons: addon_options(product),
                    selected_addons: BTreeSet::new(),
                });
                self.lines.len() - 1
            }
        };

        let Some(line) = self.lines.get_mut(index) else {
            return Err(CartError::LineNotFound(product.id.clone()));
        };
        line.refresh_from(product);
        line.quantity = line.clamp(line.quantity.saturating_add(quantity.max(1)));
        Ok(line)
    }

    /// Set a line's quantity. Zero removes the line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::LineNotFound` for an unknown line.
    pub fn set_quantity(&mut self, line_id: &str, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 {
            return self.remove(line_id);
        }
        let line = self.line_mut(line_id)?;
        line.quantity = line.clamp(quantity);
        Ok(())
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::LineNotFound` for an unknown line.
    pub fn remove(&mut self, line_id: &str) -> Result<(), CartError> {
        let before = self.lines.len();
        self.lines.retain(|line| line.line_id != line_id);
        if self.lines.len() == before {
            return Err(CartError::LineNotFound(line_id.to_string()));
        }
        Ok(())
    }

    /// Select or deselect installation for a line.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown line, or when selecting installation
    /// on a product that does not offer it.
    pub fn set_installation(&mut self, line_id: &str, selected: bool) -> Result<(), CartError> {
        let line = self.line_mut(line_id)?;
        if selected && line.installation_fee.is_none() {
            return Err(CartError::InstallationUnavailable(line.name.clone()));
        }
        line.installation_selected = selected;
        Ok(())
    }

    /// Toggle an add-on on a line. Returns whether it is now selected.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown line or an add-on the product does
    /// not offer.
    pub fn toggle_addon(&mut self, line_id: &str, service_id: &ServiceId) -> Result<bool, CartError> {
        let line = self.line_mut(line_id)?;
        if !line
            .available_addons
            .iter()
            .any(|addon| &addon.service_id == service_id)
        {
            return Err(CartError::AddonUnavailable {
                product: line.name.clone(),
                addon: service_id.to_string(),
            });
        }
        if line.selected_addons.remove(service_id) {
            Ok(false)
        } else {
            line.selected_addons.insert(service_id.clone());
            Ok(true)
        }
    }

    /// Reapply current catalog data to every line.
    ///
    /// Lines whose product is missing from `products` or out of stock are
    /// removed, and quantities are clamped to the current stock. Returns
    /// whether anything the shopper would pay for changed.
    pub fn refresh(&mut self, products: &[ProductSummary]) -> bool {
        let before = self.clone();
        self.lines.retain_mut(|line| {
            let Some(product) = products
                .iter()
                .find(|p| p.kind == line.kind && p.id == line.product_id)
            else {
                return false;
            };
            if product.stock == 0 {
                return false;
            }
            line.refresh_from(product);
            line.quantity = line.clamp(line.quantity);
            true
        });
        *self != before
    }

    /// Empty the cart (after a successful checkout).
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Every line with its charges.
    #[must_use]
    pub fn priced_lines(&self, deals: &[Deal], now: DateTime<Utc>) -> Vec<(&CartLine, LineCharges)> {
        self.lines
            .iter()
            .map(|line| (line, line.charges(deals, now)))
            .collect()
    }

    /// Recompute totals from the current selections.
    #[must_use]
    pub fn totals(&self, deals: &[Deal], now: DateTime<Utc>) -> CartTotals {
        let mut totals = self.priced_lines(deals, now).into_iter().fold(
            CartTotals::default(),
            |mut acc, (line, charges)| {
                acc.merchandise += charges.merchandise;
                acc.installation += charges.installation;
                acc.addons += charges.addons;
                acc.discount += charges.discount;
                acc.item_count += line.quantity;
                acc
            },
        );
        totals.total = totals.merchandise + totals.installation + totals.addons - totals.discount;
        totals
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::{Duration, TimeZone};
    use rust_decimal::Decimal;

    use super::*;
    use crate::catalog::Service;
    use crate::deals::tests::deal;

    fn dollars(d: i64) -> Money {
        Money::from_cents(d * 100)
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).single().unwrap()
    }

    fn tire(id: &str, stock: u32) -> ProductSummary {
        ProductSummary {
            id: id.to_string(),
            kind: ProductKind::Tire,
            name: format!("Tire {id}"),
            brand: "Michelin".to_string(),
            image: None,
            stock,
            pricing: PackPricing::single(dollars(100)),
            installation_fee: Some(dollars(20)),
            addons: vec![
                Service {
                    id: ServiceId::new("tpms"),
                    name: "TPMS".to_string(),
                    description: None,
                    price: dollars(5),
                },
                Service {
                    id: ServiceId::new("hazard"),
                    name: "Road hazard".to_string(),
                    description: None,
                    price: dollars(15),
                },
            ],
        }
    }

    #[test]
    fn test_add_merges_and_clamps_to_stock() {
        let mut cart = Cart::default();
        cart.add(&tire("t1", 6), 4).unwrap();
        let line = cart.add(&tire("t1", 6), 4).unwrap();
        assert_eq!(line.quantity, 6);
        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.item_count(), 6);
    }

    #[test]
    fn test_add_out_of_stock() {
        let mut cart = Cart::default();
        assert!(matches!(
            cart.add(&tire("t1", 0), 1),
            Err(CartError::OutOfStock(_))
        ));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_totals_follow_selections() {
        let mut cart = Cart::default();
        cart.add(&tire("t1", 10), 4).unwrap();
        let line_id = CartLine::id_for(ProductKind::Tire, "t1");

        assert_eq!(cart.totals(&[], now()).total, dollars(400));

        cart.set_installation(&line_id, true).unwrap();
        assert_eq!(cart.totals(&[], now()).total, dollars(480));

        assert!(cart.toggle_addon(&line_id, &ServiceId::new("tpms")).unwrap());
        assert!(cart.toggle_addon(&line_id, &ServiceId::new("hazard")).unwrap());
        let totals = cart.totals(&[], now());
        assert_eq!(totals.installation, dollars(80));
        assert_eq!(totals.addons, dollars(80));
        assert_eq!(totals.total, dollars(560));

        // Toggling again deselects
        assert!(!cart.toggle_addon(&line_id, &ServiceId::new("hazard")).unwrap());
        assert_eq!(cart.totals(&[], now()).total, dollars(500));

        cart.set_quantity(&line_id, 2).unwrap();
        assert_eq!(cart.totals(&[], now()).total, dollars(250));
    }

    #[test]
    fn test_deal_discounts_merchandise_only() {
        let mut cart = Cart::default();
        cart.add(&tire("t1", 10), 4).unwrap();
        let line_id = CartLine::id_for(ProductKind::Tire, "t1");
        cart.set_installation(&line_id, true).unwrap();

        let deals = vec![deal(
            "Michelin",
            25,
            now() - Duration::days(1),
            now() + Duration::days(1),
        )];
        let totals = cart.totals(&deals, now());
        assert_eq!(totals.discount, dollars(100));
        assert_eq!(totals.total, dollars(380));
        assert_eq!(
            cart.lines[0].charges(&deals, now()).discount.amount(),
            Decimal::from(100)
        );
    }

    #[test]
    fn test_unknown_addon_and_missing_installation() {
        let mut cart = Cart::default();
        let mut product = tire("t2", 4);
        product.installation_fee = None;
        cart.add(&product, 1).unwrap();
        let line_id = CartLine::id_for(ProductKind::Tire, "t2");

        assert!(matches!(
            cart.set_installation(&line_id, true),
            Err(CartError::InstallationUnavailable(_))
        ));
        assert!(matches!(
            cart.toggle_addon(&line_id, &ServiceId::new("nitrogen")),
            Err(CartError::AddonUnavailable { .. })
        ));
        assert!(matches!(
            cart.set_quantity("wheels-nope", 2),
            Err(CartError::LineNotFound(_))
        ));
    }

    #[test]
    fn test_zero_quantity_removes_line() {
        let mut cart = Cart::default();
        cart.add(&tire("t1", 4), 2).unwrap();
        cart.set_quantity(&CartLine::id_for(ProductKind::Tire, "t1"), 0)
            .unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_refresh_applies_current_catalog() {
        let mut cart = Cart::default();
        cart.add(&tire("t1", 10), 4).unwrap();
        cart.add(&tire("t2", 10), 1).unwrap();
        let line_id = CartLine::id_for(ProductKind::Tire, "t1");
        cart.set_installation(&line_id, true).unwrap();

        // Unchanged catalog
        assert!(!cart.refresh(&[tire("t1", 10), tire("t2", 10)]));

        let mut repriced = tire("t1", 3);
        repriced.pricing = PackPricing::single(dollars(110));
        repriced.installation_fee = Some(dollars(30));
        // t2 is gone from the catalog
        assert!(cart.refresh(&[repriced]));

        assert_eq!(cart.lines.len(), 1);
        let line = cart.line(&line_id).unwrap();
        assert_eq!(line.quantity, 3);
        assert!(line.installation_selected);
        // 3 x $110 + 3 x $30
        assert_eq!(cart.totals(&[], now()).total, dollars(420));

        assert!(cart.refresh(&[tire("t1", 0)]));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_refresh_drops_withdrawn_selections() {
        let mut cart = Cart::default();
        cart.add(&tire("t1", 4), 1).unwrap();
        let line_id = CartLine::id_for(ProductKind::Tire, "t1");
        cart.set_installation(&line_id, true).unwrap();
        cart.toggle_addon(&line_id, &ServiceId::new("tpms")).unwrap();

        let mut withdrawn = tire("t1", 4);
        withdrawn.installation_fee = None;
        withdrawn.addons.clear();
        cart.add(&withdrawn, 1).unwrap();

        let line = cart.line(&line_id).unwrap();
        assert!(!line.installation_selected);
        assert!(line.selected_addons.is_empty());
        assert_eq!(line.quantity, 2);
    }
}
