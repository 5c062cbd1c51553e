//! Line pricing shared by the cart and the invoice.
//!
//! A line is charged:
//!
//! ```text
//! merchandise  = cheapest mix of sets (4), pairs (2) and singles covering `quantity`
//! installation = installation fee × quantity        (when selected)
//! addons       = Σ addon price × quantity           (each selected addon)
//! discount     = deal percent of merchandise         (when a deal applies)
//! total        = merchandise + installation + addons − discount
//! ```
//!
//! With no bundle prices the merchandise amount is `unit price × quantity`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::Money;

/// Units in a pair bundle.
pub const PAIR_UNITS: u32 = 2;
/// Units in a set bundle.
pub const SET_UNITS: u32 = 4;
/// Upper bound for a single line's quantity.
pub const MAX_LINE_QUANTITY: u32 = 99;

/// Unit and bundle prices of one product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackPricing {
    /// Price of a single unit.
    pub unit: Money,
    /// Price of two units bought together.
    pub pair: Option<Money>,
    /// Price of four units bought together.
    pub set: Option<Money>,
}

impl PackPricing {
    /// Pricing with no bundles.
    #[must_use]
    pub const fn single(unit: Money) -> Self {
        Self {
            unit,
            pair: None,
            set: None,
        }
    }

    /// The cheapest way to buy exactly `quantity` units.
    ///
    /// Ties go to the split with fewer bundles.
    #[must_use]
    pub fn breakdown(&self, quantity: u32) -> PackBreakdown {
        let max_sets = if self.set.is_some() {
            quantity / SET_UNITS
        } else {
            0
        };

        // Removing a set keeps the remainder's parity, so the cost is linear
        // in the set count and the optimum is at either end.
        let none = self.split(quantity, 0);
        let all = self.split(quantity, max_sets);
        if all.amount < none.amount { all } else { none }
    }

    /// `sets` sets, then pairs only when cheaper than two singles.
    fn split(&self, quantity: u32, sets: u32) -> PackBreakdown {
        let after_sets = quantity - sets * SET_UNITS;
        let pairs = match self.pair {
            Some(pair) if pair < self.unit * PAIR_UNITS => after_sets / PAIR_UNITS,
            _ => 0,
        };
        let singles = after_sets - pairs * PAIR_UNITS;
        PackBreakdown {
            sets,
            pairs,
            singles,
            amount: self.set.unwrap_or(Money::ZERO) * sets
                + self.pair.unwrap_or(Money::ZERO) * pairs
                + self.unit * singles,
        }
    }

    /// Merchandise amount for `quantity` units.
    #[must_use]
    pub fn merchandise(&self, quantity: u32) -> Money {
        self.breakdown(quantity).amount
    }
}

/// How a quantity was split into bundles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackBreakdown {
    pub sets: u32,
    pub pairs: u32,
    pub singles: u32,
    pub amount: Money,
}

impl PackBreakdown {
    /// Short description, e.g. "1 set of 4 + 1 single". Empty when only singles.
    #[must_use]
    pub fn describe(&self) -> String {
        if self.sets == 0 && self.pairs == 0 {
            return String::new();
        }
        let mut parts = Vec::new();
        if self.sets > 0 {
            parts.push(format!(
                "{} set{} of 4",
                self.sets,
                if self.sets == 1 { "" } else { "s" }
            ));
        }
        if self.pairs > 0 {
            parts.push(format!(
                "{} pair{}",
                self.pairs,
                if self.pairs == 1 { "" } else { "s" }
            ));
        }
        if self.singles > 0 {
            parts.push(format!(
                "{} single{}",
                self.singles,
                if self.singles == 1 { "" } else { "s" }
            ));
        }
        parts.join(" + ")
    }
}

/// The charges of a single cart or order line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LineCharges {
    pub merchandise: Money,
    pub installation: Money,
    pub addons: Money,
    pub discount: Money,
}

impl LineCharges {
    /// Installation plus add-ons.
    #[must_use]
    pub fn services(&self) -> Money {
        self.installation + self.addons
    }

    /// What the customer pays for the line.
    #[must_use]
    pub fn total(&self) -> Money {
        self.merchandise + self.installation + self.addons - self.discount
    }
}

/// Price one line.
///
/// `installation_fee` is the per-unit fee when installation is selected,
/// `addon_prices` the per-unit prices of the selected add-ons.
#[must_use]
pub fn line_charges(
    pricing: &PackPricing,
    quantity: u32,
    installation_fee: Option<Money>,
    addon_prices: impl IntoIterator<Item = Money>,
    discount_percent: Option<Decimal>,
) -> LineCharges {
    let merchandise = pricing.merchandise(quantity);
    let installation = installation_fee.map_or(Money::ZERO, |fee| fee * quantity);
    let addons = addon_prices
        .into_iter()
        .map(|price| price * quantity)
        .sum();
    let discount = discount_percent
        .filter(|percent| percent.is_sign_positive() && !percent.is_zero())
        .map_or(Money::ZERO, |percent| {
            merchandise.percent(percent.min(Decimal::ONE_HUNDRED))
        });

    LineCharges {
        merchandise,
        installation,
        addons,
        discount,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dollars(d: i64) -> Money {
        Money::from_cents(d * 100)
    }

    #[test]
    fn test_no_bundles_is_unit_times_quantity() {
        let pricing = PackPricing::single(dollars(120));
        assert_eq!(pricing.merchandise(3), dollars(360));
        assert_eq!(pricing.merchandise(0), Money::ZERO);
    }

    #[test]
    fn test_set_and_pair_bundles() {
        let pricing = PackPricing {
            unit: dollars(100),
            pair: Some(dollars(190)),
            set: Some(dollars(360)),
        };
        assert_eq!(pricing.merchandise(4), dollars(360));
        assert_eq!(pricing.merchandise(6), dollars(550));
        let five = pricing.breakdown(5);
        assert_eq!((five.sets, five.pairs, five.singles), (1, 0, 1));
        assert_eq!(five.amount, dollars(460));
        assert_eq!(five.describe(), "1 set of 4 + 1 single");
    }

    #[test]
    fn test_breakdown_matches_exhaustive_search() {
        let pricings = [
            PackPricing {
                unit: dollars(100),
                pair: Some(dollars(190)),
                set: Some(dollars(360)),
            },
            PackPricing {
                unit: dollars(100),
                pair: Some(dollars(150)),
                set: Some(dollars(390)),
            },
            PackPricing {
                unit: dollars(100),
                pair: None,
                set: Some(dollars(420)),
            },
        ];
        for pricing in pricings {
            for quantity in 0..=40 {
                let mut cheapest = pricing.unit * quantity;
                for sets in 0..=quantity / SET_UNITS {
                    for pairs in 0..=(quantity - sets * SET_UNITS) / PAIR_UNITS {
                        let singles = quantity - sets * SET_UNITS - pairs * PAIR_UNITS;
                        let amount = pricing.set.unwrap_or(pricing.unit * SET_UNITS) * sets
                            + pricing.pair.unwrap_or(pricing.unit * PAIR_UNITS) * pairs
                            + pricing.unit * singles;
                        cheapest = cheapest.min(amount);
                    }
                }
                assert_eq!(pricing.merchandise(quantity), cheapest, "quantity {quantity}");
            }
        }
    }

    #[test]
    fn test_breakdown_of_large_quantity() {
        let pricing = PackPricing {
            unit: dollars(100),
            pair: Some(dollars(190)),
            set: Some(dollars(360)),
        };
        let breakdown = pricing.breakdown(4_000_001);
        assert_eq!(
            (breakdown.sets, breakdown.pairs, breakdown.singles),
            (1_000_000, 0, 1)
        );
    }

    #[test]
    fn test_bundle_more_expensive_than_singles_is_ignored() {
        let pricing = PackPricing {
            unit: dollars(100),
            pair: Some(dollars(250)),
            set: None,
        };
        let breakdown = pricing.breakdown(2);
        assert_eq!(breakdown.amount, dollars(200));
        assert_eq!(breakdown.describe(), "");
    }

    #[test]
    fn test_line_charges_services_and_discount() {
        let pricing = PackPricing::single(dollars(150));
        let charges = line_charges(
            &pricing,
            4,
            Some(dollars(20)),
            [Money::from_cents(999), dollars(5)],
            Some(Decimal::TEN),
        );
        assert_eq!(charges.merchandise, dollars(600));
        assert_eq!(charges.installation, dollars(80));
        assert_eq!(charges.addons, Money::from_cents(5996));
        assert_eq!(charges.discount, dollars(60));
        assert_eq!(charges.total(), Money::from_cents(67_996));
    }

    #[test]
    fn test_line_charges_ignores_nonpositive_discount() {
        let pricing = PackPricing::single(dollars(10));
        let charges = line_charges(&pricing, 1, None, Vec::new(), Some(Decimal::ZERO));
        assert_eq!(charges.discount, Money::ZERO);
        assert_eq!(charges.total(), dollars(10));
    }
}
