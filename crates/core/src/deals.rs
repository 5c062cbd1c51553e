//! Time-bounded brand discounts.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::catalog::Deal;

impl Deal {
    /// Whether `now` falls within the deal window (both ends inclusive).
    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.starts_at <= now && now <= self.ends_at
    }

    /// Whether the deal covers products of `brand` (case-insensitive).
    #[must_use]
    pub fn applies_to(&self, brand: &str) -> bool {
        self.brand.trim().eq_ignore_ascii_case(brand.trim())
    }
}

/// Deals active at `now`, soonest-ending first.
#[must_use]
pub fn active_deals(deals: &[Deal], now: DateTime<Utc>) -> Vec<&Deal> {
    let mut active: Vec<&Deal> = deals.iter().filter(|deal| deal.is_active(now)).collect();
    active.sort_by_key(|deal| deal.ends_at);
    active
}

/// The largest discount percent any active deal gives `brand`.
#[must_use]
pub fn best_discount(deals: &[Deal], brand: &str, now: DateTime<Utc>) -> Option<Decimal> {
    deals
        .iter()
        .filter(|deal| deal.is_active(now) && deal.applies_to(brand))
        .map(|deal| deal.discount_percent)
        .filter(|percent| *percent > Decimal::ZERO)
        .max()
}

#[cfg(test)]
pub(crate) mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::types::DealId;

    pub(crate) fn deal(brand: &str, percent: i64, starts: DateTime<Utc>, ends: DateTime<Utc>) -> Deal {
        Deal {
            id: DealId::new(format!("{brand}-{percent}")),
            title: format!("{percent}% off {brand}"),
            brand: brand.to_string(),
            discount_percent: Decimal::from(percent),
            starts_at: starts,
            ends_at: ends,
            description: None,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0)
            .single()
            .unwrap_or_default()
    }

    #[test]
    fn test_window_is_inclusive() {
        let d = deal("Michelin", 10, now(), now());
        assert!(d.is_active(now()));
        assert!(!d.is_active(now() + Duration::seconds(1)));
    }

    #[test]
    fn test_best_discount_picks_largest_active_matching() {
        let deals = vec![
            deal("Michelin", 10, now() - Duration::days(1), now() + Duration::days(1)),
            deal("michelin ", 15, now() - Duration::days(1), now() + Duration::days(1)),
            deal("Michelin", 40, now() - Duration::days(10), now() - Duration::days(5)),
            deal("Goodyear", 20, now() - Duration::days(1), now() + Duration::days(1)),
        ];
        assert_eq!(best_discount(&deals, "MICHELIN", now()), Some(Decimal::from(15)));
        assert_eq!(best_discount(&deals, "Pirelli", now()), None);
    }

    #[test]
    fn test_active_deals_sorted_by_end() {
        let deals = vec![
            deal("A", 5, now() - Duration::days(1), now() + Duration::days(9)),
            deal("B", 5, now() - Duration::days(1), now() + Duration::days(2)),
            deal("C", 5, now() + Duration::days(1), now() + Duration::days(3)),
        ];
        let brands: Vec<&str> = active_deals(&deals, now())
            .into_iter()
            .map(|d| d.brand.as_str())
            .collect();
        assert_eq!(brands, ["B", "A"]);
    }
}
