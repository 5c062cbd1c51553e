//! Catalog and reference records as the REST API returns them.
//!
//! Records are deliberately tolerant: optional fields default, references
//! accept both populated and bare-id shapes, and unknown fields are ignored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::pricing::PackPricing;
use crate::types::reference::Document;
use crate::types::{
    DealId, DrivingTypeId, FleetNewsId, MakeId, ModelId, Money, ProductKind, Ref, Role, ServiceId,
    TireId, TrimId, TyreSizeId, UserId, WheelId,
};

macro_rules! document {
    ($ty:ty, $label:ident) => {
        impl Document for $ty {
            fn document_id(&self) -> &str {
                self.id.as_str()
            }

            fn label(&self) -> String {
                self.$label.to_string()
            }
        }
    };
}

/// Vehicle manufacturer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Make {
    #[serde(rename = "_id")]
    pub id: MakeId,
    pub make: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
}
document!(Make, make);

/// Vehicle model, belonging to a make.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    #[serde(rename = "_id")]
    pub id: ModelId,
    pub model: String,
    pub make: Ref<Make>,
}
document!(Model, model);

/// Model trim/year, the unit tire fitment is keyed on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trim {
    #[serde(rename = "_id")]
    pub id: TrimId,
    pub trim: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<u16>,
    pub model: Ref<Model>,
}

impl Document for Trim {
    fn document_id(&self) -> &str {
        self.id.as_str()
    }

    fn label(&self) -> String {
        match self.year {
            Some(year) => format!("{year} {}", self.trim),
            None => self.trim.clone(),
        }
    }
}

/// A tire size known to fit a trim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TyreSize {
    #[serde(rename = "_id")]
    pub id: TyreSizeId,
    pub size: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trim: Option<Ref<Trim>>,
}
document!(TyreSize, size);

/// Driving style category (all-season, winter, performance, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrivingType {
    #[serde(rename = "_id")]
    pub id: DrivingTypeId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}
document!(DrivingType, name);

/// Priced add-on service (alignment, TPMS, road hazard, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    #[serde(rename = "_id")]
    pub id: ServiceId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub price: Money,
}
document!(Service, name);

/// Time-bounded percentage discount on a brand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deal {
    #[serde(rename = "_id")]
    pub id: DealId,
    pub title: String,
    pub brand: String,
    pub discount_percent: rust_decimal::Decimal,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}
document!(Deal, title);

/// Fleet (B2B) news article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetNews {
    #[serde(rename = "_id")]
    pub id: FleetNewsId,
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
}
document!(FleetNews, title);

/// Storefront account, as listed in the admin console.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}
document!(User, name);

/// Tire product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tire {
    #[serde(rename = "_id")]
    pub id: TireId,
    pub name: String,
    pub brand: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub make: Option<Ref<Make>>,
    pub size: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driving_type: Option<Ref<DrivingType>>,
    pub price: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pair_price: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_price: Option<Money>,
    #[serde(default)]
    pub stock: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installation_fee: Option<Money>,
    #[serde(default)]
    pub addons: Vec<Ref<Service>>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_index: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed_rating: Option<String>,
}
document!(Tire, name);

/// Wheel product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wheel {
    #[serde(rename = "_id")]
    pub id: WheelId,
    pub name: String,
    pub brand: String,
    pub diameter: u16,
    pub width: rust_decimal::Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bolt_pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish: Option<String>,
    pub price: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pair_price: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_price: Option<Money>,
    #[serde(default)]
    pub stock: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installation_fee: Option<Money>,
    #[serde(default)]
    pub addons: Vec<Ref<Service>>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}
document!(Wheel, name);

/// What the cart needs to know about a tire or wheel.
///
/// Add-ons sent as bare ids are resolved against the service catalog; ids
/// the catalog does not know are not offered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductSummary {
    pub id: String,
    pub kind: ProductKind,
    pub name: String,
    pub brand: String,
    pub image: Option<String>,
    pub stock: u32,
    pub pricing: PackPricing,
    pub installation_fee: Option<Money>,
    pub addons: Vec<Service>,
}

/// Offered add-on services, resolving bare ids against `services`.
#[must_use]
pub fn resolve_addons(addons: &[Ref<Service>], services: &[Service]) -> Vec<Service> {
    addons
        .iter()
        .filter_map(|addon| addon.resolve(services))
        .cloned()
        .collect()
}

/// True when any add-on arrived as a bare id.
#[must_use]
pub fn has_bare_addons(addons: &[Ref<Service>]) -> bool {
    addons.iter().any(|addon| addon.populated().is_none())
}

impl ProductSummary {
    /// Summarize a tire, resolving bare add-on ids against `services`.
    #[must_use]
    pub fn tire(tire: &Tire, services: &[Service]) -> Self {
        Self {
            id: tire.id.to_string(),
            kind: ProductKind::Tire,
            name: format!("{} {} {}", tire.brand, tire.name, tire.size),
            brand: tire.brand.clone(),
            image: tire.images.first().cloned(),
            stock: tire.stock,
            pricing: PackPricing {
                unit: tire.price,
                pair: tire.pair_price,
                set: tire.set_price,
            },
            installation_fee: tire.installation_fee,
            addons: resolve_addons(&tire.addons, services),
        }
    }

    /// Summarize a wheel, resolving bare add-on ids against `services`.
    #[must_use]
    pub fn wheel(wheel: &Wheel, services: &[Service]) -> Self {
        Self {
            id: wheel.id.to_string(),
            kind: ProductKind::Wheel,
            name: format!(
                "{} {} {}x{}",
                wheel.brand, wheel.name, wheel.diameter, wheel.width
            ),
            brand: wheel.brand.clone(),
            image: wheel.images.first().cloned(),
            stock: wheel.stock,
            pricing: PackPricing {
                unit: wheel.price,
                pair: wheel.pair_price,
                set: wheel.set_price,
            },
            installation_fee: wheel.installation_fee,
            addons: resolve_addons(&wheel.addons, services),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    const TIRE_JSON: &str = r#"{
        "_id": "t1",
        "name": "Pilot Sport 4S",
        "brand": "Michelin",
        "make": {"_id": "m1", "make": "Michelin"},
        "size": "245/40ZR18",
        "driving_type": "dt1",
        "price": 289.99,
        "set_price": "1099.96",
        "stock": 12,
        "installation_fee": 25,
        "addons": ["s0", {"_id": "s1", "name": "TPMS reset", "price": 9.5}],
        "images": ["https://cdn.example.com/ps4s.jpg"],
        "createdAt": "2024-01-02T00:00:00Z"
    }"#;

    #[test]
    fn test_tire_decodes_mixed_references() {
        let tire: Tire = serde_json::from_str(TIRE_JSON).unwrap();
        assert_eq!(tire.make.as_ref().map(Ref::label), Some("Michelin".to_string()));
        assert_eq!(tire.driving_type.as_ref().map(Ref::id), Some("dt1"));
        assert_eq!(tire.price, Money::from_cents(28_999));
        assert_eq!(tire.set_price, Some(Money::from_cents(109_996)));
        assert_eq!(tire.pair_price, None);
    }

    #[test]
    fn test_summary_without_catalog_offers_populated_addons() {
        let tire: Tire = serde_json::from_str(TIRE_JSON).unwrap();
        assert!(has_bare_addons(&tire.addons));
        let summary = ProductSummary::tire(&tire, &[]);
        assert_eq!(summary.kind, ProductKind::Tire);
        assert_eq!(summary.name, "Michelin Pilot Sport 4S 245/40ZR18");
        assert_eq!(summary.addons.len(), 1);
        assert_eq!(summary.addons[0].id.as_str(), "s1");
        assert_eq!(summary.image.as_deref(), Some("https://cdn.example.com/ps4s.jpg"));
    }

    #[test]
    fn test_summary_resolves_bare_addon_ids() {
        let tire: Tire = serde_json::from_str(TIRE_JSON).unwrap();
        let services: Vec<Service> = serde_json::from_str(
            r#"[
                {"_id": "s0", "name": "Nitrogen fill", "price": 4},
                {"_id": "s9", "name": "Alignment", "price": 89}
            ]"#,
        )
        .unwrap();

        let summary = ProductSummary::tire(&tire, &services);
        let names: Vec<&str> = summary.addons.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["Nitrogen fill", "TPMS reset"]);
        assert_eq!(summary.addons[0].price, Money::from_cents(400));
    }

    #[test]
    fn test_trim_label_includes_year() {
        let trim: Trim =
            serde_json::from_str(r#"{"_id":"tr1","trim":"SE","year":2021,"model":"md1"}"#).unwrap();
        assert_eq!(trim.label(), "2021 SE");
    }
}
