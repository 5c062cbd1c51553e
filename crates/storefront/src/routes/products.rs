//! Tire and wheel route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::instrument;

use rimline_core::catalog::{
    Deal, DrivingType, Service, Tire, TyreSize, Wheel, has_bare_addons, resolve_addons,
};
use rimline_core::deals::best_discount;
use rimline_core::pricing::MAX_LINE_QUANTITY;
use rimline_core::types::reference::Document;
use rimline_core::types::{Money, Ref, TireSizeSpec};

use super::deals::{fetch_deals, percent_off};
use crate::api::{Page, doc_path};
use crate::components::{OptionView, PageContext, Pagination};
use crate::error::Result;
use crate::state::AppState;

/// Products per listing page.
pub const PER_PAGE: u32 = 24;

const SERVICE_LIMIT: u32 = 200;

/// Listing sort choices: query value, label.
const SORT_OPTIONS: &[(&str, &str)] = &[
    ("", "Featured"),
    ("price_asc", "Price: low to high"),
    ("price_desc", "Price: high to low"),
    ("name", "Name"),
];

/// API `sort` parameter for a listing sort choice.
fn api_sort(sort: &str) -> &'static str {
    match sort {
        "price_asc" => "price",
        "price_desc" => "-price",
        "name" => "name",
        _ => "",
    }
}

fn sort_options(current: &str) -> Vec<OptionView> {
    SORT_OPTIONS
        .iter()
        .map(|(value, label)| OptionView {
            value: (*value).to_string(),
            label: (*label).to_string(),
            selected: *value == current,
        })
        .collect()
}

// =============================================================================
// Views
// =============================================================================

/// Product card display data for templates.
#[derive(Debug, Clone)]
pub struct ProductCard {
    pub href: String,
    pub name: String,
    pub brand: String,
    pub detail: String,
    pub price: String,
    pub set_price: Option<String>,
    pub deal: Option<String>,
    pub image: Option<String>,
    pub in_stock: bool,
}

impl ProductCard {
    /// Card for a tire.
    #[must_use]
    pub fn tire(tire: &Tire, deals: &[Deal], now: DateTime<Utc>) -> Self {
        let detail = match &tire.season {
            Some(season) => format!("{} · {season}", tire.size),
            None => tire.size.clone(),
        };
        Self {
            href: doc_path("tires", tire.id.as_str()),
            name: tire.name.clone(),
            brand: tire.brand.clone(),
            detail,
            price: tire.price.to_string(),
            set_price: tire.set_price.map(|p| p.to_string()),
            deal: best_discount(deals, &tire.brand, now).map(percent_off),
            image: tire.images.first().cloned(),
            in_stock: tire.stock > 0,
        }
    }

    /// Card for a wheel.
    #[must_use]
    pub fn wheel(wheel: &Wheel, deals: &[Deal], now: DateTime<Utc>) -> Self {
        let mut detail = format!("{}\" x {}\"", wheel.diameter, wheel.width.normalize());
        if let Some(finish) = &wheel.finish {
            detail.push_str(" · ");
            detail.push_str(finish);
        }
        Self {
            href: doc_path("wheels", wheel.id.as_str()),
            name: wheel.name.clone(),
            brand: wheel.brand.clone(),
            detail,
            price: wheel.price.to_string(),
            set_price: wheel.set_price.map(|p| p.to_string()),
            deal: best_discount(deals, &wheel.brand, now).map(percent_off),
            image: wheel.images.first().cloned(),
            in_stock: wheel.stock > 0,
        }
    }
}

/// Add-on display data for templates.
#[derive(Debug, Clone)]
pub struct AddonView {
    pub name: String,
    pub price: String,
    pub description: Option<String>,
}

/// Product detail display data for templates.
#[derive(Debug, Clone)]
pub struct ProductDetail {
    /// Cart kind: `tire` or `wheel`.
    pub kind: &'static str,
    pub id: String,
    pub name: String,
    pub brand: String,
    pub price: String,
    pub pair_price: Option<String>,
    pub set_price: Option<String>,
    pub installation: Option<String>,
    pub deal: Option<String>,
    pub stock: u32,
    pub max_quantity: u32,
    pub images: Vec<String>,
    pub description: Option<String>,
    pub specs: Vec<(&'static str, String)>,
    pub addons: Vec<AddonView>,
    pub back_href: &'static str,
    pub back_label: &'static str,
}

/// Service catalog for resolving bare add-on ids.
///
/// Only fetched when `addons` holds a bare id.
pub(crate) async fn addon_catalog(state: &AppState, addons: &[Ref<Service>]) -> Vec<Service> {
    if !has_bare_addons(addons) {
        return Vec::new();
    }
    let query = [("limit", SERVICE_LIMIT.to_string())];
    match state.api().list::<Service>("/services", &query, None).await {
        Ok(page) => page.items,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load services, offering populated add-ons only");
            Vec::new()
        }
    }
}

fn addon_views(addons: &[Ref<Service>], services: &[Service]) -> Vec<AddonView> {
    resolve_addons(addons, services)
        .into_iter()
        .map(|service| AddonView {
            price: format!("{} each", service.price),
            name: service.name,
            description: service.description,
        })
        .collect()
}

fn each(price: Option<Money>, units: &str) -> Option<String> {
    price.map(|p| format!("{p} for {units}"))
}

impl ProductDetail {
    fn tire(tire: &Tire, services: &[Service], deals: &[Deal], now: DateTime<Utc>) -> Self {
        let mut specs = vec![("Size", tire.size.clone())];
        if let Some(season) = &tire.season {
            specs.push(("Season", season.clone()));
        }
        if let Some(driving_type) = &tire.driving_type {
            specs.push(("Driving type", driving_type.label()));
        }
        if let Some(load_index) = &tire.load_index {
            specs.push(("Load index", load_index.clone()));
        }
        if let Some(speed_rating) = &tire.speed_rating {
            specs.push(("Speed rating", speed_rating.clone()));
        }
        if let Some(make) = &tire.make {
            specs.push(("Fits", make.label()));
        }

        Self {
            kind: "tire",
            id: tire.id.to_string(),
            name: tire.name.clone(),
            brand: tire.brand.clone(),
            price: tire.price.to_string(),
            pair_price: each(tire.pair_price, "2"),
            set_price: each(tire.set_price, "4"),
            installation: tire.installation_fee.map(|fee| format!("{fee} per tire")),
            deal: best_discount(deals, &tire.brand, now).map(percent_off),
            stock: tire.stock,
            max_quantity: tire.stock.min(MAX_LINE_QUANTITY),
            images: tire.images.clone(),
            description: tire.description.clone(),
            specs,
            addons: addon_views(&tire.addons, services),
            back_href: "/tires",
            back_label: "All tires",
        }
    }

    fn wheel(wheel: &Wheel, services: &[Service], deals: &[Deal], now: DateTime<Utc>) -> Self {
        let mut specs = vec![
            ("Diameter", format!("{}\"", wheel.diameter)),
            ("Width", format!("{}\"", wheel.width.normalize())),
        ];
        if let Some(bolt_pattern) = &wheel.bolt_pattern {
            specs.push(("Bolt pattern", bolt_pattern.clone()));
        }
        if let Some(finish) = &wheel.finish {
            specs.push(("Finish", finish.clone()));
        }

        Self {
            kind: "wheel",
            id: wheel.id.to_string(),
            name: wheel.name.clone(),
            brand: wheel.brand.clone(),
            price: wheel.price.to_string(),
            pair_price: each(wheel.pair_price, "2"),
            set_price: each(wheel.set_price, "4"),
            installation: wheel.installation_fee.map(|fee| format!("{fee} per wheel")),
            deal: best_discount(deals, &wheel.brand, now).map(percent_off),
            stock: wheel.stock,
            max_quantity: wheel.stock.min(MAX_LINE_QUANTITY),
            images: wheel.images.clone(),
            description: wheel.description.clone(),
            specs,
            addons: addon_views(&wheel.addons, services),
            back_href: "/wheels",
            back_label: "All wheels",
        }
    }
}

/// Link to one of the sizes fitting the selected trim.
#[derive(Debug, Clone)]
pub struct SizeChip {
    pub label: String,
    pub href: String,
    pub active: bool,
}

// =============================================================================
// Queries
// =============================================================================

/// Tire listing query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct TireFilters {
    pub page: Option<u32>,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub trim: String,
    #[serde(default)]
    pub driving_type: String,
    #[serde(default)]
    pub sort: String,
}

impl TireFilters {
    /// The size filter in its canonical form when it parses.
    fn normalized_size(&self) -> String {
        self.size
            .parse::<TireSizeSpec>()
            .map_or_else(|_| self.size.trim().to_string(), |spec| spec.search_key())
    }
}

/// Wheel listing query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct WheelFilters {
    pub page: Option<u32>,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub diameter: String,
    #[serde(default)]
    pub sort: String,
}

/// Wheel diameters offered in the filter.
const DIAMETERS: [u16; 9] = [15, 16, 17, 18, 19, 20, 21, 22, 24];

// =============================================================================
// Templates
// =============================================================================

/// Tire listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/tires.html")]
pub struct TiresTemplate {
    pub ctx: PageContext,
    pub cards: Vec<ProductCard>,
    pub pagination: Pagination,
    pub brand: String,
    pub size: String,
    pub trim: String,
    pub sort_options: Vec<OptionView>,
    pub driving_types: Vec<OptionView>,
    pub size_chips: Vec<SizeChip>,
    pub load_error: Option<String>,
}

/// Wheel listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/wheels.html")]
pub struct WheelsTemplate {
    pub ctx: PageContext,
    pub cards: Vec<ProductCard>,
    pub pagination: Pagination,
    pub brand: String,
    pub sort_options: Vec<OptionView>,
    pub diameters: Vec<OptionView>,
    pub load_error: Option<String>,
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductTemplate {
    pub ctx: PageContext,
    pub product: ProductDetail,
}

// =============================================================================
// Handlers
// =============================================================================

async fn driving_type_options(state: &AppState, current: &str) -> Vec<OptionView> {
    let page = state
        .api()
        .list::<DrivingType>("/driving-types", &[("limit", "100".to_string())], None)
        .await
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to load driving types");
            Page::empty()
        });
    page.items
        .iter()
        .map(|driving_type| OptionView {
            value: driving_type.id.to_string(),
            label: driving_type.label(),
            selected: driving_type.id.as_str() == current,
        })
        .collect()
}

/// Sizes recorded for a trim.
pub(crate) async fn trim_sizes(state: &AppState, trim: &str) -> Result<Vec<TyreSize>> {
    let page = state
        .api()
        .list::<TyreSize>(
            "/tyre-sizes",
            &[("trim", trim.to_string()), ("limit", "100".to_string())],
            None,
        )
        .await?;
    Ok(page.items)
}

/// Display the tire listing.
///
/// With a `trim` and no explicit `size`, the listing covers every size
/// recorded for the trim, sent to the API as a comma separated list.
#[instrument(skip(state, ctx))]
pub async fn tires(
    State(state): State<AppState>,
    ctx: PageContext,
    Query(filters): Query<TireFilters>,
) -> impl IntoResponse {
    let now = Utc::now();
    let size = filters.normalized_size();
    let page_number = filters.page.unwrap_or(1).max(1);

    let mut load_error = None;
    let trim_sizes = if filters.trim.is_empty() {
        Vec::new()
    } else {
        trim_sizes(&state, &filters.trim).await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, trim = %filters.trim, "Failed to load trim sizes");
            Vec::new()
        })
    };
    let size_chips = trim_sizes
        .iter()
        .map(|tyre_size| SizeChip {
            label: tyre_size.size.clone(),
            href: format!(
                "/tires?trim={}&size={}",
                urlencoding::encode(&filters.trim),
                urlencoding::encode(&tyre_size.size)
            ),
            active: tyre_size.size.eq_ignore_ascii_case(&size),
        })
        .collect();
    let size_param = if size.is_empty() {
        trim_sizes
            .iter()
            .map(|tyre_size| tyre_size.size.as_str())
            .collect::<Vec<_>>()
            .join(",")
    } else {
        size.clone()
    };

    let query = [
        ("page", page_number.to_string()),
        ("limit", PER_PAGE.to_string()),
        ("brand", filters.brand.trim().to_string()),
        ("size", size_param),
        ("driving_type", filters.driving_type.clone()),
        ("sort", api_sort(&filters.sort).to_string()),
    ];
    let (deals, listing) = tokio::join!(
        fetch_deals(&state),
        state.api().list::<Tire>("/tires", &query, None)
    );
    let listing = listing.unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to load tires");
        load_error = Some(e.user_message());
        Page::empty()
    });

    let pagination = Pagination::new(
        "/tires",
        &listing,
        &[
            ("brand", filters.brand.as_str()),
            ("size", size.as_str()),
            ("trim", filters.trim.as_str()),
            ("driving_type", filters.driving_type.as_str()),
            ("sort", filters.sort.as_str()),
        ],
    );

    TiresTemplate {
        ctx,
        cards: listing
            .items
            .iter()
            .map(|tire| ProductCard::tire(tire, &deals, now))
            .collect(),
        pagination,
        brand: filters.brand.clone(),
        size,
        trim: filters.trim.clone(),
        sort_options: sort_options(&filters.sort),
        driving_types: driving_type_options(&state, &filters.driving_type).await,
        size_chips,
        load_error,
    }
}

/// Display a tire.
#[instrument(skip(state, ctx))]
pub async fn tire(
    State(state): State<AppState>,
    ctx: PageContext,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let path = doc_path("tires", &id);
    let (deals, tire) = tokio::join!(
        fetch_deals(&state),
        state.api().get::<Tire>(&path, &[], None)
    );
    let tire = tire?;
    let services = addon_catalog(&state, &tire.addons).await;
    Ok(ProductTemplate {
        ctx,
        product: ProductDetail::tire(&tire, &services, &deals, Utc::now()),
    })
}

/// Display the wheel listing.
#[instrument(skip(state, ctx))]
pub async fn wheels(
    State(state): State<AppState>,
    ctx: PageContext,
    Query(filters): Query<WheelFilters>,
) -> impl IntoResponse {
    let now = Utc::now();
    let page_number = filters.page.unwrap_or(1).max(1);
    let diameter = filters
        .diameter
        .trim()
        .parse::<u16>()
        .map(|d| d.to_string())
        .unwrap_or_default();

    let query = [
        ("page", page_number.to_string()),
        ("limit", PER_PAGE.to_string()),
        ("brand", filters.brand.trim().to_string()),
        ("diameter", diameter.clone()),
        ("sort", api_sort(&filters.sort).to_string()),
    ];
    let (deals, listing) = tokio::join!(
        fetch_deals(&state),
        state.api().list::<Wheel>("/wheels", &query, None)
    );
    let mut load_error = None;
    let listing = listing.unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to load wheels");
        load_error = Some(e.user_message());
        Page::empty()
    });

    let pagination = Pagination::new(
        "/wheels",
        &listing,
        &[
            ("brand", filters.brand.as_str()),
            ("diameter", diameter.as_str()),
            ("sort", filters.sort.as_str()),
        ],
    );

    WheelsTemplate {
        ctx,
        cards: listing
            .items
            .iter()
            .map(|wheel| ProductCard::wheel(wheel, &deals, now))
            .collect(),
        pagination,
        brand: filters.brand.clone(),
        sort_options: sort_options(&filters.sort),
        diameters: DIAMETERS
            .iter()
            .map(|d| OptionView {
                value: d.to_string(),
                label: format!("{d}\""),
                selected: d.to_string() == diameter,
            })
            .collect(),
        load_error,
    }
}

/// Display a wheel.
#[instrument(skip(state, ctx))]
pub async fn wheel(
    State(state): State<AppState>,
    ctx: PageContext,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let path = doc_path("wheels", &id);
    let (deals, wheel) = tokio::join!(
        fetch_deals(&state),
        state.api().get::<Wheel>(&path, &[], None)
    );
    let wheel = wheel?;
    let services = addon_catalog(&state, &wheel.addons).await;
    Ok(ProductTemplate {
        ctx,
        product: ProductDetail::wheel(&wheel, &services, &deals, Utc::now()),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::Duration;
    use rust_decimal::Decimal;

    use super::*;

    fn tire_json() -> serde_json::Value {
        serde_json::json!({
            "_id": "t1",
            "name": "Pilot Sport 4S",
            "brand": "Michelin",
            "size": "245/40ZR18",
            "season": "Summer",
            "price": 275,
            "set_price": "999.00",
            "stock": 3,
            "installation_fee": 25,
            "driving_type": {"_id": "d1", "name": "Performance"},
            "addons": [{"_id": "s1", "name": "TPMS Rebuild", "price": 9.99}, "s2"],
            "images": ["https://cdn.example.com/ps4s.jpg"],
        })
    }

    #[test]
    fn test_tire_card_and_detail() {
        let tire: Tire = serde_json::from_value(tire_json()).unwrap();
        let now = Utc::now();
        let deal = Deal {
            id: "d1".to_string().into(),
            title: "Spring".to_string(),
            brand: "michelin".to_string(),
            discount_percent: Decimal::new(10, 0),
            starts_at: now - Duration::days(1),
            ends_at: now + Duration::days(1),
            description: None,
        };

        let card = ProductCard::tire(&tire, std::slice::from_ref(&deal), now);
        assert_eq!(card.href, "/tires/t1");
        assert_eq!(card.detail, "245/40ZR18 · Summer");
        assert_eq!(card.price, "$275.00");
        assert_eq!(card.set_price.as_deref(), Some("$999.00"));
        assert_eq!(card.deal.as_deref(), Some("10% off"));

        let services = vec![Service {
            id: "s2".to_string().into(),
            name: "Road hazard".to_string(),
            description: None,
            price: Money::from_cents(1_500),
        }];
        let detail = ProductDetail::tire(&tire, &services, &[], now);
        assert_eq!(detail.max_quantity, 3);
        assert_eq!(detail.set_price.as_deref(), Some("$999.00 for 4"));
        assert_eq!(detail.installation.as_deref(), Some("$25.00 per tire"));
        assert_eq!(detail.addons.len(), 2);
        assert_eq!(detail.addons[1].name, "Road hazard");
        assert_eq!(detail.addons[1].price, "$15.00 each");

        // Unknown bare ids are not offered
        let detail = ProductDetail::tire(&tire, &[], &[], now);
        assert_eq!(detail.addons.len(), 1);
        assert!(detail.specs.contains(&("Driving type", "Performance".to_string())));
        assert!(detail.deal.is_none());
    }

    #[test]
    fn test_size_filter_is_normalized() {
        let filters = TireFilters {
            size: "p225 45 17".to_string(),
            ..TireFilters::default()
        };
        assert_eq!(filters.normalized_size(), "225/45R17");

        let filters = TireFilters {
            size: "not-a-size".to_string(),
            ..TireFilters::default()
        };
        assert_eq!(filters.normalized_size(), "not-a-size");
    }

    #[test]
    fn test_sort_mapping() {
        assert_eq!(api_sort("price_desc"), "-price");
        assert_eq!(api_sort("bogus"), "");
        assert!(sort_options("name").iter().any(|o| o.selected && o.value == "name"));
    }
}
