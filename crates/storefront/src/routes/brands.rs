//! Brand index, built from the tire and wheel catalogs.

use std::collections::BTreeMap;

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use chrono::{DateTime, Utc};
use tracing::instrument;

use rimline_core::catalog::{Deal, Tire, Wheel};
use rimline_core::deals::best_discount;

use super::deals::{fetch_deals, percent_off};
use crate::components::PageContext;
use crate::state::AppState;

/// Products scanned per catalog when collecting brands.
const SCAN_LIMIT: &str = "500";

/// Brand display data for templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrandView {
    pub name: String,
    pub tire_count: u32,
    pub wheel_count: u32,
    pub tires_href: String,
    pub wheels_href: String,
    pub deal: Option<String>,
}

fn brand_entry<'m>(
    brands: &'m mut BTreeMap<String, BrandView>,
    name: &str,
    deals: &[Deal],
    now: DateTime<Utc>,
) -> &'m mut BrandView {
    let name = name.trim();
    brands.entry(name.to_lowercase()).or_insert_with(|| BrandView {
        name: name.to_string(),
        tire_count: 0,
        wheel_count: 0,
        tires_href: format!("/tires?brand={}", urlencoding::encode(name)),
        wheels_href: format!("/wheels?brand={}", urlencoding::encode(name)),
        deal: best_discount(deals, name, now).map(percent_off),
    })
}

/// Group brand names case-insensitively, keeping the first spelling seen.
#[must_use]
pub fn collect_brands<'a>(
    tire_brands: impl IntoIterator<Item = &'a str>,
    wheel_brands: impl IntoIterator<Item = &'a str>,
    deals: &[Deal],
    now: DateTime<Utc>,
) -> Vec<BrandView> {
    let mut brands = BTreeMap::new();
    for name in tire_brands.into_iter().filter(|n| !n.trim().is_empty()) {
        brand_entry(&mut brands, name, deals, now).tire_count += 1;
    }
    for name in wheel_brands.into_iter().filter(|n| !n.trim().is_empty()) {
        brand_entry(&mut brands, name, deals, now).wheel_count += 1;
    }
    brands.into_values().collect()
}

/// Brand index template.
#[derive(Template, WebTemplate)]
#[template(path = "brands.html")]
pub struct BrandsTemplate {
    pub ctx: PageContext,
    pub brands: Vec<BrandView>,
    pub load_error: Option<String>,
}

/// Display every brand carried.
#[instrument(skip(state, ctx))]
pub async fn index(State(state): State<AppState>, ctx: PageContext) -> impl IntoResponse {
    let query = [("limit", SCAN_LIMIT.to_string())];
    let (deals, tires, wheels) = tokio::join!(
        fetch_deals(&state),
        state.api().list::<Tire>("/tires", &query, None),
        state.api().list::<Wheel>("/wheels", &query, None),
    );

    let mut load_error = None;
    let tires = tires.map(|page| page.items).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to load tires for brands");
        load_error = Some(e.user_message());
        Vec::new()
    });
    let wheels = wheels.map(|page| page.items).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to load wheels for brands");
        load_error = Some(e.user_message());
        Vec::new()
    });

    BrandsTemplate {
        ctx,
        brands: collect_brands(
            tires.iter().map(|tire| tire.brand.as_str()),
            wheels.iter().map(|wheel| wheel.brand.as_str()),
            &deals,
            Utc::now(),
        ),
        load_error,
    }
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_brands_merges_case() {
        let brands = collect_brands(
            ["Michelin", "michelin", "BFGoodrich", " "],
            ["Enkei", "MICHELIN"],
            &[],
            Utc::now(),
        );
        let names: Vec<&str> = brands.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, ["BFGoodrich", "Enkei", "Michelin"]);
        assert_eq!(brands[2].tire_count, 2);
        assert_eq!(brands[2].wheel_count, 1);
        assert_eq!(brands[0].tires_href, "/tires?brand=BFGoodrich");
    }
}
