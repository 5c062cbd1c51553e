//! Deal route handlers and the deal lookup shared by priced pages.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use chrono::Utc;
use tracing::instrument;

use rimline_core::catalog::Deal;
use rimline_core::deals::active_deals;

use crate::components::PageContext;
use crate::state::AppState;

/// Most deals that can run at once.
const DEAL_LIMIT: &str = "100";

/// Every deal the API knows about.
///
/// Pricing still works without deals, so failures are logged and yield none.
pub(crate) async fn fetch_deals(state: &AppState) -> Vec<Deal> {
    match state
        .api()
        .list::<Deal>("/deals", &[("limit", DEAL_LIMIT.to_string())], None)
        .await
    {
        Ok(page) => page.items,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load deals, pricing without them");
            Vec::new()
        }
    }
}

/// Label such as "15% off".
#[must_use]
pub fn percent_off(percent: rust_decimal::Decimal) -> String {
    format!("{}% off", percent.normalize())
}

/// Deal display data for templates.
#[derive(Debug, Clone)]
pub struct DealView {
    pub title: String,
    pub brand: String,
    pub discount: String,
    pub ends: String,
    pub description: Option<String>,
    pub shop_href: String,
}

impl From<&Deal> for DealView {
    fn from(deal: &Deal) -> Self {
        Self {
            title: deal.title.clone(),
            brand: deal.brand.clone(),
            discount: percent_off(deal.discount_percent),
            ends: deal.ends_at.format("%b %-d, %Y").to_string(),
            description: deal.description.clone(),
            shop_href: format!("/tires?brand={}", urlencoding::encode(&deal.brand)),
        }
    }
}

/// Deals page template.
#[derive(Template, WebTemplate)]
#[template(path = "deals.html")]
pub struct DealsTemplate {
    pub ctx: PageContext,
    pub deals: Vec<DealView>,
}

/// Display the deals running now.
#[instrument(skip(state, ctx))]
pub async fn index(State(state): State<AppState>, ctx: PageContext) -> impl IntoResponse {
    let deals = fetch_deals(&state).await;
    let deals = active_deals(&deals, Utc::now())
        .into_iter()
        .map(DealView::from)
        .collect();

    DealsTemplate { ctx, deals }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn test_percent_off() {
        assert_eq!(percent_off(Decimal::new(1500, 2)), "15% off");
        assert_eq!(percent_off(Decimal::new(125, 1)), "12.5% off");
    }
}
