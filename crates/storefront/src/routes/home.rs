//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use chrono::Utc;
use serde::de::DeserializeOwned;
use tracing::instrument;

use rimline_core::catalog::{FleetNews, Make, Tire};
use rimline_core::deals::active_deals;
use rimline_core::types::reference::Document;

use super::deals::{DealView, fetch_deals};
use super::fleet::NewsCard;
use super::products::ProductCard;
use crate::components::{OptionView, PageContext};
use crate::state::AppState;

const FEATURED_TIRES: &str = "8";
const LATEST_NEWS: &str = "3";

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub ctx: PageContext,
    pub deals: Vec<DealView>,
    pub featured: Vec<ProductCard>,
    pub news: Vec<NewsCard>,
    pub makes: Vec<OptionView>,
}

/// A home page section that shows nothing when its list fails to load.
async fn section<T: DeserializeOwned>(state: &AppState, path: &str, query: &[(&str, String)]) -> Vec<T> {
    match state.api().list::<T>(path, query, None).await {
        Ok(page) => page.items,
        Err(e) => {
            tracing::warn!(error = %e, path = %path, "Home page section unavailable");
            Vec::new()
        }
    }
}

/// Display the home page.
#[instrument(skip(state, ctx))]
pub async fn home(State(state): State<AppState>, ctx: PageContext) -> impl IntoResponse {
    let now = Utc::now();
    let tire_query = [("limit", FEATURED_TIRES.to_string())];
    let news_query = [
        ("limit", LATEST_NEWS.to_string()),
        ("sort", "-published_at".to_string()),
    ];
    let make_query = [("limit", "200".to_string()), ("sort", "make".to_string())];
    let (deals, tires, news, makes) = tokio::join!(
        fetch_deals(&state),
        section::<Tire>(&state, "/tires", &tire_query),
        section::<FleetNews>(&state, "/fleet-news", &news_query),
        section::<Make>(&state, "/makes", &make_query),
    );

    HomeTemplate {
        ctx,
        featured: tires
            .iter()
            .map(|tire| ProductCard::tire(tire, &deals, now))
            .collect(),
        deals: active_deals(&deals, now).into_iter().map(DealView::from).collect(),
        news: news.iter().map(NewsCard::from).collect(),
        makes: makes
            .iter()
            .map(|make| OptionView {
                value: make.document_id().to_string(),
                label: make.label(),
                selected: false,
            })
            .collect(),
    }
}
