//! Fleet (B2B) pages.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::instrument;

use rimline_core::catalog::FleetNews;

use crate::api::{Page, doc_path};
use crate::components::{PageContext, Pagination};
use crate::error::Result;
use crate::state::AppState;

const NEWS_PER_PAGE: u32 = 9;
const EXCERPT_CHARS: usize = 180;

/// News card display data for templates.
#[derive(Debug, Clone)]
pub struct NewsCard {
    pub href: String,
    pub title: String,
    pub date: Option<String>,
    pub excerpt: String,
    pub image: Option<String>,
}

fn excerpt(body: &str) -> String {
    let first = body.split("\n\n").next().unwrap_or_default().trim();
    if first.chars().count() <= EXCERPT_CHARS {
        return first.to_string();
    }
    let cut: String = first.chars().take(EXCERPT_CHARS).collect();
    // Break on a word boundary
    let cut = cut.rsplit_once(' ').map_or(cut.as_str(), |(head, _)| head);
    format!("{cut}…")
}

impl From<&FleetNews> for NewsCard {
    fn from(news: &FleetNews) -> Self {
        Self {
            href: doc_path("fleet/news", news.id.as_str()),
            title: news.title.clone(),
            date: news.published_at.map(|at| at.format("%B %-d, %Y").to_string()),
            excerpt: excerpt(&news.body),
            image: news.image.clone(),
        }
    }
}

/// Fleet landing page template.
#[derive(Template, WebTemplate)]
#[template(path = "fleet/index.html")]
pub struct FleetTemplate {
    pub ctx: PageContext,
    pub news: Vec<NewsCard>,
    pub pagination: Pagination,
    pub load_error: Option<String>,
}

/// Fleet article template.
#[derive(Template, WebTemplate)]
#[template(path = "fleet/news.html")]
pub struct NewsTemplate {
    pub ctx: PageContext,
    pub title: String,
    pub date: Option<String>,
    pub image: Option<String>,
    pub paragraphs: Vec<String>,
}

/// Fleet listing query.
#[derive(Debug, Deserialize)]
pub struct FleetQuery {
    pub page: Option<u32>,
}

/// Display the fleet landing page with news.
#[instrument(skip(state, ctx))]
pub async fn index(
    State(state): State<AppState>,
    ctx: PageContext,
    Query(query): Query<FleetQuery>,
) -> impl IntoResponse {
    let mut load_error = None;
    let page = state
        .api()
        .list::<FleetNews>(
            "/fleet-news",
            &[
                ("page", query.page.unwrap_or(1).max(1).to_string()),
                ("limit", NEWS_PER_PAGE.to_string()),
                ("sort", "-published_at".to_string()),
            ],
            None,
        )
        .await
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to load fleet news");
            load_error = Some(e.user_message());
            Page::empty()
        });

    FleetTemplate {
        ctx,
        news: page.items.iter().map(NewsCard::from).collect(),
        pagination: Pagination::new("/fleet", &page, &[]),
        load_error,
    }
}

/// Display a fleet news article.
#[instrument(skip(state, ctx))]
pub async fn show(
    State(state): State<AppState>,
    ctx: PageContext,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let news: FleetNews = state
        .api()
        .get(&doc_path("fleet-news", &id), &[], None)
        .await?;

    Ok(NewsTemplate {
        ctx,
        date: news.published_at.map(|at| at.format("%B %-d, %Y").to_string()),
        paragraphs: news
            .body
            .split("\n\n")
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(String::from)
            .collect(),
        title: news.title,
        image: news.image,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excerpt_takes_first_paragraph() {
        assert_eq!(excerpt("Short intro.\n\nMore text."), "Short intro.");
    }

    #[test]
    fn test_excerpt_cuts_on_word_boundary() {
        let body = "word ".repeat(60);
        let cut = excerpt(&body);
        assert!(cut.ends_with("word…"));
        assert!(cut.chars().count() <= EXCERPT_CHARS + 1);
    }
}
