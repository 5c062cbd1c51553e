//! Vehicle and size selectors.
//!
//! The home page walks make, model, trim. Each step loads the next
//! `<option>` list as a fragment; the final choice lands on the tire listing.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tower_sessions::Session;
use tracing::instrument;

use rimline_core::catalog::{Model, Trim};
use rimline_core::types::TireSizeSpec;
use rimline_core::types::reference::Document;

use super::flash_redirect;
use super::products::trim_sizes;
use crate::components::OptionView;
use crate::error::Result;
use crate::models::FlashKind;
use crate::state::AppState;

/// `<option>` list fragment template.
#[derive(Template, WebTemplate)]
#[template(path = "partials/options.html")]
pub struct OptionsTemplate {
    pub placeholder: &'static str,
    pub options: Vec<OptionView>,
}

/// Parent selection of a selector step.
#[derive(Debug, Deserialize)]
pub struct ParentQuery {
    #[serde(default)]
    pub make: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub trim: String,
}

/// Size search query.
#[derive(Debug, Deserialize)]
pub struct SizeQuery {
    #[serde(default)]
    pub size: String,
}

/// Options from the documents of `path` whose `field` is `parent`.
async fn child_options<T: DeserializeOwned + Document>(
    state: &AppState,
    path: &str,
    field: &str,
    parent: &str,
) -> Vec<OptionView> {
    if parent.is_empty() {
        return Vec::new();
    }
    match state
        .api()
        .list::<T>(path, &[(field, parent.to_string()), ("limit", "200".to_string())], None)
        .await
    {
        Ok(page) => page
            .items
            .iter()
            .map(|doc| OptionView {
                value: doc.document_id().to_string(),
                label: doc.label(),
                selected: false,
            })
            .collect(),
        Err(e) => {
            tracing::warn!(error = %e, path = %path, "Failed to load selector options");
            Vec::new()
        }
    }
}

/// Models of a make.
#[instrument(skip(state))]
pub async fn models(State(state): State<AppState>, Query(query): Query<ParentQuery>) -> impl IntoResponse {
    OptionsTemplate {
        placeholder: "Model",
        options: child_options::<Model>(&state, "/models", "make", &query.make).await,
    }
}

/// Trims of a model.
#[instrument(skip(state))]
pub async fn trims(State(state): State<AppState>, Query(query): Query<ParentQuery>) -> impl IntoResponse {
    OptionsTemplate {
        placeholder: "Trim",
        options: child_options::<Trim>(&state, "/trims", "model", &query.model).await,
    }
}

/// Tire sizes of a trim. Option values are the size text.
#[instrument(skip(state))]
pub async fn sizes(State(state): State<AppState>, Query(query): Query<ParentQuery>) -> impl IntoResponse {
    let options = if query.trim.is_empty() {
        Vec::new()
    } else {
        trim_sizes(&state, &query.trim)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Failed to load trim sizes");
                Vec::new()
            })
            .into_iter()
            .map(|tyre_size| OptionView {
                value: tyre_size.size.clone(),
                label: tyre_size.size,
                selected: false,
            })
            .collect()
    };
    OptionsTemplate {
        placeholder: "Size",
        options,
    }
}

/// Send a chosen vehicle to the tires that fit it.
#[instrument(skip(state, session))]
pub async fn search_vehicle(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<ParentQuery>,
) -> Result<Response> {
    let trim = query.trim.trim();
    if trim.is_empty() {
        return flash_redirect(&session, FlashKind::Error, "Choose your vehicle's trim first.", "/").await;
    }

    if trim_sizes(&state, trim).await?.is_empty() {
        return flash_redirect(
            &session,
            FlashKind::Info,
            "We have no tire sizes on file for that vehicle yet. Try searching by size.",
            "/",
        )
        .await;
    }

    Ok(Redirect::to(&format!("/tires?trim={}", urlencoding::encode(trim))).into_response())
}

/// Parse a typed tire size and show matching tires.
#[instrument(skip(session))]
pub async fn search_size(session: Session, Query(query): Query<SizeQuery>) -> Result<Response> {
    match query.size.parse::<TireSizeSpec>() {
        Ok(spec) => Ok(Redirect::to(&format!(
            "/tires?size={}",
            urlencoding::encode(&spec.search_key())
        ))
        .into_response()),
        Err(e) => {
            flash_redirect(
                &session,
                FlashKind::Error,
                format!("\"{}\" is not a tire size we recognise: {e}.", query.size.trim()),
                "/",
            )
            .await
        }
    }
}
