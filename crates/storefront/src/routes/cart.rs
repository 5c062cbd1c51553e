//! Cart route handlers.
//!
//! The cart lives in the session. Every mutation is a form post that
//! redirects back to the cart page with a toast, so the page always shows
//! totals recomputed from the current selections.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use rimline_core::cart::{Cart, CartError, CartTotals};
use rimline_core::catalog::{Deal, ProductSummary, Tire, Wheel};
use rimline_core::types::{ProductKind, ServiceId};

use super::deals::fetch_deals;
use super::flash_redirect;
use super::products::addon_catalog;
use crate::api::{ApiError, doc_path};
use crate::components::PageContext;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::models::FlashKind;
use crate::models::session::{load_cart, save_cart};
use crate::state::AppState;

// =============================================================================
// Views
// =============================================================================

/// Add-on checkbox display data for templates.
#[derive(Debug, Clone)]
pub struct CartAddonView {
    pub service_id: String,
    pub name: String,
    pub price: String,
    pub selected: bool,
}

/// Cart line display data for templates.
#[derive(Debug, Clone)]
pub struct CartLineView {
    pub line_id: String,
    pub href: String,
    pub name: String,
    pub image: Option<String>,
    pub quantity: u32,
    pub max_quantity: u32,
    pub unit_price: String,
    pub bundle: String,
    pub merchandise: String,
    pub installation_fee: Option<String>,
    pub installation_selected: bool,
    pub addons: Vec<CartAddonView>,
    pub services: String,
    pub discount: Option<String>,
    pub total: String,
}

/// Cart totals display data for templates.
#[derive(Debug, Clone)]
pub struct CartView {
    pub lines: Vec<CartLineView>,
    pub merchandise: String,
    pub installation: String,
    pub addons: String,
    pub discount: Option<String>,
    pub total: String,
    pub item_count: u32,
}

impl CartView {
    /// Price the cart for display.
    #[must_use]
    pub fn build(cart: &Cart, deals: &[Deal], now: DateTime<Utc>) -> Self {
        let lines = cart
            .priced_lines(deals, now)
            .into_iter()
            .map(|(line, charges)| CartLineView {
                line_id: line.line_id.clone(),
                href: doc_path(line.kind.path_segment(), &line.product_id),
                name: line.name.clone(),
                image: line.image.clone(),
                quantity: line.quantity,
                max_quantity: line.max_quantity(),
                unit_price: line.pricing.unit.to_string(),
                bundle: line.pricing.breakdown(line.quantity).describe(),
                merchandise: charges.merchandise.to_string(),
                installation_fee: line.installation_fee.map(|fee| format!("{fee} each")),
                installation_selected: line.installation_selected,
                addons: line
                    .available_addons
                    .iter()
                    .map(|addon| CartAddonView {
                        service_id: addon.service_id.to_string(),
                        name: addon.name.clone(),
                        price: format!("{} each", addon.price),
                        selected: line.selected_addons.contains(&addon.service_id),
                    })
                    .collect(),
                services: charges.services().to_string(),
                discount: (!charges.discount.is_zero()).then(|| format!("-{}", charges.discount)),
                total: charges.total().to_string(),
            })
            .collect();

        let CartTotals {
            merchandise,
            installation,
            addons,
            discount,
            total,
            item_count,
        } = cart.totals(deals, now);

        Self {
            lines,
            merchandise: merchandise.to_string(),
            installation: installation.to_string(),
            addons: addons.to_string(),
            discount: (!discount.is_zero()).then(|| format!("-{discount}")),
            total: total.to_string(),
            item_count,
        }
    }

    /// True when the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

// =============================================================================
// Forms
// =============================================================================

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    /// `tire` or `wheel`.
    pub kind: String,
    pub product_id: String,
    pub quantity: Option<u32>,
}

/// Update quantity form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub line_id: String,
    pub quantity: u32,
}

/// Remove line form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub line_id: String,
}

/// Installation form data. An unchecked box posts no `selected`.
#[derive(Debug, Deserialize)]
pub struct InstallationForm {
    pub line_id: String,
    #[serde(default)]
    pub selected: Option<String>,
}

/// Add-on toggle form data.
#[derive(Debug, Deserialize)]
pub struct AddonForm {
    pub line_id: String,
    pub service_id: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub ctx: PageContext,
    pub cart: CartView,
}

/// Cart count badge fragment template.
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: u32,
}

// =============================================================================
// Handlers
// =============================================================================

/// Toast for a rejected cart change, back to the cart.
async fn cart_error(session: &Session, err: &CartError) -> Result<Response> {
    tracing::info!(error = %err, "Cart change rejected");
    let message = match err {
        CartError::OutOfStock(name) => format!("{name} is out of stock."),
        CartError::LineNotFound(_) => "That item is no longer in your cart.".to_string(),
        CartError::InstallationUnavailable(name) => {
            format!("Installation is not offered for {name}.")
        }
        CartError::AddonUnavailable { product, .. } => {
            format!("That service is not offered for {product}.")
        }
    };
    flash_redirect(session, FlashKind::Error, message, "/cart").await
}

/// Load the cart, apply `change`, and save it.
async fn mutate_cart<F>(session: &Session, change: F) -> Result<Response>
where
    F: FnOnce(&mut Cart) -> std::result::Result<(), CartError>,
{
    let mut cart = load_cart(session).await?;
    match change(&mut cart) {
        Ok(()) => {
            save_cart(session, &cart).await?;
            Ok(Redirect::to("/cart").into_response())
        }
        Err(e) => cart_error(session, &e).await,
    }
}

/// Display the cart page.
#[instrument(skip(state, session, ctx))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    ctx: PageContext,
) -> Result<impl IntoResponse> {
    let cart = load_cart(&session).await?;
    let deals = if cart.is_empty() {
        Vec::new()
    } else {
        fetch_deals(&state).await
    };

    Ok(CartShowTemplate {
        ctx,
        cart: CartView::build(&cart, &deals, Utc::now()),
    })
}

/// Fetch the current product snapshot for a cart line.
///
/// Reads past the response cache so the cart never prices from a stale copy.
async fn product_summary(state: &AppState, kind: ProductKind, id: &str) -> Result<ProductSummary> {
    let path = doc_path(kind.path_segment(), id);
    Ok(match kind {
        ProductKind::Tire => {
            let tire: Tire = state.api().get_fresh(&path, None).await?;
            let services = addon_catalog(state, &tire.addons).await;
            ProductSummary::tire(&tire, &services)
        }
        ProductKind::Wheel => {
            let wheel: Wheel = state.api().get_fresh(&path, None).await?;
            let services = addon_catalog(state, &wheel.addons).await;
            ProductSummary::wheel(&wheel, &services)
        }
    })
}

/// Re-read every line's product and apply it to the cart.
///
/// Products the API no longer has are dropped. Returns whether the cart
/// changed.
pub(crate) async fn refresh_cart(state: &AppState, cart: &mut Cart) -> Result<bool> {
    let mut products = Vec::with_capacity(cart.lines.len());
    for line in &cart.lines {
        match product_summary(state, line.kind, &line.product_id).await {
            Ok(product) => products.push(product),
            Err(AppError::Api(ApiError::NotFound(_))) => {
                tracing::info!(product_id = %line.product_id, "Cart product withdrawn");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(cart.refresh(&products))
}

/// Add a product to the cart.
///
/// Prices and offered services are read from the API, never from the form.
#[instrument(skip(state, session))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<AddToCartForm>,
) -> Result<Response> {
    let kind: ProductKind = form.kind.parse().map_err(AppError::BadRequest)?;
    let product = product_summary(&state, kind, &form.product_id).await?;

    let mut cart = load_cart(&session).await?;
    let quantity = match cart.add(&product, form.quantity.unwrap_or(1)) {
        Ok(line) => line.quantity,
        Err(e) => {
            return flash_redirect(
                &session,
                FlashKind::Error,
                format!("Sorry, {e}."),
                &doc_path(kind.path_segment(), &form.product_id),
            )
            .await;
        }
    };
    save_cart(&session, &cart).await?;

    add_breadcrumb(
        "cart",
        "Added to cart",
        Some(&[("product_id", form.product_id.as_str()), ("kind", form.kind.as_str())]),
    );
    flash_redirect(
        &session,
        FlashKind::Success,
        format!("{} added to your cart ({quantity} in cart).", product.name),
        "/cart",
    )
    .await
}

/// Set a line's quantity. Zero removes it.
#[instrument(skip(session))]
pub async fn update(session: Session, Form(form): Form<UpdateCartForm>) -> Result<Response> {
    mutate_cart(&session, |cart| cart.set_quantity(&form.line_id, form.quantity)).await
}

/// Remove a line.
#[instrument(skip(session))]
pub async fn remove(session: Session, Form(form): Form<RemoveFromCartForm>) -> Result<Response> {
    mutate_cart(&session, |cart| cart.remove(&form.line_id)).await
}

/// Select or clear installation on a line.
#[instrument(skip(session))]
pub async fn installation(session: Session, Form(form): Form<InstallationForm>) -> Result<Response> {
    let selected = form.selected.is_some_and(|v| v != "false" && v != "0");
    mutate_cart(&session, |cart| cart.set_installation(&form.line_id, selected)).await
}

/// Toggle an add-on service on a line.
#[instrument(skip(session))]
pub async fn addon(session: Session, Form(form): Form<AddonForm>) -> Result<Response> {
    let service_id = ServiceId::new(form.service_id);
    mutate_cart(&session, |cart| {
        cart.toggle_addon(&form.line_id, &service_id).map(|_| ())
    })
    .await
}

/// Cart count badge fragment.
#[instrument(skip(session))]
pub async fn count(session: Session) -> Result<impl IntoResponse> {
    let cart = load_cart(&session).await?;
    Ok(CartCountTemplate {
        count: cart.item_count(),
    })
}
