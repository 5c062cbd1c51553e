//! Checkout route handlers.
//!
//! # Flow
//!
//! 1. `GET /checkout` shows the shipping address and payment provider form
//! 2. `POST /checkout` re-reads every cart product (sending the shopper back
//!    to `/cart` if anything changed), freezes the cart into an order
//!    (`POST /orders`), asks the API for a hosted checkout session, and
//!    303-redirects to it
//! 3. The provider returns the shopper to `/checkout/success` or
//!    `/checkout/cancel`; payment status itself arrives at the API by webhook

use std::collections::HashMap;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use rimline_core::order::{Address, NewOrder, Order};
use rimline_core::types::PaymentProvider;

use super::cart::{CartView, refresh_cart};
use super::deals::fetch_deals;
use super::flash_redirect;
use crate::api::ApiError;
use crate::components::{OptionView, PageContext};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::OptionalUser;
use crate::models::session::{keys, load_cart, save_cart};
use crate::models::{Flash, FlashKind};
use crate::services::payments::{PaymentError, ReturnUrls, start_checkout};
use crate::state::AppState;

const PROVIDERS: [PaymentProvider; 2] = [PaymentProvider::Stripe, PaymentProvider::Paypal];

/// Checkout form data.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckoutForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub line1: String,
    #[serde(default)]
    pub line2: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub provider: String,
}

impl CheckoutForm {
    /// Validate the form into an address and provider.
    ///
    /// # Errors
    ///
    /// Returns a message per invalid field.
    pub fn validate(&self) -> std::result::Result<(Address, PaymentProvider), HashMap<&'static str, String>> {
        let mut errors = HashMap::new();
        for (field, value, label) in [
            ("name", &self.name, "Full name"),
            ("line1", &self.line1, "Address"),
            ("city", &self.city, "City"),
            ("state", &self.state, "State"),
            ("postal_code", &self.postal_code, "Postal code"),
        ] {
            if value.trim().is_empty() {
                errors.insert(field, format!("{label} is required"));
            }
        }
        let provider = self.provider.parse::<PaymentProvider>();
        if provider.is_err() {
            errors.insert("provider", "Choose how you want to pay".to_string());
        }

        match provider {
            Ok(provider) if errors.is_empty() => Ok((
                Address {
                    name: self.name.trim().to_string(),
                    phone: self.phone.trim().to_string(),
                    line1: self.line1.trim().to_string(),
                    line2: Some(self.line2.trim().to_string()).filter(|l| !l.is_empty()),
                    city: self.city.trim().to_string(),
                    state: self.state.trim().to_string(),
                    postal_code: self.postal_code.trim().to_string(),
                },
                provider,
            )),
            _ => Err(errors),
        }
    }
}

/// Checkout page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/form.html")]
pub struct CheckoutTemplate {
    pub ctx: PageContext,
    pub cart: CartView,
    pub form: CheckoutForm,
    pub providers: Vec<OptionView>,
    pub errors: HashMap<&'static str, String>,
}

impl CheckoutTemplate {
    /// Error message of a field, empty when valid.
    #[must_use]
    pub fn error(&self, field: &str) -> &str {
        self.errors.get(field).map_or("", String::as_str)
    }
}

/// Checkout return page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/result.html")]
pub struct CheckoutResultTemplate {
    pub ctx: PageContext,
    pub paid: bool,
    pub order_number: Option<String>,
}

fn provider_options(current: &str) -> Vec<OptionView> {
    PROVIDERS
        .iter()
        .map(|provider| {
            let value = serde_json::to_value(provider)
                .ok()
                .and_then(|v| v.as_str().map(String::from))
                .unwrap_or_default();
            OptionView {
                selected: value == current,
                value,
                label: provider.label().to_string(),
            }
        })
        .collect()
}

async fn render_form(
    state: &AppState,
    session: &Session,
    ctx: PageContext,
    form: CheckoutForm,
    errors: HashMap<&'static str, String>,
) -> Result<Response> {
    let cart = load_cart(session).await?;
    if cart.is_empty() {
        return flash_redirect(session, FlashKind::Info, "Your cart is empty.", "/cart").await;
    }
    let deals = fetch_deals(state).await;
    let providers = provider_options(&form.provider);
    let status = if errors.is_empty() {
        StatusCode::OK
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    };

    Ok((
        status,
        CheckoutTemplate {
            ctx,
            cart: CartView::build(&cart, &deals, Utc::now()),
            form,
            providers,
            errors,
        },
    )
        .into_response())
}

/// Display the checkout form.
#[instrument(skip(state, session, ctx, user))]
pub async fn form(
    State(state): State<AppState>,
    session: Session,
    ctx: PageContext,
    OptionalUser(user): OptionalUser,
) -> Result<Response> {
    let form = CheckoutForm {
        name: user.and_then(|u| u.name).unwrap_or_default(),
        provider: "stripe".to_string(),
        ..CheckoutForm::default()
    };
    render_form(&state, &session, ctx, form, HashMap::new()).await
}

/// Create the order and send the shopper to the payment provider.
#[instrument(skip(state, session, ctx, user, form))]
pub async fn submit(
    State(state): State<AppState>,
    session: Session,
    ctx: PageContext,
    OptionalUser(user): OptionalUser,
    Form(form): Form<CheckoutForm>,
) -> Result<Response> {
    let (address, provider) = match form.validate() {
        Ok(valid) => valid,
        Err(errors) => return render_form(&state, &session, ctx, form, errors).await,
    };

    let mut cart = load_cart(&session).await?;
    if refresh_cart(&state, &mut cart).await? {
        save_cart(&session, &cart).await?;
        return flash_redirect(
            &session,
            FlashKind::Info,
            "Prices or availability in your cart changed. Please review it before paying.",
            "/cart",
        )
        .await;
    }
    let deals = fetch_deals(&state).await;
    let Some(new_order) = NewOrder::from_cart(&cart, &deals, Utc::now(), address, provider) else {
        return flash_redirect(&session, FlashKind::Info, "Your cart is empty.", "/cart").await;
    };

    let token = user.as_ref().map(|u| &u.token);
    let order: Order = match state.api().post("/orders", &new_order, token).await {
        Ok(order) => order,
        Err(e @ (ApiError::Rejected { .. } | ApiError::RateLimited(_))) => {
            return flash_redirect(&session, FlashKind::Error, e.user_message(), "/checkout").await;
        }
        Err(e) => return Err(e.into()),
    };
    session.insert(keys::PENDING_ORDER, &order.order_number).await?;
    add_breadcrumb(
        "checkout",
        "Order created",
        Some(&[("order_number", order.order_number.as_str())]),
    );

    let config = state.config();
    let return_urls = ReturnUrls {
        success: config.absolute_url("/checkout/success"),
        cancel: config.absolute_url("/checkout/cancel"),
    };
    match start_checkout(
        state.api(),
        token,
        &order.id,
        provider,
        return_urls,
        &config.payments.redirect_hosts,
    )
    .await
    {
        Ok(url) => Ok(Redirect::to(url.as_str()).into_response()),
        Err(PaymentError::Api(e @ ApiError::Unauthorized)) => Err(AppError::Api(e)),
        Err(PaymentError::Api(e)) => {
            tracing::warn!(error = %e, order = %order.order_number, "Checkout session refused");
            flash_redirect(&session, FlashKind::Error, e.user_message(), "/checkout").await
        }
        Err(e) => {
            let event_id = sentry::capture_error(&e);
            tracing::error!(error = %e, sentry_event_id = %event_id, "Refusing checkout redirect");
            flash_redirect(
                &session,
                FlashKind::Error,
                "The payment provider is unavailable right now. Your cart has been kept.",
                "/cart",
            )
            .await
        }
    }
}

/// Provider return page after payment. Empties the cart.
#[instrument(skip(session, ctx))]
pub async fn success(session: Session, ctx: PageContext) -> Result<impl IntoResponse> {
    let order_number: Option<String> = session.remove(keys::PENDING_ORDER).await?;
    if order_number.is_some() {
        let mut cart = load_cart(&session).await?;
        cart.clear();
        save_cart(&session, &cart).await?;
    }
    Ok(CheckoutResultTemplate {
        ctx,
        paid: true,
        order_number,
    })
}

/// Provider return page when the shopper backs out. The cart is kept.
#[instrument(skip(session, ctx))]
pub async fn cancel(session: Session, mut ctx: PageContext) -> Result<impl IntoResponse> {
    let order_number: Option<String> = session.get(keys::PENDING_ORDER).await?;
    ctx.flashes.push(Flash {
        kind: FlashKind::Info,
        message: "Payment was cancelled. Your cart is still here.".to_string(),
    });
    Ok(CheckoutResultTemplate {
        ctx,
        paid: false,
        order_number,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn valid_form() -> CheckoutForm {
        CheckoutForm {
            name: " Dana Reyes ".to_string(),
            phone: String::new(),
            line1: "1 Main St".to_string(),
            line2: "  ".to_string(),
            city: "Austin".to_string(),
            state: "TX".to_string(),
            postal_code: "78701".to_string(),
            provider: "paypal".to_string(),
        }
    }

    #[test]
    fn test_validate_ok() {
        let (address, provider) = valid_form().validate().unwrap();
        assert_eq!(address.name, "Dana Reyes");
        assert_eq!(address.line2, None);
        assert_eq!(provider, PaymentProvider::Paypal);
    }

    #[test]
    fn test_validate_reports_each_field() {
        let form = CheckoutForm {
            city: String::new(),
            provider: "cash".to_string(),
            ..valid_form()
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors["city"], "City is required");
        assert!(errors.contains_key("provider"));
    }

    #[test]
    fn test_provider_options() {
        let options = provider_options("paypal");
        assert_eq!(options[0].value, "stripe");
        assert!(options[1].selected);
        assert_eq!(options[1].label, "PayPal");
    }
}
