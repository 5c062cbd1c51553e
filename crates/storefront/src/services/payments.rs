//! Hosted checkout sessions.
//!
//! The API creates the provider session and returns its URL. The storefront
//! only redirects there when the URL is `https` and its host is one of the
//! configured payment hosts, so a compromised or misconfigured API cannot
//! bounce shoppers to an arbitrary site.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;
use url::Url;

use rimline_core::types::{OrderId, PaymentProvider};

use crate::api::{ApiClient, ApiError};

/// Errors from starting a payment.
#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("checkout URL is not a valid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("checkout URL must use https, got {0}")]
    InsecureScheme(String),

    #[error("checkout host {0} is not an allowed payment host")]
    HostNotAllowed(String),
}

/// Body of `POST /payments/checkout`.
#[derive(Debug, Serialize)]
struct CheckoutRequest<'a> {
    order_id: &'a OrderId,
    provider: PaymentProvider,
    success_url: String,
    cancel_url: String,
}

/// Hosted checkout session returned by the API.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    #[serde(alias = "redirect_url", alias = "checkout_url")]
    pub url: String,
}

/// Return pages handed to the provider.
#[derive(Debug, Clone)]
pub struct ReturnUrls {
    pub success: String,
    pub cancel: String,
}

/// Ask the API for a hosted checkout session and validate where it points.
///
/// # Errors
///
/// Returns an error if the API call fails or the URL is not allowed.
#[instrument(skip(api, token, return_urls, allowed_hosts), fields(order_id = %order_id))]
pub async fn start_checkout(
    api: &ApiClient,
    token: Option<&SecretString>,
    order_id: &OrderId,
    provider: PaymentProvider,
    return_urls: ReturnUrls,
    allowed_hosts: &[String],
) -> Result<Url, PaymentError> {
    let request = CheckoutRequest {
        order_id,
        provider,
        success_url: return_urls.success,
        cancel_url: return_urls.cancel,
    };
    let session: CheckoutSession = api.post("/payments/checkout", &request, token).await?;
    let url = validate_redirect(&session.url, allowed_hosts)?;
    tracing::info!(host = url.host_str().unwrap_or_default(), "Checkout session created");
    Ok(url)
}

/// Accept `raw` only if it is an `https` URL on one of `allowed_hosts`.
///
/// Host comparison is exact and case-insensitive; subdomains must be listed.
///
/// # Errors
///
/// Returns an error naming why the URL was refused.
pub fn validate_redirect(raw: &str, allowed_hosts: &[String]) -> Result<Url, PaymentError> {
    let url = Url::parse(raw)?;
    if url.scheme() != "https" {
        return Err(PaymentError::InsecureScheme(url.scheme().to_string()));
    }
    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
    if !allowed_hosts
        .iter()
        .any(|allowed| allowed.eq_ignore_ascii_case(&host))
    {
        return Err(PaymentError::HostNotAllowed(host));
    }
    Ok(url)
}
