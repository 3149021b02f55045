//! Payment bridge for donation checkouts
//!
//! Talks to a Stripe-compatible checkout API. The client is built from
//! configuration and injected through application state.

use serde::Deserialize;
use tracing::{error, info};

use crate::error::{ApiError, ApiResult};

/// A named donation level
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct DonationTier {
    pub name: String,
    /// Price in the smallest currency unit
    pub amount: u64,
}

/// Payment configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PaymentConfig {
    /// Processor secret key; checkout is disabled without one
    pub secret_key: Option<String>,
    pub api_base: String,
    pub currency: String,
    /// Origin used for redirect URLs when the request carries none
    pub public_url: String,
    pub tiers: Vec<DonationTier>,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            secret_key: None,
            api_base: "https://api.stripe.com".to_string(),
            currency: "usd".to_string(),
            public_url: "http://localhost:3000".to_string(),
            tiers: vec![
                DonationTier {
                    name: "coffee".to_string(),
                    amount: 300,
                },
                DonationTier {
                    name: "lunch".to_string(),
                    amount: 1000,
                },
                DonationTier {
                    name: "patron".to_string(),
                    amount: 2500,
                },
            ],
        }
    }
}

#[derive(Deserialize)]
struct CheckoutSession {
    id: String,
}

/// Checkout client
#[derive(Clone)]
pub struct PaymentClient {
    http: reqwest::Client,
    config: PaymentConfig,
}

impl PaymentClient {
    pub fn new(config: PaymentConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub fn public_url(&self) -> &str {
        &self.config.public_url
    }

    fn tier(&self, name: &str) -> Option<&DonationTier> {
        self.config.tiers.iter().find(|tier| tier.name == name)
    }

    /// Form fields for a one-item hosted checkout session
    fn checkout_form(&self, tier: &DonationTier, origin_url: &str) -> Vec<(String, String)> {
        let origin = origin_url.trim_end_matches('/');
        vec![
            ("mode".into(), "payment".into()),
            ("payment_method_types[0]".into(), "card".into()),
            (
                "success_url".into(),
                format!("{origin}/success?session_id={{CHECKOUT_SESSION_ID}}"),
            ),
            ("cancel_url".into(), format!("{origin}/")),
            ("line_items[0][quantity]".into(), "1".into()),
            (
                "line_items[0][price_data][currency]".into(),
                self.config.currency.clone(),
            ),
            (
                "line_items[0][price_data][unit_amount]".into(),
                tier.amount.to_string(),
            ),
            (
                "line_items[0][price_data][product_data][name]".into(),
                format!("{} donation", tier.name),
            ),
        ]
    }

    /// Create a checkout session for `tier_name` and return its id
    pub async fn checkout(&self, tier_name: &str, origin_url: &str) -> ApiResult<String> {
        let tier = self
            .tier(tier_name)
            .ok_or_else(|| ApiError::BadRequest(format!("Unknown donation tier: {tier_name}")))?;
        let secret_key = self
            .config
            .secret_key
            .as_deref()
            .ok_or(ApiError::PaymentUnavailable)?;

        info!("Creating checkout session for tier {}", tier.name);

        let url = format!(
            "{}/v1/checkout/sessions",
            self.config.api_base.trim_end_matches('/')
        );
        let response = self
            .http
            .post(&url)
            .bearer_auth(secret_key)
            .form(&self.checkout_form(tier, origin_url))
            .send()
            .await
            .map_err(|e| ApiError::Payment(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            error!("Checkout session request failed with {}", status);
            return Err(ApiError::Payment(format!("processor answered {status}")));
        }

        let session: CheckoutSession = response
            .json()
            .await
            .map_err(|e| ApiError::Payment(e.to_string()))?;

        Ok(session.id)
    }
}
