//! PayPal Orders API client.
//!
//! Only the amount of an already approved checkout order is read; capture
//! authority stays with the invoice ledger's reconciliation.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::Deserialize;

use super::error::PaymentError;
use crate::config::PayPalConfig;

/// Amount reported by the payment service for an external order.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentDetails {
    pub amount: f64,
    pub currency: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn payment_details(&self, reference: &str) -> Result<PaymentDetails, PaymentError>;
}

#[derive(Clone)]
pub struct PayPalClient {
    client: Client,
    config: PayPalConfig,
}

#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct CheckoutOrder {
    #[serde(default)]
    purchase_units: Vec<PurchaseUnit>,
}

#[derive(Debug, Deserialize)]
struct PurchaseUnit {
    amount: Option<Amount>,
}

#[derive(Debug, Deserialize)]
struct Amount {
    #[serde(default)]
    currency_code: String,
    value: String,
}

impl PayPalClient {
    pub fn new(config: PayPalConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.config.client_id.is_empty() && !self.config.secret.expose_secret().is_empty()
    }

    async fn access_token(&self) -> Result<String, PaymentError> {
        let url = format!("{}/v1/oauth2/token", self.config.api_base);

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.config.client_id, Some(self.config.secret.expose_secret()))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| PaymentError::Connection(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, "PayPal token request failed");
            return Err(PaymentError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let token: AccessTokenResponse = response
            .json()
            .await
            .map_err(|e| PaymentError::InvalidResponse(e.to_string()))?;
        Ok(token.access_token)
    }
}

#[async_trait]
impl PaymentGateway for PayPalClient {
    async fn payment_details(&self, reference: &str) -> Result<PaymentDetails, PaymentError> {
        if !self.is_configured() {
            return Err(PaymentError::NotConfigured);
        }

        let token = self.access_token().await?;
        let url = format!("{}/v2/checkout/orders/{}", self.config.api_base, reference);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| PaymentError::Connection(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PaymentError::Connection(e.to_string()))?;

        tracing::debug!(status = %status, paypal_order_id = %reference, "PayPal order response");

        if !status.is_success() {
            return Err(PaymentError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let order: CheckoutOrder = serde_json::from_str(&body)
            .map_err(|e| PaymentError::InvalidResponse(e.to_string()))?;

        let amount = order
            .purchase_units
            .into_iter()
            .next()
            .and_then(|unit| unit.amount)
            .ok_or_else(|| PaymentError::MissingAmount(reference.to_string()))?;

        let value = amount.value.trim().parse::<f64>().map_err(|e| {
            PaymentError::InvalidResponse(format!("amount '{}': {}", amount.value, e))
        })?;

        Ok(PaymentDetails {
            amount: value,
            currency: amount.currency_code,
        })
    }
}
