//! Payment collaborator interface.
//!
//! The payment processor is an external request/response collaborator: the
//! dunning engine hands it a charge and records the outcome. There is no
//! cancellation path for an in-flight charge; duplicate-charge protection
//! lives entirely in the idempotent claim upstream.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::PaymentConfig;

/// A charge to dispatch to the payment processor.
#[derive(Debug, Clone, Serialize)]
pub struct ChargeRequest {
    /// Payment-method handle for the organization at the processor.
    pub customer_ref: String,
    /// Platform merchant identifier.
    pub merchant_id: String,
    /// Amount in minor currency units.
    pub amount_cents: i64,
    /// ISO 4217 currency code.
    pub currency: String,
    /// Statement description.
    pub description: String,
    /// Idempotency key forwarded to the processor.
    pub idempotency_key: String,
}

/// Successful charge receipt from the processor.
#[derive(Debug, Clone, Deserialize)]
pub struct ChargeReceipt {
    /// Processor-side charge identifier.
    pub provider_charge_id: String,
}

/// Errors from the payment collaborator.
///
/// Every variant consumes a dunning attempt: configuration gaps degrade the
/// same way a processor decline does, so the dunning clock still advances.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// The processor declined the charge.
    #[error("Charge declined: {0}")]
    Declined(String),

    /// The charge call timed out. Not retried within the same run.
    #[error("Charge timed out after {0}s")]
    Timeout(u64),

    /// Transport or protocol failure talking to the processor.
    #[error("Payment processor error: {0}")]
    Transport(String),

    /// The organization has no billing method on file.
    #[error("No billing method configured for organization")]
    MissingBillingMethod,

    /// The platform merchant account is not configured.
    #[error("Platform merchant account is not configured")]
    MissingMerchant,
}

/// Interface to the external payment processor.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Dispatches a charge and waits for the outcome, bounded by the
    /// configured timeout.
    async fn charge(&self, request: &ChargeRequest) -> Result<ChargeReceipt, PaymentError>;
}

/// HTTP implementation of [`PaymentGateway`] backed by `reqwest`.
pub struct HttpPaymentGateway {
    client: reqwest::Client,
    base_url: String,
    timeout_secs: u64,
}

impl HttpPaymentGateway {
    /// Builds a gateway from payment configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &PaymentConfig) -> Result<Self, PaymentError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PaymentError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout_secs: config.timeout_secs,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ChargeErrorBody {
    message: Option<String>,
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn charge(&self, request: &ChargeRequest) -> Result<ChargeReceipt, PaymentError> {
        let url = format!("{}/v1/charges", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("Idempotency-Key", &request.idempotency_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PaymentError::Timeout(self.timeout_secs)
                } else {
                    PaymentError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if status.is_success() {
            response
                .json::<ChargeReceipt>()
                .await
                .map_err(|e| PaymentError::Transport(e.to_string()))
        } else if status.is_client_error() {
            let body = response.json::<ChargeErrorBody>().await.ok();
            let message = body
                .and_then(|b| b.message)
                .unwrap_or_else(|| format!("HTTP {status}"));
            Err(PaymentError::Declined(message))
        } else {
            Err(PaymentError::Transport(format!("HTTP {status}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_normalizes_trailing_slash() {
        let config = PaymentConfig {
            base_url: "https://payments.example.com/".to_string(),
            merchant_id: Some("acct_123".to_string()),
            timeout_secs: 30,
        };
        let gateway = HttpPaymentGateway::new(&config).unwrap();
        assert_eq!(gateway.base_url, "https://payments.example.com");
    }

    #[test]
    fn test_payment_error_display() {
        assert_eq!(
            PaymentError::Timeout(30).to_string(),
            "Charge timed out after 30s"
        );
        assert_eq!(
            PaymentError::MissingMerchant.to_string(),
            "Platform merchant account is not configured"
        );
    }
}
