//! Paystack API client implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use accmart_core::{LedgerReference, PaymentError, PaymentVerification, PaymentVerifier};

use super::types::VerifyResponse;

/// Paystack API client.
#[derive(Debug, Clone)]
pub struct PaystackClient {
    client: Client,
    base_url: String,
    secret_key: Option<String>,
}

impl PaystackClient {
    /// Create a new Paystack client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - API root, e.g. `https://api.paystack.co`
    /// * `secret_key` - Secret key (`sk_test_...` or `sk_live_...`); `None` disables verification
    #[must_use]
    pub fn new(base_url: &str, secret_key: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            secret_key,
        }
    }

    /// Fetch the verification record for a reference.
    ///
    /// # Errors
    ///
    /// Returns `NotConfigured` without a secret key, `Unreachable` on transport
    /// failures and 5xx answers, and `InvalidResponse` for bodies that do not parse.
    pub async fn verify_transaction(&self, reference: &str) -> Result<VerifyResponse, PaymentError> {
        let secret_key = self.secret_key.as_ref().ok_or(PaymentError::NotConfigured)?;

        let response = self
            .client
            .get(format!("{}/transaction/verify/{reference}", self.base_url))
            .bearer_auth(secret_key)
            .send()
            .await
            .map_err(|e| PaymentError::Unreachable(e.to_string()))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(PaymentError::Unreachable(format!("HTTP {status}")));
        }

        // Paystack answers unknown references with a 4xx and a `status: false` body.
        response
            .json::<VerifyResponse>()
            .await
            .map_err(|e| PaymentError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl PaymentVerifier for PaystackClient {
    async fn verify_payment(
        &self,
        reference: &LedgerReference,
    ) -> Result<PaymentVerification, PaymentError> {
        let response = self.verify_transaction(reference.as_str()).await?;

        let verification = match response.data {
            Some(data) if response.status && data.reference != reference.as_str() => {
                tracing::warn!(
                    reference = %reference,
                    reported = %data.reference,
                    "Paystack verified a different reference"
                );
                PaymentVerification {
                    success: false,
                    amount_paid_minor: 0,
                }
            }
            Some(data) if response.status => PaymentVerification {
                success: data.is_success(),
                amount_paid_minor: data.amount,
            },
            _ => PaymentVerification {
                success: false,
                amount_paid_minor: 0,
            },
        };

        tracing::debug!(
            reference = %reference,
            success = verification.success,
            amount_paid_minor = verification.amount_paid_minor,
            "Paystack verification"
        );

        Ok(verification)
    }
}
