//! Application state.

use std::sync::Arc;

use accmart_core::PaymentVerifier;
use accmart_store::Store;

use crate::config::ServiceConfig;
use crate::paystack::PaystackClient;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The storage backend.
    pub store: Arc<dyn Store>,

    /// Confirms deposits with the payment gateway.
    pub payments: Arc<dyn PaymentVerifier>,

    /// Service configuration.
    pub config: ServiceConfig,
}

impl AppState {
    /// Create a new application state with a Paystack verifier built from `config`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, config: ServiceConfig) -> Self {
        let paystack = PaystackClient::new(
            &config.paystack_base_url,
            config.paystack_secret_key.clone(),
        );

        if config.paystack_secret_key.is_some() {
            tracing::info!(base_url = %config.paystack_base_url, "Paystack integration enabled");
        } else {
            tracing::warn!("Paystack not configured - deposits cannot be verified");
        }

        Self {
            store,
            payments: Arc::new(paystack),
            config,
        }
    }
}
