//! Paystack API payloads.

use serde::Deserialize;

/// Envelope of `GET /transaction/verify/:reference`.
#[derive(Debug, Clone, Deserialize)]
pub struct VerifyResponse {
    /// Whether the API call itself succeeded.
    pub status: bool,
    /// Human-readable message.
    #[serde(default)]
    pub message: String,
    /// The transaction, when found.
    pub data: Option<VerifyData>,
}

/// Transaction details returned by verification.
#[derive(Debug, Clone, Deserialize)]
pub struct VerifyData {
    /// Transaction status (`success`, `failed`, `abandoned`, ...).
    pub status: String,
    /// Our reference.
    pub reference: String,
    /// Amount paid in minor units.
    pub amount: i64,
}

impl VerifyData {
    /// Whether Paystack reports the charge as successful.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

/// A webhook delivery.
///
/// The payload shape depends on the event type, so it is kept raw until the
/// event is known to be one we handle.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    /// Event type, e.g. `charge.success`.
    pub event: String,
    /// Event payload.
    #[serde(default)]
    pub data: serde_json::Value,
}

impl WebhookEvent {
    /// Decode the payload of a charge event.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload lacks a reference or amount.
    pub fn charge(&self) -> Result<WebhookData, serde_json::Error> {
        WebhookData::deserialize(&self.data)
    }
}

/// Payload of a charge event.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookData {
    /// Our reference.
    pub reference: String,
    /// Amount paid in minor units.
    pub amount: i64,
}

/// Event type for a completed charge.
pub const CHARGE_SUCCESS: &str = "charge.success";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_verify_response() {
        let json = r#"{
            "status": true,
            "message": "Verification successful",
            "data": {
                "id": 4099260516,
                "status": "success",
                "reference": "dep_01hx",
                "amount": 100000,
                "currency": "NGN",
                "gateway_response": "Successful"
            }
        }"#;

        let response: VerifyResponse = serde_json::from_str(json).unwrap();
        let data = response.data.unwrap();
        assert!(response.status);
        assert!(data.is_success());
        assert_eq!(data.amount, 100_000);
        assert_eq!(data.reference, "dep_01hx");
    }

    #[test]
    fn parse_not_found_response() {
        let json = r#"{"status": false, "message": "Transaction reference not found"}"#;
        let response: VerifyResponse = serde_json::from_str(json).unwrap();
        assert!(!response.status);
        assert!(response.data.is_none());
    }

    #[test]
    fn parse_webhook_event() {
        let json = r#"{
            "event": "charge.success",
            "data": {"reference": "dep_01hx", "amount": 50000, "status": "success"}
        }"#;

        let event: WebhookEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.event, CHARGE_SUCCESS);
        assert_eq!(event.charge().unwrap().amount, 50_000);
    }

    #[test]
    fn parse_event_without_charge_fields() {
        let json = r#"{
            "event": "customeridentification.success",
            "data": {"customer_id": 82796315, "customer_code": "CUS_XXXXXXXX"}
        }"#;

        let event: WebhookEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.event, "customeridentification.success");
        assert!(event.charge().is_err());
    }
}
