//! Paystack integration for deposit confirmation.
//!
//! Paystack handles:
//! - Collecting card and bank payments for wallet deposits
//! - Confirming a payment by reference (`GET /transaction/verify/:reference`)
//! - Signed `charge.success` webhooks

pub mod client;
pub mod types;

pub use client::PaystackClient;
pub use types::*;
