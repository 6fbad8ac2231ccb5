//! Core types and utilities for accmart.
//!
//! This crate provides the ledger primitives shared by every other accmart crate:
//!
//! - **Identifiers**: `UserId`, `ProductId`, `PurchaseId`, `TransactionId`
//! - **Users**: `User`, `UserProfile`, admin-status rules
//! - **Inventory**: `Product`, `ProductStatus`, `ProductCredentials`
//! - **Ledger**: `Purchase`, `LedgerEntry`, `TransactionKind`, `TransactionStatus`
//! - **Payments**: the `PaymentVerifier` seam to the external gateway
//! - **Rejections**: business-rule outcomes of the purchase and deposit engines
//!
//! # Wallet Units
//!
//! Wallet balances, prices and deposit amounts are whole currency units stored as
//! `i64`. The payment gateway reports amounts in minor units
//! ([`MINOR_UNITS_PER_UNIT`] per wallet unit).

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod ids;
pub mod ledger;
pub mod payment;
pub mod product;
pub mod user;

pub use error::{Rejection, Result};
pub use ids::{IdError, LedgerReference, ProductId, PurchaseId, TransactionId, UserId};
pub use ledger::{
    validate_deposit_amount, LedgerEntry, Purchase, TransactionKind, TransactionStatus,
    MAX_DEPOSIT_AMOUNT, MIN_DEPOSIT_AMOUNT,
};
pub use payment::{
    to_minor_units, PaymentError, PaymentVerification, PaymentVerifier, MINOR_UNITS_PER_UNIT,
};
pub use product::{
    NewProduct, Product, ProductCredentials, ProductListing, ProductStatus, MAX_PRODUCT_PRICE,
};
pub use user::{ensure_admin_change_allowed, User, UserProfile};
