//! Accmart HTTP API Service.
//!
//! This crate provides the HTTP API for the accmart marketplace, including:
//!
//! - User profile sync
//! - Catalogue and purchase history
//! - Wallet deposits through Paystack
//! - Single and cart purchases paid from the wallet
//! - Admin endpoints for users, products and the ledger
//! - The Paystack webhook
//!
//! # Authentication
//!
//! End users send an HS256 JWT issued by the identity provider as a bearer
//! token. Admin endpoints additionally require the stored user to be an admin.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Handlers are async for the router even when they do not await

pub mod auth;
pub mod config;
pub mod crypto;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod paystack;
pub mod routes;
pub mod state;

pub use config::ServiceConfig;
pub use error::ApiError;
pub use paystack::PaystackClient;
pub use routes::create_router;
pub use state::AppState;
