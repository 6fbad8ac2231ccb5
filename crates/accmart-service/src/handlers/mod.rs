//! API handlers.

pub mod admin;
pub mod deposits;
pub mod health;
pub mod products;
pub mod purchases;
pub mod transactions;
pub mod users;
pub mod webhooks;
