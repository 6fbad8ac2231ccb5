//! Storage layer for accmart.
//!
//! This crate provides persistent storage for users, products, purchases and the
//! ledger, plus the transaction boundary every money-moving operation runs in.
//!
//! # Architecture
//!
//! - [`Store`] covers plain reads and single-statement writes.
//! - [`Store::begin`] opens a [`LedgerTx`], one atomic database transaction.
//!   Its writes become visible only on [`LedgerTx::commit`]; dropping it rolls
//!   everything back.
//!
//! Two backends implement both traits:
//!
//! - [`PgStore`]: PostgreSQL via `sqlx` at READ COMMITTED, where single-row
//!   `UPDATE … WHERE status = …` statements act as compare-and-swap guards.
//! - [`MemoryStore`]: in-memory, one transaction at a time. Used by tests and
//!   by the service when no database is configured.
//!
//! # Example
//!
//! ```no_run
//! # async fn demo() -> accmart_store::Result<()> {
//! use accmart_core::ProductId;
//! use accmart_store::{MemoryStore, Store};
//!
//! let store = MemoryStore::new();
//! let mut tx = store.begin().await?;
//! let sold = tx.mark_sold_if_available(&ProductId::generate()).await?;
//! assert!(!sold);
//! tx.commit().await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod memory;
pub mod postgres;
pub mod schema;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use serde::Serialize;

use accmart_core::{
    LedgerEntry, LedgerReference, Product, ProductId, ProductStatus, Purchase, TransactionId,
    TransactionKind, TransactionStatus, User, UserId, UserProfile,
};

/// Product counts by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProductCounts {
    /// Products still for sale.
    pub available: u64,
    /// Products sold.
    pub sold: u64,
    /// All products.
    pub total: u64,
}

/// The storage trait defining all database operations outside a ledger transaction.
#[async_trait]
pub trait Store: Send + Sync {
    /// Open an atomic ledger transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot start a transaction.
    async fn begin(&self) -> Result<Box<dyn LedgerTx>>;

    // =========================================================================
    // Users
    // =========================================================================

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_user(&self, user_id: &UserId) -> Result<Option<User>>;

    /// Insert the user, or refresh its profile fields if it already exists.
    ///
    /// Never touches `wallet_balance` or `is_admin`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn sync_user(&self, profile: UserProfile) -> Result<User>;

    /// List all users, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_users(&self) -> Result<Vec<User>>;

    // =========================================================================
    // Products
    // =========================================================================

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_product(&self, product_id: &ProductId) -> Result<Option<Product>>;

    /// List products, newest first, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_products(&self, status: Option<ProductStatus>) -> Result<Vec<Product>>;

    /// Insert a new product.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Conflict` if the id is taken.
    async fn insert_product(&self, product: &Product) -> Result<()>;

    /// Count products by status.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn product_counts(&self) -> Result<ProductCounts>;

    /// Distinct product categories, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_categories(&self) -> Result<Vec<String>>;

    // =========================================================================
    // Purchases
    // =========================================================================

    /// List a user's purchases, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_purchases_by_user(&self, user_id: &UserId) -> Result<Vec<Purchase>>;

    /// List every purchase, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_purchases(&self) -> Result<Vec<Purchase>>;

    /// Find the purchase of a product, if it has been sold.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn find_purchase_by_product(&self, product_id: &ProductId)
        -> Result<Option<Purchase>>;

    // =========================================================================
    // Ledger
    // =========================================================================

    /// Insert a ledger entry on its own (used for pending deposits).
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Conflict` if the reference is already used by the user.
    async fn insert_entry(&self, entry: &LedgerEntry) -> Result<()>;

    /// List a user's ledger entries, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_entries_by_user(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<LedgerEntry>>;

    /// List every ledger entry, newest first, optionally filtered by kind.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_entries(&self, kind: Option<TransactionKind>) -> Result<Vec<LedgerEntry>>;
}

/// One atomic database transaction over users, products, purchases and the ledger.
///
/// Conditional writes report whether they applied so callers can detect lost
/// races without explicit locks. Dropping the handle without calling
/// [`LedgerTx::commit`] discards every write.
#[async_trait]
pub trait LedgerTx: Send {
    /// Read a user.
    async fn get_user(&mut self, user_id: &UserId) -> Result<Option<User>>;

    /// Read a product.
    async fn get_product(&mut self, product_id: &ProductId) -> Result<Option<Product>>;

    /// Read several products in one query. Missing ids are simply absent.
    async fn get_products(&mut self, product_ids: &[ProductId]) -> Result<Vec<Product>>;

    /// Flip a product from available to sold.
    ///
    /// Returns `false` when no row matched, i.e. the product was already sold.
    async fn mark_sold_if_available(&mut self, product_id: &ProductId) -> Result<bool>;

    /// Subtract from a wallet in one statement, guarded by `balance >= amount`.
    ///
    /// Returns the new balance, or `None` if the user is missing, cannot cover it,
    /// or `amount` is not positive.
    async fn debit_wallet(&mut self, user_id: &UserId, amount: i64) -> Result<Option<i64>>;

    /// Add to a wallet in one statement.
    ///
    /// Returns the new balance, or `None` if the user is missing or `amount` is not positive.
    async fn credit_wallet(&mut self, user_id: &UserId, amount: i64) -> Result<Option<i64>>;

    /// Insert a purchase row.
    async fn insert_purchase(&mut self, purchase: &Purchase) -> Result<()>;

    /// Insert a ledger entry.
    async fn insert_entry(&mut self, entry: &LedgerEntry) -> Result<()>;

    /// Find a user's entry by reference.
    async fn find_entry(
        &mut self,
        user_id: &UserId,
        reference: &LedgerReference,
    ) -> Result<Option<LedgerEntry>>;

    /// Find an entry by reference alone (references issued here are unique).
    async fn find_entry_by_reference(
        &mut self,
        reference: &LedgerReference,
    ) -> Result<Option<LedgerEntry>>;

    /// Read an entry by id.
    async fn get_entry(&mut self, id: &TransactionId) -> Result<Option<LedgerEntry>>;

    /// Move an entry from `from` to `to` if it is still in `from`.
    ///
    /// Returns the updated entry, or `None` when another transaction got there first.
    async fn transition_entry(
        &mut self,
        id: &TransactionId,
        from: TransactionStatus,
        to: TransactionStatus,
    ) -> Result<Option<LedgerEntry>>;

    /// Count admins, holding their rows until the transaction ends.
    async fn count_admins(&mut self) -> Result<usize>;

    /// Set a user's admin flag. Returns the updated user, or `None` if missing.
    async fn set_admin(&mut self, user_id: &UserId, is_admin: bool) -> Result<Option<User>>;

    /// Make every write of this transaction visible.
    async fn commit(self: Box<Self>) -> Result<()>;
}
