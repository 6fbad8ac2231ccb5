//! In-memory storage implementation.
//!
//! `MemoryStore` keeps every table behind one async mutex. A ledger
//! transaction holds the lock for its whole lifetime and works on a copy of the
//! state, so transactions are serialized and a dropped transaction leaves no
//! trace. The same uniqueness and foreign-key rules as the PostgreSQL schema
//! are enforced.
//!
//! Purchases and ledger entries are kept in insertion order, which is the
//! order listings report them in (newest first).
//!
//! Do not call [`Store`] methods while holding a [`LedgerTx`] from the same
//! store: they wait for the transaction's lock.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use accmart_core::{
    LedgerEntry, LedgerReference, Product, ProductId, ProductStatus, Purchase, TransactionId,
    TransactionKind, TransactionStatus, User, UserId, UserProfile,
};

use crate::error::{Result, StoreError};
use crate::{LedgerTx, ProductCounts, Store};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    users: HashMap<UserId, User>,
    products: HashMap<ProductId, Product>,
    purchases: Vec<Purchase>,
    entries: Vec<LedgerEntry>,
}

impl MemoryState {
    fn insert_purchase(&mut self, purchase: &Purchase) -> Result<()> {
        if !self.users.contains_key(&purchase.user_id) {
            return Err(StoreError::Conflict("purchases.user_id references a missing user".into()));
        }
        if !self.products.contains_key(&purchase.product_id) {
            return Err(StoreError::Conflict(
                "purchases.product_id references a missing product".into(),
            ));
        }
        if self.purchases.iter().any(|p| p.product_id == purchase.product_id) {
            return Err(StoreError::Conflict("purchases.product_id must be unique".into()));
        }
        self.purchases.push(purchase.clone());
        Ok(())
    }

    fn insert_entry(&mut self, entry: &LedgerEntry) -> Result<()> {
        if !self.users.contains_key(&entry.user_id) {
            return Err(StoreError::Conflict("transactions.user_id references a missing user".into()));
        }
        let sign_ok = match entry.kind {
            TransactionKind::Deposit => entry.amount > 0,
            TransactionKind::Purchase => entry.amount < 0,
        };
        if !sign_ok {
            return Err(StoreError::Conflict("transactions amount has the wrong sign".into()));
        }
        if self
            .entries
            .iter()
            .any(|e| e.user_id == entry.user_id && e.reference == entry.reference)
        {
            return Err(StoreError::Conflict(
                "transactions (user_id, reference) must be unique".into(),
            ));
        }
        self.entries.push(entry.clone());
        Ok(())
    }
}

/// In-memory storage implementation.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a user as-is, including balance and admin flag.
    ///
    /// Meant for seeding fixtures; the service only creates users through
    /// [`Store::sync_user`].
    pub async fn put_user(&self, user: User) {
        self.state.lock().await.users.insert(user.id, user);
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn LedgerTx>> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = (*guard).clone();
        Ok(Box::new(MemoryLedgerTx { guard, working }))
    }

    // =========================================================================
    // Users
    // =========================================================================

    async fn get_user(&self, user_id: &UserId) -> Result<Option<User>> {
        Ok(self.state.lock().await.users.get(user_id).cloned())
    }

    async fn sync_user(&self, profile: UserProfile) -> Result<User> {
        let mut state = self.state.lock().await;
        let user = match state.users.get_mut(&profile.id) {
            Some(existing) => {
                existing.apply_profile(profile);
                existing.clone()
            }
            None => {
                let user = User::new(profile);
                state.users.insert(user.id, user.clone());
                user
            }
        };
        Ok(user)
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let state = self.state.lock().await;
        let mut users: Vec<User> = state.users.values().cloned().collect();
        users.sort_by_key(|u| (u.created_at, u.id));
        Ok(users)
    }

    // =========================================================================
    // Products
    // =========================================================================

    async fn get_product(&self, product_id: &ProductId) -> Result<Option<Product>> {
        Ok(self.state.lock().await.products.get(product_id).cloned())
    }

    async fn list_products(&self, status: Option<ProductStatus>) -> Result<Vec<Product>> {
        let state = self.state.lock().await;
        let mut products: Vec<Product> = state
            .products
            .values()
            .filter(|p| status.is_none() || status == Some(p.status))
            .cloned()
            .collect();
        products.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(products)
    }

    async fn insert_product(&self, product: &Product) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.products.contains_key(&product.id) {
            return Err(StoreError::Conflict("products.id must be unique".into()));
        }
        state.products.insert(product.id, product.clone());
        Ok(())
    }

    async fn product_counts(&self) -> Result<ProductCounts> {
        let state = self.state.lock().await;
        let mut counts = ProductCounts::default();
        for product in state.products.values() {
            match product.status {
                ProductStatus::Available => counts.available += 1,
                ProductStatus::Sold => counts.sold += 1,
            }
            counts.total += 1;
        }
        Ok(counts)
    }

    async fn list_categories(&self) -> Result<Vec<String>> {
        let state = self.state.lock().await;
        let categories: BTreeSet<&str> = state
            .products
            .values()
            .map(|p| p.category.as_str())
            .collect();
        Ok(categories.into_iter().map(String::from).collect())
    }

    // =========================================================================
    // Purchases
    // =========================================================================

    async fn list_purchases_by_user(&self, user_id: &UserId) -> Result<Vec<Purchase>> {
        let state = self.state.lock().await;
        Ok(state
            .purchases
            .iter()
            .rev()
            .filter(|p| p.user_id == *user_id)
            .cloned()
            .collect())
    }

    async fn list_purchases(&self) -> Result<Vec<Purchase>> {
        let state = self.state.lock().await;
        Ok(state.purchases.iter().rev().cloned().collect())
    }

    async fn find_purchase_by_product(
        &self,
        product_id: &ProductId,
    ) -> Result<Option<Purchase>> {
        let state = self.state.lock().await;
        Ok(state
            .purchases
            .iter()
            .find(|p| p.product_id == *product_id)
            .cloned())
    }

    // =========================================================================
    // Ledger
    // =========================================================================

    async fn insert_entry(&self, entry: &LedgerEntry) -> Result<()> {
        self.state.lock().await.insert_entry(entry)
    }

    async fn list_entries_by_user(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<LedgerEntry>> {
        let state = self.state.lock().await;
        Ok(state
            .entries
            .iter()
            .rev()
            .filter(|e| e.user_id == *user_id)
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn list_entries(&self, kind: Option<TransactionKind>) -> Result<Vec<LedgerEntry>> {
        let state = self.state.lock().await;
        Ok(state
            .entries
            .iter()
            .rev()
            .filter(|e| kind.is_none() || kind == Some(e.kind))
            .cloned()
            .collect())
    }
}

/// A ledger transaction over a [`MemoryStore`].
///
/// Holds the store lock until committed or dropped.
pub struct MemoryLedgerTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

#[async_trait]
impl LedgerTx for MemoryLedgerTx {
    async fn get_user(&mut self, user_id: &UserId) -> Result<Option<User>> {
        Ok(self.working.users.get(user_id).cloned())
    }

    async fn get_product(&mut self, product_id: &ProductId) -> Result<Option<Product>> {
        Ok(self.working.products.get(product_id).cloned())
    }

    async fn get_products(&mut self, product_ids: &[ProductId]) -> Result<Vec<Product>> {
        Ok(product_ids
            .iter()
            .filter_map(|id| self.working.products.get(id).cloned())
            .collect())
    }

    async fn mark_sold_if_available(&mut self, product_id: &ProductId) -> Result<bool> {
        match self.working.products.get_mut(product_id) {
            Some(product) if product.status == ProductStatus::Available => {
                product.status = ProductStatus::Sold;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn debit_wallet(&mut self, user_id: &UserId, amount: i64) -> Result<Option<i64>> {
        if amount <= 0 {
            return Ok(None);
        }
        match self.working.users.get_mut(user_id) {
            Some(user) if user.has_sufficient_balance(amount) => {
                user.wallet_balance -= amount;
                user.updated_at = Utc::now();
                Ok(Some(user.wallet_balance))
            }
            _ => Ok(None),
        }
    }

    async fn credit_wallet(&mut self, user_id: &UserId, amount: i64) -> Result<Option<i64>> {
        if amount <= 0 {
            return Ok(None);
        }
        let Some(user) = self.working.users.get_mut(user_id) else {
            return Ok(None);
        };
        let Some(balance) = user.wallet_balance.checked_add(amount) else {
            return Ok(None);
        };
        user.wallet_balance = balance;
        user.updated_at = Utc::now();
        Ok(Some(balance))
    }

    async fn insert_purchase(&mut self, purchase: &Purchase) -> Result<()> {
        self.working.insert_purchase(purchase)
    }

    async fn insert_entry(&mut self, entry: &LedgerEntry) -> Result<()> {
        self.working.insert_entry(entry)
    }

    async fn find_entry(
        &mut self,
        user_id: &UserId,
        reference: &LedgerReference,
    ) -> Result<Option<LedgerEntry>> {
        Ok(self
            .working
            .entries
            .iter()
            .find(|e| e.user_id == *user_id && e.reference == *reference)
            .cloned())
    }

    async fn find_entry_by_reference(
        &mut self,
        reference: &LedgerReference,
    ) -> Result<Option<LedgerEntry>> {
        Ok(self
            .working
            .entries
            .iter()
            .find(|e| e.reference == *reference)
            .cloned())
    }

    async fn get_entry(&mut self, id: &TransactionId) -> Result<Option<LedgerEntry>> {
        Ok(self.working.entries.iter().find(|e| e.id == *id).cloned())
    }

    async fn transition_entry(
        &mut self,
        id: &TransactionId,
        from: TransactionStatus,
        to: TransactionStatus,
    ) -> Result<Option<LedgerEntry>> {
        Ok(self
            .working
            .entries
            .iter_mut()
            .find(|e| e.id == *id && e.status == from)
            .map(|entry| {
                entry.status = to;
                entry.updated_at = Utc::now();
                entry.clone()
            }))
    }

    async fn count_admins(&mut self) -> Result<usize> {
        Ok(self.working.users.values().filter(|u| u.is_admin).count())
    }

    async fn set_admin(&mut self, user_id: &UserId, is_admin: bool) -> Result<Option<User>> {
        Ok(self.working.users.get_mut(user_id).map(|user| {
            user.is_admin = is_admin;
            user.updated_at = Utc::now();
            user.clone()
        }))
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let Self { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}
