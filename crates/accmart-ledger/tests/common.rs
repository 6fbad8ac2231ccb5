//! Common fixtures for ledger integration tests.

#![allow(dead_code)] // Some fixtures are used by different test files

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use accmart_core::{
    LedgerEntry, LedgerReference, NewProduct, PaymentError, PaymentVerification, PaymentVerifier,
    Product, ProductCredentials, ProductId, ProductStatus, Purchase, TransactionId,
    TransactionKind, TransactionStatus, User, UserId, UserProfile,
};
use accmart_store::{LedgerTx, MemoryStore, ProductCounts, Result, Store};

/// Seed a user with a wallet balance.
pub async fn seed_user(store: &MemoryStore, balance: i64) -> UserId {
    let mut user = User::new(UserProfile {
        id: UserId::generate(),
        email: format!("{}@example.com", UserId::generate()),
        first_name: Some("Ada".into()),
        last_name: None,
        profile_image_url: None,
    });
    user.wallet_balance = balance;
    let id = user.id;
    store.put_user(user).await;
    id
}

/// Seed an available product.
pub async fn seed_product(store: &MemoryStore, price: i64) -> ProductId {
    let product = NewProduct {
        title: format!("Account worth {price}"),
        description: "Shared login".into(),
        category: "streaming".into(),
        images: vec![],
        price,
        credentials: ProductCredentials {
            username: "login".into(),
            password: "secret".into(),
            email: None,
            notes: None,
        },
    }
    .into_product()
    .expect("valid product");
    store.insert_product(&product).await.expect("insert product");
    product.id
}

/// Current wallet balance.
pub async fn balance(store: &MemoryStore, user_id: &UserId) -> i64 {
    store
        .get_user(user_id)
        .await
        .expect("read user")
        .expect("user exists")
        .wallet_balance
}

/// Sum of a user's completed ledger amounts.
pub async fn ledger_sum(store: &MemoryStore, user_id: &UserId) -> i64 {
    store
        .list_entries_by_user(user_id, usize::MAX, 0)
        .await
        .expect("list entries")
        .iter()
        .filter(|e| e.is_settled())
        .map(|e| e.amount)
        .sum()
}

// =============================================================================
// Payment gateway double
// =============================================================================

/// A gateway that reports every payment as paid in full for a fixed amount.
///
/// Yields before answering so concurrent callers interleave.
pub struct PaidGateway {
    amount_paid_minor: i64,
    calls: AtomicUsize,
}

impl PaidGateway {
    pub fn new(amount: i64) -> Self {
        Self {
            amount_paid_minor: accmart_core::to_minor_units(amount),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentVerifier for PaidGateway {
    async fn verify_payment(
        &self,
        _reference: &LedgerReference,
    ) -> std::result::Result<PaymentVerification, PaymentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        Ok(PaymentVerification {
            success: true,
            amount_paid_minor: self.amount_paid_minor,
        })
    }
}

// =============================================================================
// Store that loses races on purpose
// =============================================================================

/// Wraps a `MemoryStore` so that the conditional update of one product always
/// misses, as if another buyer had sold it after our read.
///
/// Records the order in which products were claimed.
pub struct RacingStore {
    pub inner: MemoryStore,
    pub sold_elsewhere: ProductId,
    claimed: Arc<Mutex<Vec<ProductId>>>,
}

impl RacingStore {
    pub fn new(inner: MemoryStore, sold_elsewhere: ProductId) -> Self {
        Self {
            inner,
            sold_elsewhere,
            claimed: Arc::default(),
        }
    }

    /// Products passed to `mark_sold_if_available`, in call order.
    pub fn claimed(&self) -> Vec<ProductId> {
        self.claimed.lock().unwrap().clone()
    }
}

struct RacingTx {
    inner: Box<dyn LedgerTx>,
    sold_elsewhere: ProductId,
    claimed: Arc<Mutex<Vec<ProductId>>>,
}

#[async_trait]
impl Store for RacingStore {
    async fn begin(&self) -> Result<Box<dyn LedgerTx>> {
        Ok(Box::new(RacingTx {
            inner: self.inner.begin().await?,
            sold_elsewhere: self.sold_elsewhere,
            claimed: Arc::clone(&self.claimed),
        }))
    }

    async fn get_user(&self, user_id: &UserId) -> Result<Option<User>> {
        self.inner.get_user(user_id).await
    }

    async fn sync_user(&self, profile: UserProfile) -> Result<User> {
        self.inner.sync_user(profile).await
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        self.inner.list_users().await
    }

    async fn get_product(&self, product_id: &ProductId) -> Result<Option<Product>> {
        self.inner.get_product(product_id).await
    }

    async fn list_products(&self, status: Option<ProductStatus>) -> Result<Vec<Product>> {
        self.inner.list_products(status).await
    }

    async fn insert_product(&self, product: &Product) -> Result<()> {
        self.inner.insert_product(product).await
    }

    async fn product_counts(&self) -> Result<ProductCounts> {
        self.inner.product_counts().await
    }

    async fn list_categories(&self) -> Result<Vec<String>> {
        self.inner.list_categories().await
    }

    async fn list_purchases_by_user(&self, user_id: &UserId) -> Result<Vec<Purchase>> {
        self.inner.list_purchases_by_user(user_id).await
    }

    async fn list_purchases(&self) -> Result<Vec<Purchase>> {
        self.inner.list_purchases().await
    }

    async fn find_purchase_by_product(
        &self,
        product_id: &ProductId,
    ) -> Result<Option<Purchase>> {
        self.inner.find_purchase_by_product(product_id).await
    }

    async fn insert_entry(&self, entry: &LedgerEntry) -> Result<()> {
        self.inner.insert_entry(entry).await
    }

    async fn list_entries_by_user(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<LedgerEntry>> {
        self.inner.list_entries_by_user(user_id, limit, offset).await
    }

    async fn list_entries(&self, kind: Option<TransactionKind>) -> Result<Vec<LedgerEntry>> {
        self.inner.list_entries(kind).await
    }
}

#[async_trait]
impl LedgerTx for RacingTx {
    async fn get_user(&mut self, user_id: &UserId) -> Result<Option<User>> {
        self.inner.get_user(user_id).await
    }

    async fn get_product(&mut self, product_id: &ProductId) -> Result<Option<Product>> {
        self.inner.get_product(product_id).await
    }

    async fn get_products(&mut self, product_ids: &[ProductId]) -> Result<Vec<Product>> {
        self.inner.get_products(product_ids).await
    }

    async fn mark_sold_if_available(&mut self, product_id: &ProductId) -> Result<bool> {
        self.claimed.lock().unwrap().push(*product_id);
        if *product_id == self.sold_elsewhere {
            return Ok(false);
        }
        self.inner.mark_sold_if_available(product_id).await
    }

    async fn debit_wallet(&mut self, user_id: &UserId, amount: i64) -> Result<Option<i64>> {
        self.inner.debit_wallet(user_id, amount).await
    }

    async fn credit_wallet(&mut self, user_id: &UserId, amount: i64) -> Result<Option<i64>> {
        self.inner.credit_wallet(user_id, amount).await
    }

    async fn insert_purchase(&mut self, purchase: &Purchase) -> Result<()> {
        self.inner.insert_purchase(purchase).await
    }

    async fn insert_entry(&mut self, entry: &LedgerEntry) -> Result<()> {
        self.inner.insert_entry(entry).await
    }

    async fn find_entry(
        &mut self,
        user_id: &UserId,
        reference: &LedgerReference,
    ) -> Result<Option<LedgerEntry>> {
        self.inner.find_entry(user_id, reference).await
    }

    async fn find_entry_by_reference(
        &mut self,
        reference: &LedgerReference,
    ) -> Result<Option<LedgerEntry>> {
        self.inner.find_entry_by_reference(reference).await
    }

    async fn get_entry(&mut self, id: &TransactionId) -> Result<Option<LedgerEntry>> {
        self.inner.get_entry(id).await
    }

    async fn transition_entry(
        &mut self,
        id: &TransactionId,
        from: TransactionStatus,
        to: TransactionStatus,
    ) -> Result<Option<LedgerEntry>> {
        self.inner.transition_entry(id, from, to).await
    }

    async fn count_admins(&mut self) -> Result<usize> {
        self.inner.count_admins().await
    }

    async fn set_admin(&mut self, user_id: &UserId, is_admin: bool) -> Result<Option<User>> {
        self.inner.set_admin(user_id, is_admin).await
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.inner.commit().await
    }
}
