//! PostgreSQL storage implementation.
//!
//! This module provides `PgStore` and its ledger transaction `PgLedgerTx`.
//! Transactions run at the default READ COMMITTED isolation; correctness under
//! concurrency comes from conditional single-row updates whose affected-row
//! count says whether this transaction won.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use accmart_core::{
    LedgerEntry, LedgerReference, Product, ProductCredentials, ProductId, ProductStatus,
    Purchase, PurchaseId, TransactionId, TransactionKind, TransactionStatus, User, UserId,
    UserProfile,
};

use crate::error::{Result, StoreError};
use crate::schema::{
    table, PRODUCT_COLUMNS, PURCHASE_COLUMNS, TRANSACTION_COLUMNS, USER_COLUMNS,
};
use crate::{LedgerTx, ProductCounts, Store};

/// PostgreSQL-backed storage implementation.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect to the database at `url` with a bounded pool.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be reached.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        tracing::info!(max_connections, "Connected to PostgreSQL");
        Ok(Self { pool })
    }

    /// Apply pending schema migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if a migration fails.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        tracing::info!("Database migrations applied");
        Ok(())
    }
}

// =============================================================================
// Row mapping
// =============================================================================

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    first_name: Option<String>,
    last_name: Option<String>,
    profile_image_url: Option<String>,
    wallet_balance: i64,
    is_admin: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: UserId::from_uuid(row.id),
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            profile_image_url: row.profile_image_url,
            wallet_balance: row.wallet_balance,
            is_admin: row.is_admin,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    title: String,
    description: String,
    category: String,
    images: Vec<String>,
    price: i64,
    status: String,
    account_username: String,
    account_password: String,
    account_email: Option<String>,
    account_notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = StoreError;

    fn try_from(row: ProductRow) -> Result<Self> {
        Ok(Self {
            id: ProductId::from_uuid(row.id),
            title: row.title,
            description: row.description,
            category: row.category,
            images: row.images,
            price: row.price,
            status: ProductStatus::from_str(&row.status).map_err(StoreError::Serialization)?,
            credentials: ProductCredentials {
                username: row.account_username,
                password: row.account_password,
                email: row.account_email,
                notes: row.account_notes,
            },
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct PurchaseRow {
    id: Uuid,
    user_id: Uuid,
    product_id: Uuid,
    amount: i64,
    purchased_at: DateTime<Utc>,
}

impl From<PurchaseRow> for Purchase {
    fn from(row: PurchaseRow) -> Self {
        Self {
            id: PurchaseId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            product_id: ProductId::from_uuid(row.product_id),
            amount: row.amount,
            purchased_at: row.purchased_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct TransactionRow {
    id: String,
    user_id: Uuid,
    #[sqlx(rename = "type")]
    kind: String,
    amount: i64,
    status: String,
    reference: String,
    metadata: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for LedgerEntry {
    type Error = StoreError;

    fn try_from(row: TransactionRow) -> Result<Self> {
        let decode = |e: accmart_core::IdError| StoreError::Serialization(e.to_string());
        Ok(Self {
            id: row.id.parse().map_err(decode)?,
            user_id: UserId::from_uuid(row.user_id),
            kind: TransactionKind::from_str(&row.kind).map_err(StoreError::Serialization)?,
            amount: row.amount,
            status: TransactionStatus::from_str(&row.status).map_err(StoreError::Serialization)?,
            reference: row.reference.parse().map_err(decode)?,
            metadata: row.metadata,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn products_from_rows(rows: Vec<ProductRow>) -> Result<Vec<Product>> {
    rows.into_iter().map(Product::try_from).collect()
}

fn entries_from_rows(rows: Vec<TransactionRow>) -> Result<Vec<LedgerEntry>> {
    rows.into_iter().map(LedgerEntry::try_from).collect()
}

fn to_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn to_u64(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

// =============================================================================
// Store
// =============================================================================

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> Result<Box<dyn LedgerTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgLedgerTx { tx }))
    }

    // =========================================================================
    // Users
    // =========================================================================

    async fn get_user(&self, user_id: &UserId) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM {} WHERE id = $1", table::USERS);
        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(user_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    async fn sync_user(&self, profile: UserProfile) -> Result<User> {
        let sql = format!(
            "INSERT INTO {} (id, email, first_name, last_name, profile_image_url) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (id) DO UPDATE SET \
                 email = EXCLUDED.email, \
                 first_name = EXCLUDED.first_name, \
                 last_name = EXCLUDED.last_name, \
                 profile_image_url = EXCLUDED.profile_image_url, \
                 updated_at = NOW() \
             RETURNING {USER_COLUMNS}",
            table::USERS
        );
        let row: UserRow = sqlx::query_as(&sql)
            .bind(profile.id.as_uuid())
            .bind(&profile.email)
            .bind(&profile.first_name)
            .bind(&profile.last_name)
            .bind(&profile.profile_image_url)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM {} ORDER BY created_at ASC",
            table::USERS
        );
        let rows: Vec<UserRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(User::from).collect())
    }

    // =========================================================================
    // Products
    // =========================================================================

    async fn get_product(&self, product_id: &ProductId) -> Result<Option<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM {} WHERE id = $1",
            table::PRODUCTS
        );
        let row: Option<ProductRow> = sqlx::query_as(&sql)
            .bind(product_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.map(Product::try_from).transpose()
    }

    async fn list_products(&self, status: Option<ProductStatus>) -> Result<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM {} \
             WHERE ($1::TEXT IS NULL OR status = $1) \
             ORDER BY created_at DESC",
            table::PRODUCTS
        );
        let rows: Vec<ProductRow> = sqlx::query_as(&sql)
            .bind(status.map(|s| s.as_str()))
            .fetch_all(&self.pool)
            .await?;
        products_from_rows(rows)
    }

    async fn insert_product(&self, product: &Product) -> Result<()> {
        let sql = format!(
            "INSERT INTO {} ({PRODUCT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
            table::PRODUCTS
        );
        sqlx::query(&sql)
            .bind(product.id.as_uuid())
            .bind(&product.title)
            .bind(&product.description)
            .bind(&product.category)
            .bind(&product.images)
            .bind(product.price)
            .bind(product.status.as_str())
            .bind(&product.credentials.username)
            .bind(&product.credentials.password)
            .bind(&product.credentials.email)
            .bind(&product.credentials.notes)
            .bind(product.created_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn product_counts(&self) -> Result<ProductCounts> {
        let sql = format!(
            "SELECT \
                 COUNT(*) FILTER (WHERE status = 'available'), \
                 COUNT(*) FILTER (WHERE status = 'sold'), \
                 COUNT(*) \
             FROM {}",
            table::PRODUCTS
        );
        let (available, sold, total): (i64, i64, i64) =
            sqlx::query_as(&sql).fetch_one(&self.pool).await?;
        Ok(ProductCounts {
            available: to_u64(available),
            sold: to_u64(sold),
            total: to_u64(total),
        })
    }

    async fn list_categories(&self) -> Result<Vec<String>> {
        let sql = format!(
            "SELECT DISTINCT category FROM {} ORDER BY category",
            table::PRODUCTS
        );
        let categories: Vec<String> = sqlx::query_scalar(&sql).fetch_all(&self.pool).await?;
        Ok(categories)
    }

    // =========================================================================
    // Purchases
    // =========================================================================

    async fn list_purchases_by_user(&self, user_id: &UserId) -> Result<Vec<Purchase>> {
        let sql = format!(
            "SELECT {PURCHASE_COLUMNS} FROM {} WHERE user_id = $1 ORDER BY purchased_at DESC",
            table::PURCHASES
        );
        let rows: Vec<PurchaseRow> = sqlx::query_as(&sql)
            .bind(user_id.as_uuid())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Purchase::from).collect())
    }

    async fn list_purchases(&self) -> Result<Vec<Purchase>> {
        let sql = format!(
            "SELECT {PURCHASE_COLUMNS} FROM {} ORDER BY purchased_at DESC",
            table::PURCHASES
        );
        let rows: Vec<PurchaseRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Purchase::from).collect())
    }

    async fn find_purchase_by_product(
        &self,
        product_id: &ProductId,
    ) -> Result<Option<Purchase>> {
        let sql = format!(
            "SELECT {PURCHASE_COLUMNS} FROM {} WHERE product_id = $1",
            table::PURCHASES
        );
        let row: Option<PurchaseRow> = sqlx::query_as(&sql)
            .bind(product_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Purchase::from))
    }

    // =========================================================================
    // Ledger
    // =========================================================================

    async fn insert_entry(&self, entry: &LedgerEntry) -> Result<()> {
        let sql = insert_entry_sql();
        bind_entry(sqlx::query(&sql), entry)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_entries_by_user(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<LedgerEntry>> {
        let sql = format!(
            "SELECT {TRANSACTION_COLUMNS} FROM {} WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3",
            table::TRANSACTIONS
        );
        let rows: Vec<TransactionRow> = sqlx::query_as(&sql)
            .bind(user_id.as_uuid())
            .bind(to_i64(limit))
            .bind(to_i64(offset))
            .fetch_all(&self.pool)
            .await?;
        entries_from_rows(rows)
    }

    async fn list_entries(&self, kind: Option<TransactionKind>) -> Result<Vec<LedgerEntry>> {
        let sql = format!(
            "SELECT {TRANSACTION_COLUMNS} FROM {} \
             WHERE ($1::TEXT IS NULL OR type = $1) \
             ORDER BY created_at DESC, id DESC",
            table::TRANSACTIONS
        );
        let rows: Vec<TransactionRow> = sqlx::query_as(&sql)
            .bind(kind.map(|k| k.as_str()))
            .fetch_all(&self.pool)
            .await?;
        entries_from_rows(rows)
    }
}

fn insert_entry_sql() -> String {
    format!(
        "INSERT INTO {} ({TRANSACTION_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        table::TRANSACTIONS
    )
}

fn bind_entry<'q>(
    query: sqlx::query::Query<'q, Postgres, sqlx::postgres::PgArguments>,
    entry: &'q LedgerEntry,
) -> sqlx::query::Query<'q, Postgres, sqlx::postgres::PgArguments> {
    query
        .bind(entry.id.to_string())
        .bind(entry.user_id.as_uuid())
        .bind(entry.kind.as_str())
        .bind(entry.amount)
        .bind(entry.status.as_str())
        .bind(entry.reference.as_str())
        .bind(&entry.metadata)
        .bind(entry.created_at)
        .bind(entry.updated_at)
}

// =============================================================================
// Ledger transaction
// =============================================================================

/// A ledger transaction backed by a pooled PostgreSQL connection.
///
/// Dropping it without committing returns the connection with a rollback.
pub struct PgLedgerTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl LedgerTx for PgLedgerTx {
    async fn get_user(&mut self, user_id: &UserId) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM {} WHERE id = $1", table::USERS);
        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(user_id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(row.map(User::from))
    }

    async fn get_product(&mut self, product_id: &ProductId) -> Result<Option<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM {} WHERE id = $1",
            table::PRODUCTS
        );
        let row: Option<ProductRow> = sqlx::query_as(&sql)
            .bind(product_id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await?;
        row.map(Product::try_from).transpose()
    }

    async fn get_products(&mut self, product_ids: &[ProductId]) -> Result<Vec<Product>> {
        let ids: Vec<Uuid> = product_ids.iter().map(|id| *id.as_uuid()).collect();
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM {} WHERE id = ANY($1)",
            table::PRODUCTS
        );
        let rows: Vec<ProductRow> = sqlx::query_as(&sql)
            .bind(&ids)
            .fetch_all(&mut *self.tx)
            .await?;
        products_from_rows(rows)
    }

    async fn mark_sold_if_available(&mut self, product_id: &ProductId) -> Result<bool> {
        let sql = format!(
            "UPDATE {} SET status = 'sold' WHERE id = $1 AND status = 'available'",
            table::PRODUCTS
        );
        let result = sqlx::query(&sql)
            .bind(product_id.as_uuid())
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn debit_wallet(&mut self, user_id: &UserId, amount: i64) -> Result<Option<i64>> {
        let sql = format!(
            "UPDATE {} SET wallet_balance = wallet_balance - $1, updated_at = NOW() \
             WHERE id = $2 AND $1 > 0 AND wallet_balance >= $1 \
             RETURNING wallet_balance",
            table::USERS
        );
        let balance: Option<i64> = sqlx::query_scalar(&sql)
            .bind(amount)
            .bind(user_id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(balance)
    }

    async fn credit_wallet(&mut self, user_id: &UserId, amount: i64) -> Result<Option<i64>> {
        let sql = format!(
            "UPDATE {} SET wallet_balance = wallet_balance + $1, updated_at = NOW() \
             WHERE id = $2 AND $1 > 0 \
             RETURNING wallet_balance",
            table::USERS
        );
        let balance: Option<i64> = sqlx::query_scalar(&sql)
            .bind(amount)
            .bind(user_id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(balance)
    }

    async fn insert_purchase(&mut self, purchase: &Purchase) -> Result<()> {
        let sql = format!(
            "INSERT INTO {} ({PURCHASE_COLUMNS}) VALUES ($1, $2, $3, $4, $5)",
            table::PURCHASES
        );
        sqlx::query(&sql)
            .bind(purchase.id.as_uuid())
            .bind(purchase.user_id.as_uuid())
            .bind(purchase.product_id.as_uuid())
            .bind(purchase.amount)
            .bind(purchase.purchased_at)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn insert_entry(&mut self, entry: &LedgerEntry) -> Result<()> {
        let sql = insert_entry_sql();
        bind_entry(sqlx::query(&sql), entry)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn find_entry(
        &mut self,
        user_id: &UserId,
        reference: &LedgerReference,
    ) -> Result<Option<LedgerEntry>> {
        let sql = format!(
            "SELECT {TRANSACTION_COLUMNS} FROM {} WHERE user_id = $1 AND reference = $2",
            table::TRANSACTIONS
        );
        let row: Option<TransactionRow> = sqlx::query_as(&sql)
            .bind(user_id.as_uuid())
            .bind(reference.as_str())
            .fetch_optional(&mut *self.tx)
            .await?;
        row.map(LedgerEntry::try_from).transpose()
    }

    async fn find_entry_by_reference(
        &mut self,
        reference: &LedgerReference,
    ) -> Result<Option<LedgerEntry>> {
        let sql = format!(
            "SELECT {TRANSACTION_COLUMNS} FROM {} WHERE reference = $1 LIMIT 1",
            table::TRANSACTIONS
        );
        let row: Option<TransactionRow> = sqlx::query_as(&sql)
            .bind(reference.as_str())
            .fetch_optional(&mut *self.tx)
            .await?;
        row.map(LedgerEntry::try_from).transpose()
    }

    async fn get_entry(&mut self, id: &TransactionId) -> Result<Option<LedgerEntry>> {
        let sql = format!(
            "SELECT {TRANSACTION_COLUMNS} FROM {} WHERE id = $1",
            table::TRANSACTIONS
        );
        let row: Option<TransactionRow> = sqlx::query_as(&sql)
            .bind(id.to_string())
            .fetch_optional(&mut *self.tx)
            .await?;
        row.map(LedgerEntry::try_from).transpose()
    }

    async fn transition_entry(
        &mut self,
        id: &TransactionId,
        from: TransactionStatus,
        to: TransactionStatus,
    ) -> Result<Option<LedgerEntry>> {
        let sql = format!(
            "UPDATE {} SET status = $1, updated_at = NOW() \
             WHERE id = $2 AND status = $3 \
             RETURNING {TRANSACTION_COLUMNS}",
            table::TRANSACTIONS
        );
        let row: Option<TransactionRow> = sqlx::query_as(&sql)
            .bind(to.as_str())
            .bind(id.to_string())
            .bind(from.as_str())
            .fetch_optional(&mut *self.tx)
            .await?;
        row.map(LedgerEntry::try_from).transpose()
    }

    async fn count_admins(&mut self) -> Result<usize> {
        // Aggregates cannot take FOR UPDATE, so lock the rows and count them here.
        let sql = format!("SELECT id FROM {} WHERE is_admin FOR UPDATE", table::USERS);
        let ids: Vec<Uuid> = sqlx::query_scalar(&sql)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(ids.len())
    }

    async fn set_admin(&mut self, user_id: &UserId, is_admin: bool) -> Result<Option<User>> {
        let sql = format!(
            "UPDATE {} SET is_admin = $1, updated_at = NOW() WHERE id = $2 \
             RETURNING {USER_COLUMNS}",
            table::USERS
        );
        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(is_admin)
            .bind(user_id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(row.map(User::from))
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
