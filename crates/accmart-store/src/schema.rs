//! Database schema definitions.
//!
//! Table names and the column lists shared by the PostgreSQL queries. The DDL
//! itself lives in `migrations/`.

/// Table names.
pub mod table {
    /// Users and their wallet balances, keyed by `id`.
    pub const USERS: &str = "users";

    /// Listed products, keyed by `id`.
    pub const PRODUCTS: &str = "products";

    /// Sales, keyed by `id`, unique on `product_id`.
    pub const PURCHASES: &str = "purchases";

    /// Ledger entries, keyed by `id` (ULID), unique on `(user_id, reference)`.
    pub const TRANSACTIONS: &str = "transactions";
}

/// Columns selected for a `User`.
pub const USER_COLUMNS: &str =
    "id, email, first_name, last_name, profile_image_url, wallet_balance, is_admin, created_at, updated_at";

/// Columns selected for a `Product`.
pub const PRODUCT_COLUMNS: &str = "id, title, description, category, images, price, status, \
     account_username, account_password, account_email, account_notes, created_at";

/// Columns selected for a `Purchase`.
pub const PURCHASE_COLUMNS: &str = "id, user_id, product_id, amount, purchased_at";

/// Columns selected for a `LedgerEntry`.
pub const TRANSACTION_COLUMNS: &str =
    "id, user_id, type, amount, status, reference, metadata, created_at, updated_at";
