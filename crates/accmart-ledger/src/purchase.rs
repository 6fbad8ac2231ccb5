//! Single-item and cart purchases.

use serde::Serialize;
use serde_json::json;

use accmart_core::{LedgerEntry, Product, ProductId, Purchase, Rejection, UserId};
use accmart_store::{LedgerTx, Store};

use crate::Result;

/// Outcome of a single-item purchase.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseReceipt {
    /// The recorded sale.
    pub purchase: Purchase,
    /// Wallet balance after the debit.
    pub new_balance: i64,
}

/// Outcome of a cart checkout.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkReceipt {
    /// One sale per product bought.
    pub purchases: Vec<Purchase>,
    /// Wallet balance after the debit.
    pub new_balance: i64,
    /// Number of products bought.
    pub success_count: usize,
    /// Requested products that were missing, already sold, or lost to a concurrent buyer.
    pub failed_products: Vec<ProductId>,
}

/// Buy one product from the wallet.
///
/// # Errors
///
/// Returns a rejection when the user or product is missing, the product is
/// sold (before or during the call) or the wallet cannot cover the price.
/// Nothing is written in that case.
pub async fn purchase(
    store: &dyn Store,
    user_id: &UserId,
    product_id: &ProductId,
) -> Result<PurchaseReceipt> {
    let mut tx = store.begin().await?;

    let user = tx.get_user(user_id).await?.ok_or(Rejection::UserNotFound)?;
    let product = tx
        .get_product(product_id)
        .await?
        .ok_or(Rejection::ProductNotFound)?;
    if !product.is_available() {
        return Err(Rejection::ProductNotAvailable.into());
    }
    if !user.has_sufficient_balance(product.price) {
        tracing::debug!(
            user_id = %user_id,
            product_id = %product_id,
            balance = user.wallet_balance,
            price = product.price,
            "Purchase refused: insufficient balance"
        );
        return Err(Rejection::InsufficientBalance {
            balance: user.wallet_balance,
            required: product.price,
        }
        .into());
    }

    if !tx.mark_sold_if_available(product_id).await? {
        tracing::info!(
            user_id = %user_id,
            product_id = %product_id,
            "Purchase lost race for product"
        );
        return Err(Rejection::PurchasedConcurrently.into());
    }

    let new_balance = debit(tx.as_mut(), user_id, product.price, user.wallet_balance).await?;
    let purchase = record_sale(
        tx.as_mut(),
        user_id,
        &product,
        json!({ "productId": product.id, "productTitle": product.title }),
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        user_id = %user_id,
        product_id = %product_id,
        purchase_id = %purchase.id,
        amount = product.price,
        new_balance,
        "Product purchased"
    );

    Ok(PurchaseReceipt {
        purchase,
        new_balance,
    })
}

/// Buy every still-available product of a cart with one debit.
///
/// Duplicate ids are collapsed, keeping first-occurrence order. Products that
/// are missing, sold, or sold to someone else mid-checkout are reported in
/// `failed_products`; the rest are bought and only they are paid for.
///
/// # Errors
///
/// Returns a rejection for an empty cart, when nothing in the cart can be
/// bought, or when the wallet cannot cover the available products.
pub async fn purchase_bulk(
    store: &dyn Store,
    user_id: &UserId,
    product_ids: &[ProductId],
) -> Result<BulkReceipt> {
    let mut requested: Vec<ProductId> = Vec::with_capacity(product_ids.len());
    for id in product_ids {
        if !requested.contains(id) {
            requested.push(*id);
        }
    }
    if requested.is_empty() {
        return Err(Rejection::EmptyCart.into());
    }

    let mut tx = store.begin().await?;

    let user = tx.get_user(user_id).await?.ok_or(Rejection::UserNotFound)?;
    let found = tx.get_products(&requested).await?;

    let available: Vec<Product> = requested
        .iter()
        .filter_map(|id| found.iter().find(|p| p.id == *id && p.is_available()))
        .cloned()
        .collect();
    if available.is_empty() {
        return Err(Rejection::NoAvailableProducts.into());
    }

    let total = cart_total(&available).ok_or(Rejection::InsufficientBalance {
        balance: user.wallet_balance,
        required: i64::MAX,
    })?;
    if !user.has_sufficient_balance(total) {
        return Err(Rejection::InsufficientBalance {
            balance: user.wallet_balance,
            required: total,
        }
        .into());
    }

    // Row locks are taken in id order so overlapping carts queue instead of deadlocking.
    let mut lock_order: Vec<&Product> = available.iter().collect();
    lock_order.sort_by_key(|p| p.id);
    let mut lost = Vec::new();
    for product in lock_order {
        if !tx.mark_sold_if_available(&product.id).await? {
            tracing::info!(
                user_id = %user_id,
                product_id = %product.id,
                "Cart item lost race for product"
            );
            lost.push(product.id);
        }
    }

    let won: Vec<Product> = available
        .into_iter()
        .filter(|p| !lost.contains(&p.id))
        .collect();
    if won.is_empty() {
        return Err(Rejection::NoAvailableProducts.into());
    }
    let failed_products: Vec<ProductId> = requested
        .into_iter()
        .filter(|id| !won.iter().any(|p| p.id == *id))
        .collect();

    // Never more than `total`, which already fit in an i64.
    let charged = cart_total(&won).unwrap_or(total);
    let new_balance = debit(tx.as_mut(), user_id, charged, user.wallet_balance).await?;

    let cart_size = won.len();
    let mut purchases = Vec::with_capacity(cart_size);
    for product in &won {
        let metadata = json!({
            "productId": product.id,
            "productTitle": product.title,
            "cartSize": cart_size,
        });
        purchases.push(record_sale(tx.as_mut(), user_id, product, metadata).await?);
    }

    tx.commit().await?;

    tracing::info!(
        user_id = %user_id,
        success_count = cart_size,
        failed_count = failed_products.len(),
        amount = charged,
        new_balance,
        "Cart checked out"
    );

    Ok(BulkReceipt {
        purchases,
        new_balance,
        success_count: cart_size,
        failed_products,
    })
}

/// Sum of the prices, or `None` if it does not fit in an `i64`.
fn cart_total(products: &[Product]) -> Option<i64> {
    products
        .iter()
        .try_fold(0i64, |sum, product| sum.checked_add(product.price))
}

/// Guarded debit. A miss means another request drained the wallet after our read.
async fn debit(
    tx: &mut dyn LedgerTx,
    user_id: &UserId,
    amount: i64,
    seen_balance: i64,
) -> Result<i64> {
    match tx.debit_wallet(user_id, amount).await? {
        Some(balance) => Ok(balance),
        None => Err(Rejection::InsufficientBalance {
            balance: seen_balance,
            required: amount,
        }
        .into()),
    }
}

async fn record_sale(
    tx: &mut dyn LedgerTx,
    user_id: &UserId,
    product: &Product,
    metadata: serde_json::Value,
) -> Result<Purchase> {
    let purchase = Purchase::new(*user_id, product.id, product.price);
    tx.insert_purchase(&purchase).await?;
    tx.insert_entry(&LedgerEntry::purchase(&purchase, metadata))
        .await?;
    Ok(purchase)
}

#[cfg(test)]
mod tests {
    use super::*;
    use accmart_core::{NewProduct, ProductCredentials, ProductStatus, User, UserProfile};
    use accmart_store::MemoryStore;

    async fn seed_user(store: &MemoryStore, balance: i64) -> UserId {
        let mut user = User::new(UserProfile {
            id: UserId::generate(),
            email: "buyer@example.com".into(),
            first_name: None,
            last_name: None,
            profile_image_url: None,
        });
        user.wallet_balance = balance;
        let id = user.id;
        store.put_user(user).await;
        id
    }

    async fn seed_product(store: &MemoryStore, price: i64) -> ProductId {
        let product = NewProduct {
            title: "Canva Pro".into(),
            description: String::new(),
            category: "design".into(),
            images: vec![],
            price,
            credentials: ProductCredentials {
                username: "canva".into(),
                password: "pw".into(),
                email: None,
                notes: None,
            },
        }
        .into_product()
        .unwrap();
        store.insert_product(&product).await.unwrap();
        product.id
    }

    #[tokio::test]
    async fn purchase_debits_and_marks_sold() {
        let store = MemoryStore::new();
        let user = seed_user(&store, 5000).await;
        let product = seed_product(&store, 3000).await;

        let receipt = purchase(&store, &user, &product).await.unwrap();
        assert_eq!(receipt.new_balance, 2000);
        assert_eq!(receipt.purchase.amount, 3000);

        let product = store.get_product(&product).await.unwrap().unwrap();
        assert_eq!(product.status, ProductStatus::Sold);

        let entries = store.list_entries_by_user(&user, 10, 0).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].amount, -3000);
        assert_eq!(entries[0].metadata["productTitle"], "Canva Pro");
    }

    #[tokio::test]
    async fn purchase_of_missing_product_is_rejected() {
        let store = MemoryStore::new();
        let user = seed_user(&store, 5000).await;

        let err = purchase(&store, &user, &ProductId::generate())
            .await
            .unwrap_err();
        assert_eq!(err.rejection(), Some(&Rejection::ProductNotFound));
    }

    #[tokio::test]
    async fn purchase_by_unknown_user_is_rejected() {
        let store = MemoryStore::new();
        let product = seed_product(&store, 100).await;

        let err = purchase(&store, &UserId::generate(), &product)
            .await
            .unwrap_err();
        assert_eq!(err.rejection(), Some(&Rejection::UserNotFound));
    }

    #[tokio::test]
    async fn insufficient_balance_mutates_nothing() {
        let store = MemoryStore::new();
        let user = seed_user(&store, 999).await;
        let product = seed_product(&store, 1000).await;

        let err = purchase(&store, &user, &product).await.unwrap_err();
        assert!(matches!(
            err.rejection(),
            Some(Rejection::InsufficientBalance {
                balance: 999,
                required: 1000
            })
        ));

        let product = store.get_product(&product).await.unwrap().unwrap();
        assert!(product.is_available());
        assert!(store.list_purchases().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_cart_is_rejected() {
        let store = MemoryStore::new();
        let user = seed_user(&store, 100).await;

        let err = purchase_bulk(&store, &user, &[]).await.unwrap_err();
        assert_eq!(err.rejection(), Some(&Rejection::EmptyCart));
    }

    #[tokio::test]
    async fn cart_duplicates_are_bought_once() {
        let store = MemoryStore::new();
        let user = seed_user(&store, 1000).await;
        let product = seed_product(&store, 400).await;

        let receipt = purchase_bulk(&store, &user, &[product, product])
            .await
            .unwrap();
        assert_eq!(receipt.success_count, 1);
        assert_eq!(receipt.new_balance, 600);
        assert!(receipt.failed_products.is_empty());
    }

    #[tokio::test]
    async fn cart_reports_sold_and_missing_products() {
        let store = MemoryStore::new();
        let user = seed_user(&store, 1000).await;
        let keep = seed_product(&store, 300).await;
        let sold = seed_product(&store, 200).await;
        let missing = ProductId::generate();

        let other = seed_user(&store, 1000).await;
        purchase(&store, &other, &sold).await.unwrap();

        let receipt = purchase_bulk(&store, &user, &[keep, sold, missing])
            .await
            .unwrap();
        assert_eq!(receipt.success_count, 1);
        assert_eq!(receipt.new_balance, 700);
        assert_eq!(receipt.failed_products, vec![sold, missing]);

        let entries = store.list_entries_by_user(&user, 10, 0).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].metadata["cartSize"], 1);
    }

    #[tokio::test]
    async fn cart_with_nothing_available_is_rejected() {
        let store = MemoryStore::new();
        let user = seed_user(&store, 1000).await;

        let err = purchase_bulk(&store, &user, &[ProductId::generate()])
            .await
            .unwrap_err();
        assert_eq!(err.rejection(), Some(&Rejection::NoAvailableProducts));
    }

    #[tokio::test]
    async fn cart_total_must_be_covered() {
        let store = MemoryStore::new();
        let user = seed_user(&store, 500).await;
        let a = seed_product(&store, 300).await;
        let b = seed_product(&store, 300).await;

        let err = purchase_bulk(&store, &user, &[a, b]).await.unwrap_err();
        assert!(matches!(
            err.rejection(),
            Some(Rejection::InsufficientBalance { required: 600, .. })
        ));
        assert_eq!(store.product_counts().await.unwrap().available, 2);
    }

    #[tokio::test]
    async fn cart_total_overflow_is_rejected() {
        let store = MemoryStore::new();
        let user = seed_user(&store, 0).await;
        let mut cart = Vec::new();
        for _ in 0..2 {
            let id = seed_product(&store, 1).await;
            let mut product = store.get_product(&id).await.unwrap().unwrap();
            product.id = ProductId::generate();
            product.price = i64::MAX / 2 + 1;
            store.insert_product(&product).await.unwrap();
            cart.push(product.id);
        }

        let err = purchase_bulk(&store, &user, &cart).await.unwrap_err();
        assert!(matches!(
            err.rejection(),
            Some(Rejection::InsufficientBalance { balance: 0, .. })
        ));
        assert_eq!(store.product_counts().await.unwrap().sold, 0);
        assert_eq!(store.get_user(&user).await.unwrap().unwrap().wallet_balance, 0);
        assert!(store.list_purchases().await.unwrap().is_empty());
    }
}
