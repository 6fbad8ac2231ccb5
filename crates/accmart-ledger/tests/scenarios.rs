//! End-to-end wallet scenarios.

mod common;

use accmart_core::{ProductStatus, Rejection};
use accmart_ledger::{initialize_deposit, purchase, verify_deposit};
use accmart_store::{MemoryStore, Store};

use common::{balance, seed_product, seed_user, PaidGateway};

#[tokio::test]
async fn second_buyer_finds_product_sold() {
    let store = MemoryStore::new();
    let first = seed_user(&store, 5000).await;
    let second = seed_user(&store, 5000).await;
    let product = seed_product(&store, 3000).await;

    let receipt = purchase(&store, &first, &product).await.unwrap();
    assert_eq!(receipt.new_balance, 2000);
    let sold = store.get_product(&product).await.unwrap().unwrap();
    assert_eq!(sold.status, ProductStatus::Sold);

    let err = purchase(&store, &second, &product).await.unwrap_err();
    assert_eq!(err.rejection(), Some(&Rejection::ProductNotAvailable));
    assert_eq!(err.to_string(), "Product not available");
    assert_eq!(balance(&store, &second).await, 5000);
}

#[tokio::test]
async fn deposit_then_purchase() {
    let store = MemoryStore::new();
    let gateway = PaidGateway::new(4000);
    let user = seed_user(&store, 0).await;
    let product = seed_product(&store, 3500).await;

    let pending = initialize_deposit(&store, &user, 4000).await.unwrap();
    let deposit = verify_deposit(&store, &gateway, &user, &pending.reference, 4000)
        .await
        .unwrap();
    assert_eq!(deposit.new_balance, 4000);
    assert_eq!(deposit.amount, 4000);

    let receipt = purchase(&store, &user, &product).await.unwrap();
    assert_eq!(receipt.new_balance, 500);

    let history = store.list_purchases_by_user(&user).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].product_id, product);
}
