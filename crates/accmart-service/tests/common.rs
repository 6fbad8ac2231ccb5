//! Common test utilities for accmart integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use axum::http::HeaderValue;
use axum_test::TestServer;
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use accmart_core::{NewProduct, Product, ProductCredentials, User, UserId, UserProfile};
use accmart_service::auth::JwtClaims;
use accmart_service::crypto::hmac_sha512_hex;
use accmart_service::{create_router, AppState, ServiceConfig};
use accmart_store::{MemoryStore, Store};

/// Secret the harness signs user JWTs with.
pub const JWT_SECRET: &str = "test-jwt-secret";

/// Paystack secret key used for verification calls and webhook signatures.
pub const PAYSTACK_SECRET: &str = "sk_test_accmart";

/// An admin that can never be demoted.
pub const PROTECTED_ADMIN_EMAIL: &str = "owner@accmart.test";

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// The store behind the server, for seeding and assertions.
    pub store: MemoryStore,
    /// Stand-in for the Paystack API.
    pub paystack: MockServer,
}

impl TestHarness {
    /// Create a new test harness with an empty store.
    pub async fn new() -> Self {
        let paystack = MockServer::start().await;
        let store = MemoryStore::new();

        let config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            auth_jwt_secret: Some(JWT_SECRET.into()),
            paystack_secret_key: Some(PAYSTACK_SECRET.into()),
            paystack_base_url: paystack.uri(),
            protected_admin_emails: vec![PROTECTED_ADMIN_EMAIL.into()],
            ..ServiceConfig::default()
        };

        let state = AppState::new(Arc::new(store.clone()), config);
        let server = TestServer::new(create_router(state)).expect("Failed to create test server");

        Self {
            server,
            store,
            paystack,
        }
    }

    /// Seed a user with a balance and return it.
    pub async fn seed_user(&self, email: &str, balance: i64, is_admin: bool) -> User {
        let mut user = User::new(UserProfile {
            id: UserId::generate(),
            email: email.into(),
            first_name: None,
            last_name: None,
            profile_image_url: None,
        });
        user.wallet_balance = balance;
        user.is_admin = is_admin;
        self.store.put_user(user.clone()).await;
        user
    }

    /// Seed an available product.
    pub async fn seed_product(&self, title: &str, price: i64) -> Product {
        let product = NewProduct {
            title: title.into(),
            description: String::new(),
            category: "instagram".into(),
            images: vec![],
            price,
            credentials: ProductCredentials {
                username: format!("{title}-login"),
                password: "s3cret".into(),
                email: None,
                notes: None,
            },
        }
        .into_product()
        .expect("valid product");
        self.store
            .insert_product(&product)
            .await
            .expect("insert product");
        product
    }

    /// Current wallet balance of a user.
    pub async fn balance(&self, user_id: &UserId) -> i64 {
        self.store
            .get_user(user_id)
            .await
            .expect("get user")
            .expect("user exists")
            .wallet_balance
    }

    /// Make Paystack answer verification of `reference` with a charge.
    pub async fn mock_verification(&self, reference: &str, status: &str, amount_minor: i64) {
        Mock::given(method("GET"))
            .and(path(format!("/transaction/verify/{reference}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": true,
                "message": "Verification successful",
                "data": {
                    "status": status,
                    "reference": reference,
                    "amount": amount_minor,
                    "currency": "NGN"
                }
            })))
            .mount(&self.paystack)
            .await;
    }
}

/// Mint a signed user JWT.
pub fn token_for(user_id: &UserId, email: Option<&str>) -> String {
    let claims = JwtClaims {
        sub: user_id.to_string(),
        email: email.map(String::from),
        aud: Some(json!("authenticated")),
        exp: Utc::now().timestamp() + 3600,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("encode jwt")
}

/// `Authorization` header value for a user.
pub fn bearer(user_id: &UserId) -> HeaderValue {
    bearer_token(&token_for(user_id, None))
}

/// `Authorization` header value for a raw token.
pub fn bearer_token(token: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer {token}")).expect("header value")
}

/// Hex HMAC-SHA512 signature Paystack would send for `body`.
pub fn paystack_signature(body: &str) -> String {
    hmac_sha512_hex(PAYSTACK_SECRET.as_bytes(), body.as_bytes()).expect("hmac")
}
