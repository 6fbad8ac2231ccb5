//! Product (listed account) types.
//!
//! A product carries display data plus a credential bundle. The credentials are
//! only ever shown to the buyer and to admins; everything else sees a
//! [`ProductListing`].

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Rejection, Result};
use crate::ProductId;

/// Highest price a product can be listed at, in wallet units.
pub const MAX_PRODUCT_PRICE: i64 = 100_000_000;

/// A product listed for sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Product id.
    pub id: ProductId,
    /// Listing title.
    pub title: String,
    /// Listing description.
    pub description: String,
    /// Category name (e.g. "instagram").
    pub category: String,
    /// Image URLs.
    pub images: Vec<String>,
    /// Price in wallet units. Always positive.
    pub price: i64,
    /// Availability.
    pub status: ProductStatus,
    /// The goods themselves.
    pub credentials: ProductCredentials,
    /// When the product was listed.
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Whether the product can still be bought.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.status == ProductStatus::Available
    }

    /// The public view of this product, without credentials.
    #[must_use]
    pub fn listing(&self) -> ProductListing {
        ProductListing {
            id: self.id,
            title: self.title.clone(),
            description: self.description.clone(),
            category: self.category.clone(),
            images: self.images.clone(),
            price: self.price,
            status: self.status,
            created_at: self.created_at,
        }
    }
}

/// Credential bundle delivered on purchase.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductCredentials {
    /// Account username.
    pub username: String,
    /// Account password.
    pub password: String,
    /// Recovery email, if any.
    #[serde(default)]
    pub email: Option<String>,
    /// Extra delivery notes.
    #[serde(default)]
    pub notes: Option<String>,
}

impl std::fmt::Debug for ProductCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProductCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Public, credential-free view of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductListing {
    /// Product id.
    pub id: ProductId,
    /// Listing title.
    pub title: String,
    /// Listing description.
    pub description: String,
    /// Category name.
    pub category: String,
    /// Image URLs.
    pub images: Vec<String>,
    /// Price in wallet units.
    pub price: i64,
    /// Availability.
    pub status: ProductStatus,
    /// When the product was listed.
    pub created_at: DateTime<Utc>,
}

/// Availability of a product. `Sold` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    /// Listed and purchasable.
    Available,
    /// Sold to exactly one buyer.
    Sold,
}

impl ProductStatus {
    /// Database and wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Sold => "sold",
        }
    }
}

impl FromStr for ProductStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "available" => Ok(Self::Available),
            "sold" => Ok(Self::Sold),
            other => Err(format!("unknown product status: {other}")),
        }
    }
}

/// Input for listing a new product.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    /// Listing title.
    pub title: String,
    /// Listing description.
    #[serde(default)]
    pub description: String,
    /// Category name.
    pub category: String,
    /// Image URLs.
    #[serde(default)]
    pub images: Vec<String>,
    /// Price in wallet units.
    pub price: i64,
    /// The goods.
    pub credentials: ProductCredentials,
}

impl NewProduct {
    /// Turn the input into an available product.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPrice` unless the price is positive, and `PriceTooHigh`
    /// above [`MAX_PRODUCT_PRICE`].
    pub fn into_product(self) -> Result<Product> {
        if self.price <= 0 {
            return Err(Rejection::InvalidPrice);
        }
        if self.price > MAX_PRODUCT_PRICE {
            return Err(Rejection::PriceTooHigh {
                max: MAX_PRODUCT_PRICE,
            });
        }
        Ok(Product {
            id: ProductId::generate(),
            title: self.title,
            description: self.description,
            category: self.category,
            images: self.images,
            price: self.price,
            status: ProductStatus::Available,
            credentials: self.credentials,
            created_at: Utc::now(),
        })
    }
}
