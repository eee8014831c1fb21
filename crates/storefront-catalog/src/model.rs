//! Domain Models
//!
//! Catalog entities as the storefront and checkout see them.
//! Prices are `rust_decimal::Decimal` in major units; a missing price means
//! the product cannot be bought on that currency's rail.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::{CatalogError, Result};

const MAX_USERNAME_LEN: usize = 50;

/// A digital product listed by a creator
#[derive(Clone, Debug, Serialize)]
pub struct Product {
    /// Product identifier
    pub id: String,

    /// Owning creator's user id
    #[serde(skip_serializing)]
    pub owner_id: String,

    /// Display title
    pub title: String,

    /// Optional long description
    pub description: Option<String>,

    /// Price in US dollars (card rail)
    #[serde(with = "rust_decimal::serde::float_option")]
    pub price_usd: Option<Decimal>,

    /// Price in Brazilian reais (regional rail)
    #[serde(with = "rust_decimal::serde::float_option")]
    pub price_brl: Option<Decimal>,

    /// Cover image
    pub image_url: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl Product {
    pub fn new(id: impl Into<String>, owner_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            owner_id: owner_id.into(),
            title: title.into(),
            description: None,
            price_usd: None,
            price_brl: None,
            image_url: None,
            created_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_price_usd(mut self, price: Decimal) -> Self {
        self.price_usd = Some(price);
        self
    }

    #[must_use]
    pub fn with_price_brl(mut self, price: Decimal) -> Self {
        self.price_brl = Some(price);
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Public profile of a creator
#[derive(Clone, Debug, Serialize)]
pub struct Creator {
    pub id: String,
    pub name: Option<String>,
    pub username: String,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
}

impl Creator {
    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            username: username.into(),
            bio: None,
            avatar_url: None,
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// A creator's public storefront: profile plus listed products
#[derive(Clone, Debug, Serialize)]
pub struct Storefront {
    pub user: Creator,
    pub products: Vec<Product>,
    pub total_products: usize,
}

impl Storefront {
    pub fn new(user: Creator, products: Vec<Product>) -> Self {
        let total_products = products.len();
        Self {
            user,
            products,
            total_products,
        }
    }
}

/// Check a username taken from a public URL before it reaches storage.
///
/// Accepts 1-50 characters of ASCII letters, digits, `_`, `-` and `.`.
pub fn validate_username(username: &str) -> Result<&str> {
    let username = username.trim();

    if username.is_empty() || username.len() > MAX_USERNAME_LEN {
        return Err(CatalogError::InvalidUsername(format!(
            "length must be between 1 and {MAX_USERNAME_LEN}"
        )));
    }

    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        return Err(CatalogError::InvalidUsername(
            "only letters, digits, '_', '-' and '.' are allowed".into(),
        ));
    }

    Ok(username)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_product_json_hides_owner() {
        let product = Product::new("p1", "u1", "Preset pack").with_price_usd(dec!(9.99));
        let json = serde_json::to_value(&product).unwrap();

        assert!(json.get("owner_id").is_none());
        assert_eq!(json["title"], "Preset pack");
        assert!(json["price_brl"].is_null());
        assert!((json["price_usd"].as_f64().unwrap() - 9.99).abs() < 1e-9);
    }

    #[test]
    fn test_username_validation() {
        assert_eq!(validate_username("ana.designs").unwrap(), "ana.designs");
        assert_eq!(validate_username("  bob_99 ").unwrap(), "bob_99");
        assert!(validate_username("").is_err());
        assert!(validate_username("   ").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username("drop;table").is_err());
        assert!(validate_username(&"a".repeat(51)).is_err());
    }

    #[test]
    fn test_storefront_counts_products() {
        let store = Storefront::new(
            Creator::new("u1", "ana"),
            vec![Product::new("p1", "u1", "A"), Product::new("p2", "u1", "B")],
        );
        assert_eq!(store.total_products, 2);
    }
}
