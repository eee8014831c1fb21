//! Catalog Storage
//!
//! The `Catalog` trait is the only way the rest of the system reads products
//! and creators. Implementations must be side-effect free.

mod memory;
mod postgres;

pub use memory::MemoryCatalog;
pub use postgres::PostgresCatalog;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{Creator, Product, Storefront, validate_username};

/// Catalog backend (Strategy pattern)
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Resolve a product id. `Ok(None)` means the product does not exist.
    async fn find_product(&self, product_id: &str) -> Result<Option<Product>>;

    /// Resolve a creator by public username
    async fn find_creator(&self, username: &str) -> Result<Option<Creator>>;

    /// All products owned by a creator, newest first
    async fn products_by_owner(&self, owner_id: &str) -> Result<Vec<Product>>;

    /// Public storefront for a username.
    ///
    /// Fails with `InvalidUsername` before touching storage when the
    /// username is malformed.
    async fn storefront(&self, username: &str) -> Result<Option<Storefront>> {
        let username = validate_username(username)?;

        let Some(creator) = self.find_creator(username).await? else {
            return Ok(None);
        };

        let products = self.products_by_owner(&creator.id).await?;
        Ok(Some(Storefront::new(creator, products)))
    }

    /// Check if the backing store is reachable
    async fn health_check(&self) -> bool;

    /// Backend name
    fn name(&self) -> &str;
}
