//! In-Memory Catalog
//!
//! For tests and local demos. Holds products and creators in process memory.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::Catalog;
use crate::error::Result;
use crate::model::{Creator, Product};

/// Catalog backed by in-process maps
#[derive(Default)]
pub struct MemoryCatalog {
    products: RwLock<HashMap<String, Product>>,
    creators: RwLock<HashMap<String, Creator>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a product while building the catalog
    #[must_use]
    pub fn with_product(mut self, product: Product) -> Self {
        self.products.get_mut().insert(product.id.clone(), product);
        self
    }

    /// Seed a creator while building the catalog
    #[must_use]
    pub fn with_creator(mut self, creator: Creator) -> Self {
        self.creators
            .get_mut()
            .insert(creator.username.clone(), creator);
        self
    }

    pub async fn insert_product(&self, product: Product) {
        self.products
            .write()
            .await
            .insert(product.id.clone(), product);
    }

    pub async fn insert_creator(&self, creator: Creator) {
        self.creators
            .write()
            .await
            .insert(creator.username.clone(), creator);
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn find_product(&self, product_id: &str) -> Result<Option<Product>> {
        Ok(self.products.read().await.get(product_id).cloned())
    }

    async fn find_creator(&self, username: &str) -> Result<Option<Creator>> {
        Ok(self.creators.read().await.get(username).cloned())
    }

    async fn products_by_owner(&self, owner_id: &str) -> Result<Vec<Product>> {
        let mut products: Vec<Product> = self
            .products
            .read()
            .await
            .values()
            .filter(|p| p.owner_id == owner_id)
            .cloned()
            .collect();

        products.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(products)
    }

    async fn health_check(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "memory"
    }
}
