//! PostgreSQL Catalog
//!
//! Reads the `users` and `products` tables owned by the management side of
//! the application. This module never writes.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;

use super::Catalog;
use crate::error::{CatalogError, Result};
use crate::model::{Creator, Product};

const PRODUCT_COLUMNS: &str =
    "id, user_id, title, description, price_usd, price_brl, image_url, created_at";

/// Catalog backed by a PostgreSQL pool
pub struct PostgresCatalog {
    pool: PgPool,
}

impl PostgresCatalog {
    /// Wrap an existing pool
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool against `database_url`
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        if max_connections == 0 {
            return Err(CatalogError::Config(
                "max_connections must be at least 1".into(),
            ));
        }

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        tracing::info!(max_connections, "Connected to catalog database");
        Ok(Self::new(pool))
    }
}

fn product_from_row(row: &PgRow) -> std::result::Result<Product, sqlx::Error> {
    Ok(Product {
        id: row.try_get("id")?,
        owner_id: row.try_get("user_id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        price_usd: row.try_get("price_usd")?,
        price_brl: row.try_get("price_brl")?,
        image_url: row.try_get("image_url")?,
        created_at: row.try_get("created_at")?,
    })
}

fn creator_from_row(row: &PgRow) -> std::result::Result<Creator, sqlx::Error> {
    Ok(Creator {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        username: row.try_get("username")?,
        bio: row.try_get("bio")?,
        avatar_url: row.try_get("avatar_url")?,
    })
}

#[async_trait]
impl Catalog for PostgresCatalog {
    async fn find_product(&self, product_id: &str) -> Result<Option<Product>> {
        let query = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1");

        let row = sqlx::query(&query)
            .bind(product_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(product_from_row).transpose()?)
    }

    async fn find_creator(&self, username: &str) -> Result<Option<Creator>> {
        let row = sqlx::query(
            "SELECT id, name, username, bio, avatar_url FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(creator_from_row).transpose()?)
    }

    async fn products_by_owner(&self, owner_id: &str) -> Result<Vec<Product>> {
        let query = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE user_id = $1 ORDER BY created_at DESC"
        );

        let rows = sqlx::query(&query)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .map(product_from_row)
            .collect::<std::result::Result<Vec<_>, _>>()?)
    }

    async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }

    fn name(&self) -> &str {
        "postgres"
    }
}
