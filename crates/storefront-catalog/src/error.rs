//! Error Types for the Catalog

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CatalogError>;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid username: {0}")]
    InvalidUsername(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl CatalogError {
    /// Whether the caller sent something malformed (as opposed to a storage fault)
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidUsername(_))
    }
}
