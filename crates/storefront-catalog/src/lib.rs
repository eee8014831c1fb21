//! # storefront-catalog
//!
//! Read-only access to the creator storefront catalog: products and the
//! creators who own them.
//!
//! The checkout flow only ever reads from here, and it does so before any
//! payment provider is contacted, so unknown products never reach a provider.
//!
//! ```text
//! ┌──────────────┐     ┌────────────────────────┐
//! │   Checkout   │────▶│  Catalog (trait)       │
//! │ Orchestrator │     │  ├─ MemoryCatalog      │
//! └──────────────┘     │  └─ PostgresCatalog    │
//!                      └────────────────────────┘
//! ```

pub mod error;
pub mod model;
pub mod store;

pub use error::{CatalogError, Result};
pub use model::{Creator, Product, Storefront, validate_username};
pub use store::{Catalog, MemoryCatalog, PostgresCatalog};
