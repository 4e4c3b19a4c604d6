//! Main docglue crate: a typed object-document mapping layer over
//! hierarchical document stores.
//!
//! This crate is the primary entry point for users of docglue. It re-exports
//! the core model, property and query machinery and bundles the in-memory
//! store client.
//!
//! # Features
//!
//! - **Typed properties** - Schema-described fields with coercion, defaults,
//!   choices, JSON-Schema fragments and custom validators
//! - **Hierarchical collections** - Path templates with parent-id
//!   placeholders, subtree deletion and collection-group queries
//! - **Lifecycle hooks** - Validation and before/after hooks around persist
//!   and delete
//! - **Dict-based editing** - Create, update and upsert straight from
//!   JSON-shaped input with field masks
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::LazyLock;
//! use docglue::prelude::*;
//! use docglue::memory::InMemoryClient;
//!
//! struct Fruit {
//!     state: ModelState,
//! }
//!
//! static FRUIT_SCHEMA: LazyLock<ModelSchema> = LazyLock::new(|| {
//!     ModelSchema::builder("fruits")
//!         .property("name", StringProperty::new().required())
//!         .property("price", IntegerProperty::new().default_value(100))
//!         .build()
//! });
//!
//! impl Model for Fruit {
//!     fn schema() -> &'static ModelSchema {
//!         &FRUIT_SCHEMA
//!     }
//!     fn state(&self) -> &ModelState {
//!         &self.state
//!     }
//!     fn state_mut(&mut self) -> &mut ModelState {
//!         &mut self.state
//!     }
//!     fn from_state(state: ModelState) -> Self {
//!         Fruit { state }
//!     }
//! }
//!
//! # async fn run() -> GlueResult<()> {
//! let store = ModelStore::new(InMemoryClient::new());
//! let fruits = store.model::<Fruit>();
//!
//! let mut fruit = fruits.create();
//! fruit.set("name", "apple")?;
//! fruits.put(&mut fruit).await?;
//!
//! let cheap = fruits
//!     .query(&[Filter::lt("price", 150)], &QueryOptions::default())
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod prelude;

pub use docglue_core::{client, collection, error, model, property, query, schema, store, value};

// Re-export BSON types for convenience
pub use bson;

/// In-memory store client implementations.
pub mod memory {
    pub use docglue_memory::InMemoryClient;
}
