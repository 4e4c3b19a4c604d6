//! Core abstractions for the docglue object-document mapping layer.
//!
//! This crate defines the pieces every backend and every application model
//! shares:
//!
//! - [`property`]: typed field descriptors and their app/store conversions
//! - [`schema`]: per-model collection path templates and property sets
//! - [`model`]: instance state, lifecycle hooks and field accessors
//! - [`query`]: predicate and sort construction
//! - [`client`]: the [`StoreClient`](client::StoreClient) backend trait
//! - [`collection`] / [`store`]: the typed operation surface
//! - [`error`]: the [`GlueError`](error::GlueError) taxonomy
//!
//! A model is an ordinary struct wrapping a [`ModelState`](model::ModelState)
//! plus a `'static` schema:
//!
//! ```ignore
//! use std::sync::LazyLock;
//! use docglue_core::model::{Model, ModelExt, ModelState};
//! use docglue_core::property::{IntegerProperty, StringProperty};
//! use docglue_core::schema::ModelSchema;
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
//! ```

pub mod client;
pub mod collection;
pub mod error;
pub mod model;
pub mod property;
pub mod query;
pub mod schema;
pub mod store;
pub mod value;
