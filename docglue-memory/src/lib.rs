//! In-memory store client for docglue.
//!
//! This crate provides a thread-safe, in-memory implementation of the
//! [`StoreClient`](docglue_core::client::StoreClient) trait. It keeps whole
//! collection hierarchies behind an async-aware read-write lock and is meant
//! for development, testing and small-scale use.
//!
//! # Quick Start
//!
//! ```ignore
//! use docglue::memory::InMemoryClient;
//! use docglue::store::ModelStore;
//!
//! let store = ModelStore::new(InMemoryClient::new());
//! let fruits = store.model::<Fruit>();
//!
//! let mut fruit = fruits.create();
//! fruit.set("name", "apple")?;
//! fruits.put(&mut fruit).await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as docglue_memory;

pub mod evaluator;
pub mod store;

pub use store::InMemoryClient;
