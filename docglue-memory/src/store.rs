//! In-memory storage implementation of the store client.
//!
//! Documents live in nested maps behind an async-aware read-write lock,
//! keyed by their full collection path.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use bson::Document;
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use mea::rwlock::RwLock;

use docglue_core::client::{RawDocument, StoreClient};
use docglue_core::error::{GlueError, GlueResult};
use docglue_core::query::{Query, QueryTarget};

use crate::evaluator::{compare_documents, matches_filters};

type CollectionMap = BTreeMap<String, Document>;
type StoreMap = BTreeMap<String, CollectionMap>;

/// Thread-safe in-memory document store.
///
/// Collections are keyed by their full path (`"rooms/room1/messages"`), so
/// the hierarchical document model comes out naturally. The instance is
/// cheaply cloneable; clones share the same underlying data.
///
/// Queries scan every document of the targeted collections (no indexing),
/// which is fine for the development and test workloads this client is for.
///
/// # Example
///
/// ```ignore
/// use docglue::memory::InMemoryClient;
/// use docglue::store::ModelStore;
///
/// let store = ModelStore::new(InMemoryClient::new());
/// let fruits = store.model::<Fruit>();
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryClient {
    /// collection path -> (document id -> fields)
    store: Arc<RwLock<StoreMap>>,
}

impl InMemoryClient {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn split_document_path(path: &str) -> GlueResult<(&str, &str)> {
    path.rsplit_once('/').ok_or_else(|| {
        GlueError::Programming(format!("not a document path: {path:?}"))
    })
}

fn last_segment(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

impl InMemoryClient {
    fn collect_query(
        store: &StoreMap,
        target: &QueryTarget,
        query: &Query,
    ) -> Vec<RawDocument> {
        let mut matched: Vec<RawDocument> = Vec::new();
        let collections: Vec<(&String, &CollectionMap)> = match target {
            QueryTarget::Collection(path) => {
                store.get_key_value(path).into_iter().collect()
            }
            QueryTarget::CollectionGroup(name) => store
                .iter()
                .filter(|(path, _)| last_segment(path) == name)
                .collect(),
        };
        for (path, docs) in collections {
            for (doc_id, fields) in docs {
                if matches_filters(fields, &query.filters) {
                    matched.push(RawDocument {
                        path: format!("{path}/{doc_id}"),
                        fields: fields.clone(),
                    });
                }
            }
        }
        if !query.sort.is_empty() {
            matched.sort_by(|a, b| compare_documents(&a.fields, &b.fields, &query.sort));
        }
        matched
            .into_iter()
            .skip(query.offset.unwrap_or(0))
            .take(query.limit.unwrap_or(usize::MAX))
            .collect()
    }
}

#[async_trait]
impl StoreClient for InMemoryClient {
    async fn get_document(&self, path: &str) -> GlueResult<Option<RawDocument>> {
        let (collection, doc_id) = split_document_path(path)?;
        let store = self.store.read().await;
        Ok(store
            .get(collection)
            .and_then(|docs| docs.get(doc_id))
            .map(|fields| RawDocument {
                path: path.to_string(),
                fields: fields.clone(),
            }))
    }

    async fn get_documents(
        &self,
        collection: &str,
        doc_ids: &[String],
    ) -> GlueResult<Vec<RawDocument>> {
        let store = self.store.read().await;
        let Some(docs) = store.get(collection) else {
            return Ok(Vec::new());
        };
        Ok(doc_ids
            .iter()
            .filter_map(|doc_id| {
                docs.get(doc_id).map(|fields| RawDocument {
                    path: format!("{collection}/{doc_id}"),
                    fields: fields.clone(),
                })
            })
            .collect())
    }

    async fn add_document(&self, collection: &str, fields: Document) -> GlueResult<String> {
        let doc_id = uuid::Uuid::new_v4().simple().to_string();
        let mut store = self.store.write().await;
        store
            .entry(collection.to_string())
            .or_default()
            .insert(doc_id.clone(), fields);
        Ok(doc_id)
    }

    async fn set_document(&self, path: &str, fields: Document) -> GlueResult<()> {
        let (collection, doc_id) = split_document_path(path)?;
        let mut store = self.store.write().await;
        store
            .entry(collection.to_string())
            .or_default()
            .insert(doc_id.to_string(), fields);
        Ok(())
    }

    async fn update_document(&self, path: &str, fields: Document) -> GlueResult<()> {
        let (collection, doc_id) = split_document_path(path)?;
        let mut store = self.store.write().await;
        let existing = store
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(doc_id))
            .ok_or_else(|| {
                GlueError::DocumentNotFound(doc_id.to_string(), collection.to_string())
            })?;
        for (key, value) in fields {
            existing.insert(key, value);
        }
        Ok(())
    }

    async fn delete_document(&self, path: &str) -> GlueResult<()> {
        let (collection, doc_id) = split_document_path(path)?;
        let mut store = self.store.write().await;
        if let Some(docs) = store.get_mut(collection) {
            docs.remove(doc_id);
            if docs.is_empty() {
                store.remove(collection);
            }
        }
        Ok(())
    }

    async fn list_collections(&self, doc_path: &str) -> GlueResult<Vec<String>> {
        let prefix = format!("{doc_path}/");
        let store = self.store.read().await;
        Ok(store
            .keys()
            .filter(|path| {
                path.strip_prefix(&prefix)
                    .is_some_and(|rest| !rest.is_empty() && !rest.contains('/'))
            })
            .cloned()
            .collect())
    }

    async fn list_document_ids(&self, collection: &str) -> GlueResult<Vec<String>> {
        let store = self.store.read().await;
        Ok(store
            .get(collection)
            .map(|docs| docs.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn run_query(
        &self,
        target: &QueryTarget,
        query: &Query,
    ) -> GlueResult<Vec<RawDocument>> {
        let store = self.store.read().await;
        Ok(Self::collect_query(&store, target, query))
    }

    fn stream_query(
        &self,
        target: &QueryTarget,
        query: &Query,
    ) -> BoxStream<'_, GlueResult<RawDocument>> {
        let target = target.clone();
        let query = query.clone();
        Box::pin(
            stream::once(async move { self.run_query(&target, &query).await }).flat_map(
                |result| {
                    let items: Vec<GlueResult<RawDocument>> = match result {
                        Ok(docs) => docs.into_iter().map(Ok).collect(),
                        Err(err) => vec![Err(err)],
                    };
                    stream::iter(items)
                },
            ),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use docglue_core::query::{FieldFilter, FilterOp, SortDirection};
    use futures::executor::block_on;

    #[test]
    fn set_get_delete_round_trip() {
        block_on(async {
            let client = InMemoryClient::new();
            client
                .set_document("fruits/f1", doc! { "name": "apple" })
                .await
                .unwrap();
            let raw = client.get_document("fruits/f1").await.unwrap().unwrap();
            assert_eq!(raw.doc_id(), "f1");
            assert_eq!(raw.fields, doc! { "name": "apple" });

            client.delete_document("fruits/f1").await.unwrap();
            assert!(client.get_document("fruits/f1").await.unwrap().is_none());
            // idempotent
            client.delete_document("fruits/f1").await.unwrap();
        });
    }

    #[test]
    fn add_assigns_a_fresh_id() {
        block_on(async {
            let client = InMemoryClient::new();
            let id = client
                .add_document("fruits", doc! { "name": "pear" })
                .await
                .unwrap();
            assert!(!id.is_empty());
            assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
            let ids = client.list_document_ids("fruits").await.unwrap();
            assert_eq!(ids, vec![id]);
        });
    }

    #[test]
    fn update_merges_and_requires_existence() {
        block_on(async {
            let client = InMemoryClient::new();
            client
                .set_document("fruits/f1", doc! { "name": "apple", "price": 100i64 })
                .await
                .unwrap();
            client
                .update_document("fruits/f1", doc! { "price": 200i64 })
                .await
                .unwrap();
            let raw = client.get_document("fruits/f1").await.unwrap().unwrap();
            assert_eq!(raw.fields, doc! { "name": "apple", "price": 200i64 });

            let err = client
                .update_document("fruits/f2", doc! { "price": 1i64 })
                .await
                .unwrap_err();
            assert!(matches!(err, GlueError::DocumentNotFound(..)));
        });
    }

    #[test]
    fn lists_direct_subcollections_only() {
        block_on(async {
            let client = InMemoryClient::new();
            client
                .set_document("rooms/r1/messages/m1", doc! {})
                .await
                .unwrap();
            client
                .set_document("rooms/r1/messages/m1/reactions/x1", doc! {})
                .await
                .unwrap();
            client.set_document("rooms/r1/members/u1", doc! {}).await.unwrap();

            let collections = client.list_collections("rooms/r1").await.unwrap();
            assert_eq!(collections, vec!["rooms/r1/members", "rooms/r1/messages"]);
        });
    }

    #[test]
    fn queries_filter_sort_and_paginate() {
        block_on(async {
            let client = InMemoryClient::new();
            for (id, name, price) in [
                ("f1", "apple", 100i64),
                ("f2", "banana", 50i64),
                ("f3", "cherry", 300i64),
            ] {
                client
                    .set_document(
                        &format!("fruits/{id}"),
                        doc! { "name": name, "price": price },
                    )
                    .await
                    .unwrap();
            }

            let query = Query::builder()
                .filter(FieldFilter {
                    field: "price".to_string(),
                    op: FilterOp::Gte,
                    value: 100i64.into(),
                })
                .sort("price", SortDirection::Desc)
                .build();
            let target = QueryTarget::Collection("fruits".to_string());
            let docs = client.run_query(&target, &query).await.unwrap();
            let names: Vec<_> = docs
                .iter()
                .map(|d| d.fields.get_str("name").unwrap())
                .collect();
            assert_eq!(names, vec!["cherry", "apple"]);

            let query = Query::builder().sort("price", SortDirection::Asc).offset(1).limit(1).build();
            let docs = client.run_query(&target, &query).await.unwrap();
            assert_eq!(docs[0].fields.get_str("name").unwrap(), "apple");
        });
    }

    #[test]
    fn collection_group_spans_parents() {
        block_on(async {
            let client = InMemoryClient::new();
            client
                .set_document("rooms/r1/messages/m1", doc! { "body": "hi" })
                .await
                .unwrap();
            client
                .set_document("rooms/r2/messages/m2", doc! { "body": "yo" })
                .await
                .unwrap();

            let target = QueryTarget::CollectionGroup("messages".to_string());
            let docs = client.run_query(&target, &Query::new()).await.unwrap();
            assert_eq!(docs.len(), 2);
            assert_eq!(docs[0].path, "rooms/r1/messages/m1");
            assert_eq!(docs[1].path, "rooms/r2/messages/m2");
        });
    }

    #[test]
    fn stream_yields_each_document() {
        block_on(async {
            let client = InMemoryClient::new();
            client.set_document("fruits/f1", doc! { "n": 1i64 }).await.unwrap();
            client.set_document("fruits/f2", doc! { "n": 2i64 }).await.unwrap();

            let target = QueryTarget::Collection("fruits".to_string());
            let query = Query::new();
            let docs: Vec<_> = client
                .stream_query(&target, &query)
                .collect::<Vec<_>>()
                .await;
            assert_eq!(docs.len(), 2);
            assert!(docs.iter().all(|d| d.is_ok()));
        });
    }
}
