//! The backend abstraction every document store implements.
//!
//! A [`StoreClient`] speaks in paths and BSON documents and knows nothing
//! about models: the model layer above it handles property conversion,
//! validation and lifecycle hooks. Paths alternate collection and document
//! segments (`"rooms/room1/messages/msg1"` is a document,
//! `"rooms/room1/messages"` a collection).

use async_trait::async_trait;
use bson::Document;
use futures::stream::BoxStream;
use std::fmt::Debug;
use std::sync::Arc;

use crate::error::GlueResult;
use crate::query::{Query, QueryTarget};

/// A document as the store hands it back: its full path plus its fields.
#[derive(Debug, Clone)]
pub struct RawDocument {
    /// Full document path, e.g. `"rooms/room1/messages/msg1"`.
    pub path: String,
    /// The stored fields.
    pub fields: Document,
}

impl RawDocument {
    /// The document's own id: the last path segment.
    pub fn doc_id(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// Backend interface to a hierarchical document store.
///
/// Writes are per-document atomic; the layer never batches. Implementations
/// must be cheap to share across tasks.
#[async_trait]
pub trait StoreClient: Send + Sync + Debug {
    /// Fetches a single document, or `None` when it does not exist.
    async fn get_document(&self, path: &str) -> GlueResult<Option<RawDocument>>;

    /// Fetches several documents of one collection by id. Missing ids are
    /// simply absent from the result.
    async fn get_documents(
        &self,
        collection: &str,
        doc_ids: &[String],
    ) -> GlueResult<Vec<RawDocument>>;

    /// Inserts a document with a store-assigned id and returns that id.
    async fn add_document(&self, collection: &str, fields: Document) -> GlueResult<String>;

    /// Writes a document at an explicit path, replacing any previous content.
    async fn set_document(&self, path: &str, fields: Document) -> GlueResult<()>;

    /// Merges fields into an existing document, leaving other fields alone.
    ///
    /// Fails with [`DocumentNotFound`](crate::error::GlueError::DocumentNotFound)
    /// when the document does not exist.
    async fn update_document(&self, path: &str, fields: Document) -> GlueResult<()>;

    /// Deletes a document. Deleting an absent document is not an error.
    async fn delete_document(&self, path: &str) -> GlueResult<()>;

    /// Lists the full paths of the subcollections under a document.
    async fn list_collections(&self, doc_path: &str) -> GlueResult<Vec<String>>;

    /// Lists the ids of every document in a collection.
    async fn list_document_ids(&self, collection: &str) -> GlueResult<Vec<String>>;

    /// Runs a query against a collection or collection group and returns the
    /// matching documents.
    async fn run_query(&self, target: &QueryTarget, query: &Query)
        -> GlueResult<Vec<RawDocument>>;

    /// Streams the results of a query one document at a time.
    fn stream_query(
        &self,
        target: &QueryTarget,
        query: &Query,
    ) -> BoxStream<'_, GlueResult<RawDocument>>;
}

#[async_trait]
impl<C: StoreClient + ?Sized> StoreClient for &C {
    async fn get_document(&self, path: &str) -> GlueResult<Option<RawDocument>> {
        (**self).get_document(path).await
    }

    async fn get_documents(
        &self,
        collection: &str,
        doc_ids: &[String],
    ) -> GlueResult<Vec<RawDocument>> {
        (**self).get_documents(collection, doc_ids).await
    }

    async fn add_document(&self, collection: &str, fields: Document) -> GlueResult<String> {
        (**self).add_document(collection, fields).await
    }

    async fn set_document(&self, path: &str, fields: Document) -> GlueResult<()> {
        (**self).set_document(path, fields).await
    }

    async fn update_document(&self, path: &str, fields: Document) -> GlueResult<()> {
        (**self).update_document(path, fields).await
    }

    async fn delete_document(&self, path: &str) -> GlueResult<()> {
        (**self).delete_document(path).await
    }

    async fn list_collections(&self, doc_path: &str) -> GlueResult<Vec<String>> {
        (**self).list_collections(doc_path).await
    }

    async fn list_document_ids(&self, collection: &str) -> GlueResult<Vec<String>> {
        (**self).list_document_ids(collection).await
    }

    async fn run_query(
        &self,
        target: &QueryTarget,
        query: &Query,
    ) -> GlueResult<Vec<RawDocument>> {
        (**self).run_query(target, query).await
    }

    fn stream_query(
        &self,
        target: &QueryTarget,
        query: &Query,
    ) -> BoxStream<'_, GlueResult<RawDocument>> {
        (**self).stream_query(target, query)
    }
}

#[async_trait]
impl<C: StoreClient + ?Sized> StoreClient for Arc<C> {
    async fn get_document(&self, path: &str) -> GlueResult<Option<RawDocument>> {
        (**self).get_document(path).await
    }

    async fn get_documents(
        &self,
        collection: &str,
        doc_ids: &[String],
    ) -> GlueResult<Vec<RawDocument>> {
        (**self).get_documents(collection, doc_ids).await
    }

    async fn add_document(&self, collection: &str, fields: Document) -> GlueResult<String> {
        (**self).add_document(collection, fields).await
    }

    async fn set_document(&self, path: &str, fields: Document) -> GlueResult<()> {
        (**self).set_document(path, fields).await
    }

    async fn update_document(&self, path: &str, fields: Document) -> GlueResult<()> {
        (**self).update_document(path, fields).await
    }

    async fn delete_document(&self, path: &str) -> GlueResult<()> {
        (**self).delete_document(path).await
    }

    async fn list_collections(&self, doc_path: &str) -> GlueResult<Vec<String>> {
        (**self).list_collections(doc_path).await
    }

    async fn list_document_ids(&self, collection: &str) -> GlueResult<Vec<String>> {
        (**self).list_document_ids(collection).await
    }

    async fn run_query(
        &self,
        target: &QueryTarget,
        query: &Query,
    ) -> GlueResult<Vec<RawDocument>> {
        (**self).run_query(target, query).await
    }

    fn stream_query(
        &self,
        target: &QueryTarget,
        query: &Query,
    ) -> BoxStream<'_, GlueResult<RawDocument>> {
        (**self).stream_query(target, query)
    }
}
