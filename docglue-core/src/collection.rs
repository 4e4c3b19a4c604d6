//! The typed operation surface for one model kind: persistence, retrieval,
//! queries and dict-based editing.
//!
//! A [`ModelCollection`] is a lightweight handle borrowed from a
//! [`ModelStore`](crate::store::ModelStore). For nested collection paths the
//! handle is anchored with [`parents`](ModelCollection::parents):
//!
//! ```ignore
//! let store = ModelStore::new(client);
//! let messages = store.model::<Message>().parents(["room1"]);
//!
//! let mut msg = messages.create();
//! msg.set("body", "hello")?;
//! messages.put(&mut msg).await?;
//! ```

use std::marker::PhantomData;

use bson::Bson;
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde_json::{Map, Value};

use crate::client::{RawDocument, StoreClient};
use crate::error::{GlueError, GlueResult};
use crate::model::{
    apply_db_dict, masked, run_validation, Model, ModelExt, ModelState, to_db_dict,
};
use crate::query::{parse_order_by, Cond, FieldFilter, Query, QueryTarget};

/// Field mask for a partial persist. A non-empty mask turns the write into a
/// merge that leaves unmasked stored fields untouched.
#[derive(Debug, Clone, Default)]
pub struct PutOptions {
    /// Property names to leave out of the write.
    pub exclude: Vec<String>,
    /// When non-empty, only these property names are written.
    pub only: Vec<String>,
}

impl PutOptions {
    fn is_partial(&self) -> bool {
        !self.exclude.is_empty() || !self.only.is_empty()
    }
}

/// Options for queries over a collection.
#[derive(Debug, Clone)]
pub struct QueryOptions {
    /// Comma-separated multi-key sort spec; `-` prefixes descend.
    pub order_by: Option<String>,
    /// Maximum number of documents to return.
    pub limit: Option<usize>,
    /// Number of documents to skip.
    pub offset: Option<usize>,
    /// Search every same-named collection regardless of parent.
    pub collection_group: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        QueryOptions {
            order_by: None,
            limit: Some(100),
            offset: None,
            collection_group: false,
        }
    }
}

/// Options for the dict-based editing operations.
#[derive(Debug, Clone, Default)]
pub struct DictOptions {
    /// Dict keys to ignore.
    pub exclude: Vec<String>,
    /// When non-empty, only these dict keys are applied.
    pub only: Vec<String>,
    /// Apply the values but skip the persist, leaving the instance dirty.
    pub without_put: bool,
}

/// Typed handle over one model kind's collection, anchored at a concrete set
/// of parent ids.
#[derive(Debug)]
pub struct ModelCollection<'a, C: StoreClient, M: Model> {
    client: &'a C,
    parent_ids: Vec<String>,
    _marker: PhantomData<fn() -> M>,
}

impl<'a, C: StoreClient, M: Model> ModelCollection<'a, C, M> {
    pub(crate) fn new(client: &'a C) -> Self {
        ModelCollection {
            client,
            parent_ids: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Anchors this handle under concrete parent document ids, one per
    /// placeholder in the model's path template.
    pub fn parents<I, S>(mut self, parent_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parent_ids = parent_ids.into_iter().map(Into::into).collect();
        self
    }

    /// A fresh unsaved instance anchored at this handle's parents.
    pub fn create(&self) -> M {
        M::from_state(ModelState {
            parent_ids: self.parent_ids.clone(),
            ..Default::default()
        })
    }

    fn collection_path(&self) -> GlueResult<String> {
        M::schema().collection_path(&self.parent_ids)
    }

    fn document_path(&self, doc_id: &str) -> GlueResult<String> {
        Ok(format!("{}/{doc_id}", self.collection_path()?))
    }

    /// Persists an instance, replacing the stored document in full.
    ///
    /// Validation runs first; `before_put` may veto the write. Instances
    /// without a document id are inserted with a store-assigned id. After a
    /// successful write the written values become the instance's intact
    /// baseline, so auto-stamped timestamps are immediately readable.
    pub async fn put(&self, model: &mut M) -> GlueResult<()> {
        self.put_with(model, &PutOptions::default()).await
    }

    /// Persists an instance under a field mask.
    ///
    /// With a non-empty mask the write is a merge: masked-out fields keep
    /// their stored values, and the document must already exist.
    pub async fn put_with(&self, model: &mut M, options: &PutOptions) -> GlueResult<()> {
        run_validation(model)?;
        if !model.before_put()? {
            return Ok(());
        }
        let doc = to_db_dict(model, &options.exclude, &options.only)?;
        let created;
        match model.state().doc_id.clone() {
            None => {
                if options.is_partial() {
                    return Err(GlueError::Programming(
                        "a partial write requires an existing document id".to_string(),
                    ));
                }
                let id = self
                    .client
                    .add_document(&self.collection_path()?, doc.clone())
                    .await?;
                model.state_mut().doc_id = Some(id);
                created = true;
            }
            Some(id) => {
                M::schema().validate_doc_id(&id)?;
                let path = self.document_path(&id)?;
                if options.is_partial() {
                    self.client.update_document(&path, doc.clone()).await?;
                } else {
                    self.client.set_document(&path, doc.clone()).await?;
                }
                created = false;
            }
        }
        apply_db_dict(model, &doc)?;
        model.after_put(created)
    }

    /// Deletes an instance's document. `is_deletable` and `before_delete`
    /// may veto; subcollections are left in place.
    pub async fn delete(&self, model: &mut M) -> GlueResult<()> {
        if !model.is_deletable()? || !model.before_delete()? {
            return Ok(());
        }
        let path = self.saved_document_path(model)?;
        self.client.delete_document(&path).await?;
        model.after_delete()
    }

    /// Deletes an instance's document together with every document beneath
    /// it, children first. The hooks run once, for the root document only.
    pub async fn delete_all(&self, model: &mut M) -> GlueResult<()> {
        if !model.is_deletable()? || !model.before_delete()? {
            return Ok(());
        }
        let path = self.saved_document_path(model)?;
        delete_subtree(self.client, &path).await?;
        model.after_delete()
    }

    fn saved_document_path(&self, model: &M) -> GlueResult<String> {
        let doc_id = model.doc_id().ok_or_else(|| {
            GlueError::Programming("cannot delete a document that was never saved".to_string())
        })?;
        self.document_path(doc_id)
    }

    /// Fetches one document by id.
    pub async fn get_by_id(&self, doc_id: &str) -> GlueResult<Option<M>> {
        let path = self.document_path(doc_id)?;
        match self.client.get_document(&path).await? {
            Some(raw) => Ok(Some(hydrate::<M>(&raw)?)),
            None => Ok(None),
        }
    }

    /// Fetches several documents by id. Missing ids are silently absent from
    /// the result; an empty input short-circuits without touching the store.
    pub async fn get_by_ids(&self, doc_ids: &[String]) -> GlueResult<Vec<M>> {
        if doc_ids.is_empty() {
            return Ok(Vec::new());
        }
        let raws = self
            .client
            .get_documents(&self.collection_path()?, doc_ids)
            .await?;
        raws.iter().map(hydrate::<M>).collect()
    }

    /// Whether a document with this id exists.
    pub async fn exists(&self, doc_id: &str) -> GlueResult<bool> {
        let path = self.document_path(doc_id)?;
        Ok(self.client.get_document(&path).await?.is_some())
    }

    /// Runs a filtered query and returns hydrated instances.
    ///
    /// Predicate values go through each property's search-value conversion,
    /// so application-representation values (e.g. epoch seconds for
    /// timestamps) compare correctly against stored ones.
    pub async fn query(&self, conds: &[Cond], options: &QueryOptions) -> GlueResult<Vec<M>> {
        let (target, query) = self.build_query(conds, options)?;
        let raws = self.client.run_query(&target, &query).await?;
        raws.iter().map(hydrate::<M>).collect()
    }

    /// Runs a filtered query and returns dict representations.
    pub async fn query_dicts(
        &self,
        conds: &[Cond],
        options: &QueryOptions,
    ) -> GlueResult<Vec<Map<String, Value>>> {
        let models = self.query(conds, options).await?;
        models.iter().map(ModelExt::to_dict).collect()
    }

    /// Streams the results of a filtered query one instance at a time.
    pub fn stream(
        &self,
        conds: &[Cond],
        options: &QueryOptions,
    ) -> GlueResult<BoxStream<'a, GlueResult<M>>> {
        let (target, query) = self.build_query(conds, options)?;
        let raws = self.client.stream_query(&target, &query);
        Ok(Box::pin(raws.map(|raw| {
            raw.and_then(|doc| hydrate::<M>(&doc))
        })))
    }

    /// Every document in the collection, up to the default query limit.
    pub async fn all(&self) -> GlueResult<Vec<M>> {
        self.query(&[], &QueryOptions::default()).await
    }

    fn build_query(
        &self,
        conds: &[Cond],
        options: &QueryOptions,
    ) -> GlueResult<(QueryTarget, Query)> {
        let schema = M::schema();
        let mut builder = Query::builder();
        for cond in conds {
            let property = schema.property(&cond.field)?;
            let value = match (&cond.value, cond.op.takes_array_operand()) {
                (Value::Array(items), true) => Bson::Array(
                    items
                        .iter()
                        .map(|item| property.to_db_search_value(item.clone()))
                        .collect::<GlueResult<Vec<_>>>()?,
                ),
                (other, _) => property.to_db_search_value(other.clone())?,
            };
            builder = builder.filter(FieldFilter {
                field: cond.field.clone(),
                op: cond.op,
                value,
            });
        }
        if let Some(spec) = &options.order_by {
            for sort in parse_order_by(spec) {
                builder = builder.sort(sort.field, sort.direction);
            }
        }
        if let Some(limit) = options.limit {
            builder = builder.limit(limit);
        }
        if let Some(offset) = options.offset {
            builder = builder.offset(offset);
        }
        let target = if options.collection_group {
            QueryTarget::CollectionGroup(schema.collection_id().to_string())
        } else {
            QueryTarget::Collection(self.collection_path()?)
        };
        Ok((target, builder.build()))
    }

    /// Creates and persists an instance from a dict.
    ///
    /// A string under the schema's id key becomes the document id (validated
    /// against the id pattern); otherwise the store assigns one.
    pub async fn create_by_dict(&self, values: &Map<String, Value>) -> GlueResult<M> {
        self.create_by_dict_with(values, &DictOptions::default())
            .await
    }

    /// [`create_by_dict`](ModelCollection::create_by_dict) with a key mask
    /// and optional persist skip.
    pub async fn create_by_dict_with(
        &self,
        values: &Map<String, Value>,
        options: &DictOptions,
    ) -> GlueResult<M> {
        let schema = M::schema();
        let mut model = self.create();
        if let Some(Value::String(id)) = values.get(schema.id_key()) {
            schema.validate_doc_id(id)?;
            model.state_mut().doc_id = Some(id.clone());
        }
        model.apply_dict(&filter_values(values, &options.exclude, &options.only))?;
        if !options.without_put {
            self.put(&mut model).await?;
        }
        Ok(model)
    }

    /// Loads the document named by the dict's id key, applies the dict and
    /// persists the result.
    pub async fn update_by_dict(&self, values: &Map<String, Value>) -> GlueResult<M> {
        self.update_by_dict_with(values, &DictOptions::default())
            .await
    }

    /// [`update_by_dict`](ModelCollection::update_by_dict) with a key mask
    /// and optional persist skip. The mask also bounds the store write, so
    /// masked-out fields are not rewritten.
    pub async fn update_by_dict_with(
        &self,
        values: &Map<String, Value>,
        options: &DictOptions,
    ) -> GlueResult<M> {
        let schema = M::schema();
        let doc_id = values
            .get(schema.id_key())
            .and_then(Value::as_str)
            .ok_or_else(|| {
                GlueError::Validation(format!(
                    "{} not found in the given values",
                    schema.id_key()
                ))
            })?;
        let collection = self.collection_path()?;
        let mut model = self
            .get_by_id(doc_id)
            .await?
            .ok_or_else(|| GlueError::DocumentNotFound(doc_id.to_string(), collection))?;
        model.apply_dict(&filter_values(values, &options.exclude, &options.only))?;
        if !options.without_put {
            let put_options = PutOptions {
                exclude: options.exclude.clone(),
                only: options.only.clone(),
            };
            self.put_with(&mut model, &put_options).await?;
        }
        Ok(model)
    }

    /// Updates when the dict's id names an existing document, creates
    /// otherwise. The dict must carry the id key.
    pub async fn upsert_by_dict(&self, values: &Map<String, Value>) -> GlueResult<M> {
        self.upsert_by_dict_with(values, &DictOptions::default())
            .await
    }

    /// [`upsert_by_dict`](ModelCollection::upsert_by_dict) with a key mask
    /// and optional persist skip.
    pub async fn upsert_by_dict_with(
        &self,
        values: &Map<String, Value>,
        options: &DictOptions,
    ) -> GlueResult<M> {
        let schema = M::schema();
        let doc_id = values
            .get(schema.id_key())
            .and_then(Value::as_str)
            .ok_or_else(|| {
                GlueError::Validation(format!(
                    "{} not found in the given values",
                    schema.id_key()
                ))
            })?;
        let existing = self.exists(doc_id).await?;
        if existing {
            self.update_by_dict_with(values, options).await
        } else {
            self.create_by_dict_with(values, options).await
        }
    }
}

/// Deletes a document and everything beneath it, children first.
fn delete_subtree<'f, C: StoreClient>(
    client: &'f C,
    doc_path: &'f str,
) -> BoxFuture<'f, GlueResult<()>> {
    Box::pin(async move {
        for collection in client.list_collections(doc_path).await? {
            for doc_id in client.list_document_ids(&collection).await? {
                let child = format!("{collection}/{doc_id}");
                delete_subtree(client, &child).await?;
            }
        }
        client.delete_document(doc_path).await
    })
}

/// Builds an instance from a raw store document, recovering parent ids from
/// the document path.
fn hydrate<M: Model>(raw: &RawDocument) -> GlueResult<M> {
    let schema = M::schema();
    let mut model = M::from_state(ModelState {
        doc_id: Some(raw.doc_id().to_string()),
        parent_ids: schema.parent_ids_from_path(&raw.path),
        ..Default::default()
    });
    apply_db_dict(&mut model, &raw.fields)?;
    Ok(model)
}

fn filter_values(
    values: &Map<String, Value>,
    exclude: &[String],
    only: &[String],
) -> Map<String, Value> {
    values
        .iter()
        .filter(|(key, _)| masked(key, exclude, only))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}
