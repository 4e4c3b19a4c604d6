//! The top-level entry point tying a store client to the model layer.

use crate::client::StoreClient;
use crate::collection::ModelCollection;
use crate::model::Model;

/// A handle over a backend client from which typed collections are borrowed.
///
/// ```ignore
/// let store = ModelStore::new(InMemoryClient::new());
/// let fruits = store.model::<Fruit>();
/// let rooms = store.model::<Message>().parents(["room1"]);
/// ```
#[derive(Debug, Clone)]
pub struct ModelStore<C: StoreClient> {
    client: C,
}

impl<C: StoreClient> ModelStore<C> {
    /// Wraps a backend client.
    pub fn new(client: C) -> Self {
        ModelStore { client }
    }

    /// Borrows a typed collection handle for a model kind. Models with
    /// nested path templates are anchored with
    /// [`parents`](ModelCollection::parents) before use.
    pub fn model<M: Model>(&self) -> ModelCollection<'_, C, M> {
        ModelCollection::new(&self.client)
    }

    /// The underlying backend client.
    pub fn client(&self) -> &C {
        &self.client
    }
}
