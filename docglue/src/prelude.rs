//! Convenient re-exports of commonly used types from docglue.
//!
//! Import this prelude module to quickly access the most frequently used
//! types and traits without needing to import from multiple sub-modules:
//!
//! ```ignore
//! use docglue::prelude::*;
//! ```

pub use docglue_core::{
    client::{RawDocument, StoreClient},
    collection::{DictOptions, ModelCollection, PutOptions, QueryOptions},
    error::{GlueError, GlueResult},
    model::{Change, FieldView, Model, ModelExt, ModelState},
    property::{
        BooleanProperty, ComputedProperty, ConstantProperty, FloatProperty, IntegerProperty,
        JsonProperty, Property, PropertyOptions, StringProperty, TimestampProperty, WriteValue,
    },
    query::{Cond, Filter, FilterOp, Query, QueryBuilder, QueryTarget, Sort, SortDirection},
    schema::{ModelSchema, ModelSchemaBuilder},
    store::ModelStore,
};
