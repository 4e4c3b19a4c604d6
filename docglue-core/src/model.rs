//! Model instances: per-document state, the [`Model`] trait and its
//! lifecycle hooks, and the [`ModelExt`] accessors.
//!
//! A model type pairs a `'static` [`ModelSchema`] with a [`ModelState`] and
//! gets everything else for free through the blanket [`ModelExt`] impl:
//!
//! ```ignore
//! struct Fruit {
//!     state: ModelState,
//! }
//!
//! static FRUIT_SCHEMA: LazyLock<ModelSchema> = LazyLock::new(|| {
//!     ModelSchema::builder("fruits")
//!         .property("name", StringProperty::new().required())
//!         .property("price", IntegerProperty::new())
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
//!
//! Every value held in [`ModelState`] is an internal value; the property
//! conversions run at the [`ModelExt::get`] / [`ModelExt::set`] boundary and
//! at persistence. Alongside the live values the state carries an `intact`
//! shadow: a copy of each value as last read from or written to the store,
//! which [`ModelExt::changes`] diffs against.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use bson::Document;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{GlueError, GlueResult};
use crate::schema::ModelSchema;
use crate::property::WriteValue;

/// The mutable per-document state every model instance carries.
#[derive(Debug, Clone, Default)]
pub struct ModelState {
    /// The document id, once known (assigned or loaded).
    pub doc_id: Option<String>,
    /// Parent document ids, one per placeholder in the path template.
    pub parent_ids: Vec<String>,
    /// Internal values, keyed by property name.
    pub values: BTreeMap<String, Value>,
    /// Shadow copy of each value as last read from or written to the store.
    pub intact: BTreeMap<String, Value>,
}

/// A read-only view of a model instance, handed to computed properties and
/// custom validators so they can see sibling fields without owning the
/// instance type.
#[derive(Debug, Clone, Copy)]
pub struct FieldView<'a> {
    schema: &'a ModelSchema,
    state: &'a ModelState,
}

static DETACHED_SCHEMA: LazyLock<ModelSchema> =
    LazyLock::new(|| ModelSchema::builder("").build());
static DETACHED_STATE: LazyLock<ModelState> = LazyLock::new(ModelState::default);

impl<'a> FieldView<'a> {
    pub(crate) fn new(schema: &'a ModelSchema, state: &'a ModelState) -> Self {
        FieldView { schema, state }
    }

    /// A view over no instance at all, used where a conversion runs outside
    /// any document (query predicates, detached property tests).
    pub fn detached() -> FieldView<'static> {
        FieldView {
            schema: &DETACHED_SCHEMA,
            state: &DETACHED_STATE,
        }
    }

    /// The viewed document's id, when known.
    pub fn doc_id(&self) -> Option<&str> {
        self.state.doc_id.as_deref()
    }

    /// The viewed document's parent ids.
    pub fn parent_ids(&self) -> &[String] {
        &self.state.parent_ids
    }

    /// Reads a sibling property's application value.
    pub fn get(&self, name: &str) -> GlueResult<Value> {
        app_value(self.schema, self.state, name)
    }
}

/// One field's before/after pair as reported by [`ModelExt::changes`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Change {
    /// The application value as last synchronized with the store.
    pub before: Value,
    /// The current application value.
    pub after: Value,
}

/// A persistable document kind.
///
/// Implementors supply the schema and state plumbing; the lifecycle hooks all
/// have no-op defaults. `before_put` and `before_delete` return `false` to
/// veto the operation silently; `is_deletable` returning `false` does the
/// same for deletion.
pub trait Model: Sized + Send + Sync + 'static {
    /// The static schema shared by every instance of this kind.
    fn schema() -> &'static ModelSchema;

    /// The instance state.
    fn state(&self) -> &ModelState;

    /// The instance state, mutably.
    fn state_mut(&mut self) -> &mut ModelState;

    /// Constructs an instance around existing state.
    fn from_state(state: ModelState) -> Self;

    /// Instance-level validation, run after per-property validation on every
    /// persist.
    fn validate(&self) -> GlueResult<()> {
        Ok(())
    }

    /// Runs before every persist; returning `false` vetoes it.
    fn before_put(&mut self) -> GlueResult<bool> {
        Ok(true)
    }

    /// Runs after a successful persist. `created` is true when the store
    /// assigned a fresh document id.
    fn after_put(&mut self, created: bool) -> GlueResult<()> {
        let _ = created;
        Ok(())
    }

    /// Consulted before deletion; returning `false` vetoes it.
    fn is_deletable(&self) -> GlueResult<bool> {
        Ok(true)
    }

    /// Runs before deletion (after `is_deletable`); returning `false` vetoes
    /// it.
    fn before_delete(&mut self) -> GlueResult<bool> {
        Ok(true)
    }

    /// Runs after a successful deletion.
    fn after_delete(&mut self) -> GlueResult<()> {
        Ok(())
    }
}

/// Field accessors and dict conversions, blanket-implemented for every
/// [`Model`].
pub trait ModelExt: Model {
    /// The document id, when known.
    fn doc_id(&self) -> Option<&str> {
        self.state().doc_id.as_deref()
    }

    /// The parent document ids.
    fn parent_ids(&self) -> &[String] {
        &self.state().parent_ids
    }

    /// Reads a property's application value, with default substitution.
    fn get(&self, name: &str) -> GlueResult<Value> {
        app_value(Self::schema(), self.state(), name)
    }

    /// Reads a property's application value as last synchronized with the
    /// store.
    fn get_intact(&self, name: &str) -> GlueResult<Value> {
        let schema = Self::schema();
        let property = schema.property(name)?;
        let state = self.state();
        let mut raw = state.intact.get(name).cloned().unwrap_or(Value::Null);
        if raw.is_null() {
            if let Some(default) = &property.options().default {
                raw = default.clone();
            }
        }
        property.to_app_value(&raw, &FieldView::new(schema, state))
    }

    /// Writes a property's application value.
    ///
    /// The value is validated eagerly and converted through the property's
    /// write conversion; a `Skip` outcome leaves the state untouched.
    fn set(&mut self, name: &str, value: impl Into<Value>) -> GlueResult<()> {
        let value = value.into();
        let schema = Self::schema();
        let property = schema.property(name)?;
        property
            .validate(&value, &FieldView::new(schema, self.state()))
            .map_err(|err| name_error(name, err))?;
        match property.from_app_value(value)? {
            WriteValue::Set(internal) => {
                self.state_mut().values.insert(name.to_string(), internal);
            }
            WriteValue::Skip => {}
        }
        Ok(())
    }

    /// Writes every known property present in `values` (the id key and
    /// unknown keys are ignored).
    fn apply_dict(&mut self, values: &Map<String, Value>) -> GlueResult<()> {
        let names: Vec<String> = Self::schema()
            .properties()
            .map(|(name, _)| name.to_string())
            .collect();
        for name in names {
            if let Some(value) = values.get(&name) {
                self.set(&name, value.clone())?;
            }
        }
        Ok(())
    }

    /// The full application-value representation: one entry per property plus
    /// the document id under the schema's id key.
    fn to_dict(&self) -> GlueResult<Map<String, Value>> {
        let schema = Self::schema();
        let mut dict = Map::new();
        dict.insert(
            schema.id_key().to_string(),
            self.doc_id().map(Value::from).unwrap_or(Value::Null),
        );
        for (name, _) in schema.properties() {
            dict.insert(name.to_string(), self.get(name)?);
        }
        Ok(dict)
    }

    /// Diffs current application values against the intact shadow and returns
    /// the fields that changed since the last store synchronization.
    fn changes(&self) -> GlueResult<BTreeMap<String, Change>> {
        let schema = Self::schema();
        let mut out = BTreeMap::new();
        for (name, _) in schema.properties() {
            let before = self.get_intact(name)?;
            let after = self.get(name)?;
            if before != after {
                out.insert(name.to_string(), Change { before, after });
            }
        }
        Ok(out)
    }
}

impl<M: Model> ModelExt for M {}

fn name_error(name: &str, err: GlueError) -> GlueError {
    match err {
        GlueError::Validation(msg) => GlueError::Validation(format!("{name}: {msg}")),
        other => other,
    }
}

/// Reads a property's application value from explicit schema and state, with
/// default substitution when the internal value is null.
pub(crate) fn app_value(
    schema: &ModelSchema,
    state: &ModelState,
    name: &str,
) -> GlueResult<Value> {
    let property = schema.property(name)?;
    let mut raw = state.values.get(name).cloned().unwrap_or(Value::Null);
    if raw.is_null() {
        if let Some(default) = &property.options().default {
            raw = default.clone();
        }
    }
    property.to_app_value(&raw, &FieldView::new(schema, state))
}

pub(crate) fn masked(name: &str, exclude: &[String], only: &[String]) -> bool {
    if exclude.iter().any(|n| n == name) {
        return false;
    }
    if !only.is_empty() && !only.iter().any(|n| n == name) {
        return false;
    }
    true
}

/// Produces the store document for an instance: one entry per non-virtual
/// property surviving the exclude/only mask, in store representation.
pub(crate) fn to_db_dict<M: Model>(
    model: &M,
    exclude: &[String],
    only: &[String],
) -> GlueResult<Document> {
    let schema = M::schema();
    let state = model.state();
    let mut doc = Document::new();
    for (name, property) in schema.properties() {
        if property.options().is_virtual || !masked(name, exclude, only) {
            continue;
        }
        let raw = state.values.get(name).cloned().unwrap_or(Value::Null);
        let wire = property.to_db_value(&raw, &FieldView::new(schema, state))?;
        doc.insert(name, wire);
    }
    Ok(doc)
}

/// Hydrates an instance from a store document: each property's read
/// conversion runs, and accepted values land in both `values` and `intact`.
///
/// Only keys present in the document are touched; virtual properties and
/// fields left out of a masked write keep their in-memory values and intact
/// shadows.
pub(crate) fn apply_db_dict<M: Model>(model: &mut M, doc: &Document) -> GlueResult<()> {
    let schema = M::schema();
    let mut accepted = Vec::new();
    for (name, property) in schema.properties() {
        if property.options().is_virtual {
            continue;
        }
        let Some(wire) = doc.get(name) else {
            continue;
        };
        match property.from_db_value(wire)? {
            WriteValue::Set(internal) => accepted.push((name.to_string(), internal)),
            WriteValue::Skip => {}
        }
    }
    let state = model.state_mut();
    for (name, internal) in accepted {
        state.intact.insert(name.clone(), internal.clone());
        state.values.insert(name, internal);
    }
    Ok(())
}

/// Runs full-instance validation: every property's checks against its current
/// application value, then the instance-level hook.
pub(crate) fn run_validation<M: Model>(model: &M) -> GlueResult<()> {
    let schema = M::schema();
    let state = model.state();
    for (name, property) in schema.properties() {
        let value = app_value(schema, state, name)?;
        property
            .validate(&value, &FieldView::new(schema, state))
            .map_err(|err| name_error(name, err))?;
    }
    model.validate()
}
