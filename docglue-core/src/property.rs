//! Typed field descriptors and their conversion pipeline.
//!
//! A [`Property`] owns the four conversions between an in-memory internal
//! value, the application-facing representation, and the store (wire)
//! representation:
//!
//! - [`to_app_value`](Property::to_app_value): internal to application
//! - [`from_app_value`](Property::from_app_value): application to internal
//! - [`to_db_value`](Property::to_db_value): internal to store, at persistence
//! - [`from_db_value`](Property::from_db_value): store to internal, at hydration
//!
//! plus [`schema`](Property::schema) (a JSON-Schema fragment describing the
//! stored shape) and [`to_db_search_value`](Property::to_db_search_value) for
//! query predicates. Write-direction conversions return a [`WriteValue`]:
//! `Skip` makes the write a silent no-op, which is how computed, constant and
//! auto-timestamp properties reject assignment.
//!
//! Custom property kinds implement the trait and override the conversions they
//! care about; the provided defaults pass values through structurally:
//!
//! ```ignore
//! #[derive(Debug)]
//! struct YesNoProperty {
//!     options: PropertyOptions,
//! }
//!
//! impl Property for YesNoProperty {
//!     fn options(&self) -> &PropertyOptions {
//!         &self.options
//!     }
//!
//!     fn to_app_value(&self, value: &Value, _view: &FieldView<'_>) -> GlueResult<Value> {
//!         Ok(if value == &Value::Bool(true) { "Yes".into() } else { "No".into() })
//!     }
//!
//!     fn from_app_value(&self, value: Value) -> GlueResult<WriteValue> {
//!         Ok(WriteValue::Set(Value::Bool(value == Value::String("Yes".into()))))
//!     }
//! }
//! ```

use std::fmt;
use std::sync::Arc;

use bson::Bson;
use serde_json::{Map, Value};

use crate::error::{GlueError, GlueResult};
use crate::model::FieldView;
use crate::value::{bson_to_json, json_to_bson};

/// Custom validator callable, invoked with the value being written and a view
/// of the owning instance. Invalid input is signalled by returning an error.
pub type ValidatorFn = Arc<dyn Fn(&Value, &FieldView<'_>) -> GlueResult<()> + Send + Sync>;

/// Computation function for [`ComputedProperty`]: derives the property value
/// from a view of the owning instance.
pub type ComputeFn = Arc<dyn Fn(&FieldView<'_>) -> GlueResult<Value> + Send + Sync>;

/// Outcome of a write-direction conversion.
///
/// `Skip` is the "set nothing" marker: the write is silently discarded and the
/// internal value map is left untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteValue {
    /// Store this internal value.
    Set(Value),
    /// Discard the write.
    Skip,
}

/// Configuration shared by every property kind.
///
/// A property's name is not part of its options; it is fixed exactly once when
/// the property is attached to a [`ModelSchema`](crate::schema::ModelSchema).
#[derive(Default, Clone)]
pub struct PropertyOptions {
    /// Null values fail validation when set.
    pub required: bool,
    /// Substituted on read when the internal value is null.
    pub default: Option<Value>,
    /// Finite set of accepted values.
    pub choices: Option<Vec<Value>>,
    /// JSON-Schema fragment validated on every write (non-null values only).
    pub schema: Option<Value>,
    /// Custom validator, run after the built-in checks.
    pub validator: Option<ValidatorFn>,
    /// Excluded from persistence (application-only).
    pub is_virtual: bool,
}

impl fmt::Debug for PropertyOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyOptions")
            .field("required", &self.required)
            .field("default", &self.default)
            .field("choices", &self.choices)
            .field("schema", &self.schema)
            .field("validator", &self.validator.as_ref().map(|_| "<fn>"))
            .field("is_virtual", &self.is_virtual)
            .finish()
    }
}

/// A typed field descriptor attached to a model schema.
///
/// The provided conversion defaults pass values through structurally; concrete
/// kinds override the subset they need. [`validate`](Property::validate) runs
/// the validation checks in a fixed order (choices, required, schema
/// fragment, then the custom validator) and the first failure wins.
pub trait Property: fmt::Debug + Send + Sync {
    /// Shared configuration for this property.
    fn options(&self) -> &PropertyOptions;

    /// Converts an internal value to its application-facing representation.
    ///
    /// Default substitution has already happened by the time this is called.
    fn to_app_value(&self, value: &Value, view: &FieldView<'_>) -> GlueResult<Value> {
        let _ = view;
        Ok(value.clone())
    }

    /// Converts an application-supplied value to its internal representation,
    /// or [`WriteValue::Skip`] to discard the write.
    fn from_app_value(&self, value: Value) -> GlueResult<WriteValue> {
        Ok(WriteValue::Set(value))
    }

    /// Converts the internal value to its store representation at persistence
    /// time. `view` exposes the owning instance for kinds whose stored value
    /// is not a function of the internal value alone.
    fn to_db_value(&self, value: &Value, view: &FieldView<'_>) -> GlueResult<Bson> {
        let _ = view;
        Ok(json_to_bson(value))
    }

    /// Converts a freshly loaded store value to its internal representation,
    /// or [`WriteValue::Skip`] to discard it.
    fn from_db_value(&self, value: &Bson) -> GlueResult<WriteValue> {
        Ok(WriteValue::Set(bson_to_json(value)))
    }

    /// Converts a query-predicate value to store representation.
    ///
    /// Defaults to composing [`from_app_value`](Property::from_app_value) and
    /// [`to_db_value`](Property::to_db_value); a `Skip` outcome falls back to
    /// the structural conversion of the input.
    fn to_db_search_value(&self, value: Value) -> GlueResult<Bson> {
        match self.from_app_value(value.clone())? {
            WriteValue::Set(internal) => self.to_db_value(&internal, &FieldView::detached()),
            WriteValue::Skip => Ok(json_to_bson(&value)),
        }
    }

    /// The JSON-Schema fragment describing this property's stored shape,
    /// merged with the configured default.
    fn schema(&self) -> GlueResult<Value> {
        Ok(Value::Object(base_schema(self.options())))
    }

    /// Runs the validation checks in fixed order; the first failure wins.
    fn validate(&self, value: &Value, view: &FieldView<'_>) -> GlueResult<()> {
        let options = self.options();
        if let Some(choices) = &options.choices {
            if !choices.contains(value) {
                return Err(GlueError::Validation(format!(
                    "{value} not found in choices"
                )));
            }
        }
        if options.required && value.is_null() {
            return Err(GlueError::Validation("value is required".to_string()));
        }
        if let Some(schema) = &options.schema {
            if !value.is_null() {
                jsonschema::validate(schema, value)
                    .map_err(|err| GlueError::Validation(err.to_string()))?;
            }
        }
        if let Some(validator) = &options.validator {
            validator(value, view)?;
        }
        Ok(())
    }
}

/// Starts a schema fragment from the configured options: the raw fragment (or
/// an empty object) plus the default, when one is set.
fn base_schema(options: &PropertyOptions) -> Map<String, Value> {
    let mut schema = match &options.schema {
        Some(Value::Object(map)) => map.clone(),
        _ => Map::new(),
    };
    if let Some(default) = &options.default {
        if !default.is_null() {
            schema.insert("default".to_string(), default.clone());
        }
    }
    schema
}

fn typed_schema(options: &PropertyOptions, type_name: &str) -> Value {
    let mut schema = base_schema(options);
    schema.insert("type".to_string(), Value::String(type_name.to_string()));
    Value::Object(schema)
}

// Coercion helpers. Nulls pass through untouched; anything that has no
// sensible conversion is a validation error.

fn coerce_string(value: &Value) -> GlueResult<Value> {
    match value {
        Value::Null => Ok(Value::Null),
        Value::String(_) => Ok(value.clone()),
        Value::Number(n) => Ok(Value::String(n.to_string())),
        Value::Bool(b) => Ok(Value::String(b.to_string())),
        other => Err(GlueError::Validation(format!(
            "cannot convert {other} to a string"
        ))),
    }
}

fn coerce_integer(value: &Value) -> GlueResult<Value> {
    match value {
        Value::Null => Ok(Value::Null),
        Value::Number(n) => {
            let i = n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .ok_or_else(|| {
                    GlueError::Validation(format!("cannot convert {n} to an integer"))
                })?;
            Ok(Value::from(i))
        }
        Value::Bool(b) => Ok(Value::from(i64::from(*b))),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| GlueError::Validation(format!("cannot convert {s:?} to an integer"))),
        other => Err(GlueError::Validation(format!(
            "cannot convert {other} to an integer"
        ))),
    }
}

fn coerce_float(value: &Value) -> GlueResult<Value> {
    match value {
        Value::Null => Ok(Value::Null),
        Value::Number(n) => {
            let f = n.as_f64().ok_or_else(|| {
                GlueError::Validation(format!("cannot convert {n} to a float"))
            })?;
            Ok(Value::from(f))
        }
        Value::Bool(b) => Ok(Value::from(f64::from(u8::from(*b)))),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map(Value::from)
            .map_err(|_| GlueError::Validation(format!("cannot convert {s:?} to a float"))),
        other => Err(GlueError::Validation(format!(
            "cannot convert {other} to a float"
        ))),
    }
}

fn coerce_boolean(value: &Value) -> GlueResult<Value> {
    match value {
        Value::Null => Ok(Value::Null),
        Value::Bool(_) => Ok(value.clone()),
        Value::Number(n) => Ok(Value::Bool(n.as_f64() != Some(0.0))),
        Value::String(s) => Ok(Value::Bool(!s.is_empty())),
        Value::Array(items) => Ok(Value::Bool(!items.is_empty())),
        Value::Object(map) => Ok(Value::Bool(!map.is_empty())),
    }
}

macro_rules! options_builders {
    () => {
        /// Marks this property as required: writing null fails validation.
        pub fn required(mut self) -> Self {
            self.options.required = true;
            self
        }

        /// Sets the default substituted on read when the value is null.
        pub fn default_value(mut self, value: impl Into<Value>) -> Self {
            self.options.default = Some(value.into());
            self
        }

        /// Restricts accepted values to a finite choice set.
        pub fn choices(mut self, choices: Vec<Value>) -> Self {
            self.options.choices = Some(choices);
            self
        }

        /// Attaches a JSON-Schema fragment validated on every write.
        pub fn with_schema(mut self, schema: Value) -> Self {
            self.options.schema = Some(schema);
            self
        }

        /// Attaches a custom validator invoked with the value and a view of
        /// the owning instance.
        pub fn validator(
            mut self,
            validator: impl Fn(&Value, &FieldView<'_>) -> GlueResult<()> + Send + Sync + 'static,
        ) -> Self {
            self.options.validator = Some(Arc::new(validator));
            self
        }

        /// Excludes this property from persistence (application-only).
        pub fn is_virtual(mut self) -> Self {
            self.options.is_virtual = true;
            self
        }
    };
}

/// String-valued property. Numbers and booleans coerce via string conversion
/// in both directions.
#[derive(Debug, Default)]
pub struct StringProperty {
    options: PropertyOptions,
}

impl StringProperty {
    pub fn new() -> Self {
        Self::default()
    }

    options_builders!();
}

impl Property for StringProperty {
    fn options(&self) -> &PropertyOptions {
        &self.options
    }

    fn to_app_value(&self, value: &Value, _view: &FieldView<'_>) -> GlueResult<Value> {
        coerce_string(value)
    }

    fn from_app_value(&self, value: Value) -> GlueResult<WriteValue> {
        Ok(WriteValue::Set(coerce_string(&value)?))
    }

    fn to_db_value(&self, value: &Value, _view: &FieldView<'_>) -> GlueResult<Bson> {
        Ok(json_to_bson(&coerce_string(value)?))
    }

    fn schema(&self) -> GlueResult<Value> {
        Ok(typed_schema(&self.options, "string"))
    }
}

/// Integer-valued property. Numeric strings, floats (truncating) and booleans
/// coerce via integer conversion.
#[derive(Debug, Default)]
pub struct IntegerProperty {
    options: PropertyOptions,
}

impl IntegerProperty {
    pub fn new() -> Self {
        Self::default()
    }

    options_builders!();
}

impl Property for IntegerProperty {
    fn options(&self) -> &PropertyOptions {
        &self.options
    }

    fn to_app_value(&self, value: &Value, _view: &FieldView<'_>) -> GlueResult<Value> {
        coerce_integer(value)
    }

    fn from_app_value(&self, value: Value) -> GlueResult<WriteValue> {
        Ok(WriteValue::Set(coerce_integer(&value)?))
    }

    fn to_db_value(&self, value: &Value, _view: &FieldView<'_>) -> GlueResult<Bson> {
        Ok(json_to_bson(&coerce_integer(value)?))
    }

    fn schema(&self) -> GlueResult<Value> {
        Ok(typed_schema(&self.options, "number"))
    }
}

/// Float-valued property.
#[derive(Debug, Default)]
pub struct FloatProperty {
    options: PropertyOptions,
}

impl FloatProperty {
    pub fn new() -> Self {
        Self::default()
    }

    options_builders!();
}

impl Property for FloatProperty {
    fn options(&self) -> &PropertyOptions {
        &self.options
    }

    fn to_app_value(&self, value: &Value, _view: &FieldView<'_>) -> GlueResult<Value> {
        coerce_float(value)
    }

    fn from_app_value(&self, value: Value) -> GlueResult<WriteValue> {
        Ok(WriteValue::Set(coerce_float(&value)?))
    }

    fn to_db_value(&self, value: &Value, _view: &FieldView<'_>) -> GlueResult<Bson> {
        Ok(json_to_bson(&coerce_float(value)?))
    }

    fn schema(&self) -> GlueResult<Value> {
        Ok(typed_schema(&self.options, "number"))
    }
}

/// Boolean-valued property. Non-boolean input coerces by truthiness: nonzero
/// numbers and non-empty strings, arrays and objects are true.
#[derive(Debug, Default)]
pub struct BooleanProperty {
    options: PropertyOptions,
}

impl BooleanProperty {
    pub fn new() -> Self {
        Self::default()
    }

    options_builders!();
}

impl Property for BooleanProperty {
    fn options(&self) -> &PropertyOptions {
        &self.options
    }

    fn to_app_value(&self, value: &Value, _view: &FieldView<'_>) -> GlueResult<Value> {
        coerce_boolean(value)
    }

    fn from_app_value(&self, value: Value) -> GlueResult<WriteValue> {
        Ok(WriteValue::Set(coerce_boolean(&value)?))
    }

    fn to_db_value(&self, value: &Value, _view: &FieldView<'_>) -> GlueResult<Bson> {
        Ok(json_to_bson(&coerce_boolean(value)?))
    }

    fn schema(&self) -> GlueResult<Value> {
        Ok(typed_schema(&self.options, "boolean"))
    }
}

/// Timestamp property: epoch-seconds numbers on the application side, native
/// UTC datetimes in the store.
///
/// Two mutually exclusive auto behaviors are available:
///
/// - [`auto_now`](TimestampProperty::auto_now): every persisted write stamps
///   the current UTC time, regardless of any assigned value.
/// - [`auto_now_add`](TimestampProperty::auto_now_add): the current UTC time
///   is stamped only when no value exists yet (first persist).
///
/// With either flag set, application-facing assignment is a no-op.
#[derive(Debug, Default)]
pub struct TimestampProperty {
    options: PropertyOptions,
    auto_now: bool,
    auto_now_add: bool,
}

impl TimestampProperty {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamps the current UTC time on every persisted write.
    pub fn auto_now(mut self) -> Self {
        self.auto_now = true;
        self
    }

    /// Stamps the current UTC time on the first persisted write only.
    pub fn auto_now_add(mut self) -> Self {
        self.auto_now_add = true;
        self
    }

    options_builders!();

    fn epoch_to_datetime(value: &Value) -> GlueResult<Bson> {
        match coerce_float(value)? {
            Value::Null => Ok(Bson::Null),
            Value::Number(n) => {
                let secs = n.as_f64().unwrap_or(0.0);
                Ok(Bson::DateTime(bson::DateTime::from_millis(
                    (secs * 1000.0) as i64,
                )))
            }
            _ => unreachable!(),
        }
    }

    fn now() -> Bson {
        Bson::DateTime(bson::DateTime::from_chrono(chrono::Utc::now()))
    }
}

impl Property for TimestampProperty {
    fn options(&self) -> &PropertyOptions {
        &self.options
    }

    fn to_app_value(&self, value: &Value, _view: &FieldView<'_>) -> GlueResult<Value> {
        coerce_float(value)
    }

    fn from_app_value(&self, value: Value) -> GlueResult<WriteValue> {
        if self.auto_now || self.auto_now_add {
            return Ok(WriteValue::Skip);
        }
        Ok(WriteValue::Set(coerce_float(&value)?))
    }

    fn to_db_value(&self, value: &Value, _view: &FieldView<'_>) -> GlueResult<Bson> {
        if self.auto_now {
            return Ok(Self::now());
        }
        if value.is_null() {
            if self.auto_now_add {
                return Ok(Self::now());
            }
            return Ok(Bson::Null);
        }
        Self::epoch_to_datetime(value)
    }

    fn from_db_value(&self, value: &Bson) -> GlueResult<WriteValue> {
        match value {
            Bson::Null => Ok(WriteValue::Set(Value::Null)),
            Bson::DateTime(dt) => Ok(WriteValue::Set(Value::from(
                dt.timestamp_millis() as f64 / 1000.0,
            ))),
            other => Ok(WriteValue::Set(bson_to_json(other))),
        }
    }

    /// Plain epoch → datetime conversion; auto stamping never applies to
    /// query predicates.
    fn to_db_search_value(&self, value: Value) -> GlueResult<Bson> {
        Self::epoch_to_datetime(&value)
    }

    fn schema(&self) -> GlueResult<Value> {
        Ok(typed_schema(&self.options, "number"))
    }
}

/// Arbitrary structured value, stored structurally or, with
/// [`store_as_string`](JsonProperty::store_as_string), as JSON text.
#[derive(Debug, Default)]
pub struct JsonProperty {
    options: PropertyOptions,
    store_as_string: bool,
}

impl JsonProperty {
    pub fn new() -> Self {
        Self::default()
    }

    /// Persists the value as a JSON-encoded string instead of a structural
    /// document.
    pub fn store_as_string(mut self) -> Self {
        self.store_as_string = true;
        self
    }

    options_builders!();
}

impl Property for JsonProperty {
    fn options(&self) -> &PropertyOptions {
        &self.options
    }

    fn to_db_value(&self, value: &Value, _view: &FieldView<'_>) -> GlueResult<Bson> {
        if self.store_as_string {
            return Ok(Bson::String(serde_json::to_string(value)?));
        }
        Ok(json_to_bson(value))
    }

    fn from_db_value(&self, value: &Bson) -> GlueResult<WriteValue> {
        if self.store_as_string {
            return match value {
                Bson::Null => Ok(WriteValue::Set(Value::Null)),
                Bson::String(s) => Ok(WriteValue::Set(serde_json::from_str(s)?)),
                other => Ok(WriteValue::Set(bson_to_json(other))),
            };
        }
        Ok(WriteValue::Set(bson_to_json(value)))
    }

    fn schema(&self) -> GlueResult<Value> {
        let mut schema = base_schema(&self.options);
        schema
            .entry("type".to_string())
            .or_insert_with(|| Value::String("object".to_string()));
        Ok(Value::Object(schema))
    }
}

/// Property whose value is derived from the owning instance by a supplied
/// function. It has no backing internal storage: assignment and hydration are
/// no-ops, and the function runs on every read and on every persisted write.
pub struct ComputedProperty {
    options: PropertyOptions,
    computer: ComputeFn,
}

impl ComputedProperty {
    /// Creates a computed property from its computation function.
    ///
    /// The function receives a [`FieldView`] of the owning instance and
    /// returns the computed application value.
    pub fn new(
        computer: impl Fn(&FieldView<'_>) -> GlueResult<Value> + Send + Sync + 'static,
    ) -> Self {
        Self {
            options: PropertyOptions::default(),
            computer: Arc::new(computer),
        }
    }

    options_builders!();
}

impl fmt::Debug for ComputedProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComputedProperty")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Property for ComputedProperty {
    fn options(&self) -> &PropertyOptions {
        &self.options
    }

    fn to_app_value(&self, _value: &Value, view: &FieldView<'_>) -> GlueResult<Value> {
        (self.computer)(view)
    }

    fn from_app_value(&self, _value: Value) -> GlueResult<WriteValue> {
        Ok(WriteValue::Skip)
    }

    fn to_db_value(&self, _value: &Value, view: &FieldView<'_>) -> GlueResult<Bson> {
        Ok(json_to_bson(&(self.computer)(view)?))
    }

    fn from_db_value(&self, _value: &Bson) -> GlueResult<WriteValue> {
        Ok(WriteValue::Skip)
    }

    fn schema(&self) -> GlueResult<Value> {
        self.options.schema.clone().ok_or_else(|| {
            GlueError::Programming(
                "a computed property must be given an explicit schema fragment".to_string(),
            )
        })
    }
}

/// Property pinned to a fixed configured value. Assignment and hydration are
/// no-ops.
#[derive(Debug)]
pub struct ConstantProperty {
    options: PropertyOptions,
    value: Value,
}

impl ConstantProperty {
    /// Creates a constant property.
    ///
    /// # Panics
    ///
    /// Panics when given a null value; a constant without a value is a
    /// schema-definition mistake and is rejected eagerly.
    pub fn new(value: impl Into<Value>) -> Self {
        let value = value.into();
        assert!(
            !value.is_null(),
            "ConstantProperty requires a non-null value"
        );
        Self {
            options: PropertyOptions::default(),
            value,
        }
    }

    options_builders!();
}

impl Property for ConstantProperty {
    fn options(&self) -> &PropertyOptions {
        &self.options
    }

    fn to_app_value(&self, _value: &Value, _view: &FieldView<'_>) -> GlueResult<Value> {
        Ok(self.value.clone())
    }

    fn from_app_value(&self, _value: Value) -> GlueResult<WriteValue> {
        Ok(WriteValue::Skip)
    }

    fn to_db_value(&self, _value: &Value, _view: &FieldView<'_>) -> GlueResult<Bson> {
        Ok(json_to_bson(&self.value))
    }

    fn from_db_value(&self, _value: &Bson) -> GlueResult<WriteValue> {
        Ok(WriteValue::Skip)
    }

    fn schema(&self) -> GlueResult<Value> {
        self.options.schema.clone().ok_or_else(|| {
            GlueError::Programming(
                "a constant property must be given an explicit schema fragment".to_string(),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn view() -> FieldView<'static> {
        FieldView::detached()
    }

    #[test]
    fn string_coerces_numbers_and_bools() {
        let prop = StringProperty::new();
        assert_eq!(
            prop.from_app_value(json!(5)).unwrap(),
            WriteValue::Set(json!("5"))
        );
        assert_eq!(
            prop.to_app_value(&json!(true), &view()).unwrap(),
            json!("true")
        );
        assert_eq!(prop.to_app_value(&Value::Null, &view()).unwrap(), Value::Null);
        assert!(prop.from_app_value(json!([1])).is_err());
    }

    #[test]
    fn integer_coerces_strings_and_floats() {
        let prop = IntegerProperty::new();
        assert_eq!(
            prop.from_app_value(json!("5")).unwrap(),
            WriteValue::Set(json!(5))
        );
        assert_eq!(
            prop.from_app_value(json!(7.9)).unwrap(),
            WriteValue::Set(json!(7))
        );
        assert!(prop.from_app_value(json!("5.5")).is_err());
        assert_eq!(prop.to_db_value(&json!(5), &view()).unwrap(), Bson::Int64(5));
    }

    #[test]
    fn boolean_truthiness() {
        let prop = BooleanProperty::new();
        assert_eq!(
            prop.from_app_value(json!("")).unwrap(),
            WriteValue::Set(json!(false))
        );
        assert_eq!(
            prop.from_app_value(json!(2)).unwrap(),
            WriteValue::Set(json!(true))
        );
    }

    #[test]
    fn required_check_runs_second() {
        let prop = StringProperty::new().required();
        let err = prop.validate(&Value::Null, &view()).unwrap_err();
        assert!(matches!(err, GlueError::Validation(_)));
        assert!(prop.validate(&json!("ok"), &view()).is_ok());
    }

    #[test]
    fn choice_violation_wins_over_required() {
        let prop = StringProperty::new()
            .required()
            .choices(vec![json!("a"), json!("b")]);
        let err = prop.validate(&Value::Null, &view()).unwrap_err();
        let GlueError::Validation(msg) = err else {
            panic!("expected validation error");
        };
        assert!(msg.contains("choices"));
    }

    #[test]
    fn schema_fragment_rejects_bad_shapes() {
        let prop = JsonProperty::new().with_schema(json!({
            "type": "array",
            "minItems": 1,
        }));
        assert!(prop.validate(&json!([]), &view()).is_err());
        assert!(prop.validate(&json!([1]), &view()).is_ok());
        // null skips the schema check
        assert!(prop.validate(&Value::Null, &view()).is_ok());
    }

    #[test]
    fn custom_validator_runs_last() {
        let prop = IntegerProperty::new().validator(|value, _view| {
            if value.as_i64().is_some_and(|i| i < 0) {
                return Err(GlueError::Validation("must not be negative".into()));
            }
            Ok(())
        });
        assert!(prop.validate(&json!(1), &view()).is_ok());
        assert!(prop.validate(&json!(-1), &view()).is_err());
    }

    #[test]
    fn plain_timestamp_round_trips_through_datetime() {
        let prop = TimestampProperty::new();
        let db = prop.to_db_value(&json!(1_700_000_000.5), &view()).unwrap();
        let Bson::DateTime(dt) = db else {
            panic!("expected datetime");
        };
        assert_eq!(dt.timestamp_millis(), 1_700_000_000_500);
        let WriteValue::Set(back) = prop.from_db_value(&Bson::DateTime(dt)).unwrap() else {
            panic!("expected set");
        };
        assert_eq!(back, json!(1_700_000_000.5));
    }

    #[test]
    fn auto_timestamp_assignment_is_discarded() {
        assert_eq!(
            TimestampProperty::new()
                .auto_now()
                .from_app_value(json!(123))
                .unwrap(),
            WriteValue::Skip
        );
        assert_eq!(
            TimestampProperty::new()
                .auto_now_add()
                .from_app_value(json!(123))
                .unwrap(),
            WriteValue::Skip
        );
    }

    #[test]
    fn auto_now_add_stamps_only_when_empty() {
        let prop = TimestampProperty::new().auto_now_add();
        let first = prop.to_db_value(&Value::Null, &view()).unwrap();
        assert!(matches!(first, Bson::DateTime(_)));
        let kept = prop.to_db_value(&json!(1_700_000_000.0), &view()).unwrap();
        let Bson::DateTime(dt) = kept else {
            panic!("expected datetime");
        };
        assert_eq!(dt.timestamp_millis(), 1_700_000_000_000);
    }

    #[test]
    fn timestamp_search_value_never_stamps() {
        let prop = TimestampProperty::new().auto_now();
        let Bson::DateTime(dt) = prop.to_db_search_value(json!(1_000.0)).unwrap() else {
            panic!("expected datetime");
        };
        assert_eq!(dt.timestamp_millis(), 1_000_000);
    }

    #[test]
    fn json_store_as_string_round_trips() {
        let prop = JsonProperty::new().store_as_string();
        let db = prop
            .to_db_value(&json!({"a": [1, 2]}), &view())
            .unwrap();
        let Bson::String(text) = &db else {
            panic!("expected string");
        };
        assert_eq!(text, r#"{"a":[1,2]}"#);
        assert_eq!(
            prop.from_db_value(&db).unwrap(),
            WriteValue::Set(json!({"a": [1, 2]}))
        );
    }

    #[test]
    fn constant_ignores_writes() {
        let prop = ConstantProperty::new("v1");
        assert_eq!(prop.from_app_value(json!("v2")).unwrap(), WriteValue::Skip);
        assert_eq!(
            prop.to_app_value(&Value::Null, &view()).unwrap(),
            json!("v1")
        );
    }

    #[test]
    #[should_panic(expected = "non-null")]
    fn constant_rejects_null_eagerly() {
        let _ = ConstantProperty::new(Value::Null);
    }

    #[test]
    fn computed_and_constant_need_explicit_schema() {
        let computed = ComputedProperty::new(|_| Ok(json!(1)));
        assert!(matches!(
            computed.schema(),
            Err(GlueError::Programming(_))
        ));
        let constant = ConstantProperty::new("x").with_schema(json!({"type": "string"}));
        assert_eq!(constant.schema().unwrap(), json!({"type": "string"}));
    }

    #[test]
    fn default_lands_in_schema_fragment() {
        let prop = IntegerProperty::new().default_value(10);
        assert_eq!(
            prop.schema().unwrap(),
            json!({"type": "number", "default": 10})
        );
    }
}
