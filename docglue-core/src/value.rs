//! Conversions between application values (JSON) and store values (BSON).
//!
//! The mapping layer keeps two value domains: application-facing and internal
//! values are [`serde_json::Value`], while everything handed to or received
//! from a store client is [`bson::Bson`]. The converters here are structural
//! and total; property kinds that need a richer wire shape (datetimes, string
//! encoded JSON) override their own conversion hooks instead.

use bson::{Bson, Document};
use serde_json::{Map, Number, Value};

/// Converts an application/internal JSON value to its structural BSON form.
///
/// Integers become `Int64`, everything else numeric becomes `Double`.
/// Non-finite floats degrade to `Null` (they have no JSON representation
/// either).
pub fn json_to_bson(value: &Value) -> Bson {
    match value {
        Value::Null => Bson::Null,
        Value::Bool(b) => Bson::Boolean(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Bson::Int64(i)
            } else if let Some(f) = n.as_f64() {
                Bson::Double(f)
            } else {
                // u64 above i64::MAX; saturate rather than wrap
                Bson::Int64(i64::MAX)
            }
        }
        Value::String(s) => Bson::String(s.clone()),
        Value::Array(items) => Bson::Array(items.iter().map(json_to_bson).collect()),
        Value::Object(map) => Bson::Document(
            map.iter()
                .map(|(k, v)| (k.clone(), json_to_bson(v)))
                .collect(),
        ),
    }
}

/// Converts a store BSON value back to its structural JSON form.
///
/// Datetimes become epoch-seconds numbers; BSON types with no sensible JSON
/// counterpart collapse to `Null`.
pub fn bson_to_json(value: &Bson) -> Value {
    match value {
        Bson::Null => Value::Null,
        Bson::Boolean(b) => Value::Bool(*b),
        Bson::Int32(i) => Value::from(i64::from(*i)),
        Bson::Int64(i) => Value::from(*i),
        Bson::Double(f) => Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Bson::String(s) => Value::String(s.clone()),
        Bson::DateTime(dt) => Value::from(dt.timestamp_millis() as f64 / 1000.0),
        Bson::Array(items) => Value::Array(items.iter().map(bson_to_json).collect()),
        Bson::Document(doc) => Value::Object(
            doc.iter()
                .map(|(k, v)| (k.clone(), bson_to_json(v)))
                .collect::<Map<String, Value>>(),
        ),
        _ => Value::Null,
    }
}

/// Converts a whole JSON object into a BSON document.
///
/// Non-object inputs yield an empty document; callers are expected to pass the
/// object-shaped dicts the model layer produces.
pub fn json_map_to_document(map: &Map<String, Value>) -> Document {
    map.iter()
        .map(|(k, v)| (k.clone(), json_to_bson(v)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalars_round_trip() {
        for value in [
            json!(null),
            json!(true),
            json!(42),
            json!(-7),
            json!(1.5),
            json!("hello"),
        ] {
            assert_eq!(bson_to_json(&json_to_bson(&value)), value);
        }
    }

    #[test]
    fn composites_round_trip() {
        let value = json!({
            "name": "apple",
            "tags": ["fruit", "red"],
            "nested": {"price": 100, "ratio": 0.5},
        });
        assert_eq!(bson_to_json(&json_to_bson(&value)), value);
    }

    #[test]
    fn integers_stay_integers() {
        assert_eq!(json_to_bson(&json!(5)), Bson::Int64(5));
        assert_eq!(json_to_bson(&json!(5.0)), Bson::Double(5.0));
    }

    #[test]
    fn datetime_becomes_epoch_seconds() {
        let dt = Bson::DateTime(bson::DateTime::from_millis(1_700_000_000_500));
        assert_eq!(bson_to_json(&dt), json!(1_700_000_000.5));
    }
}
