//! Predicate evaluation and sorting for in-memory document filtering.

use std::cmp::Ordering;
use std::collections::HashMap;

use bson::{datetime::DateTime, Bson, Document};

use docglue_core::query::{FieldFilter, FilterOp, Sort, SortDirection};

/// Type-erased, comparable representation of BSON values.
///
/// Normalizes the numeric types to f64 so stored integers compare against
/// query doubles and vice versa.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    /// Null value
    Null,
    /// Boolean value
    Bool(bool),
    /// Numeric value (all integers and floats normalized to f64)
    Number(f64),
    /// DateTime value
    DateTime(DateTime),
    /// String value
    String(&'a str),
    /// Array of comparable values
    Array(Vec<Comparable<'a>>),
    /// Map/Object of comparable values
    Map(HashMap<&'a str, Comparable<'a>>),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Number(*value as f64),
            Bson::Int64(value) => Comparable::Number(*value as f64),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::Array(arr) => {
                Comparable::Array(arr.iter().map(Comparable::from).collect::<Vec<_>>())
            }
            Bson::Document(doc) => Comparable::Map(
                doc.iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect::<HashMap<_, _>>(),
            ),
            _ => Comparable::Null, // Other types are not comparable
        }
    }
}

impl<'a> PartialEq for Comparable<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl<'a> PartialOrd for Comparable<'a> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

/// Whether a document satisfies every filter of a conjunctive predicate
/// list. A document without the filtered field never matches, negated
/// operators included.
pub(crate) fn matches_filters(doc: &Document, filters: &[FieldFilter]) -> bool {
    filters.iter().all(|filter| matches_filter(doc, filter))
}

fn matches_filter(doc: &Document, filter: &FieldFilter) -> bool {
    let Some(field_value) = doc.get(&filter.field) else {
        return false;
    };
    let left = Comparable::from(field_value);
    let right = Comparable::from(&filter.value);
    match filter.op {
        FilterOp::Eq => left == right,
        FilterOp::Ne => left != right,
        FilterOp::Lt | FilterOp::Lte | FilterOp::Gt | FilterOp::Gte => {
            match left.partial_cmp(&right) {
                Some(ordering) => match filter.op {
                    FilterOp::Lt => ordering == Ordering::Less,
                    FilterOp::Lte => ordering != Ordering::Greater,
                    FilterOp::Gt => ordering == Ordering::Greater,
                    FilterOp::Gte => ordering != Ordering::Less,
                    _ => unreachable!(),
                },
                None => false,
            }
        }
        FilterOp::In => match right {
            Comparable::Array(values) => values.iter().any(|value| value == &left),
            _ => false,
        },
        FilterOp::NotIn => match right {
            Comparable::Array(values) => !values.iter().any(|value| value == &left),
            _ => false,
        },
        FilterOp::ArrayContains => match left {
            Comparable::Array(items) => items.iter().any(|item| item == &right),
            _ => false,
        },
        FilterOp::ArrayContainsAny => match (left, right) {
            (Comparable::Array(items), Comparable::Array(values)) => {
                values.iter().any(|value| items.iter().any(|item| item == value))
            }
            _ => false,
        },
    }
}

/// Multi-key document comparator for a sort spec; keys apply in order and
/// incomparable values rank equal.
pub(crate) fn compare_documents(a: &Document, b: &Document, sort: &[Sort]) -> Ordering {
    for key in sort {
        let left = a.get(&key.field).map(Comparable::from).unwrap_or(Comparable::Null);
        let right = b.get(&key.field).map(Comparable::from).unwrap_or(Comparable::Null);
        let ordering = match key.direction {
            SortDirection::Asc => left.partial_cmp(&right).unwrap_or(Ordering::Equal),
            SortDirection::Desc => right.partial_cmp(&left).unwrap_or(Ordering::Equal),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    fn filter(field: &str, op: FilterOp, value: impl Into<Bson>) -> FieldFilter {
        FieldFilter {
            field: field.to_string(),
            op,
            value: value.into(),
        }
    }

    #[test]
    fn numeric_types_compare_across_widths() {
        let document = doc! { "price": 100i64 };
        assert!(matches_filters(
            &document,
            &[filter("price", FilterOp::Eq, 100.0)]
        ));
        assert!(matches_filters(
            &document,
            &[filter("price", FilterOp::Lt, 200i32)]
        ));
    }

    #[test]
    fn missing_field_never_matches() {
        let document = doc! { "name": "apple" };
        assert!(!matches_filters(
            &document,
            &[filter("price", FilterOp::Ne, 1i64)]
        ));
        assert!(!matches_filters(
            &document,
            &[filter(
                "price",
                FilterOp::NotIn,
                Bson::Array(vec![Bson::Int64(1)])
            )]
        ));
    }

    #[test]
    fn membership_operators() {
        let document = doc! { "name": "apple", "tags": ["red", "sweet"] };
        assert!(matches_filters(
            &document,
            &[filter(
                "name",
                FilterOp::In,
                Bson::Array(vec!["apple".into(), "pear".into()])
            )]
        ));
        assert!(matches_filters(
            &document,
            &[filter("tags", FilterOp::ArrayContains, "red")]
        ));
        assert!(matches_filters(
            &document,
            &[filter(
                "tags",
                FilterOp::ArrayContainsAny,
                Bson::Array(vec!["green".into(), "sweet".into()])
            )]
        ));
        assert!(!matches_filters(
            &document,
            &[filter(
                "tags",
                FilterOp::ArrayContainsAny,
                Bson::Array(vec!["green".into()])
            )]
        ));
    }

    #[test]
    fn multi_key_sort_applies_in_order() {
        let a = doc! { "category": "fruit", "price": 100i64 };
        let b = doc! { "category": "fruit", "price": 200i64 };
        let sort = vec![
            Sort {
                field: "category".to_string(),
                direction: SortDirection::Asc,
            },
            Sort {
                field: "price".to_string(),
                direction: SortDirection::Desc,
            },
        ];
        assert_eq!(compare_documents(&a, &b, &sort), Ordering::Greater);
    }
}
