//! Query construction for model lookups.
//!
//! Predicates come in two flavors. Application code builds [`Cond`] values
//! (field, operator, JSON value), either directly, via [`Cond::new`] with the
//! textual operator tokens (`"=="`, `"<"`, `"in"`, ...), or through the
//! [`Filter`] helper methods:
//!
//! ```ignore
//! use docglue::query::Filter;
//!
//! let conds = vec![
//!     Filter::eq("name", "apple"),
//!     Filter::gte("price", 100),
//! ];
//! ```
//!
//! The model layer converts each `Cond` through the matching property's
//! search-value conversion and produces a wire-level [`Query`] of
//! [`FieldFilter`]s (BSON values) that is handed to the store client. Sort
//! order is a comma-separated multi-key spec where a leading `-` means
//! descending, e.g. `"category,-price"`.

use bson::Bson;
use serde_json::Value;

use crate::error::{GlueError, GlueResult};

/// Field comparison operators supported by document-store predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    /// Equal to.
    Eq,
    /// Not equal to.
    Ne,
    /// Less than.
    Lt,
    /// Less than or equal to.
    Lte,
    /// Greater than.
    Gt,
    /// Greater than or equal to.
    Gte,
    /// Field value is a member of the given array.
    In,
    /// Field value is not a member of the given array.
    NotIn,
    /// Array field contains the given value.
    ArrayContains,
    /// Array field contains any of the given values.
    ArrayContainsAny,
}

impl FilterOp {
    /// Parses an operator from its textual token.
    ///
    /// Accepted tokens: `==`, `!=`, `<`, `<=`, `>`, `>=`, `in`, `not-in`,
    /// `array-contains`, `array-contains-any`.
    pub fn parse(token: &str) -> GlueResult<Self> {
        match token {
            "==" => Ok(FilterOp::Eq),
            "!=" => Ok(FilterOp::Ne),
            "<" => Ok(FilterOp::Lt),
            "<=" => Ok(FilterOp::Lte),
            ">" => Ok(FilterOp::Gt),
            ">=" => Ok(FilterOp::Gte),
            "in" => Ok(FilterOp::In),
            "not-in" => Ok(FilterOp::NotIn),
            "array-contains" => Ok(FilterOp::ArrayContains),
            "array-contains-any" => Ok(FilterOp::ArrayContainsAny),
            other => Err(GlueError::Programming(format!(
                "unknown filter operator: {other}"
            ))),
        }
    }

    /// Whether this operator takes an array-valued operand whose elements are
    /// converted individually for search.
    pub(crate) fn takes_array_operand(self) -> bool {
        matches!(
            self,
            FilterOp::In | FilterOp::NotIn | FilterOp::ArrayContainsAny
        )
    }
}

/// An application-level query predicate: field, operator, JSON value.
#[derive(Debug, Clone)]
pub struct Cond {
    /// The field name to compare.
    pub field: String,
    /// The comparison operator.
    pub op: FilterOp,
    /// The application-representation value to compare against.
    pub value: Value,
}

impl Cond {
    /// Creates a predicate from a textual operator token.
    pub fn new(
        field: impl Into<String>,
        op: &str,
        value: impl Into<Value>,
    ) -> GlueResult<Self> {
        Ok(Cond {
            field: field.into(),
            op: FilterOp::parse(op)?,
            value: value.into(),
        })
    }
}

/// Helper struct for constructing predicates in a type-safe manner.
pub struct Filter;

impl Filter {
    /// Matches documents where the field equals the value.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Cond {
        Cond { field: field.into(), op: FilterOp::Eq, value: value.into() }
    }

    /// Matches documents where the field does not equal the value.
    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Cond {
        Cond { field: field.into(), op: FilterOp::Ne, value: value.into() }
    }

    /// Matches documents where the field is less than the value.
    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Cond {
        Cond { field: field.into(), op: FilterOp::Lt, value: value.into() }
    }

    /// Matches documents where the field is less than or equal to the value.
    pub fn lte(field: impl Into<String>, value: impl Into<Value>) -> Cond {
        Cond { field: field.into(), op: FilterOp::Lte, value: value.into() }
    }

    /// Matches documents where the field is greater than the value.
    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Cond {
        Cond { field: field.into(), op: FilterOp::Gt, value: value.into() }
    }

    /// Matches documents where the field is greater than or equal to the value.
    pub fn gte(field: impl Into<String>, value: impl Into<Value>) -> Cond {
        Cond { field: field.into(), op: FilterOp::Gte, value: value.into() }
    }

    /// Matches documents where the field is a member of the given values.
    pub fn any_of(field: impl Into<String>, values: impl Into<Value>) -> Cond {
        Cond { field: field.into(), op: FilterOp::In, value: values.into() }
    }

    /// Matches documents where the field is not a member of the given values.
    pub fn none_of(field: impl Into<String>, values: impl Into<Value>) -> Cond {
        Cond { field: field.into(), op: FilterOp::NotIn, value: values.into() }
    }

    /// Matches documents where the array field contains the value.
    pub fn contains(field: impl Into<String>, value: impl Into<Value>) -> Cond {
        Cond { field: field.into(), op: FilterOp::ArrayContains, value: value.into() }
    }

    /// Matches documents where the array field contains any of the values.
    pub fn contains_any(field: impl Into<String>, values: impl Into<Value>) -> Cond {
        Cond { field: field.into(), op: FilterOp::ArrayContainsAny, value: values.into() }
    }
}

/// Sort direction for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Ascending order.
    Asc,
    /// Descending order.
    Desc,
}

/// A single sort key: field name plus direction.
#[derive(Debug, Clone)]
pub struct Sort {
    /// The field name to sort by.
    pub field: String,
    /// The sort direction.
    pub direction: SortDirection,
}

/// Parses a comma-separated multi-key sort spec.
///
/// Each key is a field name, optionally prefixed with `-` for descending
/// order: `"category,-price"` sorts by category ascending, then price
/// descending. Empty segments are ignored.
pub fn parse_order_by(spec: &str) -> Vec<Sort> {
    spec.split(',')
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(|key| match key.strip_prefix('-') {
            Some(field) => Sort {
                field: field.to_string(),
                direction: SortDirection::Desc,
            },
            None => Sort {
                field: key.to_string(),
                direction: SortDirection::Asc,
            },
        })
        .collect()
}

/// A wire-level predicate handed to the store client.
///
/// The value is in store representation: the model layer has already run it
/// through the matching property's search-value conversion.
#[derive(Debug, Clone)]
pub struct FieldFilter {
    /// The field name to compare.
    pub field: String,
    /// The comparison operator.
    pub op: FilterOp,
    /// The store-representation value to compare against.
    pub value: Bson,
}

/// A structured query for retrieving and filtering documents.
///
/// All filters are conjunctive (every filter must match). Use
/// [`QueryBuilder`] for ergonomic construction.
#[derive(Debug, Clone, Default)]
pub struct Query {
    /// Wire-level predicates; all must match.
    pub filters: Vec<FieldFilter>,
    /// Multi-key sort specification, applied in order.
    pub sort: Vec<Sort>,
    /// Maximum number of documents to return.
    pub limit: Option<usize>,
    /// Number of documents to skip.
    pub offset: Option<usize>,
}

impl Query {
    /// Creates a new empty query with no filters or limits.
    pub fn new() -> Self {
        Query::default()
    }

    /// Creates a new query builder for fluent construction.
    pub fn builder() -> QueryBuilder {
        QueryBuilder::new()
    }
}

/// Fluent builder for [`Query`].
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    query: Query,
}

impl QueryBuilder {
    /// Creates a new query builder.
    pub fn new() -> Self {
        QueryBuilder { query: Query::default() }
    }

    /// Appends a wire-level filter to this query.
    pub fn filter(mut self, filter: FieldFilter) -> Self {
        self.query.filters.push(filter);
        self
    }

    /// Appends a sort key to this query.
    pub fn sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.query.sort.push(Sort { field: field.into(), direction });
        self
    }

    /// Sets the maximum number of documents to return.
    pub fn limit(mut self, limit: usize) -> Self {
        self.query.limit = Some(limit);
        self
    }

    /// Sets the number of documents to skip.
    pub fn offset(mut self, offset: usize) -> Self {
        self.query.offset = Some(offset);
        self
    }

    /// Builds and returns the final query.
    pub fn build(self) -> Query {
        self.query
    }
}

/// The addressing scope a query runs against.
#[derive(Debug, Clone)]
pub enum QueryTarget {
    /// A single directly-addressed collection, by full path.
    Collection(String),
    /// Every collection sharing this name, regardless of parent.
    CollectionGroup(String),
}
