//! Structured query requests.
//!
//! Requests are plain data: build them in code or deserialize them from JSON.
//!
//! ```json
//! {
//!   "op": "findMany",
//!   "args": {
//!     "where": { "age": { "gt": 18, "lt": 65 }, "email": "a@b.com" },
//!     "select": { "id": true, "email": true },
//!     "include": { "role": true },
//!     "orderBy": { "age": { "sort": "desc", "nulls": "last" } },
//!     "skip": 10,
//!     "take": 5
//!   }
//! }
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::value::Value;

/// One row of column values, in insertion order.
pub type Record = IndexMap<String, Value>;

/// Column to filter, in insertion order.
pub type WhereMap = IndexMap<String, FilterExpr>;

/// Filter operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterOp {
    Equals,
    Not,
    In,
    NotIn,
    Lt,
    Lte,
    Gt,
    Gte,
    Between,
    Contains,
    StartsWith,
    EndsWith,
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FilterOp::Equals => "equals",
            FilterOp::Not => "not",
            FilterOp::In => "in",
            FilterOp::NotIn => "notIn",
            FilterOp::Lt => "lt",
            FilterOp::Lte => "lte",
            FilterOp::Gt => "gt",
            FilterOp::Gte => "gte",
            FilterOp::Between => "between",
            FilterOp::Contains => "contains",
            FilterOp::StartsWith => "startsWith",
            FilterOp::EndsWith => "endsWith",
        };
        f.write_str(name)
    }
}

/// Constraint on one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterExpr {
    /// One or more operators, applied in order and joined with `AND`.
    Operators(IndexMap<FilterOp, Value>),
    /// Bare value, same as `{ equals: value }`.
    Scalar(Value),
}

impl FilterExpr {
    /// Start a compound filter with a single operator.
    pub fn op(op: FilterOp, value: impl Into<Value>) -> Self {
        let mut ops = IndexMap::new();
        ops.insert(op, value.into());
        FilterExpr::Operators(ops)
    }

    /// Add another operator to a compound filter.
    pub fn and(self, op: FilterOp, value: impl Into<Value>) -> Self {
        let mut ops = match self {
            FilterExpr::Operators(ops) => ops,
            FilterExpr::Scalar(v) => IndexMap::from([(FilterOp::Equals, v)]),
        };
        ops.insert(op, value.into());
        FilterExpr::Operators(ops)
    }
}

impl<T: Into<Value>> From<T> for FilterExpr {
    fn from(value: T) -> Self {
        FilterExpr::Scalar(value.into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Asc => f.write_str("asc"),
            SortOrder::Desc => f.write_str("desc"),
        }
    }
}

/// Where NULLs land in the ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NullsOrder {
    First,
    Last,
}

/// Ordering for one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SortSpec {
    /// Bare direction, same as `{ sort: direction }`.
    Direction(SortOrder),
    Spec {
        #[serde(default)]
        sort: Option<SortOrder>,
        #[serde(default)]
        nulls: Option<NullsOrder>,
    },
}

impl SortSpec {
    pub fn sort(&self) -> Option<SortOrder> {
        match self {
            SortSpec::Direction(order) => Some(*order),
            SortSpec::Spec { sort, .. } => *sort,
        }
    }

    pub fn nulls(&self) -> Option<NullsOrder> {
        match self {
            SortSpec::Direction(_) => None,
            SortSpec::Spec { nulls, .. } => *nulls,
        }
    }
}

impl From<SortOrder> for SortSpec {
    fn from(order: SortOrder) -> Self {
        SortSpec::Direction(order)
    }
}

/// Arguments for `findMany` / `findUnique`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FindArgs {
    #[serde(rename = "where", default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<WhereMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub select: Option<IndexMap<String, bool>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<IndexMap<String, bool>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by: Option<IndexMap<String, SortSpec>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub take: Option<u64>,
}

impl FindArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a `where` constraint.
    pub fn filter(mut self, column: impl Into<String>, expr: impl Into<FilterExpr>) -> Self {
        self.filter
            .get_or_insert_with(IndexMap::new)
            .insert(column.into(), expr.into());
        self
    }

    /// Project a column.
    pub fn select(mut self, column: impl Into<String>) -> Self {
        self.select
            .get_or_insert_with(IndexMap::new)
            .insert(column.into(), true);
        self
    }

    /// Join a relation.
    pub fn include(mut self, relation: impl Into<String>) -> Self {
        self.include
            .get_or_insert_with(IndexMap::new)
            .insert(relation.into(), true);
        self
    }

    /// Order by a column.
    pub fn order_by(mut self, column: impl Into<String>, spec: impl Into<SortSpec>) -> Self {
        self.order_by
            .get_or_insert_with(IndexMap::new)
            .insert(column.into(), spec.into());
        self
    }

    pub fn skip(mut self, n: u64) -> Self {
        self.skip = Some(n);
        self
    }

    pub fn take(mut self, n: u64) -> Self {
        self.take = Some(n);
        self
    }
}

/// Arguments for `update`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateArgs {
    #[serde(rename = "where")]
    pub filter: WhereMap,
    pub data: Record,
}

/// Arguments for `delete`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeleteArgs {
    #[serde(rename = "where")]
    pub filter: WhereMap,
}

/// A request against one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "args", rename_all = "camelCase")]
pub enum Query {
    FindMany(Option<FindArgs>),
    FindUnique(FindArgs),
    Create(Record),
    CreateMany(Vec<Record>),
    Update(UpdateArgs),
    Delete(DeleteArgs),
}

/// Build a [`Record`] from `column => value` pairs.
///
/// ```
/// let row = avant::record! { "email" => "a@b.com", "age" => 30 };
/// assert_eq!(row.len(), 2);
/// ```
#[macro_export]
macro_rules! record {
    ($($col:expr => $val:expr),* $(,)?) => {{
        let mut row = $crate::query::Record::new();
        $(row.insert(($col).to_string(), $crate::value::Value::from($val));)*
        row
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_expr_scalar() {
        let f: FilterExpr = serde_json::from_str("\"a@b.com\"").unwrap();
        assert_eq!(f, FilterExpr::Scalar(Value::from("a@b.com")));
    }

    #[test]
    fn test_filter_expr_operators_keep_order() {
        let f: FilterExpr = serde_json::from_str(r#"{"lt": 65, "gt": 18}"#).unwrap();
        let FilterExpr::Operators(ops) = f else {
            panic!("expected operators");
        };
        let keys: Vec<FilterOp> = ops.keys().copied().collect();
        assert_eq!(keys, vec![FilterOp::Lt, FilterOp::Gt]);
    }

    #[test]
    fn test_filter_expr_unknown_operator() {
        assert!(serde_json::from_str::<FilterExpr>(r#"{"like": "x"}"#).is_err());
    }

    #[test]
    fn test_sort_spec_forms() {
        let s: SortSpec = serde_json::from_str("\"desc\"").unwrap();
        assert_eq!(s.sort(), Some(SortOrder::Desc));
        assert_eq!(s.nulls(), None);

        let s: SortSpec = serde_json::from_str(r#"{"nulls": "first"}"#).unwrap();
        assert_eq!(s.sort(), None);
        assert_eq!(s.nulls(), Some(NullsOrder::First));
    }

    #[test]
    fn test_query_from_json() {
        let q: Query = serde_json::from_str(
            r#"{"op": "findUnique", "args": {"where": {"email": "a@b.com"}, "take": 1}}"#,
        )
        .unwrap();
        let expected = FindArgs::new().filter("email", "a@b.com").take(1);
        assert_eq!(q, Query::FindUnique(expected));
    }

    #[test]
    fn test_find_many_without_args() {
        let q: Query = serde_json::from_str(r#"{"op": "findMany", "args": null}"#).unwrap();
        assert_eq!(q, Query::FindMany(None));
    }

    #[test]
    fn test_update_requires_where() {
        let q = serde_json::from_str::<Query>(r#"{"op": "update", "args": {"data": {"a": 1}}}"#);
        assert!(q.is_err());
    }

    #[test]
    fn test_record_macro() {
        let row = record! { "b" => 1, "a" => "x" };
        let keys: Vec<&str> = row.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["b", "a"]);
    }

    #[test]
    fn test_filter_builder() {
        let f = FilterExpr::op(FilterOp::Gt, 1).and(FilterOp::Lt, 9);
        let FilterExpr::Operators(ops) = f else {
            panic!("expected operators");
        };
        assert_eq!(ops.len(), 2);
    }
}
