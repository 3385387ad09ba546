//! Queries against the object service.
//!
//! A [`Query`] names a class and carries filter conditions, a sort spec,
//! field includes and a limit/skip window. Filters mirror the service's
//! query language: comparisons on a field (`$eq`, `$ne`, `$gt`, `$gte`,
//! `$lt`, `$lte`, `$in`) combined with `$and`, `$or` and `$nor`.
//!
//! [`Filter::matches`] evaluates a filter locally; the in-memory and file
//! services use it, and the grid uses it to decide whether an edited row still
//! belongs in the current view.

use crate::object::DataObject;
use crate::value::Value;
use indexmap::IndexMap;
use serde_json::{json, Map};
use std::cmp::Ordering;

pub const DEFAULT_LIMIT: usize = 100;

/// Comparison operation of a field condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    /// Field value is one of a list.
    In,
}

impl FilterOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOp::Eq => "$eq",
            FilterOp::Ne => "$ne",
            FilterOp::Gt => "$gt",
            FilterOp::Gte => "$gte",
            FilterOp::Lt => "$lt",
            FilterOp::Lte => "$lte",
            FilterOp::In => "$in",
        }
    }

    pub fn parse(s: &str) -> Option<FilterOp> {
        Some(match s {
            "$eq" => FilterOp::Eq,
            "$ne" => FilterOp::Ne,
            "$gt" => FilterOp::Gt,
            "$gte" => FilterOp::Gte,
            "$lt" => FilterOp::Lt,
            "$lte" => FilterOp::Lte,
            "$in" => FilterOp::In,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Nor(Vec<Filter>),
    Compare {
        field: String,
        op: FilterOp,
        value: Value,
    },
}

impl Filter {
    pub fn compare(field: impl Into<String>, op: FilterOp, value: Value) -> Self {
        Filter::Compare {
            field: field.into(),
            op,
            value,
        }
    }

    pub fn eq(field: impl Into<String>, value: Value) -> Self {
        Self::compare(field, FilterOp::Eq, value)
    }

    pub fn ne(field: impl Into<String>, value: Value) -> Self {
        Self::compare(field, FilterOp::Ne, value)
    }

    pub fn is_in(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self::compare(field, FilterOp::In, Value::Array(values))
    }

    /// Service wire form: `{field: {"$op": value}}` or `{"$and": [...]}`.
    pub fn to_json(&self) -> serde_json::Value {
        let (key, body) = match self {
            Filter::And(exprs) => ("$and".to_string(), group_json(exprs)),
            Filter::Or(exprs) => ("$or".to_string(), group_json(exprs)),
            Filter::Nor(exprs) => ("$nor".to_string(), group_json(exprs)),
            Filter::Compare { field, op, value } => {
                let mut condition = Map::new();
                condition.insert(op.as_str().to_string(), value.to_json());
                (field.clone(), serde_json::Value::Object(condition))
            }
        };
        let mut map = Map::new();
        map.insert(key, body);
        serde_json::Value::Object(map)
    }

    /// Parse the wire form. A record with several field keys becomes an `And`.
    pub fn from_json(json: &serde_json::Value) -> Option<Filter> {
        let map = json.as_object()?;
        let mut parts = Vec::new();
        for (key, body) in map {
            let part = match key.as_str() {
                "$and" | "$or" | "$nor" => {
                    let exprs = body
                        .as_array()?
                        .iter()
                        .map(Filter::from_json)
                        .collect::<Option<Vec<_>>>()?;
                    match key.as_str() {
                        "$and" => Filter::And(exprs),
                        "$or" => Filter::Or(exprs),
                        _ => Filter::Nor(exprs),
                    }
                }
                field => match body {
                    serde_json::Value::Object(ops)
                        if ops.keys().all(|k| FilterOp::parse(k).is_some()) =>
                    {
                        let mut conditions = ops
                            .iter()
                            .filter_map(|(op, v)| {
                                Some(Filter::compare(field, FilterOp::parse(op)?, Value::from_json(v)))
                            })
                            .collect::<Vec<_>>();
                        if conditions.len() == 1 {
                            conditions.pop()?
                        } else {
                            Filter::And(conditions)
                        }
                    }
                    // Shorthand `{field: value}` means equality.
                    other => Filter::eq(field, Value::from_json(other)),
                },
            };
            parts.push(part);
        }
        if parts.len() == 1 {
            parts.pop()
        } else {
            Some(Filter::And(parts))
        }
    }

    /// Evaluate against a row.
    pub fn matches(&self, obj: &DataObject) -> bool {
        match self {
            Filter::And(exprs) => exprs.iter().all(|f| f.matches(obj)),
            Filter::Or(exprs) => exprs.iter().any(|f| f.matches(obj)),
            Filter::Nor(exprs) => !exprs.iter().any(|f| f.matches(obj)),
            Filter::Compare { field, op, value } => {
                let actual = obj.value(field);
                match op {
                    FilterOp::Eq => values_equal(&actual, value),
                    FilterOp::Ne => !values_equal(&actual, value),
                    FilterOp::In => match value {
                        Value::Array(options) => options.iter().any(|o| values_equal(&actual, o)),
                        _ => false,
                    },
                    FilterOp::Gt => ordered(&actual, value) == Some(Ordering::Greater),
                    FilterOp::Gte => matches!(
                        ordered(&actual, value),
                        Some(Ordering::Greater | Ordering::Equal)
                    ),
                    FilterOp::Lt => ordered(&actual, value) == Some(Ordering::Less),
                    FilterOp::Lte => matches!(
                        ordered(&actual, value),
                        Some(Ordering::Less | Ordering::Equal)
                    ),
                }
            }
        }
    }
}

fn group_json(exprs: &[Filter]) -> serde_json::Value {
    serde_json::Value::Array(exprs.iter().map(Filter::to_json).collect())
}

/// Equality as the service applies it: pointers match their id, numbers
/// match decimals, and an array field matches when any element does.
fn values_equal(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Pointer(a), Value::Pointer(b)) => a == b,
        (Value::Pointer(a), Value::String(id)) | (Value::String(id), Value::Pointer(a)) => {
            &a.id == id
        }
        (Value::File(a), Value::String(id)) => &a.id == id,
        (Value::Number(_) | Value::Decimal(_), Value::Number(_) | Value::Decimal(_)) => {
            actual.total_cmp(expected) == Ordering::Equal
        }
        (Value::Array(items), expected) if !matches!(expected, Value::Array(_)) => {
            items.iter().any(|item| values_equal(item, expected))
        }
        (a, b) => a == b,
    }
}

/// Ordering between values of the same family, `None` across families.
fn ordered(actual: &Value, expected: &Value) -> Option<Ordering> {
    match (actual, expected) {
        (Value::Number(_) | Value::Decimal(_), Value::Number(_) | Value::Decimal(_))
        | (Value::String(_), Value::String(_))
        | (Value::Date(_), Value::Date(_))
        | (Value::Bool(_), Value::Bool(_)) => Some(actual.total_cmp(expected)),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn as_i8(&self) -> i8 {
        match self {
            SortOrder::Ascending => 1,
            SortOrder::Descending => -1,
        }
    }

    pub fn flip(&self) -> SortOrder {
        match self {
            SortOrder::Ascending => SortOrder::Descending,
            SortOrder::Descending => SortOrder::Ascending,
        }
    }
}

/// Ordered sort keys. Earlier keys take precedence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec(IndexMap<String, SortOrder>);

impl Default for SortSpec {
    fn default() -> Self {
        let mut keys = IndexMap::new();
        keys.insert(crate::object::ID_FIELD.to_string(), SortOrder::Ascending);
        Self(keys)
    }
}

impl SortSpec {
    pub fn empty() -> Self {
        Self(IndexMap::new())
    }

    pub fn by(column: impl Into<String>, order: SortOrder) -> Self {
        let mut keys = IndexMap::new();
        keys.insert(column.into(), order);
        Self(keys)
    }

    /// Append a lower-precedence key.
    pub fn then(mut self, column: impl Into<String>, order: SortOrder) -> Self {
        let column = column.into();
        self.0.shift_remove(&column);
        self.0.insert(column, order);
        self
    }

    pub fn get(&self, column: &str) -> Option<&SortOrder> {
        self.0.get(column)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SortOrder)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Column header press.
    ///
    /// The pressed column flips to descending if it was ascending, otherwise
    /// becomes ascending. A plain press drops every other key; an additive
    /// press keeps them and moves the pressed column last.
    pub fn toggle(&mut self, column: &str, additive: bool) {
        let next = match self.0.get(column) {
            Some(SortOrder::Ascending) => SortOrder::Descending,
            _ => SortOrder::Ascending,
        };
        if additive {
            self.0.shift_remove(column);
        } else {
            self.0.clear();
        }
        self.0.insert(column.to_string(), next);
    }

    pub fn compare(&self, a: &DataObject, b: &DataObject) -> Ordering {
        for (column, order) in &self.0 {
            let ord = a.value(column).total_cmp(&b.value(column));
            let ord = match order {
                SortOrder::Ascending => ord,
                SortOrder::Descending => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.0
                .iter()
                .map(|(k, v)| (k.clone(), json!(v.as_i8())))
                .collect(),
        )
    }
}

/// Page window over a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub limit: usize,
    pub page: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            page: 0,
        }
    }
}

impl Pagination {
    pub fn offset(&self) -> usize {
        self.limit * self.page
    }

    pub fn page_count(&self, total: usize) -> usize {
        if self.limit == 0 {
            return 0;
        }
        total.div_ceil(self.limit)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub class_name: String,
    pub filters: Vec<Filter>,
    pub sort: SortSpec,
    pub includes: Vec<String>,
    pub limit: Option<usize>,
    pub skip: usize,
}

impl Query {
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            filters: Vec::new(),
            sort: SortSpec::empty(),
            includes: Vec::new(),
            limit: None,
            skip: 0,
        }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn sort(mut self, sort: SortSpec) -> Self {
        self.sort = sort;
        self
    }

    pub fn includes<I, T>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.includes.extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn skip(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }

    pub fn page(self, page: Pagination) -> Self {
        self.limit(page.limit).skip(page.offset())
    }

    pub fn matches(&self, obj: &DataObject) -> bool {
        obj.class_name == self.class_name && self.filters.iter().all(|f| f.matches(obj))
    }

    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "className": self.class_name,
            "filter": self.filters.iter().map(Filter::to_json).collect::<Vec<_>>(),
            "sort": self.sort.to_json(),
            "includes": self.includes,
            "limit": self.limit,
            "skip": self.skip,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ObjectRef;
    use rust_decimal::Decimal;

    fn user(id: &str, age: f64) -> DataObject {
        DataObject::with_id("User", id).set_with("age", age)
    }

    #[test]
    fn comparisons() {
        let obj = user("u1", 30.0);
        assert!(Filter::eq("age", Value::Number(30.0)).matches(&obj));
        assert!(Filter::eq("age", Value::Decimal(Decimal::new(30, 0))).matches(&obj));
        assert!(Filter::compare("age", FilterOp::Gte, Value::Number(30.0)).matches(&obj));
        assert!(!Filter::compare("age", FilterOp::Gt, Value::Number(30.0)).matches(&obj));
        assert!(!Filter::compare("age", FilterOp::Lt, Value::from("40")).matches(&obj));
        assert!(Filter::eq("_id", Value::from("u1")).matches(&obj));
        assert!(Filter::is_in("_id", vec![Value::from("u0"), Value::from("u1")]).matches(&obj));
    }

    #[test]
    fn pointers_and_arrays() {
        let post = DataObject::with_id("Post", "p1")
            .set_with("author", ObjectRef::new("User", "u1"))
            .set_with("tags", Value::Array(vec![Value::from("a"), Value::from("b")]));
        assert!(Filter::eq("author", Value::Pointer(ObjectRef::new("User", "u1"))).matches(&post));
        assert!(Filter::eq("author", Value::from("u1")).matches(&post));
        assert!(Filter::eq("tags", Value::from("b")).matches(&post));
        assert!(Filter::ne("tags", Value::from("c")).matches(&post));
    }

    #[test]
    fn logical_combinators() {
        let obj = user("u1", 30.0);
        let young = Filter::compare("age", FilterOp::Lt, Value::Number(18.0));
        let named = Filter::eq("_id", Value::from("u1"));
        assert!(Filter::Or(vec![young.clone(), named.clone()]).matches(&obj));
        assert!(!Filter::And(vec![young.clone(), named.clone()]).matches(&obj));
        assert!(Filter::Nor(vec![young]).matches(&obj));
    }

    #[test]
    fn wire_form_parses_back() {
        let filter = Filter::Or(vec![
            Filter::eq("name", Value::from("Ada")),
            Filter::compare("age", FilterOp::Lte, Value::Number(3.5)),
        ]);
        assert_eq!(Filter::from_json(&filter.to_json()), Some(filter));
        assert_eq!(
            Filter::from_json(&json!({ "name": "Ada" })),
            Some(Filter::eq("name", Value::from("Ada")))
        );
    }

    #[test]
    fn toggle_sort() {
        let mut sort = SortSpec::default();
        sort.toggle("_id", false);
        assert_eq!(sort, SortSpec::by("_id", SortOrder::Descending));
        sort.toggle("_id", false);
        assert_eq!(sort, SortSpec::by("_id", SortOrder::Ascending));

        sort.toggle("age", false);
        assert_eq!(sort, SortSpec::by("age", SortOrder::Ascending));

        sort.toggle("name", true);
        sort.toggle("age", true);
        let keys: Vec<_> = sort.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        assert_eq!(
            keys,
            vec![("name", SortOrder::Ascending), ("age", SortOrder::Descending)]
        );
    }

    #[test]
    fn sort_compares_in_key_order() {
        let mut rows = vec![user("b", 1.0), user("a", 2.0), user("c", 1.0)];
        let mut sort = SortSpec::by("age", SortOrder::Descending);
        sort.toggle("_id", true);
        rows.sort_by(|a, b| sort.compare(a, b));
        let ids: Vec<_> = rows.iter().map(|r| r.id.clone().unwrap()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn pagination_window() {
        let page = Pagination { limit: 10, page: 2 };
        let q = Query::new("User").page(page);
        assert_eq!((q.limit, q.skip), (Some(10), 20));
        assert_eq!(page.page_count(21), 3);
        assert_eq!(Pagination::default().limit, 100);
    }
}
