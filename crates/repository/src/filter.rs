//! Query filters.
//!
//! A [`Filter`] selects, orders, pages and projects rows:
//!
//! ```json
//! {
//!   "where": {"customerId": 1, "total": {"gt": 10}, "or": [{"isShipped": false}]},
//!   "order": "total DESC",
//!   "skip": 0,
//!   "limit": 10,
//!   "fields": {"id": true, "total": true}
//! }
//! ```

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::Document;

/// A single comparison applied to one property.
#[derive(Debug, Clone, PartialEq)]
pub enum Operator {
    Eq(Value),
    Neq(Value),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    Inq(Vec<Value>),
    Nin(Vec<Value>),
    Between(Value, Value),
    Exists(bool),
    Like(String),
    Nlike(String),
}

impl Operator {
    fn name(&self) -> &'static str {
        match self {
            Operator::Eq(_) => "eq",
            Operator::Neq(_) => "neq",
            Operator::Gt(_) => "gt",
            Operator::Gte(_) => "gte",
            Operator::Lt(_) => "lt",
            Operator::Lte(_) => "lte",
            Operator::Inq(_) => "inq",
            Operator::Nin(_) => "nin",
            Operator::Between(..) => "between",
            Operator::Exists(_) => "exists",
            Operator::Like(_) => "like",
            Operator::Nlike(_) => "nlike",
        }
    }

    fn parse(name: &str, operand: Value) -> Result<Self, String> {
        let list = |operand: Value| match operand {
            Value::Array(items) => Ok(items),
            other => Err(format!("`{}` expects an array, got {}", name, other)),
        };
        let pattern = |operand: Value| match operand {
            Value::String(s) => Ok(s),
            other => Err(format!("`{}` expects a string, got {}", name, other)),
        };
        Ok(match name {
            "eq" => Operator::Eq(operand),
            "neq" => Operator::Neq(operand),
            "gt" => Operator::Gt(operand),
            "gte" => Operator::Gte(operand),
            "lt" => Operator::Lt(operand),
            "lte" => Operator::Lte(operand),
            "inq" => Operator::Inq(list(operand)?),
            "nin" => Operator::Nin(list(operand)?),
            "between" => {
                let mut bounds = list(operand)?;
                if bounds.len() != 2 {
                    return Err("`between` expects exactly two bounds".to_string());
                }
                let high = bounds.remove(1);
                Operator::Between(bounds.remove(0), high)
            }
            "exists" => match operand {
                Value::Bool(b) => Operator::Exists(b),
                other => return Err(format!("`exists` expects a boolean, got {}", other)),
            },
            "like" => Operator::Like(pattern(operand)?),
            "nlike" => Operator::Nlike(pattern(operand)?),
            other => return Err(format!("unknown operator `{}`", other)),
        })
    }

    fn operand(&self) -> Value {
        match self {
            Operator::Eq(v)
            | Operator::Neq(v)
            | Operator::Gt(v)
            | Operator::Gte(v)
            | Operator::Lt(v)
            | Operator::Lte(v) => v.clone(),
            Operator::Inq(items) | Operator::Nin(items) => Value::Array(items.clone()),
            Operator::Between(low, high) => Value::Array(vec![low.clone(), high.clone()]),
            Operator::Exists(b) => Value::Bool(*b),
            Operator::Like(p) | Operator::Nlike(p) => Value::String(p.clone()),
        }
    }

    fn matches(&self, actual: Option<&Value>) -> bool {
        let value = actual.unwrap_or(&Value::Null);
        match self {
            Operator::Eq(expected) => matches_eq(value, expected),
            Operator::Neq(expected) => !matches_eq(value, expected),
            Operator::Gt(bound) => compare(value, bound) == Some(Ordering::Greater),
            Operator::Gte(bound) => matches!(
                compare(value, bound),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Operator::Lt(bound) => compare(value, bound) == Some(Ordering::Less),
            Operator::Lte(bound) => {
                matches!(compare(value, bound), Some(Ordering::Less | Ordering::Equal))
            }
            Operator::Inq(items) => items.iter().any(|item| matches_eq(value, item)),
            Operator::Nin(items) => !items.iter().any(|item| matches_eq(value, item)),
            Operator::Between(low, high) => {
                matches!(compare(value, low), Some(Ordering::Greater | Ordering::Equal))
                    && matches!(compare(value, high), Some(Ordering::Less | Ordering::Equal))
            }
            Operator::Exists(expected) => (!value.is_null()) == *expected,
            Operator::Like(pattern) => like(value, pattern),
            Operator::Nlike(pattern) => !like(value, pattern),
        }
    }
}

const OPERATORS: &[&str] = &[
    "eq", "neq", "gt", "gte", "lt", "lte", "inq", "nin", "between", "exists", "like", "nlike",
];

/// Condition on one property: a bare value means equality.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Equals(Value),
    Operators(Vec<Operator>),
}

impl Condition {
    fn parse(value: Value) -> Result<Self, String> {
        match value {
            Value::Object(map)
                if !map.is_empty() && map.keys().all(|k| OPERATORS.contains(&k.as_str())) =>
            {
                let operators = map
                    .into_iter()
                    .map(|(name, operand)| Operator::parse(&name, operand))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Condition::Operators(operators))
            }
            other => Ok(Condition::Equals(other)),
        }
    }

    fn to_value(&self) -> Value {
        match self {
            Condition::Equals(v) => v.clone(),
            Condition::Operators(ops) => Value::Object(
                ops.iter()
                    .map(|op| (op.name().to_string(), op.operand()))
                    .collect(),
            ),
        }
    }

    pub fn matches(&self, actual: Option<&Value>) -> bool {
        match self {
            Condition::Equals(expected) => matches_eq(actual.unwrap_or(&Value::Null), expected),
            Condition::Operators(ops) => ops.iter().all(|op| op.matches(actual)),
        }
    }
}

/// A where clause: property conditions combined with AND, plus optional
/// nested `and` / `or` groups.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct Where {
    pub conditions: BTreeMap<String, Condition>,
    pub and: Vec<Where>,
    pub or: Vec<Where>,
}

impl Where {
    pub fn new() -> Self {
        Self::default()
    }

    /// `{property: value}`
    pub fn eq(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new().condition(property, Condition::Equals(value.into()))
    }

    pub fn condition(mut self, property: impl Into<String>, condition: Condition) -> Self {
        self.conditions.insert(property.into(), condition);
        self
    }

    pub fn and(mut self, clause: Where) -> Self {
        self.and.push(clause);
        self
    }

    pub fn or(mut self, clauses: Vec<Where>) -> Self {
        self.or.extend(clauses);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty() && self.and.is_empty() && self.or.is_empty()
    }

    /// Names of all properties referenced by this clause, nested groups included.
    pub fn properties(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.conditions.keys().map(String::as_str).collect();
        for nested in self.and.iter().chain(self.or.iter()) {
            names.extend(nested.properties());
        }
        names
    }

    /// Combine with `other` by logical AND.
    ///
    /// A property constrained on both sides keeps both conditions, so a
    /// caller cannot widen a constraint imposed here.
    pub fn impose(mut self, other: Where) -> Self {
        if self.is_empty() {
            return other;
        }
        if other.is_empty() {
            return self;
        }
        let mut clashing = Where::new();
        for (property, condition) in other.conditions {
            match self.conditions.get(&property) {
                Some(existing) if *existing != condition => {
                    clashing.conditions.insert(property, condition);
                }
                Some(_) => {}
                None => {
                    self.conditions.insert(property, condition);
                }
            }
        }
        if !clashing.is_empty() {
            self.and.push(clashing);
        }
        self.and.extend(other.and);
        if !other.or.is_empty() {
            if self.or.is_empty() {
                self.or = other.or;
            } else {
                self.and.push(Where::new().or(other.or));
            }
        }
        self
    }

    pub fn matches(&self, row: &Document) -> bool {
        self.conditions
            .iter()
            .all(|(property, condition)| condition.matches(row.get(property)))
            && self.and.iter().all(|clause| clause.matches(row))
            && (self.or.is_empty() || self.or.iter().any(|clause| clause.matches(row)))
    }
}

impl TryFrom<Value> for Where {
    type Error = String;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let map = match value {
            Value::Object(map) => map,
            Value::Null => return Ok(Where::new()),
            other => return Err(format!("where clause must be an object, got {}", other)),
        };
        let mut clause = Where::new();
        for (key, value) in map {
            match key.as_str() {
                "and" | "or" => {
                    let Value::Array(items) = value else {
                        return Err(format!("`{}` expects an array of where clauses", key));
                    };
                    let nested = items
                        .into_iter()
                        .map(Where::try_from)
                        .collect::<Result<Vec<_>, _>>()?;
                    if key == "and" {
                        clause.and.extend(nested);
                    } else {
                        clause.or.extend(nested);
                    }
                }
                _ => {
                    clause.conditions.insert(key, Condition::parse(value)?);
                }
            }
        }
        Ok(clause)
    }
}

impl From<Where> for Value {
    fn from(clause: Where) -> Self {
        let mut map: Map<String, Value> = clause
            .conditions
            .iter()
            .map(|(k, c)| (k.clone(), c.to_value()))
            .collect();
        if !clause.and.is_empty() {
            map.insert(
                "and".into(),
                Value::Array(clause.and.into_iter().map(Value::from).collect()),
            );
        }
        if !clause.or.is_empty() {
            map.insert(
                "or".into(),
                Value::Array(clause.or.into_iter().map(Value::from).collect()),
            );
        }
        Value::Object(map)
    }
}

/// Sort direction of an `order` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// Property projection. `{"name": true}` keeps only the listed properties,
/// `{"secret": false}` drops the listed ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct Fields(pub BTreeMap<String, bool>);

impl Fields {
    pub fn only<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Fields(names.into_iter().map(|n| (n.into(), true)).collect())
    }

    pub fn project(&self, row: Document) -> Document {
        if self.0.values().any(|included| *included) {
            row.into_iter()
                .filter(|(k, _)| self.0.get(k).copied().unwrap_or(false))
                .collect()
        } else {
            row.into_iter()
                .filter(|(k, _)| self.0.get(k).copied().unwrap_or(true))
                .collect()
        }
    }
}

impl TryFrom<Value> for Fields {
    type Error = String;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => map
                .into_iter()
                .map(|(k, v)| match v {
                    Value::Bool(b) => Ok((k, b)),
                    other => Err(format!("field `{}` must be true or false, got {}", k, other)),
                })
                .collect::<Result<_, _>>()
                .map(Fields),
            Value::Array(items) => items
                .into_iter()
                .map(|v| match v {
                    Value::String(s) => Ok((s, true)),
                    other => Err(format!("field names must be strings, got {}", other)),
                })
                .collect::<Result<_, _>>()
                .map(Fields),
            other => Err(format!("fields must be an object or array, got {}", other)),
        }
    }
}

impl From<Fields> for Value {
    fn from(fields: Fields) -> Self {
        Value::Object(fields.0.into_iter().map(|(k, v)| (k, Value::Bool(v))).collect())
    }
}

fn order_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(entry)) => entry.split(',').map(|s| s.trim().to_string()).collect(),
        Some(OneOrMany::Many(entries)) => entries,
    })
}

/// Query filter accepted by `find`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    #[serde(rename = "where", default, skip_serializing_if = "Option::is_none")]
    pub where_: Option<Where>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Fields>,
    /// Entries like `"total DESC"`. A single comma separated string is accepted.
    #[serde(default, deserialize_with = "order_list", skip_serializing_if = "Vec::is_empty")]
    pub order: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    #[serde(default, alias = "offset", skip_serializing_if = "Option::is_none")]
    pub skip: Option<usize>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn where_(mut self, clause: Where) -> Self {
        self.where_ = Some(clause);
        self
    }

    pub fn order(mut self, entry: impl Into<String>) -> Self {
        self.order.push(entry.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn skip(mut self, skip: usize) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn fields(mut self, fields: Fields) -> Self {
        self.fields = Some(fields);
        self
    }

    /// Parsed `order` entries. Unknown directions sort ascending.
    pub fn ordering(&self) -> Vec<(&str, Direction)> {
        self.order
            .iter()
            .filter_map(|entry| {
                let mut parts = entry.split_whitespace();
                let property = parts.next()?;
                let direction = match parts.next() {
                    Some(d) if d.eq_ignore_ascii_case("desc") => Direction::Desc,
                    _ => Direction::Asc,
                };
                Some((property, direction))
            })
            .collect()
    }

    /// Run the filter over an in-memory row set.
    pub fn apply(&self, rows: impl IntoIterator<Item = Document>) -> Vec<Document> {
        let mut selected: Vec<Document> = rows
            .into_iter()
            .filter(|row| self.where_.as_ref().map_or(true, |w| w.matches(row)))
            .collect();

        let ordering = self.ordering();
        if !ordering.is_empty() {
            selected.sort_by(|a, b| {
                for (property, direction) in &ordering {
                    let left = a.get(*property).unwrap_or(&Value::Null);
                    let right = b.get(*property).unwrap_or(&Value::Null);
                    let ord = sort_order(left, right);
                    let ord = match direction {
                        Direction::Asc => ord,
                        Direction::Desc => ord.reverse(),
                    };
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                Ordering::Equal
            });
        }

        let paged = selected
            .into_iter()
            .skip(self.skip.unwrap_or(0))
            .take(self.limit.unwrap_or(usize::MAX));

        match &self.fields {
            Some(fields) => paged.map(|row| fields.project(row)).collect(),
            None => paged.collect(),
        }
    }
}

/// Equality with numbers compared by value, so `1` matches `1.0`.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        _ => a == b,
    }
}

/// Equality where an array value matches any of its elements.
fn matches_eq(actual: &Value, expected: &Value) -> bool {
    match actual {
        Value::Array(items) if !expected.is_array() => {
            items.iter().any(|item| values_equal(item, expected))
        }
        _ => values_equal(actual, expected),
    }
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Total order for sorting: nulls first, then by value where comparable.
fn sort_order(a: &Value, b: &Value) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => compare(a, b).unwrap_or(Ordering::Equal),
    }
}

/// SQL style pattern (`%` any run, `_` one char) or a regular expression.
fn like(value: &Value, pattern: &str) -> bool {
    let Value::String(text) = value else {
        return false;
    };
    let translated = if pattern.contains('%') || pattern.contains('_') {
        let mut re = String::from("^");
        for ch in pattern.chars() {
            match ch {
                '%' => re.push_str(".*"),
                '_' => re.push('.'),
                other => re.push_str(&regex::escape(&other.to_string())),
            }
        }
        re.push('$');
        re
    } else {
        pattern.to_string()
    };
    Regex::new(&translated)
        .map(|re| re.is_match(text))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    fn rows() -> Vec<Document> {
        vec![
            doc(json!({"id": 1, "description": "pizza", "total": 10, "customerId": 1})),
            doc(json!({"id": 2, "description": "pasta", "total": 25, "customerId": 2})),
            doc(json!({"id": 3, "description": "salad", "total": 5, "customerId": 1})),
            doc(json!({"id": 4, "description": "soup", "customerId": 2})),
        ]
    }

    fn ids(rows: &[Document]) -> Vec<i64> {
        rows.iter().filter_map(|r| r["id"].as_i64()).collect()
    }

    #[test]
    fn parses_operators() {
        let clause: Where = serde_json::from_value(json!({
            "customerId": 1,
            "total": {"gte": 5, "lt": 20},
            "or": [{"description": {"like": "p%"}}, {"id": {"inq": [3]}}]
        }))
        .unwrap();

        assert_eq!(clause.conditions.len(), 2);
        assert_eq!(clause.or.len(), 2);
        let selected = Filter::new().where_(clause).apply(rows());
        assert_eq!(ids(&selected), vec![1, 3]);
    }

    #[test]
    fn object_without_operators_is_equality() {
        let clause: Where = serde_json::from_value(json!({"address": {"city": "Paris"}})).unwrap();
        assert_eq!(
            clause.conditions["address"],
            Condition::Equals(json!({"city": "Paris"}))
        );
    }

    #[test]
    fn rejects_malformed_operators() {
        let err = serde_json::from_value::<Where>(json!({"id": {"inq": 3}})).unwrap_err();
        assert!(err.to_string().contains("`inq` expects an array"));
        assert!(serde_json::from_value::<Where>(json!({"id": {"between": [1]}})).is_err());
    }

    #[test]
    fn exists_and_nin() {
        let clause: Where =
            serde_json::from_value(json!({"total": {"exists": false}})).unwrap();
        assert_eq!(ids(&Filter::new().where_(clause).apply(rows())), vec![4]);

        let clause: Where = serde_json::from_value(json!({"id": {"nin": [1, 2]}})).unwrap();
        assert_eq!(ids(&Filter::new().where_(clause).apply(rows())), vec![3, 4]);
    }

    #[test]
    fn impose_cannot_be_widened() {
        let scope = Where::eq("customerId", 1);
        let caller: Where =
            serde_json::from_value(json!({"customerId": 2, "total": {"gt": 1}})).unwrap();
        let merged = scope.impose(caller);
        assert!(merged.conditions.contains_key("total"));
        assert_eq!(merged.and.len(), 1);
        assert!(Filter::new().where_(merged).apply(rows()).is_empty());
    }

    #[test]
    fn impose_keeps_or_groups_of_both_sides() {
        let left = Where::new().or(vec![Where::eq("id", 1), Where::eq("id", 2)]);
        let right = Where::new().or(vec![Where::eq("customerId", 1)]);
        let merged = left.impose(right);
        assert_eq!(ids(&Filter::new().where_(merged).apply(rows())), vec![1]);
    }

    #[test]
    fn order_skip_limit_fields() {
        let filter: Filter = serde_json::from_value(json!({
            "order": "total DESC",
            "offset": 1,
            "limit": 2,
            "fields": ["id", "total"]
        }))
        .unwrap();
        let selected = filter.apply(rows());
        assert_eq!(
            selected,
            vec![doc(json!({"id": 1, "total": 10})), doc(json!({"id": 3, "total": 5}))]
        );
    }

    #[test]
    fn excluding_fields() {
        let filter: Filter =
            serde_json::from_value(json!({"fields": {"description": false}, "limit": 1}))
                .unwrap();
        assert_eq!(
            filter.apply(rows()),
            vec![doc(json!({"id": 1, "total": 10, "customerId": 1}))]
        );
    }

    #[test]
    fn numbers_compare_by_value() {
        assert!(values_equal(&json!(1), &json!(1.0)));
        assert!(!values_equal(&json!(1), &json!("1")));
    }

    #[test]
    fn serializes_back_to_json() {
        let source = json!({"customerId": 1, "total": {"gt": 3}, "and": [{"id": 2}]});
        let clause: Where = serde_json::from_value(source.clone()).unwrap();
        assert_eq!(serde_json::to_value(clause).unwrap(), source);
    }
}
