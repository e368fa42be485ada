use serde_json::Value;

use crate::{values_equal, Document, Filter, RepositoryError, Result, Where};

/// The where clause equivalent of a key constraint.
pub fn constraint_where(constraint: &Document) -> Where {
    constraint
        .iter()
        .fold(Where::new(), |clause, (key, value)| {
            clause.impose(Where::eq(key.clone(), value.clone()))
        })
}

/// AND the constraint into the caller's filter. Ordering, paging and
/// projection are kept as given.
pub fn constrain_filter(filter: Option<Filter>, constraint: &Document) -> Filter {
    let mut filter = filter.unwrap_or_default();
    filter.where_ = Some(constrain_where(filter.where_.take(), constraint));
    filter
}

pub fn constrain_where(where_: Option<Where>, constraint: &Document) -> Where {
    constraint_where(constraint).impose(where_.unwrap_or_default())
}

/// Set the constrained keys on `data`. A key the caller already set to a
/// different value is a `ForeignKeyMismatch`; an equal value is accepted.
pub fn constrain_data_object(data: Value, constraint: &Document) -> Result<Value> {
    let mut object = match data {
        Value::Object(object) => object,
        Value::Null => Document::new(),
        other => return Ok(other),
    };
    for (key, value) in constraint {
        match object.get(key) {
            Some(given) if !given.is_null() && !values_equal(given, value) => {
                return Err(RepositoryError::ForeignKeyMismatch {
                    property: key.clone(),
                });
            }
            _ => {
                object.insert(key.clone(), value.clone());
            }
        }
    }
    Ok(Value::Object(object))
}

/// Patches may not name a constrained key at all, even with its current value.
pub fn reject_foreign_key_change(data: &Value, constraint: &Document) -> Result<()> {
    if let Value::Object(object) = data {
        if let Some(key) = constraint.keys().find(|key| object.contains_key(*key)) {
            return Err(RepositoryError::ForeignKeyMismatch {
                property: key.clone(),
            });
        }
    }
    Ok(())
}
