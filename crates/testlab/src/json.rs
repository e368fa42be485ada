use serde::Serialize;
use serde_json::{Map, Value};

/// The JSON form of `value`, with `null` object members removed so that
/// absent and null properties compare equal.
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<Value> {
    Ok(strip_nulls(serde_json::to_value(value)?))
}

fn strip_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, strip_nulls(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(strip_nulls).collect()),
        other => other,
    }
}

/// Whether `actual` contains everything in `expected`.
///
/// Objects match when every expected member is contained in the actual
/// member of the same name. Arrays match when every expected item is
/// contained in some actual item. Anything else compares by equality.
pub fn contains_deep(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Object(actual), Value::Object(expected)) => expected.iter().all(|(key, expected)| {
            actual
                .get(key)
                .is_some_and(|actual| contains_deep(actual, expected))
        }),
        (Value::Array(actual), Value::Array(expected)) => expected
            .iter()
            .all(|expected| actual.iter().any(|actual| contains_deep(actual, expected))),
        _ => actual == expected,
    }
}

/// Keep only `keys` of an object. Non-objects yield an empty object.
pub fn pick(value: &Value, keys: &[&str]) -> Value {
    let mut picked = Map::new();
    if let Value::Object(map) = value {
        for key in keys {
            if let Some(v) = map.get(*key) {
                picked.insert((*key).to_string(), v.clone());
            }
        }
    }
    Value::Object(picked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[derive(Serialize)]
    struct Order {
        id: u32,
        shipment_id: Option<u32>,
    }

    #[test]
    fn to_json_drops_null_members() -> anyhow::Result<()> {
        let order = Order { id: 1, shipment_id: None };
        assert_eq!(to_json(&order)?, json!({"id": 1}));
        assert_eq!(to_json(&json!([{"a": null, "b": [null]}]))?, json!([{"b": [null]}]));
        Ok(())
    }

    #[test]
    fn contains_deep_matches_subsets() {
        let actual = json!({
            "name": "foo",
            "roles": [{"name": "admin", "id": 1}, {"name": "user", "id": 2}],
            "address": {"street": "backstreet", "city": "x"}
        });
        assert!(contains_deep(&actual, &json!({"roles": [{"name": "user"}]})));
        assert!(contains_deep(&actual, &json!({"address": {"street": "backstreet"}})));
        assert!(!contains_deep(&actual, &json!({"address": {"street": "frontstreet"}})));
        assert!(!contains_deep(&actual, &json!({"missing": 1})));
    }

    #[test]
    fn pick_keeps_listed_keys() {
        let value = json!({"id": 1, "name": "a", "extra": true});
        assert_eq!(pick(&value, &["id", "name", "absent"]), json!({"id": 1, "name": "a"}));
        assert_eq!(pick(&json!(3), &["id"]), json!({}));
    }
}
