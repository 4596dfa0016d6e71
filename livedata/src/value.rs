//! Typed access to the untyped JSON bags handed over by legacy callers.

use serde_json::{Map, Number, Value};

/// The JSON object type used throughout the crate.
pub type JsonMap = Map<String, Value>;

/// The kind of a JSON node, as seen through an optional lookup.
///
/// Legacy option bags are navigated by looking keys up and then branching on
/// what was found. `Missing` (the key is absent) and `Null` (the key is
/// present with a `null` value) are kept apart because some options only
/// count as "set" when they hold a value of a specific kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Node<'a> {
    Missing,
    Null,
    Bool(bool),
    Number(&'a Number),
    Text(&'a str),
    Array(&'a [Value]),
    Object(&'a JsonMap),
}

impl<'a> Node<'a> {
    /// Classifies the result of a lookup.
    pub fn of(value: Option<&'a Value>) -> Self {
        match value {
            None => Self::Missing,
            Some(Value::Null) => Self::Null,
            Some(Value::Bool(b)) => Self::Bool(*b),
            Some(Value::Number(n)) => Self::Number(n),
            Some(Value::String(s)) => Self::Text(s),
            Some(Value::Array(arr)) => Self::Array(arr),
            Some(Value::Object(obj)) => Self::Object(obj),
        }
    }

    /// Looks up `key` in the given object.
    pub fn get(obj: &'a JsonMap, key: &str) -> Self {
        Self::of(obj.get(key))
    }

    pub fn as_text(&self) -> Option<&'a str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Number(n) => n.as_u64(),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&'a [Value]> {
        match self {
            Self::Array(arr) => Some(arr),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&'a JsonMap> {
        match self {
            Self::Object(obj) => Some(obj),
            _ => None,
        }
    }
}

/// Renders a scalar JSON value the way it is written into a flat string
/// parameter. Returns `None` for `null`.
pub fn stringify(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Turns a list of values coming from a query string into a single JSON
/// value: a string if there is exactly one, an array otherwise.
pub fn scalar_or_list(mut values: Vec<String>) -> Value {
    if values.len() == 1 {
        Value::String(values.remove(0))
    } else {
        Value::Array(values.into_iter().map(Value::String).collect())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn node_kinds() {
        let obj = json!({
            "nothing": null,
            "flag": true,
            "count": 15,
            "name": "doc.title",
            "list": ["a", "b"],
            "nested": {"x": 1},
        });
        let obj = obj.as_object().unwrap();
        assert_eq!(Node::get(obj, "absent"), Node::Missing);
        assert_eq!(Node::get(obj, "nothing"), Node::Null);
        assert_eq!(Node::get(obj, "flag").as_bool(), Some(true));
        assert_eq!(Node::get(obj, "count").as_u64(), Some(15));
        assert_eq!(Node::get(obj, "name").as_text(), Some("doc.title"));
        assert_eq!(Node::get(obj, "list").as_array().map(<[Value]>::len), Some(2));
        assert!(Node::get(obj, "nested").as_object().is_some());
        // Type sniffing never coerces.
        assert_eq!(Node::get(obj, "count").as_text(), None);
        assert_eq!(Node::get(obj, "name").as_bool(), None);
    }

    #[test]
    fn stringify_scalars() {
        assert_eq!(stringify(&json!("abc")), Some("abc".to_string()));
        assert_eq!(stringify(&json!(42)), Some("42".to_string()));
        assert_eq!(stringify(&json!(false)), Some("false".to_string()));
        assert_eq!(stringify(&Value::Null), None);
    }

    #[test]
    fn single_values_stay_scalar() {
        assert_eq!(scalar_or_list(vec!["a".into()]), json!("a"));
        assert_eq!(scalar_or_list(vec!["a".into(), "b".into()]), json!(["a", "b"]));
    }
}
