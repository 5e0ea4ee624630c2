//! Key order of received JSON documents.
//!
//! The edge platform compares a pass-through request with what it sent, so a
//! request that is written back must keep the key order it arrived with, at
//! every nesting level.

use serde_json::{Map, Value};

/// The shape of a received JSON document.
///
/// Objects keep their keys in received order, arrays keep their elements, and
/// scalars collapse to `null`. Two layouts always compare equal: the order of
/// keys is presentation, not content.
#[derive(Debug, Clone, Default)]
pub struct KeyLayout(Option<Value>);

impl PartialEq for KeyLayout {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl KeyLayout {
    /// Record the key order of `document`.
    #[must_use]
    pub fn capture(document: &Value) -> Self {
        Self(Some(shape_of(document)))
    }

    /// Reorder `value` to follow the recorded layout.
    ///
    /// Keys present in the layout come first, in received order. Keys the
    /// layout does not know follow in the order `value` has them.
    #[must_use]
    pub fn arrange(&self, value: Value) -> Value {
        match &self.0 {
            Some(shape) => arrange(value, shape),
            None => value,
        }
    }
}

fn shape_of(value: &Value) -> Value {
    match value {
        Value::Object(fields) => Value::Object(
            fields
                .iter()
                .map(|(key, nested)| (key.clone(), shape_of(nested)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(shape_of).collect()),
        _ => Value::Null,
    }
}

fn arrange(value: Value, shape: &Value) -> Value {
    match (value, shape) {
        (Value::Object(mut fields), Value::Object(order)) => {
            let mut arranged = Map::with_capacity(fields.len());
            for (key, nested) in order {
                if let Some(field) = fields.shift_remove(key) {
                    arranged.insert(key.clone(), arrange(field, nested));
                }
            }
            arranged.extend(fields);
            Value::Object(arranged)
        }
        (Value::Array(items), Value::Array(shapes)) => Value::Array(
            items
                .into_iter()
                .enumerate()
                .map(|(index, item)| match shapes.get(index) {
                    Some(nested) => arrange(item, nested),
                    None => item,
                })
                .collect(),
        ),
        (value, _) => value,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_should_restore_received_key_order() {
        let received = json!({"uri": "/a", "method": "GET", "headers": {"via": [{"value": "1", "key": "Via"}]}});
        let layout = KeyLayout::capture(&received);

        let rebuilt = json!({"method": "GET", "headers": {"via": [{"key": "Via", "value": "1"}]}, "uri": "/a"});

        assert_eq!(
            serde_json::to_string(&layout.arrange(rebuilt)).unwrap(),
            serde_json::to_string(&received).unwrap()
        );
    }

    #[test]
    fn test_should_append_unknown_keys_in_given_order() {
        let layout = KeyLayout::capture(&json!({"uri": "/", "headers": {"via": []}}));

        let arranged = layout.arrange(json!({
            "headers": {"authorization": [], "host": [], "via": []},
            "method": "GET",
            "uri": "/"
        }));

        assert_eq!(
            serde_json::to_string(&arranged).unwrap(),
            r#"{"uri":"/","headers":{"via":[],"authorization":[],"host":[]},"method":"GET"}"#
        );
    }

    #[test]
    fn test_should_leave_value_alone_without_layout() {
        let value = json!({"b": 1, "a": 2});
        assert_eq!(
            serde_json::to_string(&KeyLayout::default().arrange(value)).unwrap(),
            r#"{"b":1,"a":2}"#
        );
    }

    #[test]
    fn test_should_ignore_layout_in_equality() {
        assert_eq!(KeyLayout::capture(&json!({"a": 1})), KeyLayout::default());
    }
}
