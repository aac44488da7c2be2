//! Data types for the Workers KV client

use std::borrow::Cow;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A value to be written to a namespace.
///
/// The variant decides how the value travels: scalars are sent verbatim,
/// structured values are sent as compact JSON text.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Raw text, stored as-is
    Scalar(String),
    /// A JSON document, stored as its textual form
    Structured(serde_json::Value),
}

impl Value {
    /// Create a structured value from anything serializable
    ///
    /// # Example
    /// ```
    /// use workers_kv::Value;
    ///
    /// let value = Value::json(&vec![1, 2, 3]).unwrap();
    /// assert_eq!(value.to_wire(), "[1,2,3]");
    /// ```
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        Ok(Value::Structured(serde_json::to_value(value)?))
    }

    /// Text sent over the wire for this value
    pub fn to_wire(&self) -> Cow<'_, str> {
        match self {
            Value::Scalar(s) => Cow::Borrowed(s),
            Value::Structured(v) => Cow::Owned(v.to_string()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Scalar(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Scalar(s)
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Value::Scalar(s.clone())
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::String(s) => Value::Scalar(s),
            other => Value::Structured(other),
        }
    }
}

/// Numbers and booleans are structured: they travel as their JSON text
/// (`42`, `1.5`, `true`) and read back as [`StoredValue::Json`].
macro_rules! structured_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::Structured(serde_json::Value::from(v))
                }
            }
        )*
    };
}

structured_from!(bool, i32, i64, u32, u64, usize, f64);

/// A value read back from a namespace
#[derive(Debug, Clone, PartialEq)]
pub enum StoredValue {
    /// The stored text did not parse as JSON
    Text(String),
    /// The stored text parsed as JSON
    Json(serde_json::Value),
}

impl StoredValue {
    /// Returns the text if the value was stored as plain text
    pub fn as_text(&self) -> Option<&str> {
        match self {
            StoredValue::Text(s) => Some(s),
            StoredValue::Json(_) => None,
        }
    }

    /// Returns the JSON document if the value parsed as JSON
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            StoredValue::Json(v) => Some(v),
            StoredValue::Text(_) => None,
        }
    }

    /// Textual form of the value. JSON values are re-serialized compactly.
    pub fn to_text(&self) -> Cow<'_, str> {
        match self {
            StoredValue::Text(s) => Cow::Borrowed(s),
            StoredValue::Json(serde_json::Value::String(s)) => Cow::Borrowed(s),
            StoredValue::Json(v) => Cow::Owned(v.to_string()),
        }
    }

    /// Converts the value into a JSON document. Plain text becomes a JSON string.
    pub fn into_json(self) -> serde_json::Value {
        match self {
            StoredValue::Text(s) => serde_json::Value::String(s),
            StoredValue::Json(v) => v,
        }
    }

    /// Deserialize the value into a typed structure
    ///
    /// # Example
    /// ```
    /// use workers_kv::StoredValue;
    ///
    /// let stored = StoredValue::Json(serde_json::json!([1, 2, 3]));
    /// let numbers: Vec<u32> = stored.deserialize().unwrap();
    /// assert_eq!(numbers, vec![1, 2, 3]);
    /// ```
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        let value = match self {
            StoredValue::Text(s) => serde_json::Value::String(s.clone()),
            StoredValue::Json(v) => v.clone(),
        };
        Ok(serde_json::from_value(value)?)
    }
}

/// A single error or message entry reported by the service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiMessage {
    /// Service error code
    #[serde(default)]
    pub code: Option<i64>,
    /// Human readable message
    #[serde(default)]
    pub message: String,
}

/// The service's standard reply wrapper
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    /// Whether the call succeeded; absent on some malformed replies
    #[serde(default)]
    pub success: Option<bool>,
    /// Errors reported by the service
    #[serde(default)]
    pub errors: Vec<ApiMessage>,
    /// Informational messages
    #[serde(default)]
    pub messages: Vec<serde_json::Value>,
    /// Operation result
    #[serde(default)]
    pub result: Option<T>,
    /// Single error field used by replies that lack `success`
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

impl<T> Envelope<T> {
    /// Returns true only if the reply explicitly reported success
    pub fn is_success(&self) -> bool {
        self.success == Some(true)
    }
}

/// Information about a single key, as returned by the key listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyInfo {
    /// The key name
    pub name: String,
    /// Unix timestamp at which the key expires, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration: Option<u64>,
    /// Arbitrary metadata attached to the key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// One entry of a bulk write request body
#[derive(Debug, Clone, Serialize)]
pub(crate) struct BulkWriteEntry<'a> {
    pub key: &'a str,
    pub value: Cow<'a, str>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_from_json_string_is_scalar() {
        assert_eq!(Value::from(json!("plain")), Value::Scalar("plain".to_string()));
        assert_eq!(Value::from(json!({"a": 1})), Value::Structured(json!({"a": 1})));
    }

    #[test]
    fn test_value_wire_text() {
        assert_eq!(Value::from("hello").to_wire(), "hello");
        assert_eq!(Value::from(json!({"a": 1})).to_wire(), r#"{"a":1}"#);
        assert_eq!(Value::from(json!(true)).to_wire(), "true");
        assert_eq!(Value::from(json!(12.5)).to_wire(), "12.5");
    }

    #[test]
    fn test_value_from_numbers_and_bools() {
        assert_eq!(Value::from(42), Value::Structured(json!(42)));
        assert_eq!(Value::from(-7i64).to_wire(), "-7");
        assert_eq!(Value::from(10_000usize).to_wire(), "10000");
        assert_eq!(Value::from(1.5).to_wire(), "1.5");
        assert_eq!(Value::from(false), Value::Structured(json!(false)));
        // not representable in JSON
        assert_eq!(Value::from(f64::NAN).to_wire(), "null");
    }

    #[test]
    fn test_value_json_from_struct() {
        #[derive(Serialize)]
        struct User {
            name: &'static str,
            age: u8,
        }
        let value = Value::json(&User { name: "alice", age: 30 }).unwrap();
        assert_eq!(value, Value::Structured(json!({"name": "alice", "age": 30})));
    }

    #[test]
    fn test_stored_value_accessors() {
        let text = StoredValue::Text("abc".to_string());
        assert_eq!(text.as_text(), Some("abc"));
        assert!(text.as_json().is_none());
        assert_eq!(text.to_text(), "abc");

        let doc = StoredValue::Json(json!({"k": [1, 2]}));
        assert!(doc.as_text().is_none());
        assert_eq!(doc.to_text(), r#"{"k":[1,2]}"#);
        assert_eq!(doc.into_json(), json!({"k": [1, 2]}));
    }

    #[test]
    fn test_stored_value_deserialize_text_as_string() {
        let text = StoredValue::Text("not json".to_string());
        let s: String = text.deserialize().unwrap();
        assert_eq!(s, "not json");
        assert!(text.deserialize::<Vec<u8>>().is_err());
    }

    #[test]
    fn test_envelope_defaults() {
        let env: Envelope<Vec<KeyInfo>> = serde_json::from_str(r#"{"error":"bad token"}"#).unwrap();
        assert_eq!(env.success, None);
        assert!(!env.is_success());
        assert!(env.result.is_none());
        assert_eq!(env.error, Some(json!("bad token")));

        let env: Envelope<Vec<KeyInfo>> = serde_json::from_str(
            r#"{"success":true,"errors":[],"messages":[],"result":[{"name":"a","expiration":1700000000},{"name":"b"}]}"#,
        )
        .unwrap();
        assert!(env.is_success());
        let keys = env.result.unwrap();
        assert_eq!(keys[0].expiration, Some(1_700_000_000));
        assert_eq!(keys[1].name, "b");
    }

    #[test]
    fn test_bulk_entry_serialization() {
        let entries = vec![
            BulkWriteEntry { key: "a", value: Cow::Borrowed("1") },
            BulkWriteEntry { key: "b", value: Cow::Owned(r#"{"x":true}"#.to_string()) },
        ];
        let body = serde_json::to_string(&entries).unwrap();
        assert_eq!(body, r#"[{"key":"a","value":"1"},{"key":"b","value":"{\"x\":true}"}]"#);
    }
}
