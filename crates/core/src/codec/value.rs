//! Logical values, records and the backend attribute representation.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::CodecError;

/// A typed value held by one record field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Timestamp(DateTime<Utc>),
    Bytes(Vec<u8>),
    Enum(String),
}

impl Value {
    /// Short type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Boolean(_) => "boolean",
            Value::Timestamp(_) => "timestamp",
            Value::Bytes(_) => "bytes",
            Value::Enum(_) => "enum",
        }
    }

    /// Whether the value is the empty default of its type.
    ///
    /// Only strings, enum labels and byte blobs have a meaningful empty
    /// state; numbers, booleans and timestamps are never considered default.
    pub fn is_default(&self) -> bool {
        match self {
            Value::String(s) | Value::Enum(s) => s.is_empty(),
            Value::Bytes(b) => b.is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) | Value::Enum(s) => write!(f, "{s}"),
            Value::Integer(n) => write!(f, "{n}"),
            Value::Float(n) => write!(f, "{n}"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339()),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(value.into())
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Integer(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::Timestamp(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Bytes(value)
    }
}

/// One entity instance: field name to typed value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(field.into(), value.into())
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.remove(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Get a required string field.
    pub fn require_string(&self, field: &str) -> Result<String, CodecError> {
        match self.require(field)? {
            Value::String(s) | Value::Enum(s) => Ok(s.clone()),
            other => Err(type_mismatch(field, "string", other)),
        }
    }

    /// Get an optional string field.
    pub fn optional_string(&self, field: &str) -> Result<Option<String>, CodecError> {
        match self.get(field) {
            None => Ok(None),
            Some(Value::String(s)) | Some(Value::Enum(s)) => Ok(Some(s.clone())),
            Some(other) => Err(type_mismatch(field, "string", other)),
        }
    }

    /// Get a required integer field.
    pub fn require_integer(&self, field: &str) -> Result<i64, CodecError> {
        match self.require(field)? {
            Value::Integer(n) => Ok(*n),
            other => Err(type_mismatch(field, "integer", other)),
        }
    }

    /// Get a required float field.
    pub fn require_float(&self, field: &str) -> Result<f64, CodecError> {
        match self.require(field)? {
            Value::Float(n) => Ok(*n),
            other => Err(type_mismatch(field, "float", other)),
        }
    }

    /// Get a required boolean field.
    pub fn require_boolean(&self, field: &str) -> Result<bool, CodecError> {
        match self.require(field)? {
            Value::Boolean(b) => Ok(*b),
            other => Err(type_mismatch(field, "boolean", other)),
        }
    }

    /// Get a required timestamp field.
    pub fn require_timestamp(&self, field: &str) -> Result<DateTime<Utc>, CodecError> {
        match self.require(field)? {
            Value::Timestamp(ts) => Ok(*ts),
            other => Err(type_mismatch(field, "timestamp", other)),
        }
    }

    /// Get an optional timestamp field.
    pub fn optional_timestamp(&self, field: &str) -> Result<Option<DateTime<Utc>>, CodecError> {
        match self.get(field) {
            None => Ok(None),
            Some(Value::Timestamp(ts)) => Ok(Some(*ts)),
            Some(other) => Err(type_mismatch(field, "timestamp", other)),
        }
    }

    fn require(&self, field: &str) -> Result<&Value, CodecError> {
        self.get(field).ok_or_else(|| CodecError::Decoding {
            field: field.to_string(),
            reason: "missing required field".to_string(),
        })
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl IntoIterator for Record {
    type Item = (String, Value);
    type IntoIter = std::collections::btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

fn type_mismatch(field: &str, expected: &str, found: &Value) -> CodecError {
    CodecError::Decoding {
        field: field.to_string(),
        reason: format!("expected {expected}, found {}", found.type_name()),
    }
}

/// Backend-neutral attribute value, modelled on the DynamoDB wire types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    S(String),
    N(String),
    B(Vec<u8>),
    Bool(bool),
    Null,
}

impl AttributeValue {
    pub fn as_s(&self) -> Option<&str> {
        match self {
            AttributeValue::S(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_n(&self) -> Option<&str> {
        match self {
            AttributeValue::N(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_b(&self) -> Option<&[u8]> {
        match self {
            AttributeValue::B(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttributeValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Null)
    }
}

/// A stored item: attribute name to attribute value.
pub type Item = HashMap<String, AttributeValue>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_builder_and_accessors() {
        let record = Record::new()
            .with("name", "w1")
            .with("version", 3i64)
            .with("active", true);

        assert_eq!(record.len(), 3);
        assert_eq!(record.require_string("name").unwrap(), "w1");
        assert_eq!(record.require_integer("version").unwrap(), 3);
        assert!(record.require_boolean("active").unwrap());
    }

    #[test]
    fn test_require_missing_field() {
        let record = Record::new();
        let err = record.require_string("name").unwrap_err();
        assert!(matches!(err, CodecError::Decoding { ref field, .. } if field == "name"));
    }

    #[test]
    fn test_require_type_mismatch() {
        let record = Record::new().with("version", "three");
        let err = record.require_integer("version").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot decode field 'version': expected integer, found string"
        );
    }

    #[test]
    fn test_optional_string() {
        let record = Record::new().with("description", "hello");
        assert_eq!(
            record.optional_string("description").unwrap(),
            Some("hello".to_string())
        );
        assert_eq!(record.optional_string("missing").unwrap(), None);
    }

    #[test]
    fn test_is_default() {
        assert!(Value::from("").is_default());
        assert!(Value::Bytes(Vec::new()).is_default());
        assert!(!Value::from(0i64).is_default());
        assert!(!Value::from(false).is_default());
    }

    #[test]
    fn test_value_serializes_with_type_tag() {
        let json = serde_json::to_string(&Value::from(7i64)).unwrap();
        assert_eq!(json, r#"{"type":"integer","value":7}"#);
    }

    #[test]
    fn test_attribute_value_accessors() {
        assert_eq!(AttributeValue::S("a".to_string()).as_s(), Some("a"));
        assert_eq!(AttributeValue::N("1".to_string()).as_s(), None);
        assert_eq!(AttributeValue::Bool(true).as_bool(), Some(true));
        assert!(AttributeValue::Null.is_null());
    }
}
