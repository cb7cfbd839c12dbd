//! Record <-> stored item mapping.
//!
//! Fields that are themselves key attributes are stored in key encoding
//! (always `S`). Other fields keep their natural attribute type. Composite
//! fields are synthesized from their components on write and ignored on read.

use chrono::{DateTime, Utc};

use super::key::encode_timestamp;
use super::{AttributeValue, Codec, CodecError, Item, Record, Value};
use crate::schema::{
    ComponentEncoding, EntitySchema, FieldDescriptor, IndexDefinition, KeyAttribute,
    KeyComponent, LogicalType,
};

impl Codec {
    /// Check a record against its schema before writing it.
    pub fn validate_record(&self, schema: &EntitySchema, record: &Record) -> Result<(), CodecError> {
        for (name, value) in record.iter() {
            match schema.field(name) {
                None => {
                    return Err(CodecError::invalid_record(name, "field is not declared"));
                }
                Some(field) if field.is_composite() => {
                    return Err(CodecError::invalid_record(
                        name,
                        "composite fields are derived and cannot be set",
                    ));
                }
                // Enum fields decode as `Value::Enum`; a plain string would not round-trip.
                Some(field)
                    if matches!(field.logical_type, LogicalType::Enum { .. })
                        && !matches!(value, Value::Enum(_)) =>
                {
                    return Err(CodecError::encoding(
                        name,
                        format!("expected enum, found {}", value.type_name()),
                    ));
                }
                Some(_) => {}
            }
        }

        for field in schema.fields().iter().filter(|f| f.required) {
            match record.get(&field.name) {
                None => {
                    return Err(CodecError::invalid_record(&field.name, "required field is missing"));
                }
                Some(value) if value.is_default() => {
                    return Err(CodecError::invalid_record(&field.name, "required field is empty"));
                }
                Some(_) => {}
            }
        }

        Ok(())
    }

    /// Encode a record into the item stored by the backend.
    pub fn encode_item(&self, schema: &EntitySchema, record: &Record) -> Result<Item, CodecError> {
        self.validate_record(schema, record)?;

        let mut item = Item::new();
        for field in schema.fields() {
            if field.is_composite() {
                continue;
            }
            let Some(value) = record.get(&field.name) else {
                continue;
            };
            let attribute = if schema.is_direct_key_field(&field.name) {
                AttributeValue::S(self.encode_direct_key(field, value)?)
            } else {
                encode_natural(field, value)?
            };
            item.insert(field.name.clone(), attribute);
        }

        for field in schema.fields().iter().filter(|f| f.is_composite()) {
            let key = composite_attribute(schema, field)?;
            let present = key.component_fields().all(|c| record.contains(c));
            if present {
                item.insert(field.name.clone(), AttributeValue::S(self.encode_key(&key, record)?));
            } else if schema.is_primary_key_field(&field.name)
                || is_primary_key_attribute(schema, &field.name)
            {
                return Err(CodecError::encoding(
                    &field.name,
                    "primary key component is missing",
                ));
            }
        }

        Ok(item)
    }

    /// Decode a stored item back into a record.
    ///
    /// Unknown attributes and composite attributes are ignored; `NULL`
    /// attributes are treated as absent.
    pub fn decode_item(&self, schema: &EntitySchema, item: &Item) -> Result<Record, CodecError> {
        let mut record = Record::new();
        for field in schema.fields().iter().filter(|f| !f.is_composite()) {
            match item.get(&field.name) {
                None | Some(AttributeValue::Null) => {
                    if field.required {
                        return Err(CodecError::decoding(&field.name, "required field is missing"));
                    }
                }
                Some(attribute) => {
                    let value = if schema.is_direct_key_field(&field.name) {
                        self.decode_direct_key(field, attribute)?
                    } else {
                        decode_natural(field, attribute)?
                    };
                    record.set(field.name.clone(), value);
                }
            }
        }
        Ok(record)
    }

    /// Encoded primary key attributes of a record.
    pub fn primary_key(&self, schema: &EntitySchema, record: &Record) -> Result<Item, CodecError> {
        self.index_key_attributes(schema.primary_index(), record)
    }

    /// Encoded key attributes of `index` plus the primary key attributes:
    /// the full physical position of a record within the index.
    pub fn index_position(
        &self,
        schema: &EntitySchema,
        index: &IndexDefinition,
        record: &Record,
    ) -> Result<Item, CodecError> {
        let mut item = self.index_key_attributes(index, record)?;
        item.extend(self.primary_key(schema, record)?);
        Ok(item)
    }

    fn index_key_attributes(
        &self,
        index: &IndexDefinition,
        record: &Record,
    ) -> Result<Item, CodecError> {
        std::iter::once(&index.hash_key)
            .chain(index.range_key.iter())
            .map(|key| {
                self.encode_key(key, record)
                    .map(|encoded| (key.name.clone(), AttributeValue::S(encoded)))
            })
            .collect()
    }

    fn encode_direct_key(&self, field: &FieldDescriptor, value: &Value) -> Result<String, CodecError> {
        let encoding = component_encoding(field)?;
        let encoded = self.encode_component(&field.name, &encoding, value, false)?;
        if encoded.is_empty() {
            return Err(CodecError::encoding(&field.name, "key values cannot be empty"));
        }
        Ok(encoded)
    }

    fn decode_direct_key(
        &self,
        field: &FieldDescriptor,
        attribute: &AttributeValue,
    ) -> Result<Value, CodecError> {
        let raw = attribute
            .as_s()
            .ok_or_else(|| CodecError::decoding(&field.name, "key attribute is not a string"))?;
        let encoding = component_encoding(field).map_err(|e| match e {
            CodecError::Encoding { field, reason } => CodecError::Decoding { field, reason },
            other => other,
        })?;
        self.decode_component(&field.name, &encoding, raw)
    }
}

fn component_encoding(field: &FieldDescriptor) -> Result<ComponentEncoding, CodecError> {
    ComponentEncoding::for_type(&field.logical_type)
        .ok_or_else(|| CodecError::encoding(&field.name, "composite fields cannot be nested"))
}

fn is_primary_key_attribute(schema: &EntitySchema, name: &str) -> bool {
    schema.primary_index().key_attribute_names().any(|n| n == name)
}

/// Key layout of a composite field, taken from the index that uses it or
/// derived from the schema when no index does.
fn composite_attribute(
    schema: &EntitySchema,
    field: &FieldDescriptor,
) -> Result<KeyAttribute, CodecError> {
    let from_index = schema
        .indexes()
        .iter()
        .flat_map(|i| std::iter::once(&i.hash_key).chain(i.range_key.iter()))
        .find(|k| k.name == field.name);
    if let Some(key) = from_index {
        return Ok(key.clone());
    }

    let components = field
        .component_refs()
        .iter()
        .map(|name| {
            let component = schema
                .field(name)
                .ok_or_else(|| CodecError::encoding(&field.name, format!("unknown component '{name}'")))?;
            Ok(KeyComponent {
                field: name.clone(),
                encoding: component_encoding(component)?,
            })
        })
        .collect::<Result<Vec<_>, CodecError>>()?;

    Ok(KeyAttribute {
        name: field.name.clone(),
        components,
        composite: true,
    })
}

fn encode_natural(field: &FieldDescriptor, value: &Value) -> Result<AttributeValue, CodecError> {
    let mismatch = |expected: &str| {
        CodecError::encoding(
            &field.name,
            format!("expected {expected}, found {}", value.type_name()),
        )
    };

    match (&field.logical_type, value) {
        (LogicalType::String, Value::String(s)) => Ok(AttributeValue::S(s.clone())),
        (LogicalType::String, _) => Err(mismatch("string")),
        (LogicalType::Integer { .. }, Value::Integer(n)) => Ok(AttributeValue::N(n.to_string())),
        (LogicalType::Integer { .. }, _) => Err(mismatch("integer")),
        (LogicalType::Float, Value::Float(n)) => {
            if n.is_finite() {
                Ok(AttributeValue::N(n.to_string()))
            } else {
                Err(CodecError::encoding(&field.name, format!("{n} is not a storable number")))
            }
        }
        (LogicalType::Float, _) => Err(mismatch("float")),
        (LogicalType::Boolean, Value::Boolean(b)) => Ok(AttributeValue::Bool(*b)),
        (LogicalType::Boolean, _) => Err(mismatch("boolean")),
        (LogicalType::Timestamp, Value::Timestamp(ts)) => {
            encode_timestamp(&field.name, ts).map(AttributeValue::S)
        }
        (LogicalType::Timestamp, _) => Err(mismatch("timestamp")),
        (LogicalType::Bytes, Value::Bytes(b)) => Ok(AttributeValue::B(b.clone())),
        (LogicalType::Bytes, _) => Err(mismatch("bytes")),
        (LogicalType::Enum { labels }, Value::Enum(label)) => {
            if labels.contains(label) {
                Ok(AttributeValue::S(label.clone()))
            } else {
                Err(CodecError::encoding(
                    &field.name,
                    format!("unknown enum label '{label}'"),
                ))
            }
        }
        (LogicalType::Enum { .. }, _) => Err(mismatch("enum")),
        (LogicalType::Composite { .. }, _) => Err(CodecError::invalid_record(
            &field.name,
            "composite fields are derived and cannot be set",
        )),
    }
}

fn decode_natural(field: &FieldDescriptor, attribute: &AttributeValue) -> Result<Value, CodecError> {
    let name = field.name.as_str();
    let wrong_type = || CodecError::decoding(name, format!("unexpected attribute {attribute:?}"));

    match &field.logical_type {
        LogicalType::String => attribute
            .as_s()
            .map(|s| Value::String(s.to_string()))
            .ok_or_else(wrong_type),
        LogicalType::Integer { .. } => {
            let raw = attribute.as_n().ok_or_else(wrong_type)?;
            raw.parse::<i64>()
                .map(Value::Integer)
                .map_err(|e| CodecError::decoding(name, format!("invalid integer '{raw}': {e}")))
        }
        LogicalType::Float => {
            let raw = attribute.as_n().ok_or_else(wrong_type)?;
            raw.parse::<f64>()
                .map(Value::Float)
                .map_err(|e| CodecError::decoding(name, format!("invalid number '{raw}': {e}")))
        }
        LogicalType::Boolean => attribute.as_bool().map(Value::Boolean).ok_or_else(wrong_type),
        LogicalType::Timestamp => {
            let raw = attribute.as_s().ok_or_else(wrong_type)?;
            DateTime::parse_from_rfc3339(raw)
                .map(|dt| Value::Timestamp(dt.with_timezone(&Utc)))
                .map_err(|e| CodecError::decoding(name, format!("invalid timestamp: {e}")))
        }
        LogicalType::Bytes => attribute
            .as_b()
            .map(|b| Value::Bytes(b.to_vec()))
            .ok_or_else(wrong_type),
        LogicalType::Enum { labels } => {
            let raw = attribute.as_s().ok_or_else(wrong_type)?;
            if labels.iter().any(|l| l == raw) {
                Ok(Value::Enum(raw.to_string()))
            } else {
                Err(CodecError::decoding(name, format!("unknown enum label '{raw}'")))
            }
        }
        LogicalType::Composite { .. } => Err(CodecError::decoding(
            name,
            "composite fields are not decoded",
        )),
    }
}
