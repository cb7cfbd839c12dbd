use crate::codec::{Record, Value};
use crate::error::{Error, Result};
use crate::schema::EntitySchema;

/// Primary key of one item, as logical component values.
///
/// Composite hash or range keys take one value per component, in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Key {
    hash: Vec<Value>,
    range: Vec<Value>,
}

impl Key {
    pub fn new(hash: impl Into<Value>) -> Self {
        Self {
            hash: vec![hash.into()],
            range: Vec::new(),
        }
    }

    /// Add a range key value (or the next range component).
    pub fn with_range(mut self, range: impl Into<Value>) -> Self {
        self.range.push(range.into());
        self
    }

    pub fn composite(hash: Vec<Value>, range: Vec<Value>) -> Self {
        Self { hash, range }
    }

    /// Build the key of an existing record.
    pub fn of(schema: &EntitySchema, record: &Record) -> Result<Self> {
        let primary = schema.primary_index();
        let values = |fields: Vec<&str>| {
            fields
                .into_iter()
                .map(|field| {
                    record.get(field).cloned().ok_or_else(|| Error::InvalidRecord {
                        field: field.to_string(),
                        reason: "required field is missing".to_string(),
                    })
                })
                .collect::<Result<Vec<_>>>()
        };

        Ok(Self {
            hash: values(primary.hash_key.component_fields().collect())?,
            range: match &primary.range_key {
                Some(range) => values(range.component_fields().collect())?,
                None => Vec::new(),
            },
        })
    }

    /// Map the key values onto the primary key component fields.
    pub(crate) fn to_record(&self, schema: &EntitySchema) -> Result<Record> {
        let primary = schema.primary_index();
        let hash_fields: Vec<&str> = primary.hash_key.component_fields().collect();
        let range_fields: Vec<&str> = primary
            .range_key
            .as_ref()
            .map(|k| k.component_fields().collect())
            .unwrap_or_default();

        if hash_fields.len() != self.hash.len() {
            return Err(Error::Encoding {
                field: primary.hash_key.name.clone(),
                reason: format!(
                    "expected {} hash key values, got {}",
                    hash_fields.len(),
                    self.hash.len()
                ),
            });
        }
        if range_fields.len() != self.range.len() {
            let field = primary
                .range_key
                .as_ref()
                .map_or_else(|| schema.name().to_string(), |k| k.name.clone());
            return Err(Error::Encoding {
                field,
                reason: format!(
                    "expected {} range key values, got {}",
                    range_fields.len(),
                    self.range.len()
                ),
            });
        }

        Ok(hash_fields
            .into_iter()
            .chain(range_fields)
            .zip(self.hash.iter().chain(self.range.iter()))
            .map(|(field, value)| (field, value.clone()))
            .collect())
    }

    /// Human-readable `field=value` form used in errors and logs.
    pub(crate) fn describe(&self, schema: &EntitySchema) -> String {
        match self.to_record(schema) {
            Ok(record) => describe_record(schema, &record),
            Err(_) => self
                .hash
                .iter()
                .chain(self.range.iter())
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(","),
        }
    }
}

/// `field=value` pairs of the primary key fields present in `record`.
pub(crate) fn describe_record(schema: &EntitySchema, record: &Record) -> String {
    let primary = schema.primary_index();
    primary
        .hash_key
        .component_fields()
        .chain(primary.range_key.iter().flat_map(|k| k.component_fields()))
        .filter_map(|field| record.get(field).map(|value| format!("{field}={value}")))
        .collect::<Vec<_>>()
        .join(",")
}
