//! Validating builder for [`EntitySchema`].

use std::collections::HashSet;

use thiserror::Error;

use super::types::{
    ComponentEncoding, EntitySchema, FieldDescriptor, IndexDefinition, IndexKind, KeyAttribute,
    KeyComponent, LogicalType,
};

/// Errors raised when a schema definition is inconsistent.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Schema {schema} has no hash key")]
    NoHashKey { schema: String },
    #[error("Schema {schema} references unknown field '{field}'")]
    UnknownField { schema: String, field: String },
    #[error("Schema {schema} declares field '{field}' more than once")]
    DuplicateField { schema: String, field: String },
    #[error("Schema {schema} declares index '{index}' more than once")]
    DuplicateIndex { schema: String, index: String },
    #[error("Invalid field '{field}' in {schema}: {reason}")]
    InvalidField {
        schema: String,
        field: String,
        reason: String,
    },
    #[error("Invalid index '{index}' in {schema}: {reason}")]
    InvalidIndex {
        schema: String,
        index: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
struct PendingIndex {
    name: String,
    kind: IndexKind,
    hash_key: Option<String>,
    range_key: Option<String>,
}

/// Builder for [`EntitySchema`].
#[derive(Debug, Clone)]
pub struct EntitySchemaBuilder {
    name: String,
    table_name: Option<String>,
    fields: Vec<FieldDescriptor>,
    hash_key: Option<String>,
    range_key: Option<String>,
    indexes: Vec<PendingIndex>,
}

impl EntitySchema {
    pub fn builder(name: impl Into<String>) -> EntitySchemaBuilder {
        EntitySchemaBuilder {
            name: name.into(),
            table_name: None,
            fields: Vec::new(),
            hash_key: None,
            range_key: None,
            indexes: Vec::new(),
        }
    }
}

impl EntitySchemaBuilder {
    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    pub fn hash_key(mut self, field: impl Into<String>) -> Self {
        self.hash_key = Some(field.into());
        self
    }

    pub fn range_key(mut self, field: impl Into<String>) -> Self {
        self.range_key = Some(field.into());
        self
    }

    /// Overrides the `<prefix>-<plural>` table naming convention.
    pub fn table_name(mut self, name: impl Into<String>) -> Self {
        self.table_name = Some(name.into());
        self
    }

    /// Adds a global secondary index.
    pub fn global_index(
        mut self,
        name: impl Into<String>,
        hash_key: impl Into<String>,
        range_key: Option<&str>,
    ) -> Self {
        self.indexes.push(PendingIndex {
            name: name.into(),
            kind: IndexKind::Global,
            hash_key: Some(hash_key.into()),
            range_key: range_key.map(str::to_string),
        });
        self
    }

    /// Adds a local secondary index sharing the primary hash key.
    pub fn local_index(mut self, name: impl Into<String>, range_key: impl Into<String>) -> Self {
        self.indexes.push(PendingIndex {
            name: name.into(),
            kind: IndexKind::Local,
            hash_key: None,
            range_key: Some(range_key.into()),
        });
        self
    }

    /// Validates the definition and resolves every index key layout.
    pub fn build(mut self) -> Result<EntitySchema, SchemaError> {
        let schema = self.name.clone();

        let mut seen = HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateField {
                    schema,
                    field: field.name.clone(),
                });
            }
            self.validate_field(field)?;
        }

        let hash_key = self
            .hash_key
            .clone()
            .ok_or_else(|| SchemaError::NoHashKey {
                schema: schema.clone(),
            })?;

        let primary = IndexDefinition {
            name: String::new(),
            kind: IndexKind::Primary,
            hash_key: self.resolve_key(&hash_key)?,
            range_key: self
                .range_key
                .as_deref()
                .map(|f| self.resolve_key(f))
                .transpose()?,
        };

        let mut names = HashSet::new();
        let mut indexes = vec![primary];
        for pending in &self.indexes {
            if pending.name.is_empty() {
                return Err(SchemaError::InvalidIndex {
                    schema,
                    index: pending.name.clone(),
                    reason: "secondary indexes must be named".to_string(),
                });
            }
            if !names.insert(pending.name.as_str()) {
                return Err(SchemaError::DuplicateIndex {
                    schema,
                    index: pending.name.clone(),
                });
            }
            let index = self.resolve_index(pending, &indexes[0])?;
            indexes.push(index);
        }

        // Primary key components are always required.
        let key_fields: Vec<String> = {
            let primary = &indexes[0];
            std::iter::once(&primary.hash_key)
                .chain(primary.range_key.iter())
                .flat_map(|k| k.component_fields().map(str::to_string))
                .collect()
        };
        for field in &mut self.fields {
            if key_fields.contains(&field.name) {
                field.required = true;
            }
        }

        Ok(EntitySchema {
            name: self.name,
            table_name: self.table_name,
            fields: self.fields,
            indexes,
        })
    }

    fn validate_field(&self, field: &FieldDescriptor) -> Result<(), SchemaError> {
        let invalid = |reason: &str| SchemaError::InvalidField {
            schema: self.name.clone(),
            field: field.name.clone(),
            reason: reason.to_string(),
        };

        match &field.logical_type {
            LogicalType::Enum { labels } => {
                if labels.is_empty() {
                    return Err(invalid("enum has no labels"));
                }
                let mut unique = HashSet::new();
                for label in labels {
                    if label.is_empty() || label.chars().any(char::is_control) {
                        return Err(invalid("enum labels must be non-empty printable text"));
                    }
                    if !unique.insert(label) {
                        return Err(invalid("enum labels must be unique"));
                    }
                }
            }
            LogicalType::Composite { components } => {
                if components.len() < 2 {
                    return Err(invalid("composite needs at least two components"));
                }
                for component in components {
                    match self.fields.iter().find(|f| &f.name == component) {
                        None => {
                            return Err(SchemaError::UnknownField {
                                schema: self.name.clone(),
                                field: component.clone(),
                            })
                        }
                        Some(f) if f.is_composite() => {
                            return Err(invalid("composites cannot nest other composites"))
                        }
                        Some(_) => {}
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn resolve_key(&self, field: &str) -> Result<KeyAttribute, SchemaError> {
        let descriptor = self.descriptor(field)?;

        let components = if descriptor.is_composite() {
            descriptor
                .component_refs()
                .iter()
                .map(|c| self.key_component(c))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            vec![self.key_component(field)?]
        };

        Ok(KeyAttribute {
            name: descriptor.name.clone(),
            components,
            composite: descriptor.is_composite(),
        })
    }

    fn key_component(&self, field: &str) -> Result<KeyComponent, SchemaError> {
        let descriptor = self.descriptor(field)?;
        let encoding = ComponentEncoding::for_type(&descriptor.logical_type).ok_or_else(|| {
            SchemaError::InvalidField {
                schema: self.name.clone(),
                field: field.to_string(),
                reason: "type cannot be used as a key component".to_string(),
            }
        })?;
        Ok(KeyComponent {
            field: field.to_string(),
            encoding,
        })
    }

    fn resolve_index(
        &self,
        pending: &PendingIndex,
        primary: &IndexDefinition,
    ) -> Result<IndexDefinition, SchemaError> {
        let hash_key = match (&pending.hash_key, pending.kind) {
            (Some(field), _) => self.resolve_key(field)?,
            (None, IndexKind::Local) => {
                if primary.range_key.is_none() {
                    return Err(SchemaError::InvalidIndex {
                        schema: self.name.clone(),
                        index: pending.name.clone(),
                        reason: "local indexes require a primary range key".to_string(),
                    });
                }
                primary.hash_key.clone()
            }
            (None, _) => {
                return Err(SchemaError::InvalidIndex {
                    schema: self.name.clone(),
                    index: pending.name.clone(),
                    reason: "missing hash key".to_string(),
                })
            }
        };

        Ok(IndexDefinition {
            name: pending.name.clone(),
            kind: pending.kind,
            hash_key,
            range_key: pending
                .range_key
                .as_deref()
                .map(|f| self.resolve_key(f))
                .transpose()?,
        })
    }

    fn descriptor(&self, field: &str) -> Result<&FieldDescriptor, SchemaError> {
        self.fields
            .iter()
            .find(|f| f.name == field)
            .ok_or_else(|| SchemaError::UnknownField {
                schema: self.name.clone(),
                field: field.to_string(),
            })
    }
}
