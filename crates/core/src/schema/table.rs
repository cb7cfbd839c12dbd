//! Physical table layout derived from an [`EntitySchema`] (pure data).

use super::types::{EntitySchema, IndexDefinition, IndexKind};

/// Table schema configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableConfig {
    pub table_name: String,
    pub partition_key: KeyAttributeConfig,
    pub sort_key: Option<KeyAttributeConfig>,
    pub gsis: Vec<SecondaryIndexConfig>,
    pub lsis: Vec<SecondaryIndexConfig>,
    pub billing_mode: BillingMode,
}

/// A key attribute definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyAttributeConfig {
    pub name: String,
    pub attribute_type: AttributeType,
}

/// Scalar type of key attributes. Every encoded key is a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeType {
    String,
}

/// Secondary index configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecondaryIndexConfig {
    pub name: String,
    pub partition_key: KeyAttributeConfig,
    pub sort_key: Option<KeyAttributeConfig>,
    pub projection: ProjectionType,
}

/// Index projection type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionType {
    All,
}

/// Billing mode for the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillingMode {
    PayPerRequest,
}

impl TableConfig {
    /// Derive the table layout for a schema, naming the table with `prefix`.
    pub fn from_schema(schema: &EntitySchema, prefix: &str) -> Self {
        let primary = schema.primary_index();
        let secondary = |kind: IndexKind| {
            schema
                .secondary_indexes()
                .iter()
                .filter(|i| i.kind == kind)
                .map(index_config)
                .collect::<Vec<_>>()
        };

        Self {
            table_name: schema.table_name(prefix),
            partition_key: string_key(&primary.hash_key.name),
            sort_key: primary.range_key.as_ref().map(|k| string_key(&k.name)),
            gsis: secondary(IndexKind::Global),
            lsis: secondary(IndexKind::Local),
            billing_mode: BillingMode::PayPerRequest,
        }
    }

    /// Sets the table name.
    pub fn with_table_name(mut self, name: &str) -> Self {
        self.table_name = name.to_string();
        self
    }

    /// Find a secondary index by name.
    pub fn index(&self, name: &str) -> Option<&SecondaryIndexConfig> {
        self.gsis.iter().chain(self.lsis.iter()).find(|i| i.name == name)
    }

    pub fn is_gsi(&self, name: &str) -> bool {
        self.gsis.iter().any(|i| i.name == name)
    }
}

fn string_key(name: &str) -> KeyAttributeConfig {
    KeyAttributeConfig {
        name: name.to_string(),
        attribute_type: AttributeType::String,
    }
}

fn index_config(index: &IndexDefinition) -> SecondaryIndexConfig {
    SecondaryIndexConfig {
        name: index.name.clone(),
        partition_key: string_key(&index.hash_key.name),
        sort_key: index.range_key.as_ref().map(|k| string_key(&k.name)),
        projection: ProjectionType::All,
    }
}
