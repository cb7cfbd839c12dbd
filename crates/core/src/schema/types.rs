//! Schema model types.
//!
//! An [`EntitySchema`] is an explicit table of [`FieldDescriptor`]s plus the
//! resolved key layout of every index. The codec walks these descriptors;
//! nothing is discovered at runtime.

use std::collections::BTreeSet;

use super::naming;

/// Logical type of a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogicalType {
    String,
    /// 64-bit integer. `signed = false` rejects negative values in keys.
    Integer { signed: bool },
    Float,
    Boolean,
    Timestamp,
    Bytes,
    /// Closed set of canonical labels.
    Enum { labels: Vec<String> },
    /// Synthesized from two or more other fields, in order.
    Composite { components: Vec<String> },
}

/// Description of one entity field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    pub logical_type: LogicalType,
    pub required: bool,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, logical_type: LogicalType) -> Self {
        Self {
            name: name.into(),
            logical_type,
            required: false,
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, LogicalType::String)
    }

    /// Signed 64-bit integer.
    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, LogicalType::Integer { signed: true })
    }

    /// Integer restricted to non-negative values when used in keys.
    pub fn unsigned(name: impl Into<String>) -> Self {
        Self::new(name, LogicalType::Integer { signed: false })
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, LogicalType::Float)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, LogicalType::Boolean)
    }

    pub fn timestamp(name: impl Into<String>) -> Self {
        Self::new(name, LogicalType::Timestamp)
    }

    pub fn bytes(name: impl Into<String>) -> Self {
        Self::new(name, LogicalType::Bytes)
    }

    pub fn enumeration<I, S>(name: impl Into<String>, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            name,
            LogicalType::Enum {
                labels: labels.into_iter().map(Into::into).collect(),
            },
        )
    }

    pub fn composite<I, S>(name: impl Into<String>, components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            name,
            LogicalType::Composite {
                components: components.into_iter().map(Into::into).collect(),
            },
        )
    }

    /// Marks the field as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn is_composite(&self) -> bool {
        matches!(self.logical_type, LogicalType::Composite { .. })
    }

    /// Component field names of a composite field, empty otherwise.
    pub fn component_refs(&self) -> &[String] {
        match &self.logical_type {
            LogicalType::Composite { components } => components,
            _ => &[],
        }
    }
}

/// Encoding rule applied to one key component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentEncoding {
    RawString,
    /// Fixed-width zero-padded decimal; signed values are offset by 2^63.
    ZeroPaddedInteger { signed: bool },
    /// Sign-adjusted IEEE-754 bits as fixed-width hex.
    OrderedFloat,
    Boolean,
    /// RFC3339 UTC with nine fractional digits.
    Rfc3339Timestamp,
    HexBytes,
    EnumLabel { labels: Vec<String> },
}

impl ComponentEncoding {
    /// Encoding used when a field of this type takes part in a key.
    pub fn for_type(logical_type: &LogicalType) -> Option<Self> {
        match logical_type {
            LogicalType::String => Some(ComponentEncoding::RawString),
            LogicalType::Integer { signed } => {
                Some(ComponentEncoding::ZeroPaddedInteger { signed: *signed })
            }
            LogicalType::Float => Some(ComponentEncoding::OrderedFloat),
            LogicalType::Boolean => Some(ComponentEncoding::Boolean),
            LogicalType::Timestamp => Some(ComponentEncoding::Rfc3339Timestamp),
            LogicalType::Bytes => Some(ComponentEncoding::HexBytes),
            LogicalType::Enum { labels } => Some(ComponentEncoding::EnumLabel {
                labels: labels.clone(),
            }),
            LogicalType::Composite { .. } => None,
        }
    }
}

/// One component of a key attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyComponent {
    pub field: String,
    pub encoding: ComponentEncoding,
}

/// A physical key attribute, built from one field or from a composite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyAttribute {
    /// Physical attribute name (the field name, or the composite field name).
    pub name: String,
    pub components: Vec<KeyComponent>,
    pub composite: bool,
}

impl KeyAttribute {
    pub fn component_fields(&self) -> impl Iterator<Item = &str> {
        self.components.iter().map(|c| c.field.as_str())
    }

    pub fn has_component(&self, field: &str) -> bool {
        self.components.iter().any(|c| c.field == field)
    }
}

/// Kind of index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    /// The table's own primary key.
    Primary,
    /// Local secondary index: same hash key, alternate range key.
    Local,
    /// Global secondary index: eventually consistent only.
    Global,
}

/// Resolved key layout of one index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDefinition {
    /// Index name; empty for the primary table key.
    pub name: String,
    pub kind: IndexKind,
    pub hash_key: KeyAttribute,
    pub range_key: Option<KeyAttribute>,
}

impl IndexDefinition {
    pub fn is_primary(&self) -> bool {
        self.kind == IndexKind::Primary
    }

    pub fn is_gsi(&self) -> bool {
        self.kind == IndexKind::Global
    }

    /// Name shown in errors and logs.
    pub fn label(&self) -> &str {
        if self.name.is_empty() {
            "primary"
        } else {
            &self.name
        }
    }

    /// Physical attribute names of this index's key.
    pub fn key_attribute_names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.hash_key.name.as_str())
            .chain(self.range_key.iter().map(|k| k.name.as_str()))
    }
}

/// Immutable description of an entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySchema {
    pub(super) name: String,
    pub(super) table_name: Option<String>,
    pub(super) fields: Vec<FieldDescriptor>,
    /// Index 0 is always the primary key.
    pub(super) indexes: Vec<IndexDefinition>,
}

impl EntitySchema {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn primary_index(&self) -> &IndexDefinition {
        &self.indexes[0]
    }

    /// All indexes, primary first.
    pub fn indexes(&self) -> &[IndexDefinition] {
        &self.indexes
    }

    pub fn secondary_indexes(&self) -> &[IndexDefinition] {
        &self.indexes[1..]
    }

    /// Look up an index by name; the empty name is the primary key.
    pub fn index(&self, name: &str) -> Option<&IndexDefinition> {
        self.indexes.iter().find(|i| i.name == name)
    }

    /// Physical table name: the explicit override, or
    /// `<prefix>-<pluralized-entity-name>`.
    pub fn table_name(&self, prefix: &str) -> String {
        match &self.table_name {
            Some(name) => name.clone(),
            None => naming::table_name(prefix, &self.name),
        }
    }

    /// Physical attribute names used as a key by any index.
    pub fn key_attribute_names(&self) -> BTreeSet<&str> {
        self.indexes
            .iter()
            .flat_map(|i| i.key_attribute_names())
            .collect()
    }

    /// Whether a non-composite field is itself a key attribute of some index
    /// and is therefore stored in key encoding.
    pub fn is_direct_key_field(&self, field: &str) -> bool {
        self.indexes.iter().any(|i| {
            std::iter::once(&i.hash_key)
                .chain(i.range_key.iter())
                .any(|k| !k.composite && k.name == field)
        })
    }

    /// Whether a field contributes to the primary key.
    pub fn is_primary_key_field(&self, field: &str) -> bool {
        let primary = self.primary_index();
        primary.hash_key.has_component(field)
            || primary
                .range_key
                .as_ref()
                .is_some_and(|k| k.has_component(field))
    }
}
