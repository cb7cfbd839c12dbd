mod builder;
pub mod naming;
mod table;
mod types;

pub use builder::{EntitySchemaBuilder, SchemaError};
pub use table::{
    AttributeType, BillingMode, KeyAttributeConfig, ProjectionType, SecondaryIndexConfig,
    TableConfig,
};
pub use types::{
    ComponentEncoding, EntitySchema, FieldDescriptor, IndexDefinition, IndexKind, KeyAttribute,
    KeyComponent, LogicalType,
};
