//! dynamap_core - data-access contract for hash/range key-value stores.
//!
//! Pure building blocks shared by every backend:
//!
//! - [`schema`]: entity schemas, field descriptors, index definitions and
//!   the physical table layout derived from them.
//! - [`codec`]: order-preserving key encoding and record/item mapping.
//! - [`query`]: query planning (key conditions, cursors, tie-breaks) and the
//!   pager that drives backend pagination.
//! - [`backend`]: the async boundary with the storage SDK.
//! - [`store`]: Save/Create/Get/Delete and Query/Scan entry points.

pub mod backend;
pub mod codec;
pub mod context;
pub mod error;
pub mod query;
pub mod schema;
pub mod store;

pub use backend::{Backend, BackendError};
pub use codec::{AttributeValue, Codec, CodecError, Item, Record, Value};
pub use context::{CancelHandle, OperationContext};
pub use error::{Error, Result};
pub use query::{
    Cursor, Direction, IterationSummary, PagedItem, Pager, QueryRequest, RangePredicate,
    ScanRequest,
};
pub use schema::{
    EntitySchema, FieldDescriptor, IndexDefinition, IndexKind, LogicalType, SchemaError,
    TableConfig,
};
pub use store::{Entity, EntityTable, Key, Table, TableOptions};
