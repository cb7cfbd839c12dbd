//! DynamoDB storage backend implementation.
//!
//! Translates `dynamap_core` backend inputs into `aws-sdk-dynamodb` calls and
//! provisions tables from their `TableConfig`.

mod backend;
mod client;
mod conversions;
mod deploy;
mod error;

pub use backend::DynamoDbBackend;
pub use client::{create_client, get_table_state};
pub use deploy::{ensure_table, execute_deploy_plan};
