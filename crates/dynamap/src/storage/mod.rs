//! Storage backend implementations.
//!
//! Concrete implementations of `dynamap_core::Backend`.
//!
//! # Feature Flags
//!
//! - `dynamodb`: AWS DynamoDB backend and table provisioning using
//!   `aws-sdk-dynamodb`
//!
//! The in-memory backend is always available.
//!
//! Build with DynamoDB:
//! ```bash
//! cargo build -p dynamap --features dynamodb
//! ```

pub mod inmemory;

#[cfg(feature = "dynamodb")]
pub mod dynamodb;

pub use inmemory::InMemoryBackend;

#[cfg(feature = "dynamodb")]
pub use dynamodb::DynamoDbBackend;
