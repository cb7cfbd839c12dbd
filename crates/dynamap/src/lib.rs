//! dynamap - DynamoDB data access for schema-described entities.
//!
//! The pure layer (schemas, key codec, query planning, paging) lives in
//! `dynamap_core`. This crate adds:
//!
//! - [`config`]: environment-driven configuration
//! - [`provision`]: table deploy plans derived from entity schemas
//! - [`storage`]: the in-memory and DynamoDB backends
//! - [`widget`]: the sample entity used by the CLI

pub mod config;
pub mod provision;
pub mod storage;
pub mod widget;

pub use config::Config;
