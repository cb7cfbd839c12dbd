//! In-memory storage backend for testing.
//!
//! Tables live in a `BTreeMap` per table wrapped in `Arc<RwLock<_>>`. Useful
//! for tests and the `demo` command, where persistence is not required.
//!
//! # Example
//!
//! ```rust,ignore
//! use dynamap::storage::inmemory::InMemoryBackend;
//!
//! let backend = InMemoryBackend::new().with_page_size(25);
//! backend.create_table_for(&schema, "dev").await;
//! ```

mod backend;

pub use backend::{InMemoryBackend, DEFAULT_PAGE_SIZE};
