//! CRUD and query entry points bound to a backend.

mod entity;
mod key;
mod table;

pub use entity::{Entity, EntityTable};
pub use key::Key;
pub use table::{Table, TableOptions};
