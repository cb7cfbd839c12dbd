//! Key encoding and record/item mapping.

mod error;
mod item;
mod key;
mod value;

pub use error::CodecError;
pub use key::{Codec, DEFAULT_TERMINATOR};
pub use value::{AttributeValue, Item, Record, Value};
