//! Storage abstraction: field-level read/write traits, change notifications
//! and an in-memory implementation.

mod memory;
mod traits;

pub use memory::{MemoryStore, WriteRecord};
pub use traits::{FieldReader, FieldStore, FieldWriter, StorageNotification};
