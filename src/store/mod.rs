//! Persistence layer: per-user taste records keyed by chat user id.

pub mod json_file;
pub mod memory;
pub mod model;
pub mod traits;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;
pub use model::{Clock, Document, FixedClock, SystemClock, TasteEntry, UserRecord};
pub use traits::TasteStore;
