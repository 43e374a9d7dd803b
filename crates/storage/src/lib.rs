pub mod conformance;
mod error;
mod file;
mod memory;
mod record;
mod traits;

pub use error::StorageError;
pub use file::JsonFileBackend;
pub use memory::MemoryBackend;
pub use record::{ChunkKey, ChunkRecord};
pub use traits::KeyValueBackend;
