//! Storage layer: string-keyed backends and the keyed local draft store.

mod error;
pub use error::StoreError;

mod kv;
pub use kv::{KeyValueStore, MemoryStore};

mod file;
pub use file::FileStore;

mod draft;
pub use draft::{DraftStore, RestoredSlot};
