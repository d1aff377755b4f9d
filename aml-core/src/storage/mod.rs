//! Durable on-disk storage.

pub mod engine;
pub mod keys;
pub mod record;

pub use engine::{FsStorageEngine, StorageOptions};
pub use keys::{Collection, StorageKey};
pub use record::EncryptionKey;
