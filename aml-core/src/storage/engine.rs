//! The filesystem-backed storage engine.
//!
//! Writes go to a temp file in the target directory, are fsynced, then
//! renamed over the target — readers never observe a partially written
//! record. A per-key mutex serializes concurrent writers to the same key;
//! different keys proceed independently.

use crate::error::{Error, Result};
use crate::security::context::EncryptionContext;
use crate::storage::keys::StorageKey;
use crate::storage::record::{decode_record, encode_record, EncryptionKey};
use crate::types::ProjectId;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Per-call options for [`FsStorageEngine`] reads/writes, mirroring the
/// `compression`/`encryption` toggles in `storage` config.
#[derive(Debug, Clone, Copy)]
pub struct StorageOptions {
    /// Whether to gzip the payload before writing.
    pub compression: bool,
    /// Whether to AEAD-encrypt the payload.
    pub encryption: bool,
}

struct KeyLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl KeyLocks {
    fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn lock_for(&self, key: &str) -> Arc<Mutex<()>> {
        let mut map = self.locks.lock();
        map.entry(key.to_string()).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }
}

/// Filesystem-backed durable store with atomic writes, optional
/// compression, optional encryption-at-rest, and per-agent directory
/// isolation.
pub struct FsStorageEngine {
    root: PathBuf,
    project_id: ProjectId,
    options: StorageOptions,
    encryption_key: Option<EncryptionKey>,
    max_size_bytes: u64,
    key_locks: KeyLocks,
}

impl FsStorageEngine {
    /// Opens (creating if absent) a storage root at `root` for `project_id`.
    pub fn open(
        root: impl Into<PathBuf>,
        project_id: ProjectId,
        options: StorageOptions,
        encryption_key: Option<EncryptionKey>,
        max_size_gb: f64,
    ) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self {
                root,
                project_id,
                options,
                encryption_key,
                max_size_bytes: (max_size_gb * 1024.0 * 1024.0 * 1024.0) as u64,
                key_locks: KeyLocks::new(),
        })
    }

    fn encryption_context(&self, key: &StorageKey) -> EncryptionContext {
        match key.agent() {
            Some(agent) => EncryptionContext::for_agent(agent, &self.project_id),
            None => EncryptionContext::for_project(&self.project_id),
        }
    }

    fn absolute_path(&self, key: &StorageKey) -> PathBuf {
        self.root.join(key.relative_path())
    }

    /// Ensures the per-agent directory tree exists (`patterns/`, `solutions/`,
    /// `decisions/`).
    pub fn ensure_agent_directory(&self, agent: &crate::types::AgentName) -> Result<()> {
        for dirname in ["patterns", "solutions", "decisions"] {
            fs::create_dir_all(self.root.join(agent.as_str()).join(dirname))?;
        }
        Ok(())
    }

    /// Writes `plaintext` to `key`, rejecting the write if it would take the
    /// total storage tree past `max_size_gb`.
    pub fn put(&self, key: &StorageKey, plaintext: &[u8]) -> Result<()> {
        let lock = self.key_locks.lock_for(&key.cache_key());
        let _guard = lock.lock();

        let encoded = {
            let encrypt = if self.options.encryption {
                let key_bytes = self
                .encryption_key
                .as_ref()
                .ok_or_else(|| Error::Internal("encryption enabled but no key configured".into()))?;
                Some((key_bytes, self.encryption_context(key)))
            } else {
                None
            };
            let encrypt_ref = encrypt.as_ref().map(|(k, c)| (*k, c));
            encode_record(plaintext, self.options.compression, encrypt_ref)?
        };

        let path = self.absolute_path(key);
        let existing_len = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        let projected = self.tree_size()?.saturating_sub(existing_len) + encoded.len() as u64;
        if self.max_size_bytes > 0 && projected > self.max_size_bytes {
            return Err(Error::SizeExceeded(format!(
                        "write of {} bytes would exceed the {}-byte storage cap",
                        encoded.len(),
                        self.max_size_bytes
            )));
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        atomic_write(&path, &encoded)?;
        Ok(())
    }

    /// Reads and decodes `key`, returning `Error::NotFound` if absent.
    pub fn get(&self, key: &StorageKey) -> Result<Vec<u8>> {
        let lock = self.key_locks.lock_for(&key.cache_key());
        let _guard = lock.lock();

        let path = self.absolute_path(key);
        let bytes = fs::read(&path).map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Error::NotFound(key.cache_key())
                } else {
                    Error::IoFailure(e)
                }
        })?;

        let decrypt = if self.options.encryption {
            Some((
                    self.encryption_key
                    .as_ref()
                    .ok_or_else(|| Error::Internal("encryption enabled but no key configured".into()))?,
                    self.encryption_context(key),
            ))
        } else {
            None
        };
        let decrypt_ref = decrypt.as_ref().map(|(k, c)| (*k, c));
        decode_record(&bytes, decrypt_ref)
    }

    /// Deletes `key`. Idempotent: deleting an absent key is not an error.
    pub fn delete(&self, key: &StorageKey) -> Result<()> {
        let lock = self.key_locks.lock_for(&key.cache_key());
        let _guard = lock.lock();
        let path = self.absolute_path(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::IoFailure(e)),
        }
    }

    /// Whether `key` exists on disk.
    #[must_use]
    pub fn exists(&self, key: &StorageKey) -> bool {
        self.absolute_path(key).is_file()
    }

    /// Lists the ids (file stems) present in `agent`'s `collection`.
    pub fn list(
        &self,
        agent: &crate::types::AgentName,
        collection: crate::storage::keys::Collection,
    ) -> Result<Vec<uuid::Uuid>> {
        let dirname = match collection {
            crate::storage::keys::Collection::Patterns => "patterns",
            crate::storage::keys::Collection::Solutions => "solutions",
            crate::storage::keys::Collection::Decisions => "decisions",
        };
        let dir = self.root.join(agent.as_str()).join(dirname);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut ids = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("rec") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if let Ok(id) = uuid::Uuid::parse_str(stem) {
                    ids.push(id);
                }
            }
        }
        Ok(ids)
    }

    /// Reads a `global/` key.
    pub fn get_global(&self, key: &str) -> Result<Vec<u8>> {
        self.get(&StorageKey::Global(key.to_string()))
    }

    /// Writes a `global/` key.
    pub fn set_global(&self, key: &str, plaintext: &[u8]) -> Result<()> {
        self.put(&StorageKey::Global(key.to_string()), plaintext)
    }

    /// Root directory this engine is rooted at.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn tree_size(&self) -> Result<u64> {
        dir_size(&self.root)
    }
}

fn dir_size(path: &Path) -> Result<u64> {
    let mut total = 0u64;
    if !path.exists() {
        return Ok(0);
    }
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        let metadata = entry.metadata()?;
        if metadata.is_dir() {
            total += dir_size(&entry.path())?;
        } else {
            total += metadata.len();
        }
    }
    Ok(total)
}

fn atomic_write(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = path
    .parent()
    .ok_or_else(|| Error::Internal("storage path has no parent directory".into()))?;
    let tmp_path = parent.join(format!(
            ".{}.tmp-{}",
            path.file_name().and_then(|f| f.to_str()).unwrap_or("record"),
            uuid::Uuid::new_v4()
    ));
    {
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    fs::rename(&tmp_path, path)?;
    Ok(())
}
