//! Backup Manager: full and incremental snapshots of a project's
//! storage tree, with checksummed manifests and point-in-time restore.
//!
//! Follows the same shape as the other filesystem-facing components in
//! this crate (atomic writes, `thiserror`-based errors, `tracing`
//! instrumentation), using `tar` + `flate2` + `sha2` for the archive
//! format itself.

use crate::error::{Error, Result};
use crate::types::{AgentName, BackupDescriptor, BackupFileEntry, BackupType};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tar::{Archive, Builder};
use uuid::Uuid;

/// Where backups are written and from which the live tree is restored.
pub struct BackupManager {
    /// Root of the live memory tree being backed up.
    source_root: PathBuf,
    /// Directory backup archives and manifests are written into.
    backup_dir: PathBuf,
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

fn sha256_file(path: &Path) -> Result<String> {
    let mut file = fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

fn manifest_path(backup_dir: &Path, backup_id: &str) -> PathBuf {
    backup_dir.join(format!("{backup_id}.manifest.json"))
}

fn archive_path(backup_dir: &Path, backup_id: &str) -> PathBuf {
    backup_dir.join(format!("{backup_id}.tar.gz"))
}

fn list_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else {
                out.push(path);
            }
        }
    }
    out.sort();
    Ok(out)
}

fn agent_from_relative(relative: &str) -> Option<AgentName> {
    relative.split('/').next().map(AgentName::from)
}

impl BackupManager {
    /// Opens a backup manager rooted at `source_root` with archives stored
    /// under `backup_dir` (created if absent).
    pub fn new(source_root: impl Into<PathBuf>, backup_dir: impl Into<PathBuf>) -> Result<Self> {
        let backup_dir = backup_dir.into();
        fs::create_dir_all(&backup_dir)?;
        Ok(Self {
                source_root: source_root.into(),
                backup_dir,
        })
    }

    /// Creates a full backup of every file under the source root (
    /// `createFullBackup`).
    pub fn create_full_backup(&self, backup_id: &str) -> Result<BackupDescriptor> {
        let files = list_files(&self.source_root)?;
        self.write_archive(backup_id, BackupType::Full, None, &files)
    }

    /// Creates an incremental backup containing only files that changed (by
    /// content hash) since `base_backup_id`'s manifest (
    /// `createIncrementalBackup`).
    pub fn create_incremental_backup(&self, backup_id: &str, base_backup_id: &str) -> Result<BackupDescriptor> {
        let base = self.load_manifest(base_backup_id)?;
        let base_hashes: std::collections::HashMap<String, String> =
        base.files.iter().map(|f| (f.path.clone(), f.sha256.clone())).collect();

        let mut changed = Vec::new();
        for path in list_files(&self.source_root)? {
            let relative = path
            .strip_prefix(&self.source_root)
            .map_err(|e| Error::Internal(e.to_string()))?
            .to_string_lossy()
            .replace('\\', "/");
            let hash = sha256_file(&path)?;
            if base_hashes.get(&relative) != Some(&hash) {
                changed.push(path);
            }
        }
        self.write_archive(backup_id, BackupType::Incremental, Some(base_backup_id.to_string()), &changed)
    }

    fn write_archive(
        &self,
        backup_id: &str,
        backup_type: BackupType,
        base_backup_id: Option<String>,
        files: &[PathBuf],
    ) -> Result<BackupDescriptor> {
        let archive_tmp = archive_path(&self.backup_dir, backup_id).with_extension("tar.gz.tmp");
        let encoder = GzEncoder::new(fs::File::create(&archive_tmp)?, Compression::default());
        let mut builder = Builder::new(encoder);

        let mut manifest_entries = Vec::with_capacity(files.len());
        let mut agents_included = HashSet::new();
        let mut total_size = 0u64;

        for path in files {
            let relative = path
            .strip_prefix(&self.source_root)
            .map_err(|e| Error::Internal(e.to_string()))?
            .to_string_lossy()
            .replace('\\', "/");
            let metadata = fs::metadata(path)?;
            let size = metadata.len();
            let hash = sha256_file(path)?;
            builder.append_path_with_name(path, &relative)?;
            if let Some(agent) = agent_from_relative(&relative) {
                agents_included.insert(agent);
            }
            total_size += size;
            manifest_entries.push(BackupFileEntry {
                    path: relative,
                    sha256: hash,
                    size,
            });
        }
        let encoder = builder.into_inner().map_err(Error::IoFailure)?;
        encoder.finish().map_err(Error::IoFailure)?;

        let final_archive = archive_path(&self.backup_dir, backup_id);
        fs::rename(&archive_tmp, &final_archive)?;
        let archive_checksum = sha256_file(&final_archive)?;

        let mut agents_included: Vec<AgentName> = agents_included.into_iter().collect();
        agents_included.sort_by(|a, b| a.as_str().cmp(b.as_str()));

        let descriptor = BackupDescriptor {
            backup_id: backup_id.to_string(),
            timestamp: chrono::Utc::now(),
            r#type: backup_type,
            base_backup_id,
            size: total_size,
            archive_checksum,
            files: manifest_entries,
            agents_included,
        };

        let manifest_json = serde_json::to_vec_pretty(&descriptor)?;
        let manifest_tmp = manifest_path(&self.backup_dir, backup_id).with_extension("json.tmp");
        fs::write(&manifest_tmp, &manifest_json)?;
        fs::rename(&manifest_tmp, manifest_path(&self.backup_dir, backup_id))?;

        tracing::info!(backup_id, size = descriptor.size, "backup created");
        Ok(descriptor)
    }

    fn load_manifest(&self, backup_id: &str) -> Result<BackupDescriptor> {
        let path = manifest_path(&self.backup_dir, backup_id);
        if !path.exists() {
            return Err(Error::BackupNotFound(backup_id.to_string()));
        }
        let bytes = fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Lists every backup descriptor known to this manager, newest first.
    pub fn list_backups(&self) -> Result<Vec<BackupDescriptor>> {
        let mut descriptors = Vec::new();
        for entry in fs::read_dir(&self.backup_dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("tmp") {
                continue;
            }
            if path.to_string_lossy().ends_with(".manifest.json") {
                let bytes = fs::read(&path)?;
                descriptors.push(serde_json::from_slice::<BackupDescriptor>(&bytes)?);
            }
        }
        descriptors.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(descriptors)
    }

    /// Verifies an archive's checksum and every manifested file's hash
    /// without touching the live tree.
    pub fn validate_backup(&self, backup_id: &str) -> Result<()> {
        let descriptor = self.load_manifest(backup_id)?;
        let archive = archive_path(&self.backup_dir, backup_id);
        if !archive.exists() {
            return Err(Error::BackupNotFound(backup_id.to_string()));
        }
        let actual_checksum = sha256_file(&archive)?;
        if actual_checksum != descriptor.archive_checksum {
            return Err(Error::Corrupted(format!(
                        "backup {backup_id} archive checksum mismatch: expected {}, got {actual_checksum}",
                        descriptor.archive_checksum
            )));
        }

        let file = fs::File::open(&archive)?;
        let mut tar_archive = Archive::new(GzDecoder::new(file));
        let expected: std::collections::HashMap<String, &BackupFileEntry> =
        descriptor.files.iter().map(|f| (f.path.clone(), f)).collect();
        let mut seen = HashSet::new();
        for entry in tar_archive.entries()? {
            let mut entry = entry?;
            let name = entry.path()?.to_string_lossy().replace('\\', "/");
            let expected_entry = expected
            .get(&name)
            .ok_or_else(|| Error::Corrupted(format!("backup {backup_id} contains unmanifested file {name}")))?;
            let mut contents = Vec::new();
            entry.read_to_end(&mut contents)?;
            if sha256_hex(&contents) != expected_entry.sha256 {
                return Err(Error::Corrupted(format!("backup {backup_id} file {name} failed checksum")));
            }
            seen.insert(name);
        }
        if seen.len() != descriptor.files.len() {
            return Err(Error::Corrupted(format!(
                        "backup {backup_id} manifest lists {} files but archive contains {}",
                        descriptor.files.len(),
                        seen.len()
            )));
        }
        Ok(())
    }

    /// Restores a backup over the live tree. Refuses with
    /// `Error::RestoreConflict` if the live tree has files the backup's
    /// chain does not account for and `force` is false; pass
    /// `pre_restore_backup_id` to snapshot the live tree under that id
    /// before overwriting it.
    pub fn restore(&self, backup_id: &str, force: bool, pre_restore_backup_id: Option<&str>) -> Result<BackupDescriptor> {
        self.validate_backup(backup_id)?;
        let descriptor = self.load_manifest(backup_id)?;
        let chain = self.resolve_chain(&descriptor)?;

        if !force {
            let expected_paths: HashSet<String> = chain
            .iter()
            .flat_map(|d| d.files.iter().map(|f| f.path.clone()))
            .collect();
            let live_files = list_files(&self.source_root)?;
            for path in &live_files {
                let relative = path
                .strip_prefix(&self.source_root)
                .map_err(|e| Error::Internal(e.to_string()))?
                .to_string_lossy()
                .replace('\\', "/");
                if !expected_paths.contains(&relative) {
                    return Err(Error::RestoreConflict(format!(
                                "live tree has untracked file {relative} not present in backup {backup_id}; pass force=true to overwrite anyway"
                    )));
                }
            }
        }

        if let Some(pre_id) = pre_restore_backup_id {
            self.create_full_backup(pre_id)?;
        }

        let staging = self.backup_dir.join(format!(".restore-staging-{}", Uuid::new_v4()));
        fs::create_dir_all(&staging)?;
        if let Err(err) = self.unpack_chain_into(&chain, &staging) {
            let _ = fs::remove_dir_all(&staging);
            return Err(err);
        }

        if let Err(err) = self.swap_in_staged_tree(staging) {
            return Err(err);
        }

        tracing::info!(backup_id, "restore completed");
        Ok(descriptor)
    }

    fn unpack_chain_into(&self, chain: &[BackupDescriptor], staging: &Path) -> Result<()> {
        for entry in chain {
            let archive = archive_path(&self.backup_dir, &entry.backup_id);
            let file = fs::File::open(&archive)?;
            let mut tar_archive = Archive::new(GzDecoder::new(file));
            tar_archive.unpack(staging)?;
        }
        Ok(())
    }

    /// Swaps a fully staged tree into place atomically: the live tree is
    /// moved aside, the staged tree is renamed over it, and the old tree is
    /// only discarded once the swap succeeds. If the final rename fails the
    /// old tree is moved back, leaving the live tree untouched.
    fn swap_in_staged_tree(&self, staging: PathBuf) -> Result<()> {
        let swap_aside = self.backup_dir.join(format!(".restore-previous-{}", Uuid::new_v4()));
        if self.source_root.exists() {
            fs::rename(&self.source_root, &swap_aside)?;
        }
        if let Err(err) = fs::rename(&staging, &self.source_root) {
            if swap_aside.exists() {
                let _ = fs::rename(&swap_aside, &self.source_root);
            }
            return Err(Error::IoFailure(err));
        }
        let _ = fs::remove_dir_all(&swap_aside);
        Ok(())
    }

    /// Restores the chain of backups whose timestamps are `<= at`, picking
    /// the newest eligible backup as the restore target (
    /// `restoreToPointInTime`).
    pub fn restore_to_point_in_time(&self, at: chrono::DateTime<chrono::Utc>, force: bool) -> Result<BackupDescriptor> {
        let candidate = self
        .list_backups()?
        .into_iter()
        .filter(|d| d.timestamp <= at)
        .max_by_key(|d| d.timestamp)
        .ok_or_else(|| Error::BackupNotFound(format!("no backup at or before {at}")))?;
        self.restore(&candidate.backup_id, force, None)
    }

    /// Walks an incremental backup's `base_backup_id` chain back to its
    /// full backup, returning descriptors oldest-first so later entries in
    /// the chain correctly overwrite earlier ones on restore.
    fn resolve_chain(&self, descriptor: &BackupDescriptor) -> Result<Vec<BackupDescriptor>> {
        let mut chain = vec![descriptor.clone()];
        let mut current = descriptor.clone();
        while let Some(base_id) = current.base_backup_id.clone() {
            let base = self.load_manifest(&base_id)?;
            chain.push(base.clone());
            current = base;
        }
        chain.reverse();
        Ok(chain)
    }

    /// Deletes one backup's archive and manifest.
    pub fn delete_backup(&self, backup_id: &str) -> Result<()> {
        let manifest = manifest_path(&self.backup_dir, backup_id);
        if !manifest.exists() {
            return Err(Error::BackupNotFound(backup_id.to_string()));
        }
        fs::remove_file(&manifest)?;
        let archive = archive_path(&self.backup_dir, backup_id);
        if archive.exists() {
            fs::remove_file(&archive)?;
        }
        Ok(())
    }

    /// Deletes every backup older than `cutoff`, skipping any full backup
    /// that a retained incremental backup still depends on.
    pub fn delete_backups_older_than(&self, cutoff: chrono::DateTime<chrono::Utc>) -> Result<Vec<String>> {
        let all = self.list_backups()?;
        let retained_bases: HashSet<String> = all
        .iter()
        .filter(|d| d.timestamp >= cutoff)
        .filter_map(|d| d.base_backup_id.clone())
        .collect();

        let mut deleted = Vec::new();
        for descriptor in &all {
            if descriptor.timestamp >= cutoff || retained_bases.contains(&descriptor.backup_id) {
                continue;
            }
            self.delete_backup(&descriptor.backup_id)?;
            deleted.push(descriptor.backup_id.clone());
        }
        Ok(deleted)
    }

    /// Keeps only the `n` most recent backups, deleting the rest (oldest
    /// full backups are kept if a retained incremental still chains to
    /// them).
    pub fn keep_last_n_backups(&self, n: usize) -> Result<Vec<String>> {
        let all = self.list_backups()?;
        if all.len() <= n {
            return Ok(Vec::new());
        }
        let retained: Vec<&BackupDescriptor> = all.iter().take(n).collect();
        let retained_bases: HashSet<&str> = retained.iter().filter_map(|d| d.base_backup_id.as_deref()).collect();

        let mut deleted = Vec::new();
        for descriptor in all.iter().skip(n) {
            if retained_bases.contains(descriptor.backup_id.as_str()) {
                continue;
            }
            self.delete_backup(&descriptor.backup_id)?;
            deleted.push(descriptor.backup_id.clone());
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn seed_source(root: &Path) {
        fs::create_dir_all(root.join("agent-a/patterns")).unwrap();
        fs::write(root.join("agent-a/patterns/p1.rec"), b"pattern one").unwrap();
        fs::write(root.join("agent-a/patterns/p2.rec"), b"pattern two").unwrap();
    }

    #[test]
    fn full_backup_round_trips_through_validate() {
        let source = tempdir().unwrap();
        let backups = tempdir().unwrap();
        seed_source(source.path());
        let manager = BackupManager::new(source.path(), backups.path()).unwrap();

        let descriptor = manager.create_full_backup("b1").unwrap();
        assert_eq!(descriptor.files.len(), 2);
        manager.validate_backup("b1").expect("valid backup");
    }

    #[test]
    fn incremental_backup_only_contains_changed_files() {
        let source = tempdir().unwrap();
        let backups = tempdir().unwrap();
        seed_source(source.path());
        let manager = BackupManager::new(source.path(), backups.path()).unwrap();
        manager.create_full_backup("base").unwrap();

        fs::write(source.path().join("agent-a/patterns/p1.rec"), b"pattern one changed").unwrap();
        let incremental = manager.create_incremental_backup("inc1", "base").unwrap();
        assert_eq!(incremental.files.len(), 1);
        assert_eq!(incremental.files[0].path, "agent-a/patterns/p1.rec");
    }

    #[test]
    fn restore_rejects_untracked_live_files_without_force() {
        let source = tempdir().unwrap();
        let backups = tempdir().unwrap();
        seed_source(source.path());
        let manager = BackupManager::new(source.path(), backups.path()).unwrap();
        manager.create_full_backup("b1").unwrap();

        fs::write(source.path().join("agent-a/patterns/untracked.rec"), b"surprise").unwrap();
        let result = manager.restore("b1", false, None);
        assert!(matches!(result, Err(Error::RestoreConflict(_))));
    }

    #[test]
    fn restore_recovers_deleted_file() {
        let source = tempdir().unwrap();
        let backups = tempdir().unwrap();
        seed_source(source.path());
        let manager = BackupManager::new(source.path(), backups.path()).unwrap();
        manager.create_full_backup("b1").unwrap();

        fs::remove_file(source.path().join("agent-a/patterns/p1.rec")).unwrap();
        manager.restore("b1", true, None).unwrap();
        assert!(source.path().join("agent-a/patterns/p1.rec").exists());
    }

    #[test]
    fn delete_backups_older_than_is_a_no_op_for_a_past_cutoff() {
        let source = tempdir().unwrap();
        let backups = tempdir().unwrap();
        seed_source(source.path());
        let manager = BackupManager::new(source.path(), backups.path()).unwrap();
        manager.create_full_backup("base").unwrap();
        fs::write(source.path().join("agent-a/patterns/p1.rec"), b"v2").unwrap();
        manager.create_incremental_backup("inc1", "base").unwrap();

        let cutoff = chrono::Utc::now() - chrono::Duration::days(1);
        let deleted = manager.delete_backups_older_than(cutoff).unwrap();
        assert!(deleted.is_empty());
        assert_eq!(manager.list_backups().unwrap().len(), 2);
    }

    #[test]
    fn keep_last_n_backups_preserves_a_base_its_incremental_depends_on() {
        let source = tempdir().unwrap();
        let backups = tempdir().unwrap();
        seed_source(source.path());
        let manager = BackupManager::new(source.path(), backups.path()).unwrap();
        manager.create_full_backup("base").unwrap();
        fs::write(source.path().join("agent-a/patterns/p1.rec"), b"v2").unwrap();
        manager.create_incremental_backup("inc1", "base").unwrap();
        fs::write(source.path().join("agent-a/patterns/p1.rec"), b"v3").unwrap();
        manager.create_incremental_backup("inc2", "base").unwrap();

        let deleted = manager.keep_last_n_backups(1).unwrap();
        assert!(!deleted.contains(&"base".to_string()));
        assert!(manager.list_backups().unwrap().iter().any(|d| d.backup_id == "base"));
    }

    #[test]
    fn validate_backup_detects_tampered_archive() {
        let source = tempdir().unwrap();
        let backups = tempdir().unwrap();
        seed_source(source.path());
        let manager = BackupManager::new(source.path(), backups.path()).unwrap();
        manager.create_full_backup("b1").unwrap();

        fs::write(archive_path(backups.path(), "b1"), b"corrupted bytes").unwrap();
        let result = manager.validate_backup("b1");
        assert!(result.is_err());
    }
}
