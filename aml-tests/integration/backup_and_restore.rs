//! Full/incremental backup, validation and point-in-time restore.

use aml_core::backup::BackupManager;
use aml_test_utils::{developer_principal, open_store, sample_pattern};
use std::{thread, time::Duration};
use tempfile::TempDir;

#[test]
fn a_full_backup_restores_a_deleted_pattern() {
    let root = TempDir::new().unwrap();
    let source = root.path().join("memory");
    let backups = root.path().join("backups");
    std::fs::create_dir_all(&source).unwrap();

    let store = open_store(&source, "acme").unwrap();
    let principal = developer_principal("dev-1", "acme", "scout");
    let pattern = sample_pattern("scout", "react-opt");
    store.add_pattern(&principal, pattern.clone()).unwrap();

    let manager = BackupManager::new(&source, &backups).unwrap();
    manager.create_full_backup("snap-1").unwrap();

    store.delete_pattern(&principal, &"scout".into(), pattern.id, true).unwrap();
    assert!(store.get_patterns(&principal, &"scout".into(), None).unwrap().is_empty());

    manager.restore("snap-1", true, None).unwrap();

    let store_after = open_store(&source, "acme").unwrap();
    let restored = store_after.get_patterns(&principal, &"scout".into(), None).unwrap();
    assert_eq!(restored.len(), 1);
    assert_eq!(restored[0].id, pattern.id);
}

#[test]
fn an_incremental_backup_only_captures_changes_since_the_base() {
    let root = TempDir::new().unwrap();
    let source = root.path().join("memory");
    let backups = root.path().join("backups");
    std::fs::create_dir_all(&source).unwrap();

    let store = open_store(&source, "acme").unwrap();
    let principal = developer_principal("dev-1", "acme", "scout");
    store.add_pattern(&principal, sample_pattern("scout", "first")).unwrap();

    let manager = BackupManager::new(&source, &backups).unwrap();
    let full = manager.create_full_backup("base").unwrap();

    store.add_pattern(&principal, sample_pattern("scout", "second")).unwrap();
    let incremental = manager.create_incremental_backup("inc-1", "base").unwrap();

    assert!(incremental.files.len() <= full.files.len());
    assert_eq!(incremental.base_backup_id.as_deref(), Some("base"));
}

#[test]
fn validate_backup_detects_a_tampered_archive() {
    let root = TempDir::new().unwrap();
    let source = root.path().join("memory");
    let backups = root.path().join("backups");
    std::fs::create_dir_all(&source).unwrap();
    std::fs::write(source.join("seed.txt"), b"hello").unwrap();

    let manager = BackupManager::new(&source, &backups).unwrap();
    manager.create_full_backup("snap-1").unwrap();
    assert!(manager.validate_backup("snap-1").is_ok());

    let archive = backups.join("snap-1.tar.gz");
    let mut bytes = std::fs::read(&archive).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;
    std::fs::write(&archive, bytes).unwrap();

    assert!(manager.validate_backup("snap-1").is_err());
}

#[test]
fn restore_to_point_in_time_picks_the_newest_backup_at_or_before_the_cutoff() {
    let root = TempDir::new().unwrap();
    let source = root.path().join("memory");
    let backups = root.path().join("backups");
    std::fs::create_dir_all(&source).unwrap();

    let manager = BackupManager::new(&source, &backups).unwrap();
    std::fs::write(source.join("v1.txt"), b"v1").unwrap();
    manager.create_full_backup("v1").unwrap();

    thread::sleep(Duration::from_millis(20));
    let cutoff = chrono::Utc::now();
    thread::sleep(Duration::from_millis(20));

    std::fs::write(source.join("v2.txt"), b"v2").unwrap();
    manager.create_full_backup("v2").unwrap();

    let restored = manager.restore_to_point_in_time(cutoff, true).unwrap();
    assert_eq!(restored.backup_id, "v1");
}

#[test]
fn keep_last_n_backups_prunes_the_oldest_first() {
    let root = TempDir::new().unwrap();
    let source = root.path().join("memory");
    let backups = root.path().join("backups");
    std::fs::create_dir_all(&source).unwrap();

    let manager = BackupManager::new(&source, &backups).unwrap();
    for id in ["a", "b", "c"] {
        std::fs::write(source.join(format!("{id}.txt")), id.as_bytes()).unwrap();
        manager.create_full_backup(id).unwrap();
        thread::sleep(Duration::from_millis(10));
    }

    let deleted = manager.keep_last_n_backups(1).unwrap();
    assert_eq!(deleted.len(), 2);
    let remaining = manager.list_backups().unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].backup_id, "c");
}
