//! Write-then-read round trips and cross-agent/cross-project isolation.

use aml_core::error::Error;
use aml_test_utils::{admin_principal, developer_principal, open_store, sample_pattern};
use tempfile::TempDir;

#[test]
fn a_pattern_written_by_an_agent_is_read_back_unchanged() {
    let dir = TempDir::new().unwrap();
    let store = open_store(dir.path(), "acme").unwrap();
    let principal = developer_principal("dev-1", "acme", "scout");

    let pattern = sample_pattern("scout", "react-opt");
    let created = store.add_pattern(&principal, pattern.clone()).unwrap();
    assert_eq!(created.id, pattern.id);

    let fetched = store.get_patterns(&principal, &"scout".into(), None).unwrap();
    assert_eq!(fetched.len(), 1);
    assert_eq!(fetched[0].id, pattern.id);
}

#[test]
fn a_developer_cannot_read_another_agents_patterns() {
    let dir = TempDir::new().unwrap();
    let store = open_store(dir.path(), "acme").unwrap();
    let owner = developer_principal("dev-1", "acme", "scout");
    let intruder = developer_principal("dev-2", "acme", "ranger");

    store.add_pattern(&owner, sample_pattern("scout", "react-opt")).unwrap();

    let result = store.get_patterns(&intruder, &"scout".into(), None);
    assert!(matches!(result, Err(Error::AccessDenied(_))));
}

#[test]
fn a_developer_in_another_project_cannot_reach_the_store_at_all() {
    let dir = TempDir::new().unwrap();
    let store = open_store(dir.path(), "acme").unwrap();
    let foreign = developer_principal("dev-3", "globex", "scout");

    let result = store.get_patterns(&foreign, &"scout".into(), None);
    assert!(matches!(result, Err(Error::AccessDenied(_))));
}

#[test]
fn an_admin_can_read_any_agents_patterns_in_their_project() {
    let dir = TempDir::new().unwrap();
    let store = open_store(dir.path(), "acme").unwrap();
    let owner = developer_principal("dev-1", "acme", "scout");
    let admin = admin_principal("root", "acme");

    store.add_pattern(&owner, sample_pattern("scout", "react-opt")).unwrap();

    let fetched = store.get_patterns(&admin, &"scout".into(), None).unwrap();
    assert_eq!(fetched.len(), 1);
}

#[test]
fn deleting_an_unknown_pattern_id_is_a_not_found_error() {
    let dir = TempDir::new().unwrap();
    let store = open_store(dir.path(), "acme").unwrap();
    let principal = developer_principal("dev-1", "acme", "scout");

    let result = store.delete_pattern(&principal, &"scout".into(), uuid::Uuid::new_v4(), true);
    assert!(matches!(result, Err(Error::NotFound(_))));
}
