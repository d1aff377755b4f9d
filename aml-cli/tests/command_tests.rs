use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn cli(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("aml").unwrap();
    cmd.arg("--data-dir")
    .arg(dir.path().join("memory"))
    .arg("--no-encryption")
    .arg("--project")
    .arg("acme")
    .arg("--user")
    .arg("tester")
    .arg("--role")
    .arg("admin");
    cmd
}

fn write_json(dir: &TempDir, name: &str, value: &impl serde::Serialize) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, serde_json::to_vec_pretty(value).unwrap()).unwrap();
    path
}

#[test]
fn pattern_list_is_empty_for_a_fresh_store() {
    let dir = TempDir::new().unwrap();
    cli(&dir)
    .args(["pattern", "list", "--agent", "scout"])
    .assert()
    .success()
    .stdout(predicate::str::contains("no patterns"));
}

#[test]
fn pattern_add_then_list_round_trips() {
    let dir = TempDir::new().unwrap();
    let pattern = aml_test_utils::sample_pattern("scout", "react-opt");
    let file = write_json(&dir, "pattern.json", &pattern);

    cli(&dir)
    .args(["pattern", "add", "--agent", "scout", "--file"])
    .arg(&file)
    .assert()
    .success();

    cli(&dir)
    .args(["pattern", "list", "--agent", "scout"])
    .assert()
    .success()
    .stdout(predicate::str::contains("react-opt"));
}

#[test]
fn pattern_delete_of_unknown_id_reports_not_found() {
    let dir = TempDir::new().unwrap();
    cli(&dir)
    .args([
            "pattern",
            "delete",
            "--agent",
            "scout",
            "--id",
            "00000000-0000-0000-0000-000000000000",
    ])
    .assert()
    .failure()
    .stderr(predicate::str::contains("not found").or(predicate::str::contains("NotFound")));
}

#[test]
fn solution_add_then_list_round_trips() {
    let dir = TempDir::new().unwrap();
    let solution = aml_test_utils::sample_solution("scout", "npe-in-handler");
    let file = write_json(&dir, "solution.json", &solution);

    cli(&dir)
    .args(["solution", "add", "--agent", "scout", "--file"])
    .arg(&file)
    .assert()
    .success();

    cli(&dir)
    .args(["solution", "list", "--agent", "scout"])
    .assert()
    .success()
    .stdout(predicate::str::contains("npe-in-handler"));
}

#[test]
fn decision_add_then_list_round_trips() {
    let dir = TempDir::new().unwrap();
    let decision = aml_test_utils::sample_decision("scout", "retry vs fail-fast?");
    let file = write_json(&dir, "decision.json", &decision);

    cli(&dir)
    .args(["decision", "add", "--agent", "scout", "--file"])
    .arg(&file)
    .assert()
    .success();

    cli(&dir)
    .args(["decision", "list", "--agent", "scout"])
    .assert()
    .success()
    .stdout(predicate::str::contains("retry vs fail-fast?"));
}

#[test]
fn memory_export_reports_the_entities_just_added() {
    let dir = TempDir::new().unwrap();
    let pattern = aml_test_utils::sample_pattern("scout", "react-opt");
    let file = write_json(&dir, "pattern.json", &pattern);
    cli(&dir)
    .args(["pattern", "add", "--agent", "scout", "--file"])
    .arg(&file)
    .assert()
    .success();

    cli(&dir)
    .args(["memory", "export", "--agent", "scout"])
    .assert()
    .success()
    .stdout(predicate::str::contains("1 patterns"));
}

#[test]
fn health_report_is_available_for_an_empty_agent() {
    let dir = TempDir::new().unwrap();
    cli(&dir)
    .args(["health", "--agent", "scout"])
    .assert()
    .success()
    .stdout(predicate::str::contains("health_score"));
}

#[test]
fn config_validate_accepts_the_default_shape() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("aml.toml");
    std::fs::write(&path, "[storage]\npath = \"memory\"\n").unwrap();

    cli(&dir)
    .args(["config", "validate", "--file"])
    .arg(&path)
    .assert()
    .success()
    .stdout(predicate::str::contains("valid"));
}

#[test]
fn config_validate_rejects_a_non_positive_size_cap() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("aml.toml");
    std::fs::write(&path, "[storage]\nmaxSizeGb = -1.0\n").unwrap();

    cli(&dir)
    .args(["config", "validate", "--file"])
    .arg(&path)
    .assert()
    .success()
    .stdout(predicate::str::contains("invalid"));
}

#[test]
fn backup_list_is_empty_before_any_backup_is_taken() {
    let dir = TempDir::new().unwrap();
    cli(&dir)
    .args(["pattern", "list", "--agent", "scout"])
    .assert()
    .success();

    cli(&dir)
    .args(["backup", "list"])
    .assert()
    .success()
    .stdout(predicate::str::contains("no backups"));
}

#[test]
fn backup_create_then_list_shows_the_new_backup() {
    let dir = TempDir::new().unwrap();
    cli(&dir)
    .args(["pattern", "list", "--agent", "scout"])
    .assert()
    .success();

    cli(&dir)
    .args(["backup", "create", "--id", "snap-1"])
    .assert()
    .success()
    .stdout(predicate::str::contains("snap-1"));

    cli(&dir)
    .args(["backup", "list"])
    .assert()
    .success()
    .stdout(predicate::str::contains("snap-1"));
}
