use assert_cmd::Command;
use predicates::{prelude::PredicateBooleanExt, str::contains};

/// Each test gets its own fake HOME so settings and the database land in
/// a throwaway directory.
fn penny(home: &tempfile::TempDir) -> Command {
    let mut cmd = Command::cargo_bin("penny").expect("binary exists");
    cmd.env("HOME", home.path());
    cmd
}

fn init(home: &tempfile::TempDir) {
    let data_dir = home.path().join("books");
    penny(home)
        .args(["init", "--data-dir", data_dir.to_str().unwrap()])
        .assert()
        .success()
        .stdout(contains("Initialized"));
}

#[test]
fn init_seeds_default_accounts() {
    let home = tempfile::tempdir().unwrap();
    init(&home);
    penny(&home)
        .args(["accounts", "list"])
        .assert()
        .success()
        .stdout(contains("Checking").and(contains("Salary")));
}

#[test]
fn commands_fail_before_init() {
    let home = tempfile::tempdir().unwrap();
    penny(&home)
        .args(["accounts", "list"])
        .assert()
        .failure()
        .stderr(contains("penny init"));
}

#[test]
fn record_resolve_and_report() {
    let home = tempfile::tempdir().unwrap();
    init(&home);

    penny(&home)
        .args([
            "tx", "add", "--account", "Checking", "--amount", "2500", "--date", "2025-01-15",
            "--description", "January paycheck",
        ])
        .assert()
        .success();

    penny(&home)
        .args([
            "entry", "--tx", "1", "--debit", "Checking:2500", "--credit", "Salary:2500",
        ])
        .assert()
        .success()
        .stdout(contains("Saved journal entry"));

    penny(&home)
        .args(["report", "income", "--from", "2025-01-01", "--to", "2025-01-31"])
        .assert()
        .success()
        .stdout(contains("Salary").and(contains("$2,500.00")));

    penny(&home)
        .args(["status"])
        .assert()
        .success()
        .stdout(contains("Journal entries: 1"));
}

#[test]
fn unbalanced_entry_is_rejected() {
    let home = tempfile::tempdir().unwrap();
    init(&home);

    penny(&home)
        .args([
            "tx", "add", "--account", "Checking", "--amount", "100", "--date", "2025-01-15",
            "--description", "odd deposit",
        ])
        .assert()
        .success();

    penny(&home)
        .args(["entry", "--tx", "1", "--debit", "Checking:100", "--credit", "Salary:90"])
        .assert()
        .failure()
        .stderr(contains("Validation"));
}
