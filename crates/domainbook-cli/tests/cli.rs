use assert_cmd::cargo::cargo_bin_cmd;
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::process::Output;
use tempfile::TempDir;

fn run_raw(table_path: &Path, args: &[&str]) -> Output {
    cargo_bin_cmd!("domainbook")
        .args(["--table-path", table_path.to_str().expect("table path")])
        .args(args)
        .env("XDG_CONFIG_HOME", table_path.parent().expect("parent"))
        .output()
        .expect("run command")
}

fn run_cmd(table_path: &Path, args: &[&str]) -> String {
    let output = run_raw(table_path, args);
    assert!(output.status.success(), "command failed: {:?}", output);
    String::from_utf8(output.stdout).expect("utf8")
}

fn run_cmd_json(table_path: &Path, args: &[&str]) -> Value {
    let mut full = vec!["--json"];
    full.extend_from_slice(args);
    let stdout = run_cmd(table_path, &full);
    serde_json::from_str(&stdout).expect("parse json")
}

#[test]
fn cli_add_list_export_delete_flow() {
    let temp = TempDir::new().expect("temp dir");
    let table_path = temp.path().join("contacts.csv");

    run_cmd(&table_path, &["add", "z.com", "B@Z.com "]);
    run_cmd(&table_path, &["add", "y.com", "a@y.com"]);
    run_cmd(&table_path, &["add", "z.com", "c@z.com"]);

    let domains = run_cmd_json(&table_path, &["domains"]);
    assert_eq!(domains, serde_json::json!(["y.com", "z.com"]));

    let emails = run_cmd_json(&table_path, &["emails", "z.com"]);
    assert_eq!(emails, serde_json::json!(["b@z.com", "c@z.com"]));

    let csv = run_cmd(&table_path, &["export"]);
    assert_eq!(
        csv,
        "Domain,Email\ny.com,\n,a@y.com\nz.com,\n,b@z.com\n,c@z.com\n"
    );

    run_cmd(&table_path, &["delete", "z.com", "b@z.com"]);
    let emails = run_cmd_json(&table_path, &["emails", "z.com"]);
    assert_eq!(emails, serde_json::json!(["c@z.com"]));
}

#[test]
fn cli_exit_codes_follow_error_kind() {
    let temp = TempDir::new().expect("temp dir");
    let table_path = temp.path().join("contacts.csv");

    let output = run_raw(&table_path, &["add", "foo.com", "x@bar.com"]);
    assert_eq!(output.status.code(), Some(3));
    let stderr = String::from_utf8(output.stderr).expect("utf8");
    assert!(stderr.contains("domain mismatch"), "stderr: {stderr}");

    run_cmd(&table_path, &["add", "bar.com", "x@bar.com"]);
    let output = run_raw(&table_path, &["add", "bar.com", "x@bar.com"]);
    assert_eq!(output.status.code(), Some(3));

    let output = run_raw(&table_path, &["delete", "bar.com", "missing@bar.com"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn cli_corrupt_table_is_a_failure() {
    let temp = TempDir::new().expect("temp dir");
    let table_path = temp.path().join("contacts.csv");
    fs::write(&table_path, "").expect("write");

    let output = run_raw(&table_path, &["domains"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn cli_export_and_backup_write_files() {
    let temp = TempDir::new().expect("temp dir");
    let table_path = temp.path().join("contacts.csv");
    let export_path = temp.path().join("emails.csv");
    let backup_path = temp.path().join("snapshot.csv");

    run_cmd(&table_path, &["add", "example.com", "ada@example.com"]);
    run_cmd(
        &table_path,
        &["export", "--out", export_path.to_str().expect("export path")],
    );
    assert_eq!(
        fs::read_to_string(&export_path).expect("read export"),
        "Domain,Email\nexample.com,\n,ada@example.com\n"
    );

    let report = run_cmd_json(
        &table_path,
        &["backup", "--out", backup_path.to_str().expect("backup path")],
    );
    assert!(report["size_bytes"].as_u64().expect("size") > 0);
    assert_eq!(
        fs::read_to_string(&backup_path).expect("read backup"),
        "Email\nada@example.com\n"
    );

    let output = run_raw(
        &table_path,
        &["export", "--out", table_path.to_str().expect("table path")],
    );
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn cli_export_refuses_aliased_table_path() {
    let temp = TempDir::new().expect("temp dir");
    let table_path = temp.path().join("contacts.csv");
    fs::create_dir(temp.path().join("sub")).expect("sub dir");
    run_cmd(&table_path, &["add", "example.com", "ada@example.com"]);

    let aliased = temp.path().join("sub").join("..").join("contacts.csv");
    let output = run_raw(
        &table_path,
        &["export", "--out", aliased.to_str().expect("aliased path")],
    );
    assert_eq!(output.status.code(), Some(3));
    let stderr = String::from_utf8(output.stderr).expect("utf8");
    assert!(stderr.contains("directory table"), "stderr: {stderr}");

    assert_eq!(
        fs::read_to_string(&table_path).expect("read table"),
        "Email\nada@example.com\n"
    );
    let emails = run_cmd_json(&table_path, &["emails", "example.com"]);
    assert_eq!(emails, serde_json::json!(["ada@example.com"]));
}

#[test]
fn cli_help_describes_every_subcommand() {
    let temp = TempDir::new().expect("temp dir");
    let help = run_cmd(&temp.path().join("contacts.csv"), &["--help"]);
    assert!(help.contains("Snapshot the directory table"), "help: {help}");
}

#[test]
fn cli_completions_need_an_existing_directory() {
    let temp = TempDir::new().expect("temp dir");
    let table_path = temp.path().join("contacts.csv");
    let missing = temp.path().join("missing");

    let output = run_raw(
        &table_path,
        &["completions", "bash", "--dir", missing.to_str().expect("dir")],
    );
    assert_eq!(output.status.code(), Some(3));

    let script = run_cmd(&table_path, &["completions", "bash"]);
    assert!(script.contains("domainbook"));
}
