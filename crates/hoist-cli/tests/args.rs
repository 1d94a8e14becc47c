use assert_cmd::cargo::cargo_bin_cmd;

mod common;

use common::only_report;

#[test]
fn missing_arguments_use_the_failure_channel() {
    let assert = cargo_bin_cmd!("hoist-install")
        .env_clear()
        .args(["--id", "app1"])
        .assert()
        .code(1);

    let report = only_report(&assert);
    let message = report["message"].as_str().expect("message");
    assert!(!message.is_empty());
    assert!(!message.starts_with("error:"), "{message}");
}

#[test]
fn help_prints_usage_and_succeeds() {
    let assert = cargo_bin_cmd!("hoist-install")
        .arg("--help")
        .assert()
        .success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout);
    assert!(stdout.contains("--runtime-version"), "{stdout}");
}
