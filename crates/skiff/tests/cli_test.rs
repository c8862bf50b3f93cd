#![allow(deprecated)] // TODO: cargo_bin → cargo_bin_cmd! へ移行

use assert_cmd::Command;
use predicates::prelude::*;

fn skiff() -> Command {
    Command::cargo_bin("skiff").unwrap()
}

/// CLIヘルプが正しく表示されることを確認
#[test]
fn test_cli_help() {
    skiff()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("build"))
        .stdout(predicate::str::contains("namespace"))
        .stdout(predicate::str::contains("login"));
}

/// バージョン表示が正しく動作することを確認
#[test]
fn test_cli_version() {
    skiff()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("skiff"));
}

/// buildコマンドのヘルプが正しく表示されることを確認
#[test]
fn test_build_help() {
    skiff()
        .arg("build")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("<PATH>"))
        .stdout(predicate::str::contains("--tag"))
        .stdout(predicate::str::contains("--target"))
        .stdout(predicate::str::contains("--no-cache"));
}

/// build は PATH が必須
#[test]
fn test_build_requires_path() {
    skiff()
        .arg("build")
        .assert()
        .failure()
        .stderr(predicate::str::contains("<PATH>"));
}

/// 不正なコマンドでエラーになることを確認
#[test]
fn test_invalid_command() {
    skiff().arg("invalid-command").assert().failure();
}

/// namespace create は名前が必須
#[test]
fn test_namespace_create_requires_name() {
    skiff().args(["namespace", "create"]).assert().failure();
}

/// 不正なネームスペース名は送信前に拒否される
#[test]
fn test_namespace_invalid_name() {
    let home = tempfile::tempdir().unwrap();
    skiff()
        .env("SKIFF_HOME", home.path())
        .args(["namespace", "create", "Bad_Name"])
        .assert()
        .failure();
}

/// 未ログインで namespace を操作するとエラー
#[test]
fn test_namespace_without_login() {
    let home = tempfile::tempdir().unwrap();
    skiff()
        .env("SKIFF_HOME", home.path())
        .args(["namespace", "delete", "team-a"])
        .assert()
        .failure();
}

/// login はトークンが必須
#[test]
fn test_login_requires_token() {
    let home = tempfile::tempdir().unwrap();
    skiff()
        .env("SKIFF_HOME", home.path())
        .env_remove("SKIFF_TOKEN")
        .args(["login", "--url", "https://cloud.example.com", "--user", "u"])
        .assert()
        .failure();
}

/// login でコンテキストが保存される
#[test]
fn test_login_saves_context() {
    let home = tempfile::tempdir().unwrap();
    skiff()
        .env("SKIFF_HOME", home.path())
        .args([
            "login",
            "--url",
            "https://cloud.example.com",
            "--token",
            "tok123",
            "--user",
            "homeuser",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("registry.cloud.example.com"));

    let saved = std::fs::read_to_string(home.path().join("context.json")).unwrap();
    assert!(saved.contains("\"userId\": \"homeuser\""));
}

/// 存在しないコンテキストでのビルドは失敗する
#[test]
fn test_build_missing_context() {
    let home = tempfile::tempdir().unwrap();
    skiff()
        .env("SKIFF_HOME", home.path())
        .args(["build", "/nonexistent/skiff-context"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ビルドコンテキストが見つかりません"));
}
