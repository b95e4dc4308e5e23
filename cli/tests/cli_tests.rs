//! CLI binary integration tests using assert_cmd + predicates.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const FIXTURES_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../tests/fixtures");

#[allow(deprecated)]
fn cmd() -> Command {
    Command::cargo_bin("cy2pw").expect("binary should exist")
}

fn write(path: &Path, text: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, text).unwrap();
}

// ── Convert a tree ──────────────────────────────────────────────────────────

#[test]
fn test_convert_directory() {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("cypress");
    let dst = dir.path().join("playwright");
    fs::create_dir_all(src.join("support")).unwrap();
    fs::copy(
        Path::new(FIXTURES_DIR).join("commands/command.cy.js"),
        src.join("support/commands.js"),
    )
    .unwrap();
    fs::copy(
        Path::new(FIXTURES_DIR).join("cucumber/homepage.step.js"),
        src.join("homepage.step.js"),
    )
    .unwrap();

    cmd()
        .current_dir(dir.path())
        .args(["cypress", "playwright"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Converted"));

    let commands = fs::read_to_string(dst.join("support/commands.js")).unwrap();
    assert!(commands.contains("export async function clickLink(page, label)"), "{commands}");
    let steps = fs::read_to_string(dst.join("homepage.step.js")).unwrap();
    assert!(steps.contains("let page, browser, context;"), "{steps}");
}

#[test]
fn test_filetype_filter() {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("cypress");
    let dst = dir.path().join("playwright");
    write(&src.join("a.cy.js"), "cy.visit('/');\n");
    write(&src.join("b.cy.ts"), "cy.visit('/');\n");

    cmd()
        .args([src.to_str().unwrap(), dst.to_str().unwrap()])
        .args(["--filetype", ".ts"])
        .args(["--project-root", dir.path().to_str().unwrap()])
        .assert()
        .success();

    assert!(dst.join("b.cy.ts").exists());
    assert!(!dst.join("a.cy.js").exists());
}

#[test]
fn test_unparseable_file_copied() {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("cypress");
    let dst = dir.path().join("playwright");
    let broken = fs::read_to_string(Path::new(FIXTURES_DIR).join("broken/unbalanced.cy.js")).unwrap();
    write(&src.join("broken.cy.js"), &broken);

    cmd()
        .args([src.to_str().unwrap(), dst.to_str().unwrap()])
        .args(["--project-root", dir.path().to_str().unwrap()])
        .assert()
        .success()
        .stderr(predicate::str::contains("Copied"));

    assert_eq!(fs::read_to_string(dst.join("broken.cy.js")).unwrap(), broken);
}

#[test]
fn test_flatten_bdd_option() {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("cypress");
    let dst = dir.path().join("playwright");
    write(
        &src.join("steps.js"),
        "Given('x', async function () { await page.goto('/'); });\n",
    );

    cmd()
        .args([src.to_str().unwrap(), dst.to_str().unwrap()])
        .args(["--preserve-bdd", "false"])
        .args(["--project-root", dir.path().to_str().unwrap()])
        .assert()
        .success();

    let out = fs::read_to_string(dst.join("steps.js")).unwrap();
    assert!(out.contains("test('x'"), "{out}");
}

// ── Config conversion ───────────────────────────────────────────────────────

#[test]
fn test_config_conversion() {
    let dir = TempDir::new().unwrap();
    write(&dir.path().join("cypress/a.cy.js"), "cy.visit('/');\n");
    write(
        &dir.path().join("cypress.config.ts"),
        "import { defineConfig } from 'cypress';\n\nexport default defineConfig({ e2e: { baseUrl: 'http://localhost:4200' } });\n",
    );

    cmd()
        .current_dir(dir.path())
        .args(["cypress", "playwright", "--skip-config", "false"])
        .assert()
        .success();

    let config = fs::read_to_string(dir.path().join("playwright.config.ts")).unwrap();
    assert!(config.contains("baseURL: 'http://localhost:4200'"), "{config}");
    assert!(config.contains("testDir: './playwright'"), "{config}");
}

#[test]
fn test_skip_config_by_default() {
    let dir = TempDir::new().unwrap();
    write(&dir.path().join("cypress/a.cy.js"), "cy.visit('/');\n");
    write(&dir.path().join("cypress.json"), "{}");

    cmd()
        .current_dir(dir.path())
        .args(["cypress", "playwright"])
        .assert()
        .success();

    assert!(!dir.path().join("playwright.config.js").exists());
}

// ── Errors ──────────────────────────────────────────────────────────────────

#[test]
fn test_missing_source() {
    let dir = TempDir::new().unwrap();
    cmd()
        .current_dir(dir.path())
        .args(["does-not-exist", "out"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to migrate"));
}

#[test]
fn test_missing_arguments() {
    cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_help() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--filetype"))
        .stdout(predicate::str::contains("--skip-config"));
}
