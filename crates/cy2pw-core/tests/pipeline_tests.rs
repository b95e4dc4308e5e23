//! Full-pipeline tests: parse → passes → print → postprocess → format, run
//! against the sample suites in `tests/fixtures`.

use cy2pw_core::{convert_source, ConversionResult, TransformOptions};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::{Path, PathBuf};

// ── Helpers ─────────────────────────────────────────────────────────────────

const FIXTURES_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../../tests/fixtures");

fn fixture_path(name: &str) -> PathBuf {
    Path::new(FIXTURES_DIR).join(name)
}

fn load_fixture(name: &str) -> String {
    fs::read_to_string(fixture_path(name))
        .unwrap_or_else(|e| panic!("Failed to read fixture {name}: {e}"))
}

fn convert(path: &str, text: &str) -> String {
    convert_with(path, text, &TransformOptions::default())
}

fn convert_with(path: &str, text: &str, options: &TransformOptions) -> String {
    match convert_source(Path::new(path), text, options) {
        ConversionResult::Success { text } => text,
        ConversionResult::Failure {
            message,
            line,
            column,
        } => panic!("conversion of {path} failed at {line}:{column}: {message}"),
    }
}

fn compact(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

// ── Step definitions ────────────────────────────────────────────────────────

#[test]
fn test_cucumber_fixture_gets_explicit_page_and_harness() {
    let out = convert("homepage.step.js", &load_fixture("cucumber/homepage.step.js"));
    let flat = compact(&out);

    assert!(out.contains("require('@cucumber/cucumber')"), "{out}");
    assert!(out.contains("require('@playwright/test')"), "{out}");
    assert!(!out.contains("import {"), "{out}");
    assert!(out.contains("let page, browser, context;"), "{out}");

    assert!(flat.contains("Given('UsernavigatestotheBrowserstackHomepage',async({page})=>"), "{out}");
    assert_eq!(flat.matches("asyncfunction({page})").count(), 5, "{out}");
    assert!(out.contains("await page.goto('https://www.browserstack.com/')"), "{out}");

    // The fixture's own `After` hook is kept and no second one is added.
    assert_eq!(out.matches("Before(").count(), 1, "{out}");
    assert_eq!(out.matches("After(").count(), 1, "{out}");
}

#[test]
fn test_receiver_becomes_context_parameter() {
    let out = convert("world.steps.ts", &load_fixture("cucumber/world.steps.ts"));
    let flat = compact(&out);

    assert!(flat.contains("Given('afresharticlestore',asyncfunction(context:World)"), "{out}");
    assert!(flat.contains("asyncfunction(context:World):contextisWorld"), "{out}");
    assert!(flat.contains("Array<typeofcontext>"), "{out}");
    assert!(flat.contains("context.lastSavedArticle=null"), "{out}");
    assert!(!out.contains("this"), "{out}");

    // TypeScript source: import form. The existing cucumber import binds only
    // the step verbs, so the hooks the harness calls get their own import.
    assert!(out.contains("import { chromium, test, expect } from '@playwright/test';"), "{out}");
    assert!(out.contains("import { Given, Then } from '@cucumber/cucumber';"), "{out}");
    assert!(out.contains("import { Before, After } from '@cucumber/cucumber';"), "{out}");
    assert_eq!(out.matches("Before(").count(), 1, "{out}");
    assert_eq!(out.matches("After(").count(), 1, "{out}");
    assert!(!out.contains("require("), "{out}");
}

#[test]
fn test_single_step_conversion() {
    let out = convert(
        "steps.js",
        "Given('x', async function () { await page.goto('/'); });\n",
    );
    let flat = compact(&out);
    assert!(flat.contains("Given('x',asyncfunction({page}){awaitpage.goto('/');});"), "{out}");
    assert_eq!(out.matches("Before(").count(), 1);
    assert_eq!(out.matches("After(").count(), 1);
    assert!(out.find("Before(").unwrap() < out.find("Given(").unwrap());
    assert!(out.find("After(").unwrap() > out.find("Given(").unwrap());
}

#[test]
fn test_flatten_bdd() {
    let options = TransformOptions {
        preserve_bdd: false,
        ..TransformOptions::default()
    };
    let out = convert_with(
        "steps.js",
        "Given('x', async function () { await page.goto('/'); });\n",
        &options,
    );
    assert!(compact(&out).contains("test('x',asyncfunction({page})"), "{out}");
    assert!(!out.contains("Given"), "{out}");
}

#[test]
fn test_partial_imports_completed_for_harness() {
    let out = convert(
        "steps.ts",
        "import { Given } from '@cucumber/cucumber';\nimport { expect } from '@playwright/test';\nGiven('x', async function () { await page.goto('/'); });\n",
    );
    assert!(out.contains("import { Before, After } from '@cucumber/cucumber';"), "{out}");
    assert!(out.contains("import { chromium } from '@playwright/test';"), "{out}");
    assert!(out.contains("chromium.launch("), "{out}");
    assert_eq!(convert("steps.ts", &out), out);
}

// ── Commands ────────────────────────────────────────────────────────────────

#[test]
fn test_commands_fixture_become_exported_functions() {
    let out = convert("command.cy.js", &load_fixture("commands/command.cy.js"));
    let flat = compact(&out);

    assert!(flat.contains("exportasyncfunctionclickLink(page,label){"), "{out}");
    assert!(
        flat.contains("exportasyncfunctiondownloadFile(page,url,directory,fileName){"),
        "{out}"
    );
    // Nested callbacks inherit the handle instead of receiving their own.
    assert!(flat.contains(".then((cookies)=>"), "{out}");
    assert!(out.contains("// Download a file"), "{out}");
    assert!(!out.contains("Cypress.Commands"), "{out}");
    // No step declarations, so no harness.
    assert!(!out.contains("Before("), "{out}");
}

#[test]
fn test_login_command() {
    let out = convert(
        "commands.js",
        "Cypress.Commands.add('login', (user) => {\n  cy.get('#user').type(user);\n});\n",
    );
    assert!(
        compact(&out).contains("exportasyncfunctionlogin(page,user){cy.get('#user').type(user);}"),
        "{out}"
    );
}

// ── Other sources ───────────────────────────────────────────────────────────

#[test]
fn test_plain_typescript_only_formatted() {
    let out = convert("interface.ts", &load_fixture("interface/interface.ts"));
    assert!(out.contains("export interface World {"), "{out}");
    assert!(out.contains("const oldVar: string = 'Hello, world!';"), "{out}");
    assert!(compact(&out).contains("constadd=(a:number,b:number):number=>{"), "{out}");
}

#[test]
fn test_unbalanced_braces_fail_with_location() {
    let text = load_fixture("broken/unbalanced.cy.js");
    match convert_source(Path::new("unbalanced.cy.js"), &text, &TransformOptions::default()) {
        ConversionResult::Failure { line, message, .. } => {
            assert!(line >= 1);
            assert!(!message.is_empty());
        }
        other => panic!("expected failure, got {other:?}"),
    }
}

// ── Idempotence ─────────────────────────────────────────────────────────────

#[test]
fn test_pipeline_idempotent_on_own_output() {
    let cases = [
        ("homepage.step.js", "cucumber/homepage.step.js"),
        ("world.steps.ts", "cucumber/world.steps.ts"),
        ("command.cy.js", "commands/command.cy.js"),
        ("interface.ts", "interface/interface.ts"),
    ];
    for (path, fixture) in cases {
        let once = convert(path, &load_fixture(fixture));
        let twice = convert(path, &once);
        assert_eq!(once, twice, "second conversion of {fixture} changed the output");
    }
}
