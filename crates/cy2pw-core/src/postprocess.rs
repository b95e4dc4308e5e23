//! Text postprocessors.
//!
//! These run on printed output, after every tree pass. Each one checks for
//! its own output before inserting anything, so applying the chain to text it
//! already produced changes nothing.
//!
//! Order:
//! 1. [`HarnessInjector`]: cucumber/Playwright imports, shared bindings and
//!    browser lifecycle hooks for step-definition files
//! 2. [`LegacyCommandBlocks`]: regex fallback for command registrations the
//!    tree pass did not convert. Must stay last.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::debug;

use crate::detect::{has_step_keyword, is_identifier_name, uses_hook_keyword, HookKind, EXECUTION_HANDLE};
use crate::source::{ModuleStyle, SourceUnit};

/// A `(text, unit) -> text` transformation applied after printing.
pub trait TextPostprocessor {
    fn name(&self) -> &str;

    /// Whether the postprocessor writes parameter lists. Those that do only
    /// ever prepend the execution-context handle.
    fn mutates_params(&self) -> bool {
        false
    }

    fn apply(&self, text: &str, unit: &SourceUnit) -> String;
}

/// The postprocessors every conversion runs, in order.
pub fn default_chain() -> Vec<Box<dyn TextPostprocessor>> {
    vec![Box::new(HarnessInjector), Box::new(LegacyCommandBlocks)]
}

// ---------------------------------------------------------------------------
// Harness injection
// ---------------------------------------------------------------------------

const CUCUMBER_MODULE: &str = "@cucumber/cucumber";
const PLAYWRIGHT_MODULE: &str = "@playwright/test";

const CUCUMBER_IMPORT: &str =
    "import { Given, When, Then, Before, After, setDefaultTimeout } from '@cucumber/cucumber';";
const CUCUMBER_REQUIRE: &str =
    "const { Given, When, Then, Before, After, setDefaultTimeout } = require('@cucumber/cucumber');";
const PLAYWRIGHT_IMPORT: &str = "import { chromium, test, expect } from '@playwright/test';";
const PLAYWRIGHT_REQUIRE: &str = "const { chromium, test, expect } = require('@playwright/test');";

/// Hooks the harness calls, whether injected or already present.
const CUCUMBER_HOOKS: &[&str] = &[HookKind::Setup.keyword(), HookKind::Teardown.keyword()];
const BROWSER_LAUNCHER: &str = "chromium";

const HARNESS_BINDINGS: &str = "let page, browser, context;";

const SETUP_HOOK: &str = "\
Before(async function () {
  browser = await chromium.launch({ headless: false });
  context = await browser.newContext();
  page = await context.newPage();
});";

const TEARDOWN_HOOK: &str = "\
After(async () => {
  await browser.close();
});";

static BINDINGS_DECL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*let\s+page\s*,\s*browser\s*,\s*context\s*;")
        .expect("bindings regex is valid")
});

static NAMED_IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\bimport\s+(?:[\w$]+\s*,\s*)?\{([^}]*)\}\s*from\s*['"]([^'"]+)['"]"#)
        .expect("named import regex is valid")
});

static NAMED_REQUIRE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"\b(?:const|let|var)\s*\{([^}]*)\}\s*=\s*require\(\s*['"]([^'"]+)['"]\s*\)"#,
    )
    .expect("named require regex is valid")
});

/// Adds the browser harness to step-definition files.
///
/// Prepends (after any leading comment block such as a license header) the
/// cucumber and Playwright imports in the file's module style, the shared
/// `page`/`browser`/`context` bindings and a `Before` hook that opens a page.
/// Appends an `After` hook that closes the browser. Each piece is skipped when
/// the file already has it. A file that already imports from one of the two
/// modules gets a second import for just the hook and launcher names its own
/// import leaves unbound.
#[derive(Debug, Default, Clone, Copy)]
pub struct HarnessInjector;

impl TextPostprocessor for HarnessInjector {
    fn name(&self) -> &str {
        "harness-injection"
    }

    fn apply(&self, text: &str, unit: &SourceUnit) -> String {
        if !has_step_keyword(text) {
            return text.to_string();
        }

        let style = unit.module_style;
        let setup = !uses_hook_keyword(text, HookKind::Setup);
        let teardown = !uses_hook_keyword(text, HookKind::Teardown);

        let mut prelude = Vec::new();
        let cucumber = match bound_names(text, CUCUMBER_MODULE) {
            None => Some(full_import(style, CUCUMBER_IMPORT, CUCUMBER_REQUIRE)),
            Some(bound) => missing_import(style, CUCUMBER_MODULE, CUCUMBER_HOOKS, &bound),
        };
        prelude.extend(cucumber);
        let launcher: &[&str] = if setup || text.contains("chromium.") {
            &[BROWSER_LAUNCHER]
        } else {
            &[]
        };
        let playwright = match bound_names(text, PLAYWRIGHT_MODULE) {
            None => Some(full_import(style, PLAYWRIGHT_IMPORT, PLAYWRIGHT_REQUIRE)),
            Some(bound) => missing_import(style, PLAYWRIGHT_MODULE, launcher, &bound),
        };
        prelude.extend(playwright);
        if !BINDINGS_DECL.is_match(text) {
            prelude.push(HARNESS_BINDINGS.to_string());
        }
        if setup {
            prelude.push(SETUP_HOOK.to_string());
        }

        if prelude.is_empty() && !teardown {
            return text.to_string();
        }
        debug!(path = %unit.path.display(), pieces = prelude.len(), teardown, "injecting harness");

        let (header, body) = text.split_at(header_len(text));
        let mut out = String::with_capacity(text.len() + 512);
        out.push_str(header);
        for piece in prelude {
            out.push_str(&piece);
            out.push_str("\n\n");
        }
        out.push_str(body.trim_start_matches('\n').trim_end());
        out.push('\n');
        if teardown {
            out.push('\n');
            out.push_str(TEARDOWN_HOOK);
            out.push('\n');
        }
        out
    }
}

fn full_import(style: ModuleStyle, import: &str, require: &str) -> String {
    match style {
        ModuleStyle::Import => import.to_string(),
        ModuleStyle::Require => require.to_string(),
    }
}

/// An import of the `required` names that `bound` lacks, if any.
fn missing_import(
    style: ModuleStyle,
    module: &str,
    required: &[&str],
    bound: &[String],
) -> Option<String> {
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|name| !bound.iter().any(|b| b == *name))
        .collect();
    if missing.is_empty() {
        return None;
    }
    let names = missing.join(", ");
    Some(match style {
        ModuleStyle::Import => format!("import {{ {names} }} from '{module}';"),
        ModuleStyle::Require => format!("const {{ {names} }} = require('{module}');"),
    })
}

/// Local names bound by named imports or destructured requires of `module`.
/// `None` when the text has no such statement at all.
fn bound_names(text: &str, module: &str) -> Option<Vec<String>> {
    let mut found = false;
    let mut names = Vec::new();
    for pattern in [&*NAMED_IMPORT, &*NAMED_REQUIRE] {
        for caps in pattern.captures_iter(text) {
            if &caps[2] != module {
                continue;
            }
            found = true;
            names.extend(caps[1].split(',').filter_map(local_name));
        }
    }
    found.then_some(names)
}

/// `a`, `a as b`, `a: b` and `a = x` all bind the last name before any default.
fn local_name(specifier: &str) -> Option<String> {
    let specifier = specifier.split('=').next()?;
    let local = specifier
        .rsplit([':', ' '])
        .map(str::trim)
        .find(|part| !part.is_empty())?;
    is_identifier_name(local).then(|| local.to_string())
}

/// Length of the leading comment block, including the line break after it.
fn header_len(text: &str) -> usize {
    let mut pos = 0;
    loop {
        let rest = &text[pos..];
        let trimmed = rest.trim_start();
        let offset = pos + (rest.len() - trimmed.len());

        let comment_end = if trimmed.starts_with("//") {
            Some(trimmed.find('\n').map_or(trimmed.len(), |nl| nl + 1))
        } else if trimmed.starts_with("/*") {
            trimmed.find("*/").map(|close| close + 2)
        } else {
            None
        };

        match comment_end {
            Some(len) => pos = offset + len,
            None => break,
        }
    }
    if pos > 0 && text[pos..].starts_with('\n') {
        pos += 1;
    }
    pos
}

// ---------------------------------------------------------------------------
// Legacy command blocks
// ---------------------------------------------------------------------------

static LEGACY_COMMAND: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"Cypress\.Commands\.add\(\s*(?:'([^']+)'|"([^"]+)")\s*,\s*(?:async\s*)?\(([^)]*)\)\s*=>\s*\{([\s\S]+?)\n\}\s*\)\s*;?"#,
    )
    .expect("legacy command regex is valid")
});

/// Rewrites `Cypress.Commands.add('name', (params) => { body })` blocks whose
/// closing brace starts a line into `export async function name(page, params)`.
///
/// The tree pass converts well-formed registrations already; this catches
/// the ones it left (e.g. produced by an extension pass).
#[derive(Debug, Default, Clone, Copy)]
pub struct LegacyCommandBlocks;

impl TextPostprocessor for LegacyCommandBlocks {
    fn name(&self) -> &str {
        "legacy-command-blocks"
    }

    fn mutates_params(&self) -> bool {
        true
    }

    fn apply(&self, text: &str, _unit: &SourceUnit) -> String {
        LEGACY_COMMAND
            .replace_all(text, |caps: &Captures<'_>| {
                let name = caps
                    .get(1)
                    .or_else(|| caps.get(2))
                    .map_or("", |m| m.as_str());
                if !is_identifier_name(name) {
                    return caps[0].to_string();
                }
                let params = caps.get(3).map_or("", |m| m.as_str().trim());
                let body = caps.get(4).map_or("", |m| m.as_str());
                format!(
                    "export async function {name}({}) {{{body}\n}}",
                    with_handle(params)
                )
            })
            .into_owned()
    }
}

/// `params` with the handle prepended, unless it already leads.
fn with_handle(params: &str) -> String {
    let first = params
        .split(',')
        .next()
        .and_then(|param| param.split([':', '=']).next())
        .map(str::trim)
        .unwrap_or_default();
    if params.is_empty() {
        EXECUTION_HANDLE.to_string()
    } else if first == EXECUTION_HANDLE {
        params.to_string()
    } else {
        format!("{EXECUTION_HANDLE}, {params}")
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn unit(path: &str, text: &str) -> SourceUnit {
        SourceUnit::new(path, text)
    }

    // ── Harness injection ────────────────────────────────────────────────

    #[test]
    fn test_harness_require_form() {
        let text = "Given('x', async function ({ page }) {\n    await page.goto('/');\n});\n";
        let out = HarnessInjector.apply(text, &unit("steps.js", text));
        assert!(out.starts_with(CUCUMBER_REQUIRE), "{out}");
        assert!(out.contains(PLAYWRIGHT_REQUIRE), "{out}");
        assert!(!out.contains("import {"), "{out}");
        assert_eq!(out.matches("Before(").count(), 1);
        assert!(out.trim_end().ends_with(TEARDOWN_HOOK), "{out}");
    }

    #[test]
    fn test_harness_import_form() {
        let text = "Given('x', async () => {});\n";
        let out = HarnessInjector.apply(text, &unit("steps.ts", text));
        assert!(out.starts_with(CUCUMBER_IMPORT), "{out}");
        assert!(out.contains(PLAYWRIGHT_IMPORT), "{out}");
        assert!(!out.contains("require("), "{out}");
    }

    #[test]
    fn test_harness_after_license_header() {
        let text = "/**\n * Licensed under MIT.\n */\n// steps\nGiven('x', async () => {});\n";
        let out = HarnessInjector.apply(text, &unit("steps.ts", text));
        assert!(out.starts_with("/**\n * Licensed under MIT.\n */\n// steps\n"), "{out}");
        let header_end = out.find("// steps\n").unwrap() + "// steps\n".len();
        assert!(out[header_end..].starts_with(CUCUMBER_IMPORT), "{out}");
    }

    #[test]
    fn test_harness_keeps_existing_hooks() {
        let text = "Before(async () => {});\nWhen('x', async () => {});\nAfter(async function () {\n    await browser.close();\n});\n";
        let out = HarnessInjector.apply(text, &unit("steps.js", text));
        assert_eq!(out.matches("Before(").count(), 1);
        assert_eq!(out.matches("After(").count(), 1);
        assert!(out.contains(HARNESS_BINDINGS), "{out}");
    }

    #[test]
    fn test_harness_stable_regardless_of_step_count() {
        let one = "Given('a', async () => {});\n";
        let many = "Given('a', async () => {});\nWhen('b', async () => {});\nThen('c', async () => {});\n";
        for text in [one, many] {
            let out = HarnessInjector.apply(text, &unit("steps.js", text));
            assert_eq!(out.matches("Before(").count(), 1);
            assert_eq!(out.matches("After(").count(), 1);
            assert_eq!(out.matches(HARNESS_BINDINGS).count(), 1);
        }
    }

    #[test]
    fn test_harness_idempotent() {
        let text = "Given('x', async () => {});\n";
        let once = HarnessInjector.apply(text, &unit("steps.js", text));
        let twice = HarnessInjector.apply(&once, &unit("steps.js", &once));
        assert_eq!(once, twice);
    }

    #[test]
    fn test_harness_binds_hooks_missing_from_existing_imports() {
        let text = "import { Given } from '@cucumber/cucumber';\nimport { expect } from '@playwright/test';\nGiven('x', async function ({ page }) {\n  await page.goto('/');\n});\n";
        let out = HarnessInjector.apply(text, &unit("steps.ts", text));
        assert!(out.contains("import { Before, After } from '@cucumber/cucumber';"), "{out}");
        assert!(out.contains("import { chromium } from '@playwright/test';"), "{out}");
        assert!(out.contains(SETUP_HOOK), "{out}");

        let bound = bound_names(&out, CUCUMBER_MODULE).unwrap();
        assert!(bound.iter().any(|name| name == "Before"));
        assert!(bound.iter().any(|name| name == "After"));

        let twice = HarnessInjector.apply(&out, &unit("steps.ts", &out));
        assert_eq!(out, twice);
    }

    #[test]
    fn test_harness_require_with_renamed_binding() {
        let text = "const { Given, After: afterHook } = require('@cucumber/cucumber');\nGiven('x', async () => {});\n";
        let out = HarnessInjector.apply(text, &unit("steps.js", text));
        assert!(out.contains("const { Before, After } = require('@cucumber/cucumber');"), "{out}");
        assert!(out.contains(PLAYWRIGHT_REQUIRE), "{out}");
    }

    #[test]
    fn test_harness_no_launcher_import_for_own_setup_hook() {
        let text = "import { Before, After, Given } from '@cucumber/cucumber';\nimport { test } from '@playwright/test';\nBefore(async () => {});\nGiven('x', async () => {});\nAfter(async () => {});\n";
        let out = HarnessInjector.apply(text, &unit("steps.ts", text));
        assert!(!out.contains("chromium"), "{out}");
        assert_eq!(out.matches("@cucumber/cucumber").count(), 1, "{out}");
        assert!(out.contains(HARNESS_BINDINGS), "{out}");
    }

    #[test]
    fn test_bound_names() {
        let text = "import def, {\n  Given,\n  When as when,\n} from \"@cucumber/cucumber\";\nimport { x } from './other';";
        assert_eq!(
            bound_names(text, CUCUMBER_MODULE),
            Some(vec!["Given".to_string(), "when".to_string()])
        );
        assert_eq!(bound_names(text, PLAYWRIGHT_MODULE), None);
    }

    #[test]
    fn test_harness_skips_files_without_steps() {
        let text = "const label = 'Given a user';\n";
        assert_eq!(HarnessInjector.apply(text, &unit("a.js", text)), text);
    }

    #[test]
    fn test_header_len() {
        assert_eq!(header_len("code();"), 0);
        assert_eq!(header_len("// a\n// b\ncode();"), 10);
        assert_eq!(header_len("/* a */\n\ncode();"), 8);
    }

    // ── Legacy command blocks ────────────────────────────────────────────

    #[test]
    fn test_legacy_command_either_quote() {
        let text = "Cypress.Commands.add(\"login\", async (user, pass) => {\n  cy.get(user);\n});\nCypress.Commands.add('logout', () => {\n  cy.clearCookies();\n})";
        let out = LegacyCommandBlocks.apply(text, &unit("c.js", text));
        assert!(out.contains("export async function login(page, user, pass) {\n  cy.get(user);\n}"), "{out}");
        assert!(out.contains("export async function logout(page) {\n  cy.clearCookies();\n}"), "{out}");
        assert!(!out.contains("Commands"), "{out}");
    }

    #[test]
    fn test_legacy_command_handle_not_duplicated() {
        let text = "Cypress.Commands.add('open', (page, url) => {\n  page.goto(url);\n});";
        let out = LegacyCommandBlocks.apply(text, &unit("c.js", text));
        assert!(out.contains("export async function open(page, url) {"), "{out}");
    }

    #[test]
    fn test_legacy_command_invalid_name_unchanged() {
        let text = "Cypress.Commands.add('log-in', () => {\n  cy.get('a');\n});";
        assert_eq!(LegacyCommandBlocks.apply(text, &unit("c.js", text)), text);
    }

    #[test]
    fn test_legacy_command_no_match_unchanged() {
        let text = "export async function login(page) {\n}\n";
        assert_eq!(LegacyCommandBlocks.apply(text, &unit("c.js", text)), text);
    }
}
