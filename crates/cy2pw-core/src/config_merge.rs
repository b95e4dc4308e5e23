//! Cypress config → Playwright config.
//!
//! The Cypress config is read from the first of `cypress.config.ts`,
//! `cypress.config.js` and `cypress.json` in the project root. Script configs
//! are never executed: the exported object literal is found in the syntax
//! tree and evaluated statically. Anything that is not a literal (function
//! calls, most identifiers, `process.env.X`) reads as `undefined` and is
//! dropped, with two exceptions kept for compatibility with generated
//! Playwright configs: `process.env.CI` reads as `'CI'` and `devices[...]`
//! as `{}`.
//!
//! The mapped fields are merged over an existing `playwright.config.*` (read
//! the same way), and caller overrides over both. The `use` sub-object is
//! merged on its own with the same precedence.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use swc_core::ecma::ast::{
    AssignExpr, AssignOp, AssignTarget, BinExpr, BinaryOp, CallExpr, Callee, CondExpr, Decl,
    ExportDefaultExpr, Expr, Lit, MemberExpr, MemberProp, Module, ModuleDecl, ModuleItem, Pat,
    Prop, PropName, PropOrSpread, SimpleAssignTarget, Stmt, Tpl, UnaryExpr, UnaryOp,
};
use tracing::{info, warn};

use crate::config::{Dialect, FormatOptions};
use crate::error::ConfigError;
use crate::format::Formatter;
use crate::syntax;

/// Cypress config files, in lookup order.
pub const CYPRESS_CONFIG_FILES: &[&str] = &["cypress.config.ts", "cypress.config.js", "cypress.json"];

/// Playwright config files, in lookup order.
pub const PLAYWRIGHT_CONFIG_FILES: &[&str] = &["playwright.config.ts", "playwright.config.js"];

/// Sub-object of the Cypress config consulted when a field is missing at the top level.
const E2E_SECTION: &str = "e2e";

/// Playwright's shared per-test options object.
const USE_SECTION: &str = "use";

// ---------------------------------------------------------------------------
// Field mapping
// ---------------------------------------------------------------------------

/// How a Cypress value turns into a Playwright value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Translation {
    /// Copied when present, omitted otherwise.
    Copy,
    /// Copied when it is a number, `default` otherwise.
    NumberOr(i64),
    /// `true` exactly when the source is the literal `false`.
    IsFalse,
    /// `'on'` when the source is truthy, `'off'` otherwise.
    OnOff,
}

/// One row of the Cypress → Playwright field table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldRule {
    pub source: &'static str,
    /// Path below the top-level object.
    pub target: &'static [&'static str],
    pub translation: Translation,
}

pub const FIELD_RULES: &[FieldRule] = &[
    FieldRule {
        source: "baseUrl",
        target: &[USE_SECTION, "baseURL"],
        translation: Translation::Copy,
    },
    FieldRule {
        source: "viewportWidth",
        target: &[USE_SECTION, "viewport", "width"],
        translation: Translation::NumberOr(1280),
    },
    FieldRule {
        source: "viewportHeight",
        target: &[USE_SECTION, "viewport", "height"],
        translation: Translation::NumberOr(720),
    },
    // Per-action timeout, not Playwright's whole-test `use.timeout`.
    FieldRule {
        source: "defaultCommandTimeout",
        target: &[USE_SECTION, "actionTimeout"],
        translation: Translation::NumberOr(10_000),
    },
    FieldRule {
        source: "video",
        target: &[USE_SECTION, "headless"],
        translation: Translation::IsFalse,
    },
    FieldRule {
        source: "screenshotOnRunFailure",
        target: &[USE_SECTION, "trace"],
        translation: Translation::OnOff,
    },
];

/// Look up a Cypress field, falling back to the `e2e` section.
fn cypress_field<'a>(cypress: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    cypress
        .get(key)
        .or_else(|| cypress.get(E2E_SECTION)?.as_object()?.get(key))
        .filter(|value| !value.is_null())
}

impl Translation {
    fn apply(self, value: Option<&Value>) -> Option<Value> {
        match self {
            Translation::Copy => value.cloned(),
            Translation::NumberOr(default) => Some(
                value
                    .filter(|value| value.is_number())
                    .cloned()
                    .unwrap_or_else(|| Value::from(default)),
            ),
            Translation::IsFalse => Some(Value::Bool(value == Some(&Value::Bool(false)))),
            Translation::OnOff => Some(Value::from(if truthy(value) { "on" } else { "off" })),
        }
    }
}

/// Apply [`FIELD_RULES`] to a Cypress config object.
pub fn map_fields(cypress: &Map<String, Value>) -> Map<String, Value> {
    let mut mapped = Map::new();
    for rule in FIELD_RULES {
        if let Some(value) = rule.translation.apply(cypress_field(cypress, rule.source)) {
            insert_path(&mut mapped, rule.target, value);
        }
    }
    mapped
}

fn insert_path(object: &mut Map<String, Value>, path: &[&str], value: Value) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };
    let mut current = object;
    for key in parents {
        let entry = current
            .entry(key.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        let Value::Object(next) = entry else {
            return;
        };
        current = next;
    }
    current.insert(last.to_string(), value);
}

/// JavaScript truthiness, with `None` standing for `undefined`.
fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Number(number)) => number.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Some(Value::String(text)) => !text.is_empty(),
        Some(Value::Array(_) | Value::Object(_)) => true,
    }
}

// ---------------------------------------------------------------------------
// Merging and rendering
// ---------------------------------------------------------------------------

/// Shallow merge with precedence `existing < mapped < overrides`. The `use`
/// objects of all three are merged separately with the same precedence.
pub fn merge_configs(
    existing: &Map<String, Value>,
    mapped: &Map<String, Value>,
    overrides: &Map<String, Value>,
) -> Map<String, Value> {
    let mut merged = existing.clone();
    let mut use_section = Map::new();
    let mut has_use = false;

    for layer in [existing, mapped, overrides] {
        merged.extend(layer.iter().map(|(key, value)| (key.clone(), value.clone())));
        if let Some(section) = layer.get(USE_SECTION) {
            has_use = true;
            if let Some(section) = section.as_object() {
                use_section.extend(section.iter().map(|(key, value)| (key.clone(), value.clone())));
            }
        }
    }

    if has_use {
        merged.insert(USE_SECTION.to_string(), Value::Object(use_section));
    }
    merged
}

/// Source text of a Playwright config exporting `config`.
pub fn render_config(config: &Map<String, Value>) -> Result<String, ConfigError> {
    let object = serde_json::to_string_pretty(config)?;
    Ok(format!(
        "import {{ defineConfig }} from '@playwright/test';\n\nexport default defineConfig({object});\n"
    ))
}

// ---------------------------------------------------------------------------
// Conversion
// ---------------------------------------------------------------------------

/// What [`convert_config`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigConversion {
    /// The Cypress config that was read.
    pub source: PathBuf,
    /// The Playwright config that was written.
    pub target: PathBuf,
    /// Whether `target` existed before and was merged into.
    pub merged_existing: bool,
}

/// Convert the Cypress config in `project_root` and write the Playwright config.
///
/// Overwrites an existing `playwright.config.ts`/`.js` with the merged
/// result; otherwise creates `playwright.config.ts` when the Cypress config
/// was TypeScript and `playwright.config.js` when it was not.
pub async fn convert_config(
    project_root: &Path,
    overrides: &Map<String, Value>,
    formatter: &dyn Formatter,
) -> Result<ConfigConversion, ConfigError> {
    let source = find_first(project_root, CYPRESS_CONFIG_FILES)
        .await
        .ok_or_else(|| ConfigError::SourceNotFound {
            root: project_root.to_path_buf(),
        })?;
    info!(path = %source.display(), "converting Cypress config");
    let cypress = read_cypress_config(&source).await?;
    let mapped = map_fields(&cypress);

    let existing_path = find_first(project_root, PLAYWRIGHT_CONFIG_FILES).await;
    let existing = match &existing_path {
        Some(path) => {
            info!(path = %path.display(), "merging into existing Playwright config");
            read_existing_config(path).await
        }
        None => Map::new(),
    };

    let merged = merge_configs(&existing, &mapped, overrides);
    let target = existing_path.clone().unwrap_or_else(|| {
        let name = if Dialect::for_config(&source) == Dialect::Typescript {
            PLAYWRIGHT_CONFIG_FILES[0]
        } else {
            PLAYWRIGHT_CONFIG_FILES[1]
        };
        project_root.join(name)
    });

    let text = formatter.format(&render_config(&merged)?, &FormatOptions::for_config(&target));
    tokio::fs::write(&target, text)
        .await
        .map_err(|source| ConfigError::Io {
            path: target.clone(),
            source,
        })?;
    info!(path = %target.display(), "wrote Playwright config");

    Ok(ConfigConversion {
        source,
        target,
        merged_existing: existing_path.is_some(),
    })
}

async fn find_first(root: &Path, names: &[&str]) -> Option<PathBuf> {
    for name in names {
        let path = root.join(name);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Some(path);
        }
    }
    None
}

async fn read_cypress_config(path: &Path) -> Result<Map<String, Value>, ConfigError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    let parsed = if path.extension().is_some_and(|ext| ext == "json") {
        match serde_json::from_str(&text) {
            Ok(Value::Object(object)) => Ok(object),
            Ok(_) => Err("top-level value is not an object".to_string()),
            Err(err) => Err(err.to_string()),
        }
    } else {
        parse_config_object(&text)
    };
    parsed.map_err(|message| ConfigError::SourceParse {
        path: path.to_path_buf(),
        message,
    })
}

/// The existing Playwright config, or `{}` when it cannot be read.
async fn read_existing_config(path: &Path) -> Map<String, Value> {
    let result = match tokio::fs::read_to_string(path).await {
        Ok(text) => parse_config_object(&text),
        Err(err) => Err(err.to_string()),
    };
    result.unwrap_or_else(|message| {
        warn!(path = %path.display(), %message, "failed to read existing Playwright config, using {{}}");
        Map::new()
    })
}

/// Statically evaluate the object a script config exports.
///
/// Recognized exports: `export default defineConfig({...})`,
/// `export default {...}`, `module.exports = ...`, each optionally through a
/// top-level `const` binding.
pub fn parse_config_object(text: &str) -> Result<Map<String, Value>, String> {
    let parsed = syntax::parse(text, Dialect::Typescript).map_err(|err| err.to_string())?;
    let evaluator = Evaluator::new(&parsed.module);
    let exported = exported_expr(&parsed.module).ok_or("no exported config object found")?;
    match evaluator.eval(unwrap_define_config(exported)) {
        Some(Value::Object(object)) => Ok(object),
        _ => Err("exported config is not an object literal".to_string()),
    }
}

fn exported_expr(module: &Module) -> Option<&Expr> {
    module.body.iter().find_map(|item| match item {
        ModuleItem::ModuleDecl(ModuleDecl::ExportDefaultExpr(ExportDefaultExpr { expr, .. })) => {
            Some(&**expr)
        }
        ModuleItem::Stmt(Stmt::Expr(stmt)) => module_exports_value(&stmt.expr),
        _ => None,
    })
}

/// The right-hand side of `module.exports = <expr>`.
fn module_exports_value(expr: &Expr) -> Option<&Expr> {
    let Expr::Assign(AssignExpr {
        op: AssignOp::Assign,
        left: AssignTarget::Simple(SimpleAssignTarget::Member(member)),
        right,
        ..
    }) = expr
    else {
        return None;
    };
    let MemberExpr {
        obj,
        prop: MemberProp::Ident(prop),
        ..
    } = member
    else {
        return None;
    };
    let is_module = matches!(&**obj, Expr::Ident(ident) if &*ident.sym == "module");
    (is_module && &*prop.sym == "exports").then_some(&**right)
}

/// `defineConfig(x)` → `x`, through parentheses and type assertions.
fn unwrap_define_config(expr: &Expr) -> &Expr {
    let expr = strip_wrappers(expr);
    if let Expr::Call(CallExpr {
        callee: Callee::Expr(callee),
        args,
        ..
    }) = expr
    {
        if matches!(&**callee, Expr::Ident(ident) if &*ident.sym == "defineConfig") {
            if let Some(first) = args.first() {
                return strip_wrappers(&first.expr);
            }
        }
    }
    expr
}

fn strip_wrappers(expr: &Expr) -> &Expr {
    match expr {
        Expr::Paren(inner) => strip_wrappers(&inner.expr),
        Expr::TsAs(inner) => strip_wrappers(&inner.expr),
        Expr::TsSatisfies(inner) => strip_wrappers(&inner.expr),
        Expr::TsConstAssertion(inner) => strip_wrappers(&inner.expr),
        Expr::TsNonNull(inner) => strip_wrappers(&inner.expr),
        Expr::TsTypeAssertion(inner) => strip_wrappers(&inner.expr),
        other => other,
    }
}

// ---------------------------------------------------------------------------
// Static evaluation
// ---------------------------------------------------------------------------

/// Bound on `const` indirections, so `const a = b, b = a` terminates.
const MAX_BINDING_DEPTH: usize = 16;

/// Evaluates literal expressions to JSON. `None` stands for `undefined`.
struct Evaluator<'a> {
    bindings: HashMap<&'a str, &'a Expr>,
}

impl<'a> Evaluator<'a> {
    fn new(module: &'a Module) -> Self {
        let mut bindings = HashMap::new();
        for item in &module.body {
            let decl = match item {
                ModuleItem::Stmt(Stmt::Decl(decl)) => decl,
                ModuleItem::ModuleDecl(ModuleDecl::ExportDecl(export)) => &export.decl,
                _ => continue,
            };
            let Decl::Var(var) = decl else {
                continue;
            };
            for declarator in &var.decls {
                if let (Pat::Ident(binding), Some(init)) = (&declarator.name, &declarator.init) {
                    bindings.insert(&*binding.id.sym, &**init);
                }
            }
        }
        Self { bindings }
    }

    fn eval(&self, expr: &Expr) -> Option<Value> {
        self.eval_at(expr, 0)
    }

    fn eval_at(&self, expr: &Expr, depth: usize) -> Option<Value> {
        match strip_wrappers(expr) {
            Expr::Lit(lit) => match lit {
                Lit::Str(s) => Some(Value::from(&*s.value)),
                Lit::Num(n) => number(n.value),
                Lit::Bool(b) => Some(Value::Bool(b.value)),
                Lit::Null(_) => Some(Value::Null),
                _ => None,
            },
            Expr::Tpl(tpl) => template(tpl),
            Expr::Unary(UnaryExpr { op, arg, .. }) => {
                let value = self.eval_at(arg, depth);
                match op {
                    UnaryOp::Minus => number(-value?.as_f64()?),
                    UnaryOp::Plus => number(value?.as_f64()?),
                    UnaryOp::Bang => Some(Value::Bool(!truthy(value.as_ref()))),
                    _ => None,
                }
            }
            Expr::Bin(BinExpr {
                op, left, right, ..
            }) => {
                let left = self.eval_at(left, depth);
                match op {
                    BinaryOp::LogicalOr if truthy(left.as_ref()) => left,
                    BinaryOp::LogicalAnd if !truthy(left.as_ref()) => left,
                    BinaryOp::NullishCoalescing if left.as_ref().is_some_and(|v| !v.is_null()) => {
                        left
                    }
                    BinaryOp::LogicalOr | BinaryOp::LogicalAnd | BinaryOp::NullishCoalescing => {
                        self.eval_at(right, depth)
                    }
                    _ => None,
                }
            }
            Expr::Cond(CondExpr {
                test, cons, alt, ..
            }) => {
                if truthy(self.eval_at(test, depth).as_ref()) {
                    self.eval_at(cons, depth)
                } else {
                    self.eval_at(alt, depth)
                }
            }
            Expr::Object(object) => {
                let mut map = Map::new();
                for prop in &object.props {
                    match prop {
                        PropOrSpread::Spread(spread) => {
                            if let Some(Value::Object(spread)) = self.eval_at(&spread.expr, depth) {
                                map.extend(spread);
                            }
                        }
                        PropOrSpread::Prop(prop) => match &**prop {
                            Prop::KeyValue(kv) => {
                                let (Some(key), Some(value)) =
                                    (prop_key(&kv.key), self.eval_at(&kv.value, depth))
                                else {
                                    continue;
                                };
                                map.insert(key, value);
                            }
                            Prop::Shorthand(ident) => {
                                if let Some(value) = self.binding(&ident.sym, depth) {
                                    map.insert(ident.sym.to_string(), value);
                                }
                            }
                            // Methods, getters and setters have no JSON form.
                            _ => {}
                        },
                    }
                }
                Some(Value::Object(map))
            }
            Expr::Array(array) => Some(Value::Array(
                array
                    .elems
                    .iter()
                    .map(|elem| {
                        elem.as_ref()
                            .filter(|elem| elem.spread.is_none())
                            .and_then(|elem| self.eval_at(&elem.expr, depth))
                            .unwrap_or(Value::Null)
                    })
                    .collect(),
            )),
            Expr::Member(member) => member_value(member),
            Expr::Ident(ident) => self.binding(&ident.sym, depth),
            _ => None,
        }
    }

    fn binding(&self, name: &str, depth: usize) -> Option<Value> {
        if depth >= MAX_BINDING_DEPTH {
            return None;
        }
        let init = self.bindings.get(name)?;
        self.eval_at(init, depth + 1)
    }
}

/// `process.env.CI` → `'CI'`, `devices[...]` → `{}`, everything else `undefined`.
fn member_value(member: &MemberExpr) -> Option<Value> {
    match (&*member.obj, &member.prop) {
        (Expr::Ident(obj), MemberProp::Computed(_)) if &*obj.sym == "devices" => {
            Some(Value::Object(Map::new()))
        }
        (Expr::Member(env), MemberProp::Ident(var)) if is_process_env(env) => {
            (&*var.sym == "CI").then(|| Value::from("CI"))
        }
        _ => None,
    }
}

fn is_process_env(member: &MemberExpr) -> bool {
    matches!(&*member.obj, Expr::Ident(obj) if &*obj.sym == "process")
        && matches!(&member.prop, MemberProp::Ident(prop) if &*prop.sym == "env")
}

fn prop_key(key: &PropName) -> Option<String> {
    match key {
        PropName::Ident(ident) => Some(ident.sym.to_string()),
        PropName::Str(s) => Some(s.value.to_string()),
        PropName::Num(n) => number(n.value).map(|value| value.to_string()),
        _ => None,
    }
}

fn template(tpl: &Tpl) -> Option<Value> {
    if !tpl.exprs.is_empty() {
        return None;
    }
    let quasi = tpl.quasis.first()?;
    let text = quasi.cooked.as_ref().unwrap_or(&quasi.raw);
    Some(Value::from(&**text))
}

/// Integral values stay integers so `1280` does not render as `1280.0`.
fn number(value: f64) -> Option<Value> {
    if value.fract() == 0.0 && value.abs() < 9.0e15 {
        Some(Value::from(value as i64))
    } else {
        serde_json::Number::from_f64(value).map(Value::Number)
    }
}
