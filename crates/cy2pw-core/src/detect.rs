//! Pattern detectors.
//!
//! Narrow, side-effect-free questions asked of raw text or of a syntax node.
//! None of these panic; input they cannot make sense of gets the default answer.
//!
//! The text detectors (module style, hook and step presence) are deliberately
//! heuristic regex matches rather than tree queries. They run on printed output
//! as well as on raw input, and must agree with what the text postprocessors
//! inject.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use swc_core::ecma::ast::{
    BindingIdent, BlockStmt, CallExpr, Callee, Decl, Expr, Ident, ImportSpecifier, MemberExpr, MemberProp, Module,
    ModuleDecl, ModuleItem, ObjectPatProp, Pat, PropName, Stmt, ThisExpr, TsThisType,
};
use swc_core::ecma::visit::{Visit, VisitWith};

use crate::source::ModuleStyle;

/// Name of the execution-context handle in converted code.
pub const EXECUTION_HANDLE: &str = "page";

/// Identifiers treated as a reference to the execution-context handle.
/// `cy` is the implicit Cypress global that `page` replaces.
pub const HANDLE_ALIASES: &[&str] = &["page", "cy"];

/// Explicit parameter that replaces the dynamic receiver.
pub const CONTEXT_PARAM: &str = "context";

/// The dynamic receiver.
pub const RECEIVER: &str = "this";

/// Callees that declare a cucumber step. Matches what [`has_step_keyword`]
/// looks for, so a flattened file has no step keywords left.
pub const STEP_VERBS: &[&str] = &["Given", "When", "Then", "And"];

static IMPORT_FORM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bimport\s+[^;]+;?").expect("import regex is valid"));
static SETUP_HOOK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*Before\s*\(").expect("setup hook regex is valid"));
static TEARDOWN_HOOK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*After\s*\(").expect("teardown hook regex is valid"));
static STEP_KEYWORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*(?:Given|When|Then|And)\s*\(").expect("step keyword regex is valid")
});

// ---------------------------------------------------------------------------
// Text detectors
// ---------------------------------------------------------------------------

/// Classify how a file loads its dependencies.
///
/// TypeScript files and files with any static `import` are `Import`. A
/// `require('...')` call and the plain-JavaScript default both give `Require`.
pub fn module_style(text: &str, path: &Path) -> ModuleStyle {
    let is_typescript = matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("ts" | "tsx")
    );

    if is_typescript || IMPORT_FORM.is_match(text) {
        ModuleStyle::Import
    } else {
        ModuleStyle::Require
    }
}

/// Lifecycle hooks recognized by the harness injector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookKind {
    Setup,
    Teardown,
}

impl HookKind {
    pub const fn keyword(self) -> &'static str {
        match self {
            HookKind::Setup => "Before",
            HookKind::Teardown => "After",
        }
    }
}

/// Whether a hook of the given kind is already called at statement start.
pub fn uses_hook_keyword(text: &str, kind: HookKind) -> bool {
    match kind {
        HookKind::Setup => SETUP_HOOK.is_match(text),
        HookKind::Teardown => TEARDOWN_HOOK.is_match(text),
    }
}

/// Whether any step-declaration call (`Given/When/Then/And`) starts a statement.
pub fn has_step_keyword(text: &str) -> bool {
    STEP_KEYWORD.is_match(text)
}

/// Whether `name` can be written as a bare JavaScript identifier.
pub fn is_identifier_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_alphabetic() || first == '_' || first == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

// ---------------------------------------------------------------------------
// Node detectors
// ---------------------------------------------------------------------------

/// Visitor behind [`references_execution_handle`]. Stops descending once a
/// match has been seen.
#[derive(Debug, Default)]
pub struct HandleFinder {
    found: bool,
}

impl Visit for HandleFinder {
    fn visit_ident(&mut self, ident: &Ident) {
        if HANDLE_ALIASES.contains(&&*ident.sym) {
            self.found = true;
        }
    }

    // The name being declared is not a reference; its annotation may be.
    fn visit_binding_ident(&mut self, binding: &BindingIdent) {
        binding.type_ann.visit_with(self);
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        if !self.found {
            stmt.visit_children_with(self);
        }
    }

    fn visit_expr(&mut self, expr: &Expr) {
        if !self.found {
            expr.visit_children_with(self);
        }
    }
}

/// Whether the execution-context handle (or its Cypress alias) is referenced
/// anywhere inside `node`.
pub fn references_execution_handle<N: VisitWith<HandleFinder>>(node: &N) -> bool {
    let mut finder = HandleFinder::default();
    node.visit_with(&mut finder);
    finder.found
}

/// Visitor behind [`uses_receiver`].
#[derive(Debug, Default)]
pub struct ReceiverFinder {
    found: bool,
}

impl Visit for ReceiverFinder {
    fn visit_this_expr(&mut self, _: &ThisExpr) {
        self.found = true;
    }

    fn visit_ts_this_type(&mut self, _: &TsThisType) {
        self.found = true;
    }
}

/// Whether `this` appears inside `node`, as an expression or as a type.
pub fn uses_receiver<N: VisitWith<ReceiverFinder>>(node: &N) -> bool {
    let mut finder = ReceiverFinder::default();
    node.visit_with(&mut finder);
    finder.found
}

/// Names a parameter pattern makes available. Destructured objects contribute
/// their keys, so `{ page: myPage }` counts as providing `page`.
pub fn binding_names(pat: &Pat) -> Vec<String> {
    let mut names = Vec::new();
    collect_binding_names(pat, &mut names);
    names
}

fn collect_binding_names(pat: &Pat, names: &mut Vec<String>) {
    match pat {
        Pat::Ident(binding) => names.push(binding.id.sym.to_string()),
        Pat::Object(object) => {
            for prop in &object.props {
                match prop {
                    ObjectPatProp::Assign(assign) => names.push(assign.key.id.sym.to_string()),
                    ObjectPatProp::KeyValue(kv) => match &kv.key {
                        PropName::Ident(key) => names.push(key.sym.to_string()),
                        PropName::Str(key) => names.push(key.value.to_string()),
                        _ => {}
                    },
                    ObjectPatProp::Rest(rest) => collect_binding_names(&rest.arg, names),
                }
            }
        }
        Pat::Assign(assign) => collect_binding_names(&assign.left, names),
        Pat::Rest(rest) => collect_binding_names(&rest.arg, names),
        Pat::Array(array) => {
            for elem in array.elems.iter().flatten() {
                collect_binding_names(elem, names);
            }
        }
        _ => {}
    }
}

/// Whether a parameter list already provides the execution-context handle.
pub fn declares_handle<'a>(params: impl IntoIterator<Item = &'a Pat>) -> bool {
    params
        .into_iter()
        .any(|pat| binding_names(pat).iter().any(|name| name == EXECUTION_HANDLE))
}

/// Position of a `this: T` receiver parameter.
pub fn receiver_param_index<'a>(params: impl IntoIterator<Item = &'a Pat>) -> Option<usize> {
    params
        .into_iter()
        .position(|pat| matches!(pat, Pat::Ident(binding) if &*binding.id.sym == RECEIVER))
}

/// Whether a parameter is an explicit receiver: `this`, or the `context` it
/// has already been converted into.
pub fn is_receiver_param(pat: &Pat) -> bool {
    matches!(
        pat,
        Pat::Ident(binding) if &*binding.id.sym == RECEIVER || &*binding.id.sym == CONTEXT_PARAM
    )
}

/// Whether a parameter is a destructured fixture bundle that includes the handle.
pub fn is_handle_bundle(pat: &Pat) -> bool {
    matches!(pat, Pat::Object(_)) && declares_handle([pat])
}

/// Whether a top-level declaration or import already binds the handle, making
/// it visible to every function in the module.
pub fn module_binds_handle(module: &Module) -> bool {
    module.body.iter().any(|item| match item {
        ModuleItem::ModuleDecl(ModuleDecl::Import(import)) => {
            import.specifiers.iter().any(|specifier| {
                let local = match specifier {
                    ImportSpecifier::Named(named) => &named.local,
                    ImportSpecifier::Default(default) => &default.local,
                    ImportSpecifier::Namespace(namespace) => &namespace.local,
                };
                &*local.sym == EXECUTION_HANDLE
            })
        }
        ModuleItem::ModuleDecl(ModuleDecl::ExportDecl(export)) => decl_binds_handle(&export.decl),
        ModuleItem::Stmt(Stmt::Decl(decl)) => decl_binds_handle(decl),
        _ => false,
    })
}

/// Whether a function body declares the handle at its top level, shadowing
/// any handle a parameter would provide.
pub fn body_declares_handle(body: &BlockStmt) -> bool {
    body.stmts
        .iter()
        .any(|stmt| matches!(stmt, Stmt::Decl(decl) if decl_binds_handle(decl)))
}

fn decl_binds_handle(decl: &Decl) -> bool {
    match decl {
        Decl::Var(var) => declares_handle(var.decls.iter().map(|declarator| &declarator.name)),
        Decl::Fn(function) => &*function.ident.sym == EXECUTION_HANDLE,
        _ => false,
    }
}

/// The step verb (`Given`, `When`, `Then`, `And`) a call declares, if any.
pub fn step_verb(call: &CallExpr) -> Option<&str> {
    let Callee::Expr(callee) = &call.callee else {
        return None;
    };
    let Expr::Ident(ident) = &**callee else {
        return None;
    };
    STEP_VERBS
        .iter()
        .find(|verb| **verb == &*ident.sym)
        .copied()
}

/// Whether a call has the shape `<namespace>.Commands.add(...)`.
pub fn is_command_registration(call: &CallExpr, namespace: &str) -> bool {
    let Callee::Expr(callee) = &call.callee else {
        return false;
    };
    let Expr::Member(MemberExpr {
        obj,
        prop: MemberProp::Ident(method),
        ..
    }) = &**callee
    else {
        return false;
    };
    let Expr::Member(MemberExpr {
        obj: root,
        prop: MemberProp::Ident(commands),
        ..
    }) = &**obj
    else {
        return false;
    };
    matches!(&**root, Expr::Ident(ns) if &*ns.sym == namespace)
        && &*commands.sym == "Commands"
        && &*method.sym == "add"
}
