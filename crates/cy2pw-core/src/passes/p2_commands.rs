//! Pass 2: Commands to Functions
//!
//! Top-level `Cypress.Commands.add('name', body)` statements become exported
//! async functions taking the handle first:
//!
//! ```text
//! Cypress.Commands.add('login', (user) => { ... })
//!   → export async function login(page, user) { ... }
//! ```
//!
//! An expression-bodied arrow gets a block body returning the expression.
//! Registrations whose name is not a valid identifier, or whose body is not a
//! function, are left as they are. The replacement inherits the statement's
//! span, so comments attached to the registration stay with the function.

use swc_core::common::{SyntaxContext, DUMMY_SP};
use swc_core::ecma::ast::{
    ArrowExpr, BlockStmt, BlockStmtOrExpr, CallExpr, Decl, ExportDecl, Expr, ExprStmt, FnDecl,
    FnExpr, Function, Invalid, Lit, Module, ModuleDecl, ModuleItem, ReturnStmt, Stmt,
};
use swc_core::ecma::visit::{VisitMut, VisitMutWith};
use tracing::debug;

use super::pass_utils::{binding, ident, param, ParamList};
use super::{PassContext, RewritePass};
use crate::detect::{
    body_declares_handle, declares_handle, is_command_registration, is_identifier_name,
    EXECUTION_HANDLE,
};
use crate::error::PassError;

pub const NAME: &str = "commands-to-functions";

/// See the module docs.
#[derive(Debug, Default, Clone, Copy)]
pub struct CommandsToFunctions;

impl RewritePass for CommandsToFunctions {
    fn name(&self) -> &str {
        NAME
    }

    fn mutates_params(&self) -> bool {
        true
    }

    fn run(&self, module: &mut Module, ctx: &PassContext<'_>) -> Result<(), PassError> {
        module.visit_mut_with(&mut CommandRewriter {
            namespace: &ctx.options.command_namespace,
        });
        Ok(())
    }
}

struct CommandRewriter<'a> {
    namespace: &'a str,
}

impl VisitMut for CommandRewriter<'_> {
    // Only module-level statements are considered; nested registrations are
    // conditional and have no sensible export form.
    fn visit_mut_module_items(&mut self, items: &mut Vec<ModuleItem>) {
        for item in items.iter_mut() {
            let ModuleItem::Stmt(Stmt::Expr(stmt)) = item else {
                continue;
            };
            if let Some(export) = command_to_function(stmt, self.namespace) {
                *item = ModuleItem::ModuleDecl(ModuleDecl::ExportDecl(export));
            }
        }
    }
}

fn command_to_function(stmt: &mut ExprStmt, namespace: &str) -> Option<ExportDecl> {
    let Expr::Call(call) = &mut *stmt.expr else {
        return None;
    };
    if !is_command_registration(call, namespace) {
        return None;
    }
    let name = command_name(call)?;

    let body = &mut call.args[1];
    if body.spread.is_some() || !matches!(&*body.expr, Expr::Fn(_) | Expr::Arrow(_)) {
        debug!(command = %name, "command body is not a function, leaving registration");
        return None;
    }

    let taken = std::mem::replace(&mut *body.expr, Expr::Invalid(Invalid { span: DUMMY_SP }));
    let mut function = match taken {
        Expr::Fn(FnExpr { function, .. }) => *function,
        Expr::Arrow(arrow) => arrow_to_function(arrow),
        other => {
            *body.expr = other;
            return None;
        }
    };

    let has_handle = declares_handle(function.params.iter().map(|param| &param.pat))
        || function.body.as_ref().is_some_and(body_declares_handle);
    if !has_handle {
        ParamList::Function(&mut function.params).prepend(binding(EXECUTION_HANDLE));
    }
    if !function.is_async {
        // A synchronous return annotation no longer describes an async function.
        function.return_type = None;
        function.is_async = true;
    }

    debug!(command = %name, "converting command registration to function");
    Some(ExportDecl {
        span: stmt.span,
        decl: Decl::Fn(FnDecl {
            ident: ident(&name),
            declare: false,
            function: Box::new(function),
        }),
    })
}

/// The registered name, when the call is `add('<identifier>', body)`.
fn command_name(call: &CallExpr) -> Option<String> {
    let [name, _body] = call.args.as_slice() else {
        return None;
    };
    if name.spread.is_some() {
        return None;
    }
    let Expr::Lit(Lit::Str(name)) = &*name.expr else {
        return None;
    };
    let name = name.value.to_string();
    if !is_identifier_name(&name) {
        debug!(command = %name, "command name is not an identifier, leaving registration");
        return None;
    }
    Some(name)
}

fn arrow_to_function(arrow: ArrowExpr) -> Function {
    let ArrowExpr {
        span,
        params,
        body,
        is_async,
        is_generator,
        type_params,
        return_type,
        ..
    } = arrow;

    let body = match *body {
        BlockStmtOrExpr::BlockStmt(block) => block,
        BlockStmtOrExpr::Expr(expr) => BlockStmt {
            span: DUMMY_SP,
            ctxt: SyntaxContext::empty(),
            stmts: vec![Stmt::Return(ReturnStmt {
                span: DUMMY_SP,
                arg: Some(expr),
            })],
        },
    };

    Function {
        params: params.into_iter().map(param).collect(),
        decorators: Vec::new(),
        span,
        ctxt: SyntaxContext::empty(),
        body: Some(body),
        is_generator,
        is_async,
        type_params,
        return_type,
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::config::{Dialect, TransformOptions};
    use crate::syntax;

    fn run_with(src: &str, options: &TransformOptions) -> String {
        let mut parsed = syntax::parse(src, Dialect::Typescript).unwrap();
        let ctx = PassContext {
            options,
            path: Path::new("commands.js"),
        };
        CommandsToFunctions.run(&mut parsed.module, &ctx).unwrap();
        parsed.print()
    }

    fn run(src: &str) -> String {
        run_with(src, &TransformOptions::default())
    }

    fn compact(text: &str) -> String {
        text.chars().filter(|c| !c.is_whitespace()).collect()
    }

    #[test]
    fn test_arrow_command_becomes_exported_function() {
        let out = compact(&run(
            "Cypress.Commands.add('login', (user) => { cy.get('#user').type(user); });",
        ));
        assert!(out.contains("exportasyncfunctionlogin(page,user){"), "{out}");
        assert!(out.contains("cy.get('#user').type(user);"), "{out}");
        assert!(!out.contains("Commands"), "{out}");
    }

    #[test]
    fn test_function_expression_command() {
        let out = compact(&run(
            "Cypress.Commands.add('logout', function () { cy.clearCookies(); });",
        ));
        assert!(out.contains("exportasyncfunctionlogout(page){"), "{out}");
    }

    #[test]
    fn test_expression_body_gets_return() {
        let out = compact(&run("Cypress.Commands.add('title', () => cy.title());"));
        assert!(out.contains("exportasyncfunctiontitle(page){returncy.title();}"), "{out}");
    }

    #[test]
    fn test_handle_not_duplicated() {
        let out = compact(&run(
            "Cypress.Commands.add('open', async (page, url) => { await page.goto(url); });",
        ));
        assert!(out.contains("exportasyncfunctionopen(page,url){"), "{out}");
    }

    #[test]
    fn test_local_handle_not_prepended() {
        let out = compact(&run(
            "Cypress.Commands.add('open', (url) => { const page = pages.current(); page.goto(url); });",
        ));
        assert!(out.contains("exportasyncfunctionopen(url){"), "{out}");
    }

    #[test]
    fn test_invalid_name_left_unchanged() {
        let out = compact(&run("Cypress.Commands.add('log-in', () => {});"));
        assert!(out.contains("Cypress.Commands.add('log-in'"), "{out}");
    }

    #[test]
    fn test_non_function_body_left_unchanged() {
        let out = compact(&run("Cypress.Commands.add('login', handler);"));
        assert!(out.contains("Cypress.Commands.add('login',handler)"), "{out}");
    }

    #[test]
    fn test_nested_registration_left_unchanged() {
        let out = compact(&run(
            "if (enabled) { Cypress.Commands.add('login', () => {}); }",
        ));
        assert!(out.contains("Cypress.Commands.add('login'"), "{out}");
    }

    #[test]
    fn test_custom_namespace() {
        let options = TransformOptions {
            command_namespace: "Cy".to_string(),
            ..TransformOptions::default()
        };
        let out = compact(&run_with(
            "Cy.Commands.add('login', () => {});\nCypress.Commands.add('other', () => {});",
            &options,
        ));
        assert!(out.contains("exportasyncfunctionlogin(page)"), "{out}");
        assert!(out.contains("Cypress.Commands.add('other'"), "{out}");
    }

    #[test]
    fn test_leading_comment_kept() {
        let out = run("// Log in through the form\nCypress.Commands.add('login', () => {});\n");
        assert!(out.contains("// Log in through the form"), "{out}");
    }

    #[test]
    fn test_idempotent() {
        let once = run("Cypress.Commands.add('login', (user) => { cy.get(user); });");
        let twice = run(&once);
        assert_eq!(once, twice);
    }
}
