//! Pass 0: Parameter / Context Normalization
//!
//! For every function expression and arrow function:
//! 1. A `this: T` receiver parameter becomes a plain positional `context: T`,
//!    and `this` inside the function becomes `context`.
//! 2. If the body references the execution-context handle (`page`, or the
//!    Cypress global `cy`) and the handle is not already in scope, `page` is
//!    prepended as parameter 0. A body that declares its own `page` at top
//!    level is left alone.
//!
//! "In scope" means declared by the function's own parameters, by an
//! enclosing function's parameters, or by a top-level binding (the harness's
//! `let page, browser, context;`). Nested callbacks therefore inherit the
//! handle from the outermost function that received it, and converted output
//! never gets a second injection.

use swc_core::ecma::ast::{ArrowExpr, BlockStmtOrExpr, FnExpr, Function, Module};
use swc_core::ecma::visit::{VisitMut, VisitMutWith};
use tracing::debug;

use super::pass_utils::{binding, ParamList, ReceiverRewriter};
use super::{PassContext, RewritePass};
use crate::detect::{
    body_declares_handle, declares_handle, module_binds_handle, receiver_param_index,
    references_execution_handle, EXECUTION_HANDLE,
};
use crate::error::PassError;

pub const NAME: &str = "normalize-params";

/// See the module docs.
#[derive(Debug, Default, Clone, Copy)]
pub struct NormalizeParams;

impl RewritePass for NormalizeParams {
    fn name(&self) -> &str {
        NAME
    }

    fn mutates_params(&self) -> bool {
        true
    }

    fn run(&self, module: &mut Module, _ctx: &PassContext<'_>) -> Result<(), PassError> {
        let mut normalizer = Normalizer {
            scopes: vec![module_binds_handle(module)],
        };
        module.visit_mut_with(&mut normalizer);
        Ok(())
    }
}

/// Walks the tree tracking, per function nesting level, whether the handle
/// is already bound.
struct Normalizer {
    scopes: Vec<bool>,
}

impl Normalizer {
    fn handle_in_scope(&self) -> bool {
        self.scopes.last().copied().unwrap_or(false)
    }

    fn inject_handle(&self, mut params: ParamList<'_>, referenced: bool) {
        if !referenced || self.handle_in_scope() || declares_handle(params.pats()) {
            return;
        }
        debug!("injecting `{EXECUTION_HANDLE}` parameter");
        params.prepend(binding(EXECUTION_HANDLE));
    }
}

impl VisitMut for Normalizer {
    fn visit_mut_fn_expr(&mut self, fn_expr: &mut FnExpr) {
        let function = &mut *fn_expr.function;

        if receiver_param_index(function.params.iter().map(|param| &param.pat)).is_some() {
            debug!("replacing receiver parameter with `context`");
            function.visit_mut_with(&mut ReceiverRewriter);
        }

        let body = function.body.as_ref();
        let referenced = body.is_some_and(|body| references_execution_handle(body))
            && !body.is_some_and(body_declares_handle);
        self.inject_handle(ParamList::Function(&mut function.params), referenced);

        fn_expr.visit_mut_children_with(self);
    }

    fn visit_mut_arrow_expr(&mut self, arrow: &mut ArrowExpr) {
        let local = arrow_declares_handle(arrow);
        let referenced = references_execution_handle(&*arrow.body) && !local;
        self.inject_handle(ParamList::Arrow(&mut arrow.params), referenced);

        let declares = local || declares_handle(&arrow.params);
        self.scopes.push(self.handle_in_scope() || declares);
        arrow.visit_mut_children_with(self);
        self.scopes.pop();
    }

    fn visit_mut_function(&mut self, function: &mut Function) {
        let declares = declares_handle(function.params.iter().map(|param| &param.pat))
            || function.body.as_ref().is_some_and(body_declares_handle);
        self.scopes.push(self.handle_in_scope() || declares);
        function.visit_mut_children_with(self);
        self.scopes.pop();
    }
}

fn arrow_declares_handle(arrow: &ArrowExpr) -> bool {
    matches!(&*arrow.body, BlockStmtOrExpr::BlockStmt(body) if body_declares_handle(body))
}
