//! Pass 1: Step-Definition Signature Conversion
//!
//! For `Given/When/Then/And(...)` calls, every function-valued argument is rewritten:
//!
//! 1. **Signature.** A declared receiver (`this: World`, or a `context`
//!    parameter from an earlier conversion) is kept as an explicit `context`
//!    parameter. Otherwise the parameters are folded into one destructured
//!    fixture bundle led by the handle: `(name) => ..` becomes
//!    `({ page, name }) => ..`. Parameters that cannot live in an object
//!    pattern (rest, array and object patterns) stay positional after the
//!    bundle. When the body uses `this`, `context` joins the bundle.
//! 2. **Async.** The function is marked `async`.
//! 3. **Receiver.** Every `this`, at any depth and inside type annotations
//!    included, becomes `context`.

use swc_core::ecma::ast::{AssignPat, BlockStmtOrExpr, CallExpr, Expr, Module, Pat};
use swc_core::ecma::visit::{VisitMut, VisitMutWith};
use tracing::debug;

use super::pass_utils::{object_pat, shorthand_prop, ParamList, ReceiverRewriter};
use super::{PassContext, RewritePass};
use crate::detect::{
    body_declares_handle, is_handle_bundle, is_receiver_param, step_verb, uses_receiver,
    CONTEXT_PARAM, EXECUTION_HANDLE,
};
use crate::error::PassError;

pub const NAME: &str = "step-definitions";

/// See the module docs.
#[derive(Debug, Default, Clone, Copy)]
pub struct StepDefinitions;

impl RewritePass for StepDefinitions {
    fn name(&self) -> &str {
        NAME
    }

    fn mutates_params(&self) -> bool {
        true
    }

    fn run(&self, module: &mut Module, _ctx: &PassContext<'_>) -> Result<(), PassError> {
        module.visit_mut_with(&mut StepVisitor);
        Ok(())
    }
}

struct StepVisitor;

impl VisitMut for StepVisitor {
    fn visit_mut_call_expr(&mut self, call: &mut CallExpr) {
        call.visit_mut_children_with(self);

        let Some(verb) = step_verb(call) else {
            return;
        };
        debug!(verb, "converting step definition");

        for arg in &mut call.args {
            match &mut *arg.expr {
                Expr::Fn(fn_expr) => {
                    let function = &mut *fn_expr.function;
                    let body = function.body.as_ref();
                    let receiver = body.is_some_and(|body| uses_receiver(body));
                    let local = body.is_some_and(body_declares_handle);
                    rewrite_signature(ParamList::Function(&mut function.params), receiver, local);
                    function.is_async = true;
                    function.visit_mut_with(&mut ReceiverRewriter);
                }
                Expr::Arrow(arrow) => {
                    let receiver = uses_receiver(&*arrow.body);
                    let local = matches!(
                        &*arrow.body,
                        BlockStmtOrExpr::BlockStmt(body) if body_declares_handle(body)
                    );
                    rewrite_signature(ParamList::Arrow(&mut arrow.params), receiver, local);
                    arrow.is_async = true;
                    arrow.visit_mut_with(&mut ReceiverRewriter);
                }
                _ => {}
            }
        }
    }
}

/// Apply step 1 of the module docs to one parameter list. A body that
/// declares its own handle keeps its parameters.
fn rewrite_signature(mut params: ParamList<'_>, uses_receiver: bool, declares_handle: bool) {
    if declares_handle {
        return;
    }
    {
        let pats = params.pats();
        if pats.iter().any(|pat| is_receiver_param(pat)) {
            // The receiver rewriter renames `this` to `context`.
            return;
        }
        if pats.first().is_some_and(|pat| is_handle_bundle(pat)) {
            return;
        }
    }

    let mut props = vec![shorthand_prop(EXECUTION_HANDLE, None)];
    let mut positional = Vec::new();
    for pat in params.take() {
        match pat {
            Pat::Ident(binding) => {
                if &*binding.id.sym != EXECUTION_HANDLE {
                    props.push(shorthand_prop(&binding.id.sym, None));
                }
            }
            Pat::Assign(assign) if matches!(&*assign.left, Pat::Ident(_)) => {
                let AssignPat { left, right, .. } = assign;
                if let Pat::Ident(binding) = *left {
                    props.push(shorthand_prop(&binding.id.sym, Some(right)));
                }
            }
            other => positional.push(other),
        }
    }
    if uses_receiver {
        props.push(shorthand_prop(CONTEXT_PARAM, None));
    }

    let mut bundled = vec![object_pat(props)];
    bundled.extend(positional);
    params.set(bundled);
}
