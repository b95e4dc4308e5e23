//! Pass 3: Flatten BDD
//!
//! Renames `Given/When/Then/And` callees to `test`, turning step declarations into
//! plain Playwright tests. Only part of the pipeline when BDD structure is not
//! being preserved.

use swc_core::ecma::ast::{CallExpr, Callee, Expr, Module};
use swc_core::ecma::visit::{VisitMut, VisitMutWith};

use super::{PassContext, RewritePass};
use crate::detect::step_verb;
use crate::error::PassError;

pub const NAME: &str = "flatten-bdd";

const TEST_CALLEE: &str = "test";

#[derive(Debug, Default, Clone, Copy)]
pub struct FlattenBdd;

impl RewritePass for FlattenBdd {
    fn name(&self) -> &str {
        NAME
    }

    fn run(&self, module: &mut Module, _ctx: &PassContext<'_>) -> Result<(), PassError> {
        module.visit_mut_with(&mut Flattener);
        Ok(())
    }
}

struct Flattener;

impl VisitMut for Flattener {
    fn visit_mut_call_expr(&mut self, call: &mut CallExpr) {
        call.visit_mut_children_with(self);
        if step_verb(call).is_none() {
            return;
        }
        if let Callee::Expr(callee) = &mut call.callee {
            if let Expr::Ident(ident) = &mut **callee {
                ident.sym = TEST_CALLEE.into();
            }
        }
    }
}
