//! Syntax-tree rewrite passes.
//!
//! Each pass is a structural `VisitMut` over an swc [`Module`]: it matches one
//! source idiom and rewrites it in place, leaving every shape it does not
//! recognize untouched. Passes do not assume earlier passes ran, but the
//! pipeline always runs them in this order:
//!
//! 0. `normalize-params`: inject `page`, turn `this: T` into `context: T`
//! 1. `step-definitions`: explicit fixtures and `context` in `Given/When/Then/And`
//! 2. `commands-to-functions`: `Cypress.Commands.add` → exported functions
//! 3. `flatten-bdd` (optional): `Given/When/Then/And` → `test`
//!
//! Every pass is idempotent: running it on its own output is a no-op.

use std::collections::HashMap;
use std::path::Path;

use swc_core::ecma::ast::Module;

use crate::config::TransformOptions;
use crate::error::PassError;

pub mod p0_normalize;
pub mod p1_step_definitions;
pub mod p2_commands;
pub mod p3_flatten_bdd;
pub(crate) mod pass_utils;

pub use p0_normalize::NormalizeParams;
pub use p1_step_definitions::StepDefinitions;
pub use p2_commands::CommandsToFunctions;
pub use p3_flatten_bdd::FlattenBdd;

/// What a pass can see besides the tree.
#[derive(Debug, Clone, Copy)]
pub struct PassContext<'a> {
    pub options: &'a TransformOptions,
    pub path: &'a Path,
}

/// A named, idempotent `(tree) -> tree'` transformation.
pub trait RewritePass {
    /// Stable identifier, also used to reference the pass from plugin config.
    fn name(&self) -> &str;

    /// Whether the pass adds, removes or reorders function parameters.
    /// Passes that do must only ever prepend the execution-context handle.
    fn mutates_params(&self) -> bool {
        false
    }

    fn run(&self, module: &mut Module, ctx: &PassContext<'_>) -> Result<(), PassError>;
}

/// Builds a fresh pass instance.
pub type PassFactory = Box<dyn Fn() -> Box<dyn RewritePass>>;

/// Name → factory lookup for passes that can be referenced from configuration.
///
/// Built-in passes are pre-registered under their own names. Embedders add
/// their passes with [`PassRegistry::register`] and list them in the project's
/// plugin configuration to have them appended to the pipeline.
pub struct PassRegistry {
    factories: HashMap<String, PassFactory>,
}

impl PassRegistry {
    /// A registry with no passes at all.
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// A registry holding the four built-in passes.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register(p0_normalize::NAME, || Box::new(NormalizeParams));
        registry.register(p1_step_definitions::NAME, || Box::new(StepDefinitions));
        registry.register(p2_commands::NAME, || Box::new(CommandsToFunctions));
        registry.register(p3_flatten_bdd::NAME, || Box::new(FlattenBdd));
        registry
    }

    /// Register (or replace) a pass under `name`.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn RewritePass> + 'static,
    {
        self.factories.insert(name.into(), Box::new(factory));
    }

    pub fn create(&self, name: &str) -> Option<Box<dyn RewritePass>> {
        self.factories.get(name).map(|factory| factory())
    }
}

impl Default for PassRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
