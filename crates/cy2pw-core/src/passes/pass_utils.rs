//! Shared helpers for the rewrite passes: node builders, a uniform view over
//! parameter lists, and the receiver rewriter.

use swc_core::common::{Span, SyntaxContext, DUMMY_SP};
use swc_core::ecma::ast::{
    AssignPatProp, BindingIdent, Expr, Ident, ObjectPat, ObjectPatProp, Param, Pat, ThisExpr,
    TsEntityName, TsThisType, TsThisTypeOrIdent, TsType, TsTypeQuery, TsTypeQueryExpr,
};
use swc_core::ecma::visit::{VisitMut, VisitMutWith};

use crate::detect::{CONTEXT_PARAM, RECEIVER};

pub(crate) fn ident(name: &str) -> Ident {
    ident_at(name, DUMMY_SP)
}

pub(crate) fn ident_at(name: &str, span: Span) -> Ident {
    Ident::new(name.into(), span, SyntaxContext::empty())
}

/// A plain `name` parameter.
pub(crate) fn binding(name: &str) -> Pat {
    Pat::Ident(BindingIdent {
        id: ident(name),
        type_ann: None,
    })
}

/// `name` or `name = default` inside an object pattern.
pub(crate) fn shorthand_prop(name: &str, default: Option<Box<Expr>>) -> ObjectPatProp {
    ObjectPatProp::Assign(AssignPatProp {
        span: DUMMY_SP,
        key: BindingIdent {
            id: ident(name),
            type_ann: None,
        },
        value: default,
    })
}

pub(crate) fn object_pat(props: Vec<ObjectPatProp>) -> Pat {
    Pat::Object(ObjectPat {
        span: DUMMY_SP,
        props,
        optional: false,
        type_ann: None,
    })
}

// ---------------------------------------------------------------------------
// Parameter lists
// ---------------------------------------------------------------------------

/// Mutable view over either a `function` parameter list or an arrow's, so
/// passes can treat both the same way.
pub(crate) enum ParamList<'a> {
    Function(&'a mut Vec<Param>),
    Arrow(&'a mut Vec<Pat>),
}

impl ParamList<'_> {
    pub(crate) fn pats(&self) -> Vec<&Pat> {
        match self {
            ParamList::Function(params) => params.iter().map(|param| &param.pat).collect(),
            ParamList::Arrow(params) => params.iter().collect(),
        }
    }

    /// Insert at index 0. The handle is only ever prepended, so later passes
    /// can rely on finding it first.
    pub(crate) fn prepend(&mut self, pat: Pat) {
        match self {
            ParamList::Function(params) => params.insert(0, param(pat)),
            ParamList::Arrow(params) => params.insert(0, pat),
        }
    }

    pub(crate) fn take(&mut self) -> Vec<Pat> {
        match self {
            ParamList::Function(params) => params.drain(..).map(|param| param.pat).collect(),
            ParamList::Arrow(params) => std::mem::take(&mut **params),
        }
    }

    pub(crate) fn set(&mut self, pats: Vec<Pat>) {
        match self {
            ParamList::Function(params) => **params = pats.into_iter().map(param).collect(),
            ParamList::Arrow(params) => **params = pats,
        }
    }
}

pub(crate) fn param(pat: Pat) -> Param {
    Param {
        span: DUMMY_SP,
        decorators: Vec::new(),
        pat,
    }
}

// ---------------------------------------------------------------------------
// Receiver rewriting
// ---------------------------------------------------------------------------

/// Replaces every reference to the dynamic receiver with the explicit
/// `context` parameter, at any depth:
///
/// - `this` expressions become `context`
/// - a `this` parameter is renamed to `context`, keeping its annotation
/// - `this` types become `typeof context`
/// - type references and predicates naming `this` name `context`
pub(crate) struct ReceiverRewriter;

impl VisitMut for ReceiverRewriter {
    fn visit_mut_expr(&mut self, expr: &mut Expr) {
        if let Expr::This(ThisExpr { span }) = *expr {
            *expr = Expr::Ident(ident_at(CONTEXT_PARAM, span));
            return;
        }
        expr.visit_mut_children_with(self);
    }

    fn visit_mut_binding_ident(&mut self, binding: &mut BindingIdent) {
        if &*binding.id.sym == RECEIVER {
            binding.id.sym = CONTEXT_PARAM.into();
        }
        binding.visit_mut_children_with(self);
    }

    fn visit_mut_ts_type(&mut self, ty: &mut TsType) {
        if let TsType::TsThisType(TsThisType { span }) = *ty {
            *ty = TsType::TsTypeQuery(TsTypeQuery {
                span,
                expr_name: TsTypeQueryExpr::TsEntityName(TsEntityName::Ident(ident_at(
                    CONTEXT_PARAM,
                    span,
                ))),
                type_args: None,
            });
            return;
        }
        ty.visit_mut_children_with(self);
    }

    fn visit_mut_ts_entity_name(&mut self, name: &mut TsEntityName) {
        if let TsEntityName::Ident(ident) = name {
            if &*ident.sym == RECEIVER {
                ident.sym = CONTEXT_PARAM.into();
            }
        }
        name.visit_mut_children_with(self);
    }

    fn visit_mut_ts_this_type_or_ident(&mut self, node: &mut TsThisTypeOrIdent) {
        if let TsThisTypeOrIdent::TsThisType(TsThisType { span }) = *node {
            *node = TsThisTypeOrIdent::Ident(ident_at(CONTEXT_PARAM, span));
            return;
        }
        node.visit_mut_children_with(self);
    }
}
