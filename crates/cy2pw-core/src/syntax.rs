//! Tree engine adapter: parse source text with swc, print a module back.
//!
//! Comments are collected at parse time and re-attached on print. Nodes
//! synthesized by the passes carry dummy spans, so comments stay with the
//! original node whose span a replacement inherits.

use std::path::Path;

use swc_core::common::comments::{Comments, SingleThreadedComments};
use swc_core::common::sync::Lrc;
use swc_core::common::{FileName, SourceMap, Span, Spanned};
use swc_core::ecma::ast::{EsVersion, Module};
use swc_core::ecma::codegen::to_code_default;
use swc_core::ecma::parser::error::Error as SyntaxError;
use swc_core::ecma::parser::{parse_file_as_module, EsSyntax, Syntax, TsSyntax};

use crate::config::Dialect;
use crate::error::ParseError;

/// A parsed module together with the source map and comments it came from.
pub struct ParsedModule {
    pub module: Module,
    cm: Lrc<SourceMap>,
    comments: SingleThreadedComments,
}

impl ParsedModule {
    /// 1-based line and 0-based column of the start of `span`.
    pub fn line_col(&self, span: Span) -> (usize, usize) {
        let loc = self.cm.lookup_char_pos(span.lo);
        (loc.line, loc.col.0)
    }

    /// Serialize the module back to source text.
    pub fn print(&self) -> String {
        let comments: &dyn Comments = &self.comments;
        to_code_default(self.cm.clone(), Some(comments), &self.module)
    }
}

fn syntax_for(dialect: Dialect) -> Syntax {
    match dialect {
        Dialect::Typescript => Syntax::Typescript(TsSyntax {
            decorators: true,
            ..Default::default()
        }),
        Dialect::Tsx => Syntax::Typescript(TsSyntax {
            tsx: true,
            decorators: true,
            ..Default::default()
        }),
        Dialect::Javascript => Syntax::Es(EsSyntax {
            jsx: true,
            ..Default::default()
        }),
    }
}

/// Parse `text` as a module.
///
/// Recoverable syntax errors count as failures too: a file only parses if the
/// parser reports nothing at all.
pub fn parse(text: &str, dialect: Dialect) -> Result<ParsedModule, ParseError> {
    let cm: Lrc<SourceMap> = Default::default();
    let fm = cm.new_source_file(FileName::Anon.into(), text.to_string());
    let comments = SingleThreadedComments::default();

    let mut recovered = Vec::new();
    let result = {
        let comments: &dyn Comments = &comments;
        parse_file_as_module(
            &fm,
            syntax_for(dialect),
            EsVersion::latest(),
            Some(comments),
            &mut recovered,
        )
    };

    let to_parse_error = |err: SyntaxError| {
        let loc = cm.lookup_char_pos(err.span().lo);
        ParseError {
            message: err.kind().msg().to_string(),
            line: loc.line,
            column: loc.col.0,
        }
    };

    match result {
        Ok(module) => match recovered.into_iter().next() {
            Some(err) => Err(to_parse_error(err)),
            None => Ok(ParsedModule {
                module,
                cm: cm.clone(),
                comments,
            }),
        },
        Err(err) => Err(to_parse_error(err)),
    }
}

/// Parse a file, picking the dialect from its extension.
pub fn parse_source(text: &str, path: &Path) -> Result<ParsedModule, ParseError> {
    parse(text, Dialect::for_source(path))
}
