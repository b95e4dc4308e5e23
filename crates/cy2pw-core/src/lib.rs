//! Convert Cypress test suites into Playwright test suites.
//!
//! Each file goes through a fixed pipeline:
//!
//! 1. **Parse** with swc (TypeScript syntax; TSX for `.tsx`/`.jsx`).
//! 2. **Rewrite passes** over the syntax tree, see [`passes`].
//! 3. **Print** the tree back to text, comments included.
//! 4. **Text postprocessors**, see [`postprocess`].
//! 5. **Format** with a [`Formatter`].
//!
//! [`convert`] drives this over a directory tree; [`convert_source`] converts
//! a single in-memory file.

pub mod config;
pub mod config_merge;
pub mod detect;
pub mod driver;
pub mod error;
pub mod format;
pub mod install;
pub mod passes;
pub mod pipeline;
pub mod postprocess;
pub mod source;
pub mod syntax;

use std::path::Path;

pub use config::{ConvertOptions, Dialect, FormatOptions, QuoteProps, TransformOptions};
pub use driver::{convert, convert_with, ConvertReport, FileOutcome, FileStatus};
pub use error::{ConfigError, ConvertError, ParseError, PassError};
pub use format::{Formatter, IdentityFormatter, SwcFormatter};
pub use passes::{PassContext, PassRegistry, RewritePass};
pub use pipeline::{ConversionResult, Pipeline};
pub use postprocess::TextPostprocessor;
pub use source::{ModuleStyle, SourceUnit};

/// Convert one file's text with the built-in passes and the default formatter.
///
/// `path` selects the dialect and the module style of injected imports; the
/// file is not read.
pub fn convert_source(path: &Path, text: &str, options: &TransformOptions) -> ConversionResult {
    let pipeline = Pipeline::assemble(options, &PassRegistry::default());
    pipeline.convert(&SourceUnit::new(path, text), &SwcFormatter)
}
