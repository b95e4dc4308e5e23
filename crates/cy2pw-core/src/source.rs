//! Per-file input to the conversion pipeline.

use std::path::{Path, PathBuf};

use crate::detect;

/// How a file pulls in its dependencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleStyle {
    /// Static `import ... from '...'`.
    Import,
    /// Dynamic `require('...')`.
    Require,
}

/// One input file, read once and never mutated.
#[derive(Debug, Clone)]
pub struct SourceUnit {
    pub path: PathBuf,
    pub raw_text: String,
    pub module_style: ModuleStyle,
}

impl SourceUnit {
    pub fn new(path: impl Into<PathBuf>, raw_text: impl Into<String>) -> Self {
        let path = path.into();
        let raw_text = raw_text.into();
        let module_style = detect::module_style(&raw_text, &path);
        Self {
            path,
            raw_text,
            module_style,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
