//! Configuration for test conversion.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Syntax dialect used when parsing or formatting a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Dialect {
    /// TypeScript without JSX. Also used for plain `.js` test files, since
    /// TypeScript syntax is a superset of what Cypress suites are written in.
    Typescript,
    /// TypeScript with JSX (`.tsx` / `.jsx`).
    Tsx,
    /// Plain ECMAScript (with JSX enabled).
    Javascript,
}

impl Dialect {
    /// Dialect used to parse a test source file.
    pub fn for_source(path: &Path) -> Self {
        match extension(path) {
            Some("tsx" | "jsx") => Dialect::Tsx,
            _ => Dialect::Typescript,
        }
    }

    /// Dialect used to format a config file: TypeScript for `.ts`, ECMAScript otherwise.
    pub fn for_config(path: &Path) -> Self {
        match extension(path) {
            Some("ts" | "mts" | "cts") => Dialect::Typescript,
            _ => Dialect::Javascript,
        }
    }
}

fn extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|ext| ext.to_str())
}

/// Property-key quoting policy applied by the formatter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuoteProps {
    /// Unquote keys that are valid identifiers.
    AsNeeded,
    /// Leave keys exactly as written.
    Preserve,
}

/// Style configuration handed to a [`Formatter`](crate::format::Formatter).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FormatOptions {
    pub dialect: Dialect,
    /// Prefer `'single'` quotes for string literals that contain no single quote.
    pub single_quote: bool,
    pub quote_props: QuoteProps,
}

impl FormatOptions {
    /// Style used for converted test files.
    pub fn for_source(path: &Path) -> Self {
        Self {
            dialect: Dialect::for_source(path),
            ..Self::default()
        }
    }

    /// Style used for the generated Playwright config.
    pub fn for_config(path: &Path) -> Self {
        Self {
            dialect: Dialect::for_config(path),
            ..Self::default()
        }
    }
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            dialect: Dialect::Typescript,
            single_quote: true,
            quote_props: QuoteProps::AsNeeded,
        }
    }
}

/// Options controlling how the rewrite pipeline is assembled.
///
/// ## Serialization Format
///
/// Fields are serialized in `kebab-case` (e.g., `preserve-bdd`, `extension-passes`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct TransformOptions {
    /// Keep `Given/When/Then` as written. When false, step declarations are
    /// flattened into plain `test(...)` calls.
    pub preserve_bdd: bool,
    /// Global namespace whose `<ns>.Commands.add(...)` calls become exported functions.
    pub command_namespace: String,
    /// Extra passes appended after the built-ins, resolved by name through a
    /// [`PassRegistry`](crate::passes::PassRegistry).
    pub extension_passes: Vec<String>,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            preserve_bdd: true,
            command_namespace: "Cypress".to_string(),
            extension_passes: Vec::new(),
        }
    }
}

/// Options for converting a whole directory tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ConvertOptions {
    /// File extensions to convert (`.js`, `.ts`, ...). The single entry `all`
    /// accepts every file.
    pub file_types: Vec<String>,
    /// Install the Playwright runtime before converting when no Playwright
    /// config is present in the project root.
    pub install_dependency: bool,
    /// Skip the Cypress → Playwright config conversion.
    pub skip_config: bool,
    /// Load extension pass names from the project's plugin configuration.
    pub use_extension_passes: bool,
    /// See [`TransformOptions::preserve_bdd`].
    pub preserve_bdd: bool,
    /// Folder names converted before all other sibling folders, in this order.
    pub priority_dirs: Vec<String>,
    /// Directory holding `cypress.config.*`, `playwright.config.*` and
    /// `package.json`. Defaults to the current working directory.
    pub project_root: Option<PathBuf>,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            file_types: vec![".js".to_string()],
            install_dependency: false,
            skip_config: true,
            use_extension_passes: false,
            preserve_bdd: true,
            priority_dirs: vec!["support".to_string()],
            project_root: None,
        }
    }
}

impl ConvertOptions {
    /// Parse a comma-separated extension list such as `.js,.ts`.
    pub fn parse_file_types(list: &str) -> Vec<String> {
        list.split(',')
            .map(str::trim)
            .filter(|ext| !ext.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Whether a file should be run through the converter.
    pub fn accepts(&self, path: &Path) -> bool {
        if self.file_types.iter().any(|ext| ext == "all") {
            return true;
        }
        let Some(ext) = extension(path) else {
            return false;
        };
        self.file_types
            .iter()
            .any(|allowed| allowed.trim_start_matches('.') == ext)
    }

    /// Project root, falling back to the current directory.
    pub fn project_root(&self) -> PathBuf {
        self.project_root
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Pipeline options derived from these driver options.
    pub fn transform_options(&self) -> TransformOptions {
        TransformOptions {
            preserve_bdd: self.preserve_bdd,
            ..TransformOptions::default()
        }
    }
}
