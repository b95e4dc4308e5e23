//! Pipeline assembly and per-file conversion.
//!
//! A [`Pipeline`] is built once per run. For each file it parses the source,
//! runs the rewrite passes in order, prints the tree, applies the text
//! postprocessors and finally formats the result. A file that fails to parse,
//! or whose conversion a pass aborts, yields [`ConversionResult::Failure`]
//! and no output at all.

use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::{FormatOptions, TransformOptions};
use crate::error::{ParseError, PassError};
use crate::format::Formatter;
use crate::passes::{
    CommandsToFunctions, FlattenBdd, NormalizeParams, PassContext, PassRegistry, RewritePass,
    StepDefinitions,
};
use crate::postprocess::{self, TextPostprocessor};
use crate::source::SourceUnit;
use crate::syntax;

/// Plugin configuration file looked up in the project root.
pub const PLUGIN_CONFIG_FILE: &str = ".cy2pwrc.json";

/// Outcome of converting one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionResult {
    Success {
        text: String,
    },
    /// `line` is 1-based, `column` 0-based.
    Failure {
        message: String,
        line: usize,
        column: usize,
    },
}

impl ConversionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ConversionResult::Success { .. })
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            ConversionResult::Success { text } => Some(text),
            ConversionResult::Failure { .. } => None,
        }
    }
}

impl From<ParseError> for ConversionResult {
    fn from(err: ParseError) -> Self {
        ConversionResult::Failure {
            message: err.message,
            line: err.line,
            column: err.column,
        }
    }
}

/// Ordered rewrite passes plus the postprocessor chain.
pub struct Pipeline {
    options: TransformOptions,
    passes: Vec<Box<dyn RewritePass>>,
    postprocessors: Vec<Box<dyn TextPostprocessor>>,
}

impl Pipeline {
    /// Build the pipeline for `options`.
    ///
    /// The built-in passes always come first, in their fixed order; the BDD
    /// flattening pass is only included when `preserve_bdd` is off. Extension
    /// passes follow in declared order. Names the registry does not know are
    /// skipped with a warning.
    pub fn assemble(options: &TransformOptions, registry: &PassRegistry) -> Self {
        let mut passes: Vec<Box<dyn RewritePass>> = vec![
            Box::new(NormalizeParams),
            Box::new(StepDefinitions),
            Box::new(CommandsToFunctions),
        ];
        if !options.preserve_bdd {
            passes.push(Box::new(FlattenBdd));
        }

        for name in &options.extension_passes {
            match registry.create(name) {
                Some(pass) => passes.push(pass),
                None => warn!(pass = %name, "unknown extension pass, skipping"),
            }
        }

        let pipeline = Self {
            options: options.clone(),
            passes,
            postprocessors: postprocess::default_chain(),
        };
        debug!(
            passes = ?pipeline.pass_names(),
            param_mutators = ?pipeline.param_mutators(),
            "assembled pipeline"
        );
        pipeline
    }

    /// Names of the rewrite passes in the order they run.
    pub fn pass_names(&self) -> Vec<&str> {
        self.passes.iter().map(|pass| pass.name()).collect()
    }

    /// Names of the passes and postprocessors that rewrite parameter lists,
    /// in the order they run.
    pub fn param_mutators(&self) -> Vec<&str> {
        let passes = self
            .passes
            .iter()
            .filter(|pass| pass.mutates_params())
            .map(|pass| pass.name());
        let postprocessors = self
            .postprocessors
            .iter()
            .filter(|postprocessor| postprocessor.mutates_params())
            .map(|postprocessor| postprocessor.name());
        passes.chain(postprocessors).collect()
    }

    /// Parse, run every rewrite pass and print. No postprocessing or formatting.
    pub fn rewrite(&self, unit: &SourceUnit) -> ConversionResult {
        let mut parsed = match syntax::parse_source(&unit.raw_text, unit.path()) {
            Ok(parsed) => parsed,
            Err(err) => return err.into(),
        };

        let ctx = PassContext {
            options: &self.options,
            path: unit.path(),
        };
        for pass in &self.passes {
            debug!(
                pass = pass.name(),
                mutates_params = pass.mutates_params(),
                path = %unit.path.display(),
                "running pass"
            );
            if let Err(PassError { pass, message, span }) = pass.run(&mut parsed.module, &ctx) {
                let (line, column) = span
                    .filter(|span| !span.is_dummy())
                    .map_or((1, 0), |span| parsed.line_col(span));
                return ConversionResult::Failure {
                    message: format!("{pass}: {message}"),
                    line,
                    column,
                };
            }
        }

        ConversionResult::Success {
            text: parsed.print(),
        }
    }

    /// Full conversion of one file: [`rewrite`](Self::rewrite), then the
    /// postprocessors in order, then `formatter`.
    pub fn convert(&self, unit: &SourceUnit, formatter: &dyn Formatter) -> ConversionResult {
        let text = match self.rewrite(unit) {
            ConversionResult::Success { text } => text,
            failure => return failure,
        };

        let text = self
            .postprocessors
            .iter()
            .fold(text, |text, postprocessor| {
                debug!(
                    postprocessor = postprocessor.name(),
                    mutates_params = postprocessor.mutates_params(),
                    "applying postprocessor"
                );
                postprocessor.apply(&text, unit)
            });

        ConversionResult::Success {
            text: formatter.format(&text, &FormatOptions::for_source(unit.path())),
        }
    }
}

// ---------------------------------------------------------------------------
// Extension pass configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
struct PluginConfig {
    #[serde(default)]
    plugins: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PackageManifest {
    #[serde(rename = "cy2pwPlugins", default)]
    plugins: Vec<String>,
}

/// Extension pass names declared for the project in `project_root`.
///
/// Read from `.cy2pwrc.json` (`{"plugins": [...]}`) when present, otherwise
/// from the `cy2pwPlugins` array in `package.json`. Missing or malformed
/// files yield no names.
pub async fn extension_pass_names(project_root: &Path) -> Vec<String> {
    let rc_path = project_root.join(PLUGIN_CONFIG_FILE);
    if let Some(config) = read_json::<PluginConfig>(&rc_path).await {
        return config.plugins;
    }
    let manifest_path = project_root.join("package.json");
    read_json::<PackageManifest>(&manifest_path)
        .await
        .map(|manifest| manifest.plugins)
        .unwrap_or_default()
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Option<T> {
    let text = tokio::fs::read_to_string(path).await.ok()?;
    match serde_json::from_str(&text) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(path = %path.display(), %err, "ignoring malformed plugin configuration");
            None
        }
    }
}
