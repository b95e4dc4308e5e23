//! Traversal driver: converts a whole source tree into a mirrored target tree.
//!
//! Runs on a single task. Optional Playwright installation and config
//! conversion happen once, up front; then the source tree is walked depth
//! first, one file at a time. Within each directory, priority folders come
//! first (in configured order), then the other folders by name, then the files
//! by name. A file that fails to convert is copied through unchanged.

use std::fmt;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::config::ConvertOptions;
use crate::config_merge::{self, ConfigConversion};
use crate::error::ConvertError;
use crate::format::{Formatter, SwcFormatter};
use crate::install;
use crate::passes::PassRegistry;
use crate::pipeline::{self, ConversionResult, Pipeline};
use crate::source::SourceUnit;

/// What happened to one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    /// Converted and written.
    Converted,
    /// Conversion failed; the original was written unchanged.
    Copied,
    /// Nothing could be written (I/O error).
    Failed,
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FileStatus::Converted => "Converted",
            FileStatus::Copied => "Copied",
            FileStatus::Failed => "Failed",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutcome {
    pub source: PathBuf,
    pub target: PathBuf,
    pub status: FileStatus,
    /// Why conversion failed, for `Copied` and `Failed`.
    pub message: Option<String>,
}

/// Summary of a [`convert`] run. `files` is in processing order.
#[derive(Debug, Clone, Default)]
pub struct ConvertReport {
    pub files: Vec<FileOutcome>,
    pub config: Option<ConfigConversion>,
    pub installed: bool,
}

impl ConvertReport {
    pub fn count(&self, status: FileStatus) -> usize {
        self.files.iter().filter(|file| file.status == status).count()
    }

    pub fn has_failures(&self) -> bool {
        self.count(FileStatus::Failed) > 0
    }
}

/// Convert `source` (a directory or a single file) into `target` with the
/// built-in passes and the default formatter.
pub async fn convert(
    source: &Path,
    target: &Path,
    options: &ConvertOptions,
) -> Result<ConvertReport, ConvertError> {
    convert_with(source, target, options, &PassRegistry::default(), &SwcFormatter).await
}

/// [`convert`] with a caller-supplied pass registry and formatter.
///
/// Errors only when the run as a whole cannot proceed: the source cannot be
/// read, the target root cannot be created, or installation fails. Per-file
/// problems are recorded in the report instead.
pub async fn convert_with(
    source: &Path,
    target: &Path,
    options: &ConvertOptions,
    registry: &PassRegistry,
    formatter: &dyn Formatter,
) -> Result<ConvertReport, ConvertError> {
    let project_root = options.project_root();
    let mut report = ConvertReport::default();

    if options.install_dependency {
        report.installed = install::ensure_runtime(&project_root, target).await?;
    }

    if !options.skip_config {
        let test_dir = if target.is_absolute() {
            target.display().to_string()
        } else {
            format!("./{}", target.display())
        };
        let mut overrides = Map::new();
        overrides.insert("testDir".to_string(), Value::from(test_dir));
        match config_merge::convert_config(&project_root, &overrides, formatter).await {
            Ok(conversion) => report.config = Some(conversion),
            Err(err) => warn!(%err, "skipping config conversion"),
        }
    }

    let mut transform = options.transform_options();
    if options.use_extension_passes {
        transform.extension_passes = pipeline::extension_pass_names(&project_root).await;
        debug!(passes = ?transform.extension_passes, "loaded extension passes");
    }
    let pipeline = Pipeline::assemble(&transform, registry);

    info!(
        "Migrating Cypress tests from {} to {}",
        source.display(),
        target.display()
    );

    let metadata = tokio::fs::metadata(source)
        .await
        .map_err(|err| ConvertError::io(source, err))?;
    if metadata.is_file() {
        let target = single_file_target(source, target).await;
        if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| ConvertError::io(parent, err))?;
        }
        report
            .files
            .push(convert_file(&pipeline, formatter, source, &target).await);
    } else {
        walk(&pipeline, formatter, options, source, target, &mut report).await?;
    }

    info!(
        converted = report.count(FileStatus::Converted),
        copied = report.count(FileStatus::Copied),
        failed = report.count(FileStatus::Failed),
        "Migration complete"
    );
    Ok(report)
}

/// Where a single source file goes: into `target` when it is an existing
/// directory, to `target` itself otherwise.
async fn single_file_target(source: &Path, target: &Path) -> PathBuf {
    let is_dir = tokio::fs::metadata(target)
        .await
        .map(|meta| meta.is_dir())
        .unwrap_or(false);
    match source.file_name() {
        Some(name) if is_dir => target.join(name),
        _ => target.to_path_buf(),
    }
}

// ---------------------------------------------------------------------------
// Traversal
// ---------------------------------------------------------------------------

enum Task {
    Dir { source: PathBuf, target: PathBuf },
    File { source: PathBuf, target: PathBuf },
}

async fn walk(
    pipeline: &Pipeline,
    formatter: &dyn Formatter,
    options: &ConvertOptions,
    source: &Path,
    target: &Path,
    report: &mut ConvertReport,
) -> Result<(), ConvertError> {
    let mut stack = vec![Task::Dir {
        source: source.to_path_buf(),
        target: target.to_path_buf(),
    }];
    let mut is_root = true;

    while let Some(task) = stack.pop() {
        match task {
            Task::File { source, target } => {
                let outcome = convert_file(pipeline, formatter, &source, &target).await;
                report.files.push(outcome);
            }
            Task::Dir { source, target } => {
                let listing = async {
                    tokio::fs::create_dir_all(&target)
                        .await
                        .map_err(|err| ConvertError::io(&target, err))?;
                    list_dir(&source).await
                }
                .await;
                let (dirs, files) = match listing {
                    Ok(listing) => listing,
                    Err(err) if is_root => return Err(err),
                    Err(err) => {
                        warn!(%err, "skipping directory");
                        report.files.push(FileOutcome {
                            source,
                            target,
                            status: FileStatus::Failed,
                            message: Some(err.to_string()),
                        });
                        continue;
                    }
                };
                is_root = false;

                // Pushed in reverse so they pop in processing order.
                for name in files.iter().rev() {
                    let path = source.join(name);
                    if !options.accepts(&path) {
                        debug!(path = %path.display(), "skipping file with unselected extension");
                        continue;
                    }
                    stack.push(Task::File {
                        source: path,
                        target: target.join(name),
                    });
                }
                for name in order_dirs(dirs, &options.priority_dirs).iter().rev() {
                    stack.push(Task::Dir {
                        source: source.join(name),
                        target: target.join(name),
                    });
                }
            }
        }
    }
    Ok(())
}

/// Subdirectory and file names of `dir`, each sorted. Symlinks are followed.
async fn list_dir(dir: &Path) -> Result<(Vec<String>, Vec<String>), ConvertError> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|err| ConvertError::io(dir, err))?;
    let mut dirs = Vec::new();
    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|err| ConvertError::io(dir, err))?
    {
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|err| ConvertError::io(&path, err))?;
        if metadata.is_dir() {
            dirs.push(name);
        } else {
            files.push(name);
        }
    }
    dirs.sort();
    files.sort();
    Ok((dirs, files))
}

/// Priority folders first in their configured order, then the rest as given.
fn order_dirs(mut dirs: Vec<String>, priority: &[String]) -> Vec<String> {
    let mut ordered = Vec::with_capacity(dirs.len());
    for name in priority {
        if let Some(pos) = dirs.iter().position(|dir| dir == name) {
            ordered.push(dirs.remove(pos));
        }
    }
    ordered.extend(dirs);
    ordered
}

// ---------------------------------------------------------------------------
// Per-file conversion
// ---------------------------------------------------------------------------

async fn convert_file(
    pipeline: &Pipeline,
    formatter: &dyn Formatter,
    source: &Path,
    target: &Path,
) -> FileOutcome {
    info!("Started: {} -> {}", source.display(), target.display());
    let outcome = |status, message| FileOutcome {
        source: source.to_path_buf(),
        target: target.to_path_buf(),
        status,
        message,
    };

    let bytes = match tokio::fs::read(source).await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!("Failed: {} ({err})", source.display());
            return outcome(FileStatus::Failed, Some(err.to_string()));
        }
    };

    let (output, status, message) = match String::from_utf8(bytes) {
        Ok(text) => {
            let unit = SourceUnit::new(source, text);
            match pipeline.convert(&unit, formatter) {
                ConversionResult::Success { text } => (text.into_bytes(), FileStatus::Converted, None),
                ConversionResult::Failure {
                    message,
                    line,
                    column,
                } => {
                    warn!(
                        "Conversion failed: {} -> {}: {message} ({line}:{column})",
                        source.display(),
                        target.display()
                    );
                    (
                        unit.raw_text.into_bytes(),
                        FileStatus::Copied,
                        Some(format!("{message} ({line}:{column})")),
                    )
                }
            }
        }
        Err(err) => (
            err.into_bytes(),
            FileStatus::Copied,
            Some("not UTF-8 text".to_string()),
        ),
    };

    if let Err(err) = tokio::fs::write(target, output).await {
        warn!("Failed: {} ({err})", target.display());
        return outcome(FileStatus::Failed, Some(err.to_string()));
    }
    info!("{status}: {} -> {}", source.display(), target.display());

    // Let other work on the runtime make progress between files.
    tokio::task::yield_now().await;
    outcome(status, message)
}
