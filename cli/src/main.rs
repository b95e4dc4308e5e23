use anyhow::{bail, Context, Result};
use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser};
use cy2pw_core::{convert, ConvertOptions, FileStatus};
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;
use tracing::info;

#[derive(Parser)]
#[command(name = "cy2pw")]
#[command(about = "Convert Cypress tests into Playwright tests")]
#[command(override_usage = "cy2pw [OPTIONS] <SRC> <DST>    e.g. cy2pw cypress/e2e playwright/tests")]
#[command(version)]
struct Cli {
    /// Source file or folder
    src: PathBuf,

    /// Target file or folder
    dst: PathBuf,

    /// File types to convert, comma separated (e.g. `.js,.ts`), or `all`
    #[arg(long = "filetype", visible_alias = "ft", default_value = ".js")]
    file_types: String,

    /// Install Playwright when the project has no `playwright.config.js`
    #[arg(
        long,
        value_parser = BoolishValueParser::new(),
        action = ArgAction::Set,
        num_args = 0..=1,
        default_value = "false",
        default_missing_value = "true"
    )]
    install_dependency: bool,

    /// Skip the Cypress → Playwright config conversion
    #[arg(
        long,
        value_parser = BoolishValueParser::new(),
        action = ArgAction::Set,
        default_value = "true"
    )]
    skip_config: bool,

    /// Keep Given/When/Then step declarations instead of flattening them to `test`
    #[arg(
        long,
        value_parser = BoolishValueParser::new(),
        action = ArgAction::Set,
        default_value = "true"
    )]
    preserve_bdd: bool,

    /// Append the extension passes listed in `.cy2pwrc.json` or `package.json`
    #[arg(long)]
    plugins: bool,

    /// Folder converted before its siblings (repeatable, in order)
    #[arg(long = "priority-dir", default_values = ["support"])]
    priority_dirs: Vec<String>,

    /// Directory holding the Cypress/Playwright configs and `package.json`
    #[arg(long)]
    project_root: Option<PathBuf>,

    /// Enable verbose logging (sets log level to debug)
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn options(&self) -> ConvertOptions {
        // All fields set explicitly; clippy enforces exhaustiveness
        ConvertOptions {
            file_types: ConvertOptions::parse_file_types(&self.file_types),
            install_dependency: self.install_dependency,
            skip_config: self.skip_config,
            use_extension_passes: self.plugins,
            preserve_bdd: self.preserve_bdd,
            priority_dirs: self.priority_dirs.clone(),
            project_root: self.project_root.clone(),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Per-file status lines are info-level, so they show by default.
    let log_level = if cli.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .init();

    let options = cli.options();
    let report = convert(&cli.src, &cli.dst, &options).await.with_context(|| {
        format!(
            "Failed to migrate {} to {}",
            cli.src.display(),
            cli.dst.display()
        )
    })?;

    let failed = report.count(FileStatus::Failed);
    if failed > 0 {
        for file in report.files.iter().filter(|f| f.status == FileStatus::Failed) {
            eprintln!(
                "Error: {}: {}",
                file.source.display(),
                file.message.as_deref().unwrap_or("unknown error")
            );
        }
        bail!("{failed} file(s) could not be written");
    }

    info!("Migration complete!");
    Ok(())
}
