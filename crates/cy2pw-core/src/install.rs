//! Playwright runtime installation through npm.

use std::path::Path;

use tokio::process::Command;
use tracing::info;

use crate::error::ConvertError;

/// Marker whose presence means Playwright is already set up.
const INSTALLED_MARKER: &str = "playwright.config.js";

/// One package-manager invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallCommand {
    pub program: &'static str,
    pub args: Vec<String>,
}

impl InstallCommand {
    fn display(&self) -> String {
        format!("{} {}", self.program, self.args.join(" "))
    }
}

/// The commands that install Playwright and scaffold a JavaScript project
/// writing tests to `test_dir`.
pub fn install_commands(test_dir: &Path) -> Vec<InstallCommand> {
    let args = |args: &[&str]| args.iter().map(|arg| arg.to_string()).collect::<Vec<_>>();
    vec![
        InstallCommand {
            program: "npm",
            args: args(&["install", "playwright@latest", "@playwright/test", "--save-dev"]),
        },
        InstallCommand {
            program: "npx",
            args: {
                let mut scaffold = args(&[
                    "create-playwright@latest",
                    "--lang=js",
                    "--install-deps=true",
                    "--no-examples",
                ]);
                scaffold.push(format!("--test-dir={}", test_dir.display()));
                scaffold.push("--quiet".to_string());
                scaffold
            },
        },
    ]
}

/// Install Playwright into `project_root` unless it is already set up.
///
/// Returns whether anything was installed. Commands inherit stdio so npm
/// progress is visible.
pub async fn ensure_runtime(project_root: &Path, test_dir: &Path) -> Result<bool, ConvertError> {
    let marker = project_root.join(INSTALLED_MARKER);
    if tokio::fs::try_exists(&marker)
        .await
        .map_err(|source| ConvertError::io(&marker, source))?
    {
        info!("Playwright already configured, skipping install");
        return Ok(false);
    }

    info!("installing Playwright");
    for command in install_commands(test_dir) {
        let rendered = command.display();
        info!(command = %rendered, "running");
        let status = Command::new(command.program)
            .args(&command.args)
            .current_dir(project_root)
            .status()
            .await
            .map_err(|source| ConvertError::Spawn {
                command: rendered.clone(),
                source,
            })?;
        if !status.success() {
            return Err(ConvertError::Install {
                command: rendered,
                status,
            });
        }
    }
    info!("Playwright setup complete");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_install_commands() {
        let commands = install_commands(Path::new("playwright/tests"));
        assert_eq!(
            commands.iter().map(InstallCommand::display).collect::<Vec<_>>(),
            vec![
                "npm install playwright@latest @playwright/test --save-dev".to_string(),
                "npx create-playwright@latest --lang=js --install-deps=true --no-examples --test-dir=playwright/tests --quiet".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_skips_when_configured() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join(INSTALLED_MARKER), "").await.unwrap();
        let installed = ensure_runtime(dir.path(), Path::new("tests")).await.unwrap();
        assert!(!installed);
    }
}
