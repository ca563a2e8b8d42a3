//! Install jobs for missing tools
//!
//! One job per missing tool, processed strictly in `ToolKind` order:
//! download the vendor artifact into a private temp directory, run the
//! installer (or extract the archive), then update PATH and place the
//! fallback copy. A failing job is recorded in the report and the batch
//! moves on. Installer exit codes are advisory; the caller re-probes.

mod launcher;
mod staging;

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::config::{InstallMethod, InstallRecipe, ToolCatalog, expand, expand_path};
use crate::download::{Fetch, extract_zip};
use crate::env::{PathStore, add_to_path};
use crate::error::InstallError;
use crate::progress::ProgressSink;
use crate::tool::{ToolKind, ToolState};

pub use self::launcher::{Launch, SilentLauncher};
pub use self::staging::{copy_into, make_executable};

/// Exit code reported for an installer that ended without one
const NO_EXIT_CODE: i32 = -1;

/// What happened to one install job
#[derive(Debug)]
pub enum InstallOutcome {
    /// Installer exited 0 (or the archive was extracted)
    Installed { exit_code: i32 },
    /// Installer ran to completion with a non-zero code
    CompletedWithCode { exit_code: i32 },
    Failed { error: InstallError },
}

impl InstallOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, InstallOutcome::Failed { .. })
    }
}

/// Per-tool outcomes in processing order
#[derive(Debug, Default)]
pub struct InstallReport {
    pub entries: Vec<(ToolKind, InstallOutcome)>,
}

impl InstallReport {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn kinds(&self) -> Vec<ToolKind> {
        self.entries.iter().map(|(kind, _)| *kind).collect()
    }

    pub fn get(&self, kind: ToolKind) -> Option<&InstallOutcome> {
        self.entries
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, outcome)| outcome)
    }

    pub fn failures(&self) -> usize {
        self.entries.iter().filter(|(_, o)| o.is_failure()).count()
    }
}

/// One fetch-and-run unit, consumed once
#[derive(Debug, Clone)]
pub struct InstallJob {
    pub tool: ToolState,
    pub download_url: String,
    pub artifact_path: PathBuf,
    /// Installer arguments with placeholders already substituted
    pub install_args: Vec<String>,
}

impl InstallJob {
    fn new(tool: &ToolState, recipe: &InstallRecipe, workdir: &Path) -> Self {
        let artifact_path = workdir.join(&recipe.artifact);
        let artifact = artifact_path.display().to_string();
        let install_args = match &recipe.method {
            InstallMethod::Run { args, .. } => args
                .iter()
                .map(|arg| expand(&arg.replace("{artifact}", &artifact)))
                .collect(),
            InstallMethod::ExtractZip { .. } => Vec::new(),
        };

        Self {
            tool: tool.clone(),
            download_url: recipe.url.clone(),
            artifact_path,
            install_args,
        }
    }
}

/// Runs install jobs against borrowed backends
pub struct Installer<'a, F, L, S> {
    catalog: &'a ToolCatalog,
    fetcher: &'a F,
    launcher: &'a L,
    path_store: &'a S,
    sink: &'a ProgressSink,
    temp_root: PathBuf,
}

impl<'a, F, L, S> Installer<'a, F, L, S>
where
    F: Fetch,
    L: Launch,
    S: PathStore,
{
    pub fn new(
        catalog: &'a ToolCatalog,
        fetcher: &'a F,
        launcher: &'a L,
        path_store: &'a S,
        sink: &'a ProgressSink,
    ) -> Self {
        Self {
            catalog,
            fetcher,
            launcher,
            path_store,
            sink,
            temp_root: std::env::temp_dir(),
        }
    }

    /// Place job directories under `root` instead of the system temp dir
    pub fn with_temp_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.temp_root = root.into();
        self
    }

    /// Install every tool in `tools` that is not installed, in fixed order
    /// regardless of input order
    pub async fn install_missing(&self, tools: &[ToolState]) -> InstallReport {
        let mut pending: Vec<&ToolState> = tools.iter().filter(|t| !t.installed).collect();
        pending.sort_by_key(|t| t.kind);
        pending.dedup_by_key(|t| t.kind);

        let mut report = InstallReport::default();
        if pending.is_empty() {
            self.sink.info("Nothing to install");
            return report;
        }

        for tool in pending {
            self.sink.info(format!("Installing {}...", tool.name));
            let outcome = match self.run_job(tool).await {
                Ok(outcome) => outcome,
                Err(error) => {
                    self.sink
                        .error(format!("Failed to install {}: {error}", tool.name));
                    InstallOutcome::Failed { error }
                }
            };
            report.entries.push((tool.kind, outcome));
        }

        report
    }

    async fn run_job(&self, tool: &ToolState) -> Result<InstallOutcome, InstallError> {
        let recipe = self
            .catalog
            .get(tool.kind)
            .install
            .as_ref()
            .ok_or_else(|| InstallError::NotConfigured {
                tool: tool.name.clone(),
            })?;

        let workdir = tempfile::Builder::new()
            .prefix("devbootstrap-")
            .tempdir_in(&self.temp_root)
            .map_err(|source| InstallError::Io {
                context: format!(
                    "Failed to create temp directory in {}",
                    self.temp_root.display()
                ),
                source,
            })?;
        let job = InstallJob::new(tool, recipe, workdir.path());

        let result = self.fetch_and_install(&job, recipe).await;
        self.cleanup(workdir);
        let outcome = result?;

        // Exit codes are advisory; the re-check decides
        self.post_install(tool, recipe);
        Ok(outcome)
    }

    async fn fetch_and_install(
        &self,
        job: &InstallJob,
        recipe: &InstallRecipe,
    ) -> Result<InstallOutcome, InstallError> {
        let name = &job.tool.name;

        self.sink
            .info(format!("Downloading {name} from {}", job.download_url));
        self.fetcher
            .download(&job.download_url, &job.artifact_path, self.sink)
            .await?;

        match &recipe.method {
            InstallMethod::Run { program, .. } => {
                let program = match program {
                    Some(program) => PathBuf::from(expand(program)),
                    None => {
                        make_executable(&job.artifact_path)?;
                        job.artifact_path.clone()
                    }
                };

                self.sink.info(format!("Running {name} installer..."));
                let exit_code = self
                    .launcher
                    .run(&program, &job.install_args)
                    .await?
                    .unwrap_or(NO_EXIT_CODE);

                if exit_code == 0 {
                    self.sink
                        .success(format!("{name} installer finished with exit code 0"));
                    Ok(InstallOutcome::Installed { exit_code })
                } else {
                    self.sink
                        .warn(format!("{name} installer exited with code {exit_code}"));
                    Ok(InstallOutcome::CompletedWithCode { exit_code })
                }
            }
            InstallMethod::ExtractZip { destination } => {
                let destination = expand_path(destination);
                self.sink
                    .info(format!("Extracting {name} to {}", destination.display()));
                let entries = extract_zip(&job.artifact_path, &destination).await?;
                self.sink.success(format!(
                    "{name} extracted ({} entries)",
                    entries.len()
                ));
                Ok(InstallOutcome::Installed { exit_code: 0 })
            }
        }
    }

    /// PATH update and fallback copy. Failures here are warnings; the
    /// re-check decides whether the tool is usable.
    fn post_install(&self, tool: &ToolState, recipe: &InstallRecipe) {
        if let Some(entry) = &recipe.path_entry
            && let Err(e) = add_to_path(self.path_store, &expand(entry), self.sink)
        {
            self.sink
                .warn(format!("Failed to add {} to PATH: {e}", tool.name));
        }

        if let Some(fallback) = &recipe.fallback_copy {
            let source = expand_path(&fallback.source);
            let directory = expand_path(&fallback.directory);
            match copy_into(&source, &directory) {
                Ok(Some(copied)) => self
                    .sink
                    .success(format!("Copied {} to {}", tool.name, copied.display())),
                Ok(None) => self.sink.info(format!(
                    "{} does not exist, skipping fallback copy",
                    directory.display()
                )),
                Err(e) => self.sink.warn(format!("Fallback copy failed: {e}")),
            }
        }
    }

    fn cleanup(&self, workdir: TempDir) {
        let path = workdir.path().to_path_buf();
        match workdir.close() {
            Ok(()) => self
                .sink
                .info(format!("Removed temporary artifact {}", path.display())),
            Err(e) => self.sink.warn(format!(
                "Failed to remove temporary artifact {}: {e}",
                path.display()
            )),
        }
    }
}
