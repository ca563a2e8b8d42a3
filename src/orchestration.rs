//! Orchestrator state machine
//!
//! ```text
//! Idle -> Checking -> AllPresent | SomeMissing
//! SomeMissing -> Installing -> Checking
//! AllPresent -> Locating -> Building -> Idle
//! ```
//!
//! Installs and builds take `&mut self`, so at most one of them runs at a
//! time. The orchestrator owns the three `ToolState` values produced by the
//! latest check and never marks a tool installed without a fresh probe.

use std::path::{Path, PathBuf};

use crate::build::{BuildResult, BuildRunner};
use crate::config::Config;
use crate::download::Fetch;
use crate::env::PathStore;
use crate::error::BuildError;
use crate::installer::{InstallReport, Installer, Launch};
use crate::locate::{BuildScriptReference, ScriptLocator, ScriptPicker};
use crate::probe::{Detect, check_all};
use crate::progress::ProgressSink;
use crate::tool::ToolSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorState {
    Idle,
    Checking,
    AllPresent,
    SomeMissing,
    Installing,
    Locating,
    Building,
}

/// Everything the orchestrator talks to outside the process
pub struct Backends<D, F, L, S, P> {
    pub detector: D,
    pub fetcher: F,
    pub launcher: L,
    pub path_store: S,
    pub picker: P,
}

pub struct Orchestrator<D, F, L, S, P> {
    config: Config,
    backends: Backends<D, F, L, S, P>,
    locator: ScriptLocator,
    runner: BuildRunner,
    sink: ProgressSink,
    state: OrchestratorState,
    tools: Option<ToolSet>,
    temp_root: Option<PathBuf>,
}

impl<D, F, L, S, P> Orchestrator<D, F, L, S, P>
where
    D: Detect,
    F: Fetch,
    L: Launch,
    S: PathStore,
    P: ScriptPicker,
{
    pub fn new(config: Config, backends: Backends<D, F, L, S, P>, sink: ProgressSink) -> Self {
        let locator = ScriptLocator::new(&config.build);
        let runner = BuildRunner::new(&config.build);
        Self {
            config,
            backends,
            locator,
            runner,
            sink,
            state: OrchestratorState::Idle,
            tools: None,
            temp_root: None,
        }
    }

    /// Place install job directories under `root`
    pub fn with_temp_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.temp_root = Some(root.into());
        self
    }

    pub fn state(&self) -> OrchestratorState {
        self.state
    }

    /// Tool states from the latest check, if any ran
    pub fn tools(&self) -> Option<&ToolSet> {
        self.tools.as_ref()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sink(&self) -> &ProgressSink {
        &self.sink
    }

    /// Probe all three tools and replace the stored states
    pub async fn check_all(&mut self) -> &ToolSet {
        self.state = OrchestratorState::Checking;
        self.sink.info("Checking for required tools...");

        let tools = check_all(&self.backends.detector, &self.sink).await;

        if tools.all_present() {
            self.state = OrchestratorState::AllPresent;
            self.sink.success("All required tools are installed!");
        } else {
            self.state = OrchestratorState::SomeMissing;
            let names: Vec<_> = tools.missing().into_iter().map(|t| t.name).collect();
            self.sink
                .warn(format!("Missing tools: {}", names.join(", ")));
        }

        self.tools.insert(tools)
    }

    /// Install every missing tool once, then re-check unconditionally
    pub async fn install_missing(&mut self) -> InstallReport {
        if self.state != OrchestratorState::SomeMissing {
            self.check_all().await;
        }

        let missing = self
            .tools
            .as_ref()
            .map(ToolSet::missing)
            .unwrap_or_default();
        if missing.is_empty() {
            self.sink.info("All required tools are already installed, nothing to do");
            return InstallReport::default();
        }

        self.state = OrchestratorState::Installing;
        self.sink.info(format!("Installing {} missing tool(s)...", missing.len()));

        let mut installer = Installer::new(
            &self.config.tools,
            &self.backends.fetcher,
            &self.backends.launcher,
            &self.backends.path_store,
            &self.sink,
        );
        if let Some(root) = &self.temp_root {
            installer = installer.with_temp_root(root);
        }
        let report = installer.install_missing(&missing).await;

        let failures = report.failures();
        if failures > 0 {
            self.sink
                .warn(format!("{failures} install job(s) failed; re-checking anyway"));
        }

        self.sink.info("Re-checking installations...");
        let all_present = self.check_all().await.all_present();
        if !all_present {
            self.sink.warn(
                "Some tools are still not detected. A new shell or a restart may be needed \
                 for PATH changes to take effect.",
            );
        }

        report
    }

    /// Find the build script from `start`, falling back to the picker
    pub async fn locate(&mut self, start: &Path) -> Option<BuildScriptReference> {
        let found = self.locate_script(start).await;
        self.state = OrchestratorState::Idle;
        found
    }

    /// Locate and run the build script. Refuses unless every tool is
    /// present according to a check in this session.
    pub async fn build(&mut self, start: &Path) -> Result<Option<BuildResult>, BuildError> {
        if self.state != OrchestratorState::AllPresent {
            self.check_all().await;
        }
        if self.state != OrchestratorState::AllPresent {
            self.sink
                .error("Cannot build: required tools are missing. Install them first.");
            return Ok(None);
        }

        let Some(reference) = self.locate_script(start).await else {
            self.sink.warn("Build cancelled: build script not found");
            self.state = OrchestratorState::Idle;
            return Ok(None);
        };

        self.state = OrchestratorState::Building;
        self.sink.info(format!(
            "Building in {}",
            reference.project_directory.display()
        ));
        let result = self
            .runner
            .run(&reference.path, &reference.project_directory, &self.sink)
            .await;
        self.state = OrchestratorState::Idle;

        match result {
            Ok(result) => Ok(Some(result)),
            Err(e) => {
                self.sink.error(format!("Build error: {e}"));
                Err(e)
            }
        }
    }

    async fn locate_script(&mut self, start: &Path) -> Option<BuildScriptReference> {
        self.state = OrchestratorState::Locating;
        self.sink.info("Searching for build script...");

        match self.locator.locate(start, &self.sink) {
            Ok(Some(path)) => return Some(BuildScriptReference::from_script(path)),
            Ok(None) => {}
            Err(e) => self
                .sink
                .error(format!("Cannot search from {}: {e}", start.display())),
        }

        let script_name = self.locator.script_name().to_string();
        self.sink.warn(format!(
            "{script_name} not found automatically, asking for its location"
        ));

        let extension = self.config.build.script_extension();
        match self.backends.picker.pick(&script_name, extension).await {
            Ok(Some(path)) => match std::fs::canonicalize(&path) {
                Ok(resolved) if resolved.is_file() => {
                    self.sink
                        .info(format!("Using build script: {}", resolved.display()));
                    Some(BuildScriptReference::from_script(resolved))
                }
                Ok(resolved) => {
                    self.sink.error(format!(
                        "Selected path is not a file: {}",
                        resolved.display()
                    ));
                    None
                }
                Err(e) => {
                    self.sink
                        .error(format!("Cannot resolve {}: {e}", path.display()));
                    None
                }
            },
            Ok(None) => {
                self.sink.info("No build script selected");
                None
            }
            Err(e) => {
                self.sink.error(format!("Script selection failed: {e:#}"));
                None
            }
        }
    }
}
