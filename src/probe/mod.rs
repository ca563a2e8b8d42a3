//! Toolchain presence detection
//!
//! Determines whether each required tool is usable by, in order:
//! - running it from the search path with its version arguments
//! - checking conventional install locations (installers that do not update
//!   PATH for the current session)
//! - for the compiler, native toolchain registry markers and well-known
//!   build-tool directories
//!
//! Absence is the expected outcome on a fresh machine. Any failure to launch
//! a probe process is logged and folded into "not found".

mod registry;

use std::future::Future;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;

use crate::config::{Config, ToolCatalog, ToolSpec, expand_path};
use crate::progress::ProgressSink;
use crate::tool::{ToolKind, ToolSet, ToolState};

/// Anything that can report a fresh `ToolState` for a tool
pub trait Detect {
    fn detect(&self, kind: ToolKind, sink: &ProgressSink) -> impl Future<Output = ToolState>;
}

/// Probe all three tools sequentially in the fixed order
pub async fn check_all<D: Detect>(detector: &D, sink: &ProgressSink) -> ToolSet {
    let generator = probe_one(detector, ToolKind::Generator, sink).await;
    let executor = probe_one(detector, ToolKind::Executor, sink).await;
    let compiler = probe_one(detector, ToolKind::Compiler, sink).await;
    ToolSet {
        generator,
        executor,
        compiler,
    }
}

async fn probe_one<D: Detect>(detector: &D, kind: ToolKind, sink: &ProgressSink) -> ToolState {
    sink.info(format!("Checking for {kind} installation..."));
    detector.detect(kind, sink).await
}

/// Process- and filesystem-backed detector
#[derive(Debug, Clone)]
pub struct Probe {
    catalog: ToolCatalog,
    timeout: Duration,
}

impl Probe {
    pub fn new(config: &Config) -> Self {
        Self {
            catalog: config.tools.clone(),
            timeout: config.probe.timeout(),
        }
    }

    /// Run `<command> <version_args>` and report whether it exited 0
    pub async fn check_tool(
        &self,
        command: &str,
        version_args: &[String],
        sink: &ProgressSink,
    ) -> bool {
        self.probe_command(command, version_args, sink).await.is_some()
    }

    /// Like [`check_tool`](Self::check_tool), returning the first line of the
    /// version output on success
    pub async fn probe_command(
        &self,
        command: &str,
        version_args: &[String],
        sink: &ProgressSink,
    ) -> Option<String> {
        let resolved = match which::which(command) {
            Ok(path) => path,
            Err(e) => {
                sink.info(format!("{command} check failed: {e}"));
                return None;
            }
        };

        let mut cmd = Command::new(&resolved);
        cmd.args(version_args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        hide_console_window(&mut cmd);

        match timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) if output.status.success() => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                let first_line = stdout.lines().next().unwrap_or_default().trim();
                let detail = if first_line.is_empty() {
                    resolved.display().to_string()
                } else {
                    first_line.to_string()
                };
                sink.info(format!("{command} found: {detail}"));
                Some(detail)
            }
            Ok(Ok(output)) => {
                sink.info(format!(
                    "{command} check failed: exit code {}",
                    output
                        .status
                        .code()
                        .map_or_else(|| "none".to_string(), |c| c.to_string())
                ));
                None
            }
            Ok(Err(e)) => {
                sink.info(format!("{command} check failed: {e}"));
                None
            }
            Err(_) => {
                sink.info(format!(
                    "{command} check failed: no response within {} seconds",
                    self.timeout.as_secs()
                ));
                None
            }
        }
    }

    pub async fn check_generator(&self, sink: &ProgressSink) -> ToolState {
        self.check_with_fallback(ToolKind::Generator, sink).await
    }

    pub async fn check_executor(&self, sink: &ProgressSink) -> ToolState {
        self.check_with_fallback(ToolKind::Executor, sink).await
    }

    /// Union check: registry markers, then build-tool directories, then any
    /// runnable compiler on the search path
    pub async fn check_compiler(&self, sink: &ProgressSink) -> ToolState {
        let spec = &self.catalog.compiler;

        if spec.registry_markers {
            match registry::installed_toolchain() {
                Ok(Some(found)) => {
                    sink.info(format!("Visual Studio found: {found}"));
                    return ToolState::found(ToolKind::Compiler, &spec.name, found);
                }
                Ok(None) => {}
                Err(e) => sink.info(format!("Visual Studio check failed: {e}")),
            }
        }

        for dir in spec.marker_dirs.iter().map(|d| expand_path(d)) {
            if dir.is_dir() {
                sink.info(format!("{} found at: {}", spec.name, dir.display()));
                return ToolState::found(ToolKind::Compiler, &spec.name, dir.display().to_string());
            }
        }

        for command in std::iter::once(&spec.command).chain(&spec.alternate_commands) {
            if let Some(detail) = self.probe_command(command, &spec.version_args, sink).await {
                return ToolState::found(ToolKind::Compiler, &spec.name, detail);
            }
        }

        ToolState::missing(ToolKind::Compiler, &spec.name)
    }

    async fn check_with_fallback(&self, kind: ToolKind, sink: &ProgressSink) -> ToolState {
        let spec = self.catalog.get(kind);

        if let Some(detail) = self
            .probe_command(&spec.command, &spec.version_args, sink)
            .await
        {
            return ToolState::found(kind, &spec.name, detail);
        }

        match conventional_location(spec) {
            Some(path) => {
                sink.info(format!("{} found at: {}", spec.name, path));
                ToolState::found(kind, &spec.name, path)
            }
            None => ToolState::missing(kind, &spec.name),
        }
    }
}

impl Detect for Probe {
    async fn detect(&self, kind: ToolKind, sink: &ProgressSink) -> ToolState {
        let state = match kind {
            ToolKind::Generator => self.check_generator(sink).await,
            ToolKind::Executor => self.check_executor(sink).await,
            ToolKind::Compiler => self.check_compiler(sink).await,
        };
        if !state.installed {
            sink.warn(format!("{} not found", state.name));
        }
        state
    }
}

/// First configured fallback executable that exists on disk
fn conventional_location(spec: &ToolSpec) -> Option<String> {
    spec.fallback_paths
        .iter()
        .map(|p| expand_path(p))
        .find(|p| is_file(p))
        .map(|p| p.display().to_string())
}

fn is_file(path: &Path) -> bool {
    std::fs::metadata(path).map(|m| m.is_file()).unwrap_or(false)
}

#[cfg(windows)]
fn hide_console_window(cmd: &mut Command) {
    const CREATE_NO_WINDOW: u32 = 0x0800_0000;
    cmd.creation_flags(CREATE_NO_WINDOW);
}

#[cfg(not(windows))]
fn hide_console_window(_cmd: &mut Command) {}
