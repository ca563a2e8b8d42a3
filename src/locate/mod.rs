//! Build script discovery
//!
//! Walks upward from a start directory looking for the build script by exact
//! file name. The walk stops at the filesystem root, or at the first parent
//! that looks like a repository root (a marker file or directory) but has no
//! script. When the walk comes back empty a [`ScriptPicker`] may ask the user.

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::BuildSettings;
use crate::progress::ProgressSink;

/// A located build script and the directory it runs in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildScriptReference {
    pub path: PathBuf,
    pub project_directory: PathBuf,
}

impl BuildScriptReference {
    /// Reference for `path`, running in its parent directory
    pub fn from_script(path: PathBuf) -> Self {
        let project_directory = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            path,
            project_directory,
        }
    }
}

/// Interactive fallback when the upward walk finds nothing.
///
/// `Ok(None)` means the user dismissed the prompt or no prompt is possible.
pub trait ScriptPicker {
    fn pick(
        &self,
        script_name: &str,
        extension: Option<&str>,
    ) -> impl Future<Output = anyhow::Result<Option<PathBuf>>>;
}

/// Picker for non-interactive runs
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPicker;

impl ScriptPicker for NoPicker {
    async fn pick(&self, _script_name: &str, _extension: Option<&str>) -> anyhow::Result<Option<PathBuf>> {
        Ok(None)
    }
}

#[derive(Debug, Clone)]
pub struct ScriptLocator {
    script_name: String,
    marker_files: Vec<String>,
    marker_dirs: Vec<String>,
}

impl ScriptLocator {
    pub fn new(settings: &BuildSettings) -> Self {
        Self {
            script_name: settings.script_name.clone(),
            marker_files: settings.root_marker_files.clone(),
            marker_dirs: settings.root_marker_dirs.clone(),
        }
    }

    pub fn script_name(&self) -> &str {
        &self.script_name
    }

    /// Walk upward from `start`. Fails only when `start` cannot be resolved.
    pub fn locate(&self, start: &Path, sink: &ProgressSink) -> io::Result<Option<PathBuf>> {
        let mut current = std::fs::canonicalize(start)?;

        loop {
            let candidate = current.join(&self.script_name);
            sink.info(format!("Checking: {}", candidate.display()));
            if candidate.is_file() {
                sink.success(format!("Found build script at: {}", candidate.display()));
                return Ok(Some(candidate));
            }

            let Some(parent) = current.parent() else {
                sink.info("Reached filesystem root, stopping search.");
                return Ok(None);
            };
            current = parent.to_path_buf();
            sink.info(format!("Moving up to: {}", current.display()));

            if self.is_repository_root(&current) && !current.join(&self.script_name).is_file() {
                sink.info(format!(
                    "Found repository root at: {}, but no {}",
                    current.display(),
                    self.script_name
                ));
                return Ok(None);
            }
        }
    }

    fn is_repository_root(&self, dir: &Path) -> bool {
        self.marker_files.iter().any(|f| dir.join(f).is_file())
            || self.marker_dirs.iter().any(|d| dir.join(d).is_dir())
    }
}
