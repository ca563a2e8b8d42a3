//! Toolchain provisioning for native C/C++ projects
//!
//! Checks for a build-file generator (CMake), a build executor (Ninja) and a
//! native compiler, installs whatever is missing from vendor artifacts, then
//! finds and runs the project's build script. All progress is reported as a
//! stream of [`ProgressEvent`]s; the caller decides how to present it.

pub mod build;
pub mod config;
pub mod download;
pub mod env;
pub mod error;
pub mod installer;
pub mod locate;
pub mod orchestration;
pub mod probe;
pub mod progress;
pub mod tool;

pub use build::{BuildResult, BuildRunner};
pub use config::Config;
pub use download::{Fetch, HttpFetcher};
pub use env::{PathStore, SystemPathStore};
pub use installer::{InstallOutcome, InstallReport, Installer, Launch, SilentLauncher};
pub use locate::{BuildScriptReference, NoPicker, ScriptLocator, ScriptPicker};
pub use orchestration::{Backends, Orchestrator, OrchestratorState};
pub use probe::{Detect, Probe};
pub use progress::{ProgressEvent, ProgressSink, Severity};
pub use tool::{ToolKind, ToolSet, ToolState};
