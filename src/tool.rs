//! The three required tools and their detected state

use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the three required development utilities.
///
/// The declaration order is the processing order for both probing and
/// installing: the compiler comes last because it is the slowest and most
/// invasive install.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    /// Build-file generator (CMake)
    Generator,
    /// Build executor (Ninja)
    Executor,
    /// Native compiler
    Compiler,
}

impl ToolKind {
    pub const ALL: [ToolKind; 3] = [ToolKind::Generator, ToolKind::Executor, ToolKind::Compiler];

    pub fn role(self) -> &'static str {
        match self {
            ToolKind::Generator => "build-file generator",
            ToolKind::Executor => "build executor",
            ToolKind::Compiler => "compiler",
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.role())
    }
}

/// Result of probing one tool in the current check cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolState {
    pub kind: ToolKind,
    pub name: String,
    pub installed: bool,
    /// Path or version line that proved the tool is present
    pub detection_detail: Option<String>,
}

impl ToolState {
    pub fn found(kind: ToolKind, name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            installed: true,
            detection_detail: Some(detail.into()),
        }
    }

    pub fn missing(kind: ToolKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            installed: false,
            detection_detail: None,
        }
    }
}

/// Exactly one `ToolState` per required tool, produced by a single check cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolSet {
    pub generator: ToolState,
    pub executor: ToolState,
    pub compiler: ToolState,
}

impl ToolSet {
    pub fn get(&self, kind: ToolKind) -> &ToolState {
        match kind {
            ToolKind::Generator => &self.generator,
            ToolKind::Executor => &self.executor,
            ToolKind::Compiler => &self.compiler,
        }
    }

    /// States in processing order
    pub fn iter(&self) -> impl Iterator<Item = &ToolState> {
        ToolKind::ALL.into_iter().map(|kind| self.get(kind))
    }

    pub fn all_present(&self) -> bool {
        self.iter().all(|t| t.installed)
    }

    /// Missing tools in processing order
    pub fn missing(&self) -> Vec<ToolState> {
        self.iter().filter(|t| !t.installed).cloned().collect()
    }
}
