//! Fakes for the orchestrator's external backends
#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use devbootstrap::config::{
    BuildSettings, Config, InstallMethod, InstallRecipe, ToolCatalog, ToolSpec,
};
use devbootstrap::error::{EnvError, FetchError, InstallError};
use devbootstrap::{
    Detect, Fetch, Launch, PathStore, ProgressEvent, ProgressSink, ScriptPicker, ToolKind,
    ToolState,
};

pub type Installed = Rc<RefCell<HashSet<ToolKind>>>;

pub fn installed(kinds: &[ToolKind]) -> Installed {
    Rc::new(RefCell::new(kinds.iter().copied().collect()))
}

pub fn artifact_name(kind: ToolKind) -> String {
    format!("{kind:?}-setup.bin").to_lowercase()
}

pub fn url_for(kind: ToolKind) -> String {
    format!("https://downloads.invalid/{}", artifact_name(kind))
}

fn kind_for_artifact(path: &Path) -> Option<ToolKind> {
    let name = path.file_name()?.to_str()?;
    ToolKind::ALL.into_iter().find(|k| artifact_name(*k) == name)
}

fn spec(kind: ToolKind) -> ToolSpec {
    ToolSpec {
        name: format!("{kind:?}"),
        command: format!("fake-{kind:?}").to_lowercase(),
        version_args: vec!["--version".to_string()],
        alternate_commands: Vec::new(),
        fallback_paths: Vec::new(),
        marker_dirs: Vec::new(),
        registry_markers: false,
        install: Some(InstallRecipe {
            url: url_for(kind),
            artifact: artifact_name(kind),
            method: InstallMethod::Run {
                program: None,
                args: vec!["--quiet".to_string()],
            },
            path_entry: None,
            fallback_copy: None,
        }),
    }
}

/// Catalog whose recipes run the downloaded artifact directly
pub fn catalog() -> ToolCatalog {
    ToolCatalog {
        generator: spec(ToolKind::Generator),
        executor: spec(ToolKind::Executor),
        compiler: spec(ToolKind::Compiler),
    }
}

pub fn config() -> Config {
    Config {
        tools: catalog(),
        build: BuildSettings {
            script_name: "build.sh".to_string(),
            interpreter: "sh".to_string(),
            interpreter_args: Vec::new(),
            ..BuildSettings::default()
        },
        ..Config::default()
    }
}

/// Reports tools as installed according to a shared set
#[derive(Clone)]
pub struct FakeProbe {
    pub installed: Installed,
    pub detections: Rc<Cell<usize>>,
}

impl FakeProbe {
    pub fn new(installed: Installed) -> Self {
        Self {
            installed,
            detections: Rc::new(Cell::new(0)),
        }
    }
}

impl Detect for FakeProbe {
    async fn detect(&self, kind: ToolKind, _sink: &ProgressSink) -> ToolState {
        self.detections.set(self.detections.get() + 1);
        let name = format!("{kind:?}");
        if self.installed.borrow().contains(&kind) {
            ToolState::found(kind, name, "/fake/bin")
        } else {
            ToolState::missing(kind, name)
        }
    }
}

/// Writes a small payload, or answers 404 for URLs containing `fail_on`
#[derive(Clone, Default)]
pub struct FakeFetcher {
    pub requests: Rc<RefCell<Vec<String>>>,
    pub fail_on: Option<String>,
    pub payload: Vec<u8>,
}

impl FakeFetcher {
    pub fn failing_on(kind: ToolKind) -> Self {
        Self {
            fail_on: Some(artifact_name(kind)),
            ..Self::default()
        }
    }

    pub fn with_payload(payload: Vec<u8>) -> Self {
        Self {
            payload,
            ..Self::default()
        }
    }
}

impl Fetch for FakeFetcher {
    async fn download(
        &self,
        url: &str,
        destination: &Path,
        _sink: &ProgressSink,
    ) -> Result<u64, FetchError> {
        self.requests.borrow_mut().push(url.to_string());
        if self.fail_on.as_deref().is_some_and(|f| url.contains(f)) {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: 404,
            });
        }
        std::fs::write(destination, &self.payload).map_err(|source| FetchError::Io {
            path: destination.to_path_buf(),
            source,
        })?;
        Ok(self.payload.len() as u64)
    }
}

/// One recorded installer launch
#[derive(Debug, Clone)]
pub struct Launched {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub artifact_existed: bool,
}

/// Marks the tool behind the launched artifact as installed
#[derive(Clone)]
pub struct FakeLauncher {
    pub installed: Installed,
    pub launches: Rc<RefCell<Vec<Launched>>>,
    pub exit_code: Rc<Cell<Option<i32>>>,
}

impl FakeLauncher {
    pub fn new(installed: Installed) -> Self {
        Self {
            installed,
            launches: Rc::new(RefCell::new(Vec::new())),
            exit_code: Rc::new(Cell::new(Some(0))),
        }
    }
}

impl Launch for FakeLauncher {
    async fn run(&self, program: &Path, args: &[String]) -> Result<Option<i32>, InstallError> {
        self.launches.borrow_mut().push(Launched {
            program: program.to_path_buf(),
            args: args.to_vec(),
            artifact_existed: program.is_file(),
        });
        if let Some(kind) = kind_for_artifact(program) {
            self.installed.borrow_mut().insert(kind);
        }
        Ok(self.exit_code.get())
    }
}

#[derive(Clone, Default)]
pub struct MemoryPathStore {
    pub value: Rc<RefCell<Option<String>>>,
    pub broadcasts: Rc<Cell<u32>>,
}

impl PathStore for MemoryPathStore {
    fn read(&self) -> Result<Option<String>, EnvError> {
        Ok(self.value.borrow().clone())
    }

    fn write(&self, _entry: &str, merged: &str) -> Result<(), EnvError> {
        *self.value.borrow_mut() = Some(merged.to_string());
        Ok(())
    }

    fn broadcast(&self) -> Result<(), EnvError> {
        self.broadcasts.set(self.broadcasts.get() + 1);
        Ok(())
    }

    fn separator(&self) -> char {
        ':'
    }
}

/// Answers the fallback prompt with a fixed path
#[derive(Clone, Default)]
pub struct FakePicker {
    pub answer: Option<PathBuf>,
    pub asked: Rc<Cell<u32>>,
}

impl ScriptPicker for FakePicker {
    async fn pick(
        &self,
        _script_name: &str,
        _extension: Option<&str>,
    ) -> anyhow::Result<Option<PathBuf>> {
        self.asked.set(self.asked.get() + 1);
        Ok(self.answer.clone())
    }
}

pub fn drain(rx: &mut tokio::sync::mpsc::UnboundedReceiver<ProgressEvent>) -> Vec<ProgressEvent> {
    std::iter::from_fn(|| rx.try_recv().ok()).collect()
}
