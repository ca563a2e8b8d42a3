mod common;

use std::fs;
use std::path::{Path, PathBuf};

use common::*;
use devbootstrap::error::{FetchError, InstallError};
use devbootstrap::{
    Backends, InstallOutcome, Installer, Orchestrator, OrchestratorState, ProgressSink, Severity,
    ToolKind,
};

type TestOrchestrator =
    Orchestrator<FakeProbe, FakeFetcher, FakeLauncher, MemoryPathStore, FakePicker>;

struct Harness {
    orchestrator: TestOrchestrator,
    probe: FakeProbe,
    fetcher: FakeFetcher,
    launcher: FakeLauncher,
    picker: FakePicker,
    rx: tokio::sync::mpsc::UnboundedReceiver<devbootstrap::ProgressEvent>,
    temp_root: tempfile::TempDir,
}

fn harness(present: &[ToolKind], fetcher: FakeFetcher, picker: FakePicker) -> Harness {
    let installed = installed(present);
    let probe = FakeProbe::new(installed.clone());
    let launcher = FakeLauncher::new(installed);
    let temp_root = tempfile::tempdir().unwrap();
    let (sink, rx) = ProgressSink::channel();

    let orchestrator = Orchestrator::new(
        config(),
        Backends {
            detector: probe.clone(),
            fetcher: fetcher.clone(),
            launcher: launcher.clone(),
            path_store: MemoryPathStore::default(),
            picker: picker.clone(),
        },
        sink,
    )
    .with_temp_root(temp_root.path());

    Harness {
        orchestrator,
        probe,
        fetcher,
        launcher,
        picker,
        rx,
        temp_root,
    }
}

fn is_empty_dir(path: &Path) -> bool {
    fs::read_dir(path).unwrap().next().is_none()
}

#[tokio::test]
async fn all_absent_installs_three_in_order_then_rechecks() {
    let mut h = harness(&[], FakeFetcher::default(), FakePicker::default());

    assert!(!h.orchestrator.check_all().await.all_present());
    assert_eq!(h.orchestrator.state(), OrchestratorState::SomeMissing);

    let report = h.orchestrator.install_missing().await;

    assert_eq!(report.kinds(), ToolKind::ALL.to_vec());
    assert!(
        report
            .entries
            .iter()
            .all(|(_, o)| matches!(o, InstallOutcome::Installed { exit_code: 0 }))
    );
    assert_eq!(
        *h.fetcher.requests.borrow(),
        ToolKind::ALL.iter().map(|k| url_for(*k)).collect::<Vec<_>>()
    );
    assert!(h.launcher.launches.borrow().iter().all(|l| l.artifact_existed));
    assert!(is_empty_dir(h.temp_root.path()), "temp artifacts must be removed");

    // Initial check plus exactly one re-check
    assert_eq!(h.probe.detections.get(), 6);
    assert_eq!(h.orchestrator.state(), OrchestratorState::AllPresent);
    assert!(h.orchestrator.tools().unwrap().all_present());

    let cleanups = drain(&mut h.rx)
        .iter()
        .filter(|e| e.text.starts_with("Removed temporary artifact"))
        .count();
    assert_eq!(cleanups, 3);
}

#[tokio::test]
async fn present_generator_yields_two_jobs() {
    let mut h = harness(
        &[ToolKind::Generator],
        FakeFetcher::default(),
        FakePicker::default(),
    );

    let report = h.orchestrator.install_missing().await;

    assert_eq!(report.kinds(), vec![ToolKind::Executor, ToolKind::Compiler]);
    assert_eq!(h.launcher.launches.borrow().len(), 2);
    assert_eq!(h.orchestrator.state(), OrchestratorState::AllPresent);
}

#[tokio::test]
async fn fetch_failure_only_fails_that_job() {
    let mut h = harness(
        &[],
        FakeFetcher::failing_on(ToolKind::Executor),
        FakePicker::default(),
    );

    let report = h.orchestrator.install_missing().await;

    assert_eq!(report.kinds(), ToolKind::ALL.to_vec());
    assert!(matches!(
        report.get(ToolKind::Executor),
        Some(InstallOutcome::Failed {
            error: InstallError::Fetch(FetchError::Status { status: 404, .. })
        })
    ));
    assert!(matches!(
        report.get(ToolKind::Compiler),
        Some(InstallOutcome::Installed { .. })
    ));
    assert_eq!(report.failures(), 1);
    assert!(is_empty_dir(h.temp_root.path()));

    let tools = h.orchestrator.tools().unwrap();
    assert!(tools.generator.installed);
    assert!(!tools.executor.installed);
    assert_eq!(h.orchestrator.state(), OrchestratorState::SomeMissing);

    let events = drain(&mut h.rx);
    assert!(
        events
            .iter()
            .any(|e| e.severity == Severity::Error && e.text.contains("404"))
    );
}

#[tokio::test]
async fn non_zero_installer_exit_is_advisory() {
    let mut h = harness(&[], FakeFetcher::default(), FakePicker::default());
    h.launcher.exit_code.set(Some(3010));

    let report = h.orchestrator.install_missing().await;

    assert!(
        report
            .entries
            .iter()
            .all(|(_, o)| matches!(o, InstallOutcome::CompletedWithCode { exit_code: 3010 }))
    );
    // The re-check, not the exit code, decides
    assert_eq!(h.orchestrator.state(), OrchestratorState::AllPresent);
}

#[tokio::test]
async fn killed_installer_reports_minus_one() {
    let mut h = harness(&[], FakeFetcher::default(), FakePicker::default());
    h.launcher.exit_code.set(None);

    let report = h.orchestrator.install_missing().await;

    assert!(matches!(
        report.get(ToolKind::Generator),
        Some(InstallOutcome::CompletedWithCode { exit_code: -1 })
    ));
}

#[tokio::test]
async fn nothing_missing_creates_no_jobs() {
    let mut h = harness(&ToolKind::ALL, FakeFetcher::default(), FakePicker::default());

    let report = h.orchestrator.install_missing().await;

    assert!(report.is_empty());
    assert!(h.fetcher.requests.borrow().is_empty());
    assert_eq!(h.probe.detections.get(), 3);
}

#[tokio::test]
async fn installer_orders_jobs_regardless_of_input() {
    let installed = installed(&[]);
    let fetcher = FakeFetcher::default();
    let launcher = FakeLauncher::new(installed);
    let store = MemoryPathStore::default();
    let sink = ProgressSink::silent();
    let catalog = catalog();
    let temp_root = tempfile::tempdir().unwrap();

    let tools: Vec<_> = ToolKind::ALL
        .iter()
        .rev()
        .map(|k| devbootstrap::ToolState::missing(*k, format!("{k:?}")))
        .collect();

    let report = Installer::new(&catalog, &fetcher, &launcher, &store, &sink)
        .with_temp_root(temp_root.path())
        .install_missing(&tools)
        .await;

    assert_eq!(report.kinds(), ToolKind::ALL.to_vec());
    assert_eq!(
        *fetcher.requests.borrow(),
        ToolKind::ALL.iter().map(|k| url_for(*k)).collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn missing_recipe_fails_only_that_tool() {
    let installed = installed(&[]);
    let fetcher = FakeFetcher::default();
    let launcher = FakeLauncher::new(installed);
    let store = MemoryPathStore::default();
    let sink = ProgressSink::silent();
    let mut catalog = catalog();
    catalog.generator.install = None;
    let temp_root = tempfile::tempdir().unwrap();

    let tools: Vec<_> = ToolKind::ALL
        .iter()
        .map(|k| devbootstrap::ToolState::missing(*k, format!("{k:?}")))
        .collect();
    let report = Installer::new(&catalog, &fetcher, &launcher, &store, &sink)
        .with_temp_root(temp_root.path())
        .install_missing(&tools)
        .await;

    assert!(matches!(
        report.get(ToolKind::Generator),
        Some(InstallOutcome::Failed {
            error: InstallError::NotConfigured { .. }
        })
    ));
    assert_eq!(fetcher.requests.borrow().len(), 2);
}

#[tokio::test]
async fn build_refuses_while_tools_are_missing() {
    let mut h = harness(
        &[ToolKind::Generator],
        FakeFetcher::default(),
        FakePicker::default(),
    );
    let dir = tempfile::tempdir().unwrap();

    let result = h.orchestrator.build(dir.path()).await.unwrap();

    assert!(result.is_none());
    assert_eq!(h.picker.asked.get(), 0);
    assert_eq!(h.orchestrator.state(), OrchestratorState::SomeMissing);
}

#[tokio::test]
async fn locate_miss_falls_back_to_picker_and_cancels_cleanly() {
    let mut h = harness(&ToolKind::ALL, FakeFetcher::default(), FakePicker::default());
    let dir = tempfile::tempdir().unwrap();
    let repo = dir.path().join("repo");
    fs::create_dir_all(repo.join(".git")).unwrap();
    fs::create_dir_all(repo.join("app")).unwrap();

    let result = h.orchestrator.build(&repo.join("app")).await.unwrap();

    assert!(result.is_none());
    assert_eq!(h.picker.asked.get(), 1);
    assert_eq!(h.orchestrator.state(), OrchestratorState::Idle);
    assert!(
        drain(&mut h.rx)
            .iter()
            .any(|e| e.text.starts_with("Build cancelled"))
    );
}

#[tokio::test]
async fn picker_answer_is_used_as_the_script() {
    let dir = tempfile::tempdir().unwrap();
    let elsewhere = dir.path().join("scripts").join("build.sh");
    fs::create_dir_all(elsewhere.parent().unwrap()).unwrap();
    fs::write(&elsewhere, "exit 0\n").unwrap();
    let repo = dir.path().join("repo");
    fs::create_dir_all(repo.join("src")).unwrap();
    fs::create_dir_all(repo.join("app")).unwrap();

    let picker = FakePicker {
        answer: Some(elsewhere.clone()),
        ..FakePicker::default()
    };
    let mut h = harness(&ToolKind::ALL, FakeFetcher::default(), picker);

    let found = h.orchestrator.locate(&repo.join("app")).await.unwrap();

    assert_eq!(found.path, elsewhere.canonicalize().unwrap());
    assert_eq!(
        found.project_directory,
        dir.path().join("scripts").canonicalize().unwrap()
    );
    assert_eq!(h.orchestrator.state(), OrchestratorState::Idle);
}

#[tokio::test]
async fn relative_picker_answer_runs_in_its_resolved_directory() {
    let dir = tempfile::tempdir().unwrap();
    let repo = dir.path().join("repo");
    fs::create_dir_all(repo.join(".git")).unwrap();
    fs::create_dir_all(repo.join("app")).unwrap();

    // Test binaries run with the package root as working directory
    let picker = FakePicker {
        answer: Some(PathBuf::from("Cargo.toml")),
        ..FakePicker::default()
    };
    let mut h = harness(&ToolKind::ALL, FakeFetcher::default(), picker);

    let found = h.orchestrator.locate(&repo.join("app")).await.unwrap();

    let root = Path::new(env!("CARGO_MANIFEST_DIR")).canonicalize().unwrap();
    assert_eq!(found.path, root.join("Cargo.toml"));
    assert_eq!(found.project_directory, root);
    assert!(found.project_directory.is_absolute());
}

#[tokio::test]
async fn unresolvable_picker_answer_is_a_miss() {
    let dir = tempfile::tempdir().unwrap();
    let repo = dir.path().join("repo");
    fs::create_dir_all(repo.join("src")).unwrap();
    fs::create_dir_all(repo.join("app")).unwrap();

    let picker = FakePicker {
        answer: Some(dir.path().join("gone").join("build.sh")),
        ..FakePicker::default()
    };
    let mut h = harness(&ToolKind::ALL, FakeFetcher::default(), picker);

    assert!(h.orchestrator.locate(&repo.join("app")).await.is_none());
    assert_eq!(h.orchestrator.state(), OrchestratorState::Idle);
    assert!(
        drain(&mut h.rx)
            .iter()
            .any(|e| e.severity == Severity::Error && e.text.starts_with("Cannot resolve"))
    );
}

#[cfg(unix)]
#[tokio::test]
async fn script_two_levels_up_builds_successfully() {
    let dir = tempfile::tempdir().unwrap();
    let project = dir.path().join("project");
    let start = project.join("tools").join("cli");
    fs::create_dir_all(&start).unwrap();
    fs::write(project.join("build.sh"), "echo building\nexit 0\n").unwrap();

    let mut h = harness(&ToolKind::ALL, FakeFetcher::default(), FakePicker::default());

    let result = h.orchestrator.build(&start).await.unwrap().unwrap();

    assert_eq!(result.exit_code, 0);
    assert!(result.succeeded);
    assert_eq!(h.picker.asked.get(), 0);
    assert_eq!(h.orchestrator.state(), OrchestratorState::Idle);

    let events = drain(&mut h.rx);
    assert!(
        events
            .iter()
            .any(|e| e.severity == Severity::BuildOutput && e.text == "building")
    );
}

#[cfg(unix)]
#[tokio::test]
async fn failed_build_is_reported_not_retried() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("build.sh"), "echo oops 1>&2\nexit 2\n").unwrap();
    let mut h = harness(&ToolKind::ALL, FakeFetcher::default(), FakePicker::default());

    let result = h.orchestrator.build(dir.path()).await.unwrap().unwrap();

    assert_eq!(result.exit_code, 2);
    assert!(!result.succeeded);
    let runs = drain(&mut h.rx)
        .iter()
        .filter(|e| e.text.starts_with("Running build script"))
        .count();
    assert_eq!(runs, 1);
}
