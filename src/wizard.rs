//! Interactive prompts and summaries

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use indicatif::MultiProgress;
use inquire::validator::Validation;
use inquire::{Confirm, CustomUserError, InquireError, Text};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::console::PromptGate;
use devbootstrap::{BuildResult, InstallOutcome, InstallReport, ScriptPicker, ToolSet, ToolState};

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

/// Display welcome banner
pub fn show_welcome() {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);

    let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)));
    let _ = writeln!(stdout, "\n{RULE}");
    let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)).set_bold(true));
    let _ = writeln!(stdout, "\n                 D E V B O O T S T R A P");
    let _ = stdout.reset();
    let _ = writeln!(stdout, "\n      CMake · Ninja · C/C++ compiler · project build");
    let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)));
    let _ = writeln!(stdout, "\n{RULE}\n");
    let _ = stdout.reset();
}

/// One line per tool with a status mark
pub fn show_tools(tools: &ToolSet) {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);

    let _ = writeln!(stdout, "\nRequired tools:");
    for tool in tools.iter() {
        write_tool(&mut stdout, tool);
    }
    let _ = writeln!(stdout);
}

fn write_tool(stdout: &mut StandardStream, tool: &ToolState) {
    if tool.installed {
        let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)));
        let _ = write!(stdout, "  ✓ {} ({})", tool.name, tool.kind);
        let _ = stdout.reset();
        match &tool.detection_detail {
            Some(detail) => {
                let _ = writeln!(stdout, ": {detail}");
            }
            None => {
                let _ = writeln!(stdout);
            }
        }
    } else {
        let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)));
        let _ = writeln!(stdout, "  ✗ {} ({}): not found", tool.name, tool.kind);
        let _ = stdout.reset();
    }
}

pub fn show_install_report(report: &InstallReport) {
    if report.is_empty() {
        return;
    }
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);

    let _ = writeln!(stdout, "\nInstall jobs:");
    for (kind, outcome) in &report.entries {
        match outcome {
            InstallOutcome::Installed { exit_code } => {
                let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)));
                let _ = writeln!(stdout, "  ✓ {kind}: installed (exit code {exit_code})");
            }
            InstallOutcome::CompletedWithCode { exit_code } => {
                let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)));
                let _ = writeln!(stdout, "  ⚠ {kind}: installer exited with code {exit_code}");
            }
            InstallOutcome::Failed { error } => {
                let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Red)));
                let _ = writeln!(stdout, "  ✗ {kind}: {error}");
            }
        }
        let _ = stdout.reset();
    }
}

pub fn show_build_result(result: &BuildResult) {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);

    if result.succeeded {
        let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)).set_bold(true));
        let _ = writeln!(stdout, "\n✅ Build succeeded");
    } else {
        let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true));
        let _ = writeln!(stdout, "\n❌ Build failed (exit code {})", result.exit_code);
    }
    let _ = stdout.reset();
}

/// Ask before installing. `--yes` skips the prompt; a non-interactive run
/// without it declines.
pub fn confirm_install(missing: &[ToolState], assume_yes: bool, interactive: bool) -> Result<bool> {
    if assume_yes {
        return Ok(true);
    }
    if !interactive {
        log::warn!("Missing tools not installed: confirmation required (use --yes)");
        return Ok(false);
    }

    let names: Vec<&str> = missing.iter().map(|t| t.name.as_str()).collect();
    confirm(
        &format!("Install {}?", names.join(", ")),
        true,
        "Downloads vendor installers and runs them unattended",
    )
}

pub fn confirm_build(assume_yes: bool, interactive: bool) -> Result<bool> {
    if assume_yes {
        return Ok(true);
    }
    if !interactive {
        return Ok(false);
    }
    confirm(
        "All tools are available. Build the project now?",
        true,
        "Locates the build script and runs it",
    )
}

fn confirm(message: &str, default: bool, help: &str) -> Result<bool> {
    match Confirm::new(message)
        .with_default(default)
        .with_help_message(help)
        .prompt()
    {
        Ok(answer) => Ok(answer),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(false),
        Err(e) => Err(anyhow::anyhow!("Prompt failed: {e}")),
    }
}

/// Text prompt for the build script path, shown when the upward search
/// finds nothing
#[derive(Clone)]
pub struct InquirePicker {
    interactive: bool,
    progress: MultiProgress,
    gate: Arc<PromptGate>,
}

impl InquirePicker {
    pub fn new(interactive: bool, progress: MultiProgress, gate: Arc<PromptGate>) -> Self {
        Self {
            interactive,
            progress,
            gate,
        }
    }
}

impl ScriptPicker for InquirePicker {
    async fn pick(&self, script_name: &str, extension: Option<&str>) -> Result<Option<PathBuf>> {
        if !self.interactive {
            return Ok(None);
        }

        let script_name = script_name.to_string();
        let extension = extension.map(str::to_string);
        let progress = self.progress.clone();

        self.gate.acquire().await;
        tokio::task::spawn_blocking(move || {
            progress.suspend(|| prompt_for_script(&script_name, extension))
        })
        .await
        .context("Script prompt task failed")?
    }
}

fn prompt_for_script(script_name: &str, extension: Option<String>) -> Result<Option<PathBuf>> {
    let initial = std::env::current_dir()
        .map(|dir| dir.join(script_name).display().to_string())
        .unwrap_or_else(|_| script_name.to_string());

    let validator = move |input: &str| -> Result<Validation, CustomUserError> {
        let path = Path::new(input.trim());
        if !path.is_file() {
            return Ok(Validation::Invalid("No such file".into()));
        }
        if let Some(ext) = &extension
            && path.extension().and_then(|e| e.to_str()) != Some(ext.as_str())
        {
            return Ok(Validation::Invalid(format!("Expected a .{ext} file").into()));
        }
        Ok(Validation::Valid)
    };

    let message = format!("Path to {script_name}:");
    match Text::new(&message)
        .with_initial_value(&initial)
        .with_help_message("Esc to cancel")
        .with_validator(validator)
        .prompt()
    {
        Ok(answer) => Ok(Some(PathBuf::from(answer.trim()))),
        Err(
            InquireError::OperationCanceled
            | InquireError::OperationInterrupted
            | InquireError::NotTTY,
        ) => Ok(None),
        Err(e) => Err(e).context("Script prompt failed"),
    }
}
