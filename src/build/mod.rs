//! Build script execution with live output relay

use std::path::Path;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

use crate::config::BuildSettings;
use crate::error::BuildError;
use crate::progress::{ProgressSink, Severity};

/// Exit code reported when the script was killed without one
const SIGNALED_EXIT_CODE: i32 = -1;

/// Terminal result of one build invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildResult {
    pub exit_code: i32,
    pub succeeded: bool,
}

impl BuildResult {
    pub fn from_code(exit_code: i32) -> Self {
        Self {
            exit_code,
            succeeded: exit_code == 0,
        }
    }
}

/// Runs the build script through the configured interpreter
#[derive(Debug, Clone)]
pub struct BuildRunner {
    interpreter: String,
    interpreter_args: Vec<String>,
}

impl BuildRunner {
    pub fn new(settings: &BuildSettings) -> Self {
        Self {
            interpreter: settings.interpreter.clone(),
            interpreter_args: settings.interpreter_args.clone(),
        }
    }

    /// Run `script` in `working_dir`, relaying each non-empty stdout and
    /// stderr line to `sink` as it arrives
    pub async fn run(
        &self,
        script: &Path,
        working_dir: &Path,
        sink: &ProgressSink,
    ) -> Result<BuildResult, BuildError> {
        let mut cmd = Command::new(&self.interpreter);
        cmd.args(&self.interpreter_args)
            .arg(script)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        #[cfg(windows)]
        {
            const CREATE_NO_WINDOW: u32 = 0x0800_0000;
            cmd.creation_flags(CREATE_NO_WINDOW);
        }

        sink.info(format!("Running build script: {}", script.display()));
        let mut child = cmd.spawn().map_err(|source| BuildError::Launch {
            interpreter: self.interpreter.clone(),
            source,
        })?;

        let stdout_task = child
            .stdout
            .take()
            .map(|out| tokio::spawn(relay_lines(out, sink.clone(), Severity::BuildOutput)));
        let stderr_task = child
            .stderr
            .take()
            .map(|err| tokio::spawn(relay_lines(err, sink.clone(), Severity::BuildError)));

        let status = child.wait().await?;

        for task in [stdout_task, stderr_task].into_iter().flatten() {
            match task.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => log::warn!("Build output stream ended with error: {e}"),
                Err(e) => log::warn!("Build output relay task failed: {e}"),
            }
        }

        let result = BuildResult::from_code(status.code().unwrap_or(SIGNALED_EXIT_CODE));
        if result.succeeded {
            sink.success("Build completed successfully!");
        } else {
            sink.error(format!("Build failed with exit code: {}", result.exit_code));
        }
        Ok(result)
    }
}

/// Forward newline-delimited output; invalid UTF-8 is replaced, blank lines
/// are dropped
async fn relay_lines<R>(stream: R, sink: ProgressSink, severity: Severity) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut segments = BufReader::new(stream).split(b'\n');
    while let Some(segment) = segments.next_segment().await? {
        let line = String::from_utf8_lossy(&segment);
        let line = line.trim_end_matches('\r');
        if !line.trim().is_empty() {
            sink.emit(severity, line);
        }
    }
    Ok(())
}
