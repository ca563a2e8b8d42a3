//! Unattended execution of vendor installers

use std::future::Future;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;

use crate::config::InstallSettings;
use crate::error::InstallError;

/// Runs an installer program to completion
pub trait Launch {
    /// Launch `program` with `args` and wait for it to exit.
    ///
    /// Returns the exit code, or `None` when the process was terminated
    /// without one (killed by a signal).
    fn run(
        &self,
        program: &Path,
        args: &[String],
    ) -> impl Future<Output = Result<Option<i32>, InstallError>>;
}

/// Launches installers with no console and no inherited stdio
#[derive(Debug, Clone)]
pub struct SilentLauncher {
    timeout: Duration,
}

impl SilentLauncher {
    pub fn new(settings: &InstallSettings) -> Self {
        Self::with_timeout(Duration::from_secs(settings.process_timeout_secs))
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Launch for SilentLauncher {
    async fn run(&self, program: &Path, args: &[String]) -> Result<Option<i32>, InstallError> {
        let program_name = program.display().to_string();
        log::debug!("Launching {program_name} {}", args.join(" "));

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        #[cfg(windows)]
        {
            const CREATE_NO_WINDOW: u32 = 0x0800_0000;
            cmd.creation_flags(CREATE_NO_WINDOW);
        }

        let mut child = cmd.spawn().map_err(|source| InstallError::Launch {
            program: program_name.clone(),
            source,
        })?;

        match timeout(self.timeout, child.wait()).await {
            Ok(Ok(status)) => Ok(status.code()),
            Ok(Err(source)) => Err(InstallError::Io {
                context: format!("Failed to wait for {program_name}"),
                source,
            }),
            Err(_) => {
                // kill_on_drop reaps the child once `child` goes out of scope
                Err(InstallError::Timeout {
                    program: program_name,
                    secs: self.timeout.as_secs(),
                })
            }
        }
    }
}
