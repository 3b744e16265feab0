//! Starting the target program.
//!
//! The pre-launch command is run to completion; the target itself is
//! spawned and forgotten.

use std::process::{Command, Stdio};

use custom_splasher_core::logging::targets;

pub use crate::error::LaunchError;

/// Starts processes on behalf of the splash lifecycle.
pub trait ProcessLauncher {
    /// Run `command` through the system shell and wait for it.
    ///
    /// A non-zero exit is reported as [`LaunchError::ExitStatus`].
    fn run_command(&mut self, command: &str) -> Result<(), LaunchError>;

    /// Start `target` through the system shell without waiting for it.
    fn spawn(&mut self, target: &str) -> Result<(), LaunchError>;
}

/// Launches through the platform shell.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLauncher;

impl SystemLauncher {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessLauncher for SystemLauncher {
    fn run_command(&mut self, command: &str) -> Result<(), LaunchError> {
        let status = shell(command)
            .status()
            .map_err(|source| LaunchError::Spawn {
                command: command.to_string(),
                source,
            })?;

        if !status.success() {
            return Err(LaunchError::ExitStatus {
                command: command.to_string(),
                status: status.to_string(),
            });
        }

        tracing::info!(target: targets::LAUNCHER, command, "pre-launch command finished");
        Ok(())
    }

    fn spawn(&mut self, target: &str) -> Result<(), LaunchError> {
        let child = detached(target)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| LaunchError::Spawn {
                command: target.to_string(),
                source,
            })?;

        tracing::info!(target: targets::LAUNCHER, command = target, pid = child.id(), "target spawned");
        Ok(())
    }
}

#[cfg(windows)]
fn shell(command: &str) -> Command {
    use std::os::windows::process::CommandExt;

    let mut cmd = Command::new("cmd");
    cmd.arg("/C").raw_arg(command);
    cmd
}

#[cfg(not(windows))]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

/// A minimised console running `target`, independent of this process.
#[cfg(windows)]
fn detached(target: &str) -> Command {
    use std::os::windows::process::CommandExt;

    let mut cmd = Command::new("cmd");
    cmd.raw_arg(format!("/C start \"\" /min cmd /c \"{target}\""));
    cmd
}

/// `target` in its own process group so it outlives the overlay.
#[cfg(not(windows))]
fn detached(target: &str) -> Command {
    use std::os::unix::process::CommandExt;

    let mut cmd = shell(target);
    cmd.process_group(0);
    cmd
}
