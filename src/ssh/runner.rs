//! Command runner abstraction over external programs.

use std::ffi::OsString;
use std::process::Command;

use thiserror::Error;
use tokio::task;

/// Result of running an external command.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandOutput {
    /// Exit code reported by the process, if available.
    pub code: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl CommandOutput {
    /// Returns `true` when the exit code equals zero.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.code, Some(0))
    }

    /// Converts a non-zero exit into [`CommandError::Failure`].
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Failure`] unless the exit code is zero.
    pub fn into_success(self, program: &str) -> Result<Self, CommandError> {
        if self.is_success() {
            return Ok(self);
        }
        let status_text = self
            .code
            .map_or_else(|| String::from("unknown"), |code| code.to_string());
        Err(CommandError::Failure {
            program: program.to_owned(),
            status: self.code,
            status_text,
            stderr: self.stderr,
        })
    }
}

/// Errors raised while running external programs.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum CommandError {
    /// Raised when a command cannot be spawned.
    #[error("failed to spawn {program}: {message}")]
    Spawn {
        /// Command that failed to start.
        program: String,
        /// Operating system error string.
        message: String,
    },
    /// Raised when a command completes with a non-zero exit code.
    #[error("{program} exited with status {status_text}: {stderr}")]
    Failure {
        /// Command name used for the attempted operation.
        program: String,
        /// Exit status as reported by the OS.
        status: Option<i32>,
        /// Human readable representation of the exit status.
        status_text: String,
        /// Stderr captured from the process.
        stderr: String,
    },
}

/// Abstraction over command execution to support fakes in tests.
///
/// Implementations block until the program exits. Async callers go through
/// [`run_blocking`].
pub trait CommandRunner {
    /// Runs `program` with extra environment variables, capturing output.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Spawn`] if the command cannot be started.
    fn run_with_env(
        &self,
        program: &str,
        args: &[OsString],
        envs: &[(String, String)],
    ) -> Result<CommandOutput, CommandError>;

    /// Runs `program` with the given arguments, capturing stdout and stderr.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Spawn`] if the command cannot be started.
    fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, CommandError> {
        self.run_with_env(program, args, &[])
    }
}

/// Runs `job` with a clone of `runner` on tokio's blocking thread pool.
///
/// # Errors
///
/// Returns [`CommandError::Spawn`] naming `program` when the blocking task
/// panics or is cancelled.
pub async fn run_blocking<R, T, F>(runner: &R, program: &str, job: F) -> Result<T, CommandError>
where
    R: CommandRunner + Clone + Send + 'static,
    T: Send + 'static,
    F: FnOnce(&R) -> T + Send + 'static,
{
    let owned = runner.clone();
    task::spawn_blocking(move || job(&owned))
        .await
        .map_err(|err| CommandError::Spawn {
            program: program.to_owned(),
            message: err.to_string(),
        })
}

/// Real command runner that shells out to the host operating system.
#[derive(Clone, Debug, Default)]
pub struct ProcessCommandRunner;

impl CommandRunner for ProcessCommandRunner {
    fn run_with_env(
        &self,
        program: &str,
        args: &[OsString],
        envs: &[(String, String)],
    ) -> Result<CommandOutput, CommandError> {
        let output = Command::new(program)
            .args(args)
            .envs(envs.iter().map(|(key, value)| (key, value)))
            .output()
            .map_err(|err| CommandError::Spawn {
                program: program.to_owned(),
                message: err.to_string(),
            })?;

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn into_success_reports_exit_status() {
        let output = CommandOutput {
            code: Some(255),
            stdout: String::new(),
            stderr: String::from("Permission denied"),
        };

        let err = output
            .into_success("ssh")
            .expect_err("non-zero exit should fail");

        assert_eq!(
            err.to_string(),
            "ssh exited with status 255: Permission denied"
        );
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let err = ProcessCommandRunner
            .run("atlanticnet-definitely-missing-binary", &[])
            .expect_err("missing binary should fail to spawn");

        assert!(matches!(err, CommandError::Spawn { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn run_blocking_moves_the_job_off_the_async_thread() {
        let caller = std::thread::current().id();
        let runner = crate::test_support::ScriptedRunner::new();
        runner.push_success();

        let (worker, output) = run_blocking(&runner, "ssh", |inner| {
            (std::thread::current().id(), inner.run("ssh", &[]))
        })
        .await
        .unwrap_or_else(|err| panic!("blocking task should join: {err}"));

        assert_ne!(worker, caller);
        assert!(output.is_ok_and(|out| out.is_success()));
        assert_eq!(runner.invocations().len(), 1);
    }
}
