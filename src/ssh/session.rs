//! Password-authenticated SSH sessions driven through `sshpass`.

use std::ffi::OsString;

use shell_escape::unix::escape;

use super::SshTooling;
use super::runner::{CommandError, CommandOutput, CommandRunner};

const PASSWORD_ENV: &str = "SSHPASS";
const CONNECT_TIMEOUT_SECS: u16 = 10;

/// Connection details for a host that only accepts password logins.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PasswordSession {
    /// Login user.
    pub user: String,
    /// Host name or IP address.
    pub host: String,
    /// SSH port.
    pub port: u16,
    /// Login password, passed to `sshpass` through the environment.
    pub password: String,
}

impl PasswordSession {
    /// Runs `command` on the remote host and fails on a non-zero exit.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Spawn`] when `sshpass` cannot be started and
    /// [`CommandError::Failure`] when the remote command exits non-zero.
    pub fn run<R: CommandRunner>(
        &self,
        runner: &R,
        tooling: &SshTooling,
        command: &str,
    ) -> Result<CommandOutput, CommandError> {
        let args = self.build_args(tooling, command);
        let envs = [(String::from(PASSWORD_ENV), self.password.clone())];
        runner
            .run_with_env(&tooling.sshpass_bin, &args, &envs)?
            .into_success(&tooling.sshpass_bin)
    }

    /// Returns `true` once the host accepts a trivial command.
    pub fn probe<R: CommandRunner>(&self, runner: &R, tooling: &SshTooling) -> bool {
        self.run(runner, tooling, "exit 0").is_ok()
    }

    fn build_args(&self, tooling: &SshTooling, command: &str) -> Vec<OsString> {
        let mut args = vec![
            OsString::from("-e"),
            OsString::from(&tooling.ssh_bin),
            OsString::from("-p"),
            OsString::from(self.port.to_string()),
        ];
        for option in [
            String::from("StrictHostKeyChecking=no"),
            String::from("UserKnownHostsFile=/dev/null"),
            String::from("PubkeyAuthentication=no"),
            String::from("LogLevel=quiet"),
            format!("ConnectTimeout={CONNECT_TIMEOUT_SECS}"),
        ] {
            args.push(OsString::from("-o"));
            args.push(OsString::from(option));
        }
        args.push(OsString::from(format!("{}@{}", self.user, self.host)));
        args.push(OsString::from(command));
        args
    }
}

/// Remote shell command that appends `public_key` to `authorized_keys`.
#[must_use]
pub fn authorize_key_command(public_key: &str) -> String {
    format!(
        "mkdir -p ~/.ssh && chmod 700 ~/.ssh && echo {} >> ~/.ssh/authorized_keys",
        escape(public_key.trim().into())
    )
}
