//! SSH plumbing used while provisioning hosts.
//!
//! The driver never links an SSH library. It shells out to `ssh`,
//! `sshpass` and `ssh-keygen` through a [`CommandRunner`] so tests can
//! script every invocation.

mod keys;
mod runner;
mod session;

pub use keys::{KeyError, copy_private_key, generate_key_pair, public_key_path, read_public_key};
pub use runner::{CommandError, CommandOutput, CommandRunner, ProcessCommandRunner, run_blocking};
pub use session::{PasswordSession, authorize_key_command};

/// External programs used for SSH work.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SshTooling {
    /// OpenSSH client binary.
    pub ssh_bin: String,
    /// `sshpass` binary used for password logins.
    pub sshpass_bin: String,
    /// Key generation binary.
    pub ssh_keygen_bin: String,
}

impl Default for SshTooling {
    fn default() -> Self {
        Self {
            ssh_bin: String::from("ssh"),
            sshpass_bin: String::from("sshpass"),
            ssh_keygen_bin: String::from("ssh-keygen"),
        }
    }
}

/// Expands a leading `~/` to the current user's home directory.
///
/// ```
/// # use atlanticnet::ssh::expand_tilde;
/// assert_eq!(expand_tilde("/absolute/path"), "/absolute/path");
/// ```
#[must_use]
pub fn expand_tilde(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = std::env::var_os("HOME")
    {
        return format!("{}/{rest}", home.to_string_lossy());
    }
    path.to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::EnvGuard;

    #[tokio::test]
    async fn expand_tilde_uses_home() {
        let _guard = EnvGuard::set_vars(&[("HOME", "/home/tester")]).await;

        assert_eq!(expand_tilde("~/.ssh/id_rsa"), "/home/tester/.ssh/id_rsa");
        assert_eq!(expand_tilde("relative/id_rsa"), "relative/id_rsa");
    }
}
