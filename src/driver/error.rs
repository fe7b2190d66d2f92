//! Errors surfaced by driver lifecycle operations.

use camino::Utf8PathBuf;
use thiserror::Error;

use crate::api::{ApiError, InstanceId};
use crate::config::ConfigError;
use crate::ssh::{CommandError, KeyError};

/// Message returned by power operations the provider cannot perform.
pub const UNSUPPORTED_MESSAGE: &str =
    "Atlantic.Net doesn't support this. Please restart the machine instead.";

/// Errors raised by lifecycle operations.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum DriverError {
    /// Options were missing or could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The configured SSH key id is not registered with the account.
    #[error("Ssh Key Id {0} is invalid")]
    InvalidSshKeyId(String),
    /// The configured region is not offered.
    #[error("VM location {0} is invalid")]
    InvalidVmLocation(String),
    /// The configured plan is not offered.
    #[error("Plan name {0} is invalid")]
    InvalidPlan(String),
    /// A remote call failed.
    #[error(transparent)]
    Api(#[from] ApiError),
    /// The provider cannot perform the requested power operation.
    #[error("{}", UNSUPPORTED_MESSAGE)]
    Unsupported,
    /// The instance is not in the Running state.
    #[error("Host is not running")]
    HostNotRunning,
    /// No usable IP address has been recorded.
    #[error("IP address is not set")]
    IpAddressNotSet,
    /// A remote operation was requested before the instance existed.
    #[error("instance has not been created yet")]
    InstanceNotCreated,
    /// Termination did not report success for the instance.
    #[error("Error removing instance {0}")]
    RemoveFailed(InstanceId),
    /// The reboot request was rejected.
    #[error("Error rebooting instance {0}")]
    RebootFailed(InstanceId),
    /// `run-instance` succeeded but described no instance.
    #[error("run-instance returned no instances")]
    EmptyRunInstance,
    /// The provider issued no password for a generated-key bootstrap.
    #[error("no root password was issued for instance {0}")]
    MissingPassword(InstanceId),
    /// A bounded wait elapsed.
    #[error("timed out waiting for instance {instance_id} to {action}")]
    Timeout {
        /// What the driver was waiting for.
        action: &'static str,
        /// Instance being waited on.
        instance_id: InstanceId,
    },
    /// SSH key material could not be prepared.
    #[error("SSH key {path}: {message}")]
    SshKey {
        /// Key file involved.
        path: Utf8PathBuf,
        /// Underlying failure.
        message: String,
    },
    /// An external program failed.
    #[error(transparent)]
    Command(#[from] CommandError),
}

impl From<KeyError> for DriverError {
    fn from(value: KeyError) -> Self {
        match value {
            KeyError::Io { path, message } => Self::SshKey { path, message },
            KeyError::EmptyPublicKey { path } => Self::SshKey {
                path,
                message: String::from("public key is empty"),
            },
            KeyError::Command(err) => Self::Command(err),
        }
    }
}
