//! Request and result types for the Atlantic.Net Cloud API.

use std::fmt;
use std::ops::Deref;

use serde::{Deserialize, Serialize};

macro_rules! newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps a raw identifier.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Borrows the raw identifier.
            #[must_use]
            pub const fn as_str(&self) -> &str {
                self.0.as_str()
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                self.as_str()
            }
        }

        impl Deref for $name {
            type Target = str;
            fn deref(&self) -> &Self::Target {
                self.as_str()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

newtype!(
    /// Provider identifier of a cloud server.
    InstanceId
);
newtype!(
    /// Provider identifier of a registered SSH public key.
    SshKeyId
);

/// Parameters for `run-instance`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RunInstanceRequest {
    /// Server name shown in the provider console.
    pub server_name: String,
    /// Image identifier, for example `ubuntu-14.04_64bit`.
    pub image_id: String,
    /// Plan name, for example `XS`.
    pub plan_name: String,
    /// Region identifier, for example `USWEST1`.
    pub vm_location: String,
    /// Registered SSH key installed by the provider, if any.
    pub key_id: Option<SshKeyId>,
}

/// One server returned by `run-instance`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LaunchedInstance {
    /// Identifier of the new server.
    pub id: InstanceId,
    /// Public IPv4 address.
    pub ip_address: String,
    /// Root login issued by the provider.
    pub username: Option<String>,
    /// Root password issued by the provider.
    pub password: Option<String>,
}

/// Raw provider status of a server.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum VmStatus {
    /// Queued for creation.
    AwaitingCreation,
    /// Being built.
    Creating,
    /// Reboot in progress.
    Restarting,
    /// Up and reachable.
    Running,
    /// Powered off.
    Stopped,
    /// Any other status string, preserved verbatim.
    Other(String),
}

impl VmStatus {
    /// Parses a provider status, ignoring case and separators.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let normalised: String = raw
            .trim()
            .chars()
            .filter(|ch| !matches!(ch, '_' | '-' | ' '))
            .map(|ch| ch.to_ascii_lowercase())
            .collect();
        match normalised.as_str() {
            "awaitingcreation" => Self::AwaitingCreation,
            "creating" => Self::Creating,
            "restarting" => Self::Restarting,
            "running" => Self::Running,
            "stopped" => Self::Stopped,
            _ => Self::Other(raw.to_owned()),
        }
    }
}

/// Details returned by `describe-instance`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InstanceDescription {
    /// Server identifier.
    pub id: InstanceId,
    /// Current provider status.
    pub status: VmStatus,
    /// Public IPv4 address, when assigned.
    pub ip_address: Option<String>,
}

/// Per-server outcome of `terminate-instance`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TerminatedInstance {
    /// Server identifier.
    pub id: InstanceId,
    /// Whether the provider accepted the termination.
    pub success: bool,
    /// Provider message accompanying the result.
    pub message: Option<String>,
}

/// Reboot flavour accepted by `reboot-instance`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RebootType {
    /// Graceful restart through the guest.
    Soft,
    /// Power cycle.
    Hard,
}

impl RebootType {
    /// Query value sent to the API.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Soft => "soft",
            Self::Hard => "hard",
        }
    }
}

/// Outcome of `reboot-instance`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RebootResult {
    /// Whether the provider accepted the reboot.
    pub success: bool,
    /// Provider message accompanying the result.
    pub message: Option<String>,
}

/// SSH public key registered with the account.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SshKey {
    /// Key identifier.
    pub id: SshKeyId,
    /// Display name.
    pub name: String,
}

/// Plan returned by `describe-plan`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Plan {
    /// Plan name, for example `XS`.
    pub name: String,
    /// Platform the plan applies to, for example `linux`.
    pub platform: Option<String>,
}
