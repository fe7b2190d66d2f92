//! Default machine record shared by every driver.

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

/// Default remote user for SSH sessions.
pub const DEFAULT_SSH_USER: &str = "root";

/// Default remote SSH port.
pub const DEFAULT_SSH_PORT: u16 = 22;

/// File name of the machine's private key inside its store directory.
pub const SSH_KEY_FILE_NAME: &str = "id_rsa";

/// Host-owned fields every driver carries, with default accessors.
///
/// Drivers compose this record and forward to it through the default methods
/// of [`crate::Driver`].
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct BaseDriver {
    /// Host-assigned machine name.
    pub machine_name: String,
    /// Root of the host store.
    pub store_path: Utf8PathBuf,
    /// Public IP address recorded after creation.
    #[serde(rename = "IPAddress", default)]
    pub ip_address: Option<String>,
    /// Remote SSH user.
    #[serde(rename = "SSHUser")]
    pub ssh_user: String,
    /// Remote SSH port.
    #[serde(rename = "SSHPort")]
    pub ssh_port: u16,
    /// Explicit private key path; falls back to the store when unset.
    #[serde(rename = "SSHKeyPath", default)]
    pub ssh_key_path: Option<Utf8PathBuf>,
    /// Whether the machine is a swarm master.
    #[serde(default)]
    pub swarm_master: bool,
    /// Swarm manager address.
    #[serde(default)]
    pub swarm_host: Option<String>,
    /// Swarm discovery token or URL.
    #[serde(default)]
    pub swarm_discovery: Option<String>,
}

impl BaseDriver {
    /// Creates a record for `machine_name` rooted at `store_path`.
    #[must_use]
    pub fn new(machine_name: impl Into<String>, store_path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            machine_name: machine_name.into(),
            store_path: store_path.into(),
            ip_address: None,
            ssh_user: DEFAULT_SSH_USER.to_owned(),
            ssh_port: DEFAULT_SSH_PORT,
            ssh_key_path: None,
            swarm_master: false,
            swarm_host: None,
            swarm_discovery: None,
        }
    }

    /// Directory holding this machine's files.
    #[must_use]
    pub fn machine_dir(&self) -> Utf8PathBuf {
        self.store_path.join("machines").join(&self.machine_name)
    }

    /// Joins `file` onto the machine directory.
    #[must_use]
    pub fn resolve_store_path(&self, file: impl AsRef<Utf8Path>) -> Utf8PathBuf {
        self.machine_dir().join(file)
    }

    /// Private key path used for SSH access to the machine.
    #[must_use]
    pub fn ssh_key_path(&self) -> Utf8PathBuf {
        self.ssh_key_path
            .clone()
            .unwrap_or_else(|| self.resolve_store_path(SSH_KEY_FILE_NAME))
    }

    /// Returns the recorded IP when it is usable.
    ///
    /// Empty strings and the provider's `0` placeholder count as unset.
    #[must_use]
    pub fn ip(&self) -> Option<&str> {
        self.ip_address
            .as_deref()
            .map(str::trim)
            .filter(|ip| !ip.is_empty() && *ip != "0")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn ssh_key_path_defaults_into_store() {
        let base = BaseDriver::new("default", "path");
        assert_eq!(base.ssh_key_path(), base.resolve_store_path("id_rsa"));
        assert_eq!(
            base.ssh_key_path(),
            Utf8PathBuf::from("path/machines/default/id_rsa")
        );
    }

    #[rstest]
    fn explicit_ssh_key_path_wins() {
        let base = BaseDriver {
            ssh_key_path: Some(Utf8PathBuf::from("/keys/custom")),
            ..BaseDriver::new("default", "path")
        };
        assert_eq!(base.ssh_key_path(), Utf8PathBuf::from("/keys/custom"));
    }

    #[rstest]
    #[case(None)]
    #[case(Some(""))]
    #[case(Some("0"))]
    fn placeholder_ips_are_unset(#[case] raw: Option<&str>) {
        let base = BaseDriver {
            ip_address: raw.map(str::to_owned),
            ..BaseDriver::new("default", "path")
        };
        assert_eq!(base.ip(), None);
    }

    #[rstest]
    fn defaults_use_root_on_port_22() {
        let base = BaseDriver::new("default", "path");
        assert_eq!(base.ssh_user, "root");
        assert_eq!(base.ssh_port, 22);
    }
}
