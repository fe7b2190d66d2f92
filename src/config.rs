//! Configuration loading via `ortho-config`.
//!
//! [`AtlanticNetConfig`] is the option surface a user controls. It merges
//! defaults, `atlanticnet.toml` discovery and `ATLANTIC_NET_*` environment
//! variables. [`InstanceConfig`] is the per-machine record the driver owns
//! once options have been applied.

use camino::Utf8PathBuf;
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::{InstanceId, SshKeyId};
use crate::driver::BaseDriver;
use crate::ssh::expand_tilde;

/// Default image used for new servers.
pub const DEFAULT_IMAGE_ID: &str = "ubuntu-14.04_64bit";

/// Default plan used for new servers.
pub const DEFAULT_PLAN_NAME: &str = "XS";

/// Default region used for new servers.
pub const DEFAULT_VM_LOCATION: &str = "USWEST1";

/// Default local private key copied when an SSH key id is configured.
pub const DEFAULT_SSH_KEY_PATH: &str = "~/.ssh/id_rsa";

/// Atlantic.Net options loaded from files and the environment.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(
    prefix = "ATLANTIC_NET",
    discovery(
        app_name = "atlanticnet",
        env_var = "ATLANTIC_NET_CONFIG_PATH",
        config_file_name = "atlanticnet.toml",
        dotfile_name = ".atlanticnet.toml",
        project_file_name = "atlanticnet.toml"
    )
)]
pub struct AtlanticNetConfig {
    /// API access key. Required.
    pub api_key: Option<String>,
    /// API private key used to sign requests. Required.
    pub api_secret: Option<String>,
    /// Identifier of an SSH key already registered with the account. When
    /// unset a fresh key pair is generated for the machine.
    pub ssh_key_id: Option<String>,
    /// Local private key matching `ssh_key_id`. Supports tilde expansion.
    #[ortho_config(default = DEFAULT_SSH_KEY_PATH.to_owned())]
    pub ssh_key_path: String,
    /// Image identifier for new servers.
    #[ortho_config(default = DEFAULT_IMAGE_ID.to_owned())]
    pub image_id: String,
    /// Plan name for new servers.
    #[ortho_config(default = DEFAULT_PLAN_NAME.to_owned())]
    pub plan_name: String,
    /// Region for new servers.
    #[ortho_config(default = DEFAULT_VM_LOCATION.to_owned())]
    pub vm_location: String,
    /// Whether the machine acts as a swarm master.
    #[ortho_config(default = false)]
    pub swarm_master: bool,
    /// Swarm host address.
    pub swarm_host: Option<String>,
    /// Swarm discovery token or URL.
    pub swarm_discovery: Option<String>,
}

/// Metadata for a configuration field, used to generate actionable error messages.
struct FieldMetadata {
    description: &'static str,
    env_var: &'static str,
    toml_key: &'static str,
}

impl FieldMetadata {
    const fn new(description: &'static str, env_var: &'static str, toml_key: &'static str) -> Self {
        Self {
            description,
            env_var,
            toml_key,
        }
    }
}

const API_KEY_FIELD: FieldMetadata =
    FieldMetadata::new("Atlantic.Net API key", "ATLANTIC_NET_API_KEY", "api_key");
const API_SECRET_FIELD: FieldMetadata = FieldMetadata::new(
    "Atlantic.Net API secret",
    "ATLANTIC_NET_API_SECRET",
    "api_secret",
);

impl AtlanticNetConfig {
    fn require_field<'a>(
        value: Option<&'a str>,
        metadata: &FieldMetadata,
    ) -> Result<&'a str, ConfigError> {
        match value.map(str::trim) {
            Some(found) if !found.is_empty() => Ok(found),
            _ => Err(ConfigError::MissingField(format!(
                "missing {}: set {} or add {} to atlanticnet.toml",
                metadata.description, metadata.env_var, metadata.toml_key
            ))),
        }
    }

    /// Loads configuration without attempting to parse CLI arguments. Values
    /// merge defaults, configuration files, and environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([std::ffi::OsString::from("atlanticnet")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Checks that both halves of the API credentials are present.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] naming the environment variable
    /// and file key that would supply the missing value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Self::require_field(self.api_key.as_deref(), &API_KEY_FIELD)?;
        Self::require_field(self.api_secret.as_deref(), &API_SECRET_FIELD)?;
        Ok(())
    }

    /// SSH key id with blank values treated as unset.
    #[must_use]
    pub fn ssh_key_id(&self) -> Option<SshKeyId> {
        self.ssh_key_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(SshKeyId::new)
    }
}

/// Errors raised during configuration loading and validation.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty or missing.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
}

impl From<ortho_config::OrthoError> for ConfigError {
    fn from(value: ortho_config::OrthoError) -> Self {
        Self::Parse(value.to_string())
    }
}

/// Named option offered to the host when creating a machine.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CreateFlag {
    /// Flag name as exposed on the command line.
    pub name: &'static str,
    /// Environment variable that supplies the value.
    pub env_var: &'static str,
    /// One-line description.
    pub usage: &'static str,
    /// Default value, if any.
    pub default: Option<&'static str>,
}

/// Catalogue of options accepted when creating a machine.
#[must_use]
pub const fn create_flags() -> [CreateFlag; 7] {
    [
        CreateFlag {
            name: "atlantic-net-api-key",
            env_var: "ATLANTIC_NET_API_KEY",
            usage: "Atlantic.Net API key",
            default: None,
        },
        CreateFlag {
            name: "atlantic-net-api-secret",
            env_var: "ATLANTIC_NET_API_SECRET",
            usage: "Atlantic.Net API secret",
            default: None,
        },
        CreateFlag {
            name: "atlantic-net-ssh-key-id",
            env_var: "ATLANTIC_NET_SSH_KEY_ID",
            usage: "Atlantic.Net SSH key id",
            default: None,
        },
        CreateFlag {
            name: "atlantic-net-ssh-key-path",
            env_var: "ATLANTIC_NET_SSH_KEY_PATH",
            usage: "Atlantic.Net SSH key path",
            default: Some(DEFAULT_SSH_KEY_PATH),
        },
        CreateFlag {
            name: "atlantic-net-image-id",
            env_var: "ATLANTIC_NET_IMAGE_ID",
            usage: "Atlantic.Net image id",
            default: Some(DEFAULT_IMAGE_ID),
        },
        CreateFlag {
            name: "atlantic-net-plan-name",
            env_var: "ATLANTIC_NET_PLAN_NAME",
            usage: "Atlantic.Net plan name",
            default: Some(DEFAULT_PLAN_NAME),
        },
        CreateFlag {
            name: "atlantic-net-vm-location",
            env_var: "ATLANTIC_NET_VM_LOCATION",
            usage: "Atlantic.Net vm location",
            default: Some(DEFAULT_VM_LOCATION),
        },
    ]
}

/// Per-machine configuration owned by the driver and persisted by the host.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct InstanceConfig {
    /// Host-managed defaults shared by every driver.
    #[serde(flatten)]
    pub base: BaseDriver,
    /// API access key.
    pub api_key: String,
    /// API private key.
    pub api_secret: String,
    /// Local private key copied into the store when `ssh_key_id` is set.
    pub local_key_path: Utf8PathBuf,
    /// Image identifier.
    pub image_id: String,
    /// Plan name.
    pub plan_name: String,
    /// Region identifier.
    pub vm_location: String,
    /// Registered SSH key, if any.
    #[serde(default)]
    pub ssh_key_id: Option<SshKeyId>,
    /// Remote instance handle, set once creation succeeds.
    #[serde(default)]
    pub instance_id: Option<InstanceId>,
}

impl InstanceConfig {
    /// Applies loaded options to a fresh machine record.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when the API key or secret is
    /// missing or blank.
    pub fn from_options(
        machine_name: &str,
        store_path: impl Into<Utf8PathBuf>,
        options: &AtlanticNetConfig,
    ) -> Result<Self, ConfigError> {
        let api_key = AtlanticNetConfig::require_field(options.api_key.as_deref(), &API_KEY_FIELD)?;
        let api_secret =
            AtlanticNetConfig::require_field(options.api_secret.as_deref(), &API_SECRET_FIELD)?;

        let mut base = BaseDriver::new(machine_name, store_path);
        base.swarm_master = options.swarm_master;
        base.swarm_host.clone_from(&options.swarm_host);
        base.swarm_discovery.clone_from(&options.swarm_discovery);

        Ok(Self {
            base,
            api_key: api_key.to_owned(),
            api_secret: api_secret.to_owned(),
            local_key_path: Utf8PathBuf::from(expand_tilde(&options.ssh_key_path)),
            image_id: options.image_id.clone(),
            plan_name: options.plan_name.clone(),
            vm_location: options.vm_location.clone(),
            ssh_key_id: options.ssh_key_id(),
            instance_id: None,
        })
    }
}
