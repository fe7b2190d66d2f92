//! Atlantic.Net implementation of the [`Driver`] contract.
//!
//! The driver owns an [`InstanceConfig`] and builds its API client on first
//! use through a connector. Power operations other than restart are not
//! offered by the provider and always fail with
//! [`DriverError::Unsupported`].

mod provision;
mod validate;

use std::future;
use std::sync::Arc;

use tracing::{debug, info};

use crate::api::{ApiError, AtlanticApi, AtlanticNetClient, InstanceId, RebootType, VmStatus};
use crate::config::{ConfigError, InstanceConfig};
use crate::driver::{BaseDriver, Driver, DriverError, DriverFuture, MachineState};
use crate::ssh::{CommandRunner, ProcessCommandRunner, SshTooling};
use crate::wait::WaitPolicy;

pub use validate::VM_LOCATIONS;

/// Identifier reported by [`Driver::driver_name`].
pub const DRIVER_NAME: &str = "atlanticnet";

/// Port the Docker daemon listens on.
pub const DOCKER_PORT: u16 = 2376;

/// Builds an API client from the machine's credentials.
pub type Connector<A> = Arc<dyn Fn(&InstanceConfig) -> Result<A, ApiError> + Send + Sync>;

/// Machine driver backed by the Atlantic.Net Cloud API.
pub struct AtlanticNetDriver<A = AtlanticNetClient, R = ProcessCommandRunner> {
    config: InstanceConfig,
    client: Option<A>,
    connector: Connector<A>,
    runner: R,
    tooling: SshTooling,
    wait: WaitPolicy,
}

impl AtlanticNetDriver {
    /// Creates a driver that talks to the public endpoint and shells out to
    /// the host's SSH tooling.
    #[must_use]
    pub fn new(config: InstanceConfig) -> Self {
        let connector: Connector<AtlanticNetClient> = Arc::new(|config: &InstanceConfig| {
            AtlanticNetClient::new(&config.api_key, &config.api_secret)
        });
        Self::with_parts(config, connector, ProcessCommandRunner)
    }
}

impl<A: AtlanticApi, R: CommandRunner> AtlanticNetDriver<A, R> {
    /// Creates a driver from explicit collaborators.
    #[must_use]
    pub fn with_parts(config: InstanceConfig, connector: Connector<A>, runner: R) -> Self {
        Self {
            config,
            client: None,
            connector,
            runner,
            tooling: SshTooling::default(),
            wait: WaitPolicy::default(),
        }
    }

    /// Overrides the polling cadence used while provisioning.
    #[must_use]
    pub const fn with_wait_policy(mut self, wait: WaitPolicy) -> Self {
        self.wait = wait;
        self
    }

    /// Overrides the SSH programs used while provisioning.
    #[must_use]
    pub fn with_tooling(mut self, tooling: SshTooling) -> Self {
        self.tooling = tooling;
        self
    }

    /// Machine record as currently known.
    #[must_use]
    pub const fn config(&self) -> &InstanceConfig {
        &self.config
    }

    /// Consumes the driver, returning the machine record for persistence.
    #[must_use]
    pub fn into_config(self) -> InstanceConfig {
        self.config
    }

    fn client(&mut self) -> Result<A, DriverError> {
        if let Some(client) = &self.client {
            return Ok(client.clone());
        }
        self.require_credentials()?;
        debug!("building Atlantic.Net API client");
        let client = (self.connector)(&self.config)?;
        self.client = Some(client.clone());
        Ok(client)
    }

    fn require_credentials(&self) -> Result<(), ConfigError> {
        for (value, env_var) in [
            (&self.config.api_key, "ATLANTIC_NET_API_KEY"),
            (&self.config.api_secret, "ATLANTIC_NET_API_SECRET"),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingField(format!(
                    "Atlantic.Net driver requires {env_var}"
                )));
            }
        }
        Ok(())
    }

    fn instance_id(&self) -> Result<InstanceId, DriverError> {
        self.config
            .instance_id
            .clone()
            .ok_or(DriverError::InstanceNotCreated)
    }

    async fn fetch_state(&mut self) -> Result<MachineState, DriverError> {
        let instance_id = self.instance_id()?;
        let client = self.client()?;
        let description = client.describe_instance(&instance_id).await?;
        Ok(machine_state(&description.status))
    }

    async fn docker_url(&mut self) -> Result<String, DriverError> {
        if self.fetch_state().await? != MachineState::Running {
            return Err(DriverError::HostNotRunning);
        }
        let ip = self
            .config
            .base
            .ip()
            .ok_or(DriverError::IpAddressNotSet)?;
        Ok(format!("tcp://{ip}:{DOCKER_PORT}"))
    }

    async fn reboot(&mut self) -> Result<(), DriverError> {
        if self.fetch_state().await? == MachineState::Starting {
            info!("Host is already starting");
            return Ok(());
        }
        let instance_id = self.instance_id()?;
        debug!(machine = %self.config.base.machine_name, "restarting");
        let result = self
            .client()?
            .reboot_instance(&instance_id, RebootType::Soft)
            .await?;
        if result.success {
            Ok(())
        } else {
            Err(DriverError::RebootFailed(instance_id))
        }
    }

    async fn terminate(&mut self) -> Result<(), DriverError> {
        let instance_id = self.instance_id()?;
        debug!(machine = %self.config.base.machine_name, "removing");
        let terminated = self.client()?.terminate_instance(&instance_id).await?;
        if terminated
            .iter()
            .any(|entry| entry.id == instance_id && entry.success)
        {
            Ok(())
        } else {
            Err(DriverError::RemoveFailed(instance_id))
        }
    }
}

/// Maps a provider status onto the host's lifecycle states.
#[must_use]
pub const fn machine_state(status: &VmStatus) -> MachineState {
    match status {
        VmStatus::AwaitingCreation | VmStatus::Creating | VmStatus::Restarting => {
            MachineState::Starting
        }
        VmStatus::Running => MachineState::Running,
        VmStatus::Stopped => MachineState::Stopped,
        VmStatus::Other(_) => MachineState::Error,
    }
}

fn unsupported<'a>() -> DriverFuture<'a, ()> {
    Box::pin(future::ready(Err::<(), _>(DriverError::Unsupported)))
}

impl<A, R> Driver for AtlanticNetDriver<A, R>
where
    A: AtlanticApi + 'static,
    R: CommandRunner + Clone + Send + Sync + 'static,
{
    fn driver_name(&self) -> &'static str {
        DRIVER_NAME
    }

    fn base(&self) -> &BaseDriver {
        &self.config.base
    }

    fn pre_create_check(&mut self) -> DriverFuture<'_, ()> {
        Box::pin(self.validate())
    }

    fn create(&mut self) -> DriverFuture<'_, ()> {
        Box::pin(self.provision())
    }

    fn state(&mut self) -> DriverFuture<'_, MachineState> {
        Box::pin(self.fetch_state())
    }

    fn url(&mut self) -> DriverFuture<'_, String> {
        Box::pin(self.docker_url())
    }

    fn start(&mut self) -> DriverFuture<'_, ()> {
        unsupported()
    }

    fn stop(&mut self) -> DriverFuture<'_, ()> {
        unsupported()
    }

    fn kill(&mut self) -> DriverFuture<'_, ()> {
        unsupported()
    }

    fn restart(&mut self) -> DriverFuture<'_, ()> {
        Box::pin(self.reboot())
    }

    fn remove(&mut self) -> DriverFuture<'_, ()> {
        Box::pin(self.terminate())
    }
}
