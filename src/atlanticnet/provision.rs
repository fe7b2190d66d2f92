//! Server creation and SSH bootstrap.

use tracing::{debug, info};

use crate::api::{AtlanticApi, InstanceId, LaunchedInstance, RunInstanceRequest};
use crate::driver::{DriverError, MachineState};
use crate::ssh::{
    CommandRunner, PasswordSession, authorize_key_command, copy_private_key, generate_key_pair,
    run_blocking,
};
use crate::wait::poll_until;

use super::{AtlanticNetDriver, machine_state};

impl<A, R> AtlanticNetDriver<A, R>
where
    A: AtlanticApi,
    R: CommandRunner + Clone + Send + 'static,
{
    pub(super) async fn provision(&mut self) -> Result<(), DriverError> {
        info!("Creating Atlantic.Net VPS...");
        self.require_credentials()?;

        let public_key = self.prepare_ssh_key().await?;
        let client = self.client()?;
        let request = RunInstanceRequest {
            server_name: self.config.base.machine_name.clone(),
            image_id: self.config.image_id.clone(),
            plan_name: self.config.plan_name.clone(),
            vm_location: self.config.vm_location.clone(),
            key_id: self.config.ssh_key_id.clone(),
        };
        let instance = client
            .run_instance(&request)
            .await?
            .into_iter()
            .next()
            .ok_or(DriverError::EmptyRunInstance)?;

        self.config.instance_id = Some(instance.id.clone());
        self.config.base.ip_address = Some(instance.ip_address.clone());
        info!(
            instance_id = %instance.id,
            ip = %instance.ip_address,
            "Created Atlantic.Net VPS"
        );

        match public_key {
            Some(key) => self.install_public_key(&client, instance, &key).await,
            None => Ok(()),
        }
    }

    /// Copies the configured key into the store, or generates a new pair
    /// and returns its public half for injection.
    async fn prepare_ssh_key(&self) -> Result<Option<String>, DriverError> {
        let key_path = self.config.base.ssh_key_path();
        if self.config.ssh_key_id.is_some() {
            copy_private_key(&self.config.local_key_path, &key_path)?;
            return Ok(None);
        }
        let tooling = self.tooling.clone();
        let program = tooling.ssh_keygen_bin.clone();
        let public_key = run_blocking(&self.runner, &program, move |runner| {
            generate_key_pair(runner, &tooling, &key_path)
        })
        .await??;
        Ok(Some(public_key))
    }

    async fn install_public_key(
        &self,
        client: &A,
        instance: LaunchedInstance,
        public_key: &str,
    ) -> Result<(), DriverError> {
        let password = instance
            .password
            .filter(|password| !password.is_empty())
            .ok_or_else(|| DriverError::MissingPassword(instance.id.clone()))?;
        let host = self
            .config
            .base
            .ip()
            .ok_or(DriverError::IpAddressNotSet)?
            .to_owned();

        info!("Waiting for machine to be running, this may take a few minutes...");
        self.wait_for_running(client, &instance.id).await?;

        let session = PasswordSession {
            user: instance
                .username
                .filter(|user| !user.is_empty())
                .unwrap_or_else(|| self.config.base.ssh_user.clone()),
            host,
            port: self.config.base.ssh_port,
            password,
        };

        info!("Waiting for SSH to be available...");
        let program = self.tooling.sshpass_bin.clone();
        let runner = &self.runner;
        poll_until(self.wait, || {
            let tooling = self.tooling.clone();
            let target = session.clone();
            let bin = program.as_str();
            async move {
                run_blocking(runner, bin, move |inner| target.probe(inner, &tooling))
                    .await
                    .unwrap_or(false)
            }
        })
        .await
        .map_err(|_| DriverError::Timeout {
            action: "accept SSH connections",
            instance_id: instance.id.clone(),
        })?;

        let tooling = self.tooling.clone();
        let command = authorize_key_command(public_key);
        let output = run_blocking(runner, &program, move |inner| {
            session.run(inner, &tooling, &command)
        })
        .await??;
        debug!(stdout = %output.stdout, stderr = %output.stderr, "installed public key");
        Ok(())
    }

    async fn wait_for_running(
        &self,
        client: &A,
        instance_id: &InstanceId,
    ) -> Result<(), DriverError> {
        poll_until(self.wait, || async move {
            match client.describe_instance(instance_id).await {
                Ok(description) => machine_state(&description.status) == MachineState::Running,
                Err(err) => {
                    debug!(%instance_id, error = %err, "state poll failed");
                    false
                }
            }
        })
        .await
        .map_err(|_| DriverError::Timeout {
            action: "reach the Running state",
            instance_id: instance_id.clone(),
        })
    }
}
