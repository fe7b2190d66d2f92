//! Pre-create checks against the provider's catalogue.

use tracing::info;

use crate::api::{AtlanticApi, SshKeyId};
use crate::driver::DriverError;
use crate::ssh::CommandRunner;

use super::AtlanticNetDriver;

/// Regions accepted for new servers.
pub const VM_LOCATIONS: [&str; 6] = [
    "USEAST1",
    "USEAST2",
    "USCENTRAL1",
    "USWEST1",
    "CAEAST1",
    "EUWEST1",
];

/// Platform used when listing plans.
const PLAN_PLATFORM: &str = "linux";

impl<A: AtlanticApi, R: CommandRunner> AtlanticNetDriver<A, R> {
    pub(super) async fn validate(&mut self) -> Result<(), DriverError> {
        info!("Validating Atlantic.Net VPS parameters...");
        self.require_credentials()?;

        if let Some(key_id) = self.config.ssh_key_id.clone() {
            self.validate_ssh_key(&key_id).await?;
        }
        validate_vm_location(&self.config.vm_location)?;
        self.validate_plan().await
    }

    async fn validate_ssh_key(&mut self, key_id: &SshKeyId) -> Result<(), DriverError> {
        let keys = self.client()?.list_ssh_keys().await?;
        if keys.iter().any(|key| key.id == *key_id) {
            return Ok(());
        }
        Err(DriverError::InvalidSshKeyId(key_id.to_string()))
    }

    async fn validate_plan(&mut self) -> Result<(), DriverError> {
        let plans = self.client()?.describe_plan("", PLAN_PLATFORM).await?;
        if plans.iter().any(|plan| plan.name == self.config.plan_name) {
            return Ok(());
        }
        Err(DriverError::InvalidPlan(self.config.plan_name.clone()))
    }
}

/// Checks `location` against [`VM_LOCATIONS`].
///
/// # Errors
///
/// Returns [`DriverError::InvalidVmLocation`] for any other value.
pub(crate) fn validate_vm_location(location: &str) -> Result<(), DriverError> {
    if VM_LOCATIONS.contains(&location) {
        Ok(())
    } else {
        Err(DriverError::InvalidVmLocation(location.to_owned()))
    }
}
