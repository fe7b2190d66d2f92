//! Host lifecycle contract implemented by machine drivers.

mod base;
mod error;
mod state;

use std::future::Future;
use std::pin::Pin;

use camino::Utf8PathBuf;

pub use base::{BaseDriver, DEFAULT_SSH_PORT, DEFAULT_SSH_USER, SSH_KEY_FILE_NAME};
pub use error::{DriverError, UNSUPPORTED_MESSAGE};
pub use state::MachineState;

/// Future returned by lifecycle operations.
pub type DriverFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, DriverError>> + Send + 'a>>;

/// Operations the host invokes on a machine driver.
///
/// Accessors for SSH details and the store layout forward to
/// [`BaseDriver`] unless a driver overrides them.
pub trait Driver {
    /// Stable driver identifier.
    fn driver_name(&self) -> &'static str;

    /// Host-owned record the default accessors read from.
    fn base(&self) -> &BaseDriver;

    /// Remote SSH user.
    fn ssh_username(&self) -> &str {
        &self.base().ssh_user
    }

    /// Remote SSH port.
    fn ssh_port(&self) -> u16 {
        self.base().ssh_port
    }

    /// Private key used for SSH access.
    fn ssh_key_path(&self) -> Utf8PathBuf {
        self.base().ssh_key_path()
    }

    /// Joins `file` onto the machine's store directory.
    fn resolve_store_path(&self, file: &str) -> Utf8PathBuf {
        self.base().resolve_store_path(file)
    }

    /// Public IP address of the machine.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::IpAddressNotSet`] when no usable address has
    /// been recorded.
    fn ip(&self) -> Result<String, DriverError> {
        self.base()
            .ip()
            .map(str::to_owned)
            .ok_or(DriverError::IpAddressNotSet)
    }

    /// Host name used for SSH connections.
    ///
    /// # Errors
    ///
    /// Same as [`Driver::ip`].
    fn ssh_hostname(&self) -> Result<String, DriverError> {
        self.ip()
    }

    /// Validates options against the provider before anything is created.
    fn pre_create_check(&mut self) -> DriverFuture<'_, ()>;

    /// Creates the machine and prepares SSH access.
    fn create(&mut self) -> DriverFuture<'_, ()>;

    /// Current lifecycle state.
    fn state(&mut self) -> DriverFuture<'_, MachineState>;

    /// Docker daemon URL.
    fn url(&mut self) -> DriverFuture<'_, String>;

    /// Powers the machine on.
    fn start(&mut self) -> DriverFuture<'_, ()>;

    /// Powers the machine off gracefully.
    fn stop(&mut self) -> DriverFuture<'_, ()>;

    /// Powers the machine off immediately.
    fn kill(&mut self) -> DriverFuture<'_, ()>;

    /// Restarts the machine.
    fn restart(&mut self) -> DriverFuture<'_, ()>;

    /// Destroys the machine.
    fn remove(&mut self) -> DriverFuture<'_, ()>;
}
