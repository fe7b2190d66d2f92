//! Atlantic.Net Cloud machine driver.
//!
//! The crate implements the lifecycle contract a host machine manager
//! expects from a driver (create, inspect, restart, remove) on top of the
//! Atlantic.Net Cloud API, and bootstraps SSH access to new servers.

pub mod api;
pub mod atlanticnet;
pub mod config;
pub mod driver;
pub mod ssh;
pub mod store;
pub mod test_support;
pub mod wait;

pub use api::{ApiError, AtlanticApi, AtlanticNetClient};
pub use atlanticnet::{AtlanticNetDriver, Connector, DRIVER_NAME, VM_LOCATIONS};
pub use config::{AtlanticNetConfig, ConfigError, CreateFlag, InstanceConfig, create_flags};
pub use driver::{BaseDriver, Driver, DriverError, DriverFuture, MachineState};
pub use ssh::{CommandRunner, ProcessCommandRunner, expand_tilde};
pub use store::{MachineStore, StoreError};
pub use wait::{WaitPolicy, WaitTimeout, poll_until};
