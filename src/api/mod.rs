//! Atlantic.Net Cloud API abstraction and its HTTP implementation.

mod client;
mod response;
mod signing;
mod types;

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

pub use client::{API_VERSION, AtlanticNetClient, DEFAULT_ENDPOINT};
pub use signing::sign;
pub use types::{
    InstanceDescription, InstanceId, LaunchedInstance, Plan, RebootResult, RebootType,
    RunInstanceRequest, SshKey, SshKeyId, TerminatedInstance, VmStatus,
};

/// Errors raised by API implementations.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ApiError {
    /// The provider answered with an error envelope.
    #[error("{action} failed: {message} (code {code})")]
    Provider {
        /// Action that was called.
        action: String,
        /// Provider error code.
        code: String,
        /// Provider error message.
        message: String,
    },
    /// The request could not be sent or the body could not be read.
    #[error("{action} request failed: {message}")]
    Transport {
        /// Action that was called.
        action: String,
        /// Transport error text.
        message: String,
    },
    /// The provider answered with a non-success HTTP status.
    #[error("{action} returned HTTP {status}: {body}")]
    Status {
        /// Action that was called.
        action: String,
        /// HTTP status code.
        status: u16,
        /// Response body, verbatim.
        body: String,
    },
    /// The response body did not match the expected shape.
    #[error("unexpected {action} response: {message}")]
    Decode {
        /// Action that was called.
        action: String,
        /// Decoder error text.
        message: String,
    },
    /// The HTTP client could not be constructed.
    #[error("failed to build API client: {0}")]
    Client(String),
}

/// Future returned by API operations.
pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ApiError>> + Send + 'a>>;

/// Remote operations the driver needs from the provider.
pub trait AtlanticApi: Clone + Send + Sync {
    /// Launches a server.
    fn run_instance<'a>(
        &'a self,
        request: &'a RunInstanceRequest,
    ) -> ApiFuture<'a, Vec<LaunchedInstance>>;

    /// Fetches the current status of a server.
    fn describe_instance<'a>(
        &'a self,
        instance_id: &'a InstanceId,
    ) -> ApiFuture<'a, InstanceDescription>;

    /// Terminates a server.
    fn terminate_instance<'a>(
        &'a self,
        instance_id: &'a InstanceId,
    ) -> ApiFuture<'a, Vec<TerminatedInstance>>;

    /// Reboots a server.
    fn reboot_instance<'a>(
        &'a self,
        instance_id: &'a InstanceId,
        reboot: RebootType,
    ) -> ApiFuture<'a, RebootResult>;

    /// Lists SSH keys registered with the account.
    fn list_ssh_keys(&self) -> ApiFuture<'_, Vec<SshKey>>;

    /// Lists plans, optionally filtered by name and platform.
    fn describe_plan<'a>(&'a self, plan_name: &'a str, platform: &'a str)
    -> ApiFuture<'a, Vec<Plan>>;
}
