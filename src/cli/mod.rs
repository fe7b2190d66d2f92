//! Command-line interface definitions for the driver binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.

use clap::{Args, Parser, Subcommand};

/// Default root of the machine store.
pub(crate) const DEFAULT_STORE_PATH: &str = "~/.docker/machine";

/// Top-level CLI for the `docker-machine-driver-atlanticnet` binary.
#[derive(Debug, Parser)]
#[command(
    name = "docker-machine-driver-atlanticnet",
    about = "Create and manage Docker hosts on Atlantic.Net Cloud",
    arg_required_else_help = true
)]
pub(crate) struct Cli {
    /// Root of the machine store holding records and SSH keys.
    #[arg(
        long,
        global = true,
        env = "MACHINE_STORAGE_PATH",
        default_value = DEFAULT_STORE_PATH,
        value_name = "PATH"
    )]
    pub(crate) store_path: String,
    /// Name of the machine to operate on.
    #[arg(long, short = 'm', global = true, value_name = "NAME")]
    pub(crate) machine_name: Option<String>,
    /// Lifecycle operation to run.
    #[command(subcommand)]
    pub(crate) command: Command,
}

/// Lifecycle operations exposed by the binary.
#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// List the options accepted when creating a machine.
    #[command(name = "flags")]
    Flags,
    /// Print the driver identifier.
    #[command(name = "driver-name")]
    DriverName,
    /// Validate options against the provider without creating anything.
    #[command(name = "pre-create-check")]
    PreCreateCheck(CreateArgs),
    /// Validate options, create the server, and install SSH access.
    #[command(name = "create")]
    Create(CreateArgs),
    /// Print the machine state.
    #[command(name = "state")]
    State,
    /// Print the machine's public IP address.
    #[command(name = "ip")]
    Ip,
    /// Print the Docker daemon URL.
    #[command(name = "url")]
    Url,
    /// Print the host name used for SSH.
    #[command(name = "ssh-hostname")]
    SshHostname,
    /// Power the machine on (not supported by the provider).
    #[command(name = "start")]
    Start,
    /// Power the machine off (not supported by the provider).
    #[command(name = "stop")]
    Stop,
    /// Power the machine off immediately (not supported by the provider).
    #[command(name = "kill")]
    Kill,
    /// Soft-reboot the machine.
    #[command(name = "restart")]
    Restart,
    /// Terminate the server and delete its local record.
    #[command(name = "remove")]
    Remove,
}

/// Per-invocation overrides for the configured create options.
#[derive(Clone, Debug, Default, Args)]
pub(crate) struct CreateArgs {
    /// Image identifier for the new server.
    #[arg(long = "atlantic-net-image-id", value_name = "IMAGE")]
    pub(crate) image_id: Option<String>,
    /// Plan name for the new server.
    #[arg(long = "atlantic-net-plan-name", value_name = "PLAN")]
    pub(crate) plan_name: Option<String>,
    /// Region for the new server.
    #[arg(long = "atlantic-net-vm-location", value_name = "LOCATION")]
    pub(crate) vm_location: Option<String>,
    /// Registered SSH key id; omit to generate a key pair.
    #[arg(long = "atlantic-net-ssh-key-id", value_name = "ID")]
    pub(crate) ssh_key_id: Option<String>,
    /// Local private key matching the registered SSH key id.
    #[arg(long = "atlantic-net-ssh-key-path", value_name = "PATH")]
    pub(crate) ssh_key_path: Option<String>,
}
