//! Binary entry point for the Atlantic.Net machine driver.

use std::io::{self, Write};
use std::process;

use clap::Parser;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use atlanticnet::{
    AtlanticApi, AtlanticNetConfig, AtlanticNetDriver, CommandRunner, ConfigError, DRIVER_NAME,
    Driver, DriverError, InstanceConfig, MachineStore, StoreError, create_flags, expand_tilde,
};

mod cli;

use cli::{Cli, Command, CreateArgs};

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Driver(#[from] DriverError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("--machine-name is required for {0}")]
    MissingMachineName(&'static str),
    #[error("machine {0} already exists")]
    AlreadyExists(String),
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();
    let exit_code = match execute(cli).await {
        Ok(output) => {
            if !output.is_empty() {
                writeln!(io::stdout(), "{output}").ok();
            }
            0
        }
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Runs one lifecycle command and returns the text to print on success.
async fn execute(cli: Cli) -> Result<String, CliError> {
    execute_with(cli, &AtlanticNetDriver::new).await
}

/// Runs one lifecycle command with drivers built by `connect`.
async fn execute_with<A, R, F>(cli: Cli, connect: &F) -> Result<String, CliError>
where
    A: AtlanticApi + 'static,
    R: CommandRunner + Clone + Send + Sync + 'static,
    F: Fn(InstanceConfig) -> AtlanticNetDriver<A, R>,
{
    let Cli {
        store_path,
        machine_name,
        command,
    } = cli;
    let store = MachineStore::new(expand_tilde(&store_path));
    let name = machine_name.as_deref();
    let load = |command_name: &'static str| -> Result<AtlanticNetDriver<A, R>, CliError> {
        let config = store.load(require_name(name, command_name)?)?;
        Ok(connect(config))
    };

    match command {
        Command::Flags => Ok(render_flags()),
        Command::DriverName => Ok(DRIVER_NAME.to_owned()),
        Command::PreCreateCheck(args) => {
            let config = new_instance(&store, require_name(name, "pre-create-check")?, &args)?;
            connect(config).pre_create_check().await?;
            Ok(String::new())
        }
        Command::Create(args) => create(&store, require_name(name, "create")?, &args, connect).await,
        Command::State => {
            let state = load("state")?.state().await?;
            Ok(state.to_string())
        }
        Command::Ip => Ok(load("ip")?.ip()?),
        Command::Url => Ok(load("url")?.url().await?),
        Command::SshHostname => Ok(load("ssh-hostname")?.ssh_hostname()?),
        Command::Start => {
            load("start")?.start().await?;
            Ok(String::new())
        }
        Command::Stop => {
            load("stop")?.stop().await?;
            Ok(String::new())
        }
        Command::Kill => {
            load("kill")?.kill().await?;
            Ok(String::new())
        }
        Command::Restart => {
            load("restart")?.restart().await?;
            Ok(String::new())
        }
        Command::Remove => {
            let machine = require_name(name, "remove")?;
            load("remove")?.remove().await?;
            store.remove(machine)?;
            Ok(String::new())
        }
    }
}

async fn create<A, R, F>(
    store: &MachineStore,
    name: &str,
    args: &CreateArgs,
    connect: &F,
) -> Result<String, CliError>
where
    A: AtlanticApi + 'static,
    R: CommandRunner + Clone + Send + Sync + 'static,
    F: Fn(InstanceConfig) -> AtlanticNetDriver<A, R>,
{
    if store.exists(name)? {
        return Err(CliError::AlreadyExists(name.to_owned()));
    }
    let mut driver = connect(new_instance(store, name, args)?);
    driver.pre_create_check().await?;
    let outcome = driver.create().await;

    // A server that exists remotely must stay removable even if bootstrap failed.
    let config = driver.into_config();
    if config.instance_id.is_some() {
        store.save(&config)?;
    }
    outcome?;
    Ok(String::new())
}

fn require_name<'a>(name: Option<&'a str>, command: &'static str) -> Result<&'a str, CliError> {
    name.filter(|value| !value.trim().is_empty())
        .ok_or(CliError::MissingMachineName(command))
}

fn new_instance(
    store: &MachineStore,
    name: &str,
    args: &CreateArgs,
) -> Result<InstanceConfig, CliError> {
    let mut options = AtlanticNetConfig::load_without_cli_args()?;
    apply_overrides(&mut options, args);
    Ok(InstanceConfig::from_options(name, store.root(), &options)?)
}

fn apply_overrides(options: &mut AtlanticNetConfig, args: &CreateArgs) {
    if let Some(image_id) = &args.image_id {
        options.image_id.clone_from(image_id);
    }
    if let Some(plan_name) = &args.plan_name {
        options.plan_name.clone_from(plan_name);
    }
    if let Some(vm_location) = &args.vm_location {
        options.vm_location.clone_from(vm_location);
    }
    if let Some(ssh_key_id) = &args.ssh_key_id {
        options.ssh_key_id = Some(ssh_key_id.clone());
    }
    if let Some(ssh_key_path) = &args.ssh_key_path {
        options.ssh_key_path.clone_from(ssh_key_path);
    }
}

fn render_flags() -> String {
    create_flags()
        .iter()
        .map(|flag| {
            format!(
                "--{}\t{}\t{}\t{}",
                flag.name,
                flag.env_var,
                flag.default.unwrap_or(""),
                flag.usage
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}
