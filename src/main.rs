//! Binary entry point for the Scaleway machine driver CLI.
//!
//! Each subcommand invokes exactly one driver method, standing in for the
//! host that would otherwise dispatch over a plugin protocol: the machine
//! record is loaded from the store, the driver runs, and any new state is
//! persisted back.

use std::io::{self, Write};
use std::process;

use clap::Parser;
use thiserror::Error;

use scaleway_machine::cli::{Cli, Command, DriverOpts};
use scaleway_machine::{
    ConfigError, Driver, DriverConfig, MachineStore, ScalewayDriver, ScalewayDriverError,
    StoreError,
};

#[derive(Debug, Error)]
enum CliError {
    #[error("machine '{name}' already exists; remove it first")]
    MachineExists {
        name: String,
    },
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Driver(#[from] ScalewayDriverError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let exit_code = match dispatch(cli).await {
        Ok(()) => 0,
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

async fn dispatch(cli: Cli) -> Result<(), CliError> {
    let store = MachineStore::new(&cli.store_path);
    match cli.command {
        Command::Create(opts) => create_machine(&store, &cli.name, &opts).await,
        Command::Start => {
            load_driver(&store, &cli.name)?.start().await?;
            Ok(())
        }
        Command::Stop => {
            load_driver(&store, &cli.name)?.stop().await?;
            Ok(())
        }
        Command::Restart => {
            load_driver(&store, &cli.name)?.restart().await?;
            Ok(())
        }
        Command::Kill => {
            load_driver(&store, &cli.name)?.kill().await?;
            Ok(())
        }
        Command::Rm => remove_machine(&store, &cli.name).await,
        Command::Status => {
            let state = load_driver(&store, &cli.name)?.state().await?;
            print_line(&state.to_string());
            Ok(())
        }
        Command::Url => {
            let url = load_driver(&store, &cli.name)?.url().await?;
            print_line(&url);
            Ok(())
        }
        Command::SshHostname => {
            let hostname = load_driver(&store, &cli.name)?.ssh_hostname().await?;
            print_line(&hostname);
            Ok(())
        }
    }
}

async fn create_machine(
    store: &MachineStore,
    name: &str,
    opts: &DriverOpts,
) -> Result<(), CliError> {
    if store.contains(name) {
        return Err(CliError::MachineExists {
            name: name.to_owned(),
        });
    }

    let config = DriverConfig::from_flags(opts)?;
    let machine_dir = store.ensure_machine_dir(name)?;
    let mut driver = ScalewayDriver::new(config, name, machine_dir)?;

    driver.pre_create_check().await?;
    let created = driver.create().await;

    // Persist whatever was provisioned even when the create failed partway,
    // so rm can still reach the server.
    if let Ok(record) = driver.to_record() {
        store.save(name, &record)?;
    }
    created?;

    print_line(&format!("machine '{name}' is ready"));
    Ok(())
}

async fn remove_machine(store: &MachineStore, name: &str) -> Result<(), CliError> {
    load_driver(store, name)?.remove().await?;
    store.remove(name)?;
    Ok(())
}

fn load_driver(store: &MachineStore, name: &str) -> Result<ScalewayDriver, CliError> {
    let record = store.load(name)?;
    let machine_dir = store.machine_dir(name);
    Ok(ScalewayDriver::from_record(name, record, machine_dir)?)
}

fn print_line(text: &str) {
    writeln!(io::stdout(), "{text}").ok();
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_error_renders_the_cli_error() {
        let mut buf = Vec::new();
        let err = CliError::MachineExists {
            name: String::from("default"),
        };
        write_error(&mut buf, &err);
        let rendered = String::from_utf8(buf).unwrap_or_else(|err| panic!("utf8: {err}"));
        assert!(
            rendered.contains("already exists"),
            "rendered: {rendered}"
        );
    }

    #[test]
    fn store_errors_convert_into_cli_errors() {
        let err = CliError::from(StoreError::NotFound {
            machine: String::from("ghost"),
        });
        assert!(err.to_string().contains("ghost"));
    }
}
