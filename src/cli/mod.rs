//! Command-line interface definitions for the `scaleway-machine` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page. It
//! deliberately depends on nothing else in the crate.

use clap::{Args, Parser, Subcommand};

/// Top-level CLI for the `scaleway-machine` binary.
#[derive(Debug, Parser)]
#[command(
    name = "scaleway-machine",
    about = "Provision and manage Docker-ready Scaleway servers",
    version,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Name of the machine the command operates on.
    #[arg(
        long,
        global = true,
        value_name = "NAME",
        env = "SCALEWAY_MACHINE_NAME",
        default_value = "default"
    )]
    pub name: String,
    /// Directory holding machine records and SSH keys.
    #[arg(
        long,
        global = true,
        value_name = "PATH",
        env = "SCALEWAY_MACHINE_STORE",
        default_value = "~/.scaleway-machine"
    )]
    pub store_path: String,
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// One subcommand per driver operation.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Provision a new server and wait until it is running.
    Create(DriverOpts),
    /// Power on the machine's server.
    Start,
    /// Power off the machine's server.
    Stop,
    /// Reboot the machine's server.
    Restart,
    /// Forcibly kill the machine's server (not supported by this driver).
    Kill,
    /// Terminate the server and release its resources.
    Rm,
    /// Print the machine's current state.
    Status,
    /// Print the Docker daemon endpoint URL.
    Url,
    /// Print the hostname used for SSH access.
    SshHostname,
}

/// Driver configuration flags recognised by `create`.
///
/// Every flag has an equivalently named `SCALEWAY_*` environment variable;
/// values given here override anything loaded from the environment or a
/// discovered configuration file.
#[derive(Args, Clone, Debug, Default, Eq, PartialEq)]
pub struct DriverOpts {
    /// Scaleway organization id.
    #[arg(long = "scaleway-organization", env = "SCALEWAY_ORGANIZATION", value_name = "ID")]
    pub organization: Option<String>,
    /// Scaleway access token.
    #[arg(long = "scaleway-token", env = "SCALEWAY_TOKEN", value_name = "TOKEN")]
    pub token: Option<String>,
    /// Scaleway server name (defaults to a name derived from the machine).
    #[arg(long = "scaleway-server-name", env = "SCALEWAY_SERVER_NAME", value_name = "NAME")]
    pub server_name: Option<String>,
    /// Scaleway commercial type (e.g.: VC1S).
    #[arg(
        long = "scaleway-commercial-type",
        env = "SCALEWAY_COMMERCIAL_TYPE",
        value_name = "TYPE"
    )]
    pub commercial_type: Option<String>,
    /// Scaleway image name (e.g.: ubuntu-xenial).
    #[arg(long = "scaleway-image", env = "SCALEWAY_IMAGE", value_name = "IMAGE")]
    pub image: Option<String>,
    /// Scaleway region name (e.g.: ams1, par1).
    #[arg(long = "scaleway-region", env = "SCALEWAY_REGION", value_name = "REGION")]
    pub region: Option<String>,
    /// Scaleway reserved IP id to attach instead of allocating a new address.
    #[arg(long = "scaleway-reserved-ip-id", env = "SCALEWAY_RESERVED_IP_ID", value_name = "ID")]
    pub reserved_ip_id: Option<String>,
    /// Keep the reserved IP when the machine is removed.
    #[arg(long = "scaleway-persistent-ip", env = "SCALEWAY_PERSISTENT_IP")]
    pub persistent_ip: bool,
    /// Enable IPv6 on the server.
    #[arg(long = "scaleway-enable-ipv6", env = "SCALEWAY_ENABLE_IPV6")]
    pub enable_ipv6: bool,
    /// Attach additional volumes (e.g.: 50G, or "50G 100G").
    #[arg(long = "scaleway-volumes", env = "SCALEWAY_VOLUMES", value_name = "SPEC")]
    pub volumes: Option<String>,
    /// Comma-separated list of tags to apply to the server.
    #[arg(long = "scaleway-tags", env = "SCALEWAY_TAGS", value_name = "TAGS")]
    pub tags: Option<String>,
    /// SSH user name.
    #[arg(long = "scaleway-ssh-user", env = "SCALEWAY_SSH_USER", value_name = "USER")]
    pub ssh_user: Option<String>,
    /// SSH port.
    #[arg(long = "scaleway-ssh-port", env = "SCALEWAY_SSH_PORT", value_name = "PORT")]
    pub ssh_port: Option<u16>,
}
