//! Machine driver for provisioning Docker-ready Scaleway servers.
//!
//! The crate exposes a generic [`Driver`] contract covering the lifecycle a
//! machine host expects (create → start/stop/restart → remove, plus state
//! queries and endpoint derivation), a Scaleway implementation of that
//! contract, and the supporting configuration, persistence, and SSH key
//! plumbing.

pub mod cli;
pub mod config;
pub mod driver;
pub mod scaleway;
pub mod ssh_key;
pub mod store;

pub use config::{ConfigError, DriverConfig};
pub use driver::{Driver, DriverFuture, MachineState};
pub use scaleway::api::{
    ApiError, ApiFuture, CreateServer, HttpApi, Image, InstanceApi, ReservedIp, Server,
    ServerAction, ServerIp, VolumeSpec,
};
pub use scaleway::{DOCKER_PORT, DRIVER_NAME, ScalewayDriver, ScalewayDriverError};
pub use ssh_key::{CommandOutput, CommandRunner, ProcessCommandRunner, SshKeyError};
pub use store::{MachineRecord, MachineStore, StoreError};
