//! Scaleway implementation of the machine driver contract.
//!
//! The driver owns a validated configuration plus the identifiers written
//! once after a successful create (server id, reserved IP), and translates
//! each contract method into one or two control-plane calls. Provider state
//! is never cached across calls; every query re-fetches.

pub mod api;
mod boot_env;
mod error;
mod state;
mod volume;
mod wait;

use std::time::Duration;

use camino::Utf8PathBuf;
use tracing::info;
use uuid::Uuid;

use crate::config::DriverConfig;
use crate::driver::{Driver, DriverFuture, MachineState};
use crate::ssh_key::{self, CommandRunner, ProcessCommandRunner};
use crate::store::MachineRecord;
use api::{CreateServer, HttpApi, InstanceApi, ReservedIp, ServerAction};
use state::machine_state;

pub use error::ScalewayDriverError;

/// Name the host registers this driver under.
pub const DRIVER_NAME: &str = "scaleway";
/// Port the Docker daemon listens on for provisioned servers.
pub const DOCKER_PORT: u16 = 2376;

const POLL_INTERVAL: Duration = Duration::from_secs(5);
const WAIT_TIMEOUT: Duration = Duration::from_secs(300);

/// Driver that provisions machines through the Scaleway control plane.
///
/// Generic over the API client and the command runner so tests can record
/// remote calls and fake key generation; production code uses
/// [`ScalewayDriver::new`], which wires [`HttpApi`] and the real process
/// runner.
#[derive(Clone, Debug)]
pub struct ScalewayDriver<A = HttpApi, R = ProcessCommandRunner> {
    api: A,
    runner: R,
    config: DriverConfig,
    machine_name: String,
    machine_dir: Utf8PathBuf,
    server_id: Option<String>,
    ip: Option<ReservedIp>,
    poll_interval: Duration,
    wait_timeout: Duration,
}

impl ScalewayDriver<HttpApi, ProcessCommandRunner> {
    /// Constructs a driver for a new machine from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ScalewayDriverError::Config`] when required configuration
    /// fields are blank.
    pub fn new(
        config: DriverConfig,
        machine_name: impl Into<String>,
        machine_dir: impl Into<Utf8PathBuf>,
    ) -> Result<Self, ScalewayDriverError> {
        let api = HttpApi::new(&config);
        Self::with_parts(config, machine_name, machine_dir, api, ProcessCommandRunner)
    }

    /// Reconstructs a driver from a persisted machine record.
    ///
    /// # Errors
    ///
    /// Returns [`ScalewayDriverError::Config`] when the recorded
    /// configuration no longer validates.
    pub fn from_record(
        machine_name: impl Into<String>,
        record: MachineRecord,
        machine_dir: impl Into<Utf8PathBuf>,
    ) -> Result<Self, ScalewayDriverError> {
        let mut driver = Self::new(record.config, machine_name, machine_dir)?;
        driver.server_id = Some(record.server_id);
        driver.ip = record.ip;
        Ok(driver)
    }
}

impl<A: InstanceApi, R: CommandRunner> ScalewayDriver<A, R> {
    /// Constructs a driver from explicit parts, validating the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ScalewayDriverError::Config`] when required configuration
    /// fields are blank.
    pub fn with_parts(
        config: DriverConfig,
        machine_name: impl Into<String>,
        machine_dir: impl Into<Utf8PathBuf>,
        api: A,
        runner: R,
    ) -> Result<Self, ScalewayDriverError> {
        config.validate()?;
        Ok(Self {
            api,
            runner,
            config,
            machine_name: machine_name.into(),
            machine_dir: machine_dir.into(),
            server_id: None,
            ip: None,
            poll_interval: POLL_INTERVAL,
            wait_timeout: WAIT_TIMEOUT,
        })
    }

    /// Overrides the polling interval and deadline used by waits.
    #[must_use]
    pub const fn with_wait(mut self, poll_interval: Duration, wait_timeout: Duration) -> Self {
        self.poll_interval = poll_interval;
        self.wait_timeout = wait_timeout;
        self
    }

    /// Restores provisioned identifiers, as after a successful create.
    pub fn set_provisioned(&mut self, server_id: impl Into<String>, ip: Option<ReservedIp>) {
        self.server_id = Some(server_id.into());
        self.ip = ip;
    }

    /// Provider identifier of the machine's server, once created.
    #[must_use]
    pub fn server_id(&self) -> Option<&str> {
        self.server_id.as_deref()
    }

    /// Reserved IP attached to the machine, once created.
    #[must_use]
    pub const fn reserved_ip(&self) -> Option<&ReservedIp> {
        self.ip.as_ref()
    }

    /// The driver's configuration.
    #[must_use]
    pub const fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Name of the machine this driver operates on.
    #[must_use]
    pub fn machine_name(&self) -> &str {
        &self.machine_name
    }

    /// Snapshot of configuration plus provisioned identifiers for the store.
    ///
    /// # Errors
    ///
    /// Returns [`ScalewayDriverError::NotProvisioned`] before a successful
    /// create.
    pub fn to_record(&self) -> Result<MachineRecord, ScalewayDriverError> {
        let server_id = self.require_server_id()?.to_owned();
        Ok(MachineRecord {
            config: self.config.clone(),
            server_id,
            ip: self.ip.clone(),
        })
    }

    fn require_server_id(&self) -> Result<&str, ScalewayDriverError> {
        self.server_id
            .as_deref()
            .ok_or_else(|| ScalewayDriverError::NotProvisioned {
                machine: self.machine_name.clone(),
            })
    }

    fn require_ip(&self) -> Result<&ReservedIp, ScalewayDriverError> {
        self.ip
            .as_ref()
            .ok_or_else(|| ScalewayDriverError::MissingIpAddress {
                machine: self.machine_name.clone(),
            })
    }

    fn server_name(&self) -> String {
        self.config
            .server_name
            .clone()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| format!("{}-{}", self.machine_name, Uuid::new_v4().simple()))
    }

    fn check_reserved_ip_id(&self) -> Result<(), ScalewayDriverError> {
        let Some(ip_id) = self.trimmed_reserved_ip_id() else {
            return Ok(());
        };
        if Uuid::parse_str(ip_id).is_err() {
            return Err(ScalewayDriverError::InvalidReservedIp {
                ip_id: ip_id.to_owned(),
            });
        }
        Ok(())
    }

    fn trimmed_reserved_ip_id(&self) -> Option<&str> {
        self.config
            .reserved_ip_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    async fn current_state(&self) -> Result<MachineState, ScalewayDriverError> {
        let server_id = self.require_server_id()?;
        let fetched = self.api.get_server(server_id).await?;
        Ok(fetched.map_or(MachineState::None, |server| machine_state(&server.state)))
    }

    async fn acquire_ip(&self) -> Result<ReservedIp, ScalewayDriverError> {
        if let Some(ip_id) = self.trimmed_reserved_ip_id() {
            return self.api.get_ip(ip_id).await?.ok_or_else(|| {
                ScalewayDriverError::UnresolvedReservedIp {
                    ip_id: ip_id.to_owned(),
                    region: self.config.region.clone(),
                }
            });
        }
        info!("reserving a new IP address");
        self.api.reserve_ip().await.map_err(Into::into)
    }

    async fn resolve_image(&self) -> Result<String, ScalewayDriverError> {
        let label = &self.config.image;
        let mut candidates: Vec<_> = self
            .api
            .list_images()
            .await?
            .into_iter()
            .filter(|image| image.state.is_empty() || image.state == "available")
            .filter(|image| image.name.eq_ignore_ascii_case(label) || image.id == *label)
            .collect();

        if candidates.is_empty() {
            return Err(ScalewayDriverError::ImageNotFound {
                label: label.clone(),
                region: self.config.region.clone(),
            });
        }
        candidates.sort_by(|lhs, rhs| rhs.creation_date.cmp(&lhs.creation_date));
        Ok(candidates.remove(0).id)
    }

    async fn provision(&mut self) -> Result<(), ScalewayDriverError> {
        self.config.validate()?;

        info!(machine = %self.machine_name, "creating SSH key for server");
        let public_key = ssh_key::generate_key_pair(&self.runner, &self.machine_dir)?;

        info!("reserving IP");
        let ip = self.acquire_ip().await?;
        let image = self.resolve_image().await?;

        let volumes = match self.config.volumes.as_deref() {
            Some(spec) if !spec.trim().is_empty() => {
                let parsed = volume::additional_volumes(spec)?;
                (!parsed.is_empty()).then_some(parsed)
            }
            _ => None,
        };

        let request = CreateServer {
            name: self.server_name(),
            organization: self.config.organization.clone(),
            image,
            commercial_type: self.config.commercial_type.clone(),
            tags: boot_env::boot_tags(&public_key, &self.config.tags),
            enable_ipv6: self.config.enable_ipv6,
            public_ip: Some(ip.id.clone()),
            volumes,
        };

        info!(name = %request.name, commercial_type = %request.commercial_type, "creating server");
        let server = self.api.create_server(&request).await?;
        self.server_id = Some(server.id.clone());
        self.ip = Some(ip);

        info!(server = %server.id, "starting server");
        self.api
            .server_action(&server.id, ServerAction::PowerOn)
            .await?;

        info!("waiting for server to be ready");
        self.wait_for_state(&server.id, MachineState::Running).await
    }

    async fn power_on(&self) -> Result<(), ScalewayDriverError> {
        let server_id = self.require_server_id()?;
        let current = self.current_state().await?;
        if current.is_up() {
            info!(state = %current, "server is already up; skipping power on");
            return Ok(());
        }
        self.api
            .server_action(server_id, ServerAction::PowerOn)
            .await
            .map_err(Into::into)
    }

    async fn power_off(&self) -> Result<(), ScalewayDriverError> {
        let server_id = self.require_server_id()?;
        let current = self.current_state().await?;
        if current.is_down() {
            info!(state = %current, "server is already down; skipping power off");
            return Ok(());
        }
        self.api
            .server_action(server_id, ServerAction::PowerOff)
            .await
            .map_err(Into::into)
    }

    async fn reboot(&self) -> Result<(), ScalewayDriverError> {
        let server_id = self.require_server_id()?;
        self.api
            .server_action(server_id, ServerAction::Reboot)
            .await
            .map_err(Into::into)
    }

    async fn teardown(&self) -> Result<(), ScalewayDriverError> {
        let server_id = self.require_server_id()?;
        info!(server = server_id, "terminating server");
        self.api
            .server_action(server_id, ServerAction::Terminate)
            .await?;
        self.wait_until_gone(server_id).await?;

        if self.config.persistent_ip {
            info!("keeping reserved IP (persistent-ip is set)");
            return Ok(());
        }
        if let Some(ip) = &self.ip {
            info!(address = %ip.address, "releasing IP");
            self.api.release_ip(&ip.id).await?;
        }
        Ok(())
    }

    async fn endpoint_url(&self) -> Result<String, ScalewayDriverError> {
        let current = self.current_state().await?;
        if current != MachineState::Running {
            return Err(ScalewayDriverError::NotRunning { state: current });
        }
        let ip = self.require_ip()?;
        Ok(format!("tcp://{}:{DOCKER_PORT}", ip.address))
    }
}

impl<A, R> Driver for ScalewayDriver<A, R>
where
    A: InstanceApi + Send + Sync,
    R: CommandRunner + Send + Sync,
{
    type Error = ScalewayDriverError;

    fn driver_name(&self) -> &'static str {
        DRIVER_NAME
    }

    fn pre_create_check(&self) -> DriverFuture<'_, (), Self::Error> {
        Box::pin(async move { self.check_reserved_ip_id() })
    }

    fn create(&mut self) -> DriverFuture<'_, (), Self::Error> {
        Box::pin(self.provision())
    }

    fn start(&self) -> DriverFuture<'_, (), Self::Error> {
        Box::pin(self.power_on())
    }

    fn stop(&self) -> DriverFuture<'_, (), Self::Error> {
        Box::pin(self.power_off())
    }

    fn restart(&self) -> DriverFuture<'_, (), Self::Error> {
        Box::pin(self.reboot())
    }

    fn kill(&self) -> DriverFuture<'_, (), Self::Error> {
        Box::pin(async { Err(ScalewayDriverError::Unsupported { operation: "kill" }) })
    }

    fn remove(&self) -> DriverFuture<'_, (), Self::Error> {
        Box::pin(self.teardown())
    }

    fn state(&self) -> DriverFuture<'_, MachineState, Self::Error> {
        Box::pin(self.current_state())
    }

    fn url(&self) -> DriverFuture<'_, String, Self::Error> {
        Box::pin(self.endpoint_url())
    }

    fn ssh_hostname(&self) -> DriverFuture<'_, String, Self::Error> {
        Box::pin(async move { self.require_ip().map(|ip| ip.address.clone()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> DriverConfig {
        DriverConfig {
            organization: String::from("org-1"),
            token: String::from("tok-1"),
            server_name: None,
            commercial_type: String::from("VC1S"),
            image: String::from("ubuntu-xenial"),
            region: String::from("ams1"),
            reserved_ip_id: None,
            persistent_ip: false,
            enable_ipv6: false,
            volumes: None,
            tags: String::new(),
            ssh_user: String::from("root"),
            ssh_port: 22,
        }
    }

    fn driver(config: DriverConfig) -> ScalewayDriver {
        ScalewayDriver::new(config, "test-machine", "/tmp/machines/test-machine")
            .unwrap_or_else(|err| panic!("driver should construct: {err}"))
    }

    #[test]
    fn construction_rejects_blank_token() {
        let result = ScalewayDriver::new(
            DriverConfig {
                token: String::new(),
                ..config()
            },
            "test-machine",
            "/tmp/machines/test-machine",
        );
        assert!(matches!(result, Err(ScalewayDriverError::Config(_))));
    }

    #[test]
    fn server_name_falls_back_to_a_machine_derived_name() {
        let name = driver(config()).server_name();
        assert!(name.starts_with("test-machine-"), "unexpected name: {name}");
    }

    #[test]
    fn configured_server_name_wins() {
        let name = driver(DriverConfig {
            server_name: Some(String::from("web-1")),
            ..config()
        })
        .server_name();
        assert_eq!(name, "web-1");
    }

    #[test]
    fn pre_create_check_rejects_malformed_reserved_ip_ids() {
        let result = driver(DriverConfig {
            reserved_ip_id: Some(String::from("not-a-uuid")),
            ..config()
        })
        .check_reserved_ip_id();
        assert!(matches!(
            result,
            Err(ScalewayDriverError::InvalidReservedIp { ref ip_id }) if ip_id == "not-a-uuid"
        ));
    }

    #[test]
    fn pre_create_check_accepts_uuids_and_absence() {
        assert!(driver(config()).check_reserved_ip_id().is_ok());
        let result = driver(DriverConfig {
            reserved_ip_id: Some(String::from("bcdf8013-c01f-4897-bd3c-14f5d44321e4")),
            ..config()
        })
        .check_reserved_ip_id();
        assert!(result.is_ok());
    }

    #[test]
    fn to_record_requires_a_provisioned_server() {
        let mut unprovisioned = driver(config());
        assert!(matches!(
            unprovisioned.to_record(),
            Err(ScalewayDriverError::NotProvisioned { .. })
        ));

        unprovisioned.set_provisioned(
            "srv-1",
            Some(ReservedIp {
                id: String::from("ip-1"),
                address: String::from("51.15.40.189"),
            }),
        );
        let record = unprovisioned
            .to_record()
            .unwrap_or_else(|err| panic!("record should build: {err}"));
        assert_eq!(record.server_id, "srv-1");
    }
}
