//! Driver configuration loading via `ortho-config`.
//!
//! Values merge defaults, a discovered `scaleway-machine.toml`, and
//! `SCALEWAY_*` environment variables; `--scaleway-*` CLI flags override the
//! merged result field by field.

use crate::cli::DriverOpts;
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default commercial type for new servers.
pub const DEFAULT_COMMERCIAL_TYPE: &str = "VC1S";
/// Default image label resolved at create time.
pub const DEFAULT_IMAGE: &str = "ubuntu-xenial";
/// Default region hosting the control plane.
pub const DEFAULT_REGION: &str = "ams1";
/// Default SSH user for provisioned servers.
pub const DEFAULT_SSH_USER: &str = "root";
/// Default SSH port for provisioned servers.
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Scaleway driver configuration derived from defaults, configuration
/// files, environment variables, and CLI flags.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq, Serialize)]
#[ortho_config(prefix = "SCALEWAY")]
pub struct DriverConfig {
    /// Organization identifier the server is billed to. Required.
    #[ortho_config(default = String::new())]
    pub organization: String,
    /// Access token used to authenticate API calls. Required.
    #[ortho_config(default = String::new())]
    pub token: String,
    /// Server name; when absent a name is derived from the machine name.
    pub server_name: Option<String>,
    /// Commercial type (instance sizing) for new servers.
    #[ortho_config(default = DEFAULT_COMMERCIAL_TYPE.to_owned())]
    pub commercial_type: String,
    /// Image label resolved against the provider's image list.
    #[ortho_config(default = DEFAULT_IMAGE.to_owned())]
    pub image: String,
    /// Region whose control plane receives all API calls.
    #[ortho_config(default = DEFAULT_REGION.to_owned())]
    pub region: String,
    /// Reserved IP identifier to attach instead of allocating a new address.
    pub reserved_ip_id: Option<String>,
    /// Keep the reserved IP when the machine is removed.
    #[ortho_config(default = false)]
    pub persistent_ip: bool,
    /// Enable IPv6 on the server.
    #[ortho_config(default = false)]
    pub enable_ipv6: bool,
    /// Additional volume specification (e.g. `50G`).
    pub volumes: Option<String>,
    /// Comma-separated tags applied to the server at boot.
    #[ortho_config(default = String::new())]
    pub tags: String,
    /// User name for SSH access.
    #[ortho_config(default = DEFAULT_SSH_USER.to_owned())]
    pub ssh_user: String,
    /// Port for SSH access.
    #[ortho_config(default = DEFAULT_SSH_PORT)]
    pub ssh_port: u16,
}

/// Metadata for a configuration field, used to generate actionable error messages.
struct FieldMetadata {
    description: &'static str,
    flag: &'static str,
    env_var: &'static str,
    toml_key: &'static str,
}

impl FieldMetadata {
    const fn new(
        description: &'static str,
        flag: &'static str,
        env_var: &'static str,
        toml_key: &'static str,
    ) -> Self {
        Self {
            description,
            flag,
            env_var,
            toml_key,
        }
    }
}

impl DriverConfig {
    fn require_field(value: &str, metadata: &FieldMetadata) -> Result<(), ConfigError> {
        if value.trim().is_empty() {
            return Err(ConfigError::MissingField(format!(
                "missing {}: pass {}, set {}, or add {} to scaleway-machine.toml",
                metadata.description, metadata.flag, metadata.env_var, metadata.toml_key
            )));
        }
        Ok(())
    }

    /// Loads configuration without attempting to parse CLI arguments. Values
    /// merge defaults, configuration files, and environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the loader fails to merge sources.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([std::ffi::OsString::from("scaleway-machine")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Builds the effective configuration for a `create` invocation: loaded
    /// sources with the given flags layered on top, then validated.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when source merging fails and
    /// [`ConfigError::MissingField`] when a required field ends up blank.
    pub fn from_flags(opts: &DriverOpts) -> Result<Self, ConfigError> {
        let mut config = Self::load_without_cli_args()?;
        config.apply_overrides(opts);
        config.validate()?;
        Ok(config)
    }

    /// Applies flag values over the loaded configuration. Absent flags leave
    /// the loaded value untouched; boolean flags can only switch a setting on.
    pub fn apply_overrides(&mut self, opts: &DriverOpts) {
        if let Some(organization) = &opts.organization {
            self.organization = organization.clone();
        }
        if let Some(token) = &opts.token {
            self.token = token.clone();
        }
        if opts.server_name.is_some() {
            self.server_name = opts.server_name.clone();
        }
        if let Some(commercial_type) = &opts.commercial_type {
            self.commercial_type = commercial_type.clone();
        }
        if let Some(image) = &opts.image {
            self.image = image.clone();
        }
        if let Some(region) = &opts.region {
            self.region = region.clone();
        }
        if opts.reserved_ip_id.is_some() {
            self.reserved_ip_id = opts.reserved_ip_id.clone();
        }
        if opts.persistent_ip {
            self.persistent_ip = true;
        }
        if opts.enable_ipv6 {
            self.enable_ipv6 = true;
        }
        if opts.volumes.is_some() {
            self.volumes = opts.volumes.clone();
        }
        if let Some(tags) = &opts.tags {
            self.tags = tags.clone();
        }
        if let Some(ssh_user) = &opts.ssh_user {
            self.ssh_user = ssh_user.clone();
        }
        if let Some(ssh_port) = opts.ssh_port {
            self.ssh_port = ssh_port;
        }
    }

    /// Performs semantic validation on required fields. Error messages name
    /// the flag, environment variable, and TOML key that supply the value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when a required field is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Self::require_field(
            &self.organization,
            &FieldMetadata::new(
                "Scaleway organization id",
                "--scaleway-organization",
                "SCALEWAY_ORGANIZATION",
                "organization",
            ),
        )?;
        Self::require_field(
            &self.token,
            &FieldMetadata::new(
                "Scaleway access token",
                "--scaleway-token",
                "SCALEWAY_TOKEN",
                "token",
            ),
        )?;
        Ok(())
    }
}

/// Errors raised during configuration loading and validation.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty or missing.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
}

impl From<ortho_config::OrthoError> for ConfigError {
    fn from(value: ortho_config::OrthoError) -> Self {
        Self::Parse(value.to_string())
    }
}
