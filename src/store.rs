//! Machine record persistence.
//!
//! The host side of the driver contract persists the configuration struct
//! and provisioned identifiers between invocations. Here that is a JSON
//! record per machine under the store directory, which also holds the
//! machine's SSH key files.

use camino::Utf8PathBuf;
use cap_std::{ambient_authority, fs_utf8::Dir};
use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;

use crate::config::DriverConfig;
use crate::scaleway::api::ReservedIp;

/// File name of the per-machine record inside the machine directory.
pub const RECORD_FILE_NAME: &str = "machine.json";

/// Persisted form of a machine: the driver configuration plus the
/// identifiers written once after a successful create.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct MachineRecord {
    /// Driver configuration the machine was created with.
    pub config: DriverConfig,
    /// Provider identifier of the machine's server.
    pub server_id: String,
    /// Reserved IP attached to the server, when one was recorded.
    pub ip: Option<ReservedIp>,
}

/// Errors raised by the machine store.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum StoreError {
    /// Raised when no record exists for the machine.
    #[error("machine '{machine}' does not exist in the store")]
    NotFound {
        /// Machine name.
        machine: String,
    },
    /// Raised when file system operations fail.
    #[error("failed to access {path}: {message}")]
    Io {
        /// Path that could not be accessed.
        path: Utf8PathBuf,
        /// OS error message.
        message: String,
    },
    /// Raised when a record cannot be serialized or parsed.
    #[error("failed to parse {path}: {message}")]
    Parse {
        /// Path that could not be parsed.
        path: Utf8PathBuf,
        /// Parser error message.
        message: String,
    },
}

/// Expands a leading `~/` prefix to the user's home directory.
///
/// If the `HOME` environment variable is not set, the function returns the
/// input string unchanged (i.e., the leading `~` is not expanded).
///
/// # Examples
///
/// ```
/// # use scaleway_machine::store::expand_tilde;
/// let home = std::env::var("HOME").expect("HOME should be set");
/// assert_eq!(expand_tilde("~/.scaleway-machine"), format!("{home}/.scaleway-machine"));
/// assert_eq!(expand_tilde("/absolute/path"), "/absolute/path");
/// ```
#[must_use]
pub fn expand_tilde(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = std::env::var_os("HOME")
    {
        return format!("{}/{rest}", home.to_string_lossy());
    }
    path.to_owned()
}

/// Per-machine record and key storage rooted at a single directory.
#[derive(Clone, Debug)]
pub struct MachineStore {
    root: Utf8PathBuf,
}

impl MachineStore {
    /// Creates a store rooted at `root`, expanding a leading `~/`.
    #[must_use]
    pub fn new(root: &str) -> Self {
        Self {
            root: Utf8PathBuf::from(expand_tilde(root)),
        }
    }

    /// Directory holding one machine's record and SSH keys.
    #[must_use]
    pub fn machine_dir(&self, machine: &str) -> Utf8PathBuf {
        self.root.join(machine)
    }

    /// Creates the machine directory (and the store root) when absent.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] when the directory cannot be created.
    pub fn ensure_machine_dir(&self, machine: &str) -> Result<Utf8PathBuf, StoreError> {
        let dir = self.machine_dir(machine);
        Dir::create_ambient_dir_all(&dir, ambient_authority()).map_err(|err| StoreError::Io {
            path: dir.clone(),
            message: err.to_string(),
        })?;
        Ok(dir)
    }

    /// Returns `true` when a record exists for the machine.
    #[must_use]
    pub fn contains(&self, machine: &str) -> bool {
        Dir::open_ambient_dir(self.machine_dir(machine), ambient_authority())
            .ok()
            .is_some_and(|dir| dir.try_exists(RECORD_FILE_NAME).unwrap_or(false))
    }

    /// Writes the machine record, creating the machine directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] on file system failures and
    /// [`StoreError::Parse`] when the record cannot be serialized.
    pub fn save(&self, machine: &str, record: &MachineRecord) -> Result<(), StoreError> {
        let dir_path = self.ensure_machine_dir(machine)?;
        let record_path = dir_path.join(RECORD_FILE_NAME);

        let rendered =
            serde_json::to_string_pretty(record).map_err(|err| StoreError::Parse {
                path: record_path.clone(),
                message: err.to_string(),
            })?;

        let dir =
            Dir::open_ambient_dir(&dir_path, ambient_authority()).map_err(|err| StoreError::Io {
                path: dir_path.clone(),
                message: err.to_string(),
            })?;
        dir.write(RECORD_FILE_NAME, rendered.as_bytes())
            .map_err(|err| StoreError::Io {
                path: record_path,
                message: err.to_string(),
            })
    }

    /// Loads the machine record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when no record exists,
    /// [`StoreError::Io`] on file system failures, and [`StoreError::Parse`]
    /// when the record is not valid JSON.
    pub fn load(&self, machine: &str) -> Result<MachineRecord, StoreError> {
        let dir_path = self.machine_dir(machine);
        let record_path = dir_path.join(RECORD_FILE_NAME);

        let dir = match Dir::open_ambient_dir(&dir_path, ambient_authority()) {
            Ok(dir) => dir,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound {
                    machine: machine.to_owned(),
                });
            }
            Err(err) => {
                return Err(StoreError::Io {
                    path: dir_path,
                    message: err.to_string(),
                });
            }
        };

        let contents = match dir.read_to_string(RECORD_FILE_NAME) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound {
                    machine: machine.to_owned(),
                });
            }
            Err(err) => {
                return Err(StoreError::Io {
                    path: record_path,
                    message: err.to_string(),
                });
            }
        };

        serde_json::from_str(&contents).map_err(|err| StoreError::Parse {
            path: record_path,
            message: err.to_string(),
        })
    }

    /// Deletes the machine directory, including the record and SSH keys.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the machine directory is absent
    /// and [`StoreError::Io`] on other file system failures.
    pub fn remove(&self, machine: &str) -> Result<(), StoreError> {
        let root = match Dir::open_ambient_dir(&self.root, ambient_authority()) {
            Ok(root) => root,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound {
                    machine: machine.to_owned(),
                });
            }
            Err(err) => {
                return Err(StoreError::Io {
                    path: self.root.clone(),
                    message: err.to_string(),
                });
            }
        };

        match root.remove_dir_all(machine) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Err(StoreError::NotFound {
                machine: machine.to_owned(),
            }),
            Err(err) => Err(StoreError::Io {
                path: self.machine_dir(machine),
                message: err.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DriverConfig;

    fn record() -> MachineRecord {
        MachineRecord {
            config: DriverConfig {
                organization: String::from("org-1"),
                token: String::from("tok-1"),
                server_name: None,
                commercial_type: String::from("VC1S"),
                image: String::from("ubuntu-xenial"),
                region: String::from("ams1"),
                reserved_ip_id: None,
                persistent_ip: true,
                enable_ipv6: false,
                volumes: None,
                tags: String::from("web,prod"),
                ssh_user: String::from("root"),
                ssh_port: 22,
            },
            server_id: String::from("srv-1"),
            ip: Some(ReservedIp {
                id: String::from("ip-1"),
                address: String::from("51.15.40.189"),
            }),
        }
    }

    fn scratch_store(temp: &tempfile::TempDir) -> MachineStore {
        let root = temp
            .path()
            .to_str()
            .unwrap_or_else(|| panic!("non-utf8 temp dir"));
        MachineStore::new(root)
    }

    #[test]
    fn save_then_load_preserves_the_record() {
        let temp = tempfile::tempdir().unwrap_or_else(|err| panic!("tempdir: {err}"));
        let store = scratch_store(&temp);

        assert!(!store.contains("default"));
        store
            .save("default", &record())
            .unwrap_or_else(|err| panic!("save: {err}"));
        assert!(store.contains("default"));

        let loaded = store.load("default").unwrap_or_else(|err| panic!("load: {err}"));
        assert_eq!(loaded, record());
    }

    #[test]
    fn load_of_an_unknown_machine_is_not_found() {
        let temp = tempfile::tempdir().unwrap_or_else(|err| panic!("tempdir: {err}"));
        let store = scratch_store(&temp);

        assert!(matches!(
            store.load("ghost"),
            Err(StoreError::NotFound { ref machine }) if machine == "ghost"
        ));
    }

    #[test]
    fn remove_deletes_the_machine_directory() {
        let temp = tempfile::tempdir().unwrap_or_else(|err| panic!("tempdir: {err}"));
        let store = scratch_store(&temp);
        store
            .save("default", &record())
            .unwrap_or_else(|err| panic!("save: {err}"));

        store.remove("default").unwrap_or_else(|err| panic!("remove: {err}"));
        assert!(!store.contains("default"));
        assert!(matches!(store.remove("default"), Err(StoreError::NotFound { .. })));
    }
}
