//! SSH key-pair generation through the system `ssh-keygen` binary.
//!
//! The driver never implements key cryptography itself; it shells out to
//! `ssh-keygen` behind the [`CommandRunner`] abstraction so tests can fake
//! the binary, then reads the generated public key back for boot injection.

use std::ffi::OsString;
use std::io;
use std::process::Command;

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;

/// File name of the generated private key inside the machine directory.
pub const KEY_FILE_NAME: &str = "id_ed25519";

const KEYGEN_BIN: &str = "ssh-keygen";
const KEY_TYPE: &str = "ed25519";

/// Result of running an external command.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandOutput {
    /// Exit code reported by the process, if available.
    pub code: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl CommandOutput {
    /// Returns `true` when the exit code equals zero.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.code, Some(0))
    }
}

/// Abstraction over command execution to support fakes in tests.
pub trait CommandRunner {
    /// Runs `program` with the given arguments, capturing stdout and stderr.
    ///
    /// # Errors
    ///
    /// Returns [`SshKeyError::Spawn`] if the command cannot be started.
    fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, SshKeyError>;
}

/// Real command runner that shells out to the host operating system.
#[derive(Clone, Debug, Default)]
pub struct ProcessCommandRunner;

impl CommandRunner for ProcessCommandRunner {
    fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, SshKeyError> {
        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|err| SshKeyError::Spawn {
                program: program.to_owned(),
                message: err.to_string(),
            })?;

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Errors raised while generating or reading the machine's key pair.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum SshKeyError {
    /// Raised when the keygen binary cannot be started.
    #[error("failed to run {program}: {message}")]
    Spawn {
        /// Program that could not be started.
        program: String,
        /// OS error message.
        message: String,
    },
    /// Raised when `ssh-keygen` exits with a non-zero status.
    #[error("ssh-keygen exited with status {status_text}: {stderr}")]
    Keygen {
        /// Human readable representation of the exit status.
        status_text: String,
        /// Stderr captured from the command.
        stderr: String,
    },
    /// Raised when key files cannot be removed or read.
    #[error("failed to access {path}: {message}")]
    Io {
        /// Path that could not be accessed.
        path: Utf8PathBuf,
        /// OS error message.
        message: String,
    },
}

/// Returns the public-key path for a private key path.
#[must_use]
pub fn public_key_path(key_path: &Utf8Path) -> Utf8PathBuf {
    Utf8PathBuf::from(format!("{key_path}.pub"))
}

/// Returns the private-key path inside a machine directory.
#[must_use]
pub fn key_path(dir: &Utf8Path) -> Utf8PathBuf {
    dir.join(KEY_FILE_NAME)
}

fn remove_stale(path: &Utf8Path) -> Result<(), SshKeyError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(SshKeyError::Io {
            path: path.to_path_buf(),
            message: err.to_string(),
        }),
    }
}

/// Generates an ed25519 key pair in `dir` and returns the public key line.
///
/// Stale key files from an earlier attempt are removed first; `ssh-keygen`
/// prompts instead of overwriting.
///
/// # Errors
///
/// Returns [`SshKeyError`] when the binary cannot run, exits non-zero, or
/// the generated public key cannot be read back.
pub fn generate_key_pair<R: CommandRunner>(runner: &R, dir: &Utf8Path) -> Result<String, SshKeyError> {
    let private_key = key_path(dir);
    let public_key = public_key_path(&private_key);
    remove_stale(&private_key)?;
    remove_stale(&public_key)?;

    let args = vec![
        OsString::from("-t"),
        OsString::from(KEY_TYPE),
        OsString::from("-N"),
        OsString::from(""),
        OsString::from("-q"),
        OsString::from("-f"),
        OsString::from(private_key.as_str()),
    ];
    let output = runner.run(KEYGEN_BIN, &args)?;
    if !output.is_success() {
        let status_text = output
            .code
            .map_or_else(|| String::from("unknown"), |code| code.to_string());
        return Err(SshKeyError::Keygen {
            status_text,
            stderr: output.stderr,
        });
    }

    std::fs::read_to_string(&public_key).map_err(|err| SshKeyError::Io {
        path: public_key.clone(),
        message: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;

    /// Fake keygen that writes a public key where `-f` points.
    struct FakeKeygen {
        code: i32,
        public_key: &'static str,
    }

    impl CommandRunner for FakeKeygen {
        fn run(&self, _program: &str, args: &[OsString]) -> Result<CommandOutput, SshKeyError> {
            if self.code == 0 {
                let target = args
                    .windows(2)
                    .find(|pair| pair.first().is_some_and(|flag| flag == "-f"))
                    .and_then(|pair| pair.get(1))
                    .map(|path| path.to_string_lossy().into_owned())
                    .unwrap_or_default();
                std::fs::write(format!("{target}.pub"), self.public_key)
                    .unwrap_or_else(|err| panic!("write fake key: {err}"));
            }
            Ok(CommandOutput {
                code: Some(self.code),
                stdout: String::new(),
                stderr: String::from("permission denied"),
            })
        }
    }

    fn scratch_dir(temp: &tempfile::TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(temp.path().to_path_buf())
            .unwrap_or_else(|path| panic!("non-utf8 temp dir: {}", path.display()))
    }

    #[test]
    fn generate_key_pair_returns_the_public_key_line() {
        let temp = tempfile::tempdir().unwrap_or_else(|err| panic!("tempdir: {err}"));
        let dir = scratch_dir(&temp);
        let runner = FakeKeygen {
            code: 0,
            public_key: "ssh-ed25519 AAAAC3Nza machine\n",
        };

        let key = generate_key_pair(&runner, &dir)
            .unwrap_or_else(|err| panic!("keygen should succeed: {err}"));
        assert_eq!(key, "ssh-ed25519 AAAAC3Nza machine\n");
    }

    #[test]
    fn generate_key_pair_surfaces_keygen_failures() {
        let temp = tempfile::tempdir().unwrap_or_else(|err| panic!("tempdir: {err}"));
        let dir = scratch_dir(&temp);
        let runner = FakeKeygen {
            code: 1,
            public_key: "",
        };

        let err = generate_key_pair(&runner, &dir).expect_err("keygen failure should propagate");
        assert!(matches!(err, SshKeyError::Keygen { ref stderr, .. } if stderr.contains("denied")));
    }

    #[test]
    fn generate_key_pair_replaces_stale_keys() {
        let temp = tempfile::tempdir().unwrap_or_else(|err| panic!("tempdir: {err}"));
        let dir = scratch_dir(&temp);
        std::fs::write(key_path(&dir), "old private")
            .unwrap_or_else(|err| panic!("seed stale key: {err}"));
        std::fs::write(public_key_path(&key_path(&dir)), "old public")
            .unwrap_or_else(|err| panic!("seed stale key: {err}"));
        let runner = FakeKeygen {
            code: 0,
            public_key: "ssh-ed25519 BBBB machine\n",
        };

        let key = generate_key_pair(&runner, &dir)
            .unwrap_or_else(|err| panic!("keygen should succeed: {err}"));
        assert_eq!(key, "ssh-ed25519 BBBB machine\n");
    }

    #[test]
    fn public_key_path_appends_the_pub_suffix() {
        let path = public_key_path(Utf8Path::new("/store/default/id_ed25519"));
        assert_eq!(path, Utf8PathBuf::from("/store/default/id_ed25519.pub"));
    }
}
