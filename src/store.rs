//! JSON machine records kept under the host store.
//!
//! Each machine owns `<store>/machines/<name>/`, which holds `config.json`
//! next to its SSH key pair. All access goes through a `cap-std` handle on
//! the store root so a machine name cannot address files outside it.

use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8::Dir};
use thiserror::Error;
use tracing::debug;

use crate::config::InstanceConfig;

const MACHINES_DIR: &str = "machines";
const RECORD_FILE_NAME: &str = "config.json";

/// Errors raised while reading or writing machine records.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum StoreError {
    /// Raised when no record exists for the machine.
    #[error("machine {name} does not exist (expected {path})")]
    NotFound {
        /// Machine name.
        name: String,
        /// Record path that was looked up.
        path: Utf8PathBuf,
    },
    /// Raised when a machine name cannot be used as a directory name.
    #[error("invalid machine name {0:?}")]
    InvalidName(String),
    /// Raised when file system operations fail.
    #[error("failed to access {path}: {message}")]
    Io {
        /// Path that could not be accessed.
        path: Utf8PathBuf,
        /// Human-readable error message.
        message: String,
    },
    /// Raised when a record cannot be encoded or decoded.
    #[error("failed to parse {path}: {message}")]
    Parse {
        /// Record path.
        path: Utf8PathBuf,
        /// Human-readable error message.
        message: String,
    },
}

/// Reads and writes [`InstanceConfig`] records below a store root.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MachineStore {
    root: Utf8PathBuf,
}

impl MachineStore {
    /// Creates a store rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store root.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Absolute path of the record for `name`.
    #[must_use]
    pub fn record_path(&self, name: &str) -> Utf8PathBuf {
        self.root.join(relative_record(name))
    }

    /// Returns `true` when a record exists for `name`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidName`] or [`StoreError::Io`].
    pub fn exists(&self, name: &str) -> Result<bool, StoreError> {
        validate_name(name)?;
        let Some(dir) = self.open_root()? else {
            return Ok(false);
        };
        dir.try_exists(relative_record(name))
            .map_err(|err| io_error(&self.record_path(name), &err))
    }

    /// Loads the record for `name`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when no record exists,
    /// [`StoreError::Parse`] when it is not valid JSON, or
    /// [`StoreError::Io`] on other file system failures.
    pub fn load(&self, name: &str) -> Result<InstanceConfig, StoreError> {
        if !self.exists(name)? {
            return Err(StoreError::NotFound {
                name: name.to_owned(),
                path: self.record_path(name),
            });
        }
        let path = self.record_path(name);
        let dir = self.open_root()?.ok_or_else(|| StoreError::NotFound {
            name: name.to_owned(),
            path: path.clone(),
        })?;
        let contents = dir
            .read_to_string(relative_record(name))
            .map_err(|err| io_error(&path, &err))?;
        serde_json::from_str(&contents).map_err(|err| StoreError::Parse {
            path,
            message: err.to_string(),
        })
    }

    /// Writes the record for the machine named in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidName`], [`StoreError::Parse`] when
    /// encoding fails, or [`StoreError::Io`].
    pub fn save(&self, config: &InstanceConfig) -> Result<Utf8PathBuf, StoreError> {
        let name = config.base.machine_name.as_str();
        validate_name(name)?;
        let path = self.record_path(name);
        let rendered = serde_json::to_string_pretty(config).map_err(|err| StoreError::Parse {
            path: path.clone(),
            message: err.to_string(),
        })?;

        Dir::create_ambient_dir_all(&self.root, ambient_authority())
            .map_err(|err| io_error(&self.root, &err))?;
        let dir = Dir::open_ambient_dir(&self.root, ambient_authority())
            .map_err(|err| io_error(&self.root, &err))?;
        let machine_dir = relative_machine_dir(name);
        dir.create_dir_all(&machine_dir)
            .map_err(|err| io_error(&self.root.join(&machine_dir), &err))?;
        dir.write(relative_record(name), rendered)
            .map_err(|err| io_error(&path, &err))?;

        debug!(%path, "saved machine record");
        Ok(path)
    }

    /// Deletes the machine directory, including its keys.
    ///
    /// Removing a machine that has no directory is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidName`] or [`StoreError::Io`].
    pub fn remove(&self, name: &str) -> Result<(), StoreError> {
        validate_name(name)?;
        let Some(dir) = self.open_root()? else {
            return Ok(());
        };
        let machine_dir = relative_machine_dir(name);
        match dir.remove_dir_all(&machine_dir) {
            Ok(()) => {
                debug!(machine = name, "removed machine directory");
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(io_error(&self.root.join(&machine_dir), &err)),
        }
    }

    fn open_root(&self) -> Result<Option<Dir>, StoreError> {
        match Dir::open_ambient_dir(&self.root, ambient_authority()) {
            Ok(dir) => Ok(Some(dir)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(io_error(&self.root, &err)),
        }
    }
}

fn validate_name(name: &str) -> Result<(), StoreError> {
    let trimmed = name.trim();
    if trimmed.is_empty()
        || trimmed != name
        || name.contains(['/', '\\'])
        || name == "."
        || name == ".."
    {
        return Err(StoreError::InvalidName(name.to_owned()));
    }
    Ok(())
}

fn relative_machine_dir(name: &str) -> Utf8PathBuf {
    Utf8Path::new(MACHINES_DIR).join(name)
}

fn relative_record(name: &str) -> Utf8PathBuf {
    relative_machine_dir(name).join(RECORD_FILE_NAME)
}

fn io_error(path: &Utf8Path, err: &io::Error) -> StoreError {
    StoreError::Io {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::InstanceId;
    use crate::driver::BaseDriver;
    use rstest::rstest;
    use tempfile::TempDir;

    fn temp_root(tmp: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(tmp.path().join("store"))
            .unwrap_or_else(|path| panic!("temp dir should be utf8: {}", path.display()))
    }

    fn sample(root: &Utf8Path) -> InstanceConfig {
        InstanceConfig {
            base: BaseDriver::new("web", root),
            api_key: String::from("KEY"),
            api_secret: String::from("SECRET"),
            local_key_path: Utf8PathBuf::from("/keys/id_rsa"),
            image_id: String::from("ubuntu-14.04_64bit"),
            plan_name: String::from("XS"),
            vm_location: String::from("USWEST1"),
            ssh_key_id: None,
            instance_id: Some(InstanceId::new("1001")),
        }
    }

    #[test]
    fn save_then_load_returns_the_record() {
        let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
        let root = temp_root(&tmp);
        let store = MachineStore::new(&root);
        let config = sample(&root);

        let path = store
            .save(&config)
            .unwrap_or_else(|err| panic!("save should succeed: {err}"));
        let loaded = store
            .load("web")
            .unwrap_or_else(|err| panic!("load should succeed: {err}"));

        assert_eq!(path, root.join("machines/web/config.json"));
        assert_eq!(loaded, config);
    }

    #[test]
    fn load_reports_missing_machine() {
        let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
        let store = MachineStore::new(temp_root(&tmp));

        let err = store.load("ghost").expect_err("missing record");

        assert!(matches!(err, StoreError::NotFound { .. }), "got {err:?}");
    }

    #[test]
    fn load_reports_corrupt_record() {
        let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
        let root = temp_root(&tmp);
        std::fs::create_dir_all(root.join("machines/web"))
            .unwrap_or_else(|err| panic!("mkdir: {err}"));
        std::fs::write(root.join("machines/web/config.json"), "{not json")
            .unwrap_or_else(|err| panic!("write: {err}"));

        let err = MachineStore::new(&root)
            .load("web")
            .expect_err("corrupt record");

        assert!(matches!(err, StoreError::Parse { .. }), "got {err:?}");
    }

    #[test]
    fn remove_deletes_machine_directory() {
        let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
        let root = temp_root(&tmp);
        let store = MachineStore::new(&root);
        store
            .save(&sample(&root))
            .unwrap_or_else(|err| panic!("save should succeed: {err}"));

        store
            .remove("web")
            .unwrap_or_else(|err| panic!("remove should succeed: {err}"));

        assert!(!root.join("machines/web").exists());
        store
            .remove("web")
            .unwrap_or_else(|err| panic!("second remove should be a no-op: {err}"));
    }

    #[rstest]
    #[case("")]
    #[case("..")]
    #[case("a/b")]
    #[case(" web")]
    fn names_that_escape_the_store_are_rejected(#[case] name: &str) {
        let store = MachineStore::new("/unused");

        assert_eq!(
            store.exists(name),
            Err(StoreError::InvalidName(name.to_owned()))
        );
    }
}
