//! SSH key material: copying an existing pair or generating a new one.

use std::ffi::OsString;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8::Dir};
use thiserror::Error;
use tracing::debug;

use super::SshTooling;
use super::runner::{CommandError, CommandRunner};

const KEY_TYPE: &str = "rsa";
const KEY_BITS: &str = "2048";

/// Errors raised while preparing SSH key material.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum KeyError {
    /// Raised when a key file cannot be read, written or copied.
    #[error("failed to access {path}: {message}")]
    Io {
        /// Path that could not be accessed.
        path: Utf8PathBuf,
        /// Human-readable error message.
        message: String,
    },
    /// Raised when the generated public key is empty.
    #[error("public key {path} is empty")]
    EmptyPublicKey {
        /// Path of the public key file.
        path: Utf8PathBuf,
    },
    /// Raised when `ssh-keygen` fails.
    #[error(transparent)]
    Command(#[from] CommandError),
}

/// Path of the public half that belongs to `private_key`.
#[must_use]
pub fn public_key_path(private_key: &Utf8Path) -> Utf8PathBuf {
    Utf8PathBuf::from(format!("{private_key}.pub"))
}

/// Copies an existing private key into the machine store.
///
/// # Errors
///
/// Returns [`KeyError::Io`] when the source cannot be read or the
/// destination cannot be written.
pub fn copy_private_key(source: &Utf8Path, destination: &Utf8Path) -> Result<(), KeyError> {
    let (source_dir, source_name) = open_parent(source)?;
    let (destination_dir, destination_name) = create_parent(destination)?;

    debug!(%source, %destination, "copying SSH private key");
    source_dir
        .copy(source_name, &destination_dir, destination_name)
        .map(drop)
        .map_err(|err| io_error(destination, &err))
}

/// Generates a fresh RSA key pair at `private_key` and returns the public
/// half as a single trimmed line.
///
/// An existing private key is kept and its `.pub` file read back, so a
/// create retried after a failed launch reuses the pair.
///
/// # Errors
///
/// Returns [`KeyError::Command`] when `ssh-keygen` fails,
/// [`KeyError::Io`] when the public key cannot be read, or
/// [`KeyError::EmptyPublicKey`] when it is blank.
pub fn generate_key_pair<R: CommandRunner>(
    runner: &R,
    tooling: &SshTooling,
    private_key: &Utf8Path,
) -> Result<String, KeyError> {
    let (dir, file_name) = create_parent(private_key)?;
    if dir.exists(file_name) {
        debug!(path = %private_key, "reusing existing SSH key pair");
        return read_public_key(&public_key_path(private_key));
    }

    let args = [
        "-t",
        KEY_TYPE,
        "-b",
        KEY_BITS,
        "-N",
        "",
        "-q",
        "-f",
        private_key.as_str(),
    ]
    .map(OsString::from);
    debug!(path = %private_key, "generating SSH key pair");
    runner
        .run(&tooling.ssh_keygen_bin, &args)?
        .into_success(&tooling.ssh_keygen_bin)?;

    read_public_key(&public_key_path(private_key))
}

/// Reads a public key file and returns its trimmed contents.
///
/// # Errors
///
/// Returns [`KeyError::Io`] when the file cannot be read or
/// [`KeyError::EmptyPublicKey`] when it is blank.
pub fn read_public_key(path: &Utf8Path) -> Result<String, KeyError> {
    let (dir, file_name) = open_parent(path)?;
    let contents = dir
        .read_to_string(file_name)
        .map_err(|err| io_error(path, &err))?;
    let key = contents.trim();
    if key.is_empty() {
        return Err(KeyError::EmptyPublicKey {
            path: path.to_path_buf(),
        });
    }
    Ok(key.to_owned())
}

fn split(path: &Utf8Path) -> Result<(&Utf8Path, &str), KeyError> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    let file_name = path.file_name().ok_or_else(|| KeyError::Io {
        path: path.to_path_buf(),
        message: String::from("key path is missing a filename"),
    })?;
    Ok((parent, file_name))
}

fn open_parent(path: &Utf8Path) -> Result<(Dir, &str), KeyError> {
    let (parent, file_name) = split(path)?;
    let dir = Dir::open_ambient_dir(parent, ambient_authority())
        .map_err(|err| io_error(parent, &err))?;
    Ok((dir, file_name))
}

fn create_parent(path: &Utf8Path) -> Result<(Dir, &str), KeyError> {
    let (parent, _) = split(path)?;
    Dir::create_ambient_dir_all(parent, ambient_authority())
        .map_err(|err| io_error(parent, &err))?;
    open_parent(path)
}

fn io_error(path: &Utf8Path, err: &io::Error) -> KeyError {
    KeyError::Io {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}
