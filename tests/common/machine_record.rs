//! Shared machine record fixtures for integration tests.
//!
//! Integration tests are compiled as separate crates (one per top-level file in
//! `tests/`). Placing shared fixtures under `tests/common/` avoids creating an
//! additional integration test binary while still allowing reuse via:
//!
//! ```rust
//! #[path = "common/machine_record.rs"]
//! mod machine_record;
//! ```

use atlanticnet::api::InstanceId;
use atlanticnet::{BaseDriver, InstanceConfig};
use camino::{Utf8Path, Utf8PathBuf};
use tempfile::TempDir;

/// Machine name used throughout the integration tests.
pub const MACHINE_NAME: &str = "web";

/// Public address recorded for created machines.
pub const MACHINE_IP: &str = "203.0.113.10";

/// Returns the UTF-8 path of a temporary directory.
pub fn utf8_root(tmp: &TempDir) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(tmp.path().to_path_buf())
        .unwrap_or_else(|path| panic!("temp dir should be utf8: {}", path.display()))
}

/// Record for a machine that has not been created yet.
pub fn fresh_record(store: &Utf8Path) -> InstanceConfig {
    InstanceConfig {
        base: BaseDriver::new(MACHINE_NAME, store),
        api_key: String::from("KEY"),
        api_secret: String::from("SECRET"),
        local_key_path: store.join("source_id_rsa"),
        image_id: String::from("ubuntu-14.04_64bit"),
        plan_name: String::from("XS"),
        vm_location: String::from("USWEST1"),
        ssh_key_id: None,
        instance_id: None,
    }
}

/// Record for a machine that already exists remotely.
pub fn created_record(store: &Utf8Path) -> InstanceConfig {
    let mut record = fresh_record(store);
    record.instance_id = Some(InstanceId::new("1001"));
    record.base.ip_address = Some(String::from(MACHINE_IP));
    record
}
