//! Behavioural smoke tests for the driver binary.

#[path = "common/machine_record.rs"]
mod machine_record;

use assert_cmd::cargo::cargo_bin_cmd;
use atlanticnet::MachineStore;
use predicates::prelude::*;
use tempfile::TempDir;

use machine_record::{MACHINE_IP, MACHINE_NAME, created_record, utf8_root};

const CREDENTIAL_VARS: [&str; 3] = [
    "ATLANTIC_NET_API_KEY",
    "ATLANTIC_NET_API_SECRET",
    "ATLANTIC_NET_CONFIG_PATH",
];

fn seeded_store(tmp: &TempDir) -> String {
    let root = utf8_root(tmp);
    MachineStore::new(&root)
        .save(&created_record(&root))
        .unwrap_or_else(|err| panic!("seed record: {err}"));
    root.to_string()
}

#[test]
fn driver_name_is_printed() {
    let mut cmd = cargo_bin_cmd!("docker-machine-driver-atlanticnet");
    cmd.arg("driver-name")
        .assert()
        .success()
        .stdout("atlanticnet\n");
}

#[test]
fn flags_lists_credential_options() {
    let mut cmd = cargo_bin_cmd!("docker-machine-driver-atlanticnet");
    cmd.arg("flags")
        .assert()
        .success()
        .stdout(predicate::str::contains("ATLANTIC_NET_API_KEY"))
        .stdout(predicate::str::contains("--atlantic-net-plan-name"));
}

#[test]
fn create_without_credentials_is_actionable() {
    let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
    let mut cmd = cargo_bin_cmd!("docker-machine-driver-atlanticnet");
    for var in CREDENTIAL_VARS {
        cmd.env_remove(var);
    }
    cmd.env("HOME", tmp.path())
        .env("XDG_CONFIG_HOME", tmp.path())
        .current_dir(tmp.path())
        .arg("--store-path")
        .arg(tmp.path())
        .args(["--machine-name", MACHINE_NAME, "create"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ATLANTIC_NET_API_KEY"));
}

#[test]
fn state_of_unknown_machine_fails() {
    let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
    let mut cmd = cargo_bin_cmd!("docker-machine-driver-atlanticnet");
    cmd.arg("--store-path")
        .arg(tmp.path())
        .args(["-m", "ghost", "state"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn start_is_unsupported() {
    let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
    let store = seeded_store(&tmp);
    let mut cmd = cargo_bin_cmd!("docker-machine-driver-atlanticnet");
    cmd.args(["--store-path", store.as_str(), "-m", MACHINE_NAME, "start"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Atlantic.Net doesn't support this. Please restart the machine instead.",
        ));
}

#[test]
fn ip_and_ssh_hostname_come_from_the_record() {
    let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
    let store = seeded_store(&tmp);

    for command in ["ip", "ssh-hostname"] {
        let mut cmd = cargo_bin_cmd!("docker-machine-driver-atlanticnet");
        cmd.args(["--store-path", store.as_str(), "-m", MACHINE_NAME, command])
            .assert()
            .success()
            .stdout(format!("{MACHINE_IP}\n"));
    }
}

#[test]
fn ip_requires_a_machine_name() {
    let mut cmd = cargo_bin_cmd!("docker-machine-driver-atlanticnet");
    cmd.arg("ip")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--machine-name is required for ip"));
}
