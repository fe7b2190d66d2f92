//! End-to-end lifecycle of the Atlantic.Net driver against an in-memory API.

#[path = "common/machine_record.rs"]
mod machine_record;

use std::fs;
use std::time::Duration;

use atlanticnet::api::{InstanceId, LaunchedInstance, SshKeyId, VmStatus};
use atlanticnet::test_support::{FakeApi, ScriptedRunner};
use atlanticnet::{AtlanticNetDriver, Driver, MachineState, MachineStore, WaitPolicy};
use rstest::rstest;
use tempfile::TempDir;

use machine_record::{MACHINE_IP, MACHINE_NAME, created_record, fresh_record, utf8_root};

const FAST: WaitPolicy = WaitPolicy {
    interval: Duration::from_millis(1),
    timeout: Duration::from_millis(50),
};

#[rstest]
#[tokio::test]
async fn registered_key_machine_survives_a_full_lifecycle() {
    let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
    let root = utf8_root(&tmp);
    fs::write(root.join("source_id_rsa"), "PRIVATE")
        .unwrap_or_else(|err| panic!("seed key: {err}"));
    let api = FakeApi::new()
        .with_ssh_keys(&["k1"])
        .with_plans(&["XS"])
        .with_launched(LaunchedInstance {
            id: InstanceId::new("1001"),
            ip_address: String::from(MACHINE_IP),
            username: Some(String::from("root")),
            password: Some(String::from("unused")),
        })
        .with_status(VmStatus::Running);
    let runner = ScriptedRunner::new();
    let mut record = fresh_record(&root);
    record.ssh_key_id = Some(SshKeyId::new("k1"));
    let mut driver = AtlanticNetDriver::with_parts(record, api.connector(), runner.clone())
        .with_wait_policy(FAST);

    driver
        .pre_create_check()
        .await
        .unwrap_or_else(|err| panic!("pre-create check should pass: {err}"));
    driver
        .create()
        .await
        .unwrap_or_else(|err| panic!("create should succeed: {err}"));

    let store = MachineStore::new(&root);
    store
        .save(driver.config())
        .unwrap_or_else(|err| panic!("save should succeed: {err}"));
    let reloaded = store
        .load(MACHINE_NAME)
        .unwrap_or_else(|err| panic!("load should succeed: {err}"));
    let mut driver = AtlanticNetDriver::with_parts(reloaded, api.connector(), runner.clone())
        .with_wait_policy(FAST);

    let state = driver
        .state()
        .await
        .unwrap_or_else(|err| panic!("state should resolve: {err}"));
    assert_eq!(state, MachineState::Running);
    let url = driver
        .url()
        .await
        .unwrap_or_else(|err| panic!("url should resolve: {err}"));
    assert_eq!(url, format!("tcp://{MACHINE_IP}:2376"));
    driver
        .restart()
        .await
        .unwrap_or_else(|err| panic!("restart should succeed: {err}"));
    driver
        .remove()
        .await
        .unwrap_or_else(|err| panic!("remove should succeed: {err}"));
    store
        .remove(MACHINE_NAME)
        .unwrap_or_else(|err| panic!("record removal should succeed: {err}"));

    assert_eq!(
        api.calls(),
        [
            "list-sshkeys",
            "describe-plan",
            "run-instance",
            "describe-instance",
            "describe-instance",
            "describe-instance",
            "reboot-instance",
            "terminate-instance",
        ]
    );
    assert!(runner.invocations().is_empty(), "no SSH tooling expected");
    assert!(!store.exists(MACHINE_NAME).unwrap_or(true));
}

#[rstest]
#[tokio::test]
async fn stored_machine_that_is_still_booting_skips_the_reboot() {
    let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
    let root = utf8_root(&tmp);
    let store = MachineStore::new(&root);
    store
        .save(&created_record(&root))
        .unwrap_or_else(|err| panic!("save should succeed: {err}"));
    let api = FakeApi::new().with_status(VmStatus::Creating);
    let record = store
        .load(MACHINE_NAME)
        .unwrap_or_else(|err| panic!("load should succeed: {err}"));
    let mut driver = AtlanticNetDriver::with_parts(record, api.connector(), ScriptedRunner::new());

    driver
        .restart()
        .await
        .unwrap_or_else(|err| panic!("restart should be a no-op: {err}"));
    let url_err = driver.url().await.expect_err("booting host has no docker url");

    assert_eq!(url_err.to_string(), "Host is not running");
    assert_eq!(api.calls(), ["describe-instance", "describe-instance"]);
}
