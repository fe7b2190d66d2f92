//! Decoding of Atlantic.Net response envelopes.
//!
//! Every action answers with `{"<action>response": {...}}` or
//! `{"error": {"code": ..., "message": ...}}`. Result sets wrap their rows
//! in `{"item": ...}` where `item` is a single object for one row and an
//! array otherwise, and identifiers arrive as strings or numbers depending
//! on the action.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::ApiError;
use super::types::{
    InstanceDescription, InstanceId, LaunchedInstance, Plan, RebootResult, SshKey, SshKeyId,
    TerminatedInstance, VmStatus,
};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

#[derive(Debug, Deserialize)]
#[serde(default, bound(deserialize = "T: Deserialize<'de>"))]
struct ItemSet<T> {
    item: Option<OneOrMany<T>>,
}

impl<T> Default for ItemSet<T> {
    fn default() -> Self {
        Self { item: None }
    }
}

impl<T> ItemSet<T> {
    fn into_vec(self) -> Vec<T> {
        match self.item {
            None => Vec::new(),
            Some(OneOrMany::One(row)) => vec![row],
            Some(OneOrMany::Many(rows)) => rows,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Integer(i64),
    Flag(bool),
}

impl Scalar {
    fn into_text(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Integer(number) => number.to_string(),
            Self::Flag(flag) => flag.to_string(),
        }
    }

    fn is_true(&self) -> bool {
        match self {
            Self::Text(text) => text.trim().eq_ignore_ascii_case("true"),
            Self::Integer(number) => *number == 1,
            Self::Flag(flag) => *flag,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    #[serde(default)]
    code: Option<Scalar>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RunInstancePayload {
    #[serde(rename = "instancesSet", default)]
    instances: ItemSet<RawLaunched>,
}

#[derive(Debug, Deserialize)]
struct RawLaunched {
    #[serde(rename = "instanceid", alias = "InstanceId")]
    id: Scalar,
    #[serde(default)]
    ip_address: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DescribeInstancePayload {
    #[serde(rename = "instanceSet", default)]
    instances: ItemSet<RawDescription>,
}

#[derive(Debug, Deserialize)]
struct RawDescription {
    #[serde(rename = "InstanceId", alias = "instanceid")]
    id: Scalar,
    vm_status: String,
    #[serde(default)]
    vm_ip_address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TerminatePayload {
    #[serde(rename = "instancesSet", default)]
    instances: ItemSet<RawTerminated>,
}

#[derive(Debug, Deserialize)]
struct RawTerminated {
    #[serde(rename = "InstanceId", alias = "instanceid")]
    id: Scalar,
    result: Scalar,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RebootPayload {
    #[serde(rename = "return")]
    outcome: RawReturn,
}

#[derive(Debug, Deserialize)]
struct RawReturn {
    value: Scalar,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListSshKeysPayload {
    #[serde(rename = "KeysSet", default)]
    keys: ItemSet<RawSshKey>,
}

#[derive(Debug, Deserialize)]
struct RawSshKey {
    key_id: Scalar,
    #[serde(default)]
    key_name: String,
}

#[derive(Debug, Deserialize)]
struct DescribePlanPayload {
    #[serde(default)]
    plans: ItemSet<RawPlan>,
}

#[derive(Debug, Deserialize)]
struct RawPlan {
    plan_name: String,
    #[serde(default)]
    platform: Option<String>,
}

/// Returns the provider error carried by `body`, if it is an error envelope.
pub(super) fn error_envelope(action: &str, body: &str) -> Option<ApiError> {
    match payload::<Value>(action, body) {
        Err(err @ ApiError::Provider { .. }) => Some(err),
        _ => None,
    }
}

/// Pulls the `<action>response` payload out of a raw body.
fn payload<T: DeserializeOwned>(action: &str, body: &str) -> Result<T, ApiError> {
    let decode = |message: String| ApiError::Decode {
        action: action.to_owned(),
        message,
    };

    let mut envelope: Value = serde_json::from_str(body).map_err(|err| decode(err.to_string()))?;

    if let Some(raw_error) = envelope.get_mut("error").map(Value::take) {
        let error: ProviderError =
            serde_json::from_value(raw_error).map_err(|err| decode(err.to_string()))?;
        return Err(ApiError::Provider {
            action: action.to_owned(),
            code: error
                .code
                .map_or_else(|| String::from("unknown"), Scalar::into_text),
            message: error.message.unwrap_or_default(),
        });
    }

    let key = format!("{action}response");
    let raw_payload = envelope
        .get_mut(&key)
        .map(Value::take)
        .ok_or_else(|| decode(format!("response is missing `{key}`")))?;
    serde_json::from_value(raw_payload).map_err(|err| decode(err.to_string()))
}

pub(super) fn run_instance(body: &str) -> Result<Vec<LaunchedInstance>, ApiError> {
    let parsed: RunInstancePayload = payload("run-instance", body)?;
    Ok(parsed
        .instances
        .into_vec()
        .into_iter()
        .map(|raw| LaunchedInstance {
            id: InstanceId::from(raw.id.into_text()),
            ip_address: raw.ip_address.unwrap_or_default(),
            username: raw.username,
            password: raw.password,
        })
        .collect())
}

pub(super) fn describe_instance(body: &str) -> Result<InstanceDescription, ApiError> {
    let parsed: DescribeInstancePayload = payload("describe-instance", body)?;
    let raw = parsed
        .instances
        .into_vec()
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::Decode {
            action: String::from("describe-instance"),
            message: String::from("response contained no instance"),
        })?;
    Ok(InstanceDescription {
        id: InstanceId::from(raw.id.into_text()),
        status: VmStatus::parse(&raw.vm_status),
        ip_address: raw.vm_ip_address,
    })
}

pub(super) fn terminate_instance(body: &str) -> Result<Vec<TerminatedInstance>, ApiError> {
    let parsed: TerminatePayload = payload("terminate-instance", body)?;
    Ok(parsed
        .instances
        .into_vec()
        .into_iter()
        .map(|raw| TerminatedInstance {
            success: raw.result.is_true(),
            id: InstanceId::from(raw.id.into_text()),
            message: raw.message,
        })
        .collect())
}

pub(super) fn reboot_instance(body: &str) -> Result<RebootResult, ApiError> {
    let parsed: RebootPayload = payload("reboot-instance", body)?;
    Ok(RebootResult {
        success: parsed.outcome.value.is_true(),
        message: parsed.outcome.message,
    })
}

pub(super) fn list_ssh_keys(body: &str) -> Result<Vec<SshKey>, ApiError> {
    let parsed: ListSshKeysPayload = payload("list-sshkeys", body)?;
    Ok(parsed
        .keys
        .into_vec()
        .into_iter()
        .map(|raw| SshKey {
            id: SshKeyId::from(raw.key_id.into_text()),
            name: raw.key_name,
        })
        .collect())
}

pub(super) fn describe_plan(body: &str) -> Result<Vec<Plan>, ApiError> {
    let parsed: DescribePlanPayload = payload("describe-plan", body)?;
    Ok(parsed
        .plans
        .into_vec()
        .into_iter()
        .map(|raw| Plan {
            name: raw.plan_name,
            platform: raw.platform,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_instance_reads_single_item() {
        let body = r#"{"run-instanceresponse":{"instancesSet":{"item":{
            "instanceid":"153979","ip_address":"45.58.35.251",
            "password":"qXRAZ3iK","username":"root"}},
            "requestid":"58c8ca2f-8d4a-4dd4-8d5c-2e5f0b5dfc30"}}"#;

        let instances = run_instance(body).unwrap_or_else(|err| panic!("decode: {err}"));

        assert_eq!(
            instances,
            vec![LaunchedInstance {
                id: InstanceId::from("153979"),
                ip_address: String::from("45.58.35.251"),
                username: Some(String::from("root")),
                password: Some(String::from("qXRAZ3iK")),
            }]
        );
    }

    #[test]
    fn run_instance_accepts_numeric_ids() {
        let body = r#"{"run-instanceresponse":{"instancesSet":{"item":[
            {"instanceid":153979,"ip_address":"45.58.35.251"}]}}}"#;

        let instances = run_instance(body).unwrap_or_else(|err| panic!("decode: {err}"));

        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].id.as_str(), "153979");
        assert_eq!(instances[0].password, None);
    }

    #[test]
    fn describe_instance_maps_status() {
        let body = r#"{"describe-instanceresponse":{"instanceSet":{"item":{
            "InstanceId":"153979","vm_status":"RUNNING","vm_ip_address":"45.58.35.251"}}}}"#;

        let description = describe_instance(body).unwrap_or_else(|err| panic!("decode: {err}"));

        assert_eq!(description.status, VmStatus::Running);
        assert_eq!(description.ip_address.as_deref(), Some("45.58.35.251"));
    }

    #[test]
    fn terminate_instance_reads_result_flags() {
        let body = r#"{"terminate-instanceresponse":{"instancesSet":{"item":[
            {"InstanceId":"1","result":"true","message":"queued"},
            {"InstanceId":"2","result":"false"}]}}}"#;

        let results = terminate_instance(body).unwrap_or_else(|err| panic!("decode: {err}"));

        assert_eq!(results.len(), 2);
        assert!(results[0].success);
        assert!(!results[1].success);
    }

    #[test]
    fn reboot_instance_reads_return_value() {
        let body = r#"{"reboot-instanceresponse":{"return":{"value":"true","message":"ok"}}}"#;

        let result = reboot_instance(body).unwrap_or_else(|err| panic!("decode: {err}"));

        assert!(result.success);
    }

    #[test]
    fn list_ssh_keys_tolerates_empty_set() {
        let body = r#"{"list-sshkeysresponse":{"KeysSet":[]}}"#;

        let keys = list_ssh_keys(body).unwrap_or_else(|err| panic!("decode: {err}"));

        assert!(keys.is_empty());
    }

    #[test]
    fn sets_without_item_or_missing_entirely_decode_as_empty() {
        let without_item = r#"{"describe-planresponse":{"plans":{}}}"#;
        let missing = r#"{"list-sshkeysresponse":{}}"#;

        let plans = describe_plan(without_item).unwrap_or_else(|err| panic!("decode: {err}"));
        let keys = list_ssh_keys(missing).unwrap_or_else(|err| panic!("decode: {err}"));

        assert!(plans.is_empty());
        assert!(keys.is_empty());
    }

    #[test]
    fn describe_plan_reads_many_items() {
        let body = r#"{"describe-planresponse":{"plans":{"item":[
            {"plan_name":"XS","platform":"linux"},{"plan_name":"S","platform":"linux"}]}}}"#;

        let plans = describe_plan(body).unwrap_or_else(|err| panic!("decode: {err}"));

        let names: Vec<_> = plans.iter().map(|plan| plan.name.as_str()).collect();
        assert_eq!(names, ["XS", "S"]);
    }

    #[test]
    fn provider_errors_surface_code_and_message() {
        let body = r#"{"error":{"code":"E0001","message":"Invalid signature"}}"#;

        let err = list_ssh_keys(body).expect_err("error envelope should fail");

        assert_eq!(
            err,
            ApiError::Provider {
                action: String::from("list-sshkeys"),
                code: String::from("E0001"),
                message: String::from("Invalid signature"),
            }
        );
    }

    #[test]
    fn error_envelope_ignores_success_bodies() {
        let body = r#"{"list-sshkeysresponse":{"KeysSet":[]}}"#;
        assert_eq!(error_envelope("list-sshkeys", body), None);
        assert_eq!(error_envelope("list-sshkeys", "<html>bad gateway</html>"), None);
    }

    #[test]
    fn missing_envelope_is_a_decode_error() {
        let err = describe_plan("{}").expect_err("empty body should fail");
        assert!(
            matches!(err, ApiError::Decode { ref message, .. } if message.contains("describe-planresponse")),
            "unexpected error: {err}"
        );
    }
}
