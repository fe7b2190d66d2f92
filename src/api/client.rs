//! HTTP client for the Atlantic.Net Cloud API.

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::debug;
use uuid::Uuid;

use super::signing::sign;
use super::types::{
    InstanceDescription, InstanceId, LaunchedInstance, Plan, RebootResult, RebootType,
    RunInstanceRequest, SshKey, TerminatedInstance,
};
use super::{ApiError, ApiFuture, AtlanticApi, response};

/// Public API endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://cloudapi.atlantic.net/";

/// API version sent with every request.
pub const API_VERSION: &str = "2010-12-30";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Signed, query-string based client for the Atlantic.Net Cloud API.
#[derive(Clone)]
pub struct AtlanticNetClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    api_secret: String,
}

impl fmt::Debug for AtlanticNetClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AtlanticNetClient")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key)
            .finish_non_exhaustive()
    }
}

impl AtlanticNetClient {
    /// Builds a client for the public endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Client`] when the HTTP client cannot be built.
    pub fn new(api_key: &str, api_secret: &str) -> Result<Self, ApiError> {
        Self::with_endpoint(DEFAULT_ENDPOINT, api_key, api_secret)
    }

    /// Builds a client for an alternative endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Client`] when the HTTP client cannot be built.
    pub fn with_endpoint(
        endpoint: &str,
        api_key: &str,
        api_secret: &str,
    ) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| ApiError::Client(err.to_string()))?;
        Ok(Self {
            http,
            endpoint: endpoint.to_owned(),
            api_key: api_key.to_owned(),
            api_secret: api_secret.to_owned(),
        })
    }

    fn signed_query(
        &self,
        action: &str,
        params: Vec<(&'static str, String)>,
    ) -> Vec<(&'static str, String)> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_secs())
            .to_string();
        let rndguid = Uuid::new_v4().to_string();
        let signature = sign(&self.api_secret, &timestamp, &rndguid);

        let mut query = vec![
            ("Action", action.to_owned()),
            ("Format", String::from("json")),
            ("Version", String::from(API_VERSION)),
            ("ACSAccessKeyId", self.api_key.clone()),
            ("Timestamp", timestamp),
            ("Rndguid", rndguid),
            ("Signature", signature),
        ];
        query.extend(params);
        query
    }

    async fn call(
        &self,
        action: &str,
        params: Vec<(&'static str, String)>,
    ) -> Result<String, ApiError> {
        let transport = |err: reqwest::Error| ApiError::Transport {
            action: action.to_owned(),
            message: err.to_string(),
        };

        debug!(action, "calling Atlantic.Net API");
        let query = self.signed_query(action, params);
        let reply = self
            .http
            .get(&self.endpoint)
            .query(&query)
            .send()
            .await
            .map_err(transport)?;
        let status = reply.status();
        let body = reply.text().await.map_err(transport)?;

        if !status.is_success() {
            return Err(
                response::error_envelope(action, &body).unwrap_or_else(|| ApiError::Status {
                    action: action.to_owned(),
                    status: status.as_u16(),
                    body,
                }),
            );
        }

        Ok(body)
    }
}

impl AtlanticApi for AtlanticNetClient {
    fn run_instance<'a>(
        &'a self,
        request: &'a RunInstanceRequest,
    ) -> ApiFuture<'a, Vec<LaunchedInstance>> {
        Box::pin(async move {
            let mut params = vec![
                ("servername", request.server_name.clone()),
                ("imageid", request.image_id.clone()),
                ("planname", request.plan_name.clone()),
                ("vm_location", request.vm_location.clone()),
            ];
            if let Some(key_id) = &request.key_id {
                params.push(("key_id", key_id.to_string()));
            }
            let body = self.call("run-instance", params).await?;
            response::run_instance(&body)
        })
    }

    fn describe_instance<'a>(
        &'a self,
        instance_id: &'a InstanceId,
    ) -> ApiFuture<'a, InstanceDescription> {
        Box::pin(async move {
            let body = self
                .call("describe-instance", vec![("instanceid", instance_id.to_string())])
                .await?;
            response::describe_instance(&body)
        })
    }

    fn terminate_instance<'a>(
        &'a self,
        instance_id: &'a InstanceId,
    ) -> ApiFuture<'a, Vec<TerminatedInstance>> {
        Box::pin(async move {
            let body = self
                .call("terminate-instance", vec![("instanceid", instance_id.to_string())])
                .await?;
            response::terminate_instance(&body)
        })
    }

    fn reboot_instance<'a>(
        &'a self,
        instance_id: &'a InstanceId,
        reboot: RebootType,
    ) -> ApiFuture<'a, RebootResult> {
        Box::pin(async move {
            let body = self
                .call(
                    "reboot-instance",
                    vec![
                        ("instanceid", instance_id.to_string()),
                        ("reboottype", reboot.as_str().to_owned()),
                    ],
                )
                .await?;
            response::reboot_instance(&body)
        })
    }

    fn list_ssh_keys(&self) -> ApiFuture<'_, Vec<SshKey>> {
        Box::pin(async move {
            let body = self.call("list-sshkeys", Vec::new()).await?;
            response::list_ssh_keys(&body)
        })
    }

    fn describe_plan<'a>(
        &'a self,
        plan_name: &'a str,
        platform: &'a str,
    ) -> ApiFuture<'a, Vec<Plan>> {
        Box::pin(async move {
            let mut params = Vec::new();
            if !plan_name.is_empty() {
                params.push(("plan_name", plan_name.to_owned()));
            }
            if !platform.is_empty() {
                params.push(("platform", platform.to_owned()));
            }
            let body = self.call("describe-plan", params).await?;
            response::describe_plan(&body)
        })
    }
}
