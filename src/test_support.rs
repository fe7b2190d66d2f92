//! Test support utilities shared across unit and integration tests.

use std::collections::{BTreeSet, VecDeque};
use std::env;
use std::ffi::OsString;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, MutexGuard as AsyncMutexGuard};

use crate::api::{
    ApiError, ApiFuture, AtlanticApi, InstanceDescription, InstanceId, LaunchedInstance, Plan,
    RebootResult, RebootType, RunInstanceRequest, SshKey, SshKeyId, TerminatedInstance, VmStatus,
};
use crate::atlanticnet::Connector;
use crate::config::InstanceConfig;
use crate::ssh::{CommandError, CommandOutput, CommandRunner};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Scripted command runner that returns pre-seeded outputs in FIFO order.
///
/// Used to drive deterministic command outcomes without spawning processes.
#[derive(Clone, Debug, Default)]
pub struct ScriptedRunner {
    responses: Arc<Mutex<VecDeque<CommandOutput>>>,
    invocations: Arc<Mutex<Vec<CommandInvocation>>>,
}

/// Records a single invocation made through [`ScriptedRunner`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandInvocation {
    /// Program name as passed to the runner.
    pub program: String,
    /// Arguments passed to the program.
    pub args: Vec<OsString>,
    /// Extra environment variables passed to the program.
    pub envs: Vec<(String, String)>,
}

impl CommandInvocation {
    /// Returns a shell-like command string for assertions.
    #[must_use]
    pub fn command_string(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 1);
        parts.push(self.program.clone());
        parts.extend(
            self.args
                .iter()
                .map(|arg| arg.to_string_lossy().into_owned()),
        );
        parts.join(" ")
    }
}

impl ScriptedRunner {
    /// Creates a new runner with no queued responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all invocations recorded so far.
    #[must_use]
    pub fn invocations(&self) -> Vec<CommandInvocation> {
        lock(&self.invocations).clone()
    }

    /// Pushes a successful exit status.
    pub fn push_success(&self) {
        self.push_output(Some(0), "", "");
    }

    /// Pushes a specific exit code.
    pub fn push_exit_code(&self, code: i32) {
        self.push_output(Some(code), "", "");
    }

    /// Pushes a failing exit code with stderr text.
    pub fn push_failure(&self, code: i32) {
        self.push_output(Some(code), "", "simulated failure");
    }

    /// Pushes an explicit command output response.
    pub fn push_output(
        &self,
        code: Option<i32>,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
    ) {
        lock(&self.responses).push_back(CommandOutput {
            code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        });
    }
}

impl CommandRunner for ScriptedRunner {
    fn run_with_env(
        &self,
        program: &str,
        args: &[OsString],
        envs: &[(String, String)],
    ) -> Result<CommandOutput, CommandError> {
        lock(&self.invocations).push(CommandInvocation {
            program: program.to_owned(),
            args: args.to_vec(),
            envs: envs.to_vec(),
        });
        lock(&self.responses)
            .pop_front()
            .ok_or_else(|| CommandError::Spawn {
                program: program.to_owned(),
                message: String::from("no scripted response available"),
            })
    }
}

#[derive(Debug)]
struct FakeApiState {
    statuses: VecDeque<VmStatus>,
    ssh_keys: Vec<SshKey>,
    plans: Vec<Plan>,
    launched: Vec<LaunchedInstance>,
    terminated: Option<Vec<TerminatedInstance>>,
    reboot: RebootResult,
    failure: Option<ApiError>,
    calls: Vec<String>,
    run_requests: Vec<RunInstanceRequest>,
    connections: usize,
}

impl Default for FakeApiState {
    fn default() -> Self {
        Self {
            statuses: VecDeque::new(),
            ssh_keys: Vec::new(),
            plans: Vec::new(),
            launched: Vec::new(),
            terminated: None,
            reboot: RebootResult {
                success: true,
                message: None,
            },
            failure: None,
            calls: Vec::new(),
            run_requests: Vec::new(),
            connections: 0,
        }
    }
}

/// In-memory [`AtlanticApi`] that records calls and replays seeded data.
///
/// Statuses are served in order; the last one repeats once the queue is
/// down to a single entry. With nothing seeded `describe-instance`
/// reports `RUNNING`.
#[derive(Clone, Debug, Default)]
pub struct FakeApi {
    state: Arc<Mutex<FakeApiState>>,
}

impl FakeApi {
    /// Creates an empty fake.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a status for `describe-instance`.
    #[must_use]
    pub fn with_status(self, status: VmStatus) -> Self {
        lock(&self.state).statuses.push_back(status);
        self
    }

    /// Seeds the keys returned by `list-sshkeys`.
    #[must_use]
    pub fn with_ssh_keys(self, ids: &[&str]) -> Self {
        lock(&self.state).ssh_keys = ids
            .iter()
            .map(|id| SshKey {
                id: SshKeyId::new(*id),
                name: format!("key-{id}"),
            })
            .collect();
        self
    }

    /// Seeds the plans returned by `describe-plan`.
    #[must_use]
    pub fn with_plans(self, names: &[&str]) -> Self {
        lock(&self.state).plans = names
            .iter()
            .map(|name| Plan {
                name: (*name).to_owned(),
                platform: Some(String::from("linux")),
            })
            .collect();
        self
    }

    /// Seeds the servers returned by `run-instance`.
    #[must_use]
    pub fn with_launched(self, instance: LaunchedInstance) -> Self {
        lock(&self.state).launched.push(instance);
        self
    }

    /// Overrides the entries returned by `terminate-instance`.
    ///
    /// Without an override every termination succeeds for the requested id.
    #[must_use]
    pub fn with_terminated(self, entries: Vec<TerminatedInstance>) -> Self {
        lock(&self.state).terminated = Some(entries);
        self
    }

    /// Overrides the outcome of `reboot-instance`.
    #[must_use]
    pub fn with_reboot_success(self, success: bool) -> Self {
        lock(&self.state).reboot = RebootResult {
            success,
            message: None,
        };
        self
    }

    /// Makes every call fail with `error`.
    #[must_use]
    pub fn failing_with(self, error: ApiError) -> Self {
        lock(&self.state).failure = Some(error);
        self
    }

    /// Actions called so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        lock(&self.state).calls.clone()
    }

    /// Requests passed to `run-instance`.
    #[must_use]
    pub fn run_requests(&self) -> Vec<RunInstanceRequest> {
        lock(&self.state).run_requests.clone()
    }

    /// Number of clients built through [`FakeApi::connector`].
    #[must_use]
    pub fn connections(&self) -> usize {
        lock(&self.state).connections
    }

    /// Connector that hands out clones of this fake.
    #[must_use]
    pub fn connector(&self) -> Connector<Self> {
        let api = self.clone();
        Arc::new(move |_: &InstanceConfig| {
            lock(&api.state).connections += 1;
            Ok(api.clone())
        })
    }

    fn respond<T: Send + 'static>(
        &self,
        action: &str,
        reply: impl FnOnce(&mut FakeApiState) -> T,
    ) -> ApiFuture<'static, T> {
        let mut state = lock(&self.state);
        state.calls.push(action.to_owned());
        let result = state.failure.clone().map_or_else(|| Ok(reply(&mut state)), Err);
        Box::pin(async move { result })
    }
}

impl AtlanticApi for FakeApi {
    fn run_instance<'a>(
        &'a self,
        request: &'a RunInstanceRequest,
    ) -> ApiFuture<'a, Vec<LaunchedInstance>> {
        self.respond("run-instance", |state| {
            state.run_requests.push(request.clone());
            state.launched.clone()
        })
    }

    fn describe_instance<'a>(
        &'a self,
        instance_id: &'a InstanceId,
    ) -> ApiFuture<'a, InstanceDescription> {
        self.respond("describe-instance", |state| {
            let status = if state.statuses.len() > 1 {
                state.statuses.pop_front()
            } else {
                state.statuses.front().cloned()
            };
            InstanceDescription {
                id: instance_id.clone(),
                status: status.unwrap_or(VmStatus::Running),
                ip_address: None,
            }
        })
    }

    fn terminate_instance<'a>(
        &'a self,
        instance_id: &'a InstanceId,
    ) -> ApiFuture<'a, Vec<TerminatedInstance>> {
        self.respond("terminate-instance", |state| {
            state.terminated.clone().unwrap_or_else(|| {
                vec![TerminatedInstance {
                    id: instance_id.clone(),
                    success: true,
                    message: None,
                }]
            })
        })
    }

    fn reboot_instance<'a>(
        &'a self,
        _instance_id: &'a InstanceId,
        _reboot: RebootType,
    ) -> ApiFuture<'a, RebootResult> {
        self.respond("reboot-instance", |state| state.reboot.clone())
    }

    fn list_ssh_keys(&self) -> ApiFuture<'_, Vec<SshKey>> {
        self.respond("list-sshkeys", |state| state.ssh_keys.clone())
    }

    fn describe_plan<'a>(
        &'a self,
        _plan_name: &'a str,
        _platform: &'a str,
    ) -> ApiFuture<'a, Vec<Plan>> {
        self.respond("describe-plan", |state| state.plans.clone())
    }
}

/// Global mutex used to serialise environment mutation in tests.
pub static ENV_LOCK: AsyncMutex<()> = AsyncMutex::const_new(());

/// Guard that holds the env mutex and restores variables on drop.
pub struct EnvGuard {
    previous: Vec<(String, Option<OsString>)>,
    _guard: AsyncMutexGuard<'static, ()>,
}

impl EnvGuard {
    /// Sets multiple environment variables while holding a global mutex.
    pub async fn set_vars(pairs: &[(&str, &str)]) -> Self {
        Self::apply(pairs.iter().map(|(key, value)| (*key, Some(*value)))).await
    }

    /// Removes environment variables while holding a global mutex.
    pub async fn remove_vars(keys: &[&str]) -> Self {
        Self::apply(keys.iter().map(|key| (*key, None))).await
    }

    async fn apply<'a>(requested: impl Iterator<Item = (&'a str, Option<&'a str>)>) -> Self {
        let changes: Vec<_> = requested.collect();
        debug_assert!(
            {
                let mut seen = BTreeSet::new();
                changes.iter().all(|(key, _)| seen.insert(*key))
            },
            "duplicate environment variable keys passed to EnvGuard"
        );

        let guard = ENV_LOCK.lock().await;
        let mut previous = Vec::with_capacity(changes.len());
        for (key, value) in changes {
            let old = env::var_os(key);
            // SAFETY: Environment mutation is serialised by `ENV_LOCK`, preventing races.
            unsafe {
                match value {
                    Some(val) => env::set_var(key, val),
                    None => env::remove_var(key),
                }
            }
            previous.push((key.to_owned(), old));
        }

        Self {
            previous,
            _guard: guard,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, old) in &self.previous {
            // SAFETY: Environment mutation is serialised by holding `_guard`.
            unsafe {
                match old {
                    Some(val) => env::set_var(key, val),
                    None => env::remove_var(key),
                }
            }
        }
    }
}
