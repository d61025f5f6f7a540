use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::cmd::Runner;
use crate::error::{DeployError, DeployResult};

/// Single-quote `value` for a remote POSIX shell.
///
/// ```
/// use hcloud_deploy::ssh::quote;
///
/// assert_eq!(quote("/srv/my app"), "'/srv/my app'");
/// assert_eq!(quote("it's"), r"'it'\''s'");
/// ```
#[must_use]
pub fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}

/// How long to keep probing a freshly created server.
#[derive(Debug, Clone, Copy)]
pub struct ReadyPolicy {
    pub timeout: Duration,
    pub interval: Duration,
}

/// One authenticated connection to a remote host.
///
/// Commands are sent with the OpenSSH client. The first successful
/// command opens a multiplexed master connection which every later
/// `ssh` and `scp` call reuses, until [`SshSession::close`].
pub struct SshSession<'a> {
    runner: &'a dyn Runner,
    host: String,
    user: String,
    key: Option<String>,
    env: Vec<(String, String)>,
}

impl<'a> SshSession<'a> {
    #[must_use]
    pub fn new(runner: &'a dyn Runner, host: &str, user: &str) -> Self {
        Self {
            runner,
            host: host.to_string(),
            user: user.to_string(),
            key: None,
            env: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_key(mut self, key_path: &str) -> Self {
        self.key = Some(key_path.to_string());
        self
    }

    /// Extra environment for every `ssh` and `scp` process, such as
    /// the variables of an agent started by this run.
    #[must_use]
    pub fn with_env(mut self, env: Vec<(String, String)>) -> Self {
        self.env = env;
        self
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Execute a command on the remote host and capture output.
    pub fn exec(&self, command: &str) -> DeployResult<String> {
        let args = self.build_ssh_args(command);
        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        self.runner.run_with_env("ssh", &refs, &self.env)
    }

    /// Execute a command on the remote host with output streamed to
    /// the terminal.
    pub fn exec_interactive(&self, command: &str) -> DeployResult<()> {
        let args = self.build_ssh_args(command);
        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        self.runner.run_interactive_with_env("ssh", &refs, &self.env)
    }

    /// Execute a command feeding `input` to its stdin.
    pub fn exec_with_stdin(&self, command: &str, input: &[u8]) -> DeployResult<String> {
        let args = self.build_ssh_args(command);
        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        self.runner
            .run_with_stdin_and_env("ssh", &refs, input, &self.env)
    }

    /// Run a command and report whether it exited zero.
    #[must_use]
    pub fn check(&self, command: &str) -> bool {
        let args = self.build_ssh_args(command);
        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        self.runner.succeeds_with_env("ssh", &refs, &self.env)
    }

    /// Copy a local file to the remote host.
    pub fn scp_to(&self, local_path: &str, remote_path: &str) -> DeployResult<()> {
        let mut args = self.base_args();
        args.push(local_path.to_string());
        args.push(format!("{}:{remote_path}", self.destination()));

        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        self.runner
            .run_interactive_with_env("scp", &refs, &self.env)
    }

    /// Probe with a trivial command until the host answers.
    ///
    /// Returns after the first successful probe. Fails with
    /// [`DeployError::ReachabilityTimeout`] once `policy.timeout` has
    /// elapsed without one.
    pub fn wait_for_ready(&self, policy: ReadyPolicy) -> DeployResult<()> {
        let started = Instant::now();
        let mut attempts = 0;

        loop {
            attempts += 1;
            if self.check("echo ok") {
                debug!(host = %self.host, attempts, "ssh reachable");
                return Ok(());
            }

            let waited = started.elapsed();
            if waited >= policy.timeout {
                return Err(DeployError::ReachabilityTimeout {
                    host: self.host.clone(),
                    attempts,
                    waited,
                });
            }
            debug!(host = %self.host, attempts, "ssh not ready, retrying");
            thread::sleep(policy.interval.min(policy.timeout.saturating_sub(waited)));
        }
    }

    /// Tear down the master connection. Failure is not an error: the
    /// master may never have been started.
    pub fn close(&self) {
        let mut args = self.base_args();
        args.push("-O".to_string());
        args.push("exit".to_string());
        args.push(self.destination());
        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        if !self.runner.succeeds_with_env("ssh", &refs, &self.env) {
            debug!(host = %self.host, "no ssh master to close");
        }
    }

    fn destination(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }

    fn build_ssh_args(&self, command: &str) -> Vec<String> {
        let mut args = self.base_args();
        args.push(self.destination());
        args.push(command.to_string());
        args
    }

    fn base_args(&self) -> Vec<String> {
        let mut args = vec![
            "-o".to_string(),
            "StrictHostKeyChecking=no".to_string(),
            "-o".to_string(),
            "UserKnownHostsFile=/dev/null".to_string(),
            "-o".to_string(),
            "LogLevel=ERROR".to_string(),
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            "ConnectTimeout=10".to_string(),
            "-o".to_string(),
            "ControlMaster=auto".to_string(),
            "-o".to_string(),
            "ControlPath=/tmp/hcloud-deploy-%C".to_string(),
            "-o".to_string(),
            "ControlPersist=120".to_string(),
        ];
        if let Some(key) = &self.key {
            args.push("-i".to_string());
            args.push(key.clone());
        }
        args
    }
}
