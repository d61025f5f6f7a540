use std::path::Path;

use tracing::debug;

use crate::cmd::Runner;
use crate::error::{DeployError, DeployResult};
use crate::install::{Installer, LocalShell, PluginInstaller};

/// Fail unless `hcloud` runs.
pub fn check_cloud_cli(runner: &dyn Runner) -> DeployResult<()> {
    if runner.succeeds("hcloud", &["-h"]) {
        Ok(())
    } else {
        Err(DeployError::PrerequisiteMissing(
            "hcloud CLI is not installed. \
             Install it from https://github.com/hetznercloud/cli"
                .into(),
        ))
    }
}

/// Environment of an agent started by this process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentEnv {
    pub auth_sock: String,
    pub pid: Option<String>,
}

impl AgentEnv {
    /// Parse the Bourne-shell output of `ssh-agent -s`.
    #[must_use]
    pub fn parse(output: &str) -> Option<Self> {
        let value = |name: &str| {
            output.split(';').find_map(|part| {
                part.trim()
                    .strip_prefix(name)
                    .and_then(|rest| rest.strip_prefix('='))
                    .map(str::to_string)
            })
        };
        Some(Self {
            auth_sock: value("SSH_AUTH_SOCK")?,
            pid: value("SSH_AGENT_PID"),
        })
    }

    /// Variables to set on processes that should talk to this agent.
    #[must_use]
    pub fn vars(&self) -> Vec<(String, String)> {
        let mut vars = vec![("SSH_AUTH_SOCK".to_string(), self.auth_sock.clone())];
        if let Some(pid) = &self.pid {
            vars.push(("SSH_AGENT_PID".to_string(), pid.clone()));
        }
        vars
    }
}

/// Make sure an agent is running and holds at least one identity.
///
/// Starts `ssh-agent` when `SSH_AUTH_SOCK` is not set and loads
/// `key_path` when the agent has no identities. Returns the started
/// agent, whose variables every later `ssh` and `scp` must carry. The
/// agent is left running.
pub fn ensure_ssh_agent(runner: &dyn Runner, key_path: &Path) -> DeployResult<Option<AgentEnv>> {
    let agent = if std::env::var_os("SSH_AUTH_SOCK").is_some() {
        None
    } else {
        eprintln!("Starting SSH agent...");
        let output = runner.run("ssh-agent", &["-s"])?;
        let agent = AgentEnv::parse(&output).ok_or_else(|| {
            DeployError::PrerequisiteMissing("could not parse ssh-agent output".into())
        })?;
        debug!(auth_sock = %agent.auth_sock, "started ssh agent");
        Some(agent)
    };
    let env = agent.as_ref().map(AgentEnv::vars).unwrap_or_default();

    if runner.run_with_env("ssh-add", &["-l"], &env).is_ok() {
        debug!("ssh agent already has identities");
        return Ok(agent);
    }

    if !key_path.exists() {
        return Err(DeployError::FileNotFound(format!(
            "SSH private key {}",
            key_path.display()
        )));
    }

    eprintln!("Adding key {}...", key_path.display());
    let key = key_path.to_string_lossy();
    runner.run_interactive_with_env("ssh-add", &[&key], &env)?;
    Ok(agent)
}

/// Install `docker-rollout` locally unless present.
pub fn ensure_local_rollout_plugin(runner: &dyn Runner) -> DeployResult<bool> {
    let shell = LocalShell::new(runner);
    PluginInstaller::new(&shell).ensure()
}
