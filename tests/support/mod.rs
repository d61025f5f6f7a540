//! Shared test helpers: a scripted [`Runner`] that records every
//! invocation, and an on-disk project fixture.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::path::Path;

use hcloud_deploy::cmd::{Runner, format_command};
use hcloud_deploy::config::{DeployConfig, Secret};
use hcloud_deploy::error::{DeployError, DeployResult};
use tempfile::TempDir;

#[derive(Debug, Clone)]
pub struct Call {
    pub program: String,
    pub args: Vec<String>,
    pub stdin: Option<Vec<u8>>,
    pub env: Vec<(String, String)>,
}

impl Call {
    pub fn line(&self) -> String {
        let args: Vec<&str> = self.args.iter().map(String::as_str).collect();
        format_command(&self.program, &args)
    }
}

enum Outcome {
    Respond(String),
    Fail,
    FailTimes(Cell<u32>),
}

struct Rule {
    pattern: String,
    outcome: Outcome,
}

/// Runner whose answers are scripted by substring rules.
///
/// The first rule whose pattern occurs in the command line decides
/// the outcome. Unmatched commands succeed with empty output.
#[derive(Default)]
pub struct FakeRunner {
    rules: Vec<Rule>,
    calls: RefCell<Vec<Call>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, pattern: &str, output: &str) -> Self {
        self.rules.push(Rule {
            pattern: pattern.to_string(),
            outcome: Outcome::Respond(output.to_string()),
        });
        self
    }

    pub fn fail(mut self, pattern: &str) -> Self {
        self.rules.push(Rule {
            pattern: pattern.to_string(),
            outcome: Outcome::Fail,
        });
        self
    }

    /// Fail the first `times` matching commands, then succeed.
    pub fn fail_times(mut self, pattern: &str, times: u32) -> Self {
        self.rules.push(Rule {
            pattern: pattern.to_string(),
            outcome: Outcome::FailTimes(Cell::new(times)),
        });
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn lines(&self) -> Vec<String> {
        self.calls.borrow().iter().map(Call::line).collect()
    }

    pub fn count(&self, pattern: &str) -> usize {
        self.lines().iter().filter(|l| l.contains(pattern)).count()
    }

    pub fn position(&self, pattern: &str) -> Option<usize> {
        self.lines().iter().position(|l| l.contains(pattern))
    }

    fn record(
        &self,
        program: &str,
        args: &[&str],
        stdin: Option<&[u8]>,
        env: &[(String, String)],
    ) -> DeployResult<String> {
        let call = Call {
            program: program.to_string(),
            args: args.iter().map(|a| (*a).to_string()).collect(),
            stdin: stdin.map(<[u8]>::to_vec),
            env: env.to_vec(),
        };
        let line = call.line();
        self.calls.borrow_mut().push(call);

        let failed = || DeployError::CommandFailed {
            command: line.clone(),
            status: None,
        };

        match self.rules.iter().find(|r| line.contains(&r.pattern)) {
            None => Ok(String::new()),
            Some(rule) => match &rule.outcome {
                Outcome::Respond(out) => Ok(out.clone()),
                Outcome::Fail => Err(failed()),
                Outcome::FailTimes(left) => {
                    if left.get() == 0 {
                        Ok(String::new())
                    } else {
                        left.set(left.get() - 1);
                        Err(failed())
                    }
                }
            },
        }
    }
}

impl Runner for FakeRunner {
    fn run_with_env(
        &self,
        program: &str,
        args: &[&str],
        env: &[(String, String)],
    ) -> DeployResult<String> {
        self.record(program, args, None, env)
    }

    fn run_interactive_with_env(
        &self,
        program: &str,
        args: &[&str],
        env: &[(String, String)],
    ) -> DeployResult<()> {
        self.record(program, args, None, env).map(|_| ())
    }

    fn run_with_stdin_and_env(
        &self,
        program: &str,
        args: &[&str],
        stdin_data: &[u8],
        env: &[(String, String)],
    ) -> DeployResult<String> {
        self.record(program, args, Some(stdin_data), env)
    }

    fn succeeds_with_env(&self, program: &str, args: &[&str], env: &[(String, String)]) -> bool {
        self.record(program, args, None, env).is_ok()
    }
}

pub const SERVER_IP: &str = "203.0.113.7";

pub const SSH_KEYS_JSON: &str = r#"[
  {"id": 11, "name": "laptop", "fingerprint": "aa:bb"},
  {"id": 12, "name": "deploy-key", "fingerprint": "cc:dd"}
]"#;

pub const SERVER_JSON: &str = r#"{
  "id": 42,
  "name": "web-1",
  "status": "running",
  "public_net": {
    "ipv4": {"ip": "203.0.113.7", "blocked": false, "dns_ptr": "static.7.113.0.203.clients.your-server.de"},
    "ipv6": {"ip": "2001:db8::/64", "blocked": false}
  }
}"#;

pub const AGENT_OUTPUT: &str =
    "SSH_AUTH_SOCK=/tmp/ssh-test/agent.1; export SSH_AUTH_SOCK; SSH_AGENT_PID=2; export SSH_AGENT_PID;";

pub const DEPLOY_YAML: &str = "\
server:
  name: web-1
  type: cx21
  image: ubuntu-22.04
  location: nbg1
docker:
  username: acme
  image_name: shop
domain: ''
ssh:
  key_name: deploy-key
  ready_timeout_secs: 5
  ready_interval_secs: 1
release:
  settle_secs: 0
";

pub const COMPOSE_YAML: &str = "\
services:
  app:
    image: acme/shop:latest
    env_file: .env
    healthcheck:
      test: [\"CMD\", \"curl\", \"-f\", \"http://localhost:3000/\"]
      interval: 5s
      retries: 3
  traefik:
    image: traefik:v3.0
    ports:
      - \"80:80\"
      - \"8080:8080\"
";

/// A project directory with `deploy.yaml`, the production compose
/// file and an env file.
pub fn project() -> TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    write(dir.path(), "deploy.yaml", DEPLOY_YAML);
    write(dir.path(), "docker-compose.prod.yaml", COMPOSE_YAML);
    write(dir.path(), ".env", "DATABASE_URL=postgres://db/shop\n");
    dir
}

pub fn write(dir: &Path, name: &str, content: &str) {
    std::fs::write(dir.join(name), content).expect("write fixture");
}

/// Load the fixture settings with a known registry password.
pub fn config(dir: &Path) -> DeployConfig {
    let mut config = temp_env::with_var_unset("DOCKER_PASSWORD", || {
        DeployConfig::load(&dir.join("deploy.yaml")).expect("load config")
    });
    config.docker_password = Some(Secret::new("s3cret-pass"));
    config
}

/// A runner scripted for a server that does not exist yet and a
/// host where nothing is installed.
pub fn fresh_host_runner() -> FakeRunner {
    FakeRunner::new()
        .respond("ssh-agent -s", AGENT_OUTPUT)
        .respond("hcloud ssh-key list -o json", SSH_KEYS_JSON)
        .respond("hcloud server describe web-1 -o json", SERVER_JSON)
        .fail("hcloud server describe web-1")
        .fail("test -f ~/.docker/cli-plugins/docker-rollout")
        .fail("command -v docker")
}

/// A runner scripted for an existing, fully bootstrapped server.
pub fn existing_host_runner() -> FakeRunner {
    FakeRunner::new()
        .respond("ssh-agent -s", AGENT_OUTPUT)
        .respond("hcloud ssh-key list -o json", SSH_KEYS_JSON)
        .respond("hcloud server describe web-1 -o json", SERVER_JSON)
}
