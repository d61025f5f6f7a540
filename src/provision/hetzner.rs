use std::net::Ipv4Addr;

use serde::Deserialize;

use crate::cmd::Runner;
use crate::config::ServerSpec;
use crate::error::{DeployError, DeployResult};
use crate::preflight;
use crate::provision::Provisioner;

/// Hetzner Cloud provisioner using the `hcloud` CLI.
///
/// Authentication is whatever context `hcloud` is configured with
/// (`hcloud context create` or `HCLOUD_TOKEN`).
pub struct Hetzner<'a> {
    runner: &'a dyn Runner,
}

#[derive(Debug, Deserialize)]
struct SshKey {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ServerDescription {
    public_net: PublicNet,
}

#[derive(Debug, Deserialize)]
struct PublicNet {
    ipv4: Option<Ipv4Net>,
}

#[derive(Debug, Deserialize)]
struct Ipv4Net {
    ip: String,
}

impl<'a> Hetzner<'a> {
    #[must_use]
    pub fn new(runner: &'a dyn Runner) -> Self {
        Self { runner }
    }
}

impl Provisioner for Hetzner<'_> {
    fn check_prerequisites(&self) -> DeployResult<()> {
        preflight::check_cloud_cli(self.runner)
    }

    fn resolve_ssh_key(&self, name: &str) -> DeployResult<String> {
        let output = self.runner.run("hcloud", &["ssh-key", "list", "-o", "json"])?;
        find_ssh_key(&output, name)
    }

    fn server_exists(&self, name: &str) -> bool {
        self.runner.succeeds("hcloud", &["server", "describe", name])
    }

    fn create_server(&self, spec: &ServerSpec, ssh_key: &str) -> DeployResult<()> {
        self.runner.run_interactive(
            "hcloud",
            &[
                "server",
                "create",
                "--name",
                &spec.name,
                "--type",
                &spec.server_type,
                "--image",
                &spec.image,
                "--location",
                &spec.location,
                "--ssh-key",
                ssh_key,
            ],
        )
    }

    fn server_ip(&self, name: &str) -> DeployResult<Ipv4Addr> {
        let output = self
            .runner
            .run("hcloud", &["server", "describe", name, "-o", "json"])?;
        parse_server_ip(&output, name)
    }
}

/// Pick the key named `name` out of `hcloud ssh-key list -o json`.
pub fn find_ssh_key(json: &str, name: &str) -> DeployResult<String> {
    let keys: Vec<SshKey> = serde_json::from_str(json)?;
    if keys.is_empty() {
        return Err(DeployError::PrerequisiteMissing(
            "no SSH keys found in Hetzner Cloud. Upload one first: \
             hcloud ssh-key create"
                .into(),
        ));
    }
    keys.into_iter()
        .find(|k| k.name == name)
        .map(|k| k.name)
        .ok_or_else(|| DeployError::SshKeyNotFound(name.to_string()))
}

/// Extract `public_net.ipv4.ip` from `hcloud server describe -o json`.
pub fn parse_server_ip(json: &str, name: &str) -> DeployResult<Ipv4Addr> {
    let server: ServerDescription = serde_json::from_str(json)?;
    let ip = server.public_net.ipv4.ok_or_else(|| {
        DeployError::ServerNotFound(format!("{name} has no public IPv4 address"))
    })?;
    ip.ip
        .parse()
        .map_err(|_| DeployError::Other(format!("invalid IPv4 address for {name}: {}", ip.ip)))
}
