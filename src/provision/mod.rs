pub mod hetzner;

use std::net::Ipv4Addr;

use crate::config::ServerSpec;
use crate::error::DeployResult;

/// The server as seen through the cloud API during this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteServer {
    pub name: String,
    pub ip: Ipv4Addr,
    /// Whether this run created the server.
    pub created: bool,
}

/// A provisioner finds and creates cloud servers.
pub trait Provisioner {
    /// Check that the provider CLI is installed.
    fn check_prerequisites(&self) -> DeployResult<()>;

    /// Find the account's SSH key named `name`. Keys are never
    /// created.
    fn resolve_ssh_key(&self, name: &str) -> DeployResult<String>;

    /// Whether a server named `name` can be described.
    fn server_exists(&self, name: &str) -> bool;

    /// Create a server with the given type, image, location and key.
    fn create_server(&self, spec: &ServerSpec, ssh_key: &str) -> DeployResult<()>;

    /// Public IPv4 address of the server named `name`.
    fn server_ip(&self, name: &str) -> DeployResult<Ipv4Addr>;
}

/// Reuse the server named in `spec` or create it, then resolve its
/// address.
pub fn ensure_server(
    provisioner: &dyn Provisioner,
    spec: &ServerSpec,
    ssh_key: &str,
) -> DeployResult<RemoteServer> {
    let created = if provisioner.server_exists(&spec.name) {
        eprintln!("Server '{}' exists, reusing it", spec.name);
        false
    } else {
        eprintln!("Creating server '{}'...", spec.name);
        provisioner.create_server(spec, ssh_key)?;
        true
    };

    let ip = provisioner.server_ip(&spec.name)?;
    Ok(RemoteServer {
        name: spec.name.clone(),
        ip,
        created,
    })
}
