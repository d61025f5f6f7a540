use std::path::Path;

use docker_compose_types::{Compose, Ports, Service};
use tracing::warn;

use crate::error::{DeployError, DeployResult};

/// Name the compose descriptor gets on the server.
pub const REMOTE_COMPOSE_FILE: &str = "docker-compose.yaml";

/// What the rollout plugin will find when it looks at `service`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceReport {
    pub image: Option<String>,
    pub has_healthcheck: bool,
}

/// Read the local compose descriptor and check that `service` can be
/// rolled out.
pub fn check_file(path: &Path, service: &str) -> DeployResult<ServiceReport> {
    if !path.exists() {
        return Err(DeployError::FileNotFound(path.display().to_string()));
    }
    let content = std::fs::read_to_string(path)?;
    let report = check(&content, service)?;
    if !report.has_healthcheck {
        warn!(
            service,
            file = %path.display(),
            "no healthcheck: rollout will switch traffic as soon as the new container starts"
        );
    }
    Ok(report)
}

/// Validate compose YAML for a zero-downtime rollout of `service`.
///
/// The rollout plugin runs the old and new containers side by side,
/// so the service must not pin a `container_name` or publish host
/// ports.
pub fn check(content: &str, service: &str) -> DeployResult<ServiceReport> {
    let compose: Compose = serde_yaml::from_str(content)
        .map_err(|e| DeployError::Compose(format!("cannot parse compose file: {e}")))?;

    let svc: &Service = compose
        .services
        .0
        .get(service)
        .ok_or_else(|| DeployError::Compose(format!("service '{service}' is not defined")))?
        .as_ref()
        .ok_or_else(|| DeployError::Compose(format!("service '{service}' is empty")))?;

    if let Some(name) = &svc.container_name {
        return Err(DeployError::Compose(format!(
            "service '{service}' sets container_name '{name}'; \
             remove it so two containers can run during rollout"
        )));
    }

    if publishes_ports(&svc.ports) {
        return Err(DeployError::Compose(format!(
            "service '{service}' publishes fixed host ports; \
             route traffic through a proxy instead"
        )));
    }

    Ok(ServiceReport {
        image: svc.image.clone(),
        has_healthcheck: svc.healthcheck.is_some(),
    })
}

/// Whether any entry binds a fixed host port. Container-only entries
/// such as `"3000"` get an ephemeral host port and can be duplicated.
fn publishes_ports(ports: &Ports) -> bool {
    match ports {
        Ports::Short(list) => list.iter().any(|p| p.contains(':')),
        Ports::Long(list) => list.iter().any(|p| p.published.is_some()),
    }
}
