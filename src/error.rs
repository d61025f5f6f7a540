use std::process::ExitStatus;
use std::time::Duration;

pub type DeployResult<T> = Result<T, DeployError>;

#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("command failed: {command}")]
    CommandFailed {
        command: String,
        status: Option<ExitStatus>,
    },

    #[error("command not found: {0}")]
    CommandNotFound(String),

    #[error("prerequisite missing: {0}")]
    PrerequisiteMissing(String),

    #[error("SSH key '{0}' not found in Hetzner Cloud")]
    SshKeyNotFound(String),

    #[error("server not found: {0}")]
    ServerNotFound(String),

    #[error("{host} not reachable over SSH after {}s ({attempts} attempts)", waited.as_secs())]
    ReachabilityTimeout {
        host: String,
        attempts: u32,
        waited: Duration,
    },

    #[error("environment variable missing: {0}")]
    EnvMissing(String),

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("compose file rejected: {0}")]
    Compose(String),

    #[error("DNS error: {0}")]
    DnsError(String),

    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}
