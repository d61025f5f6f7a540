//! Settings for one deployment run, read from `deploy.yaml`.
//!
//! ```
//! use hcloud_deploy::config::DeployConfig;
//!
//! let config = DeployConfig::from_yaml(
//!     r"
//! server:
//!   name: web-1
//!   type: cx21
//!   image: ubuntu-22.04
//!   location: nbg1
//! docker:
//!   username: acme
//!   image_name: shop
//! domain: shop.example.com
//! ssh:
//!   key_name: id_ed25519
//! ",
//! )
//! .unwrap();
//!
//! assert_eq!(config.image_repository(), "acme/shop");
//! assert_eq!(config.remote_dir(), "/root/shop");
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{DeployError, DeployResult};

pub const CONFIG_FILENAME: &str = "deploy.yaml";

/// Environment variable holding the registry password.
pub const PASSWORD_VAR: &str = "DOCKER_PASSWORD";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeployConfig {
    pub server: ServerSpec,
    pub docker: RegistrySpec,
    /// Required; an empty string means no domain.
    pub domain: String,
    pub ssh: SshSpec,
    #[serde(default)]
    pub release: ReleaseSpec,
    #[serde(default)]
    pub build: BuildSpec,
    #[serde(default)]
    pub dns: Option<DnsSpec>,
    /// Registry password. Only ever read from the environment.
    #[serde(skip)]
    pub docker_password: Option<Secret>,
    /// Directory local paths are resolved against: the settings
    /// file's directory.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// The Hetzner Cloud server to create or reuse.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub server_type: String,
    pub image: String,
    pub location: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegistrySpec {
    pub username: String,
    pub image_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SshSpec {
    /// Name of the key in Hetzner Cloud and of the private key file
    /// under `~/.ssh`.
    pub key_name: String,
    #[serde(default = "default_user")]
    pub user: String,
    #[serde(default = "default_ready_timeout")]
    pub ready_timeout_secs: u64,
    #[serde(default = "default_ready_interval")]
    pub ready_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReleaseSpec {
    pub compose_file: String,
    pub env_file: String,
    pub service: String,
    pub remote_dir: Option<String>,
    pub settle_secs: u64,
    pub dashboard_port: u16,
}

impl Default for ReleaseSpec {
    fn default() -> Self {
        Self {
            compose_file: "docker-compose.prod.yaml".to_string(),
            env_file: ".env".to_string(),
            service: "app".to_string(),
            remote_dir: None,
            settle_secs: 10,
            dashboard_port: 8080,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BuildSpec {
    pub context: String,
    pub dockerfile: Option<String>,
}

impl Default for BuildSpec {
    fn default() -> Self {
        Self {
            context: ".".to_string(),
            dockerfile: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DnsSpec {
    pub provider: DnsProviderKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DnsProviderKind {
    Cloudflare,
}

/// A credential that never shows up in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    #[must_use]
    pub fn new(value: &str) -> Self {
        Self(value.to_string())
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

fn default_user() -> String {
    "root".to_string()
}

const fn default_ready_timeout() -> u64 {
    300
}

const fn default_ready_interval() -> u64 {
    5
}

impl DeployConfig {
    /// Load the settings file and overlay the registry password.
    ///
    /// The password comes from `DOCKER_PASSWORD`, falling back to the
    /// same key in the configured env file.
    pub fn load(path: &Path) -> DeployResult<Self> {
        if !path.exists() {
            return Err(DeployError::FileNotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_yaml(&content)
            .map_err(|e| DeployError::Config(format!("{}: {e}", path.display())))?;

        config.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        config.docker_password = password_from_env().or_else(|| {
            std::fs::read_to_string(config.local_path(&config.release.env_file))
                .ok()
                .and_then(|env| env_file_value(&env, PASSWORD_VAR))
                .filter(|v| !v.is_empty())
                .map(|v| Secret::new(&v))
        });
        Ok(config)
    }

    /// Parse and validate settings without touching the environment.
    pub fn from_yaml(yaml: &str) -> DeployResult<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> DeployResult<()> {
        let required = [
            ("server.name", &self.server.name),
            ("server.type", &self.server.server_type),
            ("server.image", &self.server.image),
            ("server.location", &self.server.location),
            ("docker.username", &self.docker.username),
            ("docker.image_name", &self.docker.image_name),
            ("ssh.key_name", &self.ssh.key_name),
            ("release.service", &self.release.service),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(DeployError::Config(format!("{key} must not be empty")));
            }
        }
        if self.ssh.ready_interval_secs == 0 {
            return Err(DeployError::Config(
                "ssh.ready_interval_secs must be positive".into(),
            ));
        }
        Ok(())
    }

    /// `<registry user>/<image name>`.
    #[must_use]
    pub fn image_repository(&self) -> String {
        format!("{}/{}", self.docker.username, self.docker.image_name)
    }

    /// Per-application directory on the server.
    #[must_use]
    pub fn remote_dir(&self) -> String {
        self.release
            .remote_dir
            .clone()
            .unwrap_or_else(|| format!("/root/{}", self.docker.image_name))
    }

    /// Resolve a path from the settings file against its directory.
    #[must_use]
    pub fn local_path(&self, relative: &str) -> PathBuf {
        self.base_dir.join(relative)
    }

    /// Local private key path, `~/.ssh/<key_name>`.
    pub fn ssh_key_path(&self) -> DeployResult<PathBuf> {
        let home = std::env::var("HOME").map_err(|_| DeployError::EnvMissing("HOME".into()))?;
        Ok(PathBuf::from(home).join(".ssh").join(&self.ssh.key_name))
    }

    #[must_use]
    pub const fn ready_timeout(&self) -> Duration {
        Duration::from_secs(self.ssh.ready_timeout_secs)
    }

    #[must_use]
    pub const fn ready_interval(&self) -> Duration {
        Duration::from_secs(self.ssh.ready_interval_secs)
    }

    #[must_use]
    pub const fn settle(&self) -> Duration {
        Duration::from_secs(self.release.settle_secs)
    }
}

fn password_from_env() -> Option<Secret> {
    std::env::var(PASSWORD_VAR)
        .ok()
        .filter(|v| !v.is_empty())
        .map(|v| Secret::new(&v))
}

/// Read `key` from dotenv-style content.
///
/// Handles `export KEY=value`, surrounding single or double quotes
/// and `#` comment lines. The last assignment wins.
#[must_use]
pub fn env_file_value(content: &str, key: &str) -> Option<String> {
    let mut found = None;
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        if let Some((k, v)) = line.split_once('=') {
            if k.trim() == key {
                let v = v.trim();
                let unquoted = v
                    .strip_prefix('"')
                    .and_then(|s| s.strip_suffix('"'))
                    .or_else(|| v.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')))
                    .unwrap_or(v);
                found = Some(unquoted.to_string());
            }
        }
    }
    found
}
