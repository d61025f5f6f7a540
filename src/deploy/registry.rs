use std::path::Path;
use std::thread;

use crate::cmd::Runner;
use crate::compose::REMOTE_COMPOSE_FILE;
use crate::config::{BuildSpec, DeployConfig, PASSWORD_VAR};
use crate::deploy::Deployer;
use crate::error::{DeployError, DeployResult};
use crate::image::DockerImage;
use crate::ssh::{SshSession, quote};

/// Deploy through a container registry and `docker rollout`.
///
/// The image is built and pushed from this machine. On the server,
/// the compose descriptor and env file are copied next to each other,
/// the registry login reads the password from stdin, the service
/// image is pulled and the rollout plugin swaps the running
/// containers for new ones once they are healthy.
pub struct RegistryRollout<'a> {
    runner: &'a dyn Runner,
    base_dir: &'a Path,
}

impl<'a> RegistryRollout<'a> {
    /// `base_dir` is the directory build contexts are relative to.
    #[must_use]
    pub const fn new(runner: &'a dyn Runner, base_dir: &'a Path) -> Self {
        Self { runner, base_dir }
    }

    fn require_file(path: &Path) -> DeployResult<String> {
        if path.exists() {
            Ok(path.to_string_lossy().into_owned())
        } else {
            Err(DeployError::FileNotFound(path.display().to_string()))
        }
    }
}

impl Deployer for RegistryRollout<'_> {
    fn build_image(&self, image: &DockerImage, build: &BuildSpec) -> DeployResult<()> {
        eprintln!("Building Docker image {image}...");

        let tag = image.reference();
        let context = self.base_dir.join(&build.context);
        let context = context.to_string_lossy();
        let dockerfile = build
            .dockerfile
            .as_ref()
            .map(|f| self.base_dir.join(f).to_string_lossy().into_owned());

        let mut args = vec!["build", "-t", tag.as_str()];
        if let Some(file) = &dockerfile {
            args.push("-f");
            args.push(file.as_str());
        }
        args.push(&*context);

        self.runner.run_interactive("docker", &args)
    }

    fn publish_image(&self, image: &DockerImage) -> DeployResult<()> {
        eprintln!("Pushing {image}...");
        self.runner
            .run_interactive("docker", &["push", &image.reference()])
    }

    fn release(&self, ssh: &SshSession<'_>, config: &DeployConfig) -> DeployResult<()> {
        let password = config
            .docker_password
            .as_ref()
            .ok_or_else(|| DeployError::EnvMissing(PASSWORD_VAR.into()))?;

        let remote_dir = config.remote_dir();
        let service = &config.release.service;

        let compose_file = Self::require_file(&config.local_path(&config.release.compose_file))?;
        let env_path = config.local_path(&config.release.env_file);
        let env_file = Self::require_file(&env_path)?;
        let env_name = env_path
            .file_name()
            .map_or_else(|| ".env".to_string(), |n| n.to_string_lossy().into_owned());

        eprintln!("Copying {compose_file} to server...");
        ssh.scp_to(&compose_file, &format!("{remote_dir}/{REMOTE_COMPOSE_FILE}"))?;

        eprintln!("Copying {env_file} to server...");
        let remote_env = format!("{remote_dir}/{env_name}");
        ssh.scp_to(&env_file, &remote_env)?;
        ssh.exec(&format!("chmod 600 {}", quote(&remote_env)))?;

        let in_dir = |command: &str| format!("cd {} && {command}", quote(&remote_dir));

        eprintln!("Logging in to the registry...");
        ssh.exec_with_stdin(
            &in_dir(&format!(
                "docker login -u {} --password-stdin",
                config.docker.username
            )),
            password.expose().as_bytes(),
        )?;

        eprintln!("Pulling {service}...");
        ssh.exec_interactive(&in_dir(&format!("docker compose pull {service}")))?;

        eprintln!("Rolling out {service}...");
        ssh.exec_interactive(&in_dir(&format!(
            "docker rollout -f {REMOTE_COMPOSE_FILE} {service}"
        )))?;

        thread::sleep(config.settle());

        eprintln!("=== Container Status ===");
        ssh.exec_interactive(&in_dir("docker ps -a"))
    }
}
