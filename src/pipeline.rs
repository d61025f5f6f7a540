use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use crate::bootstrap;
use crate::cmd::Runner;
use crate::compose::{self, REMOTE_COMPOSE_FILE};
use crate::config::{CONFIG_FILENAME, DeployConfig, DnsProviderKind};
use crate::deploy::Deployer;
use crate::deploy::registry::RegistryRollout;
use crate::dns::DnsProvider;
use crate::dns::cloudflare::Cloudflare;
use crate::error::{DeployError, DeployResult};
use crate::image::DockerImage;
use crate::preflight::{self, AgentEnv};
use crate::provision::hetzner::Hetzner;
use crate::provision::{self, Provisioner, RemoteServer};
use crate::report::{self, Summary};
use crate::ssh::{ReadyPolicy, SshSession, quote};

/// One deployment run: preflight, provision, build, bootstrap,
/// release, report. Every step either completes or aborts the run.
pub struct Pipeline<'a> {
    config: &'a DeployConfig,
    runner: &'a dyn Runner,
    provisioner: Box<dyn Provisioner + 'a>,
    deployer: Box<dyn Deployer + 'a>,
    dns: Option<Box<dyn DnsProvider + 'a>>,
}

impl<'a> Pipeline<'a> {
    /// Hetzner provisioning, registry deployment and, when the
    /// settings ask for it, Cloudflare DNS.
    #[must_use]
    pub fn new(config: &'a DeployConfig, runner: &'a dyn Runner) -> Self {
        let dns = match &config.dns {
            Some(spec) if !config.domain.is_empty() => match spec.provider {
                DnsProviderKind::Cloudflare => Some(Box::new(Cloudflare::new(runner, &config.domain))
                    as Box<dyn DnsProvider + 'a>),
            },
            _ => None,
        };

        Self {
            config,
            runner,
            provisioner: Box::new(Hetzner::new(runner)),
            deployer: Box::new(RegistryRollout::new(runner, &config.base_dir)),
            dns,
        }
    }

    #[must_use]
    pub fn provision(mut self, provisioner: impl Provisioner + 'a) -> Self {
        self.provisioner = Box::new(provisioner);
        self
    }

    #[must_use]
    pub fn deploy(mut self, deployer: impl Deployer + 'a) -> Self {
        self.deployer = Box::new(deployer);
        self
    }

    #[must_use]
    pub fn dns(mut self, provider: impl DnsProvider + 'a) -> Self {
        self.dns = Some(Box::new(provider));
        self
    }

    /// Run the full deployment and return where the app is served.
    pub fn run_deploy(&self) -> DeployResult<Summary> {
        let config = self.config;
        let key_path = config.ssh_key_path()?;

        report::step("Checking prerequisites");
        self.provisioner.check_prerequisites()?;
        let agent = preflight::ensure_ssh_agent(self.runner, &key_path)?;
        preflight::ensure_local_rollout_plugin(self.runner)?;
        compose::check_file(
            &config.local_path(&config.release.compose_file),
            &config.release.service,
        )?;
        let env_file = config.local_path(&config.release.env_file);
        if !env_file.exists() {
            return Err(DeployError::FileNotFound(env_file.display().to_string()));
        }

        report::step("Provisioning server");
        let ssh_key = self.provisioner.resolve_ssh_key(&config.ssh.key_name)?;
        eprintln!("Using SSH key: {ssh_key}");
        let server = provision::ensure_server(self.provisioner.as_ref(), &config.server, &ssh_key)?;
        eprintln!("Server IP: {}", server.ip);

        if let Some(dns) = &self.dns {
            report::step("Updating DNS");
            dns.upsert_a_record(server.ip)?;
            eprintln!("DNS record set: {} -> {}", dns.domain(), server.ip);
        }

        let ssh = self.session(&server, &key_path, agent.as_ref());
        report::step("Waiting for server to be ready");
        ssh.wait_for_ready(ReadyPolicy {
            timeout: config.ready_timeout(),
            interval: config.ready_interval(),
        })?;

        let shipped = self.ship(&ssh);
        ssh.close();
        shipped?;

        Ok(Summary::new(
            server.ip,
            config.release.dashboard_port,
            &config.domain,
        ))
    }

    /// Build, publish, bootstrap and release over an open session.
    fn ship(&self, ssh: &SshSession<'_>) -> DeployResult<()> {
        let config = self.config;

        report::step("Building and pushing Docker image");
        let image = DockerImage::from_config(config);
        self.deployer.build_image(&image, &config.build)?;
        self.deployer.publish_image(&image)?;

        report::step("Bootstrapping server");
        bootstrap::bootstrap(ssh, &config.remote_dir())?;

        report::step("Releasing");
        self.deployer.release(ssh, config)
    }

    /// Show container status on the existing server.
    pub fn run_status(&self) -> DeployResult<()> {
        let config = self.config;
        let name = &config.server.name;
        if !self.provisioner.server_exists(name) {
            return Err(DeployError::ServerNotFound(name.clone()));
        }
        let server = RemoteServer {
            name: name.clone(),
            ip: self.provisioner.server_ip(name)?,
            created: false,
        };

        let key_path = config.ssh_key_path()?;
        let agent = preflight::ensure_ssh_agent(self.runner, &key_path)?;
        let ssh = self.session(&server, &key_path, agent.as_ref());
        let result = ssh.exec_interactive(&format!(
            "cd {} && docker compose -f {REMOTE_COMPOSE_FILE} ps",
            quote(&config.remote_dir())
        ));
        ssh.close();
        result
    }

    fn session(
        &self,
        server: &RemoteServer,
        key_path: &Path,
        agent: Option<&AgentEnv>,
    ) -> SshSession<'a> {
        SshSession::new(self.runner, &server.ip.to_string(), &self.config.ssh.user)
            .with_key(&key_path.to_string_lossy())
            .with_env(agent.map(AgentEnv::vars).unwrap_or_default())
    }
}

#[derive(Parser)]
#[command(name = "hcloud-deploy", version)]
#[command(about = "Deploy a compose service to a Hetzner Cloud server")]
pub struct Cli {
    /// Settings file
    #[arg(long, short, global = true, default_value = CONFIG_FILENAME)]
    pub config: PathBuf,

    /// Log every external command
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Provision the server if needed and roll out the latest image
    Deploy,

    /// Show container status on the server
    Status,
}

impl Cli {
    /// Load the settings and dispatch the chosen command.
    pub fn run(&self, runner: &dyn Runner) -> DeployResult<()> {
        let config = DeployConfig::load(&self.config)?;
        let pipeline = Pipeline::new(&config, runner);

        match self.command {
            Command::Deploy => {
                let summary = pipeline.run_deploy()?;
                report::finished(&summary);
                Ok(())
            }
            Command::Status => pipeline.run_status(),
        }
    }
}
