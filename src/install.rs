//! Check-then-install capabilities for the container runtime and the
//! rollout plugin.
//!
//! Each capability answers [`Installer::is_installed`] separately from
//! [`Installer::install`], so the check can later be replaced by state
//! reported from the provider without touching the install sequence.

use tracing::info;

use crate::cmd::Runner;
use crate::error::DeployResult;
use crate::ssh::SshSession;

/// Latest `docker-rollout` release binary.
pub const ROLLOUT_PLUGIN_URL: &str =
    "https://github.com/wowu/docker-rollout/releases/latest/download/docker-rollout";

/// Docker CLI plugin directory, relative to the shell's home.
pub const PLUGIN_DIR: &str = "~/.docker/cli-plugins";

/// A place shell commands can run: the local machine or the server.
pub trait Shell {
    /// Human-readable location, used in progress output.
    fn location(&self) -> &str;

    /// Run a command and report whether it exited zero.
    fn check(&self, command: &str) -> bool;

    /// Run a command, failing on a non-zero exit.
    fn exec(&self, command: &str) -> DeployResult<()>;
}

/// Commands run through `sh -c` on this machine.
pub struct LocalShell<'a> {
    runner: &'a dyn Runner,
}

impl<'a> LocalShell<'a> {
    #[must_use]
    pub fn new(runner: &'a dyn Runner) -> Self {
        Self { runner }
    }
}

impl Shell for LocalShell<'_> {
    fn location(&self) -> &str {
        "local"
    }

    fn check(&self, command: &str) -> bool {
        self.runner.succeeds("sh", &["-c", command])
    }

    fn exec(&self, command: &str) -> DeployResult<()> {
        self.runner.run_interactive("sh", &["-c", command])
    }
}

impl Shell for SshSession<'_> {
    fn location(&self) -> &str {
        self.host()
    }

    fn check(&self, command: &str) -> bool {
        SshSession::check(self, command)
    }

    fn exec(&self, command: &str) -> DeployResult<()> {
        self.exec_interactive(command)
    }
}

/// Something that can be detected and installed on a [`Shell`].
pub trait Installer {
    fn name(&self) -> &str;

    fn is_installed(&self) -> DeployResult<bool>;

    fn install(&self) -> DeployResult<()>;

    /// Install unless already present. Returns whether an install ran.
    fn ensure(&self) -> DeployResult<bool> {
        if self.is_installed()? {
            info!(component = self.name(), "already installed");
            return Ok(false);
        }
        self.install()?;
        Ok(true)
    }
}

/// Docker Engine with the compose plugin, from Docker's apt
/// repository.
pub struct RuntimeInstaller<'a> {
    shell: &'a dyn Shell,
}

impl<'a> RuntimeInstaller<'a> {
    #[must_use]
    pub fn new(shell: &'a dyn Shell) -> Self {
        Self { shell }
    }

    /// The privileged install sequence, in order.
    #[must_use]
    pub fn install_commands() -> Vec<String> {
        let apt = "DEBIAN_FRONTEND=noninteractive apt-get";
        vec![
            format!("{apt} update"),
            format!("{apt} install -y ca-certificates curl"),
            "install -m 0755 -d /etc/apt/keyrings".to_string(),
            "curl -fsSL https://download.docker.com/linux/ubuntu/gpg \
             -o /etc/apt/keyrings/docker.asc"
                .to_string(),
            "chmod a+r /etc/apt/keyrings/docker.asc".to_string(),
            "echo \"deb [arch=$(dpkg --print-architecture) \
             signed-by=/etc/apt/keyrings/docker.asc] \
             https://download.docker.com/linux/ubuntu \
             $(. /etc/os-release && echo $VERSION_CODENAME) stable\" \
             > /etc/apt/sources.list.d/docker.list"
                .to_string(),
            format!("{apt} update"),
            format!(
                "{apt} install -y docker-ce docker-ce-cli containerd.io \
                 docker-buildx-plugin docker-compose-plugin"
            ),
        ]
    }
}

impl Installer for RuntimeInstaller<'_> {
    fn name(&self) -> &str {
        "docker"
    }

    fn is_installed(&self) -> DeployResult<bool> {
        Ok(self.shell.check("command -v docker"))
    }

    fn install(&self) -> DeployResult<()> {
        eprintln!("Installing Docker on {}...", self.shell.location());
        for command in Self::install_commands() {
            self.shell.exec(&command)?;
        }
        Ok(())
    }
}

/// The `docker-rollout` CLI plugin.
pub struct PluginInstaller<'a> {
    shell: &'a dyn Shell,
    url: String,
}

impl<'a> PluginInstaller<'a> {
    #[must_use]
    pub fn new(shell: &'a dyn Shell) -> Self {
        Self {
            shell,
            url: ROLLOUT_PLUGIN_URL.to_string(),
        }
    }

    #[must_use]
    pub fn url(mut self, url: &str) -> Self {
        self.url = url.to_string();
        self
    }

    #[must_use]
    pub fn plugin_path() -> String {
        format!("{PLUGIN_DIR}/docker-rollout")
    }
}

impl Installer for PluginInstaller<'_> {
    fn name(&self) -> &str {
        "docker-rollout"
    }

    fn is_installed(&self) -> DeployResult<bool> {
        Ok(self.shell.check(&format!("test -f {}", Self::plugin_path())))
    }

    fn install(&self) -> DeployResult<()> {
        eprintln!("Installing docker-rollout ({})...", self.shell.location());
        let path = Self::plugin_path();
        self.shell.exec(&format!("mkdir -p {PLUGIN_DIR}"))?;
        self.shell
            .exec(&format!("curl -fsSL {} -o {path}", self.url))?;
        self.shell.exec(&format!("chmod +x {path}"))
    }
}
