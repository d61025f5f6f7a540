use crate::error::DeployResult;
use crate::install::{Installer, PluginInstaller, RuntimeInstaller};
use crate::ssh::{SshSession, quote};

/// What [`bootstrap`] had to install.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BootstrapOutcome {
    pub installed_runtime: bool,
    pub installed_plugin: bool,
}

/// Prepare a server for releases: quiet login, Docker Engine, the
/// rollout plugin and the application directory. Safe to run on every
/// deployment.
pub fn bootstrap(ssh: &SshSession<'_>, remote_dir: &str) -> DeployResult<BootstrapOutcome> {
    eprintln!("Setting up server...");

    ssh.exec("touch ~/.hushlogin")?;

    let installed_runtime = RuntimeInstaller::new(ssh).ensure()?;
    let installed_plugin = PluginInstaller::new(ssh).ensure()?;

    ssh.exec(&format!("mkdir -p {}", quote(remote_dir)))?;

    Ok(BootstrapOutcome {
        installed_runtime,
        installed_plugin,
    })
}
