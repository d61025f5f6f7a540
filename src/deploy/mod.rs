pub mod registry;

use crate::config::{BuildSpec, DeployConfig};
use crate::error::DeployResult;
use crate::image::DockerImage;
use crate::ssh::SshSession;

/// A deployer builds and publishes the image, then releases it on
/// a bootstrapped server.
pub trait Deployer {
    /// Build the image locally.
    fn build_image(&self, image: &DockerImage, build: &BuildSpec) -> DeployResult<()>;

    /// Make the image available to the server.
    fn publish_image(&self, image: &DockerImage) -> DeployResult<()>;

    /// Replace the running service with the published image.
    fn release(&self, ssh: &SshSession<'_>, config: &DeployConfig) -> DeployResult<()>;
}
