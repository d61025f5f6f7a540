use std::fmt;

use crate::config::DeployConfig;

/// The tag every run builds, pushes and pulls.
pub const TAG: &str = "latest";

/// The image artifact being deployed.
///
/// ```
/// use hcloud_deploy::image::DockerImage;
///
/// let image = DockerImage::new("acme/shop");
/// assert_eq!(image.reference(), "acme/shop:latest");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockerImage {
    pub repository: String,
    pub tag: String,
}

impl DockerImage {
    #[must_use]
    pub fn new(repository: &str) -> Self {
        Self {
            repository: repository.to_string(),
            tag: TAG.to_string(),
        }
    }

    #[must_use]
    pub fn from_config(config: &DeployConfig) -> Self {
        Self::new(&config.image_repository())
    }

    /// `repository:tag`.
    #[must_use]
    pub fn reference(&self) -> String {
        format!("{}:{}", self.repository, self.tag)
    }
}

impl fmt::Display for DockerImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.repository, self.tag)
    }
}
