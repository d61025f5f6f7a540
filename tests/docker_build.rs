//! Integration test: build an image with the local Docker daemon.
//!
//! Requires Docker. Skipped in normal `cargo test` runs unless the
//! `integration` feature is enabled.

#![cfg(feature = "integration")]

use hcloud_deploy::RegistryRollout;
use hcloud_deploy::cmd::{Runner, System};
use hcloud_deploy::config::BuildSpec;
use hcloud_deploy::deploy::Deployer;
use hcloud_deploy::image::DockerImage;

#[test]
fn build_local_context() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("Dockerfile"),
        "FROM busybox\nCMD [\"echo\", \"ok\"]\n",
    )
    .unwrap();

    let image = DockerImage::new("hcloud-deploy-integration");
    RegistryRollout::new(&System, dir.path())
        .build_image(&image, &BuildSpec::default())
        .expect("docker build failed");

    let id = System
        .run("docker", &["images", "-q", &image.reference()])
        .unwrap();
    assert!(!id.is_empty());
}
