//! Single-server deployments to Hetzner Cloud.
//!
//! `hcloud-deploy` takes a `deploy.yaml`, a Dockerfile and a
//! production compose file, and in one command:
//!
//! 1. **Preflight** - checks the `hcloud` CLI, the SSH agent and the
//!    local `docker-rollout` plugin, and that the compose service can
//!    be rolled out
//! 2. **Provision** - reuses the named server or creates it, resolves
//!    its IPv4 address and waits until SSH answers
//! 3. **Build** - builds `<user>/<image>:latest` and pushes it
//! 4. **Bootstrap** - installs Docker and `docker-rollout` on the
//!    server if they are missing
//! 5. **Release** - copies the compose and env files, logs in to the
//!    registry, pulls, and runs `docker rollout` for a zero-downtime
//!    swap
//!
//! Each step either completes or aborts the run. Nothing is rolled
//! back.
//!
//! # Settings
//!
//! ```yaml
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
//! ```
//!
//! The registry password is read from `DOCKER_PASSWORD`, or from the
//! same key in the env file shipped to the server.
//!
//! # Library use
//!
//! Every external program runs through [`cmd::Runner`], so the
//! pipeline can be driven with a custom runner:
//!
//! ```rust,no_run
//! use hcloud_deploy::cmd::System;
//! use hcloud_deploy::config::DeployConfig;
//! use hcloud_deploy::Pipeline;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = DeployConfig::load(std::path::Path::new("deploy.yaml"))?;
//!     let summary = Pipeline::new(&config, &System).run_deploy()?;
//!     println!("{}", summary.app_url);
//!     Ok(())
//! }
//! ```

#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

pub mod bootstrap;
pub mod cmd;
pub mod compose;
pub mod config;
pub mod deploy;
pub mod dns;
pub mod error;
pub mod image;
pub mod install;
pub mod pipeline;
pub mod preflight;
pub mod provision;
pub mod report;
pub mod ssh;

pub use config::DeployConfig;
pub use deploy::registry::RegistryRollout;
pub use dns::cloudflare::Cloudflare;
pub use pipeline::Pipeline;
pub use provision::hetzner::Hetzner;
